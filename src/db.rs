// ==========================================
// 集装箱堆场作业规划系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 统一建表 DDL (幂等)
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化数据库 schema（幂等）
///
/// 表:
/// - yard_slot: 箱位 (主键 yard/block/bay/row_no/tier, container_id 唯一)
/// - yard_event: 集卡事件 (状态机)
/// - move_plan: 作业计划 (集合表, 允许重算历史)
/// - action_log: 审计日志
/// - config_kv: 配置
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS yard_slot (
            yard TEXT NOT NULL,
            block TEXT NOT NULL,
            bay INTEGER NOT NULL,
            row_no INTEGER NOT NULL,
            tier INTEGER NOT NULL CHECK (tier >= 1),
            size_ft INTEGER NOT NULL DEFAULT 40,
            container_id TEXT UNIQUE,
            is_import INTEGER NOT NULL DEFAULT 0,
            is_export INTEGER NOT NULL DEFAULT 0,
            is_reefer INTEGER NOT NULL DEFAULT 0,
            is_hazard INTEGER NOT NULL DEFAULT 0,
            is_dry INTEGER NOT NULL DEFAULT 1,
            weight_kg REAL NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (yard, block, bay, row_no, tier)
        );

        CREATE TABLE IF NOT EXISTS yard_event (
            event_id INTEGER PRIMARY KEY AUTOINCREMENT,
            truck_id TEXT NOT NULL,
            container_id TEXT NOT NULL,
            move_type TEXT NOT NULL,
            is_import INTEGER NOT NULL DEFAULT 0,
            is_export INTEGER NOT NULL DEFAULT 0,
            is_reefer INTEGER NOT NULL DEFAULT 0,
            is_hazard INTEGER NOT NULL DEFAULT 0,
            is_dry INTEGER NOT NULL DEFAULT 0,
            is_inter_transhipment INTEGER NOT NULL DEFAULT 0,
            is_intra_transhipment INTEGER NOT NULL DEFAULT 0,
            weight_kg REAL NOT NULL DEFAULT 0,
            size_ft INTEGER NOT NULL DEFAULT 40,
            event_time TEXT NOT NULL,
            status TEXT NOT NULL,
            failure_kind TEXT,
            failure_reason TEXT,
            attempts INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_yard_event_truck ON yard_event(truck_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_yard_event_container ON yard_event(container_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_yard_event_status ON yard_event(status);

        CREATE TABLE IF NOT EXISTS move_plan (
            plan_id TEXT PRIMARY KEY,
            event_id INTEGER NOT NULL REFERENCES yard_event(event_id),
            event_time TEXT NOT NULL,
            start_time REAL NOT NULL,
            end_time REAL NOT NULL,
            container_id TEXT NOT NULL,
            move_type TEXT NOT NULL,
            from_sid TEXT NOT NULL,
            from_tier INTEGER NOT NULL,
            to_sid TEXT NOT NULL,
            to_tier INTEGER NOT NULL,
            distance_crane REAL NOT NULL,
            crane_id TEXT NOT NULL,
            from_truck_zone_id TEXT NOT NULL,
            to_truck_zone_id TEXT NOT NULL,
            truck_id TEXT NOT NULL,
            distance_internal_truck REAL NOT NULL,
            distance_external_truck REAL NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_move_plan_event ON move_plan(event_id);

        CREATE TABLE IF NOT EXISTS action_log (
            action_id TEXT PRIMARY KEY,
            action_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT,
            action_ts TEXT NOT NULL,
            actor TEXT NOT NULL,
            payload_json TEXT,
            detail TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_action_log_entity ON action_log(entity_type, entity_id);
        CREATE INDEX IF NOT EXISTS idx_action_log_ts ON action_log(action_ts);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
