// ==========================================
// 集装箱堆场作业规划系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 口径: 值均为字符串;解析失败时回落默认值
// ==========================================

use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, Mutex};

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// CostModelKind - 代价模型选择
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostModelKind {
    Coordinate, // 按箱位几何推算 (生产)
    Random,     // 随机时长/距离 (仿真)
    Fixed,      // 固定值 (测试)
}

impl CostModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostModelKind::Coordinate => "coordinate",
            CostModelKind::Random => "random",
            CostModelKind::Fixed => "fixed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "coordinate" => Some(CostModelKind::Coordinate),
            "random" => Some(CostModelKind::Random),
            "fixed" => Some(CostModelKind::Fixed),
            _ => None,
        }
    }
}

impl fmt::Display for CostModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// PlannerSettings - 规划引擎参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerSettings {
    /// 单次处理内的最大提交尝试次数 (含首次)
    pub max_commit_attempts: u32,
    pub cost_model: CostModelKind,

    // ===== 设备与区域命名 =====
    pub crane_id_prefix: String,
    pub gate_zone_id: String,

    // ===== 几何 (米) =====
    pub bay_length_m: f64,
    pub row_width_m: f64,
    pub tier_height_m: f64,
    pub gate_distance_m: f64,
    pub external_truck_distance_m: f64,

    // ===== 作业节拍 =====
    pub crane_speed_mps: f64,
    pub lift_seconds_per_tier: f64,
    pub base_handling_seconds: f64,

    /// 随机代价模型的种子 (None = 熵源)
    pub random_seed: Option<u64>,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            max_commit_attempts: 3,
            cost_model: CostModelKind::Coordinate,
            crane_id_prefix: "RTG".to_string(),
            gate_zone_id: "GATE".to_string(),
            bay_length_m: 6.5,
            row_width_m: 2.8,
            tier_height_m: 2.9,
            gate_distance_m: 120.0,
            external_truck_distance_m: 50.0,
            crane_speed_mps: 1.5,
            lift_seconds_per_tier: 4.0,
            base_handling_seconds: 15.0,
            random_seed: None,
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![GLOBAL_SCOPE, key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    fn get_f64_or(&self, key: &str, default: f64) -> Result<f64, Box<dyn Error>> {
        let value = self.get_config_or_default(key, &default.to_string())?;
        Ok(value.trim().parse::<f64>().unwrap_or_else(|_| {
            tracing::warn!(config_key = key, raw_value = %value, "配置值不是数字，使用默认值");
            default
        }))
    }

    /// 写入配置值 (UPSERT)
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![GLOBAL_SCOPE, key, value],
        )?;
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    // ===== 规划引擎配置 =====

    pub fn get_max_commit_attempts(&self) -> Result<u32, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::MAX_COMMIT_ATTEMPTS, "3")?;
        Ok(value.trim().parse::<u32>().ok().filter(|&n| n >= 1).unwrap_or(3))
    }

    pub fn get_cost_model(&self) -> Result<CostModelKind, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::COST_MODEL, "coordinate")?;
        Ok(CostModelKind::parse(&value).unwrap_or_else(|| {
            tracing::warn!(
                config_key = config_keys::COST_MODEL,
                raw_value = %value,
                "未知代价模型，使用 coordinate"
            );
            CostModelKind::Coordinate
        }))
    }

    pub fn get_random_seed(&self) -> Result<Option<u64>, Box<dyn Error>> {
        Ok(self
            .get_config_value(config_keys::RANDOM_SEED)?
            .and_then(|v| v.trim().parse::<u64>().ok()))
    }

    /// 一次性加载全部规划参数
    pub fn load_planner_settings(&self) -> Result<PlannerSettings, Box<dyn Error>> {
        let defaults = PlannerSettings::default();

        Ok(PlannerSettings {
            max_commit_attempts: self.get_max_commit_attempts()?,
            cost_model: self.get_cost_model()?,
            crane_id_prefix: self
                .get_config_or_default(config_keys::CRANE_ID_PREFIX, &defaults.crane_id_prefix)?,
            gate_zone_id: self.get_config_or_default(config_keys::GATE_ZONE_ID, &defaults.gate_zone_id)?,
            bay_length_m: self.get_f64_or(config_keys::BAY_LENGTH_M, defaults.bay_length_m)?,
            row_width_m: self.get_f64_or(config_keys::ROW_WIDTH_M, defaults.row_width_m)?,
            tier_height_m: self.get_f64_or(config_keys::TIER_HEIGHT_M, defaults.tier_height_m)?,
            gate_distance_m: self.get_f64_or(config_keys::GATE_DISTANCE_M, defaults.gate_distance_m)?,
            external_truck_distance_m: self.get_f64_or(
                config_keys::EXTERNAL_TRUCK_DISTANCE_M,
                defaults.external_truck_distance_m,
            )?,
            crane_speed_mps: self.get_f64_or(config_keys::CRANE_SPEED_MPS, defaults.crane_speed_mps)?,
            lift_seconds_per_tier: self
                .get_f64_or(config_keys::LIFT_SECONDS_PER_TIER, defaults.lift_seconds_per_tier)?,
            base_handling_seconds: self
                .get_f64_or(config_keys::BASE_HANDLING_SECONDS, defaults.base_handling_seconds)?,
            random_seed: self.get_random_seed()?,
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 并发提交
    pub const MAX_COMMIT_ATTEMPTS: &str = "max_commit_attempts";

    // 代价模型
    pub const COST_MODEL: &str = "cost_model";
    pub const RANDOM_SEED: &str = "random_seed";

    // 设备与区域
    pub const CRANE_ID_PREFIX: &str = "crane_id_prefix";
    pub const GATE_ZONE_ID: &str = "gate_zone_id";

    // 几何
    pub const BAY_LENGTH_M: &str = "bay_length_m";
    pub const ROW_WIDTH_M: &str = "row_width_m";
    pub const TIER_HEIGHT_M: &str = "tier_height_m";
    pub const GATE_DISTANCE_M: &str = "gate_distance_m";
    pub const EXTERNAL_TRUCK_DISTANCE_M: &str = "external_truck_distance_m";

    // 节拍
    pub const CRANE_SPEED_MPS: &str = "crane_speed_mps";
    pub const LIFT_SECONDS_PER_TIER: &str = "lift_seconds_per_tier";
    pub const BASE_HANDLING_SECONDS: &str = "base_handling_seconds";
}
