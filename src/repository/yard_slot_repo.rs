// ==========================================
// 集装箱堆场作业规划系统 - 箱位数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: 人工维护箱位同样遵守重力约束与箱号唯一
// 对齐: yard_slot 表
// ==========================================

use crate::domain::slot::{Slot, SlotKey};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_utils::{flag, format_ts, parse_ts};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT yard, block, bay, row_no, tier, size_ft, container_id,
           is_import, is_export, is_reefer, is_hazard, is_dry,
           weight_kg, updated_at
    FROM yard_slot
"#;

const ORDER_BY_KEY: &str = "ORDER BY yard, block, bay, row_no, tier";

const UPSERT_SQL: &str = r#"
    INSERT INTO yard_slot (
        yard, block, bay, row_no, tier, size_ft, container_id,
        is_import, is_export, is_reefer, is_hazard, is_dry,
        weight_kg, updated_at
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(yard, block, bay, row_no, tier) DO UPDATE SET
        size_ft = excluded.size_ft,
        container_id = excluded.container_id,
        is_import = excluded.is_import,
        is_export = excluded.is_export,
        is_reefer = excluded.is_reefer,
        is_hazard = excluded.is_hazard,
        is_dry = excluded.is_dry,
        weight_kg = excluded.weight_kg,
        updated_at = excluded.updated_at
"#;

// 有箱但下层无箱的箱位数 (重力约束违反)
const GRAVITY_VIOLATIONS_SQL: &str = r#"
    SELECT COUNT(*) FROM yard_slot s
    WHERE s.container_id IS NOT NULL
      AND s.tier > 1
      AND NOT EXISTS (
          SELECT 1 FROM yard_slot b
          WHERE b.yard = s.yard AND b.block = s.block
            AND b.bay = s.bay AND b.row_no = s.row_no
            AND b.tier = s.tier - 1
            AND b.container_id IS NOT NULL
      )
"#;

/// 箱位统计 (仅统计在场箱)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotStats {
    pub total_slots: i64,
    pub occupied_slots: i64,
    pub reefer: i64,
    pub hazard: i64,
    pub dry: i64,
    pub size_20ft: i64,
    pub size_40ft: i64,
    pub import: i64,
    pub export: i64,
}

impl SlotStats {
    pub fn empty_slots(&self) -> i64 {
        self.total_slots - self.occupied_slots
    }
}

// ==========================================
// YardSlotRepository - 箱位仓储
// ==========================================
pub struct YardSlotRepository {
    conn: Arc<Mutex<Connection>>,
}

impl YardSlotRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 全量箱位 (按 yard, block, bay, row, tier 排序)
    pub fn list_slots(&self) -> RepositoryResult<Vec<Slot>> {
        let conn = self.get_conn()?;
        Self::list_slots_with(&conn)
    }

    /// 在给定连接上读取全量箱位 (供事务内复核使用)
    pub(crate) fn list_slots_with(conn: &Connection) -> RepositoryResult<Vec<Slot>> {
        let mut stmt = conn.prepare(&format!("{} {}", SELECT_COLUMNS, ORDER_BY_KEY))?;
        let slots = stmt
            .query_map([], Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(slots)
    }

    /// 按坐标查询箱位
    pub fn find_by_key(&self, key: &SlotKey) -> RepositoryResult<Option<Slot>> {
        let conn = self.get_conn()?;
        Self::find_by_key_with(&conn, key)
    }

    fn find_by_key_with(conn: &Connection, key: &SlotKey) -> RepositoryResult<Option<Slot>> {
        let slot = conn
            .query_row(
                &format!(
                    "{} WHERE yard = ? AND block = ? AND bay = ? AND row_no = ? AND tier = ?",
                    SELECT_COLUMNS
                ),
                params![key.yard, key.block, key.bay, key.row, key.tier],
                Self::map_row,
            )
            .optional()?;
        Ok(slot)
    }

    /// 按箱号查询所在箱位
    pub fn find_by_container(&self, container_id: &str) -> RepositoryResult<Option<Slot>> {
        let conn = self.get_conn()?;
        let slot = conn
            .query_row(
                &format!("{} WHERE container_id = ?", SELECT_COLUMNS),
                params![container_id],
                Self::map_row,
            )
            .optional()?;
        Ok(slot)
    }

    /// 箱位统计
    pub fn stats(&self) -> RepositoryResult<SlotStats> {
        let conn = self.get_conn()?;
        let stats = conn.query_row(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN container_id IS NOT NULL THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN container_id IS NOT NULL AND is_reefer = 1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN container_id IS NOT NULL AND is_hazard = 1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN container_id IS NOT NULL AND is_dry = 1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN container_id IS NOT NULL AND size_ft = 20 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN container_id IS NOT NULL AND size_ft = 40 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN container_id IS NOT NULL AND is_import = 1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN container_id IS NOT NULL AND is_export = 1 THEN 1 ELSE 0 END), 0)
            FROM yard_slot
            "#,
            [],
            |row| {
                Ok(SlotStats {
                    total_slots: row.get(0)?,
                    occupied_slots: row.get(1)?,
                    reefer: row.get(2)?,
                    hazard: row.get(3)?,
                    dry: row.get(4)?,
                    size_20ft: row.get(5)?,
                    size_40ft: row.get(6)?,
                    import: row.get(7)?,
                    export: row.get(8)?,
                })
            },
        )?;
        Ok(stats)
    }

    /// 重力约束违反数 (正常情况下恒为 0)
    pub fn count_gravity_violations(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Ok(conn.query_row(GRAVITY_VIOLATIONS_SQL, [], |row| row.get(0))?)
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 人工维护单个箱位 (不存在则创建)
    ///
    /// 在 IMMEDIATE 事务内复核:
    /// - 放箱: 下层必须有箱 (tier > 1),箱号不得出现在其他箱位
    /// - 清空: 上层不得有箱
    pub fn upsert_slot(&self, slot: &Slot) -> RepositoryResult<Slot> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let key = &slot.key;
        if key.tier < 1 {
            return Err(RepositoryError::FieldValueError {
                field: "tier".to_string(),
                message: format!("tier 必须 >= 1: {}", key.tier),
            });
        }

        match &slot.container_id {
            Some(container_id) => {
                if let Some(below) = key.below() {
                    let supported = Self::find_by_key_with(&tx, &below)?
                        .map(|s| s.is_occupied())
                        .unwrap_or(false);
                    if !supported {
                        return Err(RepositoryError::BusinessRuleViolation(format!(
                            "重力约束: {} 下层无箱",
                            key
                        )));
                    }
                }

                let holder: Option<(String, String, i32, i32, i32)> = tx
                    .query_row(
                        "SELECT yard, block, bay, row_no, tier FROM yard_slot WHERE container_id = ?",
                        params![container_id],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
                    )
                    .optional()?;
                if let Some((yard, block, bay, row, tier)) = holder {
                    let other = SlotKey::new(yard, block, bay, row, tier);
                    if &other != key {
                        return Err(RepositoryError::UniqueConstraintViolation(format!(
                            "箱号 {} 已在箱位 {}",
                            container_id, other
                        )));
                    }
                }
            }
            None => {
                let blocked = Self::find_by_key_with(&tx, &key.above())?
                    .map(|s| s.is_occupied())
                    .unwrap_or(false);
                if blocked {
                    return Err(RepositoryError::BusinessRuleViolation(format!(
                        "重力约束: {} 上层有箱,不能清空",
                        key
                    )));
                }
            }
        }

        Self::upsert_with(&tx, slot)?;
        let saved = Self::find_by_key_with(&tx, key)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "yard_slot".to_string(),
            id: key.to_string(),
        })?;

        tx.commit()?;
        Ok(saved)
    }

    /// 批量写入箱位 (导入用)
    ///
    /// 单事务;写入后复核全场重力约束,违反则整体回滚
    pub fn upsert_many(&self, slots: &[Slot]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        for slot in slots {
            Self::upsert_with(&tx, slot)?;
        }

        let violations: i64 = tx.query_row(GRAVITY_VIOLATIONS_SQL, [], |row| row.get(0))?;
        if violations > 0 {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "写入后存在 {} 个悬空箱位",
                violations
            )));
        }

        tx.commit()?;
        Ok(slots.len())
    }

    /// 清空并重建全部箱位 (仅用于初始化/演示数据)
    pub fn replace_all(&self, slots: &[Slot]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute("DELETE FROM yard_slot", [])?;
        for slot in slots {
            Self::upsert_with(&tx, slot)?;
        }

        tx.commit()?;
        Ok(slots.len())
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn upsert_with(conn: &Connection, slot: &Slot) -> RepositoryResult<()> {
        conn.execute(
            UPSERT_SQL,
            params![
                slot.key.yard,
                slot.key.block,
                slot.key.bay,
                slot.key.row,
                slot.key.tier,
                slot.size_ft,
                slot.container_id,
                flag(slot.is_import),
                flag(slot.is_export),
                flag(slot.is_reefer),
                flag(slot.is_hazard),
                flag(slot.is_dry),
                slot.weight_kg,
                format_ts(&slot.updated_at),
            ],
        )?;
        Ok(())
    }

    pub(crate) fn map_row(row: &Row) -> rusqlite::Result<Slot> {
        let updated_at_str: String = row.get(13)?;

        Ok(Slot {
            key: SlotKey {
                yard: row.get(0)?,
                block: row.get(1)?,
                bay: row.get(2)?,
                row: row.get(3)?,
                tier: row.get(4)?,
            },
            size_ft: row.get(5)?,
            container_id: row.get(6)?,
            is_import: row.get::<_, i32>(7)? != 0,
            is_export: row.get::<_, i32>(8)? != 0,
            is_reefer: row.get::<_, i32>(9)? != 0,
            is_hazard: row.get::<_, i32>(10)? != 0,
            is_dry: row.get::<_, i32>(11)? != 0,
            weight_kg: row.get(12)?,
            updated_at: parse_ts(13, &updated_at_str)?,
        })
    }
}
