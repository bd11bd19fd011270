// ==========================================
// 集装箱堆场作业规划系统 - 作业提交仓储
// ==========================================
// 并发控制: 比较后提交 (compare-and-commit)
// - 单个 IMMEDIATE 事务内: 箱位变更 + 追加作业计划 + 事件置 COMPLETED
// - 箱位变更以条件更新复核快照前提,影响行数为 0 → SlotConflict
// - 任一步失败整体回滚,不存在"计划已写但箱位未变"的中间态
// ==========================================

use crate::domain::move_plan::MovePlan;
use crate::domain::slot::{ContainerCargo, SlotKey, SlotMutation};
use crate::domain::types::EventStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::move_plan_repo::MovePlanRepository;
use crate::repository::sql_utils::{flag, format_ts};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, TransactionBehavior};
use std::sync::{Arc, Mutex};

// 落箱: 目标仍为空,且 tier 1 或下层有箱
const OCCUPY_SQL: &str = r#"
    UPDATE yard_slot
    SET container_id = ?6,
        is_import = ?7, is_export = ?8, is_reefer = ?9, is_hazard = ?10, is_dry = ?11,
        weight_kg = ?12, updated_at = ?13
    WHERE yard = ?1 AND block = ?2 AND bay = ?3 AND row_no = ?4 AND tier = ?5
      AND container_id IS NULL
      AND (
          ?5 = 1
          OR EXISTS (
              SELECT 1 FROM yard_slot b
              WHERE b.yard = ?1 AND b.block = ?2 AND b.bay = ?3 AND b.row_no = ?4
                AND b.tier = ?5 - 1
                AND b.container_id IS NOT NULL
          )
      )
"#;

// 提箱: 目标仍为该箱,且上层无箱
const VACATE_SQL: &str = r#"
    UPDATE yard_slot
    SET container_id = NULL,
        is_import = 0, is_export = 0, is_reefer = 0, is_hazard = 0, is_dry = 1,
        weight_kg = 0, updated_at = ?7
    WHERE yard = ?1 AND block = ?2 AND bay = ?3 AND row_no = ?4 AND tier = ?5
      AND container_id = ?6
      AND NOT EXISTS (
          SELECT 1 FROM yard_slot a
          WHERE a.yard = ?1 AND a.block = ?2 AND a.bay = ?3 AND a.row_no = ?4
            AND a.tier = ?5 + 1
            AND a.container_id IS NOT NULL
      )
"#;

pub struct MoveCommitRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MoveCommitRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 原子提交一次作业
    ///
    /// # 参数
    /// - `event_id`: 事件ID (必须仍为 PROCESSING)
    /// - `mutation`: 快照上计算出的箱位变更
    /// - `plan`: 作业计划
    /// - `attempts`: 本次处理累计的提交尝试次数
    ///
    /// # 返回
    /// - `Err(SlotConflict)`: 快照前提已失效 (箱位被并发占用/清空)
    /// - `Err(UniqueConstraintViolation)`: 箱号已在场
    /// - `Err(InvalidStateTransition)`: 事件已不在 PROCESSING
    pub fn commit_move(
        &self,
        event_id: i64,
        mutation: &SlotMutation,
        plan: &MovePlan,
        attempts: i32,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now_str = format_ts(&now);

        match mutation {
            SlotMutation::Occupy { key, cargo } => Self::apply_occupy(&tx, key, cargo, &now_str)?,
            SlotMutation::Vacate { key, container_id } => {
                Self::apply_vacate(&tx, key, container_id, &now_str)?
            }
        }

        MovePlanRepository::insert_with(&tx, plan)?;

        let rows = tx.execute(
            r#"
            UPDATE yard_event
            SET status = ?, attempts = ?, failure_kind = NULL, failure_reason = NULL, updated_at = ?
            WHERE event_id = ? AND status = ?
            "#,
            params![
                EventStatus::Completed.to_db_str(),
                attempts,
                now_str,
                event_id,
                EventStatus::Processing.to_db_str(),
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::InvalidStateTransition {
                from: format!("event {} 非 PROCESSING", event_id),
                to: EventStatus::Completed.to_db_str().to_string(),
            });
        }

        tx.commit()?;
        Ok(())
    }

    fn apply_occupy(
        conn: &Connection,
        key: &SlotKey,
        cargo: &ContainerCargo,
        now_str: &str,
    ) -> RepositoryResult<()> {
        let rows = conn.execute(
            OCCUPY_SQL,
            params![
                key.yard,
                key.block,
                key.bay,
                key.row,
                key.tier,
                cargo.container_id,
                flag(cargo.is_import),
                flag(cargo.is_export),
                flag(cargo.is_reefer),
                flag(cargo.is_hazard),
                flag(cargo.is_dry),
                cargo.weight_kg,
                now_str,
            ],
        )?;

        if rows == 0 {
            return Err(RepositoryError::SlotConflict {
                slot: key.to_string(),
                reason: "箱位已被占用或失去支撑".to_string(),
            });
        }
        Ok(())
    }

    fn apply_vacate(
        conn: &Connection,
        key: &SlotKey,
        container_id: &str,
        now_str: &str,
    ) -> RepositoryResult<()> {
        let rows = conn.execute(
            VACATE_SQL,
            params![key.yard, key.block, key.bay, key.row, key.tier, container_id, now_str],
        )?;

        if rows == 0 {
            return Err(RepositoryError::SlotConflict {
                slot: key.to_string(),
                reason: format!("箱位已不再存放 {} 或上层有箱", container_id),
            });
        }
        Ok(())
    }
}
