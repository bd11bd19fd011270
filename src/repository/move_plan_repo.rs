// ==========================================
// 集装箱堆场作业规划系统 - 作业计划数据仓储
// ==========================================
// 红线: 作业计划入库后不可变,只追加
// 写入只发生在 MoveCommitRepository 的提交事务内
// 对齐: move_plan 表
// ==========================================

use crate::domain::move_plan::MovePlan;
use crate::domain::types::MoveType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_utils::{format_ts, parse_ts};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT plan_id, event_id, event_time, start_time, end_time,
           container_id, move_type, from_sid, from_tier, to_sid, to_tier,
           distance_crane, crane_id, from_truck_zone_id, to_truck_zone_id,
           truck_id, distance_internal_truck, distance_external_truck
    FROM move_plan
"#;

pub struct MovePlanRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MovePlanRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 事件的首条作业计划
    pub fn find_by_event_id(&self, event_id: i64) -> RepositoryResult<Option<MovePlan>> {
        let conn = self.get_conn()?;
        let plan = conn
            .query_row(
                &format!("{} WHERE event_id = ? ORDER BY rowid ASC LIMIT 1", SELECT_COLUMNS),
                params![event_id],
                Self::map_row,
            )
            .optional()?;
        Ok(plan)
    }

    /// 事件的全部作业计划 (历史)
    pub fn list_by_event_id(&self, event_id: i64) -> RepositoryResult<Vec<MovePlan>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!("{} WHERE event_id = ? ORDER BY rowid ASC", SELECT_COLUMNS))?;
        let plans = stmt
            .query_map(params![event_id], Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(plans)
    }

    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM move_plan", [], |row| row.get(0))?)
    }

    /// 在给定连接 (事务) 上追加作业计划
    pub(crate) fn insert_with(conn: &Connection, plan: &MovePlan) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO move_plan (
                plan_id, event_id, event_time, start_time, end_time,
                container_id, move_type, from_sid, from_tier, to_sid, to_tier,
                distance_crane, crane_id, from_truck_zone_id, to_truck_zone_id,
                truck_id, distance_internal_truck, distance_external_truck
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                plan.plan_id,
                plan.event_id,
                format_ts(&plan.event_time),
                plan.start_time,
                plan.end_time,
                plan.container_id,
                plan.move_type.as_str(),
                plan.from_sid,
                plan.from_tier,
                plan.to_sid,
                plan.to_tier,
                plan.distance_crane,
                plan.crane_id,
                plan.from_truck_zone_id,
                plan.to_truck_zone_id,
                plan.truck_id,
                plan.distance_internal_truck,
                plan.distance_external_truck,
            ],
        )?;
        Ok(())
    }

    fn map_row(row: &Row) -> rusqlite::Result<MovePlan> {
        let event_time_str: String = row.get(2)?;
        let move_type_str: String = row.get(6)?;
        let move_type = MoveType::from_db_str(&move_type_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                6,
                rusqlite::types::Type::Text,
                format!("未知 move_type: {}", move_type_str).into(),
            )
        })?;

        Ok(MovePlan {
            plan_id: row.get(0)?,
            event_id: row.get(1)?,
            event_time: parse_ts(2, &event_time_str)?,
            start_time: row.get(3)?,
            end_time: row.get(4)?,
            container_id: row.get(5)?,
            move_type,
            from_sid: row.get(7)?,
            from_tier: row.get(8)?,
            to_sid: row.get(9)?,
            to_tier: row.get(10)?,
            distance_crane: row.get(11)?,
            crane_id: row.get(12)?,
            from_truck_zone_id: row.get(13)?,
            to_truck_zone_id: row.get(14)?,
            truck_id: row.get(15)?,
            distance_internal_truck: row.get(16)?,
            distance_external_truck: row.get(17)?,
        })
    }
}
