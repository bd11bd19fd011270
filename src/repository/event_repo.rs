// ==========================================
// 集装箱堆场作业规划系统 - 集卡事件数据仓储
// ==========================================
// 红线: 事件永不删除,状态只能沿状态机前进
// 状态迁移使用条件更新 (WHERE status = 'PROCESSING'),
// 影响行数为 0 即视为非法迁移
// 对齐: yard_event 表
// ==========================================

use crate::domain::event::{NewYardEvent, YardEvent};
use crate::domain::types::{EventStatus, MoveType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_utils::{flag, format_ts, parse_ts};
use chrono::NaiveDateTime;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT event_id, truck_id, container_id, move_type,
           is_import, is_export, is_reefer, is_hazard, is_dry,
           is_inter_transhipment, is_intra_transhipment,
           weight_kg, size_ft, event_time,
           status, failure_kind, failure_reason, attempts,
           created_at, updated_at
    FROM yard_event
"#;

/// 事件查询条件 (任一字段非空即参与过滤,取最新一条)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventQuery {
    pub event_id: Option<i64>,
    pub truck_id: Option<String>,
    pub container_id: Option<String>,
}

impl EventQuery {
    pub fn is_empty(&self) -> bool {
        self.event_id.is_none()
            && self.truck_id.as_deref().map_or(true, |s| s.trim().is_empty())
            && self.container_id.as_deref().map_or(true, |s| s.trim().is_empty())
    }
}

// ==========================================
// YardEventRepository - 事件仓储
// ==========================================
pub struct YardEventRepository {
    conn: Arc<Mutex<Connection>>,
}

impl YardEventRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 受理事件: 直接以 PROCESSING 状态入库
    ///
    /// # 返回
    /// - `Ok(event_id)`: 自增事件ID
    pub fn create_processing(&self, event: &NewYardEvent, now: NaiveDateTime) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let now_str = format_ts(&now);

        conn.execute(
            r#"
            INSERT INTO yard_event (
                truck_id, container_id, move_type,
                is_import, is_export, is_reefer, is_hazard, is_dry,
                is_inter_transhipment, is_intra_transhipment,
                weight_kg, size_ft, event_time,
                status, attempts, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
            "#,
            params![
                event.truck_id,
                event.container_id,
                event.move_type.as_str(),
                flag(event.is_import),
                flag(event.is_export),
                flag(event.is_reefer),
                flag(event.is_hazard),
                flag(event.is_dry),
                flag(event.is_inter_transhipment),
                flag(event.is_intra_transhipment),
                event.weight_kg,
                event.size_ft,
                format_ts(&event.event_time),
                EventStatus::Processing.to_db_str(),
                now_str,
                now_str,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// PROCESSING → FAILED
    ///
    /// 事件已不在 PROCESSING 时返回 InvalidStateTransition
    pub fn mark_failed(
        &self,
        event_id: i64,
        failure_kind: &str,
        failure_reason: &str,
        attempts: i32,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            r#"
            UPDATE yard_event
            SET status = ?, failure_kind = ?, failure_reason = ?,
                attempts = ?, updated_at = ?
            WHERE event_id = ? AND status = ?
            "#,
            params![
                EventStatus::Failed.to_db_str(),
                failure_kind,
                failure_reason,
                attempts,
                format_ts(&now),
                event_id,
                EventStatus::Processing.to_db_str(),
            ],
        )?;

        if rows == 0 {
            return Err(RepositoryError::InvalidStateTransition {
                from: Self::current_status_label(&conn, event_id)?,
                to: EventStatus::Failed.to_db_str().to_string(),
            });
        }
        Ok(())
    }

    /// 回收中断事件: 所有滞留 PROCESSING 的事件标记为 FAILED
    ///
    /// # 返回
    /// 被回收的事件ID
    pub fn fail_stale_processing(
        &self,
        failure_kind: &str,
        failure_reason: &str,
        now: NaiveDateTime,
    ) -> RepositoryResult<Vec<i64>> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let ids = {
            let mut stmt = tx.prepare("SELECT event_id FROM yard_event WHERE status = ? ORDER BY event_id")?;
            let ids = stmt
                .query_map(params![EventStatus::Processing.to_db_str()], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            ids
        };

        tx.execute(
            r#"
            UPDATE yard_event
            SET status = ?, failure_kind = ?, failure_reason = ?, updated_at = ?
            WHERE status = ?
            "#,
            params![
                EventStatus::Failed.to_db_str(),
                failure_kind,
                failure_reason,
                format_ts(&now),
                EventStatus::Processing.to_db_str(),
            ],
        )?;

        tx.commit()?;
        Ok(ids)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id(&self, event_id: i64) -> RepositoryResult<Option<YardEvent>> {
        let conn = self.get_conn()?;
        let event = conn
            .query_row(
                &format!("{} WHERE event_id = ?", SELECT_COLUMNS),
                params![event_id],
                Self::map_row,
            )
            .optional()?;
        Ok(event)
    }

    /// 按条件查询最新事件
    pub fn find_latest(&self, query: &EventQuery) -> RepositoryResult<Option<YardEvent>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(event_id) = query.event_id {
            clauses.push("event_id = ?");
            values.push(Value::Integer(event_id));
        }
        if let Some(truck_id) = query.truck_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            clauses.push("truck_id = ?");
            values.push(Value::Text(truck_id.to_string()));
        }
        if let Some(container_id) = query
            .container_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            clauses.push("container_id = ?");
            values.push(Value::Text(container_id.to_string()));
        }

        if clauses.is_empty() {
            return Err(RepositoryError::ValidationError(
                "至少需要 event_id / truck_id / container_id 之一".to_string(),
            ));
        }

        let sql = format!(
            "{} WHERE {} ORDER BY created_at DESC, event_id DESC LIMIT 1",
            SELECT_COLUMNS,
            clauses.join(" AND ")
        );

        let conn = self.get_conn()?;
        let event = conn
            .query_row(&sql, params_from_iter(values), Self::map_row)
            .optional()?;
        Ok(event)
    }

    /// 最近事件 (新→旧)
    pub fn list_recent(&self, limit: i64) -> RepositoryResult<Vec<YardEvent>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY created_at DESC, event_id DESC LIMIT ?",
            SELECT_COLUMNS
        ))?;
        let events = stmt
            .query_map(params![limit], Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    /// 各状态事件数
    pub fn status_counts(&self) -> RepositoryResult<BTreeMap<String, i64>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM yard_event GROUP BY status")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows.into_iter().collect())
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn current_status_label(conn: &Connection, event_id: i64) -> RepositoryResult<String> {
        let status: Option<String> = conn
            .query_row(
                "SELECT status FROM yard_event WHERE event_id = ?",
                params![event_id],
                |row| row.get(0),
            )
            .optional()?;
        status.ok_or_else(|| RepositoryError::NotFound {
            entity: "yard_event".to_string(),
            id: event_id.to_string(),
        })
    }

    fn map_row(row: &Row) -> rusqlite::Result<YardEvent> {
        let move_type_str: String = row.get(3)?;
        let event_time_str: String = row.get(13)?;
        let status_str: String = row.get(14)?;
        let created_at_str: String = row.get(18)?;
        let updated_at_str: String = row.get(19)?;

        let move_type = MoveType::from_db_str(&move_type_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("未知 move_type: {}", move_type_str).into(),
            )
        })?;
        let status = EventStatus::from_db_str(&status_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                14,
                rusqlite::types::Type::Text,
                format!("未知 status: {}", status_str).into(),
            )
        })?;

        Ok(YardEvent {
            event_id: row.get(0)?,
            body: NewYardEvent {
                truck_id: row.get(1)?,
                container_id: row.get(2)?,
                move_type,
                is_import: row.get::<_, i32>(4)? != 0,
                is_export: row.get::<_, i32>(5)? != 0,
                is_reefer: row.get::<_, i32>(6)? != 0,
                is_hazard: row.get::<_, i32>(7)? != 0,
                is_dry: row.get::<_, i32>(8)? != 0,
                is_inter_transhipment: row.get::<_, i32>(9)? != 0,
                is_intra_transhipment: row.get::<_, i32>(10)? != 0,
                weight_kg: row.get(11)?,
                size_ft: row.get(12)?,
                event_time: parse_ts(13, &event_time_str)?,
            },
            status,
            failure_kind: row.get(15)?,
            failure_reason: row.get(16)?,
            attempts: row.get(17)?,
            created_at: parse_ts(18, &created_at_str)?,
            updated_at: parse_ts(19, &updated_at_str)?,
        })
    }
}
