use crate::domain::action_log::ActionLog;
use crate::engine::audit::{AuditRecord, AuditSink};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_utils::format_ts;
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ActionLogRepository - 操作日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    /// 创建新的操作日志仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入操作日志
    ///
    /// # 返回
    /// - `Ok(action_id)`: 成功插入,返回action_id
    /// - `Err(...)`: 数据库错误
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO action_log (
                action_id, action_type, entity_type, entity_id,
                action_ts, actor, payload_json, detail
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                log.action_id,
                log.action_type,
                log.entity_type,
                log.entity_id,
                format_ts(&log.action_ts),
                log.actor,
                log.payload_json.as_ref().map(|v| v.to_string()),
                log.detail,
            ],
        )?;

        Ok(log.action_id.clone())
    }

    /// 批量插入操作日志
    pub fn batch_insert(&self, logs: Vec<ActionLog>) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for log in logs {
            tx.execute(
                r#"
                INSERT INTO action_log (
                    action_id, action_type, entity_type, entity_id,
                    action_ts, actor, payload_json, detail
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                params![
                    log.action_id,
                    log.action_type,
                    log.entity_type,
                    log.entity_id,
                    format_ts(&log.action_ts),
                    log.actor,
                    log.payload_json.as_ref().map(|v| v.to_string()),
                    log.detail,
                ],
            )?;
            count += 1;
        }

        tx.commit()?;
        Ok(count)
    }
}

// ==========================================
// AuditSink 实现: 审计记录落 action_log 表
// ==========================================
impl AuditSink for ActionLogRepository {
    fn record(&self, record: AuditRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut log = ActionLog::new(
            record.action,
            &record.entity_type,
            record.entity_id,
            &record.actor,
        )
        .with_payload(record.payload);
        log.action_ts = record.timestamp;
        if let Some(detail) = record.detail {
            log = log.with_detail(detail);
        }

        self.insert(&log)?;
        Ok(())
    }
}
