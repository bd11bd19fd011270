// ==========================================
// 集装箱堆场作业规划系统 - 引擎层审计输出
// ==========================================
// 职责: 定义审计 trait,实现依赖倒置
// 说明: Engine 层定义 trait,Repository 层 (action_log) 实现
// 红线: 审计失败只记日志,不影响状态迁移
// ==========================================

use crate::domain::action_log::ActionType;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::error::Error;
use std::sync::Arc;

/// 默认触发方
pub const ENGINE_ACTOR: &str = "engine";

/// 审计记录 {action, entity_type, entity_id, payload, timestamp}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub action: ActionType,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub actor: String,
    pub payload: JsonValue,
    pub detail: Option<String>,
    pub timestamp: NaiveDateTime,
}

impl AuditRecord {
    pub fn new(action: ActionType, entity_type: &str, entity_id: Option<String>) -> Self {
        Self {
            action,
            entity_type: entity_type.to_string(),
            entity_id,
            actor: ENGINE_ACTOR.to_string(),
            payload: JsonValue::Null,
            detail: None,
            timestamp: chrono::Utc::now().naive_utc(),
        }
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_actor(mut self, actor: &str) -> Self {
        self.actor = actor.to_string();
        self
    }

    pub fn at(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// 审计输出 Trait
pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作审计 (单元测试等不需要审计的场景)
#[derive(Debug, Clone, Default)]
pub struct NoOpAuditSink;

impl AuditSink for NoOpAuditSink {
    fn record(&self, record: AuditRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            action = record.action.as_str(),
            entity_id = ?record.entity_id,
            "NoOpAuditSink: 跳过审计"
        );
        Ok(())
    }
}

/// 可选的审计输出包装
///
/// 吞掉审计错误: 失败时 warn 日志,调用方不感知
#[derive(Clone, Default)]
pub struct OptionalAuditSink {
    inner: Option<Arc<dyn AuditSink>>,
}

impl OptionalAuditSink {
    pub fn with_sink(sink: Arc<dyn AuditSink>) -> Self {
        Self { inner: Some(sink) }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 输出审计记录 (尽力而为)
    pub fn emit(&self, record: AuditRecord) {
        let Some(sink) = &self.inner else {
            return;
        };
        let action = record.action.as_str();
        let entity_id = record.entity_id.clone();
        if let Err(e) = sink.record(record) {
            tracing::warn!(action, entity_id = ?entity_id, error = %e, "审计写入失败，已忽略");
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FailingSink;

    impl AuditSink for FailingSink {
        fn record(&self, _record: AuditRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
            Err("disk full".into())
        }
    }

    #[derive(Default)]
    struct CollectingSink(Mutex<Vec<AuditRecord>>);

    impl AuditSink for CollectingSink {
        fn record(&self, record: AuditRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
            self.0.lock().unwrap().push(record);
            Ok(())
        }
    }

    #[test]
    fn test_failing_sink_is_swallowed() {
        let sink = OptionalAuditSink::with_sink(Arc::new(FailingSink));
        sink.emit(AuditRecord::new(ActionType::FailEvent, "event", Some("1".into())));
        assert!(sink.is_configured());
    }

    #[test]
    fn test_records_are_forwarded() {
        let collector = Arc::new(CollectingSink::default());
        let sink = OptionalAuditSink::with_sink(collector.clone());
        sink.emit(
            AuditRecord::new(ActionType::SubmitEvent, "event", Some("5".into()))
                .with_payload(serde_json::json!({"container_id": "C5"})),
        );
        OptionalAuditSink::none().emit(AuditRecord::new(ActionType::SubmitEvent, "event", None));

        let records = collector.0.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payload["container_id"], "C5");
        assert_eq!(records[0].actor, ENGINE_ACTOR);
    }
}
