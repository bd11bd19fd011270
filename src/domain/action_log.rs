// ==========================================
// 集装箱堆场作业规划系统 - 操作日志领域模型
// ==========================================
// 红线: 每次事件状态迁移、每次人工箱位变更都必须记录
// 用途: 审计追踪 {action, entity_type, entity_id, payload, timestamp}
// 对齐: action_log 表
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,        // 日志ID (UUID)
    pub action_type: String,      // 操作类型 (存储为字符串)
    pub entity_type: String,      // 实体类型 (event / yard_slot / move_plan)
    pub entity_id: Option<String>, // 实体ID
    pub action_ts: NaiveDateTime, // 操作时间戳
    pub actor: String,            // 操作人 / 触发方

    pub payload_json: Option<JsonValue>, // 操作负载 (JSON)
    pub detail: Option<String>,          // 详细描述
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    SubmitEvent,     // 事件受理 (→ PROCESSING)
    CompleteEvent,   // 事件完成 (→ COMPLETED)
    FailEvent,       // 事件失败 (→ FAILED)
    RecoverEvent,    // 中断事件回收 (PROCESSING → FAILED)
    UpdateSlot,      // 人工维护箱位
    ImportSlots,     // 批量导入堆场布局
}

impl ActionType {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::SubmitEvent => "SubmitEvent",
            ActionType::CompleteEvent => "CompleteEvent",
            ActionType::FailEvent => "FailEvent",
            ActionType::RecoverEvent => "RecoverEvent",
            ActionType::UpdateSlot => "UpdateSlot",
            ActionType::ImportSlots => "ImportSlots",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "SubmitEvent" => Some(ActionType::SubmitEvent),
            "CompleteEvent" => Some(ActionType::CompleteEvent),
            "FailEvent" => Some(ActionType::FailEvent),
            "RecoverEvent" => Some(ActionType::RecoverEvent),
            "UpdateSlot" => Some(ActionType::UpdateSlot),
            "ImportSlots" => Some(ActionType::ImportSlots),
            _ => None,
        }
    }
}

// ==========================================
// ActionLog 辅助方法
// ==========================================
impl ActionLog {
    /// 创建新的操作日志
    ///
    /// # 参数
    /// - `action_type`: 操作类型
    /// - `entity_type`: 实体类型
    /// - `entity_id`: 实体ID (可选)
    /// - `actor`: 操作人
    pub fn new(
        action_type: ActionType,
        entity_type: &str,
        entity_id: Option<String>,
        actor: &str,
    ) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            action_type: action_type.as_str().to_string(),
            entity_type: entity_type.to_string(),
            entity_id,
            action_ts: chrono::Utc::now().naive_utc(),
            actor: actor.to_string(),
            payload_json: None,
            detail: None,
        }
    }

    /// 设置操作负载
    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload_json = Some(payload);
        self
    }

    /// 设置详细描述
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// 解析操作类型
    pub fn get_action_type(&self) -> Option<ActionType> {
        ActionType::from_str(&self.action_type)
    }
}
