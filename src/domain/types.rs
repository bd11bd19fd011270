// ==========================================
// 集装箱堆场作业规划系统 - 领域类型定义
// ==========================================
// 职责: 作业类型、事件状态等枚举
// 序列化格式: 与数据库存储值保持一致
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 作业类型 (Move Type)
// ==========================================
// 红线: 事件与作业计划必须显式存储 move_type,不允许下游推断
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveType {
    DropOff, // 进场落箱
    PickUp,  // 出场提箱
}

impl MoveType {
    /// 转换为数据库存储字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveType::DropOff => "drop_off",
            MoveType::PickUp => "pick_up",
        }
    }

    /// 从数据库字符串解析
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "drop_off" => Some(MoveType::DropOff),
            "pick_up" => Some(MoveType::PickUp),
            _ => None,
        }
    }
}

impl fmt::Display for MoveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 事件状态 (Event Status)
// ==========================================
// 状态机: PENDING → PROCESSING → COMPLETED | FAILED
// COMPLETED / FAILED 为终态,不可再迁移
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Pending,    // 已提交,尚未受理
    Processing, // 计划计算中
    Completed,  // 计划已提交,箱位已变更
    Failed,     // 失败,无任何箱位变更
}

impl EventStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "PENDING",
            EventStatus::Processing => "PROCESSING",
            EventStatus::Completed => "COMPLETED",
            EventStatus::Failed => "FAILED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(EventStatus::Pending),
            "PROCESSING" => Some(EventStatus::Processing),
            "COMPLETED" => Some(EventStatus::Completed),
            "FAILED" => Some(EventStatus::Failed),
            _ => None,
        }
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventStatus::Completed | EventStatus::Failed)
    }

    /// 状态迁移是否合法
    pub fn can_transition_to(&self, next: EventStatus) -> bool {
        match (self, next) {
            (EventStatus::Pending, EventStatus::Processing) => true,
            (EventStatus::Pending, EventStatus::Failed) => true,
            (EventStatus::Processing, EventStatus::Completed) => true,
            (EventStatus::Processing, EventStatus::Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}
