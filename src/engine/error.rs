// ==========================================
// 集装箱堆场作业规划系统 - 引擎层错误类型
// ==========================================
// 每个失败都携带机器可读的 kind 与人工可读的原因
// kind 写入 yard_event.failure_kind
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 规划错误
#[derive(Error, Debug)]
pub enum PlanningError {
    #[error("堆场已满: 没有满足重力约束的空箱位")]
    YardFull,

    #[error("箱号不在场: {container_id}")]
    ContainerNotFound { container_id: String },

    #[error("箱 {container_id} 被压箱 (上层箱位 {blocked_by} 有箱),无法提箱")]
    ContainerBlocked { container_id: String, blocked_by: String },

    #[error("箱号已在场: {container_id} 位于 {slot}")]
    ContainerAlreadyInYard { container_id: String, slot: String },

    #[error("箱位分配冲突: {attempts} 次提交均因并发变更失败 ({last_reason})")]
    AllocationConflict { attempts: u32, last_reason: String },

    #[error("事件无效: {0}")]
    InvalidEvent(String),

    #[error("存储错误: {0}")]
    Storage(#[from] RepositoryError),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl PlanningError {
    /// 机器可读的失败类型
    pub fn kind(&self) -> &'static str {
        match self {
            PlanningError::YardFull => "YARD_FULL",
            PlanningError::ContainerNotFound { .. } => "CONTAINER_NOT_FOUND",
            PlanningError::ContainerBlocked { .. } => "CONTAINER_BLOCKED",
            PlanningError::ContainerAlreadyInYard { .. } => "CONTAINER_ALREADY_IN_YARD",
            PlanningError::AllocationConflict { .. } => "ALLOCATION_CONFLICT",
            PlanningError::InvalidEvent(_) => "INVALID_EVENT",
            PlanningError::Storage(_) => "STORAGE",
            PlanningError::Internal(_) => "INTERNAL",
        }
    }
}

/// Result 类型别名
pub type PlanningResult<T> = Result<T, PlanningError>;
