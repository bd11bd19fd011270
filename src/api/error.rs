// ==========================================
// 集装箱堆场作业规划系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型,转换下层错误为用户友好的错误消息
// 口径: 所有错误信息必须包含显式原因
// ==========================================

use crate::engine::error::PlanningError;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    /// 规划失败 (kind 为机器可读类型)
    #[error("规划失败 [{kind}]: {reason}")]
    PlanningFailed { kind: String, reason: String },

    // ==========================================
    // 并发控制错误
    // ==========================================
    #[error("箱位分配冲突: {0}")]
    AllocationConflict(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 并发控制错误
            RepositoryError::SlotConflict { slot, reason } => {
                ApiError::AllocationConflict(format!("{}: {}", slot, reason))
            }

            // 数据库错误
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }

            // 业务规则错误
            RepositoryError::BusinessRuleViolation(msg) => ApiError::BusinessRuleViolation(msg),
            RepositoryError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }

            // 数据质量错误
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }

            // 通用错误
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 PlanningError 转换
// ==========================================
impl From<PlanningError> for ApiError {
    fn from(err: PlanningError) -> Self {
        match err {
            PlanningError::InvalidEvent(msg) => ApiError::InvalidInput(msg),
            PlanningError::Storage(e) => ApiError::from(e),
            PlanningError::Internal(msg) => ApiError::InternalError(msg),
            other => ApiError::PlanningFailed {
                kind: other.kind().to_string(),
                reason: other.to_string(),
            },
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Repository(e) => ApiError::from(e),
            ImportError::FileNotFound(path) => ApiError::NotFound(format!("文件 {}", path)),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planning_errors_keep_kind() {
        let err: ApiError = PlanningError::YardFull.into();
        match err {
            ApiError::PlanningFailed { kind, .. } => assert_eq!(kind, "YARD_FULL"),
            other => panic!("unexpected: {other:?}"),
        }

        let err: ApiError = PlanningError::InvalidEvent("truck_id 不能为空".into()).into();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[test]
    fn test_repository_errors_map() {
        let err: ApiError = RepositoryError::SlotConflict {
            slot: "Y1-A-01-01/T1".into(),
            reason: "occupied".into(),
        }
        .into();
        assert!(matches!(err, ApiError::AllocationConflict(_)));

        let err: ApiError = ImportError::Repository(RepositoryError::BusinessRuleViolation("x".into())).into();
        assert!(matches!(err, ApiError::BusinessRuleViolation(_)));
    }
}
