// ==========================================
// 集装箱堆场作业规划系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 行号口径: 数据行从 1 开始 (不含表头)
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 数据质量错误 =====
    #[error("字段值错误 (行 {row}, 字段 {field}): {message}")]
    FieldValueError {
        row: usize,
        field: String,
        message: String,
    },

    #[error("箱位重复 (行 {row}): {slot}")]
    DuplicateSlot { row: usize, slot: String },

    #[error("箱号重复 (行 {row}): {container_id}")]
    DuplicateContainer { row: usize, container_id: String },

    #[error("重力约束违反: {0}")]
    GravityViolation(String),

    // ===== 数据库错误 =====
    #[error("写入失败: {0}")]
    Repository(#[from] RepositoryError),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
