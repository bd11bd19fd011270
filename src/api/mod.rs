// ==========================================
// 集装箱堆场作业规划系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供 CLI / 外部宿主调用
// ==========================================

pub mod error;
pub mod yard_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use yard_api::{
    EventActionView, HealthReport, SlotUpdate, YardApi, YardStatusReport, DEFAULT_EVENT_LIMIT,
};
