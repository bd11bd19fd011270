// ==========================================
// 集装箱堆场作业规划系统 - 应用层
// ==========================================
// 职责: 应用状态装配
// ==========================================

pub mod state;

pub use state::{get_default_db_path, AppState};
