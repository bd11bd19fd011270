// ==========================================
// 集装箱堆场作业规划系统 - 操作日志数据仓储
// ==========================================
// 红线: 所有事件状态迁移必须记录
// 对齐: action_log 表
// ==========================================


mod core;
mod queries;


pub use core::ActionLogRepository;
