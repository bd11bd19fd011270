// ==========================================
// 集装箱堆场作业规划系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约束: 所有仓储共享同一个 Arc<Mutex<Connection>>
// ==========================================

pub mod action_log_repo;
pub mod error;
pub mod event_repo;
pub mod move_commit_repo;
pub mod move_plan_repo;
pub mod sql_utils;
pub mod yard_slot_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use event_repo::{EventQuery, YardEventRepository};
pub use move_commit_repo::MoveCommitRepository;
pub use move_plan_repo::MovePlanRepository;
pub use yard_slot_repo::{SlotStats, YardSlotRepository};
