// ==========================================
// 集装箱堆场作业规划系统 - 引擎层
// ==========================================
// 职责: 箱位分配、在场箱定位、作业计划生成、事件生命周期编排
// 红线: 分配/定位/计划生成为纯计算,只读快照
// 红线: 所有箱位变更只经 EventProcessor 的原子提交
// ==========================================

pub mod allocator;
pub mod audit;
pub mod clock;
pub mod cost_model;
pub mod error;
pub mod locator;
pub mod move_plan_builder;
pub mod processor;
pub mod repositories;
pub mod snapshot;

// 重导出核心引擎
pub use allocator::SlotAllocator;
pub use audit::{AuditRecord, AuditSink, NoOpAuditSink, OptionalAuditSink};
pub use clock::{Clock, FixedClock, SystemClock};
pub use cost_model::{
    build_cost_model, CoordinateCostModel, CostModel, FixedCostModel, MoveCost, MoveEndpoint,
    RandomizedCostModel,
};
pub use error::{PlanningError, PlanningResult};
pub use locator::ContainerLocator;
pub use move_plan_builder::{MovePlanBuilder, PlannedMove};
pub use processor::{EventOutcome, EventProcessor};
pub use repositories::YardRepositories;
pub use snapshot::YardSnapshot;
