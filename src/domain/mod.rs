// ==========================================
// 集装箱堆场作业规划系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod event;
pub mod move_plan;
pub mod slot;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use event::{EventIntake, NewYardEvent, YardEvent};
pub use move_plan::MovePlan;
pub use slot::{ContainerCargo, Slot, SlotKey, SlotMutation, GATE_IN_SID, GATE_OUT_SID};
pub use types::{EventStatus, MoveType};
