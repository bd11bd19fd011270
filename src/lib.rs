// ==========================================
// 集装箱堆场作业规划系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 箱位分配与作业计划引擎
//   集卡到场 → 分配/定位箱位 → 生成作业计划 → 原子提交
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 分配、定位、计划、生命周期
pub mod engine;

// 导入层 - 堆场布局导入与演示数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{EventStatus, MoveType};

// 领域实体
pub use domain::{ActionLog, ActionType, EventIntake, MovePlan, Slot, SlotKey, YardEvent};

// 引擎
pub use engine::{
    ContainerLocator, EventOutcome, EventProcessor, MovePlanBuilder, PlanningError, SlotAllocator,
    YardSnapshot,
};

// API
pub use api::{ApiError, YardApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "集装箱堆场作业规划系统";
