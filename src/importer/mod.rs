// ==========================================
// 集装箱堆场作业规划系统 - 导入层
// ==========================================
// 职责: 外部堆场布局导入、演示数据生成
// 支持: CSV
// ==========================================

pub mod error;
pub mod slot_csv;
pub mod yard_seed;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use slot_csv::{ImportSummary, SlotCsvImporter};
pub use yard_seed::{generate_layout, SeedParams};
