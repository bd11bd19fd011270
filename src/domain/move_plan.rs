// ==========================================
// 集装箱堆场作业规划系统 - 作业计划领域模型
// ==========================================
// 一个完成的事件对应一条作业计划,入库后不可变
// 对齐: move_plan 表
// ==========================================

use crate::domain::types::MoveType;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovePlan {
    pub plan_id: String,          // 计划ID (UUID)
    pub event_id: i64,            // 关联事件
    pub event_time: NaiveDateTime, // 计划生成时间

    // ===== 作业时长 (秒, 相对作业开始) =====
    pub start_time: f64,
    pub end_time: f64,

    pub container_id: String,
    pub move_type: MoveType,

    // ===== 起讫位置 =====
    pub from_sid: String,
    pub from_tier: i32,
    pub to_sid: String,
    pub to_tier: i32,

    // ===== 设备与距离 =====
    pub distance_crane: f64,
    pub crane_id: String,
    pub from_truck_zone_id: String,
    pub to_truck_zone_id: String,
    pub truck_id: String,
    pub distance_internal_truck: f64,
    pub distance_external_truck: f64,
}

impl MovePlan {
    /// 作业时长 (秒)
    pub fn duration_s(&self) -> f64 {
        self.end_time - self.start_time
    }
}
