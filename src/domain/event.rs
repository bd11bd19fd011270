// ==========================================
// 集装箱堆场作业规划系统 - 集卡事件领域模型
// ==========================================
// 一次集卡到场 = 一个事件
// 事件只由 EventProcessor 变更,永不删除 (审计追踪)
// ==========================================

use crate::domain::slot::ContainerCargo;
use crate::domain::types::{EventStatus, MoveType};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// EventIntake - 外部提交的事件报文
// ==========================================
// 标志位沿用 0/1 整数口径
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventIntake {
    pub truck_id: String,
    pub container_id: String,
    #[serde(default)]
    pub is_drop_off: i32,
    #[serde(default)]
    pub is_pick_up: i32,
    #[serde(default)]
    pub is_import: i32,
    #[serde(default)]
    pub is_export: i32,
    #[serde(default)]
    pub is_reefer: i32,
    #[serde(default)]
    pub is_hazard: i32,
    #[serde(default)]
    pub is_dry: i32,
    #[serde(default)]
    pub is_inter_transhipment: i32,
    #[serde(default)]
    pub is_intra_transhipment: i32,
    #[serde(default)]
    pub weight_kg: f64,
    #[serde(default = "default_size_ft")]
    pub size_ft: i32,
    pub time: DateTime<Utc>,
}

fn default_size_ft() -> i32 {
    40
}

impl EventIntake {
    /// 解析作业类型
    ///
    /// is_drop_off 为权威标志: 两个标志同时为 1 时按落箱处理;
    /// 两个标志都不为 1 时返回 None (报文无效)
    pub fn move_type(&self) -> Option<MoveType> {
        if self.is_drop_off == 1 {
            Some(MoveType::DropOff)
        } else if self.is_pick_up == 1 {
            Some(MoveType::PickUp)
        } else {
            None
        }
    }

    /// 校验并转换为待入库事件
    ///
    /// # 返回
    /// - Ok(NewYardEvent): 校验通过
    /// - Err(String): 校验失败原因
    pub fn validate(&self) -> Result<NewYardEvent, String> {
        let truck_id = self.truck_id.trim();
        let container_id = self.container_id.trim();

        if truck_id.is_empty() {
            return Err("truck_id 不能为空".to_string());
        }
        if container_id.is_empty() {
            return Err("container_id 不能为空".to_string());
        }
        let move_type = self
            .move_type()
            .ok_or_else(|| "is_drop_off 与 is_pick_up 至少一个为 1".to_string())?;
        if self.weight_kg < 0.0 {
            return Err(format!("weight_kg 不能为负数: {}", self.weight_kg));
        }

        Ok(NewYardEvent {
            truck_id: truck_id.to_string(),
            container_id: container_id.to_string(),
            move_type,
            is_import: self.is_import == 1,
            is_export: self.is_export == 1,
            is_reefer: self.is_reefer == 1,
            is_hazard: self.is_hazard == 1,
            is_dry: self.is_dry == 1,
            is_inter_transhipment: self.is_inter_transhipment == 1,
            is_intra_transhipment: self.is_intra_transhipment == 1,
            weight_kg: self.weight_kg,
            size_ft: self.size_ft,
            event_time: self.time.naive_utc(),
        })
    }
}

// ==========================================
// NewYardEvent - 校验后的待入库事件
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewYardEvent {
    pub truck_id: String,
    pub container_id: String,
    pub move_type: MoveType,
    pub is_import: bool,
    pub is_export: bool,
    pub is_reefer: bool,
    pub is_hazard: bool,
    pub is_dry: bool,
    pub is_inter_transhipment: bool,
    pub is_intra_transhipment: bool,
    pub weight_kg: f64,
    pub size_ft: i32,
    pub event_time: NaiveDateTime,
}

impl NewYardEvent {
    /// 落箱时写入箱位的箱属性
    pub fn cargo(&self) -> ContainerCargo {
        ContainerCargo {
            container_id: self.container_id.clone(),
            is_import: self.is_import,
            is_export: self.is_export,
            is_reefer: self.is_reefer,
            is_hazard: self.is_hazard,
            is_dry: self.is_dry,
            weight_kg: self.weight_kg,
        }
    }
}

// ==========================================
// YardEvent - 已入库事件
// ==========================================
// 对齐: yard_event 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YardEvent {
    pub event_id: i64,
    #[serde(flatten)]
    pub body: NewYardEvent,
    pub status: EventStatus,
    pub failure_kind: Option<String>,   // 失败类型 (机器可读)
    pub failure_reason: Option<String>, // 失败原因 (人工可读)
    pub attempts: i32,                  // 提交尝试次数
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
