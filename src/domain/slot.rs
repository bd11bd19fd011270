// ==========================================
// 集装箱堆场作业规划系统 - 箱位领域模型
// ==========================================
// 红线: 重力约束: tier > 1 的箱位只有在下层箱位有箱时才能放箱
// 箱位永不删除,只变更占用状态
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 进场闸口符号坐标
pub const GATE_IN_SID: &str = "GATE_IN";
/// 出场闸口符号坐标
pub const GATE_OUT_SID: &str = "GATE_OUT";

// ==========================================
// SlotKey - 箱位坐标 (yard, block, bay, row, tier)
// ==========================================
// 字段顺序即排序顺序,与 list_slots 的排序口径一致
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    pub yard: String,
    pub block: String,
    pub bay: i32,
    pub row: i32,
    pub tier: i32,
}

impl SlotKey {
    pub fn new(yard: impl Into<String>, block: impl Into<String>, bay: i32, row: i32, tier: i32) -> Self {
        Self {
            yard: yard.into(),
            block: block.into(),
            bay,
            row,
            tier,
        }
    }

    /// 堆位符号坐标: "{yard}-{block}-{bay:02}-{row:02}"
    pub fn sid(&self) -> String {
        format!("{}-{}-{:02}-{:02}", self.yard, self.block, self.bay, self.row)
    }

    /// 同一堆位的下一层坐标 (tier 1 无下层)
    pub fn below(&self) -> Option<SlotKey> {
        if self.tier <= 1 {
            return None;
        }
        Some(SlotKey {
            tier: self.tier - 1,
            ..self.clone()
        })
    }

    /// 同一堆位的上一层坐标
    pub fn above(&self) -> SlotKey {
        SlotKey {
            tier: self.tier + 1,
            ..self.clone()
        }
    }

    /// 是否同一堆位 (yard, block, bay, row)
    pub fn same_stack(&self, other: &SlotKey) -> bool {
        self.yard == other.yard
            && self.block == other.block
            && self.bay == other.bay
            && self.row == other.row
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/T{}", self.sid(), self.tier)
    }
}

// ==========================================
// Slot - 箱位
// ==========================================
// 对齐: yard_slot 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub key: SlotKey,
    pub container_id: Option<String>, // 在场箱号 (独占)
    pub size_ft: i32,                 // 箱位尺寸 (20/40)

    // ===== 在场箱属性 =====
    pub is_import: bool,
    pub is_export: bool,
    pub is_reefer: bool,
    pub is_hazard: bool,
    pub is_dry: bool,
    pub weight_kg: f64,

    pub updated_at: NaiveDateTime,
}

impl Slot {
    /// 创建空箱位
    pub fn empty(key: SlotKey, size_ft: i32, updated_at: NaiveDateTime) -> Self {
        Self {
            key,
            container_id: None,
            size_ft,
            is_import: false,
            is_export: false,
            is_reefer: false,
            is_hazard: false,
            is_dry: true,
            weight_kg: 0.0,
            updated_at,
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.container_id.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.container_id.is_none()
    }

    pub fn sid(&self) -> String {
        self.key.sid()
    }

    pub fn tier(&self) -> i32 {
        self.key.tier
    }

    /// 按落箱事件的箱属性占用箱位
    pub fn occupy(&mut self, cargo: &ContainerCargo, at: NaiveDateTime) {
        self.container_id = Some(cargo.container_id.clone());
        self.is_import = cargo.is_import;
        self.is_export = cargo.is_export;
        self.is_reefer = cargo.is_reefer;
        self.is_hazard = cargo.is_hazard;
        self.is_dry = cargo.is_dry;
        self.weight_kg = cargo.weight_kg;
        self.updated_at = at;
    }

    /// 清空箱位 (属性复位)
    pub fn vacate(&mut self, at: NaiveDateTime) {
        self.container_id = None;
        self.is_import = false;
        self.is_export = false;
        self.is_reefer = false;
        self.is_hazard = false;
        self.is_dry = true;
        self.weight_kg = 0.0;
        self.updated_at = at;
    }
}

// ==========================================
// ContainerCargo - 落箱时写入箱位的箱属性
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerCargo {
    pub container_id: String,
    pub is_import: bool,
    pub is_export: bool,
    pub is_reefer: bool,
    pub is_hazard: bool,
    pub is_dry: bool,
    pub weight_kg: f64,
}

// ==========================================
// SlotMutation - 提交时需要执行的箱位变更
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SlotMutation {
    /// 落箱: 目标箱位必须仍为空且有支撑
    Occupy { key: SlotKey, cargo: ContainerCargo },
    /// 提箱: 目标箱位必须仍为该箱且上方无箱
    Vacate { key: SlotKey, container_id: String },
}

impl SlotMutation {
    pub fn key(&self) -> &SlotKey {
        match self {
            SlotMutation::Occupy { key, .. } => key,
            SlotMutation::Vacate { key, .. } => key,
        }
    }

    pub fn container_id(&self) -> &str {
        match self {
            SlotMutation::Occupy { cargo, .. } => &cargo.container_id,
            SlotMutation::Vacate { container_id, .. } => container_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sid_is_zero_padded() {
        let key = SlotKey::new("Y1", "A", 3, 7, 2);
        assert_eq!(key.sid(), "Y1-A-03-07");
        assert_eq!(key.to_string(), "Y1-A-03-07/T2");
    }

    #[test]
    fn test_below_and_above() {
        let ground = SlotKey::new("Y1", "A", 1, 1, 1);
        assert!(ground.below().is_none());
        assert_eq!(ground.above().tier, 2);
        assert_eq!(ground.above().below(), Some(ground.clone()));
        assert!(ground.same_stack(&ground.above()));
        assert!(!ground.same_stack(&SlotKey::new("Y1", "A", 1, 2, 1)));
    }

    #[test]
    fn test_key_ordering_follows_coordinate_hierarchy() {
        let mut keys = vec![
            SlotKey::new("Y1", "B", 1, 1, 1),
            SlotKey::new("Y1", "A", 2, 1, 1),
            SlotKey::new("Y1", "A", 1, 1, 2),
            SlotKey::new("Y1", "A", 1, 1, 1),
        ];
        keys.sort();
        assert_eq!(keys[0], SlotKey::new("Y1", "A", 1, 1, 1));
        assert_eq!(keys[1], SlotKey::new("Y1", "A", 1, 1, 2));
        assert_eq!(keys[3], SlotKey::new("Y1", "B", 1, 1, 1));
    }
}
