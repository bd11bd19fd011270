// ==========================================
// 集装箱堆场作业规划系统 - 堆场快照
// ==========================================
// 只读的时点视图: 规划开始时一次性读取,提交后丢弃
// 规划过程 (分配/定位/生成计划) 只读快照,不访问数据库
// ==========================================

use crate::domain::slot::{Slot, SlotKey};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct YardSnapshot {
    slots: Vec<Slot>,
    index: HashMap<SlotKey, usize>,
}

impl YardSnapshot {
    /// 由箱位列表构建快照 (按坐标排序)
    pub fn new(mut slots: Vec<Slot>) -> Self {
        slots.sort_by(|a, b| a.key.cmp(&b.key));
        let index = slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (slot.key.clone(), i))
            .collect();
        Self { slots, index }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, key: &SlotKey) -> Option<&Slot> {
        self.index.get(key).map(|&i| &self.slots[i])
    }

    pub fn slot_below(&self, slot: &Slot) -> Option<&Slot> {
        slot.key.below().and_then(|key| self.get(&key))
    }

    pub fn slot_above(&self, slot: &Slot) -> Option<&Slot> {
        self.get(&slot.key.above())
    }

    /// 箱位是否有支撑 (tier 1,或下层有箱)
    pub fn is_supported(&self, slot: &Slot) -> bool {
        slot.tier() <= 1 || self.slot_below(slot).map_or(false, Slot::is_occupied)
    }

    pub fn occupied(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter().filter(|s| s.is_occupied())
    }

    pub fn empty(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter().filter(|s| s.is_empty())
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied().count()
    }

    /// 按箱号精确查找
    pub fn find_container(&self, container_id: &str) -> Option<&Slot> {
        self.occupied()
            .find(|s| s.container_id.as_deref() == Some(container_id))
    }

    /// 违反重力约束的箱位 (有箱但无支撑)
    pub fn gravity_violations(&self) -> Vec<&Slot> {
        self.occupied().filter(|s| !self.is_supported(s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::slot::ContainerCargo;
    use chrono::Utc;

    fn slot(bay: i32, tier: i32, container_id: Option<&str>) -> Slot {
        let now = Utc::now().naive_utc();
        let mut slot = Slot::empty(SlotKey::new("Y1", "A", bay, 1, tier), 40, now);
        if let Some(id) = container_id {
            slot.occupy(
                &ContainerCargo {
                    container_id: id.to_string(),
                    is_import: false,
                    is_export: true,
                    is_reefer: false,
                    is_hazard: false,
                    is_dry: true,
                    weight_kg: 1.0,
                },
                now,
            );
        }
        slot
    }

    #[test]
    fn test_support_and_neighbours() {
        let snapshot = YardSnapshot::new(vec![
            slot(1, 2, None),
            slot(1, 1, Some("C1")),
            slot(2, 1, None),
            slot(2, 2, None),
        ]);

        let t2 = snapshot.get(&SlotKey::new("Y1", "A", 1, 1, 2)).unwrap();
        assert!(snapshot.is_supported(t2));
        assert_eq!(snapshot.slot_below(t2).unwrap().container_id.as_deref(), Some("C1"));

        let unsupported = snapshot.get(&SlotKey::new("Y1", "A", 2, 1, 2)).unwrap();
        assert!(!snapshot.is_supported(unsupported));
        assert_eq!(snapshot.occupied_count(), 1);
        assert_eq!(snapshot.slots()[0].key, SlotKey::new("Y1", "A", 1, 1, 1));
    }

    #[test]
    fn test_find_container_and_gravity_violations() {
        let snapshot = YardSnapshot::new(vec![slot(1, 1, None), slot(1, 2, Some("FLOAT"))]);
        assert_eq!(snapshot.find_container("FLOAT").unwrap().tier(), 2);
        assert!(snapshot.find_container("NOPE").is_none());
        assert_eq!(snapshot.gravity_violations().len(), 1);
    }
}
