// ==========================================
// 集装箱堆场作业规划系统 - 箱位分配器
// ==========================================
// 纯函数: 快照 + 落箱请求 → 空箱位 | YardFull
// 规则:
// 1. 只考虑空箱位
// 2. 重力约束: tier 1 恒可放; tier > 1 要求下层有箱
// 3. 排序: tier 升序 → bay → row → yard → block (全序,结果确定)
// ==========================================

use crate::domain::slot::Slot;
use crate::engine::error::{PlanningError, PlanningResult};
use crate::engine::snapshot::YardSnapshot;

#[derive(Debug, Clone, Default)]
pub struct SlotAllocator;

impl SlotAllocator {
    pub fn new() -> Self {
        Self
    }

    /// 选择落箱箱位
    ///
    /// # 参数
    /// - `snapshot`: 堆场快照
    /// - `is_reefer`: 冷藏箱标志 (分区策略预留,当前不影响结果)
    pub fn allocate<'a>(&self, snapshot: &'a YardSnapshot, is_reefer: bool) -> PlanningResult<&'a Slot> {
        let chosen = snapshot
            .empty()
            .filter(|slot| snapshot.is_supported(slot))
            .min_by(|a, b| {
                (a.key.tier, a.key.bay, a.key.row, &a.key.yard, &a.key.block).cmp(&(
                    b.key.tier,
                    b.key.bay,
                    b.key.row,
                    &b.key.yard,
                    &b.key.block,
                ))
            });

        match chosen {
            Some(slot) => {
                tracing::debug!(slot = %slot.key, is_reefer, "分配落箱箱位");
                Ok(slot)
            }
            None => Err(PlanningError::YardFull),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::slot::{ContainerCargo, SlotKey};
    use chrono::Utc;

    fn slot(block: &str, bay: i32, row: i32, tier: i32, container_id: Option<&str>) -> Slot {
        let now = Utc::now().naive_utc();
        let mut slot = Slot::empty(SlotKey::new("Y1", block, bay, row, tier), 40, now);
        if let Some(id) = container_id {
            slot.occupy(
                &ContainerCargo {
                    container_id: id.to_string(),
                    is_import: true,
                    is_export: false,
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
    fn test_prefers_lowest_tier_then_bay_then_row() {
        let snapshot = YardSnapshot::new(vec![
            slot("A", 1, 1, 1, Some("C1")),
            slot("A", 1, 1, 2, None),
            slot("A", 2, 2, 1, None),
            slot("A", 2, 1, 1, None),
        ]);
        let chosen = SlotAllocator::new().allocate(&snapshot, false).unwrap();
        assert_eq!(chosen.key, SlotKey::new("Y1", "A", 2, 1, 1));
    }

    #[test]
    fn test_tie_broken_by_block() {
        let snapshot = YardSnapshot::new(vec![slot("B", 1, 1, 1, None), slot("A", 1, 1, 1, None)]);
        let chosen = SlotAllocator::new().allocate(&snapshot, false).unwrap();
        assert_eq!(chosen.key.block, "A");
    }

    #[test]
    fn test_unsupported_slots_are_skipped() {
        let snapshot = YardSnapshot::new(vec![
            slot("A", 1, 1, 1, Some("C1")),
            slot("A", 2, 1, 1, Some("C2")),
            slot("A", 2, 1, 2, Some("C3")),
            slot("A", 2, 1, 3, None),
            slot("A", 1, 1, 3, None),
            slot("A", 1, 1, 2, None),
        ]);
        let chosen = SlotAllocator::new().allocate(&snapshot, true).unwrap();
        assert_eq!(chosen.key, SlotKey::new("Y1", "A", 1, 1, 2));
    }

    #[test]
    fn test_full_or_empty_yard_is_yard_full() {
        let full = YardSnapshot::new(vec![slot("A", 1, 1, 1, Some("C1"))]);
        assert!(matches!(SlotAllocator::new().allocate(&full, false), Err(PlanningError::YardFull)));

        let none = YardSnapshot::new(Vec::new());
        assert!(matches!(SlotAllocator::new().allocate(&none, false), Err(PlanningError::YardFull)));
    }

    #[test]
    fn test_allocation_is_deterministic() {
        let slots = vec![
            slot("B", 3, 2, 1, None),
            slot("A", 3, 2, 1, None),
            slot("A", 1, 4, 1, None),
        ];
        let mut reversed = slots.clone();
        reversed.reverse();

        let a = SlotAllocator::new().allocate(&YardSnapshot::new(slots), false).unwrap().key.clone();
        let b = SlotAllocator::new().allocate(&YardSnapshot::new(reversed), false).unwrap().key.clone();
        assert_eq!(a, b);
        assert_eq!(a, SlotKey::new("Y1", "A", 1, 4, 1));
    }
}
