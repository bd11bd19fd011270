// ==========================================
// 集装箱堆场作业规划系统 - 在场箱定位
// ==========================================
// 纯函数: 快照 + 箱号 → 所在箱位 | ContainerNotFound
// 红线: 找不到就是找不到,不允许用其他箱位顶替
// ==========================================

use crate::domain::slot::Slot;
use crate::engine::error::{PlanningError, PlanningResult};
use crate::engine::snapshot::YardSnapshot;

#[derive(Debug, Clone, Default)]
pub struct ContainerLocator;

impl ContainerLocator {
    pub fn new() -> Self {
        Self
    }

    pub fn locate<'a>(&self, snapshot: &'a YardSnapshot, container_id: &str) -> PlanningResult<&'a Slot> {
        snapshot
            .find_container(container_id)
            .ok_or_else(|| PlanningError::ContainerNotFound {
                container_id: container_id.to_string(),
            })
    }

    /// 定位并确认可直接提取 (上层无箱)
    pub fn locate_retrievable<'a>(
        &self,
        snapshot: &'a YardSnapshot,
        container_id: &str,
    ) -> PlanningResult<&'a Slot> {
        let slot = self.locate(snapshot, container_id)?;
        if let Some(above) = snapshot.slot_above(slot).filter(|s| s.is_occupied()) {
            return Err(PlanningError::ContainerBlocked {
                container_id: container_id.to_string(),
                blocked_by: above.key.to_string(),
            });
        }
        Ok(slot)
    }
}
