// ==========================================
// 集装箱堆场作业规划系统 - 作业计划生成
// ==========================================
// 职责: 组合 分配器/定位器/代价模型 → MovePlan + 箱位变更
// 红线: 纯计算,只读快照,不访问数据库
// 落箱: GATE_IN/1 → 分配箱位
// 提箱: 所在箱位 → GATE_OUT/1
// ==========================================

use crate::domain::event::YardEvent;
use crate::domain::move_plan::MovePlan;
use crate::domain::slot::SlotMutation;
use crate::domain::types::MoveType;
use crate::engine::allocator::SlotAllocator;
use crate::engine::clock::Clock;
use crate::engine::cost_model::{CostModel, MoveEndpoint};
use crate::engine::error::{PlanningError, PlanningResult};
use crate::engine::locator::ContainerLocator;
use crate::engine::snapshot::YardSnapshot;
use std::sync::Arc;

/// 生成结果: 作业计划 + 提交时要执行的箱位变更
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedMove {
    pub plan: MovePlan,
    pub mutation: SlotMutation,
}

pub struct MovePlanBuilder {
    allocator: SlotAllocator,
    locator: ContainerLocator,
    cost_model: Arc<dyn CostModel>,
    clock: Arc<dyn Clock>,
}

impl MovePlanBuilder {
    pub fn new(cost_model: Arc<dyn CostModel>, clock: Arc<dyn Clock>) -> Self {
        Self {
            allocator: SlotAllocator::new(),
            locator: ContainerLocator::new(),
            cost_model,
            clock,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// 基于快照为事件生成作业计划
    pub fn build(&self, event: &YardEvent, snapshot: &YardSnapshot) -> PlanningResult<PlannedMove> {
        let body = &event.body;

        let (from, to, mutation) = match body.move_type {
            MoveType::DropOff => {
                if let Some(existing) = snapshot.find_container(&body.container_id) {
                    return Err(PlanningError::ContainerAlreadyInYard {
                        container_id: body.container_id.clone(),
                        slot: existing.key.to_string(),
                    });
                }
                let target = self.allocator.allocate(snapshot, body.is_reefer)?;
                (
                    MoveEndpoint::gate_in(),
                    MoveEndpoint::slot(&target.key),
                    SlotMutation::Occupy {
                        key: target.key.clone(),
                        cargo: body.cargo(),
                    },
                )
            }
            MoveType::PickUp => {
                let source = self.locator.locate_retrievable(snapshot, &body.container_id)?;
                (
                    MoveEndpoint::slot(&source.key),
                    MoveEndpoint::gate_out(),
                    SlotMutation::Vacate {
                        key: source.key.clone(),
                        container_id: body.container_id.clone(),
                    },
                )
            }
        };

        let cost = self.cost_model.estimate(body.move_type, &from, &to);

        let plan = MovePlan {
            plan_id: uuid::Uuid::new_v4().to_string(),
            event_id: event.event_id,
            event_time: self.clock.now(),
            start_time: 0.0,
            end_time: cost.duration_s,
            container_id: body.container_id.clone(),
            move_type: body.move_type,
            from_sid: from.sid,
            from_tier: from.tier,
            to_sid: to.sid,
            to_tier: to.tier,
            distance_crane: cost.distance_crane,
            crane_id: cost.crane_id,
            from_truck_zone_id: cost.from_truck_zone_id,
            to_truck_zone_id: cost.to_truck_zone_id,
            truck_id: body.truck_id.clone(),
            distance_internal_truck: cost.distance_internal_truck,
            distance_external_truck: cost.distance_external_truck,
        };

        Ok(PlannedMove { plan, mutation })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::NewYardEvent;
    use crate::domain::slot::{ContainerCargo, Slot, SlotKey, GATE_IN_SID, GATE_OUT_SID};
    use crate::domain::types::EventStatus;
    use crate::engine::clock::FixedClock;
    use crate::engine::cost_model::FixedCostModel;
    use chrono::NaiveDate;

    fn at() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 5, 1).unwrap().and_hms_opt(8, 0, 0).unwrap()
    }

    fn builder() -> MovePlanBuilder {
        MovePlanBuilder::new(Arc::new(FixedCostModel::default()), Arc::new(FixedClock(at())))
    }

    fn event(container_id: &str, move_type: MoveType) -> YardEvent {
        YardEvent {
            event_id: 11,
            body: NewYardEvent {
                truck_id: "TRK-9".to_string(),
                container_id: container_id.to_string(),
                move_type,
                is_import: false,
                is_export: true,
                is_reefer: false,
                is_hazard: true,
                is_dry: false,
                is_inter_transhipment: false,
                is_intra_transhipment: false,
                weight_kg: 9000.0,
                size_ft: 20,
                event_time: at(),
            },
            status: EventStatus::Processing,
            failure_kind: None,
            failure_reason: None,
            attempts: 0,
            created_at: at(),
            updated_at: at(),
        }
    }

    fn slot(tier: i32, container_id: Option<&str>) -> Slot {
        let mut slot = Slot::empty(SlotKey::new("Y1", "A", 1, 1, tier), 40, at());
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
                at(),
            );
        }
        slot
    }

    #[test]
    fn test_drop_off_plan_goes_gate_in_to_slot() {
        let snapshot = YardSnapshot::new(vec![slot(1, Some("C1")), slot(2, None)]);
        let planned = builder().build(&event("NEW1", MoveType::DropOff), &snapshot).unwrap();

        assert_eq!(planned.plan.from_sid, GATE_IN_SID);
        assert_eq!(planned.plan.from_tier, 1);
        assert_eq!(planned.plan.to_sid, "Y1-A-01-01");
        assert_eq!(planned.plan.to_tier, 2);
        assert_eq!(planned.plan.move_type, MoveType::DropOff);
        assert_eq!(planned.plan.event_time, at());
        assert_eq!(planned.plan.duration_s(), 20.0);
        match planned.mutation {
            SlotMutation::Occupy { key, cargo } => {
                assert_eq!(key.tier, 2);
                assert!(cargo.is_hazard);
                assert!(cargo.is_export);
            }
            other => panic!("unexpected mutation: {other:?}"),
        }
    }

    #[test]
    fn test_pick_up_plan_goes_slot_to_gate_out() {
        let snapshot = YardSnapshot::new(vec![slot(1, Some("C1")), slot(2, None)]);
        let planned = builder().build(&event("C1", MoveType::PickUp), &snapshot).unwrap();

        assert_eq!(planned.plan.from_sid, "Y1-A-01-01");
        assert_eq!(planned.plan.from_tier, 1);
        assert_eq!(planned.plan.to_sid, GATE_OUT_SID);
        assert_eq!(planned.plan.to_tier, 1);
        assert_eq!(planned.plan.truck_id, "TRK-9");
        assert!(matches!(planned.mutation, SlotMutation::Vacate { .. }));
    }

    #[test]
    fn test_failures_surface_planning_errors() {
        let b = builder();
        let full = YardSnapshot::new(vec![slot(1, Some("C1"))]);
        assert!(matches!(
            b.build(&event("NEW1", MoveType::DropOff), &full),
            Err(PlanningError::YardFull)
        ));
        assert!(matches!(
            b.build(&event("C1", MoveType::DropOff), &full),
            Err(PlanningError::ContainerAlreadyInYard { .. })
        ));
        assert!(matches!(
            b.build(&event("GHOST", MoveType::PickUp), &full),
            Err(PlanningError::ContainerNotFound { .. })
        ));

        let stacked = YardSnapshot::new(vec![slot(1, Some("C1")), slot(2, Some("C2"))]);
        assert!(matches!(
            b.build(&event("C1", MoveType::PickUp), &stacked),
            Err(PlanningError::ContainerBlocked { .. })
        ));
    }
}
