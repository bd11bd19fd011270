// ==========================================
// 集装箱堆场作业规划系统 - 事件处理器
// ==========================================
// 职责: 编排单个事件的完整生命周期
//   受理(PROCESSING) → 读快照 → 生成计划 → 原子提交(COMPLETED) | 失败(FAILED)
// 并发控制:
// - 规划只读内存快照;提交在 IMMEDIATE 事务内复核快照前提
// - 复核失败 (SlotConflict) → 重新读快照重算,最多 max_commit_attempts 次
// - 重算本身失败时返回真实原因 (YardFull / ContainerNotFound ...)
// 红线: 失败事件不做任何箱位变更;失败事件不自动重试
// ==========================================

use crate::domain::action_log::ActionType;
use crate::domain::event::{EventIntake, NewYardEvent, YardEvent};
use crate::domain::move_plan::MovePlan;
use crate::domain::slot::SlotMutation;
use crate::domain::types::{EventStatus, MoveType};
use crate::engine::audit::{AuditRecord, OptionalAuditSink};
use crate::engine::error::{PlanningError, PlanningResult};
use crate::engine::move_plan_builder::MovePlanBuilder;
use crate::engine::repositories::YardRepositories;
use crate::engine::snapshot::YardSnapshot;
use crate::repository::error::RepositoryError;
use serde::{Deserialize, Serialize};
use serde_json::json;

const ENTITY_EVENT: &str = "event";

/// 中断事件的失败原因
pub const INTERRUPTED_REASON: &str = "interrupted";

/// 单个事件的处理结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventOutcome {
    pub event_id: i64,
    pub status: EventStatus,
    pub move_type: MoveType,
    pub plan: Option<MovePlan>,
    pub failure_kind: Option<String>,
    pub failure_reason: Option<String>,
    pub attempts: u32,
}

impl EventOutcome {
    pub fn is_completed(&self) -> bool {
        self.status == EventStatus::Completed
    }
}

pub struct EventProcessor {
    repos: YardRepositories,
    builder: MovePlanBuilder,
    audit: OptionalAuditSink,
    max_commit_attempts: u32,
}

impl EventProcessor {
    pub fn new(
        repos: YardRepositories,
        builder: MovePlanBuilder,
        audit: OptionalAuditSink,
        max_commit_attempts: u32,
    ) -> Self {
        Self {
            repos,
            builder,
            audit,
            max_commit_attempts: max_commit_attempts.max(1),
        }
    }

    pub fn repositories(&self) -> &YardRepositories {
        &self.repos
    }

    /// 校验报文后处理
    ///
    /// 报文无效时不创建事件,直接返回 InvalidEvent
    pub fn submit(&self, intake: &EventIntake) -> PlanningResult<EventOutcome> {
        let event = intake.validate().map_err(PlanningError::InvalidEvent)?;
        self.process(&event)
    }

    /// 处理一个已校验的事件
    ///
    /// # 返回
    /// - `Ok(outcome)`: 事件已到达终态 (COMPLETED 或 FAILED)
    /// - `Err(Storage)`: 事件无法入库,或失败状态无法写回
    pub fn process(&self, new_event: &NewYardEvent) -> PlanningResult<EventOutcome> {
        let now = self.builder.clock().now();
        let event_id = self.repos.event_repo.create_processing(new_event, now)?;

        let span = tracing::info_span!("process_event", event_id, container_id = %new_event.container_id);
        let _guard = span.enter();

        tracing::info!(move_type = %new_event.move_type, truck_id = %new_event.truck_id, "事件受理");
        self.audit.emit(
            AuditRecord::new(ActionType::SubmitEvent, ENTITY_EVENT, Some(event_id.to_string()))
                .with_payload(json!({
                    "event_id": event_id,
                    "truck_id": new_event.truck_id,
                    "container_id": new_event.container_id,
                    "move_type": new_event.move_type.as_str(),
                    "status": EventStatus::Processing.to_db_str(),
                }))
                .at(now),
        );

        let event = self
            .repos
            .event_repo
            .find_by_id(event_id)?
            .ok_or_else(|| PlanningError::Internal(format!("事件 {} 入库后不可读", event_id)))?;

        match self.plan_and_commit(&event) {
            Ok((plan, attempts)) => {
                tracing::info!(
                    attempts,
                    from = %format!("{}/{}", plan.from_sid, plan.from_tier),
                    to = %format!("{}/{}", plan.to_sid, plan.to_tier),
                    "事件完成"
                );
                self.audit.emit(
                    AuditRecord::new(ActionType::CompleteEvent, ENTITY_EVENT, Some(event_id.to_string()))
                        .with_payload(json!({
                            "event_id": event_id,
                            "plan_id": plan.plan_id,
                            "from_sid": plan.from_sid,
                            "from_tier": plan.from_tier,
                            "to_sid": plan.to_sid,
                            "to_tier": plan.to_tier,
                            "attempts": attempts,
                            "status": EventStatus::Completed.to_db_str(),
                        })),
                );

                Ok(EventOutcome {
                    event_id,
                    status: EventStatus::Completed,
                    move_type: event.body.move_type,
                    plan: Some(plan),
                    failure_kind: None,
                    failure_reason: None,
                    attempts,
                })
            }
            Err((error, attempts)) => self.fail_event(&event, error, attempts),
        }
    }

    /// 回收中断事件 (启动时调用)
    pub fn recover_interrupted(&self) -> PlanningResult<Vec<i64>> {
        let now = self.builder.clock().now();
        let kind = PlanningError::Internal(String::new()).kind();
        let ids = self
            .repos
            .event_repo
            .fail_stale_processing(kind, INTERRUPTED_REASON, now)?;

        for event_id in &ids {
            tracing::warn!(event_id, "中断事件已标记为 FAILED");
            self.audit.emit(
                AuditRecord::new(ActionType::RecoverEvent, ENTITY_EVENT, Some(event_id.to_string()))
                    .with_payload(json!({
                        "event_id": event_id,
                        "failure_kind": kind,
                        "failure_reason": INTERRUPTED_REASON,
                        "status": EventStatus::Failed.to_db_str(),
                    }))
                    .at(now),
            );
        }
        Ok(ids)
    }

    // ==========================================
    // 内部流程
    // ==========================================

    /// 快照 → 计划 → 提交,冲突时重读快照
    ///
    /// 返回 (计划, 提交尝试次数) 或 (错误, 提交尝试次数)
    fn plan_and_commit(&self, event: &YardEvent) -> Result<(MovePlan, u32), (PlanningError, u32)> {
        let mut last_reason = String::new();

        for attempt in 1..=self.max_commit_attempts {
            let slots = self
                .repos
                .slot_repo
                .list_slots()
                .map_err(|e| (PlanningError::from(e), attempt))?;
            let snapshot = YardSnapshot::new(slots);

            let planned = self.builder.build(event, &snapshot).map_err(|e| (e, attempt))?;
            tracing::debug!(attempt, slot = %planned.mutation.key(), "提交作业");

            let now = self.builder.clock().now();
            match self.repos.commit_repo.commit_move(
                event.event_id,
                &planned.mutation,
                &planned.plan,
                attempt as i32,
                now,
            ) {
                Ok(()) => return Ok((planned.plan, attempt)),
                Err(RepositoryError::SlotConflict { slot, reason }) => {
                    tracing::warn!(attempt, slot = %slot, reason = %reason, "提交冲突，重读快照");
                    last_reason = format!("{}: {}", slot, reason);
                }
                Err(RepositoryError::UniqueConstraintViolation(msg)) => {
                    let error = match &planned.mutation {
                        SlotMutation::Occupy { key, cargo } => PlanningError::ContainerAlreadyInYard {
                            container_id: cargo.container_id.clone(),
                            slot: format!("{} ({})", key, msg),
                        },
                        SlotMutation::Vacate { .. } => {
                            PlanningError::Storage(RepositoryError::UniqueConstraintViolation(msg))
                        }
                    };
                    return Err((error, attempt));
                }
                Err(e) => return Err((PlanningError::Storage(e), attempt)),
            }
        }

        Err((
            PlanningError::AllocationConflict {
                attempts: self.max_commit_attempts,
                last_reason,
            },
            self.max_commit_attempts,
        ))
    }

    fn fail_event(&self, event: &YardEvent, error: PlanningError, attempts: u32) -> PlanningResult<EventOutcome> {
        let kind = error.kind();
        let reason = error.to_string();
        let now = self.builder.clock().now();

        tracing::info!(kind, reason = %reason, attempts, "事件失败");
        self.repos
            .event_repo
            .mark_failed(event.event_id, kind, &reason, attempts as i32, now)?;

        self.audit.emit(
            AuditRecord::new(ActionType::FailEvent, ENTITY_EVENT, Some(event.event_id.to_string()))
                .with_payload(json!({
                    "event_id": event.event_id,
                    "failure_kind": kind,
                    "failure_reason": reason,
                    "attempts": attempts,
                    "status": EventStatus::Failed.to_db_str(),
                }))
                .with_detail(reason.clone())
                .at(now),
        );

        Ok(EventOutcome {
            event_id: event.event_id,
            status: EventStatus::Failed,
            move_type: event.body.move_type,
            plan: None,
            failure_kind: Some(kind.to_string()),
            failure_reason: Some(reason),
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::slot::{Slot, SlotKey};
    use crate::engine::clock::FixedClock;
    use crate::engine::cost_model::FixedCostModel;
    use chrono::{NaiveDate, NaiveDateTime};
    use rusqlite::Connection;
    use std::sync::{Arc, Mutex};

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap().and_hms_opt(9, 0, 0).unwrap()
    }

    fn setup(slots: Vec<Slot>) -> EventProcessor {
        crate::logging::init_test();
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        let repos = YardRepositories::from_connection(Arc::new(Mutex::new(conn)));
        repos.slot_repo.replace_all(&slots).unwrap();

        let audit = OptionalAuditSink::with_sink(repos.action_log_repo.clone());
        let builder = MovePlanBuilder::new(Arc::new(FixedCostModel::default()), Arc::new(FixedClock(at())));
        EventProcessor::new(repos, builder, audit, 3)
    }

    fn stack(tiers: i32) -> Vec<Slot> {
        (1..=tiers)
            .map(|tier| Slot::empty(SlotKey::new("Y1", "A", 1, 1, tier), 40, at()))
            .collect()
    }

    fn event(container_id: &str, move_type: MoveType) -> NewYardEvent {
        NewYardEvent {
            truck_id: "T1".to_string(),
            container_id: container_id.to_string(),
            move_type,
            is_import: true,
            is_export: false,
            is_reefer: false,
            is_hazard: false,
            is_dry: true,
            is_inter_transhipment: false,
            is_intra_transhipment: false,
            weight_kg: 15000.0,
            size_ft: 40,
            event_time: at(),
        }
    }

    #[test]
    fn test_drop_off_completes_and_audits() {
        let processor = setup(stack(2));
        let outcome = processor.process(&event("C1", MoveType::DropOff)).unwrap();

        assert!(outcome.is_completed());
        assert_eq!(outcome.attempts, 1);
        let plan = outcome.plan.unwrap();
        assert_eq!(plan.to_tier, 1);

        let repos = processor.repositories();
        let stored = repos.event_repo.find_by_id(outcome.event_id).unwrap().unwrap();
        assert_eq!(stored.status, EventStatus::Completed);
        assert_eq!(repos.plan_repo.find_by_event_id(outcome.event_id).unwrap().unwrap(), plan);

        let trail = repos
            .action_log_repo
            .find_by_entity("event", &outcome.event_id.to_string())
            .unwrap();
        let actions: Vec<_> = trail.iter().map(|l| l.action_type.as_str()).collect();
        assert_eq!(actions, vec!["SubmitEvent", "CompleteEvent"]);
    }

    #[test]
    fn test_failure_records_kind_without_mutation() {
        let processor = setup(stack(1));
        let outcome = processor.process(&event("GHOST", MoveType::PickUp)).unwrap();

        assert_eq!(outcome.status, EventStatus::Failed);
        assert_eq!(outcome.failure_kind.as_deref(), Some("CONTAINER_NOT_FOUND"));
        assert!(outcome.plan.is_none());

        let repos = processor.repositories();
        assert!(repos.slot_repo.list_slots().unwrap().iter().all(Slot::is_empty));
        assert_eq!(repos.plan_repo.count().unwrap(), 0);
        let stored = repos.event_repo.find_by_id(outcome.event_id).unwrap().unwrap();
        assert_eq!(stored.failure_kind.as_deref(), Some("CONTAINER_NOT_FOUND"));
    }

    #[test]
    fn test_invalid_intake_creates_no_event() {
        let processor = setup(stack(1));
        let intake = EventIntake {
            truck_id: "T1".to_string(),
            container_id: "C1".to_string(),
            is_drop_off: 0,
            is_pick_up: 0,
            is_import: 0,
            is_export: 0,
            is_reefer: 0,
            is_hazard: 0,
            is_dry: 0,
            is_inter_transhipment: 0,
            is_intra_transhipment: 0,
            weight_kg: 0.0,
            size_ft: 40,
            time: chrono::Utc::now(),
        };

        let err = processor.submit(&intake).unwrap_err();
        assert_eq!(err.kind(), "INVALID_EVENT");
        assert!(processor.repositories().event_repo.list_recent(10).unwrap().is_empty());
    }

    #[test]
    fn test_round_trip_restores_slot() {
        let processor = setup(stack(2));
        let before = processor.repositories().slot_repo.list_slots().unwrap();

        assert!(processor.process(&event("C1", MoveType::DropOff)).unwrap().is_completed());
        assert!(processor.process(&event("C1", MoveType::PickUp)).unwrap().is_completed());

        let after = processor.repositories().slot_repo.list_slots().unwrap();
        let occupancy = |slots: &[Slot]| -> Vec<Option<String>> {
            slots.iter().map(|s| s.container_id.clone()).collect()
        };
        assert_eq!(occupancy(&before), occupancy(&after));
        assert!(after.iter().all(|s| s.is_dry && s.weight_kg == 0.0));
    }

    #[test]
    fn test_recover_interrupted_events() {
        let processor = setup(stack(1));
        let repos = processor.repositories();
        let stale = repos
            .event_repo
            .create_processing(&event("C9", MoveType::DropOff), at())
            .unwrap();

        assert_eq!(processor.recover_interrupted().unwrap(), vec![stale]);
        let stored = repos.event_repo.find_by_id(stale).unwrap().unwrap();
        assert_eq!(stored.status, EventStatus::Failed);
        assert_eq!(stored.failure_kind.as_deref(), Some("INTERNAL"));
        assert_eq!(stored.failure_reason.as_deref(), Some(INTERRUPTED_REASON));
        assert!(processor.recover_interrupted().unwrap().is_empty());
    }
}
