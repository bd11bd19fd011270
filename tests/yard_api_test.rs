// ==========================================
// YardApi 集成测试
// ==========================================
// 职责: 通过 AppState 装配的 API 验证查询、人工维护、健康检查
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod yard_api_test {
    use std::sync::Arc;

    use yard_planner::api::{ApiError, SlotUpdate};
    use yard_planner::app::AppState;
    use yard_planner::domain::{EventStatus, SlotKey};
    use yard_planner::engine::{FixedClock, YardRepositories};
    use yard_planner::repository::EventQuery;

    use crate::test_helpers::*;

    fn setup(slots: &[yard_planner::domain::Slot]) -> (tempfile::NamedTempFile, AppState) {
        let (tmp, db_path) = create_test_db().unwrap();
        seed_slots(&db_path, slots);
        let state = AppState::with_clock(db_path, Arc::new(FixedClock(at()))).unwrap();
        (tmp, state)
    }

    fn slot_update(tier: i32, container_id: Option<&str>) -> SlotUpdate {
        SlotUpdate {
            yard: "Y1".to_string(),
            block: "A".to_string(),
            bay: 1,
            row: 1,
            tier,
            size_ft: None,
            container_id: container_id.map(str::to_string),
            is_import: 0,
            is_export: 1,
            is_reefer: 1,
            is_hazard: 0,
            is_dry: Some(0),
            weight_kg: 12000.0,
        }
    }

    // ==========================================
    // get_action
    // ==========================================

    #[test]
    fn test_get_action_returns_latest_match_with_plan() {
        let (_tmp, state) = setup(&grid("Y1", "A", 2, 1, 2));
        let api = &state.yard_api;

        let first = api.submit_event(&drop_off("ACT0000001", "TRK-01")).unwrap();
        let second = api.submit_event(&drop_off("ACT0000002", "TRK-01")).unwrap();

        let view = api
            .get_action(&EventQuery {
                truck_id: Some("TRK-01".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(view.event.event_id, second.event_id);
        assert_eq!(view.plan.unwrap().container_id, "ACT0000002");

        let by_id = api
            .get_action(&EventQuery {
                event_id: Some(first.event_id),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_id.event.body.container_id, "ACT0000001");
        assert_eq!(by_id.event.status, EventStatus::Completed);
    }

    #[test]
    fn test_get_action_failed_event_has_no_plan() {
        let (_tmp, state) = setup(&grid("Y1", "A", 1, 1, 1));
        let api = &state.yard_api;

        api.submit_event(&pick_up("MISSING001", "TRK-02")).unwrap();
        let view = api
            .get_action(&EventQuery {
                container_id: Some("MISSING001".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(view.event.status, EventStatus::Failed);
        assert_eq!(view.event.failure_kind.as_deref(), Some("CONTAINER_NOT_FOUND"));
        assert!(view.plan.is_none());
    }

    #[test]
    fn test_get_action_requires_criteria_and_match() {
        let (_tmp, state) = setup(&grid("Y1", "A", 1, 1, 1));
        let api = &state.yard_api;

        assert!(matches!(
            api.get_action(&EventQuery::default()),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            api.get_action(&EventQuery {
                truck_id: Some("NOBODY".to_string()),
                ..Default::default()
            }),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn test_invalid_submission_maps_to_invalid_input() {
        let (_tmp, state) = setup(&grid("Y1", "A", 1, 1, 1));
        let mut intake = drop_off("BAD0000001", " ");
        intake.truck_id = "   ".to_string();

        assert!(matches!(
            state.yard_api.submit_event(&intake),
            Err(ApiError::InvalidInput(_))
        ));
    }

    // ==========================================
    // 列表与状态
    // ==========================================

    #[test]
    fn test_list_events_newest_first_and_clamped() {
        let (_tmp, state) = setup(&grid("Y1", "A", 2, 2, 1));
        let api = &state.yard_api;

        for i in 0..3 {
            api.submit_event(&drop_off(&format!("LST000000{}", i), "TRK-03")).unwrap();
        }

        let events = api.list_events(None).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].body.container_id, "LST0000002");
        assert!(events[0].event_id > events[2].event_id);

        assert_eq!(api.list_events(Some(0)).unwrap().len(), 1);
        assert_eq!(api.list_events(Some(2)).unwrap().len(), 2);
    }

    #[test]
    fn test_yard_status_breakdown() {
        let mut slots = grid("Y1", "A", 2, 1, 2);
        fill(&mut slots, &SlotKey::new("Y1", "A", 1, 1, 1), "OLD0000001");
        let (_tmp, state) = setup(&slots);
        let api = &state.yard_api;

        let mut reefer = drop_off("RFR0000001", "TRK-04");
        reefer.is_reefer = 1;
        reefer.is_dry = 0;
        reefer.is_import = 0;
        reefer.is_export = 1;
        api.submit_event(&reefer).unwrap();
        api.submit_event(&pick_up("NOPE000001", "TRK-05")).unwrap();

        let status = api.yard_status().unwrap();
        assert_eq!(status.total_slots, 4);
        assert_eq!(status.occupied_slots, 2);
        assert_eq!(status.empty_slots, 2);
        assert_eq!(status.containers_by_type.reefer, 1);
        assert_eq!(status.containers_by_type.dry, 1);
        assert_eq!(status.containers_by_size.size_40ft, 2);
        assert_eq!(status.containers_by_operation.import, 1);
        assert_eq!(status.containers_by_operation.export, 1);
        assert_eq!(status.recent_events.len(), 2);
        assert_eq!(status.event_status_counts.get("COMPLETED"), Some(&1));
        assert_eq!(status.event_status_counts.get("FAILED"), Some(&1));
        assert_eq!(status.gravity_violations, 0);
    }

    // ==========================================
    // 人工维护
    // ==========================================

    #[test]
    fn test_update_environment_places_and_clears_container() {
        let (_tmp, state) = setup(&grid("Y1", "A", 1, 1, 2));
        let api = &state.yard_api;

        let saved = api.update_environment(&slot_update(1, Some("MAN0000001"))).unwrap();
        assert_eq!(saved.container_id.as_deref(), Some("MAN0000001"));
        assert!(saved.is_reefer);
        assert!(!saved.is_dry);
        assert_eq!(saved.size_ft, 40);

        let cleared = api.update_environment(&slot_update(1, None)).unwrap();
        assert!(cleared.is_empty());
        assert!(cleared.is_dry);
        assert_eq!(cleared.weight_kg, 0.0);

        let repos: &YardRepositories = &state.repos;
        let trail = repos.action_log_repo.find_by_entity("yard_slot", "Y1-A-01-01/T1").unwrap();
        assert_eq!(trail.len(), 2);
        assert!(trail.iter().all(|l| l.actor == "operator"));
    }

    #[test]
    fn test_update_environment_rejects_floating_container() {
        let (_tmp, state) = setup(&grid("Y1", "A", 1, 1, 2));

        let err = state
            .yard_api
            .update_environment(&slot_update(2, Some("FLOAT00001")))
            .unwrap_err();
        assert!(matches!(err, ApiError::BusinessRuleViolation(_)));
        assert!(state.repos.slot_repo.find_by_container("FLOAT00001").unwrap().is_none());
    }

    #[test]
    fn test_update_environment_validates_coordinates() {
        let (_tmp, state) = setup(&grid("Y1", "A", 1, 1, 1));
        let mut bad = slot_update(1, None);
        bad.bay = 0;
        assert!(matches!(
            state.yard_api.update_environment(&bad),
            Err(ApiError::InvalidInput(_))
        ));

        let mut bad_size = slot_update(1, None);
        bad_size.size_ft = Some(45);
        assert!(matches!(
            state.yard_api.update_environment(&bad_size),
            Err(ApiError::InvalidInput(_))
        ));
    }

    // ==========================================
    // 启动与健康检查
    // ==========================================

    #[test]
    fn test_health_reports_schema_version() {
        let (_tmp, state) = setup(&grid("Y1", "A", 1, 1, 1));
        let health = state.yard_api.health();
        assert_eq!(health.status, "UP");
        assert_eq!(health.schema_version, Some(yard_planner::db::CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_startup_recovers_interrupted_events() {
        let (_tmp, db_path) = create_test_db().unwrap();
        seed_slots(&db_path, &grid("Y1", "A", 1, 1, 1));

        let repos = YardRepositories::from_connection(open_shared(&db_path));
        let new_event = drop_off("INT0000001", "TRK-06").validate().unwrap();
        let stale_id = repos.event_repo.create_processing(&new_event, at()).unwrap();

        let state = AppState::with_clock(db_path, Arc::new(FixedClock(at()))).unwrap();
        assert_eq!(state.recovered_event_ids, vec![stale_id]);

        let view = state
            .yard_api
            .get_action(&EventQuery {
                event_id: Some(stale_id),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(view.event.status, EventStatus::Failed);
        assert_eq!(view.event.failure_reason.as_deref(), Some("interrupted"));
        assert!(state.repos.slot_repo.list_slots().unwrap()[0].is_empty());
    }
}
