// ==========================================
// 并发分配测试
// ==========================================
// 职责: 验证比较后提交 (compare-and-commit) 下不会重复占用箱位
// 每个线程使用独立连接,模拟多个工作进程争抢同一堆场
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod concurrent_allocation_test {
    use std::collections::HashSet;
    use std::sync::{Arc, Barrier};
    use std::thread;

    use yard_planner::app::AppState;
    use yard_planner::config::{config_keys, ConfigManager};
    use yard_planner::domain::EventStatus;
    use yard_planner::engine::{
        EventOutcome, FixedClock, FixedCostModel, MovePlanBuilder, YardRepositories, YardSnapshot,
    };
    use yard_planner::repository::RepositoryError;

    use crate::test_helpers::*;

    // 每次冲突都对应另一事件的成功提交,尝试次数大于箱位数即不会耗尽
    const RACE_ATTEMPTS: u32 = 32;

    fn run_concurrently(db_path: &str, workers: usize, per_worker: usize) -> Vec<EventOutcome> {
        let barrier = Arc::new(Barrier::new(workers));

        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|w| {
                    let barrier = Arc::clone(&barrier);
                    scope.spawn(move || {
                        let processor = build_processor(db_path, RACE_ATTEMPTS);
                        barrier.wait();
                        (0..per_worker)
                            .map(|i| {
                                let container = format!("CONC{:03}{:03}", w, i);
                                let truck = format!("TRK-{:02}", w);
                                processor.submit(&drop_off(&container, &truck)).unwrap()
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        })
    }

    #[test]
    fn test_single_slot_race_has_one_winner() {
        let (_tmp, db_path) = create_test_db().unwrap();
        seed_slots(&db_path, &grid("Y1", "A", 1, 1, 1));

        let outcomes = run_concurrently(&db_path, 2, 1);

        let completed: Vec<_> = outcomes.iter().filter(|o| o.is_completed()).collect();
        let failed: Vec<_> = outcomes.iter().filter(|o| !o.is_completed()).collect();
        assert_eq!(completed.len(), 1);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].failure_kind.as_deref(), Some("YARD_FULL"));

        let repos = YardRepositories::from_connection(open_shared(&db_path));
        assert_eq!(repos.plan_repo.count().unwrap(), 1);
        let slots = repos.slot_repo.list_slots().unwrap();
        assert_eq!(
            slots[0].container_id.as_deref(),
            Some(completed[0].plan.as_ref().unwrap().container_id.as_str())
        );
    }

    #[test]
    fn test_many_workers_never_double_book() {
        let (_tmp, db_path) = create_test_db().unwrap();
        // 3 x 2 x 3 = 18 个箱位, 32 个落箱事件
        seed_slots(&db_path, &grid("Y1", "A", 3, 2, 3));

        let outcomes = run_concurrently(&db_path, 8, 4);
        assert_eq!(outcomes.len(), 32);

        let completed: Vec<_> = outcomes.iter().filter(|o| o.is_completed()).collect();
        assert_eq!(completed.len(), 18);
        assert!(outcomes
            .iter()
            .filter(|o| !o.is_completed())
            .all(|o| o.failure_kind.as_deref() == Some("YARD_FULL")));

        let targets: HashSet<(String, i32)> = completed
            .iter()
            .map(|o| {
                let plan = o.plan.as_ref().unwrap();
                (plan.to_sid.clone(), plan.to_tier)
            })
            .collect();
        assert_eq!(targets.len(), 18, "每个箱位只能被分配一次");

        let repos = YardRepositories::from_connection(open_shared(&db_path));
        let slots = repos.slot_repo.list_slots().unwrap();
        assert!(slots.iter().all(|s| s.is_occupied()));
        assert_eq!(repos.slot_repo.count_gravity_violations().unwrap(), 0);
        assert!(YardSnapshot::new(slots).gravity_violations().is_empty());

        let counts = repos.event_repo.status_counts().unwrap();
        assert_eq!(counts.get("COMPLETED"), Some(&18));
        assert_eq!(counts.get("FAILED"), Some(&14));
        assert_eq!(counts.get("PROCESSING"), None);
    }

    #[test]
    fn test_stale_snapshot_commit_is_rejected() {
        let (_tmp, db_path) = create_test_db().unwrap();
        seed_slots(&db_path, &grid("Y1", "A", 1, 1, 2));
        let repos = YardRepositories::from_connection(open_shared(&db_path));
        let builder = MovePlanBuilder::new(Arc::new(FixedCostModel::default()), Arc::new(FixedClock(at())));

        // 两个事件基于同一快照规划
        let snapshot = YardSnapshot::new(repos.slot_repo.list_slots().unwrap());
        let mut planned = Vec::new();
        for container in ["STALE00001", "STALE00002"] {
            let new_event = drop_off(container, "TRK-01").validate().unwrap();
            let event_id = repos.event_repo.create_processing(&new_event, at()).unwrap();
            let event = repos.event_repo.find_by_id(event_id).unwrap().unwrap();
            planned.push((event_id, builder.build(&event, &snapshot).unwrap()));
        }
        assert_eq!(planned[0].1.mutation.key(), planned[1].1.mutation.key());

        let (first_id, first) = &planned[0];
        repos
            .commit_repo
            .commit_move(*first_id, &first.mutation, &first.plan, 1, at())
            .unwrap();

        let (second_id, second) = &planned[1];
        let err = repos
            .commit_repo
            .commit_move(*second_id, &second.mutation, &second.plan, 1, at())
            .unwrap_err();
        assert!(matches!(err, RepositoryError::SlotConflict { .. }));

        // 失败提交整体回滚: 事件仍为 PROCESSING, 无计划
        let stored = repos.event_repo.find_by_id(*second_id).unwrap().unwrap();
        assert_eq!(stored.status, EventStatus::Processing);
        assert!(repos.plan_repo.find_by_event_id(*second_id).unwrap().is_none());
        assert_eq!(repos.plan_repo.count().unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_submit_batch_through_api() {
        let (_tmp, db_path) = create_test_db().unwrap();
        seed_slots(&db_path, &grid("Y1", "A", 2, 2, 2));
        ConfigManager::new(&db_path)
            .unwrap()
            .set_config_value(config_keys::MAX_COMMIT_ATTEMPTS, &RACE_ATTEMPTS.to_string())
            .unwrap();
        let state = AppState::with_clock(db_path.clone(), Arc::new(FixedClock(at()))).unwrap();
        assert_eq!(state.settings.max_commit_attempts, RACE_ATTEMPTS);

        let intakes: Vec<_> = (0..10)
            .map(|i| drop_off(&format!("BATCH{:05}", i), "TRK-B"))
            .collect();
        let results = state.yard_api.submit_batch(intakes).await;

        assert_eq!(results.len(), 10);
        let outcomes: Vec<_> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(outcomes.iter().filter(|o| o.is_completed()).count(), 8);
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| o.failure_kind.as_deref() == Some("YARD_FULL"))
                .count(),
            2
        );

        let status = state.yard_api.yard_status().unwrap();
        assert_eq!(status.occupied_slots, 8);
        assert_eq!(status.empty_slots, 0);
        assert_eq!(status.gravity_violations, 0);
    }
}
