// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、堆场布局、事件报文、处理器装配
// ==========================================

#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rusqlite::Connection;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use yard_planner::db::{init_schema, open_sqlite_connection};
use yard_planner::domain::{EventIntake, Slot, SlotKey};
use yard_planner::engine::{
    EventProcessor, FixedClock, FixedCostModel, MovePlanBuilder, OptionalAuditSink,
    YardRepositories,
};

/// 测试基准时间
pub fn at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 6, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

pub fn event_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 8, 55, 0).unwrap()
}

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 打开一个独立连接 (模拟独立工作进程)
pub fn open_shared(db_path: &str) -> Arc<Mutex<Connection>> {
    Arc::new(Mutex::new(open_sqlite_connection(db_path).unwrap()))
}

/// 基于独立连接装配处理器 (固定代价模型 + 固定时钟, 写审计)
pub fn build_processor(db_path: &str, max_commit_attempts: u32) -> EventProcessor {
    let repos = YardRepositories::from_connection(open_shared(db_path));
    let audit = OptionalAuditSink::with_sink(repos.action_log_repo.clone());
    let builder = MovePlanBuilder::new(Arc::new(FixedCostModel::default()), Arc::new(FixedClock(at())));
    EventProcessor::new(repos, builder, audit, max_commit_attempts)
}

/// 生成规则网格的空箱位
pub fn grid(yard: &str, block: &str, bays: i32, rows: i32, tiers: i32) -> Vec<Slot> {
    let mut slots = Vec::new();
    for bay in 1..=bays {
        for row in 1..=rows {
            for tier in 1..=tiers {
                slots.push(Slot::empty(SlotKey::new(yard, block, bay, row, tier), 40, at()));
            }
        }
    }
    slots
}

/// 占用指定坐标 (干箱, 进口)
pub fn fill(slots: &mut [Slot], key: &SlotKey, container_id: &str) {
    let slot = slots.iter_mut().find(|s| &s.key == key).unwrap();
    slot.container_id = Some(container_id.to_string());
    slot.is_import = true;
    slot.weight_kg = 18000.0;
}

/// 以库为准写入整个布局
pub fn seed_slots(db_path: &str, slots: &[Slot]) {
    let repos = YardRepositories::from_connection(open_shared(db_path));
    repos.slot_repo.replace_all(slots).unwrap();
}

pub fn drop_off(container_id: &str, truck_id: &str) -> EventIntake {
    EventIntake {
        truck_id: truck_id.to_string(),
        container_id: container_id.to_string(),
        is_drop_off: 1,
        is_pick_up: 0,
        is_import: 1,
        is_export: 0,
        is_reefer: 0,
        is_hazard: 0,
        is_dry: 1,
        is_inter_transhipment: 0,
        is_intra_transhipment: 0,
        weight_kg: 22000.0,
        size_ft: 40,
        time: event_time(),
    }
}

pub fn pick_up(container_id: &str, truck_id: &str) -> EventIntake {
    EventIntake {
        is_drop_off: 0,
        is_pick_up: 1,
        ..drop_off(container_id, truck_id)
    }
}
