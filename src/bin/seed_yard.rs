// 重置并生成演示堆场 (清空全部箱位后按随机布局重建)
//
// Usage:
//   cargo run --bin seed_yard -- [db_path] [seed]
//
// 仅用于开发/演示,不会删除事件与作业计划历史

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};
use yard_planner::db::{init_schema, open_sqlite_connection};
use yard_planner::importer::{generate_layout, SeedParams};
use yard_planner::repository::YardSlotRepository;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    yard_planner::logging::init();

    let mut args = std::env::args().skip(1);
    let db_path = args
        .next()
        .unwrap_or_else(yard_planner::app::get_default_db_path);
    let seed = args.next().map(|s| s.trim().parse::<u64>()).transpose()?;

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;
    let repo = YardSlotRepository::new(Arc::new(Mutex::new(conn)));

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let slots = generate_layout(&SeedParams::default(), &mut rng);
    let written = repo.replace_all(&slots)?;
    let occupied = slots.iter().filter(|s| s.is_occupied()).count();

    tracing::info!(db_path = %db_path, written, occupied, "演示堆场已生成");
    println!("slots={} occupied={}", written, occupied);
    Ok(())
}
