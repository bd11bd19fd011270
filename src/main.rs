// ==========================================
// 集装箱堆场作业规划系统 - 命令行入口
// ==========================================
// 用法:
//   yard-planner <command> [db_path] [arg]
//
// 命令:
//   init                 建库并输出健康状态
//   submit <event.json>  提交单个事件
//   batch <events.json>  并发提交一批事件
//   status               堆场状态
//   import <slots.csv>   导入堆场布局
//   events [limit]       最近事件
//
// db_path 省略或为 "-" 时使用默认路径
// ==========================================

use anyhow::{anyhow, bail, Context};
use std::path::Path;
use yard_planner::app::{get_default_db_path, AppState};
use yard_planner::EventIntake;

const USAGE: &str = "用法: yard-planner <init|submit|batch|status|import|events> [db_path] [arg]";

fn main() -> anyhow::Result<()> {
    yard_planner::logging::init();

    let mut args = std::env::args().skip(1);
    let command = args.next().ok_or_else(|| anyhow!(USAGE))?;
    let db_path = args
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && s != "-")
        .unwrap_or_else(get_default_db_path);
    let arg = args.next();

    tracing::info!("{} v{}", yard_planner::APP_NAME, yard_planner::VERSION);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).map_err(anyhow::Error::msg)?;
    let api = state.yard_api.clone();

    let output = match command.as_str() {
        "init" => serde_json::to_value(api.health())?,
        "submit" => {
            let path = arg.ok_or_else(|| anyhow!("submit 需要事件文件路径"))?;
            let raw = std::fs::read_to_string(&path).with_context(|| format!("读取 {} 失败", path))?;
            let intake: EventIntake = serde_json::from_str(&raw).context("事件报文格式错误")?;
            serde_json::to_value(api.submit_event(&intake)?)?
        }
        "batch" => {
            let path = arg.ok_or_else(|| anyhow!("batch 需要事件文件路径"))?;
            let raw = std::fs::read_to_string(&path).with_context(|| format!("读取 {} 失败", path))?;
            let intakes: Vec<EventIntake> = serde_json::from_str(&raw).context("事件报文格式错误")?;

            let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
            let results = runtime.block_on(api.submit_batch(intakes));
            let rendered: Vec<serde_json::Value> = results
                .into_iter()
                .map(|r| match r {
                    Ok(outcome) => serde_json::json!({ "ok": outcome }),
                    Err(e) => serde_json::json!({ "error": e.to_string() }),
                })
                .collect();
            serde_json::Value::Array(rendered)
        }
        "status" => serde_json::to_value(api.yard_status()?)?,
        "import" => {
            let path = arg.ok_or_else(|| anyhow!("import 需要 CSV 文件路径"))?;
            serde_json::to_value(api.import_slots(Path::new(&path))?)?
        }
        "events" => {
            let limit = arg
                .map(|s| s.parse::<i64>())
                .transpose()
                .context("limit 必须为整数")?;
            serde_json::to_value(api.list_events(limit)?)?
        }
        other => bail!("未知命令: {}\n{}", other, USAGE),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
