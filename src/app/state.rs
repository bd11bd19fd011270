// ==========================================
// 集装箱堆场作业规划系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 启动顺序: 打开连接 → 建表 → 加载配置 → 装配引擎 → 回收中断事件
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::YardApi;
use crate::config::{ConfigManager, PlannerSettings};
use crate::engine::{
    build_cost_model, Clock, EventProcessor, MovePlanBuilder, OptionalAuditSink, SystemClock,
    YardRepositories,
};

/// 应用状态
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 共享连接
    pub conn: Arc<Mutex<Connection>>,

    /// 仓储集合
    pub repos: YardRepositories,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 启动时加载的规划参数
    pub settings: PlannerSettings,

    /// 事件处理器
    pub processor: Arc<EventProcessor>,

    /// 堆场API
    pub yard_api: Arc<YardApi>,

    /// 启动时回收的中断事件
    pub recovered_event_ids: Vec<i64>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    pub fn new(db_path: String) -> Result<Self, String> {
        Self::with_clock(db_path, Arc::new(SystemClock))
    }

    /// 使用指定时钟创建 (测试用)
    pub fn with_clock(db_path: String, clock: Arc<dyn Clock>) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = crate::db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        crate::db::init_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 配置
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let settings = config_manager
            .load_planner_settings()
            .map_err(|e| format!("加载规划参数失败: {}", e))?;
        tracing::info!(
            cost_model = %settings.cost_model,
            max_commit_attempts = settings.max_commit_attempts,
            "规划参数已加载"
        );

        // ==========================================
        // Repository / Engine
        // ==========================================
        let repos = YardRepositories::from_connection(conn.clone());
        let audit = OptionalAuditSink::with_sink(repos.action_log_repo.clone());
        let builder = MovePlanBuilder::new(build_cost_model(&settings), clock);
        let processor = Arc::new(EventProcessor::new(
            repos.clone(),
            builder,
            audit.clone(),
            settings.max_commit_attempts,
        ));

        let recovered_event_ids = processor
            .recover_interrupted()
            .map_err(|e| format!("回收中断事件失败: {}", e))?;
        if !recovered_event_ids.is_empty() {
            tracing::warn!(count = recovered_event_ids.len(), "已回收中断事件");
        }

        // ==========================================
        // API
        // ==========================================
        let yard_api = Arc::new(YardApi::new(conn.clone(), repos.clone(), processor.clone(), audit));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            conn,
            repos,
            config_manager,
            settings,
            processor,
            yard_api,
            recovered_event_ids,
        })
    }
}

// ==========================================
// 辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 YARD_PLANNER_DB_PATH (若设置)
/// - 否则: 用户数据目录/yard-planner/yard_planner.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("YARD_PLANNER_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./yard_planner.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("yard-planner");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("yard_planner.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }
}
