// ==========================================
// 集装箱堆场作业规划系统 - 引擎层仓储聚合
// ==========================================
// 职责: 聚合作业规划引擎所需的所有 Repository
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::repository::{
    ActionLogRepository, MoveCommitRepository, MovePlanRepository, YardEventRepository,
    YardSlotRepository,
};

/// 作业规划仓储集合
///
/// # 包含的仓储
/// - `slot_repo`: 箱位 (快照读取)
/// - `event_repo`: 事件状态机
/// - `plan_repo`: 作业计划查询
/// - `commit_repo`: 原子提交
/// - `action_log_repo`: 审计日志
#[derive(Clone)]
pub struct YardRepositories {
    pub slot_repo: Arc<YardSlotRepository>,
    pub event_repo: Arc<YardEventRepository>,
    pub plan_repo: Arc<MovePlanRepository>,
    pub commit_repo: Arc<MoveCommitRepository>,
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl YardRepositories {
    /// 基于共享连接创建全部仓储
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            slot_repo: Arc::new(YardSlotRepository::new(conn.clone())),
            event_repo: Arc::new(YardEventRepository::new(conn.clone())),
            plan_repo: Arc::new(MovePlanRepository::new(conn.clone())),
            commit_repo: Arc::new(MoveCommitRepository::new(conn.clone())),
            action_log_repo: Arc::new(ActionLogRepository::new(conn)),
        }
    }
}
