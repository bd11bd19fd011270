// ==========================================
// 集装箱堆场作业规划系统 - 堆场 API
// ==========================================
// 职责: 事件提交、作业查询、堆场状态、人工箱位维护、健康检查
// 架构: API 层 → Engine 层 (EventProcessor) → Repository 层
// ==========================================

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::ActionType;
use crate::domain::event::{EventIntake, YardEvent};
use crate::domain::move_plan::MovePlan;
use crate::domain::slot::{Slot, SlotKey};
use crate::engine::audit::{AuditRecord, OptionalAuditSink};
use crate::engine::processor::{EventOutcome, EventProcessor};
use crate::engine::repositories::YardRepositories;
use crate::importer::{ImportSummary, SlotCsvImporter};
use crate::repository::EventQuery;

/// 默认事件列表条数
pub const DEFAULT_EVENT_LIMIT: i64 = 20;
const MAX_EVENT_LIMIT: i64 = 500;
const RECENT_EVENTS_IN_STATUS: i64 = 10;

// ==========================================
// DTO
// ==========================================

/// 事件 + 作业计划
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventActionView {
    pub event: YardEvent,
    pub plan: Option<MovePlan>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainersByType {
    pub reefer: i64,
    pub hazard: i64,
    pub dry: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainersBySize {
    pub size_20ft: i64,
    pub size_40ft: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainersByOperation {
    pub import: i64,
    pub export: i64,
}

/// 堆场状态报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YardStatusReport {
    pub total_slots: i64,
    pub occupied_slots: i64,
    pub empty_slots: i64,
    pub containers_by_type: ContainersByType,
    pub containers_by_size: ContainersBySize,
    pub containers_by_operation: ContainersByOperation,
    pub recent_events: Vec<YardEvent>,
    pub event_status_counts: BTreeMap<String, i64>,
    pub gravity_violations: i64,
    pub generated_at: NaiveDateTime,
}

/// 人工箱位维护请求 (标志位沿用 0/1 口径)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotUpdate {
    pub yard: String,
    pub block: String,
    pub bay: i32,
    pub row: i32,
    pub tier: i32,
    #[serde(default)]
    pub size_ft: Option<i32>,
    #[serde(default)]
    pub container_id: Option<String>,
    #[serde(default)]
    pub is_import: i32,
    #[serde(default)]
    pub is_export: i32,
    #[serde(default)]
    pub is_reefer: i32,
    #[serde(default)]
    pub is_hazard: i32,
    #[serde(default)]
    pub is_dry: Option<i32>,
    #[serde(default)]
    pub weight_kg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub database: String,
    pub schema_version: Option<i64>,
    pub checked_at: NaiveDateTime,
}

// ==========================================
// YardApi - 堆场 API
// ==========================================
pub struct YardApi {
    conn: Arc<Mutex<Connection>>,
    repos: YardRepositories,
    processor: Arc<EventProcessor>,
    importer: SlotCsvImporter,
    audit: OptionalAuditSink,
}

impl YardApi {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        repos: YardRepositories,
        processor: Arc<EventProcessor>,
        audit: OptionalAuditSink,
    ) -> Self {
        let importer = SlotCsvImporter::new(repos.slot_repo.clone(), audit.clone());
        Self {
            conn,
            repos,
            processor,
            importer,
            audit,
        }
    }

    // ==========================================
    // 事件提交
    // ==========================================

    /// 提交单个事件
    ///
    /// 规划失败以 FAILED 结果返回 (带 failure_kind / failure_reason);
    /// 报文无效返回 InvalidInput
    pub fn submit_event(&self, intake: &EventIntake) -> ApiResult<EventOutcome> {
        Ok(self.processor.submit(intake)?)
    }

    /// 并发提交一批事件 (tokio 阻塞线程池)
    ///
    /// 结果顺序与输入一致
    pub async fn submit_batch(&self, intakes: Vec<EventIntake>) -> Vec<ApiResult<EventOutcome>> {
        let handles = intakes.into_iter().map(|intake| {
            let processor = Arc::clone(&self.processor);
            tokio::task::spawn_blocking(move || processor.submit(&intake))
        });

        futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|joined| match joined {
                Ok(result) => result.map_err(ApiError::from),
                Err(e) => Err(ApiError::InternalError(format!("事件处理任务异常: {}", e))),
            })
            .collect()
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 查询最新匹配事件及其作业计划
    pub fn get_action(&self, query: &EventQuery) -> ApiResult<EventActionView> {
        if query.is_empty() {
            return Err(ApiError::InvalidInput(
                "至少需要 event_id / truck_id / container_id 之一".to_string(),
            ));
        }

        let event = self
            .repos
            .event_repo
            .find_latest(query)?
            .ok_or_else(|| ApiError::NotFound(format!("没有匹配的事件: {:?}", query)))?;
        let plan = self.repos.plan_repo.find_by_event_id(event.event_id)?;

        Ok(EventActionView { event, plan })
    }

    /// 最近事件 (新→旧)
    pub fn list_events(&self, limit: Option<i64>) -> ApiResult<Vec<YardEvent>> {
        let limit = limit.unwrap_or(DEFAULT_EVENT_LIMIT).clamp(1, MAX_EVENT_LIMIT);
        Ok(self.repos.event_repo.list_recent(limit)?)
    }

    /// 堆场状态
    pub fn yard_status(&self) -> ApiResult<YardStatusReport> {
        let stats = self.repos.slot_repo.stats()?;

        Ok(YardStatusReport {
            total_slots: stats.total_slots,
            occupied_slots: stats.occupied_slots,
            empty_slots: stats.empty_slots(),
            containers_by_type: ContainersByType {
                reefer: stats.reefer,
                hazard: stats.hazard,
                dry: stats.dry,
            },
            containers_by_size: ContainersBySize {
                size_20ft: stats.size_20ft,
                size_40ft: stats.size_40ft,
            },
            containers_by_operation: ContainersByOperation {
                import: stats.import,
                export: stats.export,
            },
            recent_events: self.repos.event_repo.list_recent(RECENT_EVENTS_IN_STATUS)?,
            event_status_counts: self.repos.event_repo.status_counts()?,
            gravity_violations: self.repos.slot_repo.count_gravity_violations()?,
            generated_at: Utc::now().naive_utc(),
        })
    }

    /// 全部箱位
    pub fn list_environment(&self) -> ApiResult<Vec<Slot>> {
        Ok(self.repos.slot_repo.list_slots()?)
    }

    // ==========================================
    // 人工维护
    // ==========================================

    /// 人工维护单个箱位 (不存在则创建)
    pub fn update_environment(&self, update: &SlotUpdate) -> ApiResult<Slot> {
        let slot = self.slot_from_update(update)?;
        let saved = self.repos.slot_repo.upsert_slot(&slot)?;

        tracing::info!(slot = %saved.key, container_id = ?saved.container_id, "人工维护箱位");
        self.audit.emit(
            AuditRecord::new(ActionType::UpdateSlot, "yard_slot", Some(saved.key.to_string()))
                .with_actor("operator")
                .with_payload(json!({
                    "slot": saved.key.to_string(),
                    "container_id": saved.container_id,
                    "size_ft": saved.size_ft,
                })),
        );

        Ok(saved)
    }

    /// 导入堆场布局 CSV
    pub fn import_slots(&self, path: &Path) -> ApiResult<ImportSummary> {
        Ok(self.importer.import_file(path)?)
    }

    // ==========================================
    // 健康检查
    // ==========================================

    pub fn health(&self) -> HealthReport {
        let checked_at = Utc::now().naive_utc();
        let probe = self
            .conn
            .lock()
            .map_err(|e| e.to_string())
            .and_then(|conn| {
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                    .and_then(|_| crate::db::read_schema_version(&conn))
                    .map_err(|e| e.to_string())
            });

        match probe {
            Ok(schema_version) => HealthReport {
                status: "UP".to_string(),
                database: "connected".to_string(),
                schema_version,
                checked_at,
            },
            Err(e) => {
                tracing::warn!(error = %e, "健康检查失败");
                HealthReport {
                    status: "DOWN".to_string(),
                    database: e,
                    schema_version: None,
                    checked_at,
                }
            }
        }
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn slot_from_update(&self, update: &SlotUpdate) -> ApiResult<Slot> {
        if update.yard.trim().is_empty() || update.block.trim().is_empty() {
            return Err(ApiError::InvalidInput("yard / block 不能为空".to_string()));
        }
        if update.bay < 1 || update.row < 1 || update.tier < 1 {
            return Err(ApiError::InvalidInput(format!(
                "bay/row/tier 必须 >= 1: bay={}, row={}, tier={}",
                update.bay, update.row, update.tier
            )));
        }
        if update.weight_kg < 0.0 {
            return Err(ApiError::InvalidInput(format!("weight_kg 不能为负数: {}", update.weight_kg)));
        }

        let key = SlotKey::new(update.yard.trim(), update.block.trim(), update.bay, update.row, update.tier);
        let existing = self.repos.slot_repo.find_by_key(&key)?;
        let size_ft = update
            .size_ft
            .or_else(|| existing.as_ref().map(|s| s.size_ft))
            .unwrap_or(40);
        if size_ft != 20 && size_ft != 40 {
            return Err(ApiError::InvalidInput(format!("size_ft 只支持 20/40: {}", size_ft)));
        }

        let mut slot = Slot::empty(key, size_ft, Utc::now().naive_utc());
        if let Some(container_id) = update
            .container_id
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            slot.container_id = Some(container_id.to_string());
            slot.is_import = update.is_import == 1;
            slot.is_export = update.is_export == 1;
            slot.is_reefer = update.is_reefer == 1;
            slot.is_hazard = update.is_hazard == 1;
            slot.is_dry = update.is_dry.map_or(true, |v| v == 1);
            slot.weight_kg = update.weight_kg;
        }
        Ok(slot)
    }
}
