// ==========================================
// 集装箱堆场作业规划系统 - 堆场布局 CSV 导入
// ==========================================
// 列: yard,block,bay,row,tier,size_ft,container_id,
//     is_import,is_export,is_reefer,is_hazard,is_dry,weight_kg
// 流程: 解析 → 逐行校验 → 与现有箱位合并后整体校验 → 单事务写入
// 红线: 任一行失败整批不写入
// ==========================================

use crate::domain::action_log::ActionType;
use crate::domain::slot::{Slot, SlotKey};
use crate::engine::audit::{AuditRecord, OptionalAuditSink};
use crate::engine::snapshot::YardSnapshot;
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::YardSlotRepository;
use chrono::Utc;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// CSV 行
#[derive(Debug, Clone, Deserialize)]
struct SlotCsvRow {
    yard: String,
    block: String,
    bay: i32,
    row: i32,
    tier: i32,
    #[serde(default)]
    size_ft: Option<i32>,
    #[serde(default)]
    container_id: Option<String>,
    #[serde(default)]
    is_import: Option<i32>,
    #[serde(default)]
    is_export: Option<i32>,
    #[serde(default)]
    is_reefer: Option<i32>,
    #[serde(default)]
    is_hazard: Option<i32>,
    #[serde(default)]
    is_dry: Option<i32>,
    #[serde(default)]
    weight_kg: Option<f64>,
}

/// 导入汇总
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub total_rows: usize,
    pub slots_written: usize,
    pub occupied: usize,
    pub empty: usize,
}

pub struct SlotCsvImporter {
    slot_repo: Arc<YardSlotRepository>,
    audit: OptionalAuditSink,
}

impl SlotCsvImporter {
    pub fn new(slot_repo: Arc<YardSlotRepository>, audit: OptionalAuditSink) -> Self {
        Self { slot_repo, audit }
    }

    /// 从文件导入
    pub fn import_file(&self, path: &Path) -> ImportResult<ImportSummary> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => {}
            other => {
                return Err(ImportError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                ))
            }
        }

        let file = File::open(path)?;
        let summary = self.import_reader(file)?;
        tracing::info!(path = %path.display(), ?summary, "堆场布局导入完成");
        Ok(summary)
    }

    /// 从任意读取源导入
    pub fn import_reader<R: Read>(&self, reader: R) -> ImportResult<ImportSummary> {
        let slots = parse_slots(reader)?;

        // 与现有箱位合并后做整体校验 (文件内的箱位覆盖库内同坐标箱位)
        let mut merged: BTreeMap<SlotKey, Slot> = self
            .slot_repo
            .list_slots()?
            .into_iter()
            .map(|s| (s.key.clone(), s))
            .collect();
        for slot in &slots {
            merged.insert(slot.key.clone(), slot.clone());
        }
        validate_merged(merged.into_values().collect())?;

        let written = self.slot_repo.upsert_many(&slots)?;
        let occupied = slots.iter().filter(|s| s.is_occupied()).count();
        let summary = ImportSummary {
            total_rows: slots.len(),
            slots_written: written,
            occupied,
            empty: slots.len() - occupied,
        };

        self.audit.emit(
            AuditRecord::new(ActionType::ImportSlots, "yard_slot", None).with_payload(json!({
                "total_rows": summary.total_rows,
                "slots_written": summary.slots_written,
                "occupied": summary.occupied,
            })),
        );
        Ok(summary)
    }
}

/// 解析并逐行校验
fn parse_slots<R: Read>(reader: R) -> ImportResult<Vec<Slot>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let now = Utc::now().naive_utc();
    let mut seen_keys: HashSet<SlotKey> = HashSet::new();
    let mut seen_containers: HashMap<String, usize> = HashMap::new();
    let mut slots = Vec::new();

    for (idx, result) in reader.deserialize::<SlotCsvRow>().enumerate() {
        let row_no = idx + 1;
        let raw = result?;
        let slot = row_to_slot(row_no, raw, now)?;

        if !seen_keys.insert(slot.key.clone()) {
            return Err(ImportError::DuplicateSlot {
                row: row_no,
                slot: slot.key.to_string(),
            });
        }
        if let Some(container_id) = &slot.container_id {
            if seen_containers.insert(container_id.clone(), row_no).is_some() {
                return Err(ImportError::DuplicateContainer {
                    row: row_no,
                    container_id: container_id.clone(),
                });
            }
        }
        slots.push(slot);
    }

    Ok(slots)
}

fn row_to_slot(row_no: usize, raw: SlotCsvRow, now: chrono::NaiveDateTime) -> ImportResult<Slot> {
    let field_error = |field: &str, message: String| ImportError::FieldValueError {
        row: row_no,
        field: field.to_string(),
        message,
    };

    if raw.yard.is_empty() {
        return Err(field_error("yard", "不能为空".to_string()));
    }
    if raw.block.is_empty() {
        return Err(field_error("block", "不能为空".to_string()));
    }
    for (field, value) in [("bay", raw.bay), ("row", raw.row), ("tier", raw.tier)] {
        if value < 1 {
            return Err(field_error(field, format!("必须 >= 1,实际 {}", value)));
        }
    }
    let size_ft = raw.size_ft.unwrap_or(40);
    if size_ft != 20 && size_ft != 40 {
        return Err(field_error("size_ft", format!("只支持 20/40,实际 {}", size_ft)));
    }
    let weight_kg = raw.weight_kg.unwrap_or(0.0);
    if weight_kg < 0.0 {
        return Err(field_error("weight_kg", format!("不能为负数: {}", weight_kg)));
    }

    let key = SlotKey::new(raw.yard, raw.block, raw.bay, raw.row, raw.tier);
    let mut slot = Slot::empty(key, size_ft, now);

    let container_id = raw.container_id.filter(|c| !c.is_empty());
    if container_id.is_some() {
        slot.container_id = container_id;
        slot.is_import = raw.is_import == Some(1);
        slot.is_export = raw.is_export == Some(1);
        slot.is_reefer = raw.is_reefer == Some(1);
        slot.is_hazard = raw.is_hazard == Some(1);
        slot.is_dry = raw.is_dry.map_or(true, |v| v == 1);
        slot.weight_kg = weight_kg;
    }
    Ok(slot)
}

/// 合并后的全场校验: 箱号唯一 + 重力约束
fn validate_merged(slots: Vec<Slot>) -> ImportResult<()> {
    let mut holders: HashMap<&str, &SlotKey> = HashMap::new();
    for slot in &slots {
        if let Some(container_id) = slot.container_id.as_deref() {
            if let Some(other) = holders.insert(container_id, &slot.key) {
                return Err(ImportError::DuplicateContainer {
                    row: 0,
                    container_id: format!("{} (已在 {})", container_id, other),
                });
            }
        }
    }

    let snapshot = YardSnapshot::new(slots);
    let violations = snapshot.gravity_violations();
    if !violations.is_empty() {
        let listed: Vec<String> = violations.iter().take(5).map(|s| s.key.to_string()).collect();
        return Err(ImportError::GravityViolation(format!(
            "{} 个箱位悬空: {}",
            violations.len(),
            listed.join(", ")
        )));
    }
    Ok(())
}
