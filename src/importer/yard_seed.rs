// ==========================================
// 集装箱堆场作业规划系统 - 演示堆场生成
// ==========================================
// 默认布局: Y1 堆场, A/B 两个箱区, 5 贝 × 4 排 × 4 层
// - 每个堆位 30% 概率为空,否则堆高 1..=4 (自底向上连续,天然满足重力约束)
// - 首个箱区以进口箱为主,其余箱区以出口箱为主
// - 10% 冷藏箱
// - 箱号: IMP/EXP/REF + 6 位数字,全场唯一
// ==========================================

use crate::domain::slot::{Slot, SlotKey};
use chrono::{NaiveDateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedParams {
    pub yard: String,
    pub blocks: Vec<String>,
    pub bays: i32,
    pub rows: i32,
    pub tiers: i32,
    pub empty_stack_ratio: f64,
    pub dominant_flow_ratio: f64,
    pub reefer_ratio: f64,
}

impl Default for SeedParams {
    fn default() -> Self {
        Self {
            yard: "Y1".to_string(),
            blocks: vec!["A".to_string(), "B".to_string()],
            bays: 5,
            rows: 4,
            tiers: 4,
            empty_stack_ratio: 0.3,
            dominant_flow_ratio: 0.8,
            reefer_ratio: 0.1,
        }
    }
}

/// 生成堆场布局 (含空箱位)
pub fn generate_layout<R: Rng + ?Sized>(params: &SeedParams, rng: &mut R) -> Vec<Slot> {
    let now = Utc::now().naive_utc();
    let mut used_ids: HashSet<String> = HashSet::new();
    let mut slots = Vec::new();

    for (block_idx, block) in params.blocks.iter().enumerate() {
        let import_heavy = block_idx == 0;

        for bay in 1..=params.bays {
            for row in 1..=params.rows {
                let height = if params.tiers < 1 || rng.gen_bool(params.empty_stack_ratio.clamp(0.0, 1.0)) {
                    0
                } else {
                    rng.gen_range(1..=params.tiers)
                };

                for tier in 1..=params.tiers {
                    let key = SlotKey::new(params.yard.clone(), block.clone(), bay, row, tier);
                    let mut slot = Slot::empty(key, 40, now);
                    if tier <= height {
                        fill_container(&mut slot, params, import_heavy, &mut used_ids, rng, now);
                    }
                    slots.push(slot);
                }
            }
        }
    }

    slots
}

fn fill_container<R: Rng + ?Sized>(
    slot: &mut Slot,
    params: &SeedParams,
    import_heavy: bool,
    used_ids: &mut HashSet<String>,
    rng: &mut R,
    now: NaiveDateTime,
) {
    let dominant = rng.gen_bool(params.dominant_flow_ratio.clamp(0.0, 1.0));
    let is_import = if import_heavy { dominant } else { !dominant };
    let is_reefer = rng.gen_bool(params.reefer_ratio.clamp(0.0, 1.0));

    let prefix = if is_reefer {
        "REF"
    } else if is_import {
        "IMP"
    } else {
        "EXP"
    };
    let container_id = loop {
        let candidate = format!("{}{:06}", prefix, rng.gen_range(0..1_000_000));
        if used_ids.insert(candidate.clone()) {
            break candidate;
        }
    };

    slot.container_id = Some(container_id);
    slot.is_import = is_import;
    slot.is_export = !is_import;
    slot.is_reefer = is_reefer;
    slot.is_dry = !is_reefer;
    slot.weight_kg = f64::from(rng.gen_range(8..=30i32) * 1000);
    slot.updated_at = now;
}
