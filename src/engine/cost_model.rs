// ==========================================
// 集装箱堆场作业规划系统 - 作业代价模型
// ==========================================
// 职责: 起讫点 → 时长/距离/设备/集卡区
// 说明: 代价模型通过 trait 注入,规划逻辑不感知具体实现
// 实现:
// - FixedCostModel: 固定值 (测试)
// - RandomizedCostModel: 随机时长/距离 (仿真)
// - CoordinateCostModel: 按箱位几何推算 (生产)
// ==========================================

use crate::config::{CostModelKind, PlannerSettings};
use crate::domain::slot::{SlotKey, GATE_IN_SID, GATE_OUT_SID};
use crate::domain::types::MoveType;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

// ==========================================
// MoveEndpoint - 作业起讫点
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveEndpoint {
    pub sid: String,
    pub tier: i32,
    /// 堆场内箱位 (闸口为 None)
    pub slot: Option<SlotKey>,
}

impl MoveEndpoint {
    pub fn gate_in() -> Self {
        Self {
            sid: GATE_IN_SID.to_string(),
            tier: 1,
            slot: None,
        }
    }

    pub fn gate_out() -> Self {
        Self {
            sid: GATE_OUT_SID.to_string(),
            tier: 1,
            slot: None,
        }
    }

    pub fn slot(key: &SlotKey) -> Self {
        Self {
            sid: key.sid(),
            tier: key.tier,
            slot: Some(key.clone()),
        }
    }

    pub fn is_gate(&self) -> bool {
        self.slot.is_none()
    }
}

// ==========================================
// MoveCost - 代价估算结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveCost {
    pub duration_s: f64,
    pub distance_crane: f64,
    pub crane_id: String,
    pub from_truck_zone_id: String,
    pub to_truck_zone_id: String,
    pub distance_internal_truck: f64,
    pub distance_external_truck: f64,
}

/// 作业代价模型
pub trait CostModel: Send + Sync {
    fn estimate(&self, move_type: MoveType, from: &MoveEndpoint, to: &MoveEndpoint) -> MoveCost;

    fn name(&self) -> &'static str;
}

/// 堆场侧的端点 (落箱取终点,提箱取起点)
fn yard_side<'a>(move_type: MoveType, from: &'a MoveEndpoint, to: &'a MoveEndpoint) -> &'a MoveEndpoint {
    match move_type {
        MoveType::DropOff => to,
        MoveType::PickUp => from,
    }
}

fn block_zone(endpoint: &MoveEndpoint) -> String {
    match &endpoint.slot {
        Some(key) => format!("BLOCK_{}", key.block),
        None => endpoint.sid.clone(),
    }
}

/// 集卡区: 闸口 ↔ 箱区
fn truck_zones(move_type: MoveType, gate_zone: &str, block_zone: String) -> (String, String) {
    match move_type {
        MoveType::DropOff => (gate_zone.to_string(), block_zone),
        MoveType::PickUp => (block_zone, gate_zone.to_string()),
    }
}

// ==========================================
// FixedCostModel
// ==========================================
#[derive(Debug, Clone)]
pub struct FixedCostModel {
    pub duration_s: f64,
    pub distance_crane: f64,
    pub crane_id: String,
    pub gate_zone_id: String,
    pub distance_internal_truck: f64,
    pub distance_external_truck: f64,
}

impl Default for FixedCostModel {
    fn default() -> Self {
        Self {
            duration_s: 20.0,
            distance_crane: 10.0,
            crane_id: "RTG-01".to_string(),
            gate_zone_id: "GATE".to_string(),
            distance_internal_truck: 120.0,
            distance_external_truck: 50.0,
        }
    }
}

impl CostModel for FixedCostModel {
    fn estimate(&self, move_type: MoveType, from: &MoveEndpoint, to: &MoveEndpoint) -> MoveCost {
        let (from_zone, to_zone) =
            truck_zones(move_type, &self.gate_zone_id, block_zone(yard_side(move_type, from, to)));
        MoveCost {
            duration_s: self.duration_s,
            distance_crane: self.distance_crane,
            crane_id: self.crane_id.clone(),
            from_truck_zone_id: from_zone,
            to_truck_zone_id: to_zone,
            distance_internal_truck: self.distance_internal_truck,
            distance_external_truck: self.distance_external_truck,
        }
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

// ==========================================
// RandomizedCostModel
// ==========================================
// 时长 15~25 秒,吊车行程 0~99 米 (取整)
pub struct RandomizedCostModel {
    rng: Mutex<StdRng>,
    crane_id: String,
    gate_zone_id: String,
    distance_internal_truck: f64,
    distance_external_truck: f64,
}

impl RandomizedCostModel {
    pub fn new(settings: &PlannerSettings) -> Self {
        let rng = match settings.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
            crane_id: format!("{}-AUTO-01", settings.crane_id_prefix),
            gate_zone_id: settings.gate_zone_id.clone(),
            distance_internal_truck: settings.gate_distance_m,
            distance_external_truck: settings.external_truck_distance_m,
        }
    }
}

impl CostModel for RandomizedCostModel {
    fn estimate(&self, move_type: MoveType, from: &MoveEndpoint, to: &MoveEndpoint) -> MoveCost {
        let (duration_s, distance_crane) = match self.rng.lock() {
            Ok(mut rng) => (15.0 + rng.gen::<f64>() * 10.0, (rng.gen::<f64>() * 100.0).floor()),
            Err(poisoned) => {
                let mut rng = poisoned.into_inner();
                (15.0 + rng.gen::<f64>() * 10.0, (rng.gen::<f64>() * 100.0).floor())
            }
        };
        let (from_zone, to_zone) =
            truck_zones(move_type, &self.gate_zone_id, block_zone(yard_side(move_type, from, to)));

        MoveCost {
            duration_s,
            distance_crane,
            crane_id: self.crane_id.clone(),
            from_truck_zone_id: from_zone,
            to_truck_zone_id: to_zone,
            distance_internal_truck: self.distance_internal_truck,
            distance_external_truck: self.distance_external_truck,
        }
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

// ==========================================
// CoordinateCostModel
// ==========================================
// 吊车停靠在箱区 bay 1 / row 1:
//   吊车行程 = (bay-1)·贝长 + (row-1)·排宽 + tier·层高
//   时长     = 基础作业 + 行程/吊车速度 + tier·单层起升时间
//   内集卡   = 闸口距离 + (bay-1)·贝长
pub struct CoordinateCostModel {
    settings: PlannerSettings,
}

impl CoordinateCostModel {
    pub fn new(settings: &PlannerSettings) -> Self {
        Self {
            settings: settings.clone(),
        }
    }
}

impl CostModel for CoordinateCostModel {
    fn estimate(&self, move_type: MoveType, from: &MoveEndpoint, to: &MoveEndpoint) -> MoveCost {
        let s = &self.settings;
        let endpoint = yard_side(move_type, from, to);
        let (from_zone, to_zone) = truck_zones(move_type, &s.gate_zone_id, block_zone(endpoint));

        let (distance_crane, crane_id, bay_offset_m, tier) = match &endpoint.slot {
            Some(key) => {
                let bay_offset_m = f64::from((key.bay - 1).max(0)) * s.bay_length_m;
                let row_offset_m = f64::from((key.row - 1).max(0)) * s.row_width_m;
                let hoist_m = f64::from(key.tier) * s.tier_height_m;
                (
                    bay_offset_m + row_offset_m + hoist_m,
                    format!("{}-{}-{}", s.crane_id_prefix, key.yard, key.block),
                    bay_offset_m,
                    key.tier,
                )
            }
            None => (0.0, format!("{}-GATE", s.crane_id_prefix), 0.0, 1),
        };

        let travel_s = if s.crane_speed_mps > 0.0 {
            distance_crane / s.crane_speed_mps
        } else {
            0.0
        };
        let duration_s = s.base_handling_seconds + travel_s + f64::from(tier) * s.lift_seconds_per_tier;

        MoveCost {
            duration_s: (duration_s * 10.0).round() / 10.0,
            distance_crane: (distance_crane * 10.0).round() / 10.0,
            crane_id,
            from_truck_zone_id: from_zone,
            to_truck_zone_id: to_zone,
            distance_internal_truck: s.gate_distance_m + bay_offset_m,
            distance_external_truck: s.external_truck_distance_m,
        }
    }

    fn name(&self) -> &'static str {
        "coordinate"
    }
}

/// 按配置构建代价模型
pub fn build_cost_model(settings: &PlannerSettings) -> Arc<dyn CostModel> {
    match settings.cost_model {
        CostModelKind::Coordinate => Arc::new(CoordinateCostModel::new(settings)),
        CostModelKind::Random => Arc::new(RandomizedCostModel::new(settings)),
        CostModelKind::Fixed => Arc::new(FixedCostModel {
            crane_id: format!("{}-01", settings.crane_id_prefix),
            gate_zone_id: settings.gate_zone_id.clone(),
            distance_internal_truck: settings.gate_distance_m,
            distance_external_truck: settings.external_truck_distance_m,
            ..FixedCostModel::default()
        }),
    }
}
