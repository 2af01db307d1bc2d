//! Per-slot, per-resource and per-KDV figures reported next to a schedule.
//!
//! Desirability and flexibility are computed from each KDV's best preference
//! per start slot, normalised so the KDV's values average 1 over all slots:
//! - slot desirability is the mean normalised value across KDVs (1.0 when
//!   everyone is indifferent, higher for popular slots)
//! - KDV flexibility is mean over max of its values (1.0 for a KDV that is
//!   indifferent across every slot, near 0 for one that fits a single slot)

use serde::Serialize;

use crate::catalog::EntityCatalog;
use crate::model::BuiltModel;

#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub slots: Vec<SlotUsage>,
    pub resources: Vec<ResourceLoad>,
    pub kdvs: Vec<KdvFlexibility>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotUsage {
    pub slot: String,
    pub occupancy: u32,
    pub capacity: u32,
    /// Remaining room in the slot-capacity constraint.
    pub slack: u32,
    pub experienced: u32,
    pub desirability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceLoad {
    pub resource: String,
    pub assigned: u32,
    pub max_assignments: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KdvFlexibility {
    pub kdv: String,
    /// `None` for KDVs without any feasible pair.
    pub flexibility: Option<f64>,
}

pub(crate) fn diagnose(
    catalog: &EntityCatalog,
    model: &BuiltModel,
    selected: &[usize],
) -> Diagnostics {
    let slots = catalog.slots();
    let resources = catalog.resources();
    let threshold = model.config.experience_threshold_months;

    let mut occupancy = vec![0u32; slots.len()];
    let mut experienced = vec![0u32; slots.len()];
    let mut assigned = vec![0u32; resources.len()];
    for &j in selected {
        let c = &model.candidates[j];
        assigned[c.resource] += 1;
        let is_experienced = resources[c.resource].is_experienced(threshold);
        for s in c.covers.clone() {
            occupancy[s] += 1;
            if is_experienced {
                experienced[s] += 1;
            }
        }
    }

    // best preference per (kdv, start slot)
    let mut best = vec![vec![0.0f64; slots.len()]; catalog.kdvs().len()];
    for c in &model.candidates {
        let cell = &mut best[c.kdv][c.slot];
        *cell = cell.max(c.preference);
    }

    let mut desirability = vec![0.0; slots.len()];
    let mut kdvs = Vec::with_capacity(catalog.kdvs().len());
    for (k, kdv) in catalog.kdvs().iter().enumerate() {
        let row = &best[k];
        let total: f64 = row.iter().sum();
        let max = row.iter().copied().fold(0.0, f64::max);
        let flexibility = if max > 0.0 && !slots.is_empty() {
            let mean = total / slots.len() as f64;
            for (s, value) in row.iter().enumerate() {
                desirability[s] += value / mean;
            }
            Some(mean / max)
        } else {
            None
        };
        kdvs.push(KdvFlexibility {
            kdv: kdv.id.clone(),
            flexibility,
        });
    }
    if !catalog.is_empty() {
        let n = catalog.kdvs().len() as f64;
        for value in &mut desirability {
            *value /= n;
        }
    }

    Diagnostics {
        slots: slots
            .iter()
            .enumerate()
            .map(|(s, slot)| SlotUsage {
                slot: slot.id.clone(),
                occupancy: occupancy[s],
                capacity: slot.capacity,
                slack: slot.capacity.saturating_sub(occupancy[s]),
                experienced: experienced[s],
                desirability: desirability[s],
            })
            .collect(),
        resources: resources
            .iter()
            .enumerate()
            .map(|(r, resource)| ResourceLoad {
                resource: resource.id.clone(),
                assigned: assigned[r],
                max_assignments: resource.max_assignments,
            })
            .collect(),
        kdvs,
    }
}
