//! Entity catalog: the validated, read-only input of a scheduling run.
//!
//! An [`EntityCatalog`] can only be obtained through validation, so every
//! identifier in it is unique and every reference resolves. Slots are kept in
//! chronological order, which is what gives KDV durations their meaning.

pub mod entities;
pub mod validation;

pub use entities::{EntityKind, Kdv, Preference, Resource, Slot};
pub use validation::{validate_entities, InputError};

use serde::Deserialize;
use std::collections::HashMap;
use std::ops::Range;

/// Error raised when raw input cannot become a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("invalid catalog ({} error(s)): {}", .0.len(), join_errors(.0))]
    Invalid(Vec<InputError>),
}

fn join_errors(errors: &[InputError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Raw catalog contents as supplied by an input loader.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogData {
    #[serde(default)]
    pub kdvs: Vec<Kdv>,
    #[serde(default)]
    pub slots: Vec<Slot>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub preferences: Vec<Preference>,
}

/// Validated, immutable snapshot of KDVs, slots, resources and preferences.
#[derive(Debug, Clone)]
pub struct EntityCatalog {
    kdvs: Vec<Kdv>,
    slots: Vec<Slot>,
    resources: Vec<Resource>,
    preferences: Vec<Preference>,
    kdv_index: HashMap<String, usize>,
    slot_index: HashMap<String, usize>,
    resource_index: HashMap<String, usize>,
    /// `(kdv, slot, resource)` → weight; `None` resource applies to every resource.
    weights: HashMap<(usize, usize, Option<usize>), f64>,
    /// Number of back-to-back slots starting at each slot index.
    contiguous_run: Vec<usize>,
}

impl EntityCatalog {
    /// Validates the entities and builds the catalog.
    pub fn new(
        kdvs: Vec<Kdv>,
        mut slots: Vec<Slot>,
        resources: Vec<Resource>,
        preferences: Vec<Preference>,
    ) -> Result<Self, CatalogError> {
        validate_entities(&kdvs, &slots, &resources, &preferences)
            .map_err(CatalogError::Invalid)?;

        slots.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));

        let kdv_index = index_by_id(kdvs.iter().map(|k| k.id.as_str()));
        let slot_index = index_by_id(slots.iter().map(|s| s.id.as_str()));
        let resource_index = index_by_id(resources.iter().map(|r| r.id.as_str()));

        let mut weights = HashMap::new();
        for preference in &preferences {
            // References were checked by validation
            let (Some(&k), Some(&s)) = (
                kdv_index.get(&preference.kdv),
                slot_index.get(&preference.slot),
            ) else {
                continue;
            };
            let r = preference
                .resource
                .as_ref()
                .and_then(|id| resource_index.get(id).copied());
            weights.insert((k, s, r), preference.weight);
        }

        let mut contiguous_run = vec![1; slots.len()];
        for i in (0..slots.len().saturating_sub(1)).rev() {
            if slots[i].end == slots[i + 1].start {
                contiguous_run[i] = contiguous_run[i + 1] + 1;
            }
        }

        Ok(Self {
            kdvs,
            slots,
            resources,
            preferences,
            kdv_index,
            slot_index,
            resource_index,
            weights,
            contiguous_run,
        })
    }

    pub fn kdvs(&self) -> &[Kdv] {
        &self.kdvs
    }

    /// Slots in chronological order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn preferences(&self) -> &[Preference] {
        &self.preferences
    }

    pub fn kdv_index(&self, id: &str) -> Option<usize> {
        self.kdv_index.get(id).copied()
    }

    pub fn slot_index(&self, id: &str) -> Option<usize> {
        self.slot_index.get(id).copied()
    }

    pub fn resource_index(&self, id: &str) -> Option<usize> {
        self.resource_index.get(id).copied()
    }

    /// Explicit preference weight of KDV `k` for slot `s` with resource `r`.
    ///
    /// A resource-specific preference wins over one that names no resource.
    pub fn preference_weight(&self, k: usize, s: usize, r: usize) -> Option<f64> {
        self.weights
            .get(&(k, s, Some(r)))
            .or_else(|| self.weights.get(&(k, s, None)))
            .copied()
    }

    /// Slot indices covered by a KDV of `duration` starting at slot `start`,
    /// or `None` when the slots running out or a gap between them makes the
    /// placement impossible.
    pub fn covered_slots(&self, start: usize, duration: u32) -> Option<Range<usize>> {
        let duration = duration as usize;
        let run = *self.contiguous_run.get(start)?;
        (duration >= 1 && run >= duration).then_some(start..start + duration)
    }

    /// Capacity of resource `r` in slot `s`.
    pub fn resource_capacity(&self, r: usize, s: usize) -> u32 {
        self.resources[r].capacity_in(&self.slots[s].id)
    }

    pub fn is_empty(&self) -> bool {
        self.kdvs.is_empty()
    }
}

impl TryFrom<CatalogData> for EntityCatalog {
    type Error = CatalogError;

    fn try_from(data: CatalogData) -> Result<Self, Self::Error> {
        EntityCatalog::new(data.kdvs, data.slots, data.resources, data.preferences)
    }
}

fn index_by_id<'a>(ids: impl Iterator<Item = &'a str>) -> HashMap<String, usize> {
    ids.enumerate().map(|(i, id)| (id.to_string(), i)).collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Catalog builders shared by tests across the crate.

    use super::*;
    use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

    /// 2024-01-01 at `h` hours past midnight (may run into following days).
    pub fn hour(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + TimeDelta::hours(i64::from(h))
    }

    /// `n` back-to-back one-hour slots `S0..S{n-1}` starting at 08:00.
    pub fn day_slots(n: usize) -> Vec<Slot> {
        (0..n as u32)
            .map(|i| Slot::new(format!("S{i}"), hour(8 + i), hour(9 + i)))
            .collect()
    }

    pub fn slot_ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("S{i}")).collect()
    }

    /// `kdvs` KDVs all eligible for every slot and resource; resources are
    /// available everywhere and carry one KDV per slot.
    pub fn uniform_catalog(kdvs: usize, slots: usize, resources: usize) -> EntityCatalog {
        let slot_list = day_slots(slots);
        let resource_list: Vec<Resource> = (0..resources)
            .map(|i| Resource::new(format!("R{i}")).with_availability(slot_ids(slots)))
            .collect();
        let kdv_list: Vec<Kdv> = (0..kdvs)
            .map(|i| {
                Kdv::new(format!("K{i}"))
                    .with_slots(slot_ids(slots))
                    .with_resources(resource_list.iter().map(|r| r.id.clone()))
            })
            .collect();
        EntityCatalog::new(kdv_list, slot_list, resource_list, Vec::new()).unwrap()
    }
}
