//! Catalog entities.
//!
//! A KDV is a unit of work (a duty, a session, a shift) that needs exactly one
//! start slot and one resource. Slots are discrete, chronologically ordered
//! intervals; resources are the people, rooms or assets that carry out KDVs.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

fn one() -> u32 {
    1
}

fn unit_priority() -> f64 {
    1.0
}

/// A schedulable activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kdv {
    /// Unique KDV identifier.
    pub id: String,
    /// Length in slot units (default: 1). A KDV of duration `d` starting at
    /// slot `s` occupies `s` and the `d - 1` slots that directly follow it.
    #[serde(default = "one")]
    pub duration: u32,
    /// Resources allowed to carry out this KDV.
    #[serde(default)]
    pub eligible_resources: BTreeSet<String>,
    /// Slots this KDV may start in.
    #[serde(default)]
    pub eligible_slots: BTreeSet<String>,
    /// Multiplier applied to every preference weight of this KDV (default: 1.0).
    #[serde(default = "unit_priority")]
    pub priority: f64,
}

impl Kdv {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            duration: 1,
            eligible_resources: BTreeSet::new(),
            eligible_slots: BTreeSet::new(),
            priority: 1.0,
        }
    }

    pub fn with_duration(mut self, duration: u32) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_slots<I, S>(mut self, slots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.eligible_slots.extend(slots.into_iter().map(Into::into));
        self
    }

    pub fn with_resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.eligible_resources
            .extend(resources.into_iter().map(Into::into));
        self
    }
}

/// A discrete scheduling interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    /// Unique slot identifier.
    pub id: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Number of KDVs the slot can host concurrently, over all resources (default: 1).
    #[serde(default = "one")]
    pub capacity: u32,
    /// Minimum number of KDVs that must occupy the slot (default: 0).
    #[serde(default)]
    pub min_occupancy: u32,
    /// Minimum number of occupying KDVs carried out by experienced resources (default: 0).
    #[serde(default)]
    pub min_experienced: u32,
}

impl Slot {
    pub fn new(id: impl Into<String>, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            id: id.into(),
            start,
            end,
            capacity: 1,
            min_occupancy: 0,
            min_experienced: 0,
        }
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_min_occupancy(mut self, min_occupancy: u32) -> Self {
        self.min_occupancy = min_occupancy;
        self
    }

    pub fn with_min_experienced(mut self, min_experienced: u32) -> Self {
        self.min_experienced = min_experienced;
        self
    }
}

/// A schedulable asset: a person, a room, a piece of equipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique resource identifier.
    pub id: String,
    /// Slots in which the resource can be used.
    #[serde(default)]
    pub available_slots: BTreeSet<String>,
    /// KDVs the resource can carry at the same time in any slot (default: 1).
    #[serde(default = "one")]
    pub capacity: u32,
    /// Per-slot overrides of `capacity`.
    #[serde(default)]
    pub slot_capacity: BTreeMap<String, u32>,
    /// Upper bound on the total number of KDVs assigned to this resource.
    #[serde(default)]
    pub max_assignments: Option<u32>,
    /// Months of experience; compared against the model's experience threshold.
    #[serde(default)]
    pub experience_months: Option<u32>,
}

impl Resource {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            available_slots: BTreeSet::new(),
            capacity: 1,
            slot_capacity: BTreeMap::new(),
            max_assignments: None,
            experience_months: None,
        }
    }

    pub fn with_availability<I, S>(mut self, slots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.available_slots.extend(slots.into_iter().map(Into::into));
        self
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_slot_capacity(mut self, slot: impl Into<String>, capacity: u32) -> Self {
        self.slot_capacity.insert(slot.into(), capacity);
        self
    }

    pub fn with_max_assignments(mut self, max: u32) -> Self {
        self.max_assignments = Some(max);
        self
    }

    pub fn with_experience_months(mut self, months: u32) -> Self {
        self.experience_months = Some(months);
        self
    }

    /// Capacity of this resource in the given slot.
    pub fn capacity_in(&self, slot: &str) -> u32 {
        self.slot_capacity
            .get(slot)
            .copied()
            .unwrap_or(self.capacity)
    }

    /// Whether the resource has strictly more experience than `threshold_months`.
    pub fn is_experienced(&self, threshold_months: u32) -> bool {
        self.experience_months
            .is_some_and(|months| months > threshold_months)
    }
}

/// Weighted wish of a KDV for a slot, optionally restricted to one resource.
///
/// A weight of zero forbids the pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preference {
    pub kdv: String,
    pub slot: String,
    /// When absent the preference applies to every resource.
    #[serde(default)]
    pub resource: Option<String>,
    pub weight: f64,
}

impl Preference {
    pub fn new(kdv: impl Into<String>, slot: impl Into<String>, weight: f64) -> Self {
        Self {
            kdv: kdv.into(),
            slot: slot.into(),
            resource: None,
            weight,
        }
    }

    pub fn for_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Identifier used when reporting problems with this preference.
    pub fn key(&self) -> String {
        match &self.resource {
            Some(resource) => format!("{}/{}/{}", self.kdv, self.slot, resource),
            None => format!("{}/{}", self.kdv, self.slot),
        }
    }
}

/// Kind of catalog entity, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Kdv,
    Slot,
    Resource,
    Preference,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Kdv => write!(f, "KDV"),
            EntityKind::Slot => write!(f, "slot"),
            EntityKind::Resource => write!(f, "resource"),
            EntityKind::Preference => write!(f, "preference"),
        }
    }
}
