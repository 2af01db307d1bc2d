//! Input validation for the entity catalog.
//!
//! Runs before any model is built and collects every problem it finds, so a
//! schedule administrator can fix an input file in one pass. Detects:
//! - Duplicate IDs (per entity kind, and duplicate preferences)
//! - References to unknown KDVs, slots or resources
//! - Out-of-range values (zero duration or capacity, inverted slot times,
//!   negative weights, slot minimums above capacity)

use super::entities::{EntityKind, Kdv, Preference, Resource, Slot};
use std::collections::HashSet;

/// A single problem found in the input, naming the offending entity.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("duplicate {kind} id '{id}'")]
    DuplicateId { kind: EntityKind, id: String },

    #[error("{kind} '{id}' references unknown {target} '{reference}'")]
    UnknownReference {
        kind: EntityKind,
        id: String,
        target: EntityKind,
        reference: String,
    },

    #[error("{kind} '{id}': {reason}")]
    InvalidValue {
        kind: EntityKind,
        id: String,
        reason: String,
    },
}

impl InputError {
    /// Identifier of the entity the error is about.
    pub fn entity_id(&self) -> &str {
        match self {
            InputError::DuplicateId { id, .. }
            | InputError::UnknownReference { id, .. }
            | InputError::InvalidValue { id, .. } => id,
        }
    }

    fn invalid(kind: EntityKind, id: &str, reason: impl Into<String>) -> Self {
        InputError::InvalidValue {
            kind,
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    fn unknown(kind: EntityKind, id: &str, target: EntityKind, reference: &str) -> Self {
        InputError::UnknownReference {
            kind,
            id: id.to_string(),
            target,
            reference: reference.to_string(),
        }
    }
}

/// Validates raw catalog entities.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_entities(
    kdvs: &[Kdv],
    slots: &[Slot],
    resources: &[Resource],
    preferences: &[Preference],
) -> Result<(), Vec<InputError>> {
    let mut errors = Vec::new();

    let slot_ids = unique_ids(EntityKind::Slot, slots.iter().map(|s| s.id.as_str()), &mut errors);
    let resource_ids = unique_ids(
        EntityKind::Resource,
        resources.iter().map(|r| r.id.as_str()),
        &mut errors,
    );
    let kdv_ids = unique_ids(EntityKind::Kdv, kdvs.iter().map(|k| k.id.as_str()), &mut errors);

    for slot in slots {
        if slot.end <= slot.start {
            errors.push(InputError::invalid(
                EntityKind::Slot,
                &slot.id,
                format!("end {} is not after start {}", slot.end, slot.start),
            ));
        }
        if slot.capacity == 0 {
            errors.push(InputError::invalid(EntityKind::Slot, &slot.id, "capacity must be at least 1"));
        }
        if slot.min_occupancy > slot.capacity {
            errors.push(InputError::invalid(
                EntityKind::Slot,
                &slot.id,
                format!(
                    "min_occupancy {} exceeds capacity {}",
                    slot.min_occupancy, slot.capacity
                ),
            ));
        }
        if slot.min_experienced > slot.capacity {
            errors.push(InputError::invalid(
                EntityKind::Slot,
                &slot.id,
                format!(
                    "min_experienced {} exceeds capacity {}",
                    slot.min_experienced, slot.capacity
                ),
            ));
        }
    }

    for resource in resources {
        if resource.capacity == 0 {
            errors.push(InputError::invalid(
                EntityKind::Resource,
                &resource.id,
                "capacity must be at least 1",
            ));
        }
        for slot in resource
            .available_slots
            .iter()
            .chain(resource.slot_capacity.keys())
        {
            if !slot_ids.contains(slot.as_str()) {
                errors.push(InputError::unknown(
                    EntityKind::Resource,
                    &resource.id,
                    EntityKind::Slot,
                    slot,
                ));
            }
        }
    }

    for kdv in kdvs {
        if kdv.duration == 0 {
            errors.push(InputError::invalid(EntityKind::Kdv, &kdv.id, "duration must be at least 1"));
        }
        if !kdv.priority.is_finite() || kdv.priority <= 0.0 {
            errors.push(InputError::invalid(
                EntityKind::Kdv,
                &kdv.id,
                format!("priority must be a positive number, got {}", kdv.priority),
            ));
        }
        for slot in &kdv.eligible_slots {
            if !slot_ids.contains(slot.as_str()) {
                errors.push(InputError::unknown(EntityKind::Kdv, &kdv.id, EntityKind::Slot, slot));
            }
        }
        for resource in &kdv.eligible_resources {
            if !resource_ids.contains(resource.as_str()) {
                errors.push(InputError::unknown(
                    EntityKind::Kdv,
                    &kdv.id,
                    EntityKind::Resource,
                    resource,
                ));
            }
        }
    }

    let mut preference_keys = HashSet::new();
    for preference in preferences {
        let key = preference.key();
        if !preference_keys.insert(key.clone()) {
            errors.push(InputError::DuplicateId {
                kind: EntityKind::Preference,
                id: key.clone(),
            });
        }
        if !kdv_ids.contains(preference.kdv.as_str()) {
            errors.push(InputError::unknown(
                EntityKind::Preference,
                &key,
                EntityKind::Kdv,
                &preference.kdv,
            ));
        }
        if !slot_ids.contains(preference.slot.as_str()) {
            errors.push(InputError::unknown(
                EntityKind::Preference,
                &key,
                EntityKind::Slot,
                &preference.slot,
            ));
        }
        if let Some(resource) = &preference.resource {
            if !resource_ids.contains(resource.as_str()) {
                errors.push(InputError::unknown(
                    EntityKind::Preference,
                    &key,
                    EntityKind::Resource,
                    resource,
                ));
            }
        }
        if !preference.weight.is_finite() || preference.weight < 0.0 {
            errors.push(InputError::invalid(
                EntityKind::Preference,
                &key,
                format!("weight must be a non-negative number, got {}", preference.weight),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn unique_ids<'a>(
    kind: EntityKind,
    ids: impl Iterator<Item = &'a str>,
    errors: &mut Vec<InputError>,
) -> HashSet<&'a str> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            errors.push(InputError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::{day_slots, hour};

    fn sample() -> (Vec<Kdv>, Vec<Slot>, Vec<Resource>, Vec<Preference>) {
        let slots = day_slots(2);
        let resources = vec![Resource::new("R1").with_availability(["S0", "S1"])];
        let kdvs = vec![
            Kdv::new("K1").with_slots(["S0", "S1"]).with_resources(["R1"]),
            Kdv::new("K2").with_slots(["S1"]).with_resources(["R1"]),
        ];
        let preferences = vec![Preference::new("K1", "S0", 2.0)];
        (kdvs, slots, resources, preferences)
    }

    #[test]
    fn test_valid_input() {
        let (kdvs, slots, resources, preferences) = sample();
        assert!(validate_entities(&kdvs, &slots, &resources, &preferences).is_ok());
    }

    #[test]
    fn test_duplicate_ids() {
        let (mut kdvs, mut slots, resources, preferences) = sample();
        kdvs.push(Kdv::new("K1"));
        slots.push(slots[0].clone());

        let errors = validate_entities(&kdvs, &slots, &resources, &preferences).unwrap_err();
        assert!(errors.contains(&InputError::DuplicateId {
            kind: EntityKind::Kdv,
            id: "K1".into()
        }));
        assert!(errors.contains(&InputError::DuplicateId {
            kind: EntityKind::Slot,
            id: "S0".into()
        }));
    }

    #[test]
    fn test_duplicate_preference() {
        let (kdvs, slots, resources, mut preferences) = sample();
        preferences.push(Preference::new("K1", "S0", 5.0));
        // Same pair but scoped to a resource is a different preference
        preferences.push(Preference::new("K1", "S0", 5.0).for_resource("R1"));

        let errors = validate_entities(&kdvs, &slots, &resources, &preferences).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].entity_id(), "K1/S0");
    }

    #[test]
    fn test_unknown_references() {
        let (mut kdvs, slots, mut resources, mut preferences) = sample();
        kdvs[0].eligible_slots.insert("NOPE".into());
        kdvs[1].eligible_resources.insert("R9".into());
        resources[0].available_slots.insert("S7".into());
        preferences.push(Preference::new("K9", "S0", 1.0));

        let errors = validate_entities(&kdvs, &slots, &resources, &preferences).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors
            .iter()
            .all(|e| matches!(e, InputError::UnknownReference { .. })));
        assert!(errors.iter().any(|e| e.entity_id() == "K1"));
        assert!(errors.iter().any(|e| e.entity_id() == "R1"));
    }

    #[test]
    fn test_invalid_values() {
        let (mut kdvs, mut slots, mut resources, mut preferences) = sample();
        kdvs[0].duration = 0;
        kdvs[1].priority = -1.0;
        slots[0].end = slots[0].start;
        slots[1].min_occupancy = 3;
        resources[0].capacity = 0;
        preferences[0].weight = f64::NAN;

        let errors = validate_entities(&kdvs, &slots, &resources, &preferences).unwrap_err();
        assert_eq!(errors.len(), 6);
        assert!(errors
            .iter()
            .all(|e| matches!(e, InputError::InvalidValue { .. })));
    }

    #[test]
    fn test_error_message_names_entity() {
        let slots = vec![Slot::new("late", hour(10), hour(9))];
        let errors = validate_entities(&[], &slots, &[], &[]).unwrap_err();
        assert!(errors[0].to_string().starts_with("slot 'late'"));
    }
}
