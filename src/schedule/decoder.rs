use std::collections::{BTreeMap, HashMap};

use log::{debug, error};

use super::diagnostics;
use super::{Assignment, NoSchedule, Schedule, ScheduleOutcome, UnscheduledKdv, UnscheduledReason};
use crate::catalog::EntityCatalog;
use crate::domain::Solution;
use crate::model::{AssignmentPolicy, BuiltModel};

/// A binary variable counts as chosen when its value exceeds this threshold.
///
/// MIP engines return binaries as doubles that may sit slightly off 0 or 1,
/// so exact comparison is never used.
pub const BINARY_THRESHOLD: f64 = 0.5;

/// A catalog invariant broken by a decoded selection.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Violation {
    #[error("KDV '{kdv}' is assigned {count} times")]
    MultipleAssignments { kdv: String, count: usize },

    #[error("KDV '{kdv}' must be assigned but is not")]
    MissingAssignment { kdv: String },

    #[error("KDV '{kdv}' is not eligible for slot '{slot}'")]
    IneligibleSlot { kdv: String, slot: String },

    #[error("KDV '{kdv}' is not eligible for resource '{resource}'")]
    IneligibleResource { kdv: String, resource: String },

    #[error("KDV '{kdv}' cannot run its full duration from slot '{slot}'")]
    InvalidCoverage { kdv: String, slot: String },

    #[error("resource '{resource}' is not available in slot '{slot}' (KDV '{kdv}')")]
    Unavailable {
        kdv: String,
        resource: String,
        slot: String,
    },

    #[error("KDV '{kdv}' is forbidden in slot '{slot}' with resource '{resource}'")]
    ForbiddenPairing {
        kdv: String,
        slot: String,
        resource: String,
    },

    #[error("resource '{resource}' holds {occupancy} KDVs in slot '{slot}', capacity {capacity}")]
    ResourceOverbooked {
        resource: String,
        slot: String,
        occupancy: u32,
        capacity: u32,
    },

    #[error("slot '{slot}' holds {occupancy} KDVs, capacity {capacity}")]
    SlotOverbooked {
        slot: String,
        occupancy: u32,
        capacity: u32,
    },

    #[error("resource '{resource}' has {assigned} assignments, maximum {max}")]
    ResourceOverloaded {
        resource: String,
        assigned: u32,
        max: u32,
    },

    #[error("slot '{slot}' holds {occupancy} KDVs, minimum {min}")]
    SlotUnderstaffed { slot: String, occupancy: u32, min: u32 },

    #[error("slot '{slot}' has {experienced} experienced resources, minimum {min}")]
    TooFewExperienced {
        slot: String,
        experienced: u32,
        min: u32,
    },
}

/// Errors raised while decoding a solution.
///
/// Both variants mean the model builder, the solver adapter and the decoder
/// disagree; they are internal errors and must reach the caller unchanged.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("solution has {got} values but the model has {expected} variables")]
    ValueCountMismatch { expected: usize, got: usize },

    #[error(
        "decoded schedule is inconsistent with the catalog ({} violation(s)): {}",
        .0.len(),
        .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
    )]
    Inconsistent(Vec<Violation>),

    #[error("assignment {kdv}/{slot}/{resource} has no matching model variable")]
    UnknownAssignment {
        kdv: String,
        slot: String,
        resource: String,
    },
}

/// Turns solver values for a [`BuiltModel`] into a [`ScheduleOutcome`].
pub struct ScheduleDecoder<'a> {
    catalog: &'a EntityCatalog,
    model: &'a BuiltModel,
}

impl<'a> ScheduleDecoder<'a> {
    pub fn new(catalog: &'a EntityCatalog, model: &'a BuiltModel) -> Self {
        Self { catalog, model }
    }

    pub fn decode(&self, solution: &Solution) -> Result<ScheduleOutcome, DecodeError> {
        if !solution.is_feasible() {
            return Ok(ScheduleOutcome::NoSchedule(NoSchedule {
                status: solution.status,
                message: solution.message.clone(),
                interrupted: solution.interrupted,
                structurally_infeasible: self.model.structurally_infeasible.clone(),
            }));
        }

        let selected = self.selected(&solution.variable_values)?;
        let violations = self.verify(&selected);
        if !violations.is_empty() {
            error!(
                "Decoded selection breaks {} catalog invariant(s)",
                violations.len()
            );
            return Err(DecodeError::Inconsistent(violations));
        }

        let schedule = Schedule {
            status: solution.status,
            assignments: self.assignments(&selected),
            unscheduled: self.unscheduled(&selected),
            objective_value: self.model.preference_value(&selected),
            solver_objective: solution.objective_value,
            gap: solution.gap,
            interrupted: solution.interrupted,
            message: solution.message.clone(),
            statistics: solution.statistics.clone(),
            quality: solution.quality.clone(),
            diagnostics: diagnostics::diagnose(self.catalog, self.model, &selected),
        };
        debug!(
            "Decoded {} assignment(s), {} unscheduled KDV(s)",
            schedule.assignments.len(),
            schedule.unscheduled.len()
        );

        Ok(ScheduleOutcome::Scheduled(schedule))
    }

    /// Variable indices whose value exceeds [`BINARY_THRESHOLD`].
    pub fn selected(&self, values: &[f64]) -> Result<Vec<usize>, DecodeError> {
        if values.len() != self.model.num_variables() {
            return Err(DecodeError::ValueCountMismatch {
                expected: self.model.num_variables(),
                got: values.len(),
            });
        }
        Ok(values
            .iter()
            .enumerate()
            .filter(|(_, &value)| value > BINARY_THRESHOLD)
            .map(|(j, _)| j)
            .collect())
    }

    /// Re-encodes assignments as a full 0/1 vector over the model's variables.
    pub fn encode(&self, assignments: &[Assignment]) -> Result<Vec<f64>, DecodeError> {
        let catalog = self.catalog;
        let index: HashMap<(usize, usize, usize), usize> = self
            .model
            .candidates
            .iter()
            .enumerate()
            .map(|(j, c)| ((c.kdv, c.slot, c.resource), j))
            .collect();

        let mut values = vec![0.0; self.model.num_variables()];
        for assignment in assignments {
            let unknown = || DecodeError::UnknownAssignment {
                kdv: assignment.kdv.clone(),
                slot: assignment.slot.clone(),
                resource: assignment.resource.clone(),
            };
            let key = (
                catalog.kdv_index(&assignment.kdv).ok_or_else(unknown)?,
                catalog.slot_index(&assignment.slot).ok_or_else(unknown)?,
                catalog.resource_index(&assignment.resource).ok_or_else(unknown)?,
            );
            let j = index.get(&key).copied().ok_or_else(unknown)?;
            values[j] = 1.0;
        }
        Ok(values)
    }

    /// Checks a selection against the catalog itself, independently of how the
    /// model was formulated.
    pub fn verify(&self, selected: &[usize]) -> Vec<Violation> {
        let catalog = self.catalog;
        let kdvs = catalog.kdvs();
        let slots = catalog.slots();
        let resources = catalog.resources();
        let threshold = self.model.config.experience_threshold_months;

        let mut violations = Vec::new();
        let mut per_kdv = vec![0usize; kdvs.len()];
        let mut per_slot_resource: BTreeMap<(usize, usize), u32> = BTreeMap::new();
        let mut per_slot = vec![0u32; slots.len()];
        let mut experienced_per_slot = vec![0u32; slots.len()];
        let mut per_resource = vec![0u32; resources.len()];

        for &j in selected {
            let c = &self.model.candidates[j];
            let (kdv, slot, resource) = (&kdvs[c.kdv], &slots[c.slot], &resources[c.resource]);
            per_kdv[c.kdv] += 1;
            per_resource[c.resource] += 1;

            if !kdv.eligible_slots.contains(&slot.id) {
                violations.push(Violation::IneligibleSlot {
                    kdv: kdv.id.clone(),
                    slot: slot.id.clone(),
                });
            }
            if !kdv.eligible_resources.contains(&resource.id) {
                violations.push(Violation::IneligibleResource {
                    kdv: kdv.id.clone(),
                    resource: resource.id.clone(),
                });
            }
            if catalog.preference_weight(c.kdv, c.slot, c.resource) == Some(0.0) {
                violations.push(Violation::ForbiddenPairing {
                    kdv: kdv.id.clone(),
                    slot: slot.id.clone(),
                    resource: resource.id.clone(),
                });
            }

            let Some(covers) = catalog.covered_slots(c.slot, kdv.duration) else {
                violations.push(Violation::InvalidCoverage {
                    kdv: kdv.id.clone(),
                    slot: slot.id.clone(),
                });
                continue;
            };

            let experienced = resource.is_experienced(threshold);
            for s in covers {
                if !resource.available_slots.contains(&slots[s].id) {
                    violations.push(Violation::Unavailable {
                        kdv: kdv.id.clone(),
                        resource: resource.id.clone(),
                        slot: slots[s].id.clone(),
                    });
                }
                *per_slot_resource.entry((s, c.resource)).or_default() += 1;
                per_slot[s] += 1;
                if experienced {
                    experienced_per_slot[s] += 1;
                }
            }
        }

        for (k, &count) in per_kdv.iter().enumerate() {
            if count > 1 {
                violations.push(Violation::MultipleAssignments {
                    kdv: kdvs[k].id.clone(),
                    count,
                });
            }
        }
        if self.model.config.assignment_policy == AssignmentPolicy::Exact {
            for &k in &self.model.modelled_kdvs {
                if per_kdv[k] == 0 {
                    violations.push(Violation::MissingAssignment {
                        kdv: kdvs[k].id.clone(),
                    });
                }
            }
        }

        for (&(s, r), &occupancy) in &per_slot_resource {
            let capacity = catalog.resource_capacity(r, s);
            if occupancy > capacity {
                violations.push(Violation::ResourceOverbooked {
                    resource: resources[r].id.clone(),
                    slot: slots[s].id.clone(),
                    occupancy,
                    capacity,
                });
            }
        }

        for (s, slot) in slots.iter().enumerate() {
            if per_slot[s] > slot.capacity {
                violations.push(Violation::SlotOverbooked {
                    slot: slot.id.clone(),
                    occupancy: per_slot[s],
                    capacity: slot.capacity,
                });
            }
            if per_slot[s] < slot.min_occupancy {
                violations.push(Violation::SlotUnderstaffed {
                    slot: slot.id.clone(),
                    occupancy: per_slot[s],
                    min: slot.min_occupancy,
                });
            }
            if experienced_per_slot[s] < slot.min_experienced {
                violations.push(Violation::TooFewExperienced {
                    slot: slot.id.clone(),
                    experienced: experienced_per_slot[s],
                    min: slot.min_experienced,
                });
            }
        }

        for (r, resource) in resources.iter().enumerate() {
            if let Some(max) = resource.max_assignments {
                if per_resource[r] > max {
                    violations.push(Violation::ResourceOverloaded {
                        resource: resource.id.clone(),
                        assigned: per_resource[r],
                        max,
                    });
                }
            }
        }

        violations
    }

    fn assignments(&self, selected: &[usize]) -> Vec<Assignment> {
        let catalog = self.catalog;
        let mut ordered: Vec<usize> = selected.to_vec();
        ordered.sort_by(|&a, &b| {
            let (ca, cb) = (&self.model.candidates[a], &self.model.candidates[b]);
            ca.slot
                .cmp(&cb.slot)
                .then_with(|| catalog.kdvs()[ca.kdv].id.cmp(&catalog.kdvs()[cb.kdv].id))
        });

        ordered
            .into_iter()
            .map(|j| {
                let c = &self.model.candidates[j];
                Assignment {
                    kdv: catalog.kdvs()[c.kdv].id.clone(),
                    slot: catalog.slots()[c.slot].id.clone(),
                    resource: catalog.resources()[c.resource].id.clone(),
                    covered_slots: c
                        .covers
                        .clone()
                        .map(|s| catalog.slots()[s].id.clone())
                        .collect(),
                    weight: c.weight,
                }
            })
            .collect()
    }

    fn unscheduled(&self, selected: &[usize]) -> Vec<UnscheduledKdv> {
        let mut scheduled = vec![false; self.catalog.kdvs().len()];
        for &j in selected {
            scheduled[self.model.candidates[j].kdv] = true;
        }

        let mut unscheduled: Vec<UnscheduledKdv> = self
            .model
            .structurally_infeasible
            .iter()
            .map(|id| UnscheduledKdv {
                kdv: id.clone(),
                reason: UnscheduledReason::StructurallyInfeasible,
            })
            .chain(
                self.model
                    .modelled_kdvs
                    .iter()
                    .filter(|&&k| !scheduled[k])
                    .map(|&k| UnscheduledKdv {
                        kdv: self.catalog.kdvs()[k].id.clone(),
                        reason: UnscheduledReason::NotSelected,
                    }),
            )
            .collect();
        unscheduled.sort_by(|a, b| a.kdv.cmp(&b.kdv));
        unscheduled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::{day_slots, slot_ids, uniform_catalog};
    use crate::catalog::{Kdv, Resource};
    use crate::domain::{SolutionStatus, SolverStatistics};
    use crate::model::{ModelBuilder, ModelConfig};

    fn build(catalog: &EntityCatalog, config: ModelConfig) -> BuiltModel {
        ModelBuilder::new(catalog, config).build().unwrap()
    }

    fn solution_with(values: Vec<f64>) -> Solution {
        Solution::optimal(0.0, values).with_statistics(SolverStatistics::default())
    }

    #[test]
    fn test_threshold_tolerates_float_binaries() {
        let catalog = uniform_catalog(2, 2, 1);
        let model = build(&catalog, ModelConfig::default());
        let decoder = ScheduleDecoder::new(&catalog, &model);
        // K0@S0, K0@S1, K1@S0, K1@S1
        let selected = decoder
            .selected(&[0.9999997, 1e-9, 2e-7, 1.0000001])
            .unwrap();
        assert_eq!(selected, [0, 3]);
    }

    #[test]
    fn test_decode_scheduled() {
        let catalog = uniform_catalog(3, 2, 1);
        let model = build(&catalog, ModelConfig::default());
        let decoder = ScheduleDecoder::new(&catalog, &model);
        // K0@S1, K2@S0
        let values = vec![0.0, 1.0, 0.0, 0.0, 1.0, 0.0];

        let outcome = decoder.decode(&solution_with(values)).unwrap();
        let schedule = outcome.schedule().unwrap();
        assert_eq!(schedule.scheduled_count(), 2);
        assert_eq!(schedule.assignments[0].kdv, "K2");
        assert_eq!(schedule.assignments[0].slot, "S0");
        assert_eq!(schedule.assignments[1].kdv, "K0");
        assert_eq!(schedule.assignment_for("K0").unwrap().resource, "R0");
        assert_eq!(
            schedule.unscheduled,
            [UnscheduledKdv {
                kdv: "K1".into(),
                reason: UnscheduledReason::NotSelected
            }]
        );
        assert_eq!(schedule.objective_value, 2.0);
    }

    #[test]
    fn test_decode_without_values() {
        let catalog = uniform_catalog(1, 1, 1);
        let model = build(&catalog, ModelConfig::default());
        let decoder = ScheduleDecoder::new(&catalog, &model);

        let outcome = decoder
            .decode(&Solution::new(SolutionStatus::Infeasible, "no solution"))
            .unwrap();
        assert!(outcome.schedule().is_none());
        assert_eq!(outcome.status(), SolutionStatus::Infeasible);
    }

    #[test]
    fn test_double_booking_is_fatal() {
        let catalog = uniform_catalog(2, 1, 1);
        let model = build(&catalog, ModelConfig::default());
        let decoder = ScheduleDecoder::new(&catalog, &model);

        let violations = match decoder.decode(&solution_with(vec![1.0, 1.0])) {
            Err(DecodeError::Inconsistent(violations)) => violations,
            other => panic!("expected inconsistency, got {other:?}"),
        };
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::ResourceOverbooked { occupancy: 2, .. })));
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::SlotOverbooked { occupancy: 2, .. })));
    }

    #[test]
    fn test_kdv_assigned_twice_is_fatal() {
        let catalog = uniform_catalog(1, 2, 1);
        let model = build(&catalog, ModelConfig::default());
        let violations = ScheduleDecoder::new(&catalog, &model).verify(&[0, 1]);
        assert_eq!(
            violations,
            [Violation::MultipleAssignments {
                kdv: "K0".into(),
                count: 2
            }]
        );
    }

    #[test]
    fn test_exact_policy_requires_every_modelled_kdv() {
        let catalog = uniform_catalog(2, 2, 1);
        let model = build(
            &catalog,
            ModelConfig::default().with_assignment_policy(AssignmentPolicy::Exact),
        );
        let violations = ScheduleDecoder::new(&catalog, &model).verify(&[0]);
        assert_eq!(
            violations,
            [Violation::MissingAssignment { kdv: "K1".into() }]
        );
    }

    #[test]
    fn test_value_count_mismatch() {
        let catalog = uniform_catalog(1, 2, 1);
        let model = build(&catalog, ModelConfig::default());
        let err = ScheduleDecoder::new(&catalog, &model)
            .decode(&solution_with(vec![1.0]))
            .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::ValueCountMismatch {
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn test_structurally_infeasible_reported_unscheduled() {
        let catalog = EntityCatalog::new(
            vec![
                Kdv::new("K0").with_slots(["S0"]).with_resources(["R0"]),
                Kdv::new("K1").with_resources(["R0"]),
            ],
            day_slots(1),
            vec![Resource::new("R0").with_availability(["S0"])],
            vec![],
        )
        .unwrap();
        let model = build(&catalog, ModelConfig::default());
        let outcome = ScheduleDecoder::new(&catalog, &model)
            .decode(&solution_with(vec![1.0]))
            .unwrap();
        let schedule = outcome.into_schedule().unwrap();
        assert_eq!(
            schedule.unscheduled,
            [UnscheduledKdv {
                kdv: "K1".into(),
                reason: UnscheduledReason::StructurallyInfeasible
            }]
        );
    }

    #[test]
    fn test_encode_round_trip() {
        let catalog = EntityCatalog::new(
            vec![Kdv::new("long")
                .with_duration(2)
                .with_slots(slot_ids(3))
                .with_resources(["R0"])],
            day_slots(3),
            vec![Resource::new("R0").with_availability(slot_ids(3))],
            vec![],
        )
        .unwrap();
        let model = build(&catalog, ModelConfig::default());
        let decoder = ScheduleDecoder::new(&catalog, &model);

        let outcome = decoder.decode(&solution_with(vec![0.0, 1.0])).unwrap();
        let schedule = outcome.schedule().unwrap();
        assert_eq!(schedule.assignments[0].covered_slots, ["S1", "S2"]);

        let values = decoder.encode(&schedule.assignments).unwrap();
        assert_eq!(values, [0.0, 1.0]);
        assert!(model.problem.is_satisfied_by(&values));
    }

    #[test]
    fn test_encode_rejects_unknown_triple() {
        let catalog = uniform_catalog(1, 1, 1);
        let model = build(&catalog, ModelConfig::default());
        let bogus = Assignment {
            kdv: "K0".into(),
            slot: "S0".into(),
            resource: "R9".into(),
            covered_slots: vec!["S0".into()],
            weight: 1.0,
        };
        assert!(matches!(
            ScheduleDecoder::new(&catalog, &model).encode(&[bogus]),
            Err(DecodeError::UnknownAssignment { .. })
        ));
    }
}
