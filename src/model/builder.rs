//! Translation of an entity catalog into a binary MIP.
//!
//! # Formulation
//! One binary `x[k,s,r]` per feasible triple: slot `s` is an eligible start
//! for KDV `k`, resource `r` is eligible for `k`, `r` is available with
//! non-zero capacity in every slot the KDV covers from `s`, and no zero-weight
//! preference forbids the pairing.
//!
//! - assignment: `Σ_{s,r} x[k,s,r] ≤ 1` (or `= 1`) for each modelled KDV
//! - occupancy:  `Σ x[k,s',r] ≤ cap(s,r)` over triples whose coverage contains `s`
//! - slot capacity: `Σ x[k,s',r] ≤ cap(s)` over all triples covering `s`
//! - resource load: `Σ x[k,s,r] ≤ max(r)`
//! - minimum occupancy / experience: `Σ x ≥ min(s)` over covering triples
//! - objective: maximise `Σ w[k,s,r]·x[k,s,r]`
//!
//! Ties between optimal selections are broken by a second model
//! ([`BuiltModel::tie_break_problem`]) that holds the preference value at its
//! optimum and maximises a rank decreasing along the canonical variable order.
//!
//! Occupancy rows with a single-slot KDV reduce to the plain capacity
//! constraint; with longer KDVs they are the conflict constraint.

use std::collections::BTreeMap;
use std::ops::Range;

use log::{debug, info, warn};

use super::config::{AssignmentPolicy, InfeasibilityPolicy, ModelConfig};
use crate::catalog::EntityCatalog;
use crate::domain::{Constraint, ObjectiveFunction, OptimizationProblem, Variable};

/// Relative slack on the preference value when the tie-break model holds it fixed.
pub const PRIMARY_VALUE_SLACK: f64 = 1e-6;

/// Errors raised while building a model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    #[error("KDV(s) without any feasible slot/resource pair: {}", .0.join(", "))]
    StructurallyInfeasible(Vec<String>),

    #[error("Invalid model configuration: {0}")]
    InvalidConfig(String),
}

/// One feasible `(kdv, slot, resource)` triple, i.e. one decision variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Catalog index of the KDV.
    pub kdv: usize,
    /// Catalog index of the start slot.
    pub slot: usize,
    /// Catalog index of the resource.
    pub resource: usize,
    /// Slot indices occupied when this triple is chosen.
    pub covers: Range<usize>,
    /// Preference weight after normalisation, before the KDV priority.
    pub preference: f64,
    /// Objective weight: `priority × preference`.
    pub weight: f64,
}

/// A model ready to be handed to a solver, with the bookkeeping the decoder needs.
#[derive(Debug, Clone)]
pub struct BuiltModel {
    pub problem: OptimizationProblem,
    /// `candidates[i]` describes variable `i` of `problem`.
    pub candidates: Vec<Candidate>,
    /// Catalog indices of KDVs that have at least one candidate.
    pub modelled_kdvs: Vec<usize>,
    /// IDs of KDVs left out because they have no candidate.
    pub structurally_infeasible: Vec<String>,
    pub config: ModelConfig,
}

impl BuiltModel {
    pub fn num_variables(&self) -> usize {
        self.candidates.len()
    }

    /// Primary objective value (preference weight only) of a 0/1 selection.
    pub fn preference_value(&self, selected: &[usize]) -> f64 {
        selected.iter().map(|&j| self.candidates[j].weight).sum()
    }

    /// Second-stage model: the rows of `problem` plus
    /// `Σ w·x ≥ primary_value - slack`, maximising `(n - j) / n` over the
    /// canonical variable order. `None` when tie-breaking is off or there is
    /// nothing to choose from.
    pub fn tie_break_problem(&self, primary_value: f64) -> Option<OptimizationProblem> {
        if !self.config.tie_break || self.candidates.is_empty() {
            return None;
        }
        let n = self.candidates.len();
        let ranks = (0..n).map(|j| (n - j) as f64 / n as f64).collect();
        let primary_terms = self
            .candidates
            .iter()
            .enumerate()
            .map(|(j, c)| (j, c.weight))
            .collect();
        let slack = PRIMARY_VALUE_SLACK * primary_value.abs().max(1.0);

        let mut problem = self.problem.clone();
        problem.name = format!("{}_tie_break", self.problem.name);
        problem.objective = ObjectiveFunction::maximize(ranks);
        problem.constraints.push(
            Constraint::at_least(primary_terms, primary_value - slack)
                .with_name("primary_objective"),
        );
        Some(problem)
    }
}

/// Builds the MIP for a catalog. Side-effect free and deterministic: the same
/// catalog and configuration always produce the same variables and rows in
/// the same order.
pub struct ModelBuilder<'a> {
    catalog: &'a EntityCatalog,
    config: ModelConfig,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(catalog: &'a EntityCatalog, config: ModelConfig) -> Self {
        Self { catalog, config }
    }

    pub fn build(&self) -> Result<BuiltModel, BuildError> {
        self.check_config()?;

        let catalog = self.catalog;
        let kdv_order = sorted_indices(catalog.kdvs().iter().map(|k| k.id.as_str()));

        let mut candidates = Vec::new();
        let mut modelled_kdvs = Vec::new();
        let mut structurally_infeasible = Vec::new();

        for &k in &kdv_order {
            let kdv_candidates = self.candidates_for(k);
            if kdv_candidates.is_empty() {
                structurally_infeasible.push(catalog.kdvs()[k].id.clone());
            } else {
                modelled_kdvs.push(k);
                candidates.extend(kdv_candidates);
            }
        }

        if !structurally_infeasible.is_empty() {
            match self.config.infeasibility_policy {
                InfeasibilityPolicy::Abort => {
                    return Err(BuildError::StructurallyInfeasible(structurally_infeasible))
                }
                InfeasibilityPolicy::Exclude => warn!(
                    "Excluding {} structurally infeasible KDV(s): {}",
                    structurally_infeasible.len(),
                    structurally_infeasible.join(", ")
                ),
            }
        }

        let variables = candidates
            .iter()
            .map(|c| {
                Variable::binary(format!(
                    "x[{}|{}|{}]",
                    catalog.kdvs()[c.kdv].id,
                    catalog.slots()[c.slot].id,
                    catalog.resources()[c.resource].id
                ))
            })
            .collect();

        let objective = ObjectiveFunction::maximize(candidates.iter().map(|c| c.weight).collect());

        let mut problem = OptimizationProblem::new(objective)
            .with_name("kdv_schedule")
            .with_variables(variables);
        problem.constraints = self.constraints(&candidates, &modelled_kdvs);

        info!(
            "Built model with {} variables and {} constraints for {} of {} KDV(s)",
            problem.num_variables(),
            problem.constraints.len(),
            modelled_kdvs.len(),
            catalog.kdvs().len()
        );
        debug!(
            "Pruned variable set: {} of {} possible triples",
            candidates.len(),
            catalog.kdvs().len() * catalog.slots().len() * catalog.resources().len()
        );

        Ok(BuiltModel {
            problem,
            candidates,
            modelled_kdvs,
            structurally_infeasible,
            config: self.config.clone(),
        })
    }

    fn check_config(&self) -> Result<(), BuildError> {
        let config = &self.config;
        if !config.default_preference.is_finite() || config.default_preference < 0.0 {
            return Err(BuildError::InvalidConfig(format!(
                "default_preference must be a non-negative number, got {}",
                config.default_preference
            )));
        }
        Ok(())
    }

    /// Feasible triples of KDV `k` in canonical order (slot order, then resource ID).
    fn candidates_for(&self, k: usize) -> Vec<Candidate> {
        let catalog = self.catalog;
        let kdv = &catalog.kdvs()[k];

        // BTreeSet iteration yields resource IDs in sorted order
        let resources: Vec<usize> = kdv
            .eligible_resources
            .iter()
            .filter_map(|id| catalog.resource_index(id))
            .collect();

        let mut found = Vec::new();
        for (s, slot) in catalog.slots().iter().enumerate() {
            if !kdv.eligible_slots.contains(&slot.id) {
                continue;
            }
            let Some(covers) = catalog.covered_slots(s, kdv.duration) else {
                continue;
            };

            for &r in &resources {
                let resource = &catalog.resources()[r];
                let usable = covers.clone().all(|c| {
                    resource.available_slots.contains(&catalog.slots()[c].id)
                        && catalog.resource_capacity(r, c) > 0
                });
                if !usable {
                    continue;
                }

                let preference = catalog
                    .preference_weight(k, s, r)
                    .unwrap_or(self.config.default_preference);
                if preference == 0.0 {
                    continue;
                }

                found.push(Candidate {
                    kdv: k,
                    slot: s,
                    resource: r,
                    covers: covers.clone(),
                    preference,
                    weight: 0.0,
                });
            }
        }

        if self.config.normalize_preferences {
            let total: f64 = found.iter().map(|c| c.preference).sum();
            if total > 0.0 {
                let scale = found.len() as f64 / total;
                for candidate in &mut found {
                    candidate.preference *= scale;
                }
            }
        }
        for candidate in &mut found {
            candidate.weight = kdv.priority * candidate.preference;
        }

        found
    }

    fn constraints(&self, candidates: &[Candidate], modelled_kdvs: &[usize]) -> Vec<Constraint> {
        let catalog = self.catalog;
        let slots = catalog.slots();
        let resources = catalog.resources();
        let threshold = self.config.experience_threshold_months;

        let mut by_kdv: BTreeMap<usize, Vec<(usize, f64)>> = BTreeMap::new();
        let mut by_slot_resource: BTreeMap<(usize, usize), Vec<(usize, f64)>> = BTreeMap::new();
        let mut by_slot: Vec<Vec<(usize, f64)>> = vec![Vec::new(); slots.len()];
        let mut experienced_by_slot: Vec<Vec<(usize, f64)>> = vec![Vec::new(); slots.len()];
        let mut by_resource: Vec<Vec<(usize, f64)>> = vec![Vec::new(); resources.len()];

        for (j, c) in candidates.iter().enumerate() {
            by_kdv.entry(c.kdv).or_default().push((j, 1.0));
            by_resource[c.resource].push((j, 1.0));
            let experienced = resources[c.resource].is_experienced(threshold);
            for s in c.covers.clone() {
                by_slot_resource
                    .entry((s, c.resource))
                    .or_default()
                    .push((j, 1.0));
                by_slot[s].push((j, 1.0));
                if experienced {
                    experienced_by_slot[s].push((j, 1.0));
                }
            }
        }

        let mut rows = Vec::new();

        for &k in modelled_kdvs {
            let terms = by_kdv.remove(&k).unwrap_or_default();
            let name = format!("assign_{}", catalog.kdvs()[k].id);
            let row = match self.config.assignment_policy {
                AssignmentPolicy::Exact => Constraint::equal_to(terms, 1.0),
                AssignmentPolicy::AtMostOne => Constraint::at_most(terms, 1.0),
            };
            rows.push(row.with_name(name));
        }

        for ((s, r), terms) in by_slot_resource {
            let capacity = catalog.resource_capacity(r, s);
            if terms.len() > capacity as usize {
                rows.push(
                    Constraint::at_most(terms, f64::from(capacity))
                        .with_name(format!("cap_{}_{}", slots[s].id, resources[r].id)),
                );
            }
        }

        for (s, slot) in slots.iter().enumerate() {
            if by_slot[s].len() > slot.capacity as usize {
                rows.push(
                    Constraint::at_most(by_slot[s].clone(), f64::from(slot.capacity))
                        .with_name(format!("slotcap_{}", slot.id)),
                );
            }
        }

        for (r, resource) in resources.iter().enumerate() {
            if let Some(max) = resource.max_assignments {
                if by_resource[r].len() > max as usize {
                    rows.push(
                        Constraint::at_most(std::mem::take(&mut by_resource[r]), f64::from(max))
                            .with_name(format!("maxload_{}", resource.id)),
                    );
                }
            }
        }

        for (s, slot) in slots.iter().enumerate() {
            if slot.min_occupancy > 0 {
                rows.push(
                    Constraint::at_least(by_slot[s].clone(), f64::from(slot.min_occupancy))
                        .with_name(format!("minocc_{}", slot.id)),
                );
            }
            if slot.min_experienced > 0 {
                rows.push(
                    Constraint::at_least(
                        std::mem::take(&mut experienced_by_slot[s]),
                        f64::from(slot.min_experienced),
                    )
                    .with_name(format!("minexp_{}", slot.id)),
                );
            }
        }

        rows
    }
}

fn sorted_indices<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<usize> {
    let mut indexed: Vec<(usize, &str)> = ids.enumerate().collect();
    indexed.sort_by(|a, b| a.1.cmp(b.1));
    indexed.into_iter().map(|(i, _)| i).collect()
}
