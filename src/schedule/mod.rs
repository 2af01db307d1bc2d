//! Schedule decoding: solver values → assignments.
//!
//! Assignments only ever come out of [`ScheduleDecoder`], after a solve that
//! produced values, and are never modified afterwards. A new solve yields a new
//! [`Schedule`].

pub mod decoder;
pub mod diagnostics;

pub use decoder::{DecodeError, ScheduleDecoder, Violation, BINARY_THRESHOLD};
pub use diagnostics::{Diagnostics, KdvFlexibility, ResourceLoad, SlotUsage};

use serde::Serialize;

use crate::domain::{SolutionQuality, SolutionStatus, SolverStatistics};

/// A KDV placed on a start slot and a resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub kdv: String,
    /// Start slot.
    pub slot: String,
    pub resource: String,
    /// Every slot the KDV occupies, starting with `slot`.
    pub covered_slots: Vec<String>,
    /// Objective weight earned by this assignment.
    pub weight: f64,
}

/// Why a KDV ended up without an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnscheduledReason {
    /// No feasible (slot, resource) pair existed; the KDV never reached the solver.
    StructurallyInfeasible,
    /// The KDV was modelled but the solver left it out.
    NotSelected,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnscheduledKdv {
    pub kdv: String,
    pub reason: UnscheduledReason,
}

/// Decoded result of a solve that produced values.
#[derive(Debug, Clone, Serialize)]
pub struct Schedule {
    pub status: SolutionStatus,
    /// Sorted by start slot, then KDV ID.
    pub assignments: Vec<Assignment>,
    /// Sorted by KDV ID.
    pub unscheduled: Vec<UnscheduledKdv>,
    /// Sum of the preference weights of all assignments.
    pub objective_value: f64,
    /// Objective value as reported by the solver.
    pub solver_objective: Option<f64>,
    pub gap: Option<f64>,
    pub interrupted: bool,
    pub message: String,
    pub statistics: SolverStatistics,
    pub quality: SolutionQuality,
    pub diagnostics: Diagnostics,
}

impl Schedule {
    pub fn assignment_for(&self, kdv: &str) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.kdv == kdv)
    }

    pub fn scheduled_count(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_complete(&self) -> bool {
        self.unscheduled.is_empty()
    }
}

/// A solve that ended without values: infeasible, unbounded, or interrupted
/// before an incumbent was found.
#[derive(Debug, Clone, Serialize)]
pub struct NoSchedule {
    pub status: SolutionStatus,
    pub message: String,
    pub interrupted: bool,
    pub structurally_infeasible: Vec<String>,
}

/// Outcome of one scheduling run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScheduleOutcome {
    Scheduled(Schedule),
    NoSchedule(NoSchedule),
}

impl ScheduleOutcome {
    pub fn status(&self) -> SolutionStatus {
        match self {
            ScheduleOutcome::Scheduled(schedule) => schedule.status,
            ScheduleOutcome::NoSchedule(none) => none.status,
        }
    }

    pub fn schedule(&self) -> Option<&Schedule> {
        match self {
            ScheduleOutcome::Scheduled(schedule) => Some(schedule),
            ScheduleOutcome::NoSchedule(_) => None,
        }
    }

    pub fn into_schedule(self) -> Option<Schedule> {
        match self {
            ScheduleOutcome::Scheduled(schedule) => Some(schedule),
            ScheduleOutcome::NoSchedule(_) => None,
        }
    }
}
