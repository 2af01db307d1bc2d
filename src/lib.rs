// Domain layer: solver-facing models, the solver contract, sessions and interrupts
pub mod domain;

// Entity catalog: validated KDVs, slots, resources and preferences
pub mod catalog;

// Model builder: catalog → binary MIP
pub mod model;

// Schedule decoder: solver values → assignments
pub mod schedule;

// Solver adapters: Concrete implementations of SolverService
pub mod solver;

// Application layer: the scheduling use case
pub mod application;

// Infrastructure layer: External concerns (config file, input, output)
pub mod infrastructure;

// Re-export commonly used types
pub use domain::{
    Interrupt, OptimizationProblem, SessionLimiter, Solution, SolutionStatus, SolverBackend,
    SolverConfig, SolverError, SolverService,
};

pub use catalog::{CatalogData, CatalogError, EntityCatalog, Kdv, Preference, Resource, Slot};

pub use model::{AssignmentPolicy, BuildError, BuiltModel, InfeasibilityPolicy, ModelBuilder, ModelConfig};

pub use schedule::{Assignment, DecodeError, Schedule, ScheduleDecoder, ScheduleOutcome};

pub use application::{PipelineError, SchedulingService};

pub use solver::SolverFactory;

#[cfg(feature = "cbc")]
pub use solver::CoinCbcSolver;

#[cfg(feature = "highs")]
pub use solver::HighsSolver;
