// Model builder: entity catalog → MIP

pub mod builder;
pub mod config;

pub use builder::{BuildError, BuiltModel, Candidate, ModelBuilder};
pub use config::{AssignmentPolicy, InfeasibilityPolicy, ModelConfig};
