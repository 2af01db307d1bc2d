// Domain value objects shared by the model builder, the solver adapters and the decoder

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of decision variable in the optimization problem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableType {
    /// Continuous real number (x ∈ ℝ)
    Continuous,
    /// Integer number (x ∈ ℤ)
    Integer,
    /// Binary variable (x ∈ {0, 1})
    Binary,
}

/// Type of constraint comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintType {
    /// Less than or equal (≤)
    LessThanOrEqual,
    /// Equal (=)
    Equal,
    /// Greater than or equal (≥)
    GreaterThanOrEqual,
}

/// Direction of optimization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationType {
    /// Minimize the objective function
    Minimize,
    /// Maximize the objective function
    Maximize,
}

/// Status of a solve as reported by a solver adapter.
///
/// Time-limited and interrupted solves are folded into `Feasible` (an
/// incumbent was found) or `Infeasible` (none was found); the solution's
/// `interrupted` flag tells the two causes apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolutionStatus {
    /// Found optimal solution (within the configured gap)
    Optimal,
    /// Found feasible solution (may not be optimal)
    Feasible,
    /// Problem has no feasible solution, or none was found before the limit
    Infeasible,
    /// Objective can be improved infinitely
    Unbounded,
    /// Solver engine reported an internal failure
    Error,
}

impl SolutionStatus {
    /// Whether the status carries variable values worth decoding.
    pub fn has_solution(self) -> bool {
        matches!(self, SolutionStatus::Optimal | SolutionStatus::Feasible)
    }
}

impl fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolutionStatus::Optimal => write!(f, "OPTIMAL"),
            SolutionStatus::Feasible => write!(f, "FEASIBLE"),
            SolutionStatus::Infeasible => write!(f, "INFEASIBLE"),
            SolutionStatus::Unbounded => write!(f, "UNBOUNDED"),
            SolutionStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Solver backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverBackend {
    /// Automatically select best compiled-in solver
    #[default]
    Auto,
    /// HiGHS solver
    Highs,
    /// COIN-OR CBC solver
    #[serde(alias = "coin_cbc")]
    Cbc,
}

impl fmt::Display for SolverBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverBackend::Auto => write!(f, "Auto"),
            SolverBackend::Highs => write!(f, "HiGHS"),
            SolverBackend::Cbc => write!(f, "COIN-OR CBC"),
        }
    }
}

impl std::str::FromStr for SolverBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(SolverBackend::Auto),
            "highs" => Ok(SolverBackend::Highs),
            "cbc" | "coin_cbc" | "coin-cbc" => Ok(SolverBackend::Cbc),
            other => Err(format!("unknown solver backend '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_has_solution() {
        assert!(SolutionStatus::Optimal.has_solution());
        assert!(SolutionStatus::Feasible.has_solution());
        assert!(!SolutionStatus::Infeasible.has_solution());
        assert!(!SolutionStatus::Unbounded.has_solution());
        assert!(!SolutionStatus::Error.has_solution());
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("HiGHS".parse::<SolverBackend>(), Ok(SolverBackend::Highs));
        assert_eq!("coin-cbc".parse::<SolverBackend>(), Ok(SolverBackend::Cbc));
        assert_eq!("auto".parse::<SolverBackend>(), Ok(SolverBackend::Auto));
        assert!("gurobi".parse::<SolverBackend>().is_err());
    }
}
