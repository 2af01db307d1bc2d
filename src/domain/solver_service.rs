// Domain service interface for solving optimization problems
// Defines the contract that any solver implementation must follow, so the
// model builder and the decoder never depend on a concrete engine.

use super::interrupt::Interrupt;
use super::models::{OptimizationProblem, Solution};

/// Error types for the solver service.
///
/// An infeasible or unbounded model is not an error: it comes back as a
/// `Solution` with the matching status.
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    #[error("Solver not available: {0}")]
    SolverNotAvailable(String),

    #[error("Solver session unavailable: {0}")]
    SessionUnavailable(String),

    #[error("Solver execution failed: {0}")]
    ExecutionFailed(String),
}

pub type Result<T> = std::result::Result<T, SolverError>;

/// Domain service interface for optimization solvers
///
/// This trait defines the contract that all solver implementations must follow.
/// Backends can be swapped without touching model building or decoding.
pub trait SolverService: Send + Sync {
    /// Solve an optimization problem.
    ///
    /// Implementations hold a session for the duration of the call only and
    /// check `interrupt` at least before submitting the model.
    fn solve(&self, problem: &OptimizationProblem, interrupt: &Interrupt) -> Result<Solution>;

    /// Validate a problem without solving it
    fn validate(&self, problem: &OptimizationProblem) -> Result<()> {
        let mut errors = Vec::new();

        // Check objective has coefficients
        if problem.objective.coefficients.is_empty() {
            errors.push("Objective must have at least one coefficient".to_string());
        }

        let num_vars = problem.num_variables();

        // Check variables match objective
        if problem.objective.num_variables() != num_vars {
            errors.push(format!(
                "Number of variables ({}) doesn't match objective coefficients ({})",
                num_vars,
                problem.objective.num_variables()
            ));
        }

        if let Some(i) = problem
            .objective
            .coefficients
            .iter()
            .position(|c| !c.is_finite())
        {
            errors.push(format!("Objective coefficient {} is not finite", i));
        }

        // Check constraints
        for (i, constraint) in problem.constraints.iter().enumerate() {
            if let Some(&(index, _)) = constraint.terms.iter().find(|(idx, _)| *idx >= num_vars) {
                errors.push(format!(
                    "Constraint {} '{}' references variable {} but problem has {} variables",
                    i, constraint.name, index, num_vars
                ));
            }
            if !constraint.bound.is_finite()
                || constraint.terms.iter().any(|(_, coeff)| !coeff.is_finite())
            {
                errors.push(format!(
                    "Constraint {} '{}' has a non-finite coefficient or bound",
                    i, constraint.name
                ));
            }
        }

        // Check variable bounds
        for (i, var) in problem.variables.iter().enumerate() {
            if let Some(upper) = var.upper_bound {
                if var.lower_bound > upper {
                    errors.push(format!(
                        "Variable {} '{}' has lower bound ({}) > upper bound ({})",
                        i, var.name, var.lower_bound, upper
                    ));
                }
            }
        }

        // Check solve parameters
        let config = &problem.solver_config;
        if config.time_limit.is_zero() {
            errors.push("Time limit must be positive".to_string());
        }
        for (label, gap) in [
            ("Relative gap", config.relative_gap),
            ("Absolute gap", config.absolute_gap),
        ] {
            if let Some(gap) = gap {
                if !gap.is_finite() || gap < 0.0 {
                    errors.push(format!("{} must be a non-negative number, got {}", label, gap));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SolverError::InvalidProblem(errors.join("; ")))
        }
    }

    /// Get the name of this solver backend
    fn name(&self) -> &str;

    /// Check if this solver supports mixed-integer programming
    fn supports_mip(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Constraint, ObjectiveFunction, Variable};
    use crate::domain::value_objects::VariableType;
    use std::time::Duration;

    struct NullSolver;

    impl SolverService for NullSolver {
        fn solve(&self, _: &OptimizationProblem, _: &Interrupt) -> Result<Solution> {
            unreachable!("validation tests never solve")
        }

        fn name(&self) -> &str {
            "null"
        }

        fn supports_mip(&self) -> bool {
            true
        }
    }

    fn problem() -> OptimizationProblem {
        OptimizationProblem::new(ObjectiveFunction::maximize(vec![1.0, 1.0]))
            .with_variables(vec![Variable::binary("x0"), Variable::binary("x1")])
            .add_constraint(Constraint::at_most(vec![(0, 1.0), (1, 1.0)], 1.0))
    }

    #[test]
    fn test_valid_problem() {
        assert!(NullSolver.validate(&problem()).is_ok());
    }

    #[test]
    fn test_term_out_of_range() {
        let problem = problem().add_constraint(Constraint::at_most(vec![(2, 1.0)], 1.0));
        let err = NullSolver.validate(&problem).unwrap_err();
        assert!(matches!(err, SolverError::InvalidProblem(msg) if msg.contains("variable 2")));
    }

    #[test]
    fn test_objective_length_mismatch() {
        let problem = problem().with_variables(vec![Variable::binary("x0")]);
        assert!(NullSolver.validate(&problem).is_err());
    }

    #[test]
    fn test_non_finite_coefficient() {
        let problem = problem().add_constraint(Constraint::at_most(vec![(0, f64::NAN)], 1.0));
        assert!(NullSolver.validate(&problem).is_err());
    }

    #[test]
    fn test_inverted_bounds() {
        let problem = problem().with_variables(vec![
            Variable::binary("x0"),
            Variable {
                variable_type: VariableType::Integer,
                lower_bound: 3.0,
                upper_bound: Some(1.0),
                name: "x1".into(),
            },
        ]);
        assert!(NullSolver.validate(&problem).is_err());
    }

    #[test]
    fn test_bad_solve_parameters() {
        let mut no_time = problem();
        no_time.solver_config.time_limit = Duration::ZERO;
        assert!(NullSolver.validate(&no_time).is_err());

        let mut negative_gap = problem();
        negative_gap.solver_config.relative_gap = Some(-0.1);
        assert!(NullSolver.validate(&negative_gap).is_err());
    }
}
