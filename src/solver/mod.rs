// Solver adapters module
// Concrete SolverService implementations plus the result handling they share.

#[cfg(feature = "cbc")]
pub mod coin_cbc_solver;
pub mod factory;
#[cfg(feature = "highs")]
pub mod highs_solver;

#[cfg(feature = "cbc")]
pub use coin_cbc_solver::CoinCbcSolver;
pub use factory::SolverFactory;
#[cfg(feature = "highs")]
pub use highs_solver::HighsSolver;

use crate::domain::{
    OptimizationProblem, Result, Solution, SolutionStatus, SolverError, SolverStatistics,
    FEASIBILITY_TOLERANCE,
};

/// Reason a row without variables can never hold, if any such row exists.
///
/// Engines differ in how they treat empty rows, so adapters drop them and
/// decide infeasibility here instead.
#[allow(dead_code)]
pub(crate) fn empty_row_conflict(problem: &OptimizationProblem) -> Option<String> {
    problem
        .constraints
        .iter()
        .find(|c| c.terms.is_empty() && c.violation(&[]) > FEASIBILITY_TOLERANCE)
        .map(|c| {
            format!(
                "Problem is infeasible: constraint '{}' has no variables and requires {}",
                c.name, c.bound
            )
        })
}

/// Result for a solve that was cancelled before the model reached the engine.
#[allow(dead_code)]
pub(crate) fn interrupted_before_submission(problem: &OptimizationProblem) -> Solution {
    let mut solution = Solution::new(
        SolutionStatus::Infeasible,
        "Solve interrupted before the model was submitted",
    )
    .with_statistics(SolverStatistics::for_problem(problem, 0.0));
    solution.interrupted = true;
    solution
}

/// Builds the domain solution from engine values.
///
/// `proven_optimal` values are trusted and only measured. Values from a solve
/// that stopped early are kept only if they satisfy every row and bound;
/// otherwise no incumbent was found and the result is `Infeasible`.
#[allow(dead_code)]
pub(crate) fn incumbent_solution(
    problem: &OptimizationProblem,
    values: Vec<f64>,
    proven_optimal: bool,
    statistics: SolverStatistics,
    interrupted: bool,
) -> Result<Solution> {
    if values.len() != problem.num_variables() {
        if proven_optimal {
            return Err(SolverError::ExecutionFailed(format!(
                "engine returned {} values for {} variables",
                values.len(),
                problem.num_variables()
            )));
        }
        let mut solution = Solution::new(
            SolutionStatus::Infeasible,
            "No feasible solution found before the solve stopped",
        )
        .with_statistics(statistics);
        solution.interrupted = interrupted;
        return Ok(solution);
    }

    let quality = problem.evaluate(&values);
    let verified = quality.max_constraint_violation <= FEASIBILITY_TOLERANCE
        && quality.max_integrality_violation <= FEASIBILITY_TOLERANCE;

    let mut solution = if proven_optimal {
        let objective = problem.objective.evaluate(&values);
        Solution::optimal(objective, values)
            .with_message(format!("Optimal solution found for '{}'", problem.name))
    } else if verified {
        let objective = problem.objective.evaluate(&values);
        Solution::feasible(objective, values).with_message(format!(
            "Feasible solution found for '{}' before the solve stopped",
            problem.name
        ))
    } else {
        Solution::new(
            SolutionStatus::Infeasible,
            "No feasible solution found before the solve stopped",
        )
    };

    solution.interrupted = interrupted;
    Ok(solution.with_statistics(statistics).with_quality(quality))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Constraint, ObjectiveFunction, Variable};

    fn problem() -> OptimizationProblem {
        OptimizationProblem::new(ObjectiveFunction::maximize(vec![1.0, 2.0]))
            .with_name("pair")
            .with_variables(vec![Variable::binary("a"), Variable::binary("b")])
            .add_constraint(Constraint::at_most(vec![(0, 1.0), (1, 1.0)], 1.0))
    }

    #[test]
    fn test_proven_optimal_is_trusted() {
        let solution =
            incumbent_solution(&problem(), vec![0.0, 1.0], true, Default::default(), false)
                .unwrap();
        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_eq!(solution.objective_value, Some(2.0));
    }

    #[test]
    fn test_early_stop_with_valid_incumbent_is_feasible() {
        let solution =
            incumbent_solution(&problem(), vec![1.0, 0.0], false, Default::default(), true)
                .unwrap();
        assert_eq!(solution.status, SolutionStatus::Feasible);
        assert_eq!(solution.objective_value, Some(1.0));
        assert!(solution.interrupted);
    }

    #[test]
    fn test_early_stop_without_incumbent_is_infeasible() {
        let solution =
            incumbent_solution(&problem(), vec![1.0, 1.0], false, Default::default(), false)
                .unwrap();
        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert!(solution.variable_values.is_empty());

        let solution =
            incumbent_solution(&problem(), vec![], false, Default::default(), false).unwrap();
        assert_eq!(solution.status, SolutionStatus::Infeasible);
    }

    #[test]
    fn test_optimal_with_wrong_value_count_is_error() {
        assert!(incumbent_solution(&problem(), vec![1.0], true, Default::default(), false).is_err());
    }

    #[test]
    fn test_empty_row_conflict() {
        assert!(empty_row_conflict(&problem()).is_none());
        let blocked = problem().add_constraint(Constraint::at_least(vec![], 2.0).with_name("minocc_S0"));
        let reason = empty_row_conflict(&blocked).unwrap();
        assert!(reason.contains("minocc_S0"));
        // An empty row that holds trivially is fine
        let harmless = problem().add_constraint(Constraint::at_most(vec![], 1.0));
        assert!(empty_row_conflict(&harmless).is_none());
    }
}
