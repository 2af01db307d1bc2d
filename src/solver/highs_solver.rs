// HiGHS Solver Adapter
// Implements the SolverService interface for HiGHS
// Translates the domain problem into a HiGHS RowProblem, applies the run
// limits, and folds HiGHS model statuses into domain statuses.

use crate::domain::{
    models::{OptimizationProblem, Solution as DomainSolution, SolverConfig, SolverStatistics},
    session::SessionLimiter,
    solver_service::{Result, SolverError, SolverService},
    value_objects::{
        ConstraintType, OptimizationType, SolutionStatus as DomainSolutionStatus, VariableType,
    },
    Interrupt,
};
use crate::solver::{empty_row_conflict, incumbent_solution, interrupted_before_submission};
use highs::{HighsModelStatus, Model, RowProblem, Sense};
use log::{debug, info, warn};
use std::time::Instant;

pub struct HighsSolver {
    sessions: SessionLimiter,
}

impl HighsSolver {
    pub fn new() -> Self {
        Self {
            sessions: SessionLimiter::unlimited(),
        }
    }

    pub fn with_sessions(sessions: SessionLimiter) -> Self {
        Self { sessions }
    }
}

impl Default for HighsSolver {
    fn default() -> Self {
        Self::new()
    }
}

fn configure(model: &mut Model, config: &SolverConfig) {
    model.set_option("output_flag", config.verbose);
    model.set_option("time_limit", config.time_limit.as_secs_f64());
    if let Some(gap) = config.relative_gap {
        model.set_option("mip_rel_gap", gap);
    }
    if let Some(gap) = config.absolute_gap {
        model.set_option("mip_abs_gap", gap);
    }
    if let Some(threads) = config.threads {
        model.set_option("threads", threads.min(i32::MAX as u32) as i32);
    }
    if let Some(seed) = config.random_seed {
        model.set_option("random_seed", seed.min(i32::MAX as u32) as i32);
    }
}

impl SolverService for HighsSolver {
    fn solve(&self, problem: &OptimizationProblem, interrupt: &Interrupt) -> Result<DomainSolution> {
        self.validate(problem)?;
        let _session = self.sessions.try_acquire()?;

        if interrupt.is_triggered() {
            info!("HiGHS: interrupt requested before submitting '{}'", problem.name);
            return Ok(interrupted_before_submission(problem));
        }
        if let Some(reason) = empty_row_conflict(problem) {
            warn!("HiGHS: {reason}");
            return Ok(DomainSolution::new(DomainSolutionStatus::Infeasible, reason)
                .with_statistics(SolverStatistics::for_problem(problem, 0.0)));
        }

        let start_time = Instant::now();

        // Use HiGHS RowProblem (add variables first, then constraints)
        let mut pb = RowProblem::default();
        let mut columns = Vec::with_capacity(problem.num_variables());
        for (var_def, &obj_coeff) in problem
            .variables
            .iter()
            .zip(&problem.objective.coefficients)
        {
            let lower = var_def.lower_bound;
            let upper = var_def.upper_bound.unwrap_or(f64::INFINITY);
            let col = match var_def.variable_type {
                VariableType::Integer | VariableType::Binary => {
                    pb.add_integer_column(obj_coeff, lower..=upper)
                }
                VariableType::Continuous => pb.add_column(obj_coeff, lower..=upper),
            };
            columns.push(col);
        }

        for constraint in &problem.constraints {
            if constraint.terms.is_empty() {
                continue;
            }
            let terms: Vec<_> = constraint
                .terms
                .iter()
                .filter(|(_, coeff)| *coeff != 0.0)
                .map(|&(i, coeff)| (columns[i], coeff))
                .collect();

            match constraint.constraint_type {
                ConstraintType::LessThanOrEqual => {
                    pb.add_row(..=constraint.bound, &terms);
                }
                ConstraintType::Equal => {
                    pb.add_row(constraint.bound..=constraint.bound, &terms);
                }
                ConstraintType::GreaterThanOrEqual => {
                    pb.add_row(constraint.bound.., &terms);
                }
            }
        }

        let sense = if problem.objective.optimization_type == OptimizationType::Maximize {
            Sense::Maximise
        } else {
            Sense::Minimise
        };

        let mut model = pb.optimise(sense);
        configure(&mut model, &problem.solver_config);
        debug!(
            "HiGHS: solving '{}' ({} columns, {} rows, limit {:?})",
            problem.name,
            problem.num_variables(),
            problem.constraints.len(),
            problem.solver_config.time_limit
        );

        let solved = model.try_solve().map_err(|status| {
            SolverError::ExecutionFailed(format!("HiGHS could not run: {status:?}"))
        })?;
        let solve_time = start_time.elapsed().as_secs_f64() * 1000.0;
        let statistics = SolverStatistics::for_problem(problem, solve_time);
        let interrupted = interrupt.is_triggered();
        let status = solved.status();
        info!("HiGHS: '{}' finished with {status:?} in {solve_time:.1} ms", problem.name);

        match status {
            HighsModelStatus::Optimal => {
                let values = solved.get_solution().columns().to_vec();
                incumbent_solution(problem, values, true, statistics, interrupted)
            }
            HighsModelStatus::ReachedTimeLimit | HighsModelStatus::ReachedIterationLimit => {
                let values = solved.get_solution().columns().to_vec();
                incumbent_solution(problem, values, false, statistics, interrupted)
            }
            HighsModelStatus::ModelEmpty => {
                let values = vec![0.0; problem.num_variables()];
                incumbent_solution(problem, values, true, statistics, interrupted)
            }
            HighsModelStatus::Infeasible => {
                let mut solution = DomainSolution::new(
                    DomainSolutionStatus::Infeasible,
                    "Problem is infeasible: no solution satisfies all constraints",
                )
                .with_statistics(statistics);
                solution.interrupted = interrupted;
                Ok(solution)
            }
            HighsModelStatus::UnboundedOrInfeasible
                if problem.variables.iter().all(|v| v.upper_bound.is_some()) =>
            {
                // Every column is boxed, so the objective cannot run off.
                let mut solution = DomainSolution::new(
                    DomainSolutionStatus::Infeasible,
                    "Problem is infeasible: no solution satisfies all constraints",
                )
                .with_statistics(statistics);
                solution.interrupted = interrupted;
                Ok(solution)
            }
            HighsModelStatus::Unbounded | HighsModelStatus::UnboundedOrInfeasible => {
                let mut solution = DomainSolution::new(
                    DomainSolutionStatus::Unbounded,
                    "Problem is unbounded: objective can be improved infinitely",
                )
                .with_statistics(statistics);
                solution.interrupted = interrupted;
                Ok(solution)
            }
            status => Ok(DomainSolution::new(
                DomainSolutionStatus::Error,
                format!("HiGHS solver returned status: {status:?}"),
            )
            .with_statistics(statistics)),
        }
    }

    fn name(&self) -> &str {
        "HiGHS"
    }

    fn supports_mip(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Constraint, ObjectiveFunction, Variable};
    use std::time::Duration;

    fn knapsack() -> OptimizationProblem {
        // max 5a + 4b + 3c  s.t.  2a + 3b + c <= 5,  a + b + c <= 2
        OptimizationProblem::new(ObjectiveFunction::maximize(vec![5.0, 4.0, 3.0]))
            .with_name("knapsack")
            .with_variables(vec![
                Variable::binary("a"),
                Variable::binary("b"),
                Variable::binary("c"),
            ])
            .add_constraint(Constraint::at_most(vec![(0, 2.0), (1, 3.0), (2, 1.0)], 5.0))
            .add_constraint(Constraint::at_most(vec![(0, 1.0), (1, 1.0), (2, 1.0)], 2.0))
    }

    #[test]
    fn test_solves_small_binary_problem() {
        let solution = HighsSolver::new()
            .solve(&knapsack(), &Interrupt::new())
            .unwrap();
        assert_eq!(solution.status, DomainSolutionStatus::Optimal);
        assert!((solution.objective_value.unwrap() - 9.0).abs() < 1e-6);
        assert!(knapsack().is_satisfied_by(&solution.variable_values));
        assert!(!solution.interrupted);
    }

    #[test]
    fn test_infeasible_problem() {
        let problem = knapsack().add_constraint(Constraint::at_least(
            vec![(0, 1.0), (1, 1.0), (2, 1.0)],
            3.0,
        ));
        let solution = HighsSolver::new().solve(&problem, &Interrupt::new()).unwrap();
        assert_eq!(solution.status, DomainSolutionStatus::Infeasible);
        assert!(solution.variable_values.is_empty());
    }

    #[test]
    fn test_empty_row_conflict_skips_engine() {
        let problem = knapsack().add_constraint(Constraint::at_least(vec![], 1.0).with_name("minocc_S9"));
        let solution = HighsSolver::new().solve(&problem, &Interrupt::new()).unwrap();
        assert_eq!(solution.status, DomainSolutionStatus::Infeasible);
        assert!(solution.message.contains("minocc_S9"));
    }

    #[test]
    fn test_interrupt_before_submission() {
        let interrupt = Interrupt::new();
        interrupt.trigger();
        let solution = HighsSolver::new().solve(&knapsack(), &interrupt).unwrap();
        assert_eq!(solution.status, DomainSolutionStatus::Infeasible);
        assert!(solution.interrupted);
    }

    #[test]
    fn test_session_released_after_solve() {
        let sessions = SessionLimiter::with_max_sessions(1);
        let solver = HighsSolver::with_sessions(sessions.clone());
        solver.solve(&knapsack(), &Interrupt::new()).unwrap();
        assert_eq!(sessions.in_use(), 0);
        // and on the validation error path as well
        let broken = knapsack().with_config(SolverConfig {
            time_limit: Duration::ZERO,
            ..SolverConfig::default()
        });
        assert!(solver.solve(&broken, &Interrupt::new()).is_err());
        assert_eq!(sessions.in_use(), 0);
    }

    #[test]
    fn test_busy_sessions_are_refused() {
        let sessions = SessionLimiter::with_max_sessions(1);
        let _held = sessions.try_acquire().unwrap();
        let err = HighsSolver::with_sessions(sessions.clone())
            .solve(&knapsack(), &Interrupt::new())
            .unwrap_err();
        assert!(matches!(err, SolverError::SessionUnavailable(_)));
    }
}
