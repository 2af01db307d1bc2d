// COIN-OR CBC Solver Adapter
// Implements the SolverService interface for CBC through good_lp.
// A solve stopped by the time limit is never optimal; its values are verified
// before they count as an incumbent.

use crate::domain::{
    models::{OptimizationProblem, Solution as DomainSolution, SolverConfig, SolverStatistics},
    session::SessionLimiter,
    solver_service::{Result, SolverService},
    value_objects::{
        ConstraintType, OptimizationType, SolutionStatus as DomainSolutionStatus, VariableType,
    },
    Interrupt,
};
use crate::solver::{empty_row_conflict, incumbent_solution, interrupted_before_submission};
use good_lp::{
    solvers::coin_cbc::{self, CoinCbcProblem},
    variable, variables, Expression, ResolutionError, Solution as GoodLpSolutionTrait,
    SolutionStatus as LpStatus, SolverModel, Variable as GoodLpVariable,
};
use log::{debug, info, warn};
use std::time::Instant;

pub struct CoinCbcSolver {
    sessions: SessionLimiter,
}

impl CoinCbcSolver {
    pub fn new() -> Self {
        Self {
            sessions: SessionLimiter::unlimited(),
        }
    }

    pub fn with_sessions(sessions: SessionLimiter) -> Self {
        Self { sessions }
    }
}

impl Default for CoinCbcSolver {
    fn default() -> Self {
        Self::new()
    }
}

fn configure(model: &mut CoinCbcProblem, config: &SolverConfig) {
    if !config.verbose {
        model.set_parameter("log", "0");
    }
    model.set_parameter("sec", &config.time_limit.as_secs_f64().to_string());
    if let Some(gap) = config.relative_gap {
        model.set_parameter("ratioGap", &gap.to_string());
    }
    if let Some(gap) = config.absolute_gap {
        model.set_parameter("allowableGap", &gap.to_string());
    }
    if let Some(threads) = config.threads {
        model.set_parameter("threads", &threads.to_string());
    }
    if let Some(seed) = config.random_seed {
        model.set_parameter("randomCbcSeed", &seed.to_string());
    }
}

impl SolverService for CoinCbcSolver {
    fn solve(&self, problem: &OptimizationProblem, interrupt: &Interrupt) -> Result<DomainSolution> {
        self.validate(problem)?;
        let _session = self.sessions.try_acquire()?;

        if interrupt.is_triggered() {
            info!("CBC: interrupt requested before submitting '{}'", problem.name);
            return Ok(interrupted_before_submission(problem));
        }
        if let Some(reason) = empty_row_conflict(problem) {
            warn!("CBC: {reason}");
            return Ok(DomainSolution::new(DomainSolutionStatus::Infeasible, reason)
                .with_statistics(SolverStatistics::for_problem(problem, 0.0)));
        }

        let start_time = Instant::now();

        let mut vars = variables!();
        let lp_variables: Vec<GoodLpVariable> = problem
            .variables
            .iter()
            .map(|var_def| {
                let lower = var_def.lower_bound;
                let upper = var_def.upper_bound.unwrap_or(f64::INFINITY);
                match var_def.variable_type {
                    VariableType::Binary | VariableType::Integer => {
                        vars.add(variable().integer().min(lower).max(upper))
                    }
                    VariableType::Continuous => vars.add(variable().min(lower).max(upper)),
                }
            })
            .collect();

        let mut obj_expr: Expression = 0.into();
        for (&coeff, &var) in problem.objective.coefficients.iter().zip(&lp_variables) {
            if coeff != 0.0 {
                obj_expr += coeff * var;
            }
        }

        let unsolved = match problem.objective.optimization_type {
            OptimizationType::Maximize => vars.maximise(obj_expr),
            OptimizationType::Minimize => vars.minimise(obj_expr),
        };
        let mut lp_model = unsolved.using(coin_cbc::coin_cbc);
        configure(&mut lp_model, &problem.solver_config);

        for constraint in &problem.constraints {
            if constraint.terms.is_empty() {
                continue;
            }
            let mut lhs: Expression = 0.into();
            for &(i, coeff) in &constraint.terms {
                if coeff != 0.0 {
                    lhs += coeff * lp_variables[i];
                }
            }

            lp_model = match constraint.constraint_type {
                ConstraintType::LessThanOrEqual => lp_model.with(lhs.leq(constraint.bound)),
                ConstraintType::Equal => lp_model.with(lhs.eq(constraint.bound)),
                ConstraintType::GreaterThanOrEqual => lp_model.with(lhs.geq(constraint.bound)),
            };
        }

        debug!(
            "CBC: solving '{}' ({} columns, {} rows, limit {:?})",
            problem.name,
            problem.num_variables(),
            problem.constraints.len(),
            problem.solver_config.time_limit
        );
        let solution_result = lp_model.solve();
        let solve_time = start_time.elapsed().as_secs_f64() * 1000.0;
        let statistics = SolverStatistics::for_problem(problem, solve_time);
        let interrupted = interrupt.is_triggered();

        match solution_result {
            Ok(sol) => {
                let status = sol.status();
                info!(
                    "CBC: '{}' returned values in {solve_time:.1} ms ({status:?})",
                    problem.name
                );
                let values = lp_variables.iter().map(|&var| sol.value(var)).collect();
                incumbent_solution(problem, values, proven_optimal(status), statistics, interrupted)
            }
            Err(ResolutionError::Infeasible) => {
                info!("CBC: '{}' is infeasible", problem.name);
                let mut solution = DomainSolution::new(
                    DomainSolutionStatus::Infeasible,
                    "Problem is infeasible: no solution satisfies all constraints",
                )
                .with_statistics(statistics);
                solution.interrupted = interrupted;
                Ok(solution)
            }
            Err(ResolutionError::Unbounded) => {
                let mut solution = DomainSolution::new(
                    DomainSolutionStatus::Unbounded,
                    "Problem is unbounded: objective can be improved infinitely",
                )
                .with_statistics(statistics);
                solution.interrupted = interrupted;
                Ok(solution)
            }
            Err(e) => {
                warn!("CBC: '{}' failed: {e}", problem.name);
                Ok(DomainSolution::new(
                    DomainSolutionStatus::Error,
                    format!("CBC solver failed: {e}"),
                )
                .with_statistics(statistics))
            }
        }
    }

    fn name(&self) -> &str {
        "COIN-OR CBC"
    }

    fn supports_mip(&self) -> bool {
        true
    }
}

/// CBC reports a gap stop only once the requested gap is proven.
fn proven_optimal(status: LpStatus) -> bool {
    !matches!(status, LpStatus::TimeLimit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Constraint, ObjectiveFunction, Variable};

    fn assignment() -> OptimizationProblem {
        // two tasks, two slots, one task per slot
        OptimizationProblem::new(ObjectiveFunction::maximize(vec![3.0, 1.0, 2.0, 2.0]))
            .with_name("assignment")
            .with_variables((0..4).map(|i| Variable::binary(format!("x{i}"))).collect())
            .add_constraint(Constraint::at_most(vec![(0, 1.0), (1, 1.0)], 1.0))
            .add_constraint(Constraint::at_most(vec![(2, 1.0), (3, 1.0)], 1.0))
            .add_constraint(Constraint::at_most(vec![(0, 1.0), (2, 1.0)], 1.0))
            .add_constraint(Constraint::at_most(vec![(1, 1.0), (3, 1.0)], 1.0))
    }

    #[test]
    fn test_solves_assignment() {
        let solution = CoinCbcSolver::new()
            .solve(&assignment(), &Interrupt::new())
            .unwrap();
        assert_eq!(solution.status, DomainSolutionStatus::Optimal);
        assert!((solution.objective_value.unwrap() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_infeasible() {
        let problem = assignment()
            .add_constraint(Constraint::at_least(vec![(0, 1.0), (1, 1.0), (2, 1.0), (3, 1.0)], 3.0));
        let solution = CoinCbcSolver::new().solve(&problem, &Interrupt::new()).unwrap();
        assert_eq!(solution.status, DomainSolutionStatus::Infeasible);
    }

    #[test]
    fn test_time_limit_stop_is_not_optimal() {
        assert!(!proven_optimal(LpStatus::TimeLimit));
        assert!(proven_optimal(LpStatus::Optimal));
        assert!(proven_optimal(LpStatus::GapLimit));

        // an unverified incumbent from a timed-out run is never labelled optimal
        let problem = assignment();
        let values = vec![1.0, 1.0, 1.0, 1.0];
        let solution = incumbent_solution(
            &problem,
            values,
            proven_optimal(LpStatus::TimeLimit),
            SolverStatistics::default(),
            false,
        )
        .unwrap();
        assert_eq!(solution.status, DomainSolutionStatus::Infeasible);

        let solution = incumbent_solution(
            &problem,
            vec![1.0, 0.0, 0.0, 1.0],
            proven_optimal(LpStatus::TimeLimit),
            SolverStatistics::default(),
            false,
        )
        .unwrap();
        assert_eq!(solution.status, DomainSolutionStatus::Feasible);
    }

    #[test]
    fn test_tiny_time_limit_is_never_optimal_unless_proven() {
        // 12 tasks over 12 slots with scattered weights
        let n = 12;
        let weights = (0..n * n).map(|i| ((i * 37) % 101) as f64 / 10.0).collect();
        let mut problem = OptimizationProblem::new(ObjectiveFunction::maximize(weights))
            .with_name("dense_assignment")
            .with_variables((0..n * n).map(|i| Variable::binary(format!("x{i}"))).collect());
        for t in 0..n {
            problem = problem
                .add_constraint(Constraint::equal_to((0..n).map(|s| (t * n + s, 1.0)).collect(), 1.0))
                .add_constraint(Constraint::equal_to((0..n).map(|k| (k * n + t, 1.0)).collect(), 1.0));
        }
        problem.solver_config.time_limit = std::time::Duration::from_millis(1);

        let solution = CoinCbcSolver::new().solve(&problem, &Interrupt::new()).unwrap();
        if solution.status.has_solution() {
            assert!(problem.is_satisfied_by(&solution.variable_values));
        } else {
            assert!(solution.variable_values.is_empty());
        }
    }

    #[test]
    fn test_interrupt_before_submission() {
        let interrupt = Interrupt::new();
        interrupt.trigger();
        let solution = CoinCbcSolver::new().solve(&assignment(), &interrupt).unwrap();
        assert!(solution.interrupted);
        assert!(!solution.status.has_solution());
    }
}
