// Scheduling use case: catalog → model → solver → schedule
// Runs the stages strictly in order; the catalog and the built model are not
// touched after construction.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};

use crate::catalog::{CatalogData, CatalogError, EntityCatalog};
use crate::domain::{
    Interrupt, OptimizationProblem, Solution, SolutionStatus, SolverConfig, SolverError,
    SolverService, SolverStatistics,
};
use crate::model::{BuildError, BuiltModel, ModelBuilder, ModelConfig};
use crate::schedule::{DecodeError, ScheduleDecoder, ScheduleOutcome};

/// Errors that end a scheduling run.
///
/// Input and build errors can be fixed by the caller changing the catalog or
/// the model configuration. Solver and decode errors are passed up unchanged.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Input(#[from] CatalogError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error("Solver reported an error: {0}")]
    SolverStatus(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl PipelineError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PipelineError::Input(_) | PipelineError::Build(_))
    }
}

/// Application service running one build-then-solve pipeline per call.
pub struct SchedulingService {
    solver: Arc<dyn SolverService>,
    model_config: ModelConfig,
    solver_config: SolverConfig,
}

impl SchedulingService {
    pub fn new(solver: Arc<dyn SolverService>) -> Self {
        Self {
            solver,
            model_config: ModelConfig::default(),
            solver_config: SolverConfig::default(),
        }
    }

    pub fn with_model_config(mut self, config: ModelConfig) -> Self {
        self.model_config = config;
        self
    }

    pub fn with_solver_config(mut self, config: SolverConfig) -> Self {
        self.solver_config = config;
        self
    }

    pub fn solver_name(&self) -> &str {
        self.solver.name()
    }

    /// Validates raw entities and schedules them.
    pub fn run_data(
        &self,
        data: CatalogData,
        interrupt: &Interrupt,
    ) -> Result<ScheduleOutcome, PipelineError> {
        let catalog = EntityCatalog::try_from(data)?;
        self.run(&catalog, interrupt)
    }

    pub fn run(
        &self,
        catalog: &EntityCatalog,
        interrupt: &Interrupt,
    ) -> Result<ScheduleOutcome, PipelineError> {
        info!(
            "Building model for {} KDV(s), {} slot(s), {} resource(s), {} preference(s)",
            catalog.kdvs().len(),
            catalog.slots().len(),
            catalog.resources().len(),
            catalog.preferences().len()
        );
        let mut model = ModelBuilder::new(catalog, self.model_config.clone()).build()?;
        model.problem.solver_config = self.solver_config.clone();

        let started = Instant::now();
        let solution = if model.num_variables() == 0 {
            info!("Model has no variables, skipping {}", self.solver.name());
            solve_without_engine(&model.problem)
        } else {
            info!(
                "Solving {} variable(s) with {} (time limit {:?})",
                model.num_variables(),
                self.solver.name(),
                self.solver_config.time_limit
            );
            let first = self.solver.solve(&model.problem, interrupt)?;
            self.break_ties(&model, first, interrupt, started)?
        };

        match solution.status {
            SolutionStatus::Error => return Err(PipelineError::SolverStatus(solution.message)),
            SolutionStatus::Optimal => {}
            status => warn!("Solver finished with status {status}: {}", solution.message),
        }
        if solution.interrupted {
            warn!("Solve was interrupted, result is the best found so far");
        }

        let decode_started = Instant::now();
        let outcome = ScheduleDecoder::new(catalog, &model).decode(&solution)?;
        debug!("Decoded solution in {:?}", decode_started.elapsed());

        if let Some(schedule) = outcome.schedule() {
            info!(
                "{} of {} KDV(s) scheduled, objective {:.4}",
                schedule.scheduled_count(),
                catalog.kdvs().len(),
                schedule.objective_value
            );
        }
        Ok(outcome)
    }

    /// Re-solves an optimal selection with its preference value held fixed so
    /// that equally good schedules resolve to the canonically first one. The
    /// first solution is kept when there is no time left, the run was
    /// interrupted or the second solve finds nothing.
    fn break_ties(
        &self,
        model: &BuiltModel,
        first: Solution,
        interrupt: &Interrupt,
        started: Instant,
    ) -> Result<Solution, PipelineError> {
        if !first.is_optimal()
            || first.interrupted
            || !model.problem.is_satisfied_by(&first.variable_values)
        {
            return Ok(first);
        }
        let primary_value = model.problem.objective.evaluate(&first.variable_values);
        let Some(mut problem) = model.tie_break_problem(primary_value) else {
            return Ok(first);
        };
        if interrupt.is_triggered() {
            info!("Interrupted, skipping the tie-break solve");
            return Ok(first);
        }
        let remaining = self.solver_config.time_limit.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            info!("Time limit reached, skipping the tie-break solve");
            return Ok(first);
        }
        problem.solver_config.time_limit = remaining;

        debug!("Breaking ties among selections worth {primary_value:.6}");
        let second = self.solver.solve(&problem, interrupt)?;
        match second.status {
            SolutionStatus::Error => Err(PipelineError::SolverStatus(second.message)),
            SolutionStatus::Optimal | SolutionStatus::Feasible => {
                let mut statistics = first.statistics;
                statistics.solve_time_ms += second.statistics.solve_time_ms;
                Ok(Solution {
                    status: first.status,
                    objective_value: Some(model.problem.objective.evaluate(&second.variable_values)),
                    gap: first.gap,
                    variable_values: second.variable_values,
                    interrupted: second.interrupted,
                    message: first.message,
                    statistics,
                    quality: second.quality,
                })
            }
            status => {
                warn!("Tie-break solve finished with status {status}, keeping the first optimal selection");
                Ok(first)
            }
        }
    }
}

/// An empty model is decided by its rows alone: every row is constant.
fn solve_without_engine(problem: &OptimizationProblem) -> Solution {
    let statistics = SolverStatistics::for_problem(problem, 0.0);
    if problem.is_satisfied_by(&[]) {
        Solution::optimal(0.0, Vec::new())
            .with_message("Nothing to schedule")
            .with_statistics(statistics)
    } else {
        Solution::new(
            SolutionStatus::Infeasible,
            "Problem is infeasible: slot minimums cannot be met by any KDV",
        )
        .with_statistics(statistics)
    }
}
