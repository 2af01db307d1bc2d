use crate::domain::{
    models::OptimizationProblem,
    session::SessionLimiter,
    solver_service::{Result, SolverError, SolverService},
    value_objects::SolverBackend,
};
#[cfg(feature = "cbc")]
use crate::solver::CoinCbcSolver;
#[cfg(feature = "highs")]
use crate::solver::HighsSolver;
use std::sync::Arc;

/// Factory for creating solver instances based on configuration
pub struct SolverFactory;

impl SolverFactory {
    /// Create a solver based on the problem configuration
    pub fn create_solver(problem: &OptimizationProblem) -> Result<Arc<dyn SolverService>> {
        Self::create_from_backend(problem.solver_config.backend)
    }

    /// Create a solver for a specific backend with unlimited sessions
    pub fn create_from_backend(backend: SolverBackend) -> Result<Arc<dyn SolverService>> {
        Self::create_with_sessions(backend, SessionLimiter::unlimited())
    }

    /// Create a solver for a specific backend sharing the given session limiter.
    ///
    /// `Auto` prefers HiGHS and falls back to CBC when only that one was compiled in.
    pub fn create_with_sessions(
        backend: SolverBackend,
        sessions: SessionLimiter,
    ) -> Result<Arc<dyn SolverService>> {
        match backend {
            #[cfg(feature = "highs")]
            SolverBackend::Auto | SolverBackend::Highs => {
                Ok(Arc::new(HighsSolver::with_sessions(sessions)))
            }
            #[cfg(all(feature = "cbc", not(feature = "highs")))]
            SolverBackend::Auto => Ok(Arc::new(CoinCbcSolver::with_sessions(sessions))),
            #[cfg(feature = "cbc")]
            SolverBackend::Cbc => Ok(Arc::new(CoinCbcSolver::with_sessions(sessions))),
            #[allow(unreachable_patterns)]
            other => {
                let _ = sessions;
                Err(SolverError::SolverNotAvailable(format!(
                    "{other} support was not compiled in (enable the '{}' feature)",
                    feature_for(other)
                )))
            }
        }
    }

    /// Backends usable in this build.
    pub fn available_backends() -> Vec<SolverBackend> {
        let mut backends = Vec::new();
        if cfg!(feature = "highs") {
            backends.push(SolverBackend::Highs);
        }
        if cfg!(feature = "cbc") {
            backends.push(SolverBackend::Cbc);
        }
        backends
    }
}

fn feature_for(backend: SolverBackend) -> &'static str {
    match backend {
        SolverBackend::Cbc => "cbc",
        SolverBackend::Auto | SolverBackend::Highs => "highs",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "highs")]
    #[test]
    fn test_auto_prefers_highs() {
        let solver = SolverFactory::create_from_backend(SolverBackend::Auto).unwrap();
        assert_eq!(solver.name(), "HiGHS");
        assert!(solver.supports_mip());
    }

    #[cfg(not(feature = "cbc"))]
    #[test]
    fn test_missing_backend_is_reported() {
        let err = SolverFactory::create_from_backend(SolverBackend::Cbc)
            .err()
            .unwrap();
        assert!(matches!(err, SolverError::SolverNotAvailable(_)));
        assert!(err.to_string().contains("cbc"));
    }

    #[test]
    fn test_available_backends_match_features() {
        let backends = SolverFactory::available_backends();
        assert_eq!(backends.contains(&SolverBackend::Highs), cfg!(feature = "highs"));
        assert_eq!(backends.contains(&SolverBackend::Cbc), cfg!(feature = "cbc"));
    }
}
