// Infrastructure: run configuration
// Optional YAML file; every field has a default so an empty file is valid.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use super::loader::read_yaml_file;
use crate::domain::{SessionLimiter, SolverBackend, SolverConfig};
use crate::model::ModelConfig;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub solver: SolverSettings,
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub backend: SolverBackend,
    pub time_limit_secs: f64,
    pub relative_gap: Option<f64>,
    pub absolute_gap: Option<f64>,
    pub threads: Option<u32>,
    pub random_seed: Option<u32>,
    pub verbose: bool,
    /// Concurrent solves allowed against the backend; unlimited when absent.
    pub max_sessions: Option<usize>,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            backend: SolverBackend::Auto,
            time_limit_secs: 60.0,
            relative_gap: None,
            absolute_gap: None,
            threads: None,
            random_seed: None,
            verbose: false,
            max_sessions: None,
        }
    }
}

impl SolverSettings {
    pub fn solver_config(&self) -> Result<SolverConfig> {
        if !(self.time_limit_secs.is_finite() && self.time_limit_secs > 0.0) {
            bail!(
                "time limit must be a positive number of seconds, got {}",
                self.time_limit_secs
            );
        }
        let time_limit = Duration::try_from_secs_f64(self.time_limit_secs)
            .with_context(|| format!("time limit {} s is out of range", self.time_limit_secs))?;

        Ok(SolverConfig {
            backend: self.backend,
            time_limit,
            relative_gap: self.relative_gap,
            absolute_gap: self.absolute_gap,
            threads: self.threads,
            random_seed: self.random_seed,
            verbose: self.verbose,
        })
    }

    pub fn session_limiter(&self) -> SessionLimiter {
        match self.max_sessions {
            Some(max) => SessionLimiter::with_max_sessions(max),
            None => SessionLimiter::unlimited(),
        }
    }
}

pub fn read_config(path: &Path) -> Result<RunConfig> {
    read_yaml_file(path)
        .with_context(|| format!("failed to load run config at {}", path.display()))
}
