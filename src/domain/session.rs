// Scoped solver sessions.
// A session stands for whatever an engine needs to hold while it solves
// (a license token, a connection, a worker slot). It is acquired at the start
// of a single solve and released when the guard drops, on every exit path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::solver_service::{Result, SolverError};

/// Bounds the number of concurrently open sessions for one solver backend.
#[derive(Debug, Clone)]
pub struct SessionLimiter {
    max_sessions: Option<usize>,
    in_use: Arc<AtomicUsize>,
}

impl SessionLimiter {
    /// Limiter that never refuses a session.
    pub fn unlimited() -> Self {
        Self {
            max_sessions: None,
            in_use: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_max_sessions(max_sessions: usize) -> Self {
        Self {
            max_sessions: Some(max_sessions),
            in_use: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of sessions currently held.
    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }

    /// Takes a session without blocking, or fails with `SessionUnavailable`.
    pub fn try_acquire(&self) -> Result<SessionGuard> {
        let acquired = self
            .in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |held| {
                match self.max_sessions {
                    Some(max) if held >= max => None,
                    _ => Some(held + 1),
                }
            });

        match acquired {
            Ok(_) => Ok(SessionGuard {
                in_use: Arc::clone(&self.in_use),
            }),
            Err(held) => Err(SolverError::SessionUnavailable(format!(
                "all {held} solver sessions are in use"
            ))),
        }
    }
}

impl Default for SessionLimiter {
    fn default() -> Self {
        Self::unlimited()
    }
}

/// RAII handle for one open session; dropping it releases the session,
/// including on early return and unwinding.
#[derive(Debug)]
pub struct SessionGuard {
    in_use: Arc<AtomicUsize>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.in_use.fetch_sub(1, Ordering::AcqRel);
    }
}
