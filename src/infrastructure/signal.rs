// Infrastructure: Ctrl-C handling around a blocking scheduling run
// The first signal asks the run to stop at its next interrupt check and keep
// whatever it has; a second one gives up on the run.

use std::future::Future;
use std::io;

use log::warn;
use tokio::task::{JoinError, JoinHandle};

use crate::domain::Interrupt;

/// How a supervised task ended.
#[derive(Debug)]
pub enum Supervised<T> {
    Finished(T),
    /// A second signal arrived before the task returned.
    Aborted,
}

/// Awaits `task` while listening for signals from `next_signal`.
///
/// The first signal triggers `interrupt` and keeps waiting; the second returns
/// `Aborted` without waiting for the task. A signal source that fails to
/// install is ignored.
pub async fn supervise<T, F, Fut>(
    mut task: JoinHandle<T>,
    interrupt: &Interrupt,
    mut next_signal: F,
) -> Result<Supervised<T>, JoinError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    tokio::select! {
        joined = &mut task => return joined.map(Supervised::Finished),
        Ok(()) = next_signal() => {}
    }

    warn!("Interrupt received, stopping at the next check. Press Ctrl-C again to abort");
    interrupt.trigger();

    tokio::select! {
        joined = &mut task => joined.map(Supervised::Finished),
        Ok(()) = next_signal() => Ok(Supervised::Aborted),
    }
}
