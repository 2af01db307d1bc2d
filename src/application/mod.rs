// Application layer: the scheduling use case
pub mod pipeline;

pub use pipeline::{PipelineError, SchedulingService};
