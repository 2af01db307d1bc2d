// Infrastructure layer: configuration file, input loader, output sink, signals
pub mod config;
pub mod loader;
pub mod report;
pub mod signal;

pub use config::{read_config, RunConfig, SolverSettings};
pub use loader::{parse_catalog, read_catalog, read_yaml_file, CatalogFormat};
pub use report::{write_json, write_text};
pub use signal::{supervise, Supervised};
