use anyhow::{Context, Result};
use clap::Parser;
use kdvsched::infrastructure::{
    read_catalog, read_config, supervise, write_json, write_text, RunConfig, Supervised,
};
use kdvsched::{Interrupt, SchedulingService, SolverBackend, SolverFactory};
use log::{info, warn};
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit status after a second Ctrl-C, as for a shell killed by SIGINT.
const ABORTED: i32 = 130;

/// Schedule KDVs onto time slots and resources with a MIP solver.
#[derive(Parser)]
#[command(name = "kdvsched", version)]
struct Args {
    /// Catalog file (.json, otherwise YAML)
    #[arg(long)]
    catalog: PathBuf,

    /// Run configuration (YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Solve time limit in seconds
    #[arg(long, value_name = "SECS")]
    time_limit: Option<f64>,

    /// Relative optimality gap
    #[arg(long, value_name = "REL")]
    gap: Option<f64>,

    /// Solver backend: auto, highs or cbc
    #[arg(long)]
    solver: Option<SolverBackend>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(1)
        }
    }
}

/// Returns whether a schedule was produced.
async fn run(args: Args) -> Result<bool> {
    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None => RunConfig::default(),
    };
    if let Some(secs) = args.time_limit {
        config.solver.time_limit_secs = secs;
    }
    if let Some(gap) = args.gap {
        config.solver.relative_gap = Some(gap);
    }
    if let Some(backend) = args.solver {
        config.solver.backend = backend;
    }

    let solver_config = config.solver.solver_config()?;
    let solver =
        SolverFactory::create_with_sessions(solver_config.backend, config.solver.session_limiter())?;
    info!("Using solver: {}", solver.name());

    let data = read_catalog(&args.catalog)?;
    let service = SchedulingService::new(solver)
        .with_model_config(config.model)
        .with_solver_config(solver_config);

    let interrupt = Interrupt::new();
    let worker = interrupt.clone();
    let task = tokio::task::spawn_blocking(move || service.run_data(data, &worker));
    let result = match supervise(task, &interrupt, tokio::signal::ctrl_c)
        .await
        .context("scheduling task failed")?
    {
        Supervised::Finished(result) => result,
        Supervised::Aborted => {
            warn!("Aborted");
            std::process::exit(ABORTED);
        }
    };
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) if e.is_recoverable() => {
            return Err(anyhow::Error::new(e).context(format!(
                "cannot schedule {}; fix the input and retry",
                args.catalog.display()
            )))
        }
        Err(e) => return Err(e.into()),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.json {
        write_json(&outcome, &mut out)?;
    } else {
        write_text(&outcome, &mut out)?;
    }

    Ok(outcome.schedule().is_some())
}
