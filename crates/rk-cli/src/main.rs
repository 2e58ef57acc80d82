//! `rk` - solve, explode and inspect assembly project files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rk_cli::{AssemblyProject, AssemblySession, EngineConfig};
use rk_core::InstanceStore;
use rk_explode::ExplodeDirection;

#[derive(Parser)]
#[command(name = "rk")]
#[command(about = "Assembly constraint solving and exploded views", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve the project's mates and print the result as JSON
    Solve {
        /// Project file (RON)
        project: PathBuf,

        /// Engine configuration file (RON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the solved transforms back to the project file
        #[arg(long)]
        write: bool,
    },

    /// Print exploded transforms as JSON
    Explode {
        /// Project file (RON)
        project: PathBuf,

        /// Explode factor (0 = assembled, 1 = fully exploded)
        #[arg(long, default_value_t = 1.0)]
        factor: f32,

        /// radial, x, y, z, xyz or hierarchical
        #[arg(long)]
        direction: Option<ExplodeDirection>,

        /// Maximum displacement
        #[arg(long)]
        distance: Option<f32>,

        /// Engine configuration file (RON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Store the explode settings in the project file
        #[arg(long)]
        write: bool,
    },

    /// Report degrees of freedom without solving
    Check {
        /// Project file (RON)
        project: PathBuf,
    },
}

fn main() -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rk_cli=info,rk_solver=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Solve {
            project,
            config,
            write,
        } => solve(&project, config.as_deref(), write),
        Commands::Explode {
            project,
            factor,
            direction,
            distance,
            config,
            write,
        } => explode(&project, factor, direction, distance, config.as_deref(), write),
        Commands::Check { project } => check(&project),
    }
}

fn open_session(project: &Path, config: Option<&Path>) -> Result<AssemblySession> {
    let engine_config = match config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let project = AssemblyProject::load(project)
        .with_context(|| format!("Failed to load project {}", project.display()))?;
    Ok(AssemblySession::from_config(project, &engine_config))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn solve(path: &Path, config: Option<&Path>, write: bool) -> Result<()> {
    let mut session = open_session(path, config)?;
    let result = if write {
        session.solve_and_apply()
    } else {
        session.solve()
    };

    for warning in &result.warnings {
        tracing::warn!(?warning, "Solver warning");
    }
    print_json(&result)?;

    if write {
        session
            .project()
            .save(path)
            .with_context(|| format!("Failed to save project {}", path.display()))?;
    }
    Ok(())
}

fn explode(
    path: &Path,
    factor: f32,
    direction: Option<ExplodeDirection>,
    distance: Option<f32>,
    config: Option<&Path>,
    write: bool,
) -> Result<()> {
    let mut session = open_session(path, config)?;
    session
        .load_explode_view()
        .context("Stored explode view is invalid")?;
    if let Some(direction) = direction {
        session.explode_mut().set_auto_explode_direction(direction);
    }
    if let Some(distance) = distance {
        session.explode_mut().set_auto_explode_distance(distance);
    }
    session.store_explode_baseline();
    session.explode_mut().set_explode_factor(factor);

    print_json(&session.exploded_transforms(factor))?;

    if write {
        session.save_explode_view()?;
        session
            .project()
            .save(path)
            .with_context(|| format!("Failed to save project {}", path.display()))?;
    }
    Ok(())
}

fn check(path: &Path) -> Result<()> {
    let session = open_session(path, None)?;
    let analysis = session.analyze_dof();
    tracing::info!(
        instances = session.project().instances().len(),
        mates = session.project().mates.len(),
        remaining = analysis.total_remaining(),
        over_constrained = analysis.is_over_constrained(),
        "Checked project"
    );
    print_json(&analysis)
}
