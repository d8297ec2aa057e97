//! Command-line front end
//!
//! - `fracture_modes generate --node mesh.node --ele mesh.ele --output out/`
//! - `fracture_modes demo --output out/`

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use fracture_modes::{
    BatchDriver, FractureConfig, FractureModes, MeshGenerator, ModeParameters, SurfaceMesh, VolumeMesh,
};

#[derive(Parser)]
#[command(name = "fracture_modes")]
#[command(about = "Fracture modes and impact-driven fracture generation for tetrahedral meshes", long_about = None)]
#[command(version)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute modes for a TetGen mesh and write fractures
    Generate {
        #[arg(long)]
        node: PathBuf,

        #[arg(long)]
        ele: PathBuf,

        /// Fine display surface (OBJ)
        #[arg(long)]
        surface: Option<PathBuf>,

        /// Interior surface (OBJ), used together with --surface
        #[arg(long, requires = "surface")]
        interior: Option<PathBuf>,

        #[arg(long)]
        output: PathBuf,

        /// TOML configuration
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        num_impacts: Option<usize>,

        /// Write TOML/OBJ instead of the binary encoding
        #[arg(long)]
        plain: bool,

        #[arg(long)]
        workers: Option<usize>,
    },

    /// Run the pipeline on a generated box
    Demo {
        #[arg(long)]
        output: PathBuf,

        #[arg(long, default_value_t = 8)]
        num_impacts: usize,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn run(
    name: &str,
    mesh: VolumeMesh,
    display: Option<SurfaceMesh>,
    interior: Option<SurfaceMesh>,
    config: &FractureConfig,
    output: &Path,
) -> Result<()> {
    config.log_summary();
    let driver = BatchDriver::new(config)?;
    tracing::info!(workers = driver.num_workers(), nodes = mesh.num_nodes(), tets = mesh.num_tets(), "starting");

    let mut modes = FractureModes::compute_modes(mesh, ModeParameters::from_config(config))
        .context("computing fracture modes")?;
    if let Some(display) = display {
        modes = modes.impact_precomputation(display, interior).context("embedding display surface")?;
    }

    for (k, value) in modes.modes().eigenvalues.iter().enumerate() {
        tracing::debug!(mode = k, eigenvalue = value);
    }

    let report = driver.generate_fractures(name, &modes, output)?;
    tracing::info!(
        written = report.written,
        failed = report.failed,
        skipped = report.skipped,
        output = %output.display(),
        "done"
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            node,
            ele,
            surface,
            interior,
            output,
            config,
            num_impacts,
            plain,
            workers,
        } => {
            let mut config = match config {
                Some(path) => FractureConfig::from_file(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => FractureConfig::default(),
            };
            if let Some(n) = num_impacts {
                config.batch.num_impacts = n;
            }
            if let Some(w) = workers {
                config.batch.workers = w;
            }
            config.batch.compressed &= !plain;
            config.verbose |= cli.verbose;
            config.validate()?;
            init_logging(config.verbose);

            let mesh = VolumeMesh::from_tetgen(&node, &ele)
                .with_context(|| format!("reading {} / {}", node.display(), ele.display()))?;
            let display = surface.as_deref().map(SurfaceMesh::from_obj).transpose()?;
            let interior = interior.as_deref().map(SurfaceMesh::from_obj).transpose()?;

            let name = node
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("object")
                .to_string();
            run(&name, mesh, display, interior, &config, &output)
        }
        Commands::Demo { output, num_impacts } => {
            init_logging(cli.verbose);
            let mut config = FractureConfig {
                num_modes: 6,
                verbose: cli.verbose,
                ..FractureConfig::default()
            };
            config.batch.num_impacts = num_impacts;
            config.batch.candidates_per_impact = 4;

            let mesh = MeshGenerator::generate_box(8, 5, 3, 2.0, 1.2, 0.7)?;
            run("box", mesh, None, None, &config, &output)
        }
    }
}
