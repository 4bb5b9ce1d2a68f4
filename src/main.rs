//! iemforge CLI: run a project sweep or inspect a measurement file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use iemforge::export::{export_csv, write_csv, CsvLayout};
use iemforge::io::{import_measurement, MeasurementKind};
use iemforge::project::load_project;

#[derive(Parser)]
#[command(name = "iemforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Response,
    Impedance,
}

impl From<KindArg> for MeasurementKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::Response => MeasurementKind::Response,
            KindArg::Impedance => MeasurementKind::Impedance,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Sweep a project and write the response as CSV
    Simulate {
        /// Project file (JSON)
        #[arg(short, long)]
        project: PathBuf,

        /// CSV output path; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the grid density
        #[arg(long)]
        points_per_octave: Option<usize>,

        /// Append SPL/impedance/phase columns for every driver
        #[arg(long)]
        per_driver: bool,
    },

    /// Parse a measurement file and print a summary
    Inspect {
        /// .frd / .zma / text export
        file: PathBuf,

        /// Measurement kind; inferred from the extension when omitted
        #[arg(short, long)]
        kind: Option<KindArg>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    iemforge::init_tracing(level);

    match cli.command {
        Commands::Simulate {
            project,
            output,
            points_per_octave,
            per_driver,
        } => simulate(&project, output.as_deref(), points_per_octave, per_driver),
        Commands::Inspect { file, kind } => inspect(&file, kind.map(Into::into)),
    }
}

fn simulate(
    project_path: &Path,
    output: Option<&Path>,
    points_per_octave: Option<usize>,
    per_driver: bool,
) -> Result<()> {
    let project = load_project(project_path)
        .with_context(|| format!("loading project {}", project_path.display()))?;
    let base_dir = project_path.parent().unwrap_or_else(|| Path::new("."));

    let mut session = project
        .into_session(base_dir)
        .context("building session from project")?;
    if let Some(ppo) = points_per_octave {
        let mut config = session.config().clone();
        config.sweep.points_per_octave = ppo;
        session.set_config(config).context("applying --points-per-octave")?;
    }

    let results = session.run().context("running sweep")?;

    let layout = if per_driver {
        CsvLayout::WithDrivers
    } else {
        CsvLayout::Totals
    };
    match output {
        Some(path) => export_csv(path, &results, layout)
            .with_context(|| format!("writing {}", path.display()))?,
        None => write_csv(std::io::stdout().lock(), &results, layout)?,
    }

    info!("simulate: {} points written", results.len());
    Ok(())
}

fn inspect(file: &Path, kind: Option<MeasurementKind>) -> Result<()> {
    let series = import_measurement(file, kind)
        .with_context(|| format!("reading {}", file.display()))?;

    println!("File:   {}", file.display());
    println!("Kind:   {:?}", series.kind);
    println!("Points: {}", series.len());
    if let Some((lo, hi)) = series.frequency_range() {
        println!("Range:  {lo:.1} Hz - {hi:.1} Hz");
    }
    if let Some((lo, hi)) = series.value_range() {
        let unit = match series.kind {
            MeasurementKind::Response => "dB",
            MeasurementKind::Impedance => "Ohm",
        };
        println!("Values: {lo:.2} {unit} - {hi:.2} {unit}");
    }
    Ok(())
}
