//! Main executable for symdock-funnel

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use std::path::{Path, PathBuf};

use symdock_funnel::config::{parse_oligomers, PipelineConfig, Preset};
use symdock_funnel::{pipeline, plot, report};

const USAGE: &str = "\
Usage: symdock-funnel <any_string> [OPTIONS]

NECESSARY FILE STRUCTURE (dimer-trimer preset):
RUN_DIRECTORY/
├── 2/
│   └── score.sc
│   └── LOCAL/
│         └── score.sc
└── 3/
    └── score.sc
    └── LOCAL/
          └── score.sc

Use --preset dimer-pentamer (5/ instead of 3/) or --oligomers 2,4,... for
other conditions. Outputs {label}_summary.txt, {label}_summary.json and
sdplot_{label}.svg, where {label} is the run directory name.";

/// Command-line arguments for the application
#[derive(Parser, Debug)]
#[clap(
    name = "symdock-funnel",
    version = symdock_funnel::VERSION,
    about = "Pnear and funnel plots for symmetric docking score logs"
)]
struct Cli {
    /// `help` prints the expected run directory layout; any other value runs the analysis
    mode: String,

    /// Named set of conditions (dimer-trimer, dimer-pentamer)
    #[clap(long, value_parser)]
    preset: Option<Preset>,

    /// Configuration file with `key = value` settings
    #[clap(long, short, value_parser)]
    config: Option<PathBuf>,

    /// Oligomer sizes to analyze, e.g. 2,3
    #[clap(long)]
    oligomers: Option<String>,

    /// Run directory containing one sub-directory per oligomer size
    #[clap(long, value_parser)]
    run_dir: Option<PathBuf>,

    /// Label embedded in output file names (defaults to the run directory name)
    #[clap(long)]
    label: Option<String>,

    /// Output directory (defaults to the run directory)
    #[clap(long, short, value_parser)]
    out_dir: Option<PathBuf>,

    /// Distance cutoff for plotted models
    #[clap(long)]
    rmsd_cutoff: Option<f64>,

    /// Skip the funnel plot
    #[clap(long)]
    no_plot: bool,
}

/// Name of the run directory, used as the default run label
fn directory_label(dir: &Path) -> Result<String> {
    let dir = dir
        .canonicalize()
        .with_context(|| format!("Failed to resolve run directory: {}", dir.display()))?;
    Ok(dir
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "run".to_string()))
}

/// Layer defaults, preset, config file and CLI flags
fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    let run_dir = match &cli.run_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };

    let mut config = PipelineConfig::new(&directory_label(&run_dir)?, &run_dir);

    if let Some(preset) = cli.preset {
        config = config.with_preset(preset);
    }

    if let Some(config_path) = &cli.config {
        let config_str = std::fs::read_to_string(config_path).with_context(|| {
            format!("Failed to read config file: {}", config_path.display())
        })?;
        config.apply_config_str(&config_str).with_context(|| {
            format!("Invalid config file: {}", config_path.display())
        })?;
    }

    if let Some(oligomers) = &cli.oligomers {
        config.oligomers = parse_oligomers(oligomers)?;
    }
    if let Some(label) = &cli.label {
        config.run_label = label.clone();
    }
    if let Some(out_dir) = &cli.out_dir {
        config.out_dir = out_dir.clone();
    }
    if let Some(cutoff) = cli.rmsd_cutoff {
        config.rmsd_cutoff = cutoff;
    }
    if cli.no_plot {
        config.plot = false;
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    // Parse command-line arguments
    let cli = Cli::parse();

    if cli.mode == "help" {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = build_config(&cli)?;
    info!("Analyzing run {} in {}", config.run_label, config.run_dir.display());

    let results = pipeline::run(&config);
    let total = results.len();

    let mut reports = Vec::with_capacity(total);
    for result in results {
        match result {
            Ok(r) => reports.push(r),
            Err(err) => error!("Condition failed: {}", err),
        }
    }

    if !reports.is_empty() {
        std::fs::create_dir_all(&config.out_dir).with_context(|| {
            format!("Failed to create output directory: {}", config.out_dir.display())
        })?;

        let written = report::write_summaries(&config.out_dir, &config.run_label, &reports)
            .context("Failed to write summary")?;
        for path in &written {
            info!("Summary written to {}", path.display());
        }

        if config.plot {
            plot::draw_funnels(&config.out_dir, &config, &reports)
                .context("Failed to draw funnel plot")?;
        }
    }

    if reports.len() < total {
        return Err(anyhow::anyhow!(
            "{} of {} conditions failed",
            total - reports.len(),
            total
        ));
    }

    info!("Plots for {} were generated", config.run_label);
    Ok(())
}
