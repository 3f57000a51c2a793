use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use crate::filter::{
    apply_filter, default_presets, filter_and_normalize, FilterKind, FilterPreset, FilterSpec,
};
use crate::job::{read_series, run_job, PickJobSpec};
use crate::peaks::find_local_peaks;
use crate::snap::{snap_to_nearest_peak, DEFAULT_MAX_SNAP_DISTANCE, DEFAULT_SNAP_THRESHOLD};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect prominent peaks in a probability rail
    Peaks {
        /// Input file (JSON array of floats or whitespace separated floats)
        #[arg(long)]
        input: PathBuf,

        /// Minimum peak prominence
        #[arg(long, default_value_t = DEFAULT_SNAP_THRESHOLD)]
        threshold: f64,
    },

    /// Snap a click position to the nearest peak
    Snap {
        /// Probability rail file
        #[arg(long)]
        input: PathBuf,

        /// Click position in track percent [0, 100]
        #[arg(long, allow_negative_numbers = true)]
        click: f64,

        /// Minimum peak prominence
        #[arg(long, default_value_t = DEFAULT_SNAP_THRESHOLD)]
        threshold: f64,

        /// Maximum snap distance in track percent
        #[arg(long, default_value_t = DEFAULT_MAX_SNAP_DISTANCE)]
        max_distance: f64,
    },

    /// Filter a waveform trace
    Filter {
        /// Waveform file
        #[arg(long)]
        input: PathBuf,

        /// Built-in preset id (see `presets`)
        #[arg(long, conflicts_with_all = ["kind", "low", "high"])]
        preset: Option<String>,

        /// Filter type
        #[arg(long, value_enum)]
        kind: Option<KindArg>,

        /// Lower corner frequency in Hz
        #[arg(long, requires = "kind")]
        low: Option<f64>,

        /// Upper corner frequency in Hz
        #[arg(long, requires = "kind")]
        high: Option<f64>,

        /// Sample rate in Hz
        #[arg(long, default_value_t = 100.0)]
        sample_rate: f64,

        /// Rescale output to [-1, 1]
        #[arg(long)]
        normalize: bool,
    },

    /// List built-in filter presets
    Presets,

    /// Run a pick job described by a JSON spec
    Job {
        /// Job spec file
        #[arg(long)]
        spec: PathBuf,

        /// Write the report here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    #[value(alias = "raw")]
    None,
    Highpass,
    Bandpass,
    Lowpass,
}

impl From<KindArg> for FilterKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::None => FilterKind::None,
            KindArg::Highpass => FilterKind::Highpass,
            KindArg::Bandpass => FilterKind::Bandpass,
            KindArg::Lowpass => FilterKind::Lowpass,
        }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Peaks { input, threshold } => {
            let data = load(&input)?;
            let peaks = find_local_peaks(&data, threshold);
            log::info!("Found {} peaks in {} samples", peaks.len(), data.len());
            print_json(&peaks)?;
        }
        Commands::Snap {
            input,
            click,
            threshold,
            max_distance,
        } => {
            let data = load(&input)?;
            let result = snap_to_nearest_peak(click, &data, threshold, max_distance);
            print_json(&result)?;
        }
        Commands::Filter {
            input,
            preset,
            kind,
            low,
            high,
            sample_rate,
            normalize,
        } => {
            let spec = resolve_filter(preset.as_deref(), kind, low, high)?;
            let data = load(&input)?;
            let output = if normalize {
                filter_and_normalize(&data, &spec, sample_rate)?
            } else {
                apply_filter(&data, &spec, sample_rate)?
            };
            print_json(&output)?;
        }
        Commands::Presets => {
            print_json(&default_presets())?;
        }
        Commands::Job { spec, out } => {
            let job = PickJobSpec::from_file(&spec)?;
            let report = run_job(&job)?;
            match out {
                Some(path) => {
                    report.save(&path)?;
                    log::info!("Report written to {:?}", path);
                }
                None => print_json(&report)?,
            }
        }
    }
    Ok(())
}

fn load(path: &Path) -> Result<Vec<f64>> {
    read_series(path).with_context(|| format!("Failed to load series from {:?}", path))
}

fn resolve_filter(
    preset: Option<&str>,
    kind: Option<KindArg>,
    low: Option<f64>,
    high: Option<f64>,
) -> Result<FilterSpec> {
    if let Some(id) = preset {
        return FilterPreset::builtin(id)
            .map(|p| p.spec)
            .ok_or_else(|| anyhow::anyhow!("Unknown filter preset {:?}", id));
    }

    Ok(FilterSpec {
        kind: kind.map(FilterKind::from).unwrap_or_default(),
        low_freq: low,
        high_freq: high,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
