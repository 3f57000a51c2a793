//! Pick job specification and report.
//!
//! A pick job bundles one track's probability rail, an optional raw waveform,
//! the snap settings and a list of click positions. Running it produces a
//! [`PickReport`] with the detected peaks, the resolved picks and the
//! filtered, normalized waveform, plus [`RunMetadata`] for reproducibility.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::filter::{filter_and_normalize, FilterError, FilterPreset, FilterSpec};
use crate::peaks::{find_local_peaks, Peak};
use crate::position::position_to_seconds;
use crate::snap::SnapOptions;
use crate::track::TrackId;

/// Default trace sample rate (Hz).
fn default_sample_rate() -> f64 {
    100.0
}

/// Seismic phase labels a pick can carry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseType {
    #[default]
    P,
    S,
    Pg,
    Pn,
    Sg,
    Sn,
    #[serde(rename = "PKP")]
    Pkp,
    #[serde(rename = "SKS")]
    Sks,
}

/// Errors raised while loading or running a pick job.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid job: {0}")]
    Invalid(String),

    #[error("unknown filter preset {0:?}")]
    UnknownPreset(String),

    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Specification for a single pick job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickJobSpec {
    /// Path to the phase probability rail (array of floats).
    pub probability_path: PathBuf,

    /// Path to the raw waveform trace, if it should be filtered for display.
    #[serde(default)]
    pub waveform_path: Option<PathBuf>,

    /// Track the rail belongs to.
    #[serde(default)]
    pub track_id: Option<TrackId>,

    /// Phase assigned to every resolved pick.
    #[serde(default)]
    pub phase: PhaseType,

    /// Sample rate shared by the rail and the waveform, in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,

    #[serde(default)]
    pub snap: SnapOptions,

    /// Built-in preset id (see [`crate::filter::default_presets`]).
    #[serde(default)]
    pub filter_preset: Option<String>,

    /// Inline filter spec. Takes precedence over `filter_preset`.
    #[serde(default)]
    pub filter: Option<FilterSpec>,

    /// Click positions in track percent.
    #[serde(default)]
    pub clicks: Vec<f64>,
}

impl PickJobSpec {
    /// Create a job spec with required fields only.
    pub fn new(probability_path: PathBuf) -> Self {
        Self {
            probability_path,
            waveform_path: None,
            track_id: None,
            phase: PhaseType::default(),
            sample_rate: default_sample_rate(),
            snap: SnapOptions::default(),
            filter_preset: None,
            filter: None,
            clicks: Vec::new(),
        }
    }

    /// Load a job spec from a JSON file.
    ///
    /// Relative input paths are resolved against the spec file's directory.
    pub fn from_file(path: &Path) -> Result<Self, JobError> {
        let content = std::fs::read_to_string(path).map_err(|source| JobError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut spec: Self = serde_json::from_str(&content).map_err(|e| JobError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if let Some(base) = path.parent() {
            spec.resolve_paths(base);
        }
        Ok(spec)
    }

    fn resolve_paths(&mut self, base: &Path) {
        if self.probability_path.is_relative() {
            self.probability_path = base.join(&self.probability_path);
        }
        if let Some(waveform) = self.waveform_path.as_mut() {
            if waveform.is_relative() {
                *waveform = base.join(&*waveform);
            }
        }
    }

    /// The filter to apply to the waveform.
    pub fn resolve_filter(&self) -> Result<FilterSpec, JobError> {
        if let Some(spec) = self.filter {
            return Ok(spec);
        }
        match &self.filter_preset {
            Some(id) => FilterPreset::builtin(id)
                .map(|preset| preset.spec)
                .ok_or_else(|| JobError::UnknownPreset(id.clone())),
            None => Ok(FilterSpec::none()),
        }
    }

    /// Validate the job specification.
    pub fn validate(&self) -> Result<(), JobError> {
        if !self.probability_path.exists() {
            return Err(JobError::Invalid(format!(
                "Probability file not found: {:?}",
                self.probability_path
            )));
        }
        if let Some(waveform) = &self.waveform_path {
            if !waveform.exists() {
                return Err(JobError::Invalid(format!(
                    "Waveform file not found: {:?}",
                    waveform
                )));
            }
        }
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(JobError::Invalid("Sample rate must be positive".to_string()));
        }
        self.snap.validate().map_err(JobError::Invalid)?;
        if let Some(bad) = self.clicks.iter().find(|c| !c.is_finite()) {
            return Err(JobError::Invalid(format!("Click position {} is not finite", bad)));
        }

        self.resolve_filter()?.validate(self.sample_rate)?;
        Ok(())
    }
}

/// A click resolved against the probability rail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickRecord {
    pub phase: PhaseType,
    /// Original click position.
    pub click: f64,
    /// Final position in track percent.
    pub position: f64,
    /// Final position in seconds from the start of the rail.
    pub seconds: f64,
    pub snapped: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub peak: Option<Peak>,
}

/// Metadata for a completed job run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,

    /// SHA-256 of the probability file.
    pub probability_hash: String,

    /// SHA-256 of the waveform file, if one was processed.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub waveform_hash: Option<String>,

    pub picker_version: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl RunMetadata {
    /// Compute SHA-256 hash of file content.
    pub fn hash_file(path: &Path) -> Result<String, std::io::Error> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 8192];

        loop {
            let bytes_read = file.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }
}

/// Output of [`run_job`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickReport {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub track_id: Option<TrackId>,

    /// Pick store key (`NET.STA`), when the track is known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub station_id: Option<String>,

    pub sample_count: usize,
    pub filter: FilterSpec,
    pub peaks: Vec<Peak>,
    pub picks: Vec<PickRecord>,

    /// Filtered and normalized waveform, ready for drawing.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub waveform: Option<Vec<f64>>,

    pub metadata: RunMetadata,
}

impl PickReport {
    /// Save the report to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), JobError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| JobError::Invalid(format!("Failed to serialize report: {}", e)))?;
        std::fs::write(path, json).map_err(|source| JobError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Parse a series from JSON (array of floats) or whitespace-separated floats.
pub fn parse_series(contents: &str) -> Result<Vec<f64>, String> {
    serde_json::from_str::<Vec<f64>>(contents)
        .or_else(|_| {
            contents
                .split_whitespace()
                .map(|s| s.parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
        })
        .map_err(|_| {
            "expected a JSON list of floats or whitespace separated floats".to_string()
        })
}

/// Read a series file.
pub fn read_series(path: &Path) -> Result<Vec<f64>, JobError> {
    let contents = std::fs::read_to_string(path).map_err(|source| JobError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_series(&contents).map_err(|message| JobError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

fn hash_input(path: &Path) -> Result<String, JobError> {
    RunMetadata::hash_file(path).map_err(|source| JobError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Run a pick job.
pub fn run_job(spec: &PickJobSpec) -> Result<PickReport, JobError> {
    spec.validate()?;
    let started_at = Utc::now();
    let mut warnings = Vec::new();

    let probabilities = read_series(&spec.probability_path)?;
    if probabilities.len() < 3 {
        warnings.push(format!(
            "Probability rail has {} samples; at least 3 are needed for peaks",
            probabilities.len()
        ));
    }

    let peaks = find_local_peaks(&probabilities, spec.snap.threshold);
    if peaks.is_empty() && probabilities.len() >= 3 {
        warnings.push(format!(
            "No peaks with prominence >= {} found",
            spec.snap.threshold
        ));
    }

    let picks: Vec<PickRecord> = spec
        .snap
        .resolve_all(&spec.clicks, &probabilities)
        .into_iter()
        .zip(spec.clicks.iter())
        .map(|(result, &click)| PickRecord {
            phase: spec.phase,
            click,
            position: result.position,
            seconds: position_to_seconds(result.position, probabilities.len(), spec.sample_rate),
            snapped: result.snapped,
            peak: result.peak,
        })
        .collect();

    let filter = spec.resolve_filter()?;
    let (waveform, waveform_hash) = match &spec.waveform_path {
        Some(path) => {
            let raw = read_series(path)?;
            let display = filter_and_normalize(&raw, &filter, spec.sample_rate)?;
            (Some(display), Some(hash_input(path)?))
        }
        None => (None, None),
    };

    for warning in &warnings {
        log::warn!("{}", warning);
    }
    log::info!(
        "Pick job complete: {} samples, {} peaks, {} of {} clicks snapped",
        probabilities.len(),
        peaks.len(),
        picks.iter().filter(|p| p.snapped).count(),
        picks.len()
    );

    Ok(PickReport {
        station_id: spec.track_id.as_ref().map(TrackId::station_id),
        track_id: spec.track_id.clone(),
        sample_count: probabilities.len(),
        filter,
        peaks,
        picks,
        waveform,
        metadata: RunMetadata {
            started_at,
            completed_at: Utc::now(),
            probability_hash: hash_input(&spec.probability_path)?,
            waveform_hash,
            picker_version: env!("CARGO_PKG_VERSION").to_string(),
            warnings,
        },
    })
}
