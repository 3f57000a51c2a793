//! Lightweight waveform filters.
//!
//! Three filters are available for waveform display:
//!
//! - **Highpass**: first-order RC stage with corner `lowFreq`
//! - **Lowpass**: first-order RC stage with corner `highFreq`
//! - **Bandpass**: resonant two-pole IIR centred between `lowFreq` and
//!   `highFreq`, with pole radius set by the bandwidth
//!
//! Filters are designed once from a [`FilterSpec`] and a sample rate, then run
//! over the whole trace. Output is unnormalized; [`normalize`] rescales it to
//! [-1, 1] for drawing.
//!
//! Specs are validated before any sample is touched: a missing corner
//! frequency, a non-positive or non-finite frequency or sample rate, a corner
//! at or beyond Nyquist, or an empty passband all yield a [`FilterError`]
//! instead of NaN or a diverging trace.

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum pole radius for the resonant bandpass.
const MIN_POLE_RADIUS: f64 = 0.01;

/// Lowest corner frequency produced from centre/bandwidth settings.
const MIN_BAND_LOW_HZ: f64 = 0.1;

/// Filter type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    #[default]
    #[serde(alias = "raw")]
    None,
    Highpass,
    Bandpass,
    Lowpass,
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKind::None => write!(f, "none"),
            FilterKind::Highpass => write!(f, "highpass"),
            FilterKind::Bandpass => write!(f, "bandpass"),
            FilterKind::Lowpass => write!(f, "lowpass"),
        }
    }
}

/// Errors raised when a filter spec cannot be applied.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("{kind} filter requires {field}")]
    MissingFrequency {
        kind: FilterKind,
        field: &'static str,
    },

    #[error("{field} must be a positive finite frequency, got {value}")]
    InvalidFrequency { field: &'static str, value: f64 },

    #[error("sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f64),

    #[error("{field} of {value} Hz is beyond the Nyquist frequency ({nyquist} Hz)")]
    AboveNyquist {
        field: &'static str,
        value: f64,
        nyquist: f64,
    },

    #[error("bandpass requires lowFreq < highFreq, got {low} Hz to {high} Hz")]
    EmptyPassband { low: f64, high: f64 },
}

/// Filter configuration, as supplied by the settings form.
///
/// JSON shape: `{ "type": "bandpass", "lowFreq": 1.0, "highFreq": 10.0 }`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    #[serde(rename = "type", default)]
    pub kind: FilterKind,

    /// Lower corner in Hz (highpass, bandpass).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_freq: Option<f64>,

    /// Upper corner in Hz (lowpass, bandpass).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_freq: Option<f64>,
}

impl FilterSpec {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn highpass(low_freq: f64) -> Self {
        Self {
            kind: FilterKind::Highpass,
            low_freq: Some(low_freq),
            high_freq: None,
        }
    }

    pub fn lowpass(high_freq: f64) -> Self {
        Self {
            kind: FilterKind::Lowpass,
            low_freq: None,
            high_freq: Some(high_freq),
        }
    }

    pub fn bandpass(low_freq: f64, high_freq: f64) -> Self {
        Self {
            kind: FilterKind::Bandpass,
            low_freq: Some(low_freq),
            high_freq: Some(high_freq),
        }
    }

    /// Check that this spec can be applied at `sample_rate`.
    pub fn validate(&self, sample_rate: f64) -> Result<(), FilterError> {
        self.design(sample_rate).map(|_| ())
    }

    fn design(&self, sample_rate: f64) -> Result<Design, FilterError> {
        if self.kind == FilterKind::None {
            return Ok(Design::Identity);
        }

        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(FilterError::InvalidSampleRate(sample_rate));
        }
        let nyquist = sample_rate / 2.0;
        let dt = 1.0 / sample_rate;

        match self.kind {
            FilterKind::None => Ok(Design::Identity),
            FilterKind::Highpass => {
                let low = self.require_low()?;
                below_nyquist("lowFreq", low, nyquist)?;
                let rc = rc_constant(low);
                Ok(Design::Highpass {
                    alpha: rc / (rc + dt),
                })
            }
            FilterKind::Lowpass => {
                let high = self.require_high()?;
                below_nyquist("highFreq", high, nyquist)?;
                let rc = rc_constant(high);
                Ok(Design::Lowpass {
                    alpha: dt / (rc + dt),
                })
            }
            FilterKind::Bandpass => {
                let low = self.require_low()?;
                let high = self.require_high()?;
                if low >= high {
                    return Err(FilterError::EmptyPassband { low, high });
                }
                below_nyquist("lowFreq", low, nyquist)?;
                if high > nyquist {
                    return Err(FilterError::AboveNyquist {
                        field: "highFreq",
                        value: high,
                        nyquist,
                    });
                }
                Ok(Design::Bandpass(Resonator::new(low, high, nyquist)))
            }
        }
    }

    fn require_low(&self) -> Result<f64, FilterError> {
        let value = self.low_freq.ok_or(FilterError::MissingFrequency {
            kind: self.kind,
            field: "lowFreq",
        })?;
        positive_frequency("lowFreq", value)
    }

    fn require_high(&self) -> Result<f64, FilterError> {
        let value = self.high_freq.ok_or(FilterError::MissingFrequency {
            kind: self.kind,
            field: "highFreq",
        })?;
        positive_frequency("highFreq", value)
    }
}

fn positive_frequency(field: &'static str, value: f64) -> Result<f64, FilterError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(FilterError::InvalidFrequency { field, value })
    }
}

fn below_nyquist(field: &'static str, value: f64, nyquist: f64) -> Result<(), FilterError> {
    if value >= nyquist {
        return Err(FilterError::AboveNyquist {
            field,
            value,
            nyquist,
        });
    }
    Ok(())
}

/// RC time constant for a first-order corner frequency.
fn rc_constant(corner_hz: f64) -> f64 {
    1.0 / (2.0 * PI * corner_hz)
}

/// Coefficients resolved from a spec and sample rate.
#[derive(Clone, Copy, Debug)]
enum Design {
    Identity,
    Highpass { alpha: f64 },
    Lowpass { alpha: f64 },
    Bandpass(Resonator),
}

impl Design {
    fn run(&self, data: &[f64]) -> Vec<f64> {
        match self {
            Design::Identity => data.to_vec(),
            Design::Highpass { alpha } => rc_highpass(data, *alpha),
            Design::Lowpass { alpha } => rc_lowpass(data, *alpha),
            Design::Bandpass(resonator) => resonator.process(data),
        }
    }
}

fn rc_highpass(data: &[f64], alpha: f64) -> Vec<f64> {
    let mut filtered = Vec::with_capacity(data.len());
    let Some(&first) = data.first() else {
        return filtered;
    };

    let mut prev = first;
    filtered.push(prev);
    for pair in data.windows(2) {
        prev = alpha * (prev + pair[1] - pair[0]);
        filtered.push(prev);
    }
    filtered
}

fn rc_lowpass(data: &[f64], alpha: f64) -> Vec<f64> {
    let mut filtered = Vec::with_capacity(data.len());
    let Some(&first) = data.first() else {
        return filtered;
    };

    let mut prev = first;
    filtered.push(prev);
    for &x in &data[1..] {
        prev += alpha * (x - prev);
        filtered.push(prev);
    }
    filtered
}

/// Two-pole resonator tuned to the centre of a passband.
#[derive(Clone, Copy, Debug)]
struct Resonator {
    /// Pole radius, clamped to at least [`MIN_POLE_RADIUS`].
    r: f64,
    cos_freq: f64,
    gain: f64,
}

impl Resonator {
    fn new(low_hz: f64, high_hz: f64, nyquist: f64) -> Self {
        let low_norm = low_hz / nyquist;
        let high_norm = high_hz / nyquist;
        let bw = high_norm - low_norm;
        let center_norm = (low_norm + high_norm) / 2.0;

        let r = (1.0 - 3.0 * bw).max(MIN_POLE_RADIUS);
        let cos_freq = (2.0 * PI * center_norm).cos();
        let gain = (1.0 - r * cos_freq) / (1.0 - r);

        Self { r, cos_freq, gain }
    }

    fn process(&self, data: &[f64]) -> Vec<f64> {
        let (r, cos_freq, k) = (self.r, self.cos_freq, self.gain);
        let mut filtered = Vec::with_capacity(data.len());
        let mut x1 = 0.0;
        let mut x2 = 0.0;
        let mut y1 = 0.0;
        let mut y2 = 0.0;

        for &x0 in data {
            let y0 = k * (x0 - x2) + 2.0 * r * cos_freq * y1 - r * r * y2;
            filtered.push(y0);

            x2 = x1;
            x1 = x0;
            y2 = y1;
            y1 = y0;
        }

        filtered
    }
}

/// Apply `spec` to a waveform sampled at `sample_rate` Hz.
///
/// Output has the same length as the input. `FilterKind::None` returns an
/// unchanged copy without looking at the sample rate.
pub fn apply_filter(
    data: &[f64],
    spec: &FilterSpec,
    sample_rate: f64,
) -> Result<Vec<f64>, FilterError> {
    let design = spec.design(sample_rate)?;
    log::debug!(
        "Applying {} filter to {} samples at {} Hz",
        spec.kind,
        data.len(),
        sample_rate
    );
    Ok(design.run(data))
}

/// Rescale a trace so its largest absolute value is 1.
///
/// An all-zero (or empty) trace is returned unchanged.
pub fn normalize(data: &[f64]) -> Vec<f64> {
    let max = data.iter().fold(0.0_f64, |max, v| max.max(v.abs()));
    if max == 0.0 {
        return data.to_vec();
    }
    data.iter().map(|v| v / max).collect()
}

/// Filter then normalize, ready for drawing.
pub fn filter_and_normalize(
    data: &[f64],
    spec: &FilterSpec,
    sample_rate: f64,
) -> Result<Vec<f64>, FilterError> {
    apply_filter(data, spec, sample_rate).map(|filtered| normalize(&filtered))
}

/// A named filter configuration selectable from the picking toolbar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterPreset {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub spec: FilterSpec,
}

impl FilterPreset {
    pub fn new(id: impl Into<String>, name: impl Into<String>, spec: FilterSpec) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            spec,
        }
    }

    /// Look up a built-in preset by id.
    pub fn builtin(id: &str) -> Option<FilterPreset> {
        default_presets().into_iter().find(|p| p.id == id)
    }
}

/// Built-in presets, in toolbar order.
pub fn default_presets() -> Vec<FilterPreset> {
    vec![
        FilterPreset::new("none", "No Filter", FilterSpec::none()),
        FilterPreset::new("hp-1", "Highpass 1Hz", FilterSpec::highpass(1.0)),
        FilterPreset::new("hp-2", "Highpass 2Hz", FilterSpec::highpass(2.0)),
        FilterPreset::new("bp-1-10", "Bandpass 1-10Hz", FilterSpec::bandpass(1.0, 10.0)),
        FilterPreset::new("bp-2-8", "Bandpass 2-8Hz", FilterSpec::bandpass(2.0, 8.0)),
    ]
}

/// Centre/bandwidth control used by the live station view.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandSettings {
    /// Centre frequency in Hz.
    pub center_freq: f64,
    /// Half-width of the band in Hz.
    pub bandwidth: f64,
    pub enabled: bool,
}

impl Default for BandSettings {
    fn default() -> Self {
        Self {
            center_freq: 5.0,
            bandwidth: 4.0,
            enabled: false,
        }
    }
}

impl BandSettings {
    /// Resolve to a bandpass spec, clamping the band to (0.1 Hz, Nyquist].
    pub fn to_spec(&self, sample_rate: f64) -> FilterSpec {
        if !self.enabled {
            return FilterSpec::none();
        }
        let low = (self.center_freq - self.bandwidth).max(MIN_BAND_LOW_HZ);
        let high = (self.center_freq + self.bandwidth).min(sample_rate / 2.0);
        FilterSpec::bandpass(low, high)
    }

    /// Apply these settings to a trace.
    pub fn apply(&self, data: &[f64], sample_rate: f64) -> Result<Vec<f64>, FilterError> {
        apply_filter(data, &self.to_spec(sample_rate), sample_rate)
    }
}
