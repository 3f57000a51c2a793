//! Numeric core of the phase-picking view.
//!
//! Probability rails are scanned for prominent peaks so that a click on a
//! waveform can snap to the nearest one, and raw waveform traces pass through
//! a small bank of IIR filters before being normalized for display.

pub mod position;
pub mod track;

// Picking modules
pub mod peaks;
pub mod snap;

// Waveform filtering
pub mod filter;

#[cfg(not(target_arch = "wasm32"))]
pub mod job;

#[cfg(not(target_arch = "wasm32"))]
pub mod cli;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use filter::{apply_filter, normalize, FilterError, FilterKind, FilterSpec};
pub use peaks::{find_local_peaks, Peak};
pub use snap::{snap_to_nearest_peak, SnapOptions, SnapResult, DEFAULT_MAX_SNAP_DISTANCE};
