//! Mapping between sample indices and track positions.
//!
//! Tracks are addressed by percentage of their width: index 0 sits at 0% and
//! the last sample sits at 100%, with every sample in between spaced evenly.

/// Full width of a track in position units.
pub const TRACK_WIDTH: f64 = 100.0;

/// Convert a sample index to a position in [0, 100].
///
/// A series of fewer than two samples has no extent, so everything maps to 0.
pub fn index_to_position(index: usize, len: usize) -> f64 {
    if len < 2 {
        return 0.0;
    }
    (index as f64 / (len - 1) as f64) * TRACK_WIDTH
}

/// Convert a position in [0, 100] back to the nearest sample index.
///
/// Positions outside the track are clamped to its ends. Returns `None` for an
/// empty series or a non-finite position.
pub fn position_to_index(position: f64, len: usize) -> Option<usize> {
    if len == 0 || !position.is_finite() {
        return None;
    }
    if len == 1 {
        return Some(0);
    }

    let fraction = (position / TRACK_WIDTH).clamp(0.0, 1.0);
    let index = (fraction * (len - 1) as f64).round() as usize;
    Some(index.min(len - 1))
}

/// Convert a position to seconds from the start of a trace.
pub fn position_to_seconds(position: f64, len: usize, sample_rate: f64) -> f64 {
    if len < 2 || sample_rate <= 0.0 {
        return 0.0;
    }
    let duration = (len - 1) as f64 / sample_rate;
    (position / TRACK_WIDTH) * duration
}
