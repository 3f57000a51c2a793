//! Snapping click positions to probability peaks.
//!
//! When a pick is placed on a waveform, the click position is moved onto the
//! nearest prominent peak of the phase probability rail, provided one lies
//! within the snap distance. Otherwise the click is kept as-is.

use serde::{Deserialize, Serialize};

use crate::peaks::{find_local_peaks, Peak};

/// Default maximum snap distance, in track percent.
pub const DEFAULT_MAX_SNAP_DISTANCE: f64 = 10.0;

/// Default minimum peak prominence for snapping.
pub const DEFAULT_SNAP_THRESHOLD: f64 = 0.5;

/// Outcome of a snap query.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapResult {
    /// Final pick position in [0, 100].
    pub position: f64,
    /// Whether the position was moved onto a peak.
    pub snapped: bool,
    /// The peak snapped to, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub peak: Option<Peak>,
}

impl SnapResult {
    /// A result that leaves the click where it was.
    pub fn unsnapped(position: f64) -> Self {
        Self {
            position,
            snapped: false,
            peak: None,
        }
    }

    /// A result snapped onto `peak`.
    pub fn snapped_to(peak: Peak) -> Self {
        Self {
            position: peak.position,
            snapped: true,
            peak: Some(peak),
        }
    }
}

/// Snap `click_position` to the nearest peak of `data` within
/// `max_snap_distance`.
///
/// Peaks are detected with [`find_local_peaks`] using `threshold` as the
/// minimum prominence. On equal distances the leftmost peak wins.
pub fn snap_to_nearest_peak(
    click_position: f64,
    data: &[f64],
    threshold: f64,
    max_snap_distance: f64,
) -> SnapResult {
    let peaks = find_local_peaks(data, threshold);

    match nearest_peak(&peaks, click_position, max_snap_distance) {
        Some(peak) => SnapResult::snapped_to(*peak),
        None => SnapResult::unsnapped(click_position),
    }
}

/// Find the nearest peak to `click_position` within `max_snap_distance`.
///
/// Works on a precomputed peak set so one detection can serve many clicks.
/// A candidate only replaces the current best if it is strictly closer.
pub fn nearest_peak(peaks: &[Peak], click_position: f64, max_snap_distance: f64) -> Option<&Peak> {
    let mut nearest: Option<&Peak> = None;
    let mut min_distance = f64::INFINITY;

    for peak in peaks {
        let distance = (peak.position - click_position).abs();
        if distance < min_distance && distance <= max_snap_distance {
            min_distance = distance;
            nearest = Some(peak);
        }
    }

    nearest
}

fn default_enabled() -> bool {
    true
}

fn default_threshold() -> f64 {
    DEFAULT_SNAP_THRESHOLD
}

fn default_max_snap_distance() -> f64 {
    DEFAULT_MAX_SNAP_DISTANCE
}

/// Snap-mode settings for a picking session.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapOptions {
    /// Snap mode toggle. When off, clicks are never moved.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Minimum peak prominence.
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Maximum distance between click and peak, in track percent.
    #[serde(default = "default_max_snap_distance")]
    pub max_snap_distance: f64,
}

impl Default for SnapOptions {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            threshold: default_threshold(),
            max_snap_distance: default_max_snap_distance(),
        }
    }
}

impl SnapOptions {
    /// Resolve a click against a probability rail.
    pub fn resolve(&self, click_position: f64, data: &[f64]) -> SnapResult {
        if !self.enabled {
            return SnapResult::unsnapped(click_position);
        }
        snap_to_nearest_peak(click_position, data, self.threshold, self.max_snap_distance)
    }

    /// Resolve many clicks against the same rail with a single detection pass.
    pub fn resolve_all(&self, click_positions: &[f64], data: &[f64]) -> Vec<SnapResult> {
        if !self.enabled {
            return click_positions
                .iter()
                .map(|&c| SnapResult::unsnapped(c))
                .collect();
        }

        let peaks = find_local_peaks(data, self.threshold);
        log::debug!(
            "Resolving {} clicks against {} peaks (threshold {})",
            click_positions.len(),
            peaks.len(),
            self.threshold
        );

        click_positions
            .iter()
            .map(|&click| match nearest_peak(&peaks, click, self.max_snap_distance) {
                Some(peak) => SnapResult::snapped_to(*peak),
                None => SnapResult::unsnapped(click),
            })
            .collect()
    }

    /// Validate the options.
    pub fn validate(&self) -> Result<(), String> {
        if !self.threshold.is_finite() {
            return Err("Snap threshold must be finite".to_string());
        }
        if self.max_snap_distance.is_nan() || self.max_snap_distance < 0.0 {
            return Err("Max snap distance must be non-negative".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::index_to_position;

    fn peak_at(position: f64) -> Peak {
        Peak {
            index: 0,
            position,
            value: 1.0,
            prominence: 1.0,
        }
    }

    /// 101-sample rail with a triangular peak at `center`, so index == position.
    fn rail_with_peak(center: usize) -> Vec<f64> {
        (0..101)
            .map(|i| {
                let dist = (i as f64 - center as f64).abs();
                (1.0 - dist * 0.1).max(0.0)
            })
            .collect()
    }

    #[test]
    fn test_snap_within_distance() {
        let data = rail_with_peak(52);
        let result = snap_to_nearest_peak(50.0, &data, 0.5, 10.0);

        assert!(result.snapped);
        assert!((result.position - 52.0).abs() < 1e-9);
        assert_eq!(result.peak.unwrap().index, 52);
    }

    #[test]
    fn test_no_snap_beyond_distance() {
        let data = rail_with_peak(65);
        let result = snap_to_nearest_peak(50.0, &data, 0.5, 10.0);

        assert!(!result.snapped);
        assert_eq!(result.position, 50.0);
        assert!(result.peak.is_none());
    }

    #[test]
    fn test_no_peaks() {
        let data = vec![0.0; 50];
        let result = snap_to_nearest_peak(30.0, &data, 0.1, DEFAULT_MAX_SNAP_DISTANCE);
        assert_eq!(result, SnapResult::unsnapped(30.0));
    }

    #[test]
    fn test_tie_keeps_leftmost() {
        let peaks = vec![peak_at(45.0), peak_at(55.0)];
        let nearest = nearest_peak(&peaks, 50.0, 10.0).unwrap();
        assert_eq!(nearest.position, 45.0);
    }

    #[test]
    fn test_nearest_of_many() {
        let peaks = vec![peak_at(10.0), peak_at(42.0), peak_at(47.0), peak_at(90.0)];
        let nearest = nearest_peak(&peaks, 45.5, 10.0).unwrap();
        assert_eq!(nearest.position, 47.0);
    }

    #[test]
    fn test_exact_hit_with_zero_distance() {
        let data = rail_with_peak(30);
        let target = index_to_position(30, data.len());
        let result = snap_to_nearest_peak(target, &data, 0.5, 0.0);

        assert!(result.snapped);
        assert_eq!(result.position, target);
    }

    #[test]
    fn test_distance_boundary_is_inclusive() {
        let peaks = vec![peak_at(60.0)];
        assert!(nearest_peak(&peaks, 50.0, 10.0).is_some());
        assert!(nearest_peak(&peaks, 50.0, 9.999).is_none());
    }

    #[test]
    fn test_disabled_options_never_snap() {
        let data = rail_with_peak(52);
        let options = SnapOptions {
            enabled: false,
            ..Default::default()
        };

        assert_eq!(options.resolve(50.0, &data), SnapResult::unsnapped(50.0));
        assert!(options
            .resolve_all(&[50.0, 51.0], &data)
            .iter()
            .all(|r| !r.snapped));
    }

    #[test]
    fn test_resolve_all_matches_single_queries() {
        let data = rail_with_peak(52);
        let options = SnapOptions::default();
        let clicks = [10.0, 48.0, 52.0, 61.0, 63.0];

        let batch = options.resolve_all(&clicks, &data);
        for (click, result) in clicks.iter().zip(batch.iter()) {
            assert_eq!(*result, options.resolve(*click, &data));
        }
    }

    #[test]
    fn test_options_defaults_from_json() {
        let options: SnapOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, SnapOptions::default());

        let options: SnapOptions =
            serde_json::from_str(r#"{ "threshold": 0.3, "maxSnapDistance": 5 }"#).unwrap();
        assert!(options.enabled);
        assert_eq!(options.threshold, 0.3);
        assert_eq!(options.max_snap_distance, 5.0);
    }

    #[test]
    fn test_options_validation() {
        assert!(SnapOptions::default().validate().is_ok());

        let bad = SnapOptions {
            max_snap_distance: -1.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let bad = SnapOptions {
            threshold: f64::NAN,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
