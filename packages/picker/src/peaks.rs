//! Prominence-based peak detection over probability rails.
//!
//! A probability rail is a series of per-sample phase probabilities in
//! [0, 1]. Peaks are strict interior local maxima; each one is scored by its
//! prominence, the height above the higher of its two surrounding valleys.
//!
//! # Pipeline
//!
//! 1. **Find Candidates**: strict local maxima (`v[i-1] < v[i] > v[i+1]`)
//! 2. **Score**: prominence against the left and right valleys
//! 3. **Filter**: keep candidates with `prominence >= threshold`
//!
//! Plateaus and the two boundary samples are never reported.

use serde::{Deserialize, Serialize};

use crate::position::index_to_position;

/// A detected peak on a probability rail.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Peak {
    /// Sample index of the maximum.
    pub index: usize,
    /// Position along the track in [0, 100].
    pub position: f64,
    /// Series value at the maximum.
    pub value: f64,
    /// Height above the higher neighbouring valley (always >= 0).
    pub prominence: f64,
}

/// Find local peaks whose prominence is at least `threshold`.
///
/// Peaks are returned in ascending index order. Series shorter than three
/// samples have no interior points and yield no peaks.
pub fn find_local_peaks(data: &[f64], threshold: f64) -> Vec<Peak> {
    let mut peaks = Vec::new();

    if data.len() < 3 {
        return peaks;
    }

    for i in 1..data.len() - 1 {
        let value = data[i];
        let prev = data[i - 1];
        let next = data[i + 1];

        // Strict local maximum check
        if value > prev && value > next {
            let prominence = prominence_at(data, i);

            if prominence >= threshold {
                peaks.push(Peak {
                    index: i,
                    position: index_to_position(i, data.len()),
                    value,
                    prominence,
                });
            }
        }
    }

    peaks
}

/// Prominence of the sample at `index`, or `None` if out of bounds.
///
/// This does not require `index` to be a local maximum; a sample with a
/// lower neighbour on both sides scores its height above the higher valley,
/// anything else scores 0.
pub fn prominence(data: &[f64], index: usize) -> Option<f64> {
    if index >= data.len() {
        return None;
    }
    Some(prominence_at(data, index))
}

fn prominence_at(data: &[f64], index: usize) -> f64 {
    let peak = data[index];

    let left_valley = valley(data[..index].iter().rev(), peak);
    let right_valley = valley(data[index + 1..].iter(), peak);

    peak - left_valley.max(right_valley)
}

/// Lowest value seen walking outward until a sample rises above `peak`.
///
/// Starts from `peak` itself, so a side with no samples (or whose first
/// sample is already higher) contributes no suppression.
fn valley<'a>(side: impl Iterator<Item = &'a f64>, peak: f64) -> f64 {
    side.take_while(|&&v| v <= peak).fold(peak, |lowest, &v| lowest.min(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_series() {
        assert!(find_local_peaks(&[], 0.0).is_empty());
        assert!(find_local_peaks(&[1.0], 0.0).is_empty());
        assert!(find_local_peaks(&[0.0, 1.0], 0.0).is_empty());
    }

    #[test]
    fn test_single_triangle() {
        let data = [0.0, 0.5, 1.0, 0.5, 0.0];
        let peaks = find_local_peaks(&data, 0.1);

        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, 2);
        assert!((peaks[0].position - 50.0).abs() < 1e-12);
        assert!((peaks[0].value - 1.0).abs() < 1e-12);
        assert!((peaks[0].prominence - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_plateau_is_not_a_peak() {
        let data = [0.0, 1.0, 1.0, 0.0];
        assert!(find_local_peaks(&data, 0.0).is_empty());
    }

    #[test]
    fn test_boundaries_never_reported() {
        // Highest values at both ends
        let data = [1.0, 0.2, 0.4, 0.2, 1.0];
        let peaks = find_local_peaks(&data, 0.0);

        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, 2);
    }

    #[test]
    fn test_prominence_uses_higher_valley() {
        // Peak at 3 sits between a deep left valley (0.0) and a shallow
        // right valley (0.6) before the higher sample at index 6.
        let data = [0.0, 0.0, 0.5, 0.8, 0.6, 0.7, 0.9, 0.0];
        let p = prominence(&data, 3).unwrap();
        assert!((p - 0.2).abs() < 1e-12, "got {}", p);
    }

    #[test]
    fn test_scan_stops_at_higher_sample() {
        // Left scan from index 3 stops at index 1 (1.0 > 0.5), so the
        // deep 0.0 at index 0 is never reached.
        let data = [0.0, 1.0, 0.3, 0.5, 0.1];
        let p = prominence(&data, 3).unwrap();
        // left valley 0.3, right valley 0.1
        assert!((p - 0.2).abs() < 1e-12, "got {}", p);
    }

    #[test]
    fn test_prominence_one_sided_at_edge() {
        // Left side rises immediately, so the left valley is the peak value
        // itself and the prominence collapses to zero.
        let data = [2.0, 1.0, 0.0];
        assert_eq!(prominence(&data, 1), Some(0.0));
    }

    #[test]
    fn test_equal_height_does_not_stop_scan() {
        // Twin peaks of equal height: scans pass through the twin.
        let data = [0.0, 1.0, 0.2, 1.0, 0.0];
        let peaks = find_local_peaks(&data, 0.0);

        assert_eq!(peaks.len(), 2);
        assert!((peaks[0].prominence - 1.0).abs() < 1e-12);
        assert!((peaks[1].prominence - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_threshold_filters() {
        let data = [0.0, 1.0, 0.8, 0.9, 0.0];
        // Peak at 1: prominence 1.0; peak at 3: prominence 0.1
        let all = find_local_peaks(&data, 0.0);
        assert_eq!(all.len(), 2);

        let strong = find_local_peaks(&data, 0.5);
        assert_eq!(strong.len(), 1);
        assert_eq!(strong[0].index, 1);

        assert!(find_local_peaks(&data, 2.0).is_empty());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        // Prominences 1.0, 1.0 and 0.9
        let data = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.9, 0.0];

        let at: Vec<usize> = find_local_peaks(&data, 0.9).iter().map(|p| p.index).collect();
        assert_eq!(at, vec![2, 5, 7]);

        let above: Vec<usize> = find_local_peaks(&data, 0.9 + 1e-9)
            .iter()
            .map(|p| p.index)
            .collect();
        assert_eq!(above, vec![2, 5]);
    }

    #[test]
    fn test_prominence_out_of_bounds() {
        assert_eq!(prominence(&[0.0, 1.0, 0.0], 3), None);
    }

    #[test]
    fn test_peak_serializes_camel_case() {
        let peak = Peak {
            index: 2,
            position: 25.0,
            value: 0.9,
            prominence: 0.8,
        };
        let json = serde_json::to_value(peak).unwrap();
        assert_eq!(json["index"], 2);
        assert_eq!(json["position"], 25.0);
        assert_eq!(json["prominence"], 0.8);
    }

    #[test]
    fn test_detection_determinism() {
        let data: Vec<f64> = (0..200)
            .map(|i| ((i as f64) * 0.17).sin().abs())
            .collect();

        let first = find_local_peaks(&data, 0.1);
        let second = find_local_peaks(&data, 0.1);
        assert_eq!(first, second);
    }
}
