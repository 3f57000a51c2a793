//! Peak detection and snapping against the public API.
//!
//! Run with: cargo test --test picking

use picker::{find_local_peaks, snap_to_nearest_peak, SnapOptions, SnapResult};

/// Small deterministic generator for sweeping many series.
struct Lcg(u64);

impl Lcg {
    fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }

    fn series(&mut self, len: usize) -> Vec<f64> {
        (0..len).map(|_| self.next_f64()).collect()
    }
}

fn sample_series() -> Vec<Vec<f64>> {
    let mut rng = Lcg(7);
    let mut all: Vec<Vec<f64>> = (3..60).map(|len| rng.series(len)).collect();
    // Quantized values produce plateaus and equal-height peaks
    all.extend((3..40).map(|len| {
        rng.series(len)
            .into_iter()
            .map(|v| (v * 4.0).floor() / 4.0)
            .collect()
    }));
    all
}

#[test]
fn test_scenario_a_regression() {
    let data = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.9, 0.0];
    let peaks = find_local_peaks(&data, 0.5);

    let indices: Vec<usize> = peaks.iter().map(|p| p.index).collect();
    assert_eq!(indices, vec![2, 5, 7]);

    assert!((peaks[0].prominence - 1.0).abs() < 1e-9);
    assert!((peaks[1].prominence - 1.0).abs() < 1e-9);
    // Left scan from index 7 stops at the 1.0 at index 5
    assert!((peaks[2].prominence - 0.9).abs() < 1e-9);

    assert!((peaks[0].position - 25.0).abs() < 1e-9);
    assert!((peaks[1].position - 62.5).abs() < 1e-9);
    assert!((peaks[2].position - 87.5).abs() < 1e-9);
}

#[test]
fn test_peak_at_exact_threshold_is_kept() {
    let data = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.9, 0.0];
    let indices = |threshold: f64| -> Vec<usize> {
        find_local_peaks(&data, threshold)
            .iter()
            .map(|p| p.index)
            .collect()
    };

    assert_eq!(indices(0.9), vec![2, 5, 7]);
    assert_eq!(indices(0.9 + 1e-9), vec![2, 5]);
    assert_eq!(indices(1.0), vec![2, 5]);
}

#[test]
fn test_scenario_b_snaps_to_close_peak() {
    // 101 samples so index == position
    let mut data = vec![0.0; 101];
    data[52] = 1.0;

    let result = snap_to_nearest_peak(50.0, &data, 0.5, 10.0);
    assert!(result.snapped);
    assert!((result.position - 52.0).abs() < 1e-9);
}

#[test]
fn test_scenario_c_keeps_click_when_peak_is_far() {
    let mut data = vec![0.0; 101];
    data[65] = 1.0;

    let result = snap_to_nearest_peak(50.0, &data, 0.5, 10.0);
    assert_eq!(result, SnapResult::unsnapped(50.0));
}

#[test]
fn test_boundaries_never_reported() {
    for data in sample_series() {
        for peak in find_local_peaks(&data, 0.0) {
            assert!(peak.index > 0 && peak.index < data.len() - 1);
        }
    }
}

#[test]
fn test_threshold_is_monotonic() {
    let thresholds = [0.0, 0.1, 0.25, 0.5, 0.75];
    for data in sample_series() {
        for pair in thresholds.windows(2) {
            let loose = find_local_peaks(&data, pair[0]);
            let strict = find_local_peaks(&data, pair[1]);
            for peak in &strict {
                assert!(loose.contains(peak), "{:?} missing at {}", peak, pair[0]);
            }
        }
    }
}

#[test]
fn test_short_series_have_no_peaks() {
    for data in [vec![], vec![0.7], vec![0.1, 0.9]] {
        for threshold in [-1.0, 0.0, 0.5, 10.0] {
            assert!(find_local_peaks(&data, threshold).is_empty());
        }
    }
}

#[test]
fn test_snap_is_idempotent_at_peak() {
    for data in sample_series() {
        for peak in find_local_peaks(&data, 0.1) {
            let result = snap_to_nearest_peak(peak.position, &data, 0.1, 0.0);
            assert!(result.snapped);
            assert_eq!(result.position, peak.position);
            assert_eq!(result.peak, Some(peak));
        }
    }
}

#[test]
fn test_snap_distance_is_bounded() {
    let mut rng = Lcg(11);
    for data in sample_series() {
        for _ in 0..5 {
            let click = rng.next_f64() * 100.0;
            let max = rng.next_f64() * 20.0;
            let result = snap_to_nearest_peak(click, &data, 0.1, max);
            if result.snapped {
                assert!((result.position - click).abs() <= max);
            } else {
                assert_eq!(result.position, click);
            }
        }
    }
}

#[test]
fn test_session_resolves_clicks_in_order() {
    let mut data = vec![0.0; 101];
    data[20] = 0.9;
    data[70] = 0.8;

    let options = SnapOptions::default();
    let results = options.resolve_all(&[18.0, 45.0, 75.5], &data);

    assert_eq!(results.len(), 3);
    assert!((results[0].position - 20.0).abs() < 1e-9);
    assert_eq!(results[1], SnapResult::unsnapped(45.0));
    assert!((results[2].position - 70.0).abs() < 1e-9);
}
