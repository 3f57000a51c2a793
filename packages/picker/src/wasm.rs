use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::filter::{self, default_presets, FilterSpec};
use crate::peaks;
use crate::snap::{self, SnapOptions};

#[wasm_bindgen]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        log::error!("Failed to serialize result: {}", e);
        "null".to_string()
    })
}

/// Detect peaks in a probability rail.
/// Returns a JSON array of { index, position, value, prominence } objects.
#[wasm_bindgen]
pub fn find_local_peaks(data: &[f64], threshold: f64) -> String {
    to_json(&peaks::find_local_peaks(data, threshold))
}

/// Snap a click to the nearest peak.
/// Returns a JSON { position, snapped, peak? } object.
#[wasm_bindgen]
pub fn snap_to_nearest_peak(
    click_position: f64,
    data: &[f64],
    threshold: f64,
    max_snap_distance: f64,
) -> String {
    to_json(&snap::snap_to_nearest_peak(
        click_position,
        data,
        threshold,
        max_snap_distance,
    ))
}

/// Resolve many clicks with snap options given as JSON (missing fields use
/// defaults). Returns a JSON array of snap results, or an empty array if the
/// options could not be parsed.
#[wasm_bindgen]
pub fn resolve_clicks(options_json: &str, clicks: &[f64], data: &[f64]) -> String {
    match serde_json::from_str::<SnapOptions>(options_json) {
        Ok(options) => to_json(&options.resolve_all(clicks, data)),
        Err(e) => {
            log::error!("Failed to parse snap options: {}", e);
            "[]".to_string()
        }
    }
}

fn parse_spec(spec_json: &str) -> Result<FilterSpec, JsValue> {
    serde_json::from_str(spec_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid filter spec: {}", e)))
}

/// Apply a filter given as JSON ({ type, lowFreq?, highFreq? }).
#[wasm_bindgen]
pub fn apply_filter(data: &[f64], spec_json: &str, sample_rate: f64) -> Result<Vec<f64>, JsValue> {
    let spec = parse_spec(spec_json)?;
    filter::apply_filter(data, &spec, sample_rate).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Filter then normalize to [-1, 1].
#[wasm_bindgen]
pub fn filter_and_normalize(
    data: &[f64],
    spec_json: &str,
    sample_rate: f64,
) -> Result<Vec<f64>, JsValue> {
    let spec = parse_spec(spec_json)?;
    filter::filter_and_normalize(data, &spec, sample_rate)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn normalize(data: &[f64]) -> Vec<f64> {
    filter::normalize(data)
}

/// Built-in filter presets as a JSON array.
#[wasm_bindgen]
pub fn default_presets_json() -> String {
    to_json(&default_presets())
}
