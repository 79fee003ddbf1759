//! Feature engineering for the sequence and gradient-boosted models
//!
//! Lag, rolling-window and calendar features computed per weekly series,
//! NaN-padded at the start where the window has not filled yet.

use std::collections::{BTreeMap, HashMap};

use crate::models::tft::TftConfig;

/// Default lag offsets (weeks) for the sequence model
pub const DEFAULT_LAGS: &[usize] = &[1, 2, 4, 8, 13, 26, 52];

/// Default rolling-window sizes (weeks)
pub const DEFAULT_WINDOWS: &[usize] = &[4, 13];

/// Compute lag features for a single series, keyed `lag_<n>w`
pub fn compute_lag_features(series: &[f64], lags: &[usize]) -> BTreeMap<String, Vec<f64>> {
    let n = series.len();
    let mut features = BTreeMap::new();

    for &lag in lags {
        let mut lagged = vec![f64::NAN; n];
        if lag < n {
            lagged[lag..].copy_from_slice(&series[..n - lag]);
        }
        features.insert(format!("lag_{lag}w"), lagged);
    }

    features
}

/// Compute rolling mean and std features, keyed `rolling_{mean,std}_<n>w`
pub fn compute_rolling_features(series: &[f64], windows: &[usize]) -> BTreeMap<String, Vec<f64>> {
    let n = series.len();
    let mut features = BTreeMap::new();

    for &w in windows {
        let mut mean_arr = vec![f64::NAN; n];
        let mut std_arr = vec![f64::NAN; n];
        for i in (w.saturating_sub(1))..n {
            let window = &series[i + 1 - w..=i];
            mean_arr[i] = crate::utils::mean(window);
            std_arr[i] = crate::utils::std_dev(window);
        }
        features.insert(format!("rolling_mean_{w}w"), mean_arr);
        features.insert(format!("rolling_std_{w}w"), std_arr);
    }

    features
}

/// Calendar features for `n_weeks` starting at week `start_week`:
/// week-of-year, month, quarter.
pub fn compute_temporal_features(n_weeks: usize, start_week: usize) -> BTreeMap<String, Vec<f64>> {
    let mut week_of_year = Vec::with_capacity(n_weeks);
    let mut month = Vec::with_capacity(n_weeks);
    let mut quarter = Vec::with_capacity(n_weeks);

    for i in 0..n_weeks {
        let week = (start_week + i) as f64;
        let woy = (week - 1.0).rem_euclid(52.0) + 1.0;
        let m = (woy / 4.33).ceil().clamp(1.0, 12.0);
        week_of_year.push(woy);
        month.push(m);
        quarter.push((m / 3.0).ceil());
    }

    let mut features = BTreeMap::new();
    features.insert("week_of_year".to_string(), week_of_year);
    features.insert("month".to_string(), month);
    features.insert("quarter".to_string(), quarter);
    features
}

/// Prepared dataset for sequence-model training/inference.
///
/// Series are concatenated across products with a group id per product.
#[derive(Debug, Default)]
pub struct TftDataset {
    pub produto_ids: Vec<String>,
    pub time_idx: Vec<i64>,
    pub targets: Vec<f64>,
    pub group_ids: Vec<i64>,
    /// Features known in advance (calendar)
    pub time_varying_known: BTreeMap<String, Vec<f64>>,
    /// Features only observed historically (lags, rolling stats)
    pub time_varying_unknown: BTreeMap<String, Vec<f64>>,
}

/// Assemble a [`TftDataset`] from raw series, filtering products with
/// fewer than `input_length + forecast_horizon` observations.
pub fn prepare_dataset(
    series_by_product: &HashMap<String, Vec<f64>>,
    config: &TftConfig,
) -> TftDataset {
    let mut dataset = TftDataset::default();
    let min_length = config.input_length + config.forecast_horizon;

    let mut pids: Vec<&String> = series_by_product.keys().collect();
    pids.sort();

    let mut group_id: i64 = 0;
    for pid in pids {
        let series = &series_by_product[pid];
        if series.len() < min_length {
            continue;
        }

        let n = series.len();
        dataset.produto_ids.push(pid.clone());
        dataset.time_idx.extend(0..n as i64);
        dataset.targets.extend_from_slice(series);
        dataset.group_ids.extend(std::iter::repeat(group_id).take(n));

        for (k, v) in compute_lag_features(series, DEFAULT_LAGS) {
            dataset.time_varying_unknown.entry(k).or_default().extend(v);
        }
        for (k, v) in compute_rolling_features(series, DEFAULT_WINDOWS) {
            dataset.time_varying_unknown.entry(k).or_default().extend(v);
        }
        for (k, v) in compute_temporal_features(n, 1) {
            dataset.time_varying_known.entry(k).or_default().extend(v);
        }

        group_id += 1;
    }

    dataset
}
