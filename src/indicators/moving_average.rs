/// Trailing simple moving average ending at `at_index`.
///
/// Early points use whatever history exists: for `at_index < window - 1`
/// the mean runs over `values[0..=at_index]`, so every point gets a value.
pub fn trailing_sma(values: &[f64], window: usize, at_index: usize) -> Option<f64> {
    if window == 0 || at_index >= values.len() {
        return None;
    }

    let start = (at_index + 1).saturating_sub(window);
    let slice = &values[start..=at_index];
    Some(slice.iter().sum::<f64>() / slice.len() as f64)
}

/// Partial-window SMA for every point of `values`
pub fn sma_series(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .filter_map(|i| trailing_sma(values, window, i))
        .collect()
}

/// Mean of the last `period` values (fewer if that is all there is)
pub fn trailing_mean(values: &[f64], period: usize) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    trailing_sma(values, period, values.len() - 1)
}
