/// Fractional return `(close - prior) / prior`.
///
/// Undefined (`None`) when the prior close is zero or either side is not finite.
pub fn simple_return(prior_close: f64, close: f64) -> Option<f64> {
    if prior_close == 0.0 || !prior_close.is_finite() || !close.is_finite() {
        return None;
    }
    Some((close - prior_close) / prior_close)
}

/// Day-over-day percent returns, skipping undefined pairs
pub fn percent_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .filter_map(|w| simple_return(w[0], w[1]))
        .map(|r| r * 100.0)
        .collect()
}

/// Sample standard deviation (n - 1) of the last `window` daily percent returns
///
/// Returns None with fewer than two returns available
pub fn realized_volatility(closes: &[f64], window: usize) -> Option<f64> {
    let returns = percent_returns(closes);
    let start = returns.len().saturating_sub(window);
    let recent = &returns[start..];

    if recent.len() < 2 {
        return None;
    }

    let n = recent.len() as f64;
    let mean = recent.iter().sum::<f64>() / n;
    let variance = recent.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_return() {
        assert!((simple_return(100.0, 102.0).unwrap() - 0.02).abs() < 1e-12);
        assert_eq!(simple_return(0.0, 102.0), None);
        assert_eq!(simple_return(f64::NAN, 102.0), None);
    }

    #[test]
    fn test_percent_returns() {
        let returns = percent_returns(&[100.0, 110.0, 99.0]);
        assert_eq!(returns.len(), 2);
        assert!((returns[0] - 10.0).abs() < 1e-9);
        assert!((returns[1] + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_volatility_of_constant_moves_is_zero() {
        // +1% every day
        let closes: Vec<f64> = (0..10).map(|i| 100.0 * 1.01_f64.powi(i)).collect();
        let vol = realized_volatility(&closes, 20).unwrap();
        assert!(vol.abs() < 1e-9);
    }

    #[test]
    fn test_volatility_sample_stdev() {
        // Returns +1%, -1% alternate: mean 0, sample stdev = sqrt(4 / 3)
        let closes = vec![100.0, 101.0, 99.99, 100.9899, 99.980001];
        let vol = realized_volatility(&closes, 4).unwrap();
        assert!((vol - (4.0_f64 / 3.0).sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_volatility_needs_two_returns() {
        assert!(realized_volatility(&[100.0, 101.0], 20).is_none());
        assert!(realized_volatility(&[], 20).is_none());
    }
}
