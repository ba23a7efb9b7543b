//! Small descriptive-statistics helpers shared by the scorer and aggregator.
//!
//! Thin guards over `statrs`: every helper returns `None` where `statrs`
//! would produce NaN (empty input, too few values, a non-positive mean).

use statrs::statistics::Statistics;

/// Arithmetic mean; `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().copied().mean())
}

/// Population standard deviation. A single value has deviation 0.
pub fn population_std(values: &[f64]) -> Option<f64> {
    match values.len() {
        0 => None,
        1 => Some(0.0),
        _ => Some(values.iter().copied().population_std_dev()),
    }
}

/// Sample (n-1) standard deviation; `None` below two values
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    Some(values.iter().copied().std_dev())
}

/// Population coefficient of variation; `None` when the mean is not positive
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    if m <= 0.0 {
        return None;
    }
    population_std(values).map(|sd| sd / m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), Some(5.0));
        assert!((population_std(&values).unwrap() - 2.0).abs() < 1e-12);
        let sample = sample_std(&values).unwrap();
        assert!((sample - 2.138089935).abs() < 1e-6, "got {}", sample);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(mean(&[]), None);
        assert_eq!(population_std(&[3.0]), Some(0.0));
        assert_eq!(sample_std(&[3.0]), None);
        assert_eq!(coefficient_of_variation(&[0.0, 0.0]), None);
    }

    #[test]
    fn test_cv() {
        let cv = coefficient_of_variation(&[10.0, 10.0, 10.0]).unwrap();
        assert_eq!(cv, 0.0);
        let cv = coefficient_of_variation(&[5.0, 15.0]).unwrap();
        assert!((cv - 0.5).abs() < 1e-12);
    }
}
