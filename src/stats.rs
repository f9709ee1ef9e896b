//! Descriptive statistics over numeric samples
//!
//! All functions are pure and order-independent. Empty input never panics:
//! it yields `f64::NAN`, which the report writers render as a placeholder.

/// Arithmetic mean, `NaN` for an empty slice (0/0)
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n, not n-1)
///
/// Two passes: one for the mean, one for the squared deviations.
pub fn standard_deviation(values: &[f64]) -> f64 {
    let mu = mean(values);
    let variance = values.iter().map(|v| (v - mu) * (v - mu)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Smallest value, `NaN` for an empty slice
pub fn min(values: &[f64]) -> f64 {
    values.iter().copied().reduce(f64::min).unwrap_or(f64::NAN)
}

/// Largest value, `NaN` for an empty slice
pub fn max(values: &[f64]) -> f64 {
    values.iter().copied().reduce(f64::max).unwrap_or(f64::NAN)
}

/// Mean and standard deviation of one population
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub mean: f64,
    pub stddev: f64,
}

impl Summary {
    pub fn of(values: &[f64]) -> Self {
        Self {
            mean: mean(values),
            stddev: standard_deviation(values),
        }
    }

    /// Both fields are defined (population was non-empty)
    pub fn is_defined(&self) -> bool {
        !self.mean.is_nan() && !self.stddev.is_nan()
    }
}

/// Mean, standard deviation and range of one population
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtendedStats {
    pub mean: f64,
    pub stddev: f64,
    pub min: f64,
    pub max: f64,
}

impl ExtendedStats {
    pub fn of(values: &[f64]) -> Self {
        Self {
            mean: mean(values),
            stddev: standard_deviation(values),
            min: min(values),
            max: max(values),
        }
    }

    pub fn summary(&self) -> Summary {
        Summary {
            mean: self.mean,
            stddev: self.stddev,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_basic() {
        assert_eq!(mean(&[1.0, 2.0, 3.0, 4.0]), 2.5);
    }

    #[test]
    fn test_population_stddev() {
        // mean=5, squared deviations 9+1+1+9 = 20, 20/4 = 5
        let sd = standard_deviation(&[2.0, 4.0, 6.0, 8.0]);
        assert!((sd - 5.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_stddev_constant_is_zero() {
        assert_eq!(standard_deviation(&[3.5, 3.5, 3.5]), 0.0);
    }

    #[test]
    fn test_single_value() {
        assert_eq!(mean(&[7.0]), 7.0);
        assert_eq!(standard_deviation(&[7.0]), 0.0);
        assert_eq!(min(&[7.0]), 7.0);
        assert_eq!(max(&[7.0]), 7.0);
    }

    #[test]
    fn test_empty_input_is_nan() {
        let empty: [f64; 0] = [];
        assert!(mean(&empty).is_nan());
        assert!(standard_deviation(&empty).is_nan());
        assert!(min(&empty).is_nan());
        assert!(max(&empty).is_nan());
    }

    #[test]
    fn test_min_max_order_independent() {
        let a = [3.0, -1.0, 9.5, 0.0];
        let b = [9.5, 0.0, 3.0, -1.0];
        assert_eq!(min(&a), -1.0);
        assert_eq!(max(&a), 9.5);
        assert_eq!(min(&a), min(&b));
        assert_eq!(max(&a), max(&b));
    }

    #[test]
    fn test_summary_defined_flag() {
        assert!(Summary::of(&[1.0, 2.0]).is_defined());
        assert!(!Summary::of(&[]).is_defined());
    }

    #[test]
    fn test_extended_stats() {
        let stats = ExtendedStats::of(&[1.0, 2.0, 3.0]);
        assert_eq!(stats.mean, 2.0);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 3.0);
        assert!((stats.stddev - (2.0_f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(stats.summary().mean, 2.0);
    }
}
