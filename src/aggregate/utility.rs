/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Range and spread of a set of cell values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ValueStats {
    pub count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: f64,
    /// Population standard deviation.
    pub stddev: f64,
}

impl ValueStats {
    /// Single pass (Welford) over `values`. Empty input gives the default.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut stats = ValueStats::default();
        let mut m2 = 0.0;

        for v in values {
            stats.count += 1;
            stats.min = Some(stats.min.map_or(v, |m| m.min(v)));
            stats.max = Some(stats.max.map_or(v, |m| m.max(v)));
            let delta = v - stats.mean;
            stats.mean += delta / stats.count as f64;
            m2 += delta * (v - stats.mean);
        }

        if stats.count > 0 {
            stats.stddev = (m2 / stats.count as f64).sqrt();
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[10.0, 30.0]), 20.0);
    }

    #[test]
    fn test_value_stats() {
        let stats = ValueStats::from_values([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(stats.count, 8);
        assert_eq!(stats.min, Some(2.0));
        assert_eq!(stats.max, Some(9.0));
        assert!((stats.mean - 5.0).abs() < 1e-12);
        assert!((stats.stddev - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_value_stats_empty() {
        assert_eq!(ValueStats::from_values(std::iter::empty()), ValueStats::default());
    }
}
