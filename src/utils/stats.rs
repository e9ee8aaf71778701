use serde::{
    Deserialize,
    Serialize,
};

/// Sum-and-count accumulator for an arithmetic mean.
///
/// Values are only counted when they are actually observed, so a missing
/// observation never drags the mean towards zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningMean {
    sum:   f64,
    count: u32,
}

impl RunningMean {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an observation. NaN is treated as missing.
    pub fn push(
        &mut self,
        value: f64,
    ) {
        if value.is_nan() {
            return;
        }
        self.sum += value;
        self.count += 1;
    }

    pub fn merge(
        &mut self,
        other: &RunningMean,
    ) {
        self.sum += other.sum;
        self.count += other.count;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// `None` when nothing was observed.
    pub fn mean(&self) -> Option<f64> {
        if self.count > 0 {
            Some(self.sum / self.count as f64)
        }
        else {
            None
        }
    }
}

/// Welford accumulator for mean and sample variance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    count: u32,
    mean:  f64,
    m2:    f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an observation. NaN is treated as missing.
    pub fn push(
        &mut self,
        value: f64,
    ) {
        if value.is_nan() {
            return;
        }
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// Sample variance (n - 1 denominator). Undefined, hence `None`, for
    /// fewer than two observations.
    pub fn sample_variance(&self) -> Option<f64> {
        if self.count < 2 {
            return None;
        }
        Some(self.m2 / (self.count - 1) as f64)
    }

    pub fn sample_std(&self) -> Option<f64> {
        self.sample_variance().map(f64::sqrt)
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;
    use statrs::statistics::Statistics;

    use super::*;

    #[test]
    fn running_mean_ignores_missing() {
        let mut acc = RunningMean::new();
        assert_eq!(acc.mean(), None);
        acc.push(1.0);
        acc.push(f64::NAN);
        acc.push(3.0);
        assert_eq!(acc.count(), 2);
        assert_approx_eq!(acc.mean().unwrap(), 2.0);

        let mut other = RunningMean::new();
        other.push(5.0);
        acc.merge(&other);
        assert_approx_eq!(acc.mean().unwrap(), 3.0);
    }

    #[test]
    fn welford_matches_two_pass() {
        let values = [0.31, -1.2, 2.5, 0.04, 0.77];
        let mut acc = RunningStats::new();
        values.iter().for_each(|v| acc.push(*v));

        assert_approx_eq!(acc.mean().unwrap(), values.iter().mean(), 1e-12);
        assert_approx_eq!(acc.sample_std().unwrap(), values.iter().std_dev(), 1e-12);
    }

    #[test]
    fn single_observation_has_no_std() {
        let mut acc = RunningStats::new();
        acc.push(0.7);
        assert_eq!(acc.mean(), Some(0.7));
        assert_eq!(acc.sample_std(), None);
    }
}
