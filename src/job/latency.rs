use anyhow::{bail, Result};
use rand::Rng;
use std::time::Duration;

pub const DEFAULT_LATENCY_MIN: Duration = Duration::from_millis(1_000);
pub const DEFAULT_LATENCY_MAX: Duration = Duration::from_millis(3_000);

/// Simulated external-call latency, drawn uniformly from `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyModel {
    min: Duration,
    max: Duration,
}

impl LatencyModel {
    pub fn new(min: Duration, max: Duration) -> Result<Self> {
        if max < min {
            bail!(
                "latency upper bound ({}ms) must not be below the lower bound ({}ms)",
                max.as_millis(),
                min.as_millis()
            );
        }
        Ok(Self { min, max })
    }

    /// A model that always yields `latency`.
    pub fn fixed(latency: Duration) -> Self {
        Self {
            min: latency,
            max: latency,
        }
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn sample(&self) -> Duration {
        self.sample_with(&mut rand::thread_rng())
    }

    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        rng.gen_range(self.min..self.max)
    }
}

impl Default for LatencyModel {
    fn default() -> Self {
        Self {
            min: DEFAULT_LATENCY_MIN,
            max: DEFAULT_LATENCY_MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_samples_stay_in_bounds() {
        let model = LatencyModel::default();
        for _ in 0..1_000 {
            let latency = model.sample();
            assert!(latency >= DEFAULT_LATENCY_MIN);
            assert!(latency < DEFAULT_LATENCY_MAX);
        }
    }

    #[test]
    fn fixed_model_is_constant() {
        let model = LatencyModel::fixed(Duration::from_millis(250));
        assert_eq!(model.sample(), Duration::from_millis(250));
        assert_eq!(model.min(), model.max());
    }

    #[test]
    fn bounds_beyond_u64_nanos_sample_in_range() {
        let min = Duration::from_millis(1_000);
        let max = Duration::from_millis(18_446_744_073_710);
        let model = LatencyModel::new(min, max).expect("ordered bounds");
        for _ in 0..100 {
            let latency = model.sample();
            assert!(latency >= min && latency < max);
        }
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let err = LatencyModel::new(Duration::from_secs(3), Duration::from_secs(1)).unwrap_err();
        assert!(err.to_string().contains("upper bound"));
    }
}
