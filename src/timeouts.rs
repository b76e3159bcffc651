// Copyright 2022-2025 Martin Pool

//! Work out the deadline for one scenario's test command.
//!
//! Rather than timing build and test phases separately, every scenario gets
//! a single deadline: either a fixed value from [crate::options::Options], or
//! one calibrated from how long the baseline (unmutated) scenario took,
//! multiplied by a safety factor and floored at a minimum.

use std::time::Duration;

use crate::options::Options;

/// The deadline to give a scenario's test command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout(Duration);

impl Timeout {
    /// A deadline fixed by the user, ignoring the baseline.
    pub fn fixed(duration: Duration) -> Timeout {
        Timeout(duration)
    }

    /// Calibrate a deadline from how long the baseline scenario took.
    pub fn from_baseline(baseline_duration: Duration, options: &Options) -> Timeout {
        let scaled = baseline_duration.mul_f64(options.timeout_multiplier);
        Timeout(scaled.max(options.minimum_timeout))
    }

    /// The deadline to use for a scenario, given the options and (if it's
    /// known yet) how long the baseline took.
    pub fn for_scenario(options: &Options, baseline_duration: Option<Duration>) -> Timeout {
        if let Some(fixed) = options.test_timeout {
            return Timeout::fixed(fixed);
        }
        match baseline_duration {
            Some(baseline) => Timeout::from_baseline(baseline, options),
            // No baseline measurement is available yet (this is unusual: it
            // should only happen if baseline calibration itself is skipped),
            // so fall back to the floor.
            None => Timeout(options.minimum_timeout),
        }
    }

    pub fn duration(&self) -> Duration {
        self.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fixed_timeout_ignores_baseline() {
        let mut options = Options::default();
        options.test_timeout = Some(Duration::from_secs(7));
        let timeout = Timeout::for_scenario(&options, Some(Duration::from_secs(100)));
        assert_eq!(timeout.duration(), Duration::from_secs(7));
    }

    #[test]
    fn calibrated_timeout_scales_baseline() {
        let mut options = Options::default();
        options.timeout_multiplier = 5.0;
        options.minimum_timeout = Duration::from_secs(1);
        let timeout = Timeout::for_scenario(&options, Some(Duration::from_secs(10)));
        assert_eq!(timeout.duration(), Duration::from_secs(50));
    }

    #[test]
    fn calibrated_timeout_respects_floor() {
        let mut options = Options::default();
        options.timeout_multiplier = 5.0;
        options.minimum_timeout = Duration::from_secs(30);
        let timeout = Timeout::for_scenario(&options, Some(Duration::from_millis(100)));
        assert_eq!(timeout.duration(), Duration::from_secs(30));
    }

    #[test]
    fn missing_baseline_falls_back_to_floor() {
        let mut options = Options::default();
        options.minimum_timeout = Duration::from_secs(30);
        let timeout = Timeout::for_scenario(&options, None);
        assert_eq!(timeout.duration(), Duration::from_secs(30));
    }
}
