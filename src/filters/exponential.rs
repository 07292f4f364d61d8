use super::AngleFilter;
use crate::{Error, Result};

/// Exponential smoothing filter.
///
/// The first sample passes through unchanged; later samples are blended as
/// `alpha * raw + (1 - alpha) * previous`.
#[derive(Debug, Clone)]
pub struct ExponentialFilter {
    alpha: f64,
    last: Option<f64>,
}

impl ExponentialFilter {
    /// Create a new exponential filter
    ///
    /// # Errors
    ///
    /// Returns an error if alpha is not in the range (0, 1]. Zero would freeze
    /// the output and values above one overshoot.
    pub fn new(alpha: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(Error::FilterError(format!("Alpha must be in (0, 1], got {alpha}")));
        }
        Ok(Self { alpha, last: None })
    }

    #[must_use]
    pub const fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Whether a first sample has been seen
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.last.is_some()
    }
}

impl AngleFilter for ExponentialFilter {
    fn apply(&mut self, value: f64) -> f64 {
        let filtered = match self.last {
            Some(last) => self.alpha * value + (1.0 - self.alpha) * last,
            None => value,
        };

        self.last = Some(filtered);
        filtered
    }

    fn current(&self) -> Option<f64> {
        self.last
    }

    fn reset(&mut self) {
        self.last = None;
    }

    fn name(&self) -> &str {
        "ExponentialFilter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_exponential_filter() {
        let mut filter = ExponentialFilter::new(0.5).unwrap();

        // First value passes through
        assert_eq!(filter.apply(10.0), 10.0);

        // Second value is smoothed
        assert_eq!(filter.apply(20.0), 15.0); // 0.5 * 20 + 0.5 * 10
    }

    #[test]
    fn test_yaw_sequence() {
        let mut filter = ExponentialFilter::new(0.1).unwrap();
        assert_eq!(filter.apply(10.0), 10.0);
        assert!((filter.apply(12.0) - 10.2).abs() < 1e-12);
    }

    #[test]
    fn test_alpha_bounds() {
        assert!(ExponentialFilter::new(0.0).is_err());
        assert!(ExponentialFilter::new(-0.2).is_err());
        assert!(ExponentialFilter::new(1.0001).is_err());
        assert!(ExponentialFilter::new(f64::NAN).is_err());
        assert!(ExponentialFilter::new(1.0).is_ok());

        // Alpha of one tracks the input exactly
        let mut filter = ExponentialFilter::new(1.0).unwrap();
        filter.apply(3.0);
        assert_eq!(filter.apply(-8.0), -8.0);
    }

    #[test]
    fn test_reset_restores_cold_start() {
        let mut filter = ExponentialFilter::new(0.2).unwrap();
        filter.apply(50.0);
        filter.apply(0.0);
        assert!(filter.is_initialized());

        filter.reset();
        assert!(!filter.is_initialized());
        assert_eq!(filter.apply(-4.0), -4.0);
    }

    proptest! {
        #[test]
        fn prop_first_output_equals_input(alpha in 0.001f64..=1.0, value in -360.0f64..360.0) {
            let mut filter = ExponentialFilter::new(alpha).unwrap();
            prop_assert_eq!(filter.apply(value), value);
        }

        #[test]
        fn prop_constant_input_converges_without_overshoot(
            alpha in 0.01f64..=1.0,
            start in -180.0f64..180.0,
            target in -180.0f64..180.0,
        ) {
            let mut filter = ExponentialFilter::new(alpha).unwrap();
            let mut previous = filter.apply(start);
            for _ in 0..200 {
                let next = filter.apply(target);
                // Never moves away from the target and never crosses it
                prop_assert!((target - next).abs() <= (target - previous).abs() + 1e-9);
                prop_assert!((next - target) * (start - target) >= -1e-9);
                previous = next;
            }
        }
    }
}
