//! Signal filtering for smoothing per-frame angle streams.
//!
//! Each tracked quantity (head pitch, left hand rotation, ...) owns its own
//! filter instance; filters are never shared between quantities.

/// Exponential filter for responsive smoothing
pub mod exponential;

use crate::{constants::DEFAULT_EXPONENTIAL_ALPHA, Error, Result};
use exponential::ExponentialFilter;

/// Trait for all angle filters
pub trait AngleFilter: Send + Sync {
    /// Feed one raw sample and return the smoothed value
    fn apply(&mut self, value: f64) -> f64;

    /// Last output, `None` before the first sample
    fn current(&self) -> Option<f64>;

    /// Reset filter state
    fn reset(&mut self);

    /// Get filter name
    fn name(&self) -> &str;
}

/// No-op filter that passes through values unchanged
#[derive(Debug, Default)]
pub struct NoFilter {
    last: Option<f64>,
}

impl AngleFilter for NoFilter {
    fn apply(&mut self, value: f64) -> f64 {
        self.last = Some(value);
        value
    }

    fn current(&self) -> Option<f64> {
        self.last
    }

    fn reset(&mut self) {
        self.last = None;
    }

    fn name(&self) -> &str {
        "NoFilter"
    }
}

/// Create an angle filter from a descriptor string.
///
/// Accepted forms: `none`, `exponential` (alpha 0.5) and `exponential:<alpha>`.
///
/// # Errors
///
/// Returns `Error::FilterError` for unknown names, unparsable parameters or an
/// alpha outside `(0, 1]`
pub fn create_filter(descriptor: &str) -> Result<Box<dyn AngleFilter>> {
    let lowered = descriptor.trim().to_lowercase();
    let mut parts = lowered.split(':');
    let name = parts.next().unwrap_or_default();
    let params: Vec<&str> = parts.collect();

    match (name, params.as_slice()) {
        ("none" | "nofilter", []) => Ok(Box::new(NoFilter::default())),
        ("exponential" | "ema", []) => Ok(Box::new(ExponentialFilter::new(DEFAULT_EXPONENTIAL_ALPHA)?)),
        ("exponential" | "ema", [alpha]) => {
            let alpha = alpha
                .parse::<f64>()
                .map_err(|_| Error::FilterError(format!("Alpha is not a number: {alpha}")))?;
            Ok(Box::new(ExponentialFilter::new(alpha)?))
        }
        _ => Err(Error::FilterError(format!("Unknown filter type: {descriptor}"))),
    }
}

/// Build the filter for a quantity from a filter kind and its alpha
///
/// # Errors
///
/// Returns `Error::FilterError` for an alpha outside `(0, 1]`
pub fn filter_for(kind: FilterKind, alpha: f64) -> Result<Box<dyn AngleFilter>> {
    match kind {
        FilterKind::None => Ok(Box::new(NoFilter::default())),
        FilterKind::Exponential => Ok(Box::new(ExponentialFilter::new(alpha)?)),
    }
}

/// Filter selection as it appears in configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Pass raw angles through
    None,
    /// Exponential moving average
    #[default]
    Exponential,
}
