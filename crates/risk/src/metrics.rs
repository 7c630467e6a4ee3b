//! Risk metric calculations
//!
//! Pure VaR/CVaR computation over a trailing series of equity percentage
//! changes, plus the bounded return window the engine maintains per
//! portfolio. Both figures are expressed as positive loss fractions.

use std::collections::VecDeque;

use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use quantdesk_core::VarMethod;

/// Minimum observations for a meaningful estimate; below this both
/// figures are zero
const MIN_OBSERVATIONS: usize = 2;

/// Compute (VaR, CVaR) at the given confidence from a return series
pub fn compute_var_cvar(returns: &[f64], confidence: f64, method: VarMethod) -> (f64, f64) {
    if returns.len() < MIN_OBSERVATIONS {
        return (0.0, 0.0);
    }
    match method {
        VarMethod::Parametric => parametric_var_cvar(returns, confidence),
        VarMethod::Historical => historical_var_cvar(returns, confidence),
    }
}

/// Normal approximation from the sample mean and standard deviation
fn parametric_var_cvar(returns: &[f64], confidence: f64) -> (f64, f64) {
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stdev = variance.sqrt();

    let normal = Normal::new(0.0, 1.0).unwrap();
    let z = normal.inverse_cdf(1.0 - confidence);
    let var = -(mean + z * stdev);
    let cvar = -(mean - stdev * normal.pdf(z) / (1.0 - confidence));

    (var, cvar)
}

/// Empirical quantile of the observed returns
fn historical_var_cvar(returns: &[f64], confidence: f64) -> (f64, f64) {
    let mut sorted = returns.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let index = ((1.0 - confidence) * sorted.len() as f64).floor() as usize;
    let index = index.min(sorted.len() - 1);

    let var = -sorted[index];
    let tail = &sorted[..=index];
    let cvar = -(tail.iter().sum::<f64>() / tail.len() as f64);

    (var, cvar)
}

/// Bounded trailing window of equity percentage changes
#[derive(Debug, Clone)]
pub struct ReturnWindow {
    /// Observations, oldest first
    window: VecDeque<f64>,

    /// Maximum retained observations
    capacity: usize,
}

impl ReturnWindow {
    /// Create an empty window holding at most `capacity` observations
    pub fn new(capacity: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append one percentage change, evicting the oldest beyond capacity
    pub fn push(&mut self, pct_change: f64) {
        self.window.push_back(pct_change);
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }
    }

    /// Current observations, oldest first
    pub fn to_vec(&self) -> Vec<f64> {
        self.window.iter().copied().collect()
    }

    /// Number of retained observations
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// Whether the window holds no observations
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}
