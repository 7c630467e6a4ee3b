//! Stop-distance position sizing
//!
//! Sizes a trade from the portfolio's per-trade risk budget and the
//! distance to the protective stop, clamped to the max-position notional
//! cap. Pure: reads state and limits, mutates nothing, writes no audit
//! rows. Callers that act on the size still go through the trade checker.

use quantdesk_core::{RiskLimits, RiskState};

use crate::RiskError;

/// Compute the position size for the given entry and stop prices
pub fn position_size(
    state: &RiskState,
    limits: &RiskLimits,
    entry_price: f64,
    stop_loss_price: f64,
) -> Result<f64, RiskError> {
    if entry_price <= 0.0 || stop_loss_price <= 0.0 {
        return Err(RiskError::InvalidInput(
            "entry and stop prices must be positive".to_string(),
        ));
    }

    let stop_distance = (entry_price - stop_loss_price).abs();
    if stop_distance == 0.0 {
        return Err(RiskError::InvalidStopDistance);
    }

    let risk_budget = limits.risk_per_trade_pct * state.equity;
    let size = risk_budget / stop_distance;

    let max_notional = limits.max_position_size_pct_equity * state.equity;
    let size_cap = max_notional / entry_price;

    Ok(size.min(size_cap))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_equity(equity: f64) -> RiskState {
        let mut state = RiskState::new("p1");
        state.equity = equity;
        state.peak_equity = equity;
        state
    }

    #[test]
    fn test_size_from_stop_distance() {
        let state = state_with_equity(10000.0);
        let limits = RiskLimits::default(); // 1% risk per trade

        // Risk budget 100 over a 5-point stop
        let size = position_size(&state, &limits, 100.0, 95.0).unwrap();
        assert!((size - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_size_clamped_to_notional_cap() {
        let state = state_with_equity(10000.0);
        let limits = RiskLimits::default(); // 20% max position

        // A tight stop would size to 10000 units; the cap allows 20
        let size = position_size(&state, &limits, 100.0, 99.99).unwrap();
        assert!((size - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_stop_distance_rejected() {
        let state = state_with_equity(10000.0);
        let limits = RiskLimits::default();
        let err = position_size(&state, &limits, 100.0, 100.0).unwrap_err();
        assert!(matches!(err, RiskError::InvalidStopDistance));
    }

    #[test]
    fn test_nonpositive_prices_rejected() {
        let state = state_with_equity(10000.0);
        let limits = RiskLimits::default();
        assert!(position_size(&state, &limits, 0.0, 95.0).is_err());
        assert!(position_size(&state, &limits, 100.0, -1.0).is_err());
    }

    #[test]
    fn test_zero_equity_sizes_to_zero() {
        let state = state_with_equity(0.0);
        let limits = RiskLimits::default();
        let size = position_size(&state, &limits, 100.0, 95.0).unwrap();
        assert_eq!(size, 0.0);
    }
}
