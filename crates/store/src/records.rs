//! Append-only audit record schemas
//!
//! One `TradeCheckRecord` per trade-check call, one `RiskMetricRecord` per
//! record-metrics invocation. Both are immutable once written and
//! round-trip through serde with stable field names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quantdesk_core::{OrderSide, VarMethod};

/// Audit row for a single trade check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeCheckRecord {
    /// Unique id of the check
    pub check_id: Uuid,

    /// Portfolio identifier
    pub portfolio_id: String,

    /// Asset symbol of the proposed trade
    pub symbol: String,

    /// Order side
    pub side: OrderSide,

    /// Proposed size
    pub size: f64,

    /// Intended entry price
    pub entry_price: f64,

    /// Protective stop price, if any
    pub stop_loss_price: Option<f64>,

    /// Whether the trade was approved
    pub approved: bool,

    /// Decision reason, verbatim
    pub reason: String,

    /// Portfolio equity at the moment of the decision
    pub equity_at_check: f64,

    /// Drawdown at the moment of the decision
    pub drawdown_at_check: f64,

    /// Open position count before the decision was applied
    pub open_positions_at_check: u32,

    /// Timestamp of the check
    pub checked_at: DateTime<Utc>,
}

/// Audit row for a risk-metric snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskMetricRecord {
    /// Portfolio identifier
    pub portfolio_id: String,

    /// Value at Risk at 95% confidence
    pub var_95: f64,

    /// Value at Risk at 99% confidence
    pub var_99: f64,

    /// Conditional VaR at 95% confidence
    pub cvar_95: f64,

    /// Conditional VaR at 99% confidence
    pub cvar_99: f64,

    /// Method the VaR/CVaR figures were computed with
    pub method: VarMethod,

    /// Drawdown at the time of the snapshot
    pub drawdown: f64,

    /// Equity at the time of the snapshot
    pub equity: f64,

    /// Open position count at the time of the snapshot
    pub open_positions_count: u32,

    /// Timestamp of the snapshot
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_check_record_round_trip() {
        let record = TradeCheckRecord {
            check_id: Uuid::new_v4(),
            portfolio_id: "alpha".to_string(),
            symbol: "AAPL".to_string(),
            side: OrderSide::Buy,
            size: 10.0,
            entry_price: 150.0,
            stop_loss_price: Some(145.0),
            approved: true,
            reason: "ok".to_string(),
            equity_at_check: 10000.0,
            drawdown_at_check: 0.02,
            open_positions_at_check: 3,
            checked_at: Utc::now(),
        };

        let json = serde_json::to_string(&record).unwrap();
        let back: TradeCheckRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.check_id, record.check_id);
        assert_eq!(back.reason, "ok");
        assert_eq!(back.stop_loss_price, Some(145.0));
        assert_eq!(back.open_positions_at_check, 3);
    }

    #[test]
    fn test_metric_record_round_trip() {
        let record = RiskMetricRecord {
            portfolio_id: "alpha".to_string(),
            var_95: 0.0329,
            var_99: 0.0465,
            cvar_95: 0.0412,
            cvar_99: 0.0533,
            method: VarMethod::Parametric,
            drawdown: 0.05,
            equity: 9500.0,
            open_positions_count: 2,
            recorded_at: Utc::now(),
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"method\":\"parametric\""));
        let back: RiskMetricRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.method, VarMethod::Parametric);
        assert_eq!(back.var_95, record.var_95);
    }
}
