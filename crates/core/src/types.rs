//! Shared type definitions for the QuantDesk trading platform
//!
//! Per-portfolio risk state, configurable risk limits and the trade
//! proposal shape consumed by the risk engine.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    /// Buy order
    Buy,

    /// Sell order
    Sell,
}

/// Method used to compute VaR/CVaR from a return series
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarMethod {
    /// Normal approximation from the sample mean and standard deviation
    #[default]
    Parametric,

    /// Empirical quantile of the observed returns
    Historical,
}

/// A trade submitted for a risk check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedTrade {
    /// Asset symbol
    pub symbol: String,

    /// Order side
    pub side: OrderSide,

    /// Proposed size in units of the asset
    pub size: f64,

    /// Intended entry price
    pub entry_price: f64,

    /// Protective stop price, if the strategy uses one
    pub stop_loss_price: Option<f64>,
}

impl ProposedTrade {
    /// Dollar exposure of the proposed trade
    pub fn notional(&self) -> f64 {
        self.size * self.entry_price
    }
}

/// Per-portfolio risk state
///
/// `drawdown` is always recomputed from `equity` and `peak_equity`, never
/// stored independently of them. `daily_loss` is the net equity decline
/// since the last daily reset, floored at zero, so day-start equity is
/// `equity + daily_loss`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskState {
    /// Portfolio identifier
    pub portfolio_id: String,

    /// Current equity
    pub equity: f64,

    /// Highest equity observed; non-decreasing except at explicit recalibration
    pub peak_equity: f64,

    /// Fractional decline from peak equity (>= 0)
    pub drawdown: f64,

    /// Whether the portfolio is halted
    pub halted: bool,

    /// Reason for the halt; empty when active
    pub halt_reason: String,

    /// Approved trades since the last daily reset
    pub daily_trade_count: u32,

    /// Net equity decline since the last daily reset
    pub daily_loss: f64,

    /// Open position slots reserved by approved trade checks
    pub open_positions_count: u32,

    /// Date of the last daily reset
    pub last_reset_date: NaiveDate,
}

impl RiskState {
    /// Create a fresh state for a portfolio with no recorded equity yet
    pub fn new(portfolio_id: impl Into<String>) -> Self {
        Self {
            portfolio_id: portfolio_id.into(),
            equity: 0.0,
            peak_equity: 0.0,
            drawdown: 0.0,
            halted: false,
            halt_reason: String::new(),
            daily_trade_count: 0,
            daily_loss: 0.0,
            open_positions_count: 0,
            last_reset_date: Utc::now().date_naive(),
        }
    }

    /// Recompute `drawdown` from `equity` and `peak_equity`
    pub fn recompute_drawdown(&mut self) {
        self.drawdown = if self.peak_equity > 0.0 {
            (1.0 - self.equity / self.peak_equity).max(0.0)
        } else {
            0.0
        };
    }

    /// Fraction of day-start equity lost since the last daily reset
    pub fn daily_loss_pct(&self) -> f64 {
        let day_start = self.equity + self.daily_loss;
        if day_start > 0.0 {
            self.daily_loss / day_start
        } else {
            0.0
        }
    }
}

/// Per-portfolio risk limits
///
/// Missing fields deserialize to the documented defaults; a portfolio with
/// no stored limits runs entirely on them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLimits {
    /// Maximum drawdown before the circuit breaker halts the portfolio
    pub max_drawdown_pct: f64,

    /// Maximum single-position notional as a fraction of equity
    pub max_position_size_pct_equity: f64,

    /// Maximum number of concurrently open positions
    pub max_open_positions: u32,

    /// Maximum daily loss as a fraction of day-start equity
    pub daily_loss_limit_pct: f64,

    /// Capital risked per trade as a fraction of equity
    pub risk_per_trade_pct: f64,

    /// Daily trade-count ceiling; unset means no ceiling
    pub max_daily_trades: Option<u32>,

    /// Confidence level reported as the portfolio's headline VaR
    pub var_confidence: f64,

    /// Default VaR/CVaR computation method
    pub var_method: VarMethod,

    /// Whether a VaR breach halts the portfolio
    pub halt_on_var_breach: bool,

    /// VaR level that counts as a breach when `halt_on_var_breach` is set
    pub var_limit: Option<f64>,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_drawdown_pct: 0.15,
            max_position_size_pct_equity: 0.20,
            max_open_positions: 10,
            daily_loss_limit_pct: 0.05,
            risk_per_trade_pct: 0.01,
            max_daily_trades: None,
            var_confidence: 0.95,
            var_method: VarMethod::Parametric,
            halt_on_var_breach: false,
            var_limit: None,
        }
    }
}

impl RiskLimits {
    /// Validate limit ranges before accepting an update
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(self.max_drawdown_pct > 0.0 && self.max_drawdown_pct <= 1.0) {
            return Err(CoreError::Validation(format!(
                "max_drawdown_pct must be in (0, 1], got {}",
                self.max_drawdown_pct
            )));
        }
        if self.max_position_size_pct_equity <= 0.0 {
            return Err(CoreError::Validation(format!(
                "max_position_size_pct_equity must be positive, got {}",
                self.max_position_size_pct_equity
            )));
        }
        if self.max_open_positions == 0 {
            return Err(CoreError::Validation(
                "max_open_positions must be at least 1".to_string(),
            ));
        }
        if !(self.daily_loss_limit_pct > 0.0 && self.daily_loss_limit_pct <= 1.0) {
            return Err(CoreError::Validation(format!(
                "daily_loss_limit_pct must be in (0, 1], got {}",
                self.daily_loss_limit_pct
            )));
        }
        if !(self.risk_per_trade_pct > 0.0 && self.risk_per_trade_pct <= 1.0) {
            return Err(CoreError::Validation(format!(
                "risk_per_trade_pct must be in (0, 1], got {}",
                self.risk_per_trade_pct
            )));
        }
        if !(self.var_confidence > 0.5 && self.var_confidence < 1.0) {
            return Err(CoreError::Validation(format!(
                "var_confidence must be in (0.5, 1), got {}",
                self.var_confidence
            )));
        }
        if self.halt_on_var_breach && self.var_limit.is_none() {
            return Err(CoreError::Validation(
                "halt_on_var_breach requires var_limit".to_string(),
            ));
        }
        Ok(())
    }
}
