//! Risk engine for the QuantDesk trading platform
//!
//! Gate-keeps every proposed trade against per-portfolio risk limits,
//! tracks rolling risk metrics (VaR/CVaR, drawdown, equity) and enforces
//! a halt/resume circuit breaker per portfolio. Decisions are
//! deterministic and audited: every check appends exactly one
//! trade-check row whose state snapshot is taken atomically with the
//! decision, inside the portfolio's critical section. The engine is
//! constructed once and shared by dependency injection.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use quantdesk_core::CoreError;
use quantdesk_store::{RiskMetricRecord, RiskStore, StoreError, TradeCheckRecord};

pub mod breaker;
pub mod metrics;
pub mod sizing;
pub mod state;

pub use breaker::HaltTrigger;
pub use metrics::{compute_var_cvar, ReturnWindow};
pub use quantdesk_core::{OrderSide, ProposedTrade, RiskLimits, RiskState, VarMethod};
pub use state::{PortfolioRisk, PortfolioTable};

/// Configuration for the risk engine
#[derive(Debug, Clone)]
pub struct RiskEngineConfig {
    /// Length of the trailing return window feeding VaR/CVaR
    pub return_window: usize,
}

impl Default for RiskEngineConfig {
    fn default() -> Self {
        Self {
            return_window: 250,
        }
    }
}

impl RiskEngineConfig {
    /// Validate the configuration before constructing an engine
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.return_window < 2 {
            return Err(CoreError::Config(format!(
                "return_window must hold at least 2 observations, got {}",
                self.return_window
            )));
        }
        Ok(())
    }
}

/// Outcome of a trade check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeDecision {
    /// Whether the trade may proceed
    pub approved: bool,

    /// "ok" on approval, the specific breach otherwise
    pub reason: String,
}

/// Reasons a trade check rejects
///
/// The Display string is surfaced verbatim to the caller and the audit
/// log. Rejections are decisions, not faults.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RejectReason {
    #[error("portfolio halted: {0}")]
    Halted(String),

    #[error("invalid trade input: {0}")]
    InvalidInput(String),

    #[error("notional value {notional:.2} exceeds max position size {cap:.2}")]
    NotionalExceeded { notional: f64, cap: f64 },

    #[error("trade risk {risk:.2} exceeds per-trade risk limit {cap:.2}")]
    TradeRiskExceeded { risk: f64, cap: f64 },

    #[error("open positions {count} at maximum {max}")]
    MaxOpenPositions { count: u32, max: u32 },

    #[error("daily trade count {count} at maximum {max}")]
    MaxDailyTrades { count: u32, max: u32 },
}

/// Error types for the risk engine
#[derive(Debug, thiserror::Error)]
pub enum RiskError {
    #[error("invalid stop distance: entry price equals stop price")]
    InvalidStopDistance,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid limits: {0}")]
    InvalidLimits(#[from] CoreError),

    #[error("persistence failure: {source}")]
    Persistence {
        /// The decision reached in memory before the write failed, if any.
        /// An unlogged approval is a correctness risk; callers may fail
        /// closed.
        decision: Option<TradeDecision>,
        source: StoreError,
    },
}

impl RiskError {
    fn persistence(source: StoreError) -> Self {
        RiskError::Persistence {
            decision: None,
            source,
        }
    }
}

/// Apply the validation chain in order, returning the first breach
fn evaluate_trade(
    state: &RiskState,
    limits: &RiskLimits,
    trade: &ProposedTrade,
) -> Option<RejectReason> {
    if state.halted {
        return Some(RejectReason::Halted(state.halt_reason.clone()));
    }

    if trade.size <= 0.0 || trade.entry_price <= 0.0 {
        return Some(RejectReason::InvalidInput(
            "size and entry price must be positive".to_string(),
        ));
    }

    let notional = trade.notional();
    let notional_cap = limits.max_position_size_pct_equity * state.equity;
    if breaker::exceeds(notional, notional_cap) {
        return Some(RejectReason::NotionalExceeded {
            notional,
            cap: notional_cap,
        });
    }

    if let Some(stop) = trade.stop_loss_price {
        let risk = trade.size * (trade.entry_price - stop).abs();
        let risk_cap = limits.risk_per_trade_pct * state.equity;
        if breaker::exceeds(risk, risk_cap) {
            return Some(RejectReason::TradeRiskExceeded {
                risk,
                cap: risk_cap,
            });
        }
    }

    if state.open_positions_count >= limits.max_open_positions {
        return Some(RejectReason::MaxOpenPositions {
            count: state.open_positions_count,
            max: limits.max_open_positions,
        });
    }

    if let Some(max_trades) = limits.max_daily_trades {
        if state.daily_trade_count >= max_trades {
            return Some(RejectReason::MaxDailyTrades {
                count: state.daily_trade_count,
                max: max_trades,
            });
        }
    }

    None
}

/// The risk engine
///
/// One instance per process, handed to callers via dependency injection.
/// Every operation serializes on the owning portfolio's critical section;
/// different portfolios never block each other.
pub struct RiskEngine {
    /// Engine configuration
    config: RwLock<RiskEngineConfig>,

    /// Persistence collaborator
    store: Arc<dyn RiskStore>,

    /// Keyed per-portfolio state table
    portfolios: PortfolioTable,
}

impl RiskEngine {
    /// Create a new risk engine over the given store
    pub fn new(config: RiskEngineConfig, store: Arc<dyn RiskStore>) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            config: RwLock::new(config),
            store,
            portfolios: PortfolioTable::new(),
        })
    }

    /// Get or materialize the critical section for a portfolio
    async fn portfolio(&self, portfolio_id: &str) -> Result<Arc<Mutex<PortfolioRisk>>, RiskError> {
        let return_window = self.config.read().return_window;
        self.portfolios
            .entry(self.store.as_ref(), portfolio_id, return_window)
            .await
            .map_err(RiskError::persistence)
    }

    /// Check a proposed trade against the portfolio's limits
    ///
    /// Every call, approved or rejected, appends exactly one audit row
    /// before returning. An approval reserves its headroom (position slot
    /// and daily trade count) inside the same critical section, so two
    /// concurrent checks can never share one remaining slot.
    pub async fn check_trade(
        &self,
        portfolio_id: &str,
        trade: ProposedTrade,
    ) -> Result<TradeDecision, RiskError> {
        let entry = self.portfolio(portfolio_id).await?;
        let mut guard = entry.lock().await;
        let p = &mut *guard;

        let verdict = evaluate_trade(&p.state, &p.limits, &trade);
        let approved = verdict.is_none();
        let reason = match verdict {
            Some(reject) => reject.to_string(),
            None => "ok".to_string(),
        };

        let record = TradeCheckRecord {
            check_id: Uuid::new_v4(),
            portfolio_id: portfolio_id.to_string(),
            symbol: trade.symbol.clone(),
            side: trade.side,
            size: trade.size,
            entry_price: trade.entry_price,
            stop_loss_price: trade.stop_loss_price,
            approved,
            reason: reason.clone(),
            equity_at_check: p.state.equity,
            drawdown_at_check: p.state.drawdown,
            open_positions_at_check: p.state.open_positions_count,
            checked_at: Utc::now(),
        };

        if approved {
            p.state.open_positions_count += 1;
            p.state.daily_trade_count += 1;
        }

        let decision = TradeDecision { approved, reason };

        // The audit row and the reserved state must land before the lock
        // releases; the decision rides along on a write failure.
        if let Err(source) = self.store.append_trade_check(&record).await {
            warn!(portfolio_id, "trade check audit write failed: {}", source);
            return Err(RiskError::Persistence {
                decision: Some(decision),
                source,
            });
        }
        if approved {
            if let Err(source) = self.store.save_state(&p.state).await {
                warn!(portfolio_id, "state save failed after approval: {}", source);
                return Err(RiskError::Persistence {
                    decision: Some(decision),
                    source,
                });
            }
        }

        debug!(
            portfolio_id,
            symbol = %trade.symbol,
            approved,
            reason = %decision.reason,
            "trade check"
        );
        Ok(decision)
    }

    /// Apply a new portfolio valuation
    ///
    /// Raises the peak when exceeded, recomputes drawdown, folds the
    /// equity delta into the daily loss and the return window, and
    /// evaluates the circuit breaker. The single path that can
    /// automatically halt a portfolio.
    pub async fn update_equity(
        &self,
        portfolio_id: &str,
        new_equity: f64,
    ) -> Result<RiskState, RiskError> {
        if !new_equity.is_finite() || new_equity < 0.0 {
            return Err(RiskError::InvalidInput(format!(
                "equity must be finite and non-negative, got {new_equity}"
            )));
        }

        let entry = self.portfolio(portfolio_id).await?;
        let mut guard = entry.lock().await;
        let p = &mut *guard;

        let old_equity = p.state.equity;
        if old_equity > 0.0 {
            p.returns.push((new_equity - old_equity) / old_equity);
        }

        p.state.equity = new_equity;
        if new_equity > p.state.peak_equity {
            p.state.peak_equity = new_equity;
        }
        p.state.recompute_drawdown();

        // Declines add to the daily loss, gains earn headroom back.
        let delta = new_equity - old_equity;
        p.state.daily_loss = (p.state.daily_loss - delta).max(0.0);

        if !p.state.halted {
            if let Some(trigger) = breaker::evaluate(&p.state, &p.limits) {
                breaker::apply(&mut p.state, &trigger);
                info!(
                    portfolio_id,
                    reason = %p.state.halt_reason,
                    "circuit breaker halted portfolio"
                );
            }
        }

        self.store
            .save_state(&p.state)
            .await
            .map_err(RiskError::persistence)?;
        Ok(p.state.clone())
    }

    /// Reconcile the reservation counter with the collaborator that owns
    /// the actual holdings
    pub async fn sync_open_positions(
        &self,
        portfolio_id: &str,
        count: u32,
    ) -> Result<(), RiskError> {
        let entry = self.portfolio(portfolio_id).await?;
        let mut guard = entry.lock().await;
        guard.state.open_positions_count = count;
        self.store
            .save_state(&guard.state)
            .await
            .map_err(RiskError::persistence)?;
        debug!(portfolio_id, count, "open positions synced");
        Ok(())
    }

    /// Zero the daily counters; idempotent within a trading day
    ///
    /// Driven by an external scheduler once per trading day; safe against
    /// in-flight trade checks because it takes the same portfolio lock.
    pub async fn reset_daily(&self, portfolio_id: &str) -> Result<(), RiskError> {
        let entry = self.portfolio(portfolio_id).await?;
        let mut guard = entry.lock().await;
        let today = Utc::now().date_naive();

        guard.state.daily_trade_count = 0;
        guard.state.daily_loss = 0.0;
        guard.state.last_reset_date = today;

        self.store
            .save_state(&guard.state)
            .await
            .map_err(RiskError::persistence)?;
        debug!(portfolio_id, %today, "daily counters reset");
        Ok(())
    }

    /// Manually halt a portfolio
    pub async fn halt(
        &self,
        portfolio_id: &str,
        reason: impl Into<String>,
    ) -> Result<(), RiskError> {
        let entry = self.portfolio(portfolio_id).await?;
        let mut guard = entry.lock().await;
        guard.state.halted = true;
        guard.state.halt_reason = reason.into();

        self.store
            .save_state(&guard.state)
            .await
            .map_err(RiskError::persistence)?;
        info!(portfolio_id, reason = %guard.state.halt_reason, "portfolio halted");
        Ok(())
    }

    /// Resume a halted portfolio
    ///
    /// Clears the halt reason only; equity, peak equity and drawdown are
    /// untouched and require explicit recalibration.
    pub async fn resume(&self, portfolio_id: &str) -> Result<(), RiskError> {
        let entry = self.portfolio(portfolio_id).await?;
        let mut guard = entry.lock().await;
        guard.state.halted = false;
        guard.state.halt_reason.clear();

        self.store
            .save_state(&guard.state)
            .await
            .map_err(RiskError::persistence)?;
        info!(portfolio_id, "portfolio resumed");
        Ok(())
    }

    /// Current risk state with drawdown freshly recomputed
    pub async fn status(&self, portfolio_id: &str) -> Result<RiskState, RiskError> {
        let entry = self.portfolio(portfolio_id).await?;
        let mut guard = entry.lock().await;
        guard.state.recompute_drawdown();
        Ok(guard.state.clone())
    }

    /// Effective limits for a portfolio
    pub async fn limits(&self, portfolio_id: &str) -> Result<RiskLimits, RiskError> {
        let entry = self.portfolio(portfolio_id).await?;
        let guard = entry.lock().await;
        Ok(guard.limits.clone())
    }

    /// Replace a portfolio's limits after validation
    pub async fn update_limits(
        &self,
        portfolio_id: &str,
        limits: RiskLimits,
    ) -> Result<(), RiskError> {
        limits.validate()?;

        let entry = self.portfolio(portfolio_id).await?;
        let mut guard = entry.lock().await;
        self.store
            .save_limits(portfolio_id, &limits)
            .await
            .map_err(RiskError::persistence)?;
        guard.limits = limits;
        info!(portfolio_id, "risk limits updated");
        Ok(())
    }

    /// Size a trade from the stop distance and the portfolio risk budget
    pub async fn position_size(
        &self,
        portfolio_id: &str,
        entry_price: f64,
        stop_loss_price: f64,
    ) -> Result<f64, RiskError> {
        let entry = self.portfolio(portfolio_id).await?;
        let guard = entry.lock().await;
        sizing::position_size(&guard.state, &guard.limits, entry_price, stop_loss_price)
    }

    /// Compute VaR/CVaR from the trailing return window and append one
    /// metric snapshot row
    ///
    /// The headline VaR feeds the circuit breaker only when the
    /// portfolio's limits opt in; by default it is informational.
    pub async fn record_metrics(
        &self,
        portfolio_id: &str,
        method: Option<VarMethod>,
    ) -> Result<RiskMetricRecord, RiskError> {
        let entry = self.portfolio(portfolio_id).await?;
        let mut guard = entry.lock().await;
        let p = &mut *guard;

        let method = method.unwrap_or(p.limits.var_method);
        let returns = p.returns.to_vec();
        let (var_95, cvar_95) = metrics::compute_var_cvar(&returns, 0.95, method);
        let (var_99, cvar_99) = metrics::compute_var_cvar(&returns, 0.99, method);

        let record = RiskMetricRecord {
            portfolio_id: portfolio_id.to_string(),
            var_95,
            var_99,
            cvar_95,
            cvar_99,
            method,
            drawdown: p.state.drawdown,
            equity: p.state.equity,
            open_positions_count: p.state.open_positions_count,
            recorded_at: Utc::now(),
        };

        self.store
            .append_metrics(&record)
            .await
            .map_err(RiskError::persistence)?;

        let headline = if p.limits.var_confidence >= 0.99 {
            var_99
        } else {
            var_95
        };
        if !p.state.halted {
            if let Some(trigger) = breaker::evaluate_var(headline, &p.limits) {
                breaker::apply(&mut p.state, &trigger);
                info!(
                    portfolio_id,
                    reason = %p.state.halt_reason,
                    "VaR breach halted portfolio"
                );
                self.store
                    .save_state(&p.state)
                    .await
                    .map_err(RiskError::persistence)?;
            }
        }

        debug!(portfolio_id, var_95, var_99, "risk metrics recorded");
        Ok(record)
    }

    /// Most recent trade-check rows for a portfolio, newest first
    pub async fn trade_log(
        &self,
        portfolio_id: &str,
        limit: usize,
    ) -> Result<Vec<TradeCheckRecord>, RiskError> {
        self.store
            .trade_checks(portfolio_id, limit)
            .await
            .map_err(RiskError::persistence)
    }

    /// Most recent metric rows for a portfolio, newest first
    pub async fn metric_history(
        &self,
        portfolio_id: &str,
        limit: usize,
    ) -> Result<Vec<RiskMetricRecord>, RiskError> {
        self.store
            .metric_history(portfolio_id, limit)
            .await
            .map_err(RiskError::persistence)
    }
}

/// Module version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
