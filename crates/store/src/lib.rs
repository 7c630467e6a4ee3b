//! Risk persistence contract for the QuantDesk trading platform
//!
//! This module defines the storage interface the risk engine writes
//! through: load/save for per-portfolio state and limits, and append-only
//! inserts for the trade-check and metric audit logs. Audit rows are
//! write-once; the engine never updates or deletes them. An in-memory
//! implementation backs tests and embedded deployments.

use async_trait::async_trait;

use quantdesk_core::{RiskLimits, RiskState};

pub mod memory;
pub mod records;

pub use memory::InMemoryRiskStore;
pub use records::{RiskMetricRecord, TradeCheckRecord};

/// Error types for the persistence layer
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage interface consumed by the risk engine
///
/// State and limits are keyed by portfolio id. The audit appends must be
/// durable (or durably queued) before they return; the engine awaits them
/// inside the portfolio's critical section.
#[async_trait]
pub trait RiskStore: Send + Sync {
    /// Load the risk state for a portfolio, if one has been saved
    async fn load_state(&self, portfolio_id: &str) -> Result<Option<RiskState>, StoreError>;

    /// Save the risk state for a portfolio
    async fn save_state(&self, state: &RiskState) -> Result<(), StoreError>;

    /// Load the risk limits for a portfolio, if any have been saved
    async fn load_limits(&self, portfolio_id: &str) -> Result<Option<RiskLimits>, StoreError>;

    /// Save the risk limits for a portfolio
    async fn save_limits(&self, portfolio_id: &str, limits: &RiskLimits)
        -> Result<(), StoreError>;

    /// Append one trade-check audit row
    async fn append_trade_check(&self, record: &TradeCheckRecord) -> Result<(), StoreError>;

    /// Append one risk-metric snapshot row
    async fn append_metrics(&self, record: &RiskMetricRecord) -> Result<(), StoreError>;

    /// Most recent trade-check rows for a portfolio, newest first
    async fn trade_checks(
        &self,
        portfolio_id: &str,
        limit: usize,
    ) -> Result<Vec<TradeCheckRecord>, StoreError>;

    /// Most recent metric rows for a portfolio, newest first
    async fn metric_history(
        &self,
        portfolio_id: &str,
        limit: usize,
    ) -> Result<Vec<RiskMetricRecord>, StoreError>;
}

/// Module version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
