//! Per-portfolio risk state table
//!
//! A keyed lock table mapping portfolio id to the exclusive critical
//! section that guards its state, limits and trailing return window.
//! Entries materialize on first touch from the store (falling back to a
//! fresh state and default limits); operations on different portfolios
//! never contend.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use quantdesk_core::{RiskLimits, RiskState};
use quantdesk_store::{RiskStore, StoreError};

use crate::metrics::ReturnWindow;

/// Everything guarded by one portfolio's critical section
#[derive(Debug)]
pub struct PortfolioRisk {
    /// Mutable risk state
    pub state: RiskState,

    /// Effective limits: stored configuration or the documented defaults
    pub limits: RiskLimits,

    /// Trailing equity percentage changes
    pub returns: ReturnWindow,
}

/// Keyed lock table over per-portfolio risk entries
#[derive(Default)]
pub struct PortfolioTable {
    /// Materialized entries
    entries: DashMap<String, Arc<Mutex<PortfolioRisk>>>,
}

impl PortfolioTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or materialize the entry for a portfolio
    ///
    /// Two racing first touches both load from the store; only one entry
    /// survives, and both loads observe identical rows.
    pub async fn entry(
        &self,
        store: &dyn RiskStore,
        portfolio_id: &str,
        return_window: usize,
    ) -> Result<Arc<Mutex<PortfolioRisk>>, StoreError> {
        if let Some(entry) = self.entries.get(portfolio_id) {
            return Ok(entry.clone());
        }

        let state = store
            .load_state(portfolio_id)
            .await?
            .unwrap_or_else(|| RiskState::new(portfolio_id));
        let limits = store.load_limits(portfolio_id).await?.unwrap_or_default();

        let entry = self
            .entries
            .entry(portfolio_id.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(PortfolioRisk {
                    state,
                    limits,
                    returns: ReturnWindow::new(return_window),
                }))
            })
            .clone();
        Ok(entry)
    }

    /// Number of materialized portfolios
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether any portfolio has been touched yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quantdesk_store::InMemoryRiskStore;

    #[tokio::test]
    async fn test_entry_materializes_defaults() {
        let store = InMemoryRiskStore::new();
        let table = PortfolioTable::new();
        assert!(table.is_empty());

        let entry = table.entry(&store, "alpha", 100).await.unwrap();
        let guard = entry.lock().await;
        assert_eq!(guard.state.portfolio_id, "alpha");
        assert_eq!(guard.state.equity, 0.0);
        assert_eq!(guard.limits.max_open_positions, 10);
        assert!(guard.returns.is_empty());
        drop(guard);

        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_entry_loads_saved_rows() {
        let store = InMemoryRiskStore::new();
        let mut state = RiskState::new("alpha");
        state.equity = 7500.0;
        store.save_state(&state).await.unwrap();
        let mut limits = RiskLimits::default();
        limits.max_open_positions = 2;
        store.save_limits("alpha", &limits).await.unwrap();

        let table = PortfolioTable::new();
        let entry = table.entry(&store, "alpha", 100).await.unwrap();
        let guard = entry.lock().await;
        assert_eq!(guard.state.equity, 7500.0);
        assert_eq!(guard.limits.max_open_positions, 2);
    }

    #[tokio::test]
    async fn test_entry_is_stable_across_calls() {
        let store = InMemoryRiskStore::new();
        let table = PortfolioTable::new();

        let first = table.entry(&store, "alpha", 100).await.unwrap();
        first.lock().await.state.equity = 42.0;

        let second = table.entry(&store, "alpha", 100).await.unwrap();
        assert_eq!(second.lock().await.state.equity, 42.0);
        assert_eq!(table.len(), 1);
    }
}
