//! In-memory reference implementation of the risk store
//!
//! Backs tests and embedded deployments that defer durability to the
//! surrounding platform. Appends are total-ordered per log; reads return
//! newest first.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;

use quantdesk_core::{RiskLimits, RiskState};

use crate::records::{RiskMetricRecord, TradeCheckRecord};
use crate::{RiskStore, StoreError};

/// In-memory risk store
#[derive(Default)]
pub struct InMemoryRiskStore {
    /// Saved per-portfolio states
    states: DashMap<String, RiskState>,

    /// Saved per-portfolio limits
    limits: DashMap<String, RiskLimits>,

    /// Trade-check audit log
    trade_checks: RwLock<Vec<TradeCheckRecord>>,

    /// Metric snapshot log
    metrics: RwLock<Vec<RiskMetricRecord>>,
}

impl InMemoryRiskStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of trade-check rows across all portfolios
    pub fn trade_check_count(&self) -> usize {
        self.trade_checks.read().len()
    }
}

#[async_trait]
impl RiskStore for InMemoryRiskStore {
    async fn load_state(&self, portfolio_id: &str) -> Result<Option<RiskState>, StoreError> {
        Ok(self.states.get(portfolio_id).map(|s| s.clone()))
    }

    async fn save_state(&self, state: &RiskState) -> Result<(), StoreError> {
        self.states
            .insert(state.portfolio_id.clone(), state.clone());
        Ok(())
    }

    async fn load_limits(&self, portfolio_id: &str) -> Result<Option<RiskLimits>, StoreError> {
        Ok(self.limits.get(portfolio_id).map(|l| l.clone()))
    }

    async fn save_limits(
        &self,
        portfolio_id: &str,
        limits: &RiskLimits,
    ) -> Result<(), StoreError> {
        self.limits.insert(portfolio_id.to_string(), limits.clone());
        Ok(())
    }

    async fn append_trade_check(&self, record: &TradeCheckRecord) -> Result<(), StoreError> {
        self.trade_checks.write().push(record.clone());
        Ok(())
    }

    async fn append_metrics(&self, record: &RiskMetricRecord) -> Result<(), StoreError> {
        self.metrics.write().push(record.clone());
        Ok(())
    }

    async fn trade_checks(
        &self,
        portfolio_id: &str,
        limit: usize,
    ) -> Result<Vec<TradeCheckRecord>, StoreError> {
        let log = self.trade_checks.read();
        Ok(log
            .iter()
            .rev()
            .filter(|r| r.portfolio_id == portfolio_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn metric_history(
        &self,
        portfolio_id: &str,
        limit: usize,
    ) -> Result<Vec<RiskMetricRecord>, StoreError> {
        let log = self.metrics.read();
        Ok(log
            .iter()
            .rev()
            .filter(|r| r.portfolio_id == portfolio_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quantdesk_core::{OrderSide, VarMethod};
    use uuid::Uuid;

    fn check_record(portfolio_id: &str, symbol: &str, approved: bool) -> TradeCheckRecord {
        TradeCheckRecord {
            check_id: Uuid::new_v4(),
            portfolio_id: portfolio_id.to_string(),
            symbol: symbol.to_string(),
            side: OrderSide::Buy,
            size: 1.0,
            entry_price: 100.0,
            stop_loss_price: None,
            approved,
            reason: if approved { "ok" } else { "rejected" }.to_string(),
            equity_at_check: 10000.0,
            drawdown_at_check: 0.0,
            open_positions_at_check: 0,
            checked_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_state_save_load() {
        let store = InMemoryRiskStore::new();
        assert!(store.load_state("alpha").await.unwrap().is_none());

        let mut state = RiskState::new("alpha");
        state.equity = 5000.0;
        store.save_state(&state).await.unwrap();

        let loaded = store.load_state("alpha").await.unwrap().unwrap();
        assert_eq!(loaded.equity, 5000.0);
        assert!(store.load_state("beta").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_limits_save_load() {
        let store = InMemoryRiskStore::new();
        let mut limits = RiskLimits::default();
        limits.max_open_positions = 3;
        store.save_limits("alpha", &limits).await.unwrap();

        let loaded = store.load_limits("alpha").await.unwrap().unwrap();
        assert_eq!(loaded.max_open_positions, 3);
    }

    #[tokio::test]
    async fn test_trade_log_newest_first_with_limit() {
        let store = InMemoryRiskStore::new();
        store
            .append_trade_check(&check_record("alpha", "AAPL", true))
            .await
            .unwrap();
        store
            .append_trade_check(&check_record("beta", "MSFT", true))
            .await
            .unwrap();
        store
            .append_trade_check(&check_record("alpha", "TSLA", false))
            .await
            .unwrap();

        let rows = store.trade_checks("alpha", 10).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].symbol, "TSLA");
        assert_eq!(rows[1].symbol, "AAPL");

        let rows = store.trade_checks("alpha", 1).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "TSLA");
    }

    #[tokio::test]
    async fn test_metric_history_filtering() {
        let store = InMemoryRiskStore::new();
        let record = RiskMetricRecord {
            portfolio_id: "alpha".to_string(),
            var_95: 0.03,
            var_99: 0.05,
            cvar_95: 0.04,
            cvar_99: 0.06,
            method: VarMethod::Historical,
            drawdown: 0.0,
            equity: 10000.0,
            open_positions_count: 0,
            recorded_at: Utc::now(),
        };
        store.append_metrics(&record).await.unwrap();

        assert_eq!(store.metric_history("alpha", 5).await.unwrap().len(), 1);
        assert!(store.metric_history("beta", 5).await.unwrap().is_empty());
    }
}
