//! Core module for the QuantDesk trading platform
//!
//! This module holds the type definitions shared between the risk engine
//! and its persistence layer: per-portfolio risk state, configurable risk
//! limits, trade proposals, and the base error taxonomy. Field names and
//! types of the persisted structs are a stable schema contract and must
//! round-trip through serde without loss.

pub mod types;

pub use types::{OrderSide, ProposedTrade, RiskLimits, RiskState, VarMethod};

/// Error types for the core module
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Module version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
