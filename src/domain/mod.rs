//! Core domain types and logic.

pub mod frame;
pub mod contract;
pub mod forward_adjust;
pub mod rolling;
pub mod volatility;
pub mod weights;
pub mod portfolio;
pub mod metrics;
pub mod pipeline;
pub mod config_validation;
pub mod error;
