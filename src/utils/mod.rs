//! Utility module for the wallet session layer.
//!
//! Re-exports formatting helpers used by progress reporting and the binary.

/// Amount and duration formatting for display
pub mod format;

pub use format::{days_behind, format_coin_amount};
