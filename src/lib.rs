//! Session coordination for a desktop cryptocurrency wallet.
//!
//! A [`wallet::Backend`] gives uniform access to the ledger whether it lives in an embedded light
//! client or in a wallet daemon reached over JSON-RPC. On top of it sit the session lifecycle,
//! sync coordination with progress fan-out, history pagination, confirmation classification and
//! change allocation.

pub mod config;
pub mod daemon;
pub mod transaction;
pub mod utils;
pub mod wallet;

#[cfg(test)]
mod test_utils;
