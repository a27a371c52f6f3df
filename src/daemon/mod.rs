//! Wallet daemon integration
//!
//! This module provides the client and wire types for driving a wallet that lives inside a
//! separately running daemon. Requests go over JSON-RPC; sync progress arrives as a stream of
//! notifications over a WebSocket subscription.

/// JSON-RPC and WebSocket client for the wallet daemon
mod client;
/// Type definitions for daemon requests, responses and notifications
mod types;

pub use client::{DaemonRpcClient, DaemonTransport, NotificationStream};
pub use types::*;
