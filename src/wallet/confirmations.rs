//! Confirmation counting for wallet transactions.

use serde::{Deserialize, Serialize};

/// Confirmations a transaction needs before it is reported as confirmed.
pub const DEFAULT_REQUIRED_CONFIRMATIONS: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationStatus {
    Pending,
    Confirmed,
}

/// Derive the confirmation count and status of a transaction.
///
/// A negative `mined_height` means the transaction is not mined yet and yields `(-1, Pending)`.
/// Otherwise the mining block itself counts as the first confirmation.
pub fn classify(mined_height: i32, best_height: i32, required: i32) -> (i32, ConfirmationStatus) {
    if mined_height < 0 {
        return (-1, ConfirmationStatus::Pending);
    }

    let confirmations = best_height.saturating_sub(mined_height).saturating_add(1);
    let status = if confirmations >= required {
        ConfirmationStatus::Confirmed
    } else {
        ConfirmationStatus::Pending
    };
    (confirmations, status)
}

/// [`classify`] with [`DEFAULT_REQUIRED_CONFIRMATIONS`]
pub fn classify_default(mined_height: i32, best_height: i32) -> (i32, ConfirmationStatus) {
    classify(mined_height, best_height, DEFAULT_REQUIRED_CONFIRMATIONS)
}
