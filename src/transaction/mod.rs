/// Randomized change output allocation
pub mod change;

pub use change::{allocate_change, allocate_change_with_rng};

use crate::wallet::{WalletError, WalletResult};

use serde::{Deserialize, Serialize};

/// Number of decimal places of the base currency unit.
pub const COIN_DECIMALS: u32 = 8;
/// Atoms (smallest denomination) per coin
pub const ATOMS_PER_COIN: i64 = 100_000_000;

/// An output of a transaction being constructed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDestination {
    pub address: String,
    /// Amount in coins
    pub amount: f64,
    /// Send everything left after fees to this address
    #[serde(default)]
    pub send_max: bool,
}

impl TransactionDestination {
    pub fn new(address: impl Into<String>, amount: f64) -> Self {
        Self {
            address: address.into(),
            amount,
            send_max: false,
        }
    }

    pub fn send_max(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            amount: 0.0,
            send_max: true,
        }
    }

    /// Amount in atoms, rounded to the nearest atom
    pub fn amount_atoms(&self) -> i64 {
        (self.amount * ATOMS_PER_COIN as f64).round() as i64
    }

    /// A destination needs an address and exactly one of `send_max` or a positive amount.
    pub fn validate(&self) -> WalletResult<()> {
        if self.address.trim().is_empty() {
            return Err(WalletError::InvalidInput("destination address is empty".to_string()));
        }
        let has_amount = self.amount > 0.0;
        match (self.send_max, has_amount) {
            (true, true) => Err(WalletError::InvalidInput(format!(
                "destination {}: amount {} given together with send-max",
                self.address, self.amount
            ))),
            (false, false) => Err(WalletError::InvalidInput(format!(
                "destination {}: amount {} must be positive when send-max is not set",
                self.address, self.amount
            ))),
            _ => Ok(()),
        }
    }
}

/// Pair destination addresses with amounts entered as text (in coins).
pub fn build_destinations(
    addresses: &[String],
    amounts: &[String],
) -> WalletResult<Vec<TransactionDestination>> {
    if addresses.len() != amounts.len() {
        return Err(WalletError::InvalidInput(format!(
            "{} destination addresses but {} amounts",
            addresses.len(),
            amounts.len()
        )));
    }

    addresses
        .iter()
        .zip(amounts)
        .map(|(address, amount)| {
            let amount: f64 = amount.trim().parse().map_err(|_| {
                WalletError::InvalidInput(format!("destination {}: invalid amount {:?}", address, amount))
            })?;
            let destination = TransactionDestination::new(address.clone(), amount);
            destination.validate()?;
            Ok(destination)
        })
        .collect()
}
