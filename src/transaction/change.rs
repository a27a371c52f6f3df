//! Randomized change output allocation.
//!
//! Change is split over several fresh addresses in uniformly random proportions instead of
//! equal parts, so the amounts of the change outputs do not follow a recognizable pattern.
//! The amounts only add up to the total within floating point precision; the fee and dust
//! checks that run afterwards absorb the drift.

use super::{ATOMS_PER_COIN, TransactionDestination};
use crate::wallet::backend::{Backend, WalletBackend};
use crate::wallet::{WalletError, WalletResult};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use tracing::debug;

/// Split `total_change` atoms over `count` fresh addresses of `source_account`.
///
/// `utxo_count` and `send_destinations` describe the transaction the change belongs to; the
/// destinations are validated before any address is generated. Non-positive change yields no
/// outputs whatever the destinations are.
pub async fn allocate_change(
    backend: &Backend,
    count: usize,
    total_change: i64,
    source_account: u32,
    utxo_count: usize,
    send_destinations: &[TransactionDestination],
) -> WalletResult<Vec<TransactionDestination>> {
    let mut rng = StdRng::from_rng(&mut rand::rng());
    allocate_change_with_rng(
        backend,
        count,
        total_change,
        source_account,
        utxo_count,
        send_destinations,
        &mut rng,
    )
    .await
}

/// [`allocate_change`] drawing proportions from `rng`.
pub async fn allocate_change_with_rng<R: Rng + Send>(
    backend: &Backend,
    count: usize,
    total_change: i64,
    source_account: u32,
    utxo_count: usize,
    send_destinations: &[TransactionDestination],
    rng: &mut R,
) -> WalletResult<Vec<TransactionDestination>> {
    if total_change <= 0 || count == 0 {
        debug!("No change to allocate ({} atoms over {} outputs)", total_change, count);
        return Ok(Vec::new());
    }

    for destination in send_destinations {
        destination.validate()?;
    }

    debug!(
        "Allocating {} atoms of change over {} outputs ({} inputs, {} destinations)",
        total_change,
        count,
        utxo_count,
        send_destinations.len()
    );

    let mut addresses = Vec::with_capacity(count);
    for _ in 0..count {
        let address = backend
            .generate_new_address(source_account)
            .await
            .map_err(|e| e.context("allocate change"))?;
        addresses.push(address);
    }

    let unique: HashSet<&String> = addresses.iter().collect();
    if unique.len() != addresses.len() {
        return Err(WalletError::Internal(format!(
            "allocate change: account {} returned a repeated address",
            source_account
        )));
    }

    let weights = split_weights(count, rng);

    Ok(addresses
        .into_iter()
        .zip(weights)
        .map(|(address, weight)| {
            let atoms = weight * total_change as f64;
            TransactionDestination::new(address, atoms / ATOMS_PER_COIN as f64)
        })
        .collect())
}

/// `count` uniform random weights in `[0, 1)` normalized to sum to 1.
fn split_weights<R: Rng>(count: usize, rng: &mut R) -> Vec<f64> {
    let portions: Vec<f64> = (0..count).map(|_| rng.random::<f64>()).collect();
    let sum: f64 = portions.iter().sum();
    if sum <= 0.0 {
        // Every draw came out as exactly zero
        return vec![1.0 / count as f64; count];
    }
    portions.into_iter().map(|p| p / sum).collect()
}
