//! Wallet seed generation and decoding (BIP-39 word lists)

use crate::wallet::{WalletError, WalletResult};

use bip39::Mnemonic;
use rand::Rng;

/// Words in a generated seed
pub const SEED_WORD_COUNT: usize = 24;

/// Generate a fresh 24-word seed from 32 random bytes.
pub fn generate_seed() -> WalletResult<String> {
    let mut entropy = [0u8; 32];
    rand::rng().fill(&mut entropy);

    let mnemonic = Mnemonic::from_entropy(&entropy)
        .map_err(|e| WalletError::Internal(format!("generate seed: {}", e)))?;
    Ok(mnemonic.to_string())
}

/// Decode seed words back into their entropy.
pub fn decode_seed(words: &str) -> WalletResult<Vec<u8>> {
    let mnemonic = Mnemonic::parse(words.trim())
        .map_err(|e| WalletError::InvalidInput(format!("seed words: {}", e)))?;
    Ok(mnemonic.to_entropy())
}

/// Hex form of the seed entropy, as the wallet daemon expects it
pub fn seed_hex(words: &str) -> WalletResult<String> {
    decode_seed(words).map(hex::encode)
}
