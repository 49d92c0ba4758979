//! Synthetic keys for the standard puzzle
//!
//! A coin locked to `STANDARD_PUZZLE` curried with `P + offset*G`, where
//! `offset = sha256(P || hidden_puzzle_hash) mod r`, can be spent either by
//! a signature from the synthetic key or by revealing `P` and the hidden
//! puzzle.

use clvm_wallet_core::{group_order, Bytes32, ClvmValue, Number, PredefinedPrograms, Program, PuzzleName};
use sha2::{Digest, Sha256};

use crate::error::WalletError;
use crate::keys::{PublicKey, SecretKey};

pub fn calculate_synthetic_offset(
    public_key: &PublicKey,
    hidden_puzzle_hash: &Bytes32,
) -> Result<Number, WalletError> {
    let mut hasher = Sha256::new();
    hasher.update(public_key.to_bytes());
    hasher.update(hidden_puzzle_hash);
    let digest: Bytes32 = hasher.finalize().into();
    Ok(Number::from_signed_bytes(&digest).modulo(&group_order())?)
}

pub fn calculate_synthetic_public_key(
    public_key: &PublicKey,
    hidden_puzzle_hash: &Bytes32,
) -> Result<PublicKey, WalletError> {
    let offset = calculate_synthetic_offset(public_key, hidden_puzzle_hash)?;
    if offset.is_zero() {
        return Ok(*public_key);
    }
    let offset_key = SecretKey::from_number(&offset)?.public_key();
    PublicKey::aggregate(&[*public_key, offset_key])
}

pub fn calculate_synthetic_secret_key(
    secret_key: &SecretKey,
    hidden_puzzle_hash: &Bytes32,
) -> Result<SecretKey, WalletError> {
    let offset = calculate_synthetic_offset(&secret_key.public_key(), hidden_puzzle_hash)?;
    SecretKey::from_number(&(&secret_key.to_number() + &offset))
}

pub fn default_hidden_puzzle_hash() -> Result<Bytes32, WalletError> {
    Ok(PredefinedPrograms::shared()?
        .get(PuzzleName::DefaultHiddenPuzzle)
        .tree_hash())
}

pub fn puzzle_for_synthetic_public_key(synthetic_public_key: &PublicKey) -> Result<Program, WalletError> {
    let standard = PredefinedPrograms::shared()?.get(PuzzleName::StandardPuzzle);
    Ok(standard.curry(&[ClvmValue::atom(synthetic_public_key.to_bytes().to_vec())]))
}

pub fn puzzle_for_public_key_and_hidden_puzzle_hash(
    public_key: &PublicKey,
    hidden_puzzle_hash: &Bytes32,
) -> Result<Program, WalletError> {
    let synthetic = calculate_synthetic_public_key(public_key, hidden_puzzle_hash)?;
    puzzle_for_synthetic_public_key(&synthetic)
}

pub fn puzzle_for_public_key_and_hidden_puzzle(
    public_key: &PublicKey,
    hidden_puzzle: &Program,
) -> Result<Program, WalletError> {
    puzzle_for_public_key_and_hidden_puzzle_hash(public_key, &hidden_puzzle.tree_hash())
}

/// Standard puzzle with the default hidden puzzle
pub fn puzzle_for_public_key(public_key: &PublicKey) -> Result<Program, WalletError> {
    puzzle_for_public_key_and_hidden_puzzle_hash(public_key, &default_hidden_puzzle_hash()?)
}

pub fn public_key_to_puzzle_hash(public_key: &PublicKey) -> Result<Bytes32, WalletError> {
    Ok(puzzle_for_public_key(public_key)?.tree_hash())
}
