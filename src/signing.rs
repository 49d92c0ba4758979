//! Signatures demanded by a bundle of coin spends
//!
//! `AGG_SIG_UNSAFE (pk msg)` is signed as `msg`; `AGG_SIG_ME (pk msg)` as
//! `msg || coin_id || additional_data`, which pins the signature to one coin
//! on one network.

use clvm_wallet_core::condition_opcodes::{AGG_SIG_ME, AGG_SIG_UNSAFE};
use clvm_wallet_core::RunOptions;
use log::debug;

use crate::coin::CoinSpend;
use crate::error::WalletError;
use crate::keys::{PublicKey, SecretKey, Signature};

/// Every `(public_key, message)` pair the spends require a signature for
pub fn pkm_pairs_for_spends(
    spends: &[CoinSpend],
    additional_data: &[u8],
    max_cost: Option<u64>,
) -> Result<Vec<(PublicKey, Vec<u8>)>, WalletError> {
    let mut pairs = Vec::new();
    for spend in spends {
        let options = RunOptions {
            max_cost,
            ..RunOptions::default()
        };
        for condition in spend.conditions_with(options)? {
            let message = match condition.opcode {
                AGG_SIG_UNSAFE => condition.atom_arg(1)?.to_vec(),
                AGG_SIG_ME => [
                    condition.atom_arg(1)?,
                    &spend.coin.name()[..],
                    additional_data,
                ]
                .concat(),
                _ => continue,
            };
            let public_key = PublicKey::from_bytes(condition.atom_arg(0)?)?;
            pairs.push((public_key, message));
        }
    }
    Ok(pairs)
}

/// Sign every required message and aggregate
///
/// `secret_key_for` maps a public key to its secret key; a key it cannot
/// supply fails the whole bundle.
pub fn sign_coin_spends<F>(
    spends: &[CoinSpend],
    secret_key_for: F,
    additional_data: &[u8],
    max_cost: Option<u64>,
) -> Result<Signature, WalletError>
where
    F: Fn(&PublicKey) -> Option<SecretKey>,
{
    let pairs = pkm_pairs_for_spends(spends, additional_data, max_cost)?;
    let mut signatures = Vec::with_capacity(pairs.len());
    for (public_key, message) in &pairs {
        let secret_key = secret_key_for(public_key)
            .filter(|sk| sk.public_key() == *public_key)
            .ok_or_else(|| WalletError::MissingSecretKey(public_key.to_hex()))?;
        signatures.push(secret_key.sign(message));
    }
    debug!("signed {} messages across {} spends", pairs.len(), spends.len());
    Signature::aggregate(&signatures)
}

/// Check an aggregate signature against the messages the spends require
pub fn verify_coin_spends(
    spends: &[CoinSpend],
    signature: &Signature,
    additional_data: &[u8],
    max_cost: Option<u64>,
) -> Result<bool, WalletError> {
    let pairs = pkm_pairs_for_spends(spends, additional_data, max_cost)?;
    Ok(signature.aggregate_verify(&pairs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clvm_wallet_core::{ClvmValue, Program};

    use crate::coin::Coin;
    use crate::puzzles::puzzle_for_conditions;

    const ADDITIONAL_DATA: &str = "ccd5bb71183532bff220ba46c268991a3ff07eb358e8255a65c30a2dce0e5fbb";

    fn agg_sig(opcode: u8, pk: &PublicKey, msg: &[u8]) -> clvm_wallet_core::Node {
        ClvmValue::list(vec![
            ClvmValue::atom(vec![opcode]),
            ClvmValue::atom(pk.to_bytes().to_vec()),
            ClvmValue::atom(msg.to_vec()),
        ])
    }

    fn spend_with(conditions: &[clvm_wallet_core::Node]) -> CoinSpend {
        let puzzle = puzzle_for_conditions(conditions).unwrap();
        let coin = Coin::new([0u8; 32], puzzle.tree_hash(), 0);
        CoinSpend::new(coin, puzzle, Program::new(ClvmValue::nil()))
    }

    #[test]
    fn test_agg_sig_me_message_includes_coin_id() {
        let sk = SecretKey::key_gen(&[1u8; 32]).unwrap();
        let pk = sk.public_key();
        let spend = spend_with(&[agg_sig(AGG_SIG_UNSAFE, &pk, b"msg1"), agg_sig(AGG_SIG_ME, &pk, b"msg2")]);
        let data = hex::decode(ADDITIONAL_DATA).unwrap();
        let pairs = pkm_pairs_for_spends(&[spend.clone()], &data, None).unwrap();
        assert_eq!(pairs[0].1, b"msg1".to_vec());
        assert_eq!(pairs[1].1, [&b"msg2"[..], &spend.coin.name()[..], &data[..]].concat());
    }

    #[test]
    fn test_sign_and_verify() {
        let sk1 = SecretKey::key_gen(&[1u8; 32]).unwrap();
        let sk2 = SecretKey::key_gen(&[2u8; 32]).unwrap();
        let spend = spend_with(&[
            agg_sig(AGG_SIG_UNSAFE, &sk1.public_key(), b"msg1"),
            agg_sig(AGG_SIG_ME, &sk2.public_key(), b"msg2"),
        ]);
        let data = hex::decode(ADDITIONAL_DATA).unwrap();
        let keys = [sk1, sk2];
        let lookup = |pk: &PublicKey| keys.iter().find(|sk| sk.public_key() == *pk).cloned();

        let signature = sign_coin_spends(&[spend.clone()], lookup, &data, None).unwrap();
        assert!(verify_coin_spends(&[spend.clone()], &signature, &data, None).unwrap());
        assert!(!verify_coin_spends(&[spend], &signature, &[0u8; 32], None).unwrap());
    }

    #[test]
    fn test_missing_key_fails() {
        let sk = SecretKey::key_gen(&[1u8; 32]).unwrap();
        let spend = spend_with(&[agg_sig(AGG_SIG_UNSAFE, &sk.public_key(), b"msg1")]);
        let result = sign_coin_spends(&[spend], |_| None, &[], None);
        assert!(matches!(result, Err(WalletError::MissingSecretKey(_))));
    }

    #[test]
    fn test_no_conditions_gives_identity() {
        let spend = spend_with(&[]);
        let signature = sign_coin_spends(&[spend], |_| None, &[], None).unwrap();
        assert_eq!(signature, Signature::identity().unwrap());
    }
}
