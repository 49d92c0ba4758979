pub mod address;
pub mod cli;
pub mod coin;
pub mod error;
pub mod keys;
pub mod puzzles;
pub mod signing;
pub mod synthetic;

pub use clvm_wallet_core;
pub use clvm_wallet_core::{ClvmError, ClvmValue, Node, PredefinedPrograms, Program, PuzzleName};

pub use address::{decode_address, decode_puzzle_hash, encode_puzzle_hash, Network};
pub use coin::{hash_coin_list, Coin, CoinSpend};
pub use error::WalletError;
pub use keys::{bls_ops, KeyPurpose, PublicKey, SecretKey, Signature};
pub use puzzles::{
    puzzle_for_conditions, solution_for_conditions, solution_for_delegated_puzzle,
    solution_for_hidden_puzzle,
};
pub use signing::{pkm_pairs_for_spends, sign_coin_spends, verify_coin_spends};
pub use synthetic::{
    calculate_synthetic_offset, calculate_synthetic_public_key, calculate_synthetic_secret_key,
    default_hidden_puzzle_hash, public_key_to_puzzle_hash, puzzle_for_public_key,
    puzzle_for_public_key_and_hidden_puzzle, puzzle_for_public_key_and_hidden_puzzle_hash,
    puzzle_for_synthetic_public_key,
};
