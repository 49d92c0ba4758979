//! Coins and coin spends

use clvm_wallet_core::condition_opcodes::{CREATE_COIN, RESERVE_FEE};
use clvm_wallet_core::{
    parse_conditions, Bytes32, ClvmError, ClvmEvaluator, Condition, Node, Number, Program,
    RunOptions,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::WalletError;
use crate::keys::bls_ops;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    #[serde(with = "hex::serde")]
    pub parent_coin_info: Bytes32,
    #[serde(with = "hex::serde")]
    pub puzzle_hash: Bytes32,
    pub amount: u64,
}

impl Coin {
    pub fn new(parent_coin_info: Bytes32, puzzle_hash: Bytes32, amount: u64) -> Self {
        Self {
            parent_coin_info,
            puzzle_hash,
            amount,
        }
    }

    /// Coin id: `sha256(parent || puzzle_hash || amount)`, amount as a
    /// canonical CLVM integer
    pub fn name(&self) -> Bytes32 {
        let mut hasher = Sha256::new();
        hasher.update(self.parent_coin_info);
        hasher.update(self.puzzle_hash);
        hasher.update(Number::from(self.amount).to_bytes());
        hasher.finalize().into()
    }
}

/// Hash of the coin ids sorted in descending order
pub fn hash_coin_list(coins: &[Coin]) -> Bytes32 {
    let mut names: Vec<Bytes32> = coins.iter().map(Coin::name).collect();
    names.sort_unstable_by(|a, b| b.cmp(a));
    let mut hasher = Sha256::new();
    for name in &names {
        hasher.update(name);
    }
    hasher.finalize().into()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinSpend {
    pub coin: Coin,
    pub puzzle_reveal: Program,
    pub solution: Program,
}

impl CoinSpend {
    pub fn new(coin: Coin, puzzle_reveal: Program, solution: Program) -> Self {
        Self {
            coin,
            puzzle_reveal,
            solution,
        }
    }

    /// Run the reveal against the solution
    ///
    /// The reveal must hash to the coin's puzzle hash
    pub fn run(&self, options: RunOptions) -> Result<(u64, Node), WalletError> {
        if self.puzzle_reveal.tree_hash() != self.coin.puzzle_hash {
            return Err(ClvmError::ConfigurationError(format!(
                "puzzle reveal hashes to {}, coin expects {}",
                hex::encode(self.puzzle_reveal.tree_hash()),
                hex::encode(self.coin.puzzle_hash)
            ))
            .into());
        }
        let evaluator = ClvmEvaluator::with_options(options).with_bls(bls_ops());
        Ok(self.puzzle_reveal.run_with(&evaluator, self.solution.node())?)
    }

    pub fn conditions(&self) -> Result<Vec<Condition>, WalletError> {
        self.conditions_with(RunOptions::default())
    }

    pub fn conditions_with(&self, options: RunOptions) -> Result<Vec<Condition>, WalletError> {
        let (_, result) = self.run(options)?;
        Ok(parse_conditions(&result)?)
    }

    /// Coins created by this spend, parented to the spent coin
    pub fn additions(&self) -> Result<Vec<Coin>, WalletError> {
        let parent = self.coin.name();
        self.conditions()?
            .iter()
            .filter(|c| c.opcode == CREATE_COIN)
            .map(|c| -> Result<Coin, WalletError> {
                Ok(Coin::new(parent, c.bytes32_arg(0)?, c.u64_arg(1)?))
            })
            .collect()
    }

    pub fn reserved_fee(&self) -> Result<u64, WalletError> {
        let mut total = 0u64;
        for condition in self.conditions()?.iter().filter(|c| c.opcode == RESERVE_FEE) {
            total = total.checked_add(condition.u64_arg(0)?).ok_or_else(|| {
                ClvmError::RangeError("reserved fee overflows u64".to_string())
            })?;
        }
        Ok(total)
    }
}
