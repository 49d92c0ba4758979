//! Bech32m addresses for puzzle hashes

use std::str::FromStr;

use bech32::{FromBase32, ToBase32, Variant};
use clvm_wallet_core::Bytes32;
use serde::{Deserialize, Serialize};

use crate::error::WalletError;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn prefix(&self) -> &'static str {
        match self {
            Network::Mainnet => "xch",
            Network::Testnet => "txch",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Network> {
        match prefix {
            "xch" => Some(Network::Mainnet),
            "txch" => Some(Network::Testnet),
            _ => None,
        }
    }
}

impl FromStr for Network {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            other => Network::from_prefix(other)
                .ok_or_else(|| WalletError::Address(format!("unknown network: {}", other))),
        }
    }
}

pub fn encode_puzzle_hash(puzzle_hash: &Bytes32, prefix: &str) -> Result<String, WalletError> {
    bech32::encode(prefix, puzzle_hash.to_base32(), Variant::Bech32m)
        .map_err(|e| WalletError::Address(e.to_string()))
}

/// Split an address into its prefix and puzzle hash
pub fn decode_address(address: &str) -> Result<(String, Bytes32), WalletError> {
    let (prefix, data, variant) =
        bech32::decode(address).map_err(|e| WalletError::Address(e.to_string()))?;
    if variant != Variant::Bech32m {
        return Err(WalletError::Address("expected a bech32m checksum".to_string()));
    }
    let bytes = Vec::<u8>::from_base32(&data).map_err(|e| WalletError::Address(e.to_string()))?;
    let puzzle_hash = Bytes32::try_from(bytes.as_slice()).map_err(|_| {
        WalletError::Address(format!("expected 32 bytes of payload, got {}", bytes.len()))
    })?;
    Ok((prefix, puzzle_hash))
}

pub fn decode_puzzle_hash(address: &str) -> Result<Bytes32, WalletError> {
    decode_address(address).map(|(_, puzzle_hash)| puzzle_hash)
}
