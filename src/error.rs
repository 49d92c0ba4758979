use clvm_wallet_core::ClvmError;

/// Error type for the wallet layer
///
/// Wraps `ClvmError` so evaluator failures pass through `?` unchanged
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error(transparent)]
    Clvm(#[from] ClvmError),

    #[error("bls error: {0}")]
    Bls(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("address error: {0}")]
    Address(String),

    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("no secret key for public key {0}")]
    MissingSecretKey(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<blst::BLST_ERROR> for WalletError {
    fn from(err: blst::BLST_ERROR) -> Self {
        WalletError::Bls(format!("{:?}", err))
    }
}
