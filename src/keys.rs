//! BLS12-381 keys in the augmented signature scheme
//!
//! Public keys live in G1 (48 bytes compressed), signatures in G2
//! (96 bytes). every signature is over `public_key || message`.
//! child keys use the hardened lamport derivation from the chia key tree.

use std::fmt;

use blst::min_pk as bls;
use blst::BLST_ERROR;
use clvm_wallet_core::{group_order, BlsOps, Number};
use hkdf::Hkdf;
use sha2::{Digest, Sha256};

use crate::error::WalletError;

pub const SECRET_KEY_LEN: usize = 32;
pub const PUBLIC_KEY_LEN: usize = 48;
pub const SIGNATURE_LEN: usize = 96;

/// Augmented scheme ciphersuite
pub const AUG_SCHEME_DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_AUG_";

/// Compressed point at infinity in G1
pub const G1_IDENTITY: [u8; PUBLIC_KEY_LEN] = {
    let mut bytes = [0u8; PUBLIC_KEY_LEN];
    bytes[0] = 0xc0;
    bytes
};

/// Compressed point at infinity in G2
pub const G2_IDENTITY: [u8; SIGNATURE_LEN] = {
    let mut bytes = [0u8; SIGNATURE_LEN];
    bytes[0] = 0xc0;
    bytes
};

const LAMPORT_CHUNKS: usize = 255;

/// Branch under `m/12381/8444`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPurpose {
    Farmer,
    Pool,
    Wallet,
    Local,
    Backup,
}

impl KeyPurpose {
    pub fn index(&self) -> u32 {
        match self {
            KeyPurpose::Farmer => 0,
            KeyPurpose::Pool => 1,
            KeyPurpose::Wallet => 2,
            KeyPurpose::Local => 3,
            KeyPurpose::Backup => 4,
        }
    }

    pub fn path(&self, index: u32) -> [u32; 4] {
        [12381, 8444, self.index(), index]
    }
}

#[derive(Clone)]
pub struct SecretKey(bls::SecretKey);

impl SecretKey {
    /// Master key from a seed of at least 32 bytes
    pub fn key_gen(seed: &[u8]) -> Result<Self, WalletError> {
        if seed.len() < SECRET_KEY_LEN {
            return Err(WalletError::InvalidKey(format!(
                "seed must be at least {} bytes, got {}",
                SECRET_KEY_LEN,
                seed.len()
            )));
        }
        Ok(Self(bls::SecretKey::key_gen_v3(seed, &[])?))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WalletError> {
        if bytes.len() != SECRET_KEY_LEN {
            return Err(WalletError::InvalidKey(format!(
                "secret key must be {} bytes, got {}",
                SECRET_KEY_LEN,
                bytes.len()
            )));
        }
        bls::SecretKey::from_bytes(bytes)
            .map(Self)
            .map_err(|e| WalletError::InvalidKey(format!("{:?}", e)))
    }

    /// Reduce an arbitrary integer into the scalar field; zero is rejected
    pub fn from_number(value: &Number) -> Result<Self, WalletError> {
        let scalar = value.modulo(&group_order())?;
        if scalar.is_zero() {
            return Err(WalletError::InvalidKey("scalar is zero".to_string()));
        }
        Self::from_bytes(&scalar.to_unsigned_padded(SECRET_KEY_LEN)?)
    }

    pub fn to_bytes(&self) -> [u8; SECRET_KEY_LEN] {
        self.0.to_bytes()
    }

    pub fn to_number(&self) -> Number {
        Number::from_unsigned_bytes(&self.to_bytes())
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.sk_to_pk())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        let aug = self.public_key().to_bytes();
        Signature(self.0.sign(message, AUG_SCHEME_DST, &aug))
    }

    /// Hardened child at `index`
    pub fn derive_child(&self, index: u32) -> Result<Self, WalletError> {
        let lamport_pk = parent_to_lamport_pk(&self.to_bytes(), index)?;
        Self::key_gen(&lamport_pk)
    }

    pub fn derive_path(&self, path: &[u32]) -> Result<Self, WalletError> {
        path.iter()
            .try_fold(self.clone(), |key, &index| key.derive_child(index))
    }

    /// `m/12381/8444/<purpose>/<index>`
    pub fn derive_purpose_key(&self, purpose: KeyPurpose, index: u32) -> Result<Self, WalletError> {
        self.derive_path(&purpose.path(index))
    }

    pub fn derive_wallet_key(&self, index: u32) -> Result<Self, WalletError> {
        self.derive_purpose_key(KeyPurpose::Wallet, index)
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for SecretKey {}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey({})", self.public_key())
    }
}

#[derive(Clone, Copy)]
pub struct PublicKey(bls::PublicKey);

impl PublicKey {
    /// Accepts the identity or any point in the G1 subgroup
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WalletError> {
        parse_g1(bytes).map(Self)
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, WalletError> {
        Self::from_bytes(&hex::decode(hex_str)?)
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.0.to_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn is_identity(&self) -> bool {
        self.to_bytes() == G1_IDENTITY
    }

    /// Point sum; an empty slice gives the identity
    pub fn aggregate(keys: &[PublicKey]) -> Result<PublicKey, WalletError> {
        if keys.is_empty() {
            return Self::from_bytes(&G1_IDENTITY);
        }
        let refs: Vec<&bls::PublicKey> = keys.iter().map(|k| &k.0).collect();
        let sum = bls::AggregatePublicKey::aggregate(&refs, false)?;
        Ok(Self(sum.to_public_key()))
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PublicKey {}

impl std::hash::Hash for PublicKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_bytes().hash(state);
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[derive(Clone, Copy)]
pub struct Signature(bls::Signature);

impl Signature {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WalletError> {
        if bytes.len() != SIGNATURE_LEN {
            return Err(WalletError::Bls(format!(
                "signature must be {} bytes, got {}",
                SIGNATURE_LEN,
                bytes.len()
            )));
        }
        Ok(Self(bls::Signature::from_bytes(bytes)?))
    }

    pub fn identity() -> Result<Self, WalletError> {
        Self::from_bytes(&G2_IDENTITY)
    }

    pub fn to_bytes(&self) -> [u8; SIGNATURE_LEN] {
        self.0.to_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn aggregate(signatures: &[Signature]) -> Result<Signature, WalletError> {
        if signatures.is_empty() {
            return Self::identity();
        }
        let refs: Vec<&bls::Signature> = signatures.iter().map(|s| &s.0).collect();
        let sum = bls::AggregateSignature::aggregate(&refs, false)?;
        Ok(Self(sum.to_signature()))
    }

    pub fn verify(&self, public_key: &PublicKey, message: &[u8]) -> bool {
        let aug = public_key.to_bytes();
        self.0
            .verify(true, message, AUG_SCHEME_DST, &aug, &public_key.0, true)
            == BLST_ERROR::BLST_SUCCESS
    }

    /// Check one aggregate against every `(public_key, message)` pair
    pub fn aggregate_verify(&self, pairs: &[(PublicKey, Vec<u8>)]) -> bool {
        if pairs.is_empty() {
            return self.to_bytes() == G2_IDENTITY;
        }
        // the augmented scheme is the basic scheme over `pk || msg`
        let messages: Vec<Vec<u8>> = pairs
            .iter()
            .map(|(pk, msg)| [pk.to_bytes().as_slice(), msg].concat())
            .collect();
        let message_refs: Vec<&[u8]> = messages.iter().map(Vec::as_slice).collect();
        let key_refs: Vec<&bls::PublicKey> = pairs.iter().map(|(pk, _)| &pk.0).collect();
        self.0
            .aggregate_verify(true, &message_refs, AUG_SCHEME_DST, &key_refs, true)
            == BLST_ERROR::BLST_SUCCESS
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for Signature {}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.to_hex())
    }
}

fn parse_g1(bytes: &[u8]) -> Result<bls::PublicKey, WalletError> {
    if bytes.len() != PUBLIC_KEY_LEN {
        return Err(WalletError::InvalidKey(format!(
            "public key must be {} bytes, got {}",
            PUBLIC_KEY_LEN,
            bytes.len()
        )));
    }
    let point =
        bls::PublicKey::from_bytes(bytes).map_err(|e| WalletError::InvalidKey(format!("{:?}", e)))?;
    if bytes != G1_IDENTITY {
        point
            .validate()
            .map_err(|e| WalletError::InvalidKey(format!("{:?}", e)))?;
    }
    Ok(point)
}

fn hkdf_sha256(salt: &[u8], ikm: &[u8], info: &[u8], len: usize) -> Result<Vec<u8>, WalletError> {
    let mut okm = vec![0u8; len];
    Hkdf::<Sha256>::new(Some(salt), ikm)
        .expand(info, &mut okm)
        .map_err(|e| WalletError::Bls(format!("hkdf expand failed: {}", e)))?;
    Ok(okm)
}

fn parent_to_lamport_pk(parent: &[u8; SECRET_KEY_LEN], index: u32) -> Result<[u8; 32], WalletError> {
    let salt = index.to_be_bytes();
    let flipped: Vec<u8> = parent.iter().map(|b| b ^ 0xff).collect();
    let lamport0 = hkdf_sha256(&salt, parent, &[], LAMPORT_CHUNKS * 32)?;
    let lamport1 = hkdf_sha256(&salt, &flipped, &[], LAMPORT_CHUNKS * 32)?;

    let mut compressed = Sha256::new();
    for chunk in lamport0.chunks(32).chain(lamport1.chunks(32)) {
        compressed.update(Sha256::digest(chunk));
    }
    Ok(compressed.finalize().into())
}

fn point_add(points: &[&[u8]]) -> Result<Vec<u8>, String> {
    let keys = points
        .iter()
        .map(|bytes| PublicKey::from_bytes(bytes))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;
    PublicKey::aggregate(&keys)
        .map(|sum| sum.to_bytes().to_vec())
        .map_err(|e| e.to_string())
}

fn pubkey_for_exp(exponent: &[u8]) -> Result<Vec<u8>, String> {
    let scalar = Number::from_signed_bytes(exponent)
        .modulo(&group_order())
        .map_err(|e| e.to_string())?;
    if scalar.is_zero() {
        return Ok(G1_IDENTITY.to_vec());
    }
    SecretKey::from_number(&scalar)
        .map(|sk| sk.public_key().to_bytes().to_vec())
        .map_err(|e| e.to_string())
}

/// Curve operations for the evaluator's `point_add` and `pubkey_for_exp`
pub fn bls_ops() -> BlsOps {
    BlsOps {
        point_add,
        pubkey_for_exp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_key(fill: u8) -> SecretKey {
        SecretKey::key_gen(&[fill; 32]).unwrap()
    }

    #[test]
    fn test_hkdf_matches_rfc5869() {
        let salt: Vec<u8> = (0x00..=0x0c).collect();
        let info: Vec<u8> = (0xf0..=0xf9).collect();
        let okm = hkdf_sha256(&salt, &[0x0b; 22], &info, 42).unwrap();
        assert_eq!(
            hex::encode(okm),
            "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf34007208d5b887185865"
        );
        // the lamport expansion asks for the largest allowed output
        assert_eq!(hkdf_sha256(&[1], &[2], &[], 255 * 32).unwrap().len(), 255 * 32);
        assert!(hkdf_sha256(&[1], &[2], &[], 255 * 32 + 1).is_err());
    }

    #[test]
    fn test_short_seed_rejected() {
        assert!(matches!(
            SecretKey::key_gen(&[1u8; 31]),
            Err(WalletError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_key_gen_is_deterministic() {
        assert_eq!(seeded_key(1), seeded_key(1));
        assert_ne!(seeded_key(1), seeded_key(2));
    }

    #[test]
    fn test_sign_verify() {
        let sk = seeded_key(3);
        let pk = sk.public_key();
        let sig = sk.sign(b"hello");
        assert!(sig.verify(&pk, b"hello"));
        assert!(!sig.verify(&pk, b"goodbye"));
        assert!(!sig.verify(&seeded_key(4).public_key(), b"hello"));
    }

    #[test]
    fn test_aggregate_verify() {
        let a = seeded_key(5);
        let b = seeded_key(6);
        let sig = Signature::aggregate(&[a.sign(b"one"), b.sign(b"two")]).unwrap();
        let pairs = vec![
            (a.public_key(), b"one".to_vec()),
            (b.public_key(), b"two".to_vec()),
        ];
        assert!(sig.aggregate_verify(&pairs));
        let swapped = vec![
            (a.public_key(), b"two".to_vec()),
            (b.public_key(), b"one".to_vec()),
        ];
        assert!(!sig.aggregate_verify(&swapped));
        assert!(Signature::identity().unwrap().aggregate_verify(&[]));
    }

    #[test]
    fn test_derivation_is_hardened_and_deterministic() {
        let master = seeded_key(7);
        let child = master.derive_child(0).unwrap();
        assert_eq!(child, master.derive_child(0).unwrap());
        assert_ne!(child, master.derive_child(1).unwrap());
        assert_ne!(child, master);
        let path = master.derive_path(&[12381, 8444, 2, 0]).unwrap();
        assert_eq!(path, master.derive_wallet_key(0).unwrap());
        assert_ne!(path, master.derive_purpose_key(KeyPurpose::Farmer, 0).unwrap());
    }

    #[test]
    fn test_scalar_roundtrip() {
        let sk = seeded_key(8);
        assert_eq!(SecretKey::from_number(&sk.to_number()).unwrap(), sk);
        let shifted = &sk.to_number() + &group_order();
        assert_eq!(SecretKey::from_number(&shifted).unwrap(), sk);
        assert!(SecretKey::from_number(&group_order()).is_err());
    }

    #[test]
    fn test_public_key_parsing() {
        let pk = seeded_key(9).public_key();
        assert_eq!(PublicKey::from_hex(&pk.to_hex()).unwrap(), pk);
        assert!(PublicKey::from_bytes(&[0u8; 47]).is_err());
        assert!(PublicKey::from_bytes(&G1_IDENTITY).unwrap().is_identity());
    }

    #[test]
    fn test_aggregate_with_identity() {
        let pk = seeded_key(10).public_key();
        let identity = PublicKey::from_bytes(&G1_IDENTITY).unwrap();
        assert_eq!(PublicKey::aggregate(&[pk, identity]).unwrap(), pk);
        assert!(PublicKey::aggregate(&[]).unwrap().is_identity());
    }

    #[test]
    fn test_bls_ops() {
        let ops = bls_ops();
        let sk = seeded_key(11);
        let pk = (ops.pubkey_for_exp)(&sk.to_number().to_bytes()).unwrap();
        assert_eq!(pk, sk.public_key().to_bytes().to_vec());
        assert_eq!((ops.pubkey_for_exp)(&[]).unwrap(), G1_IDENTITY.to_vec());

        // 1 + (-1) = 0
        let one = (ops.pubkey_for_exp)(&[1]).unwrap();
        let minus_one = (ops.pubkey_for_exp)(&[0xff]).unwrap();
        let sum = (ops.point_add)(&[one.as_slice(), minus_one.as_slice()]).unwrap();
        assert_eq!(sum, G1_IDENTITY.to_vec());
        assert!((ops.point_add)(&[&[1u8, 2, 3][..]]).is_err());
    }
}
