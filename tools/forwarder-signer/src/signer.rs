use alloy_primitives::{Address, Bytes, B256};
use k256::{
    ecdsa::{SigningKey, VerifyingKey},
    elliptic_curve::sec1::ToEncodedPoint,
};
use minimal_forwarder_types::{typed_data, EncodingError, ForwardRequest, ForwarderDomain};
use sha3::{Digest, Keccak256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignError {
    #[error("private key is not valid hex")]
    KeyNotHex,
    #[error("private key is not a valid secp256k1 scalar")]
    InvalidKey,
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error("signing failed: {0}")]
    Ecdsa(#[from] k256::ecdsa::Error),
}

fn keccak256_bytes(bytes: &[u8]) -> B256 {
    let mut h = Keccak256::new();
    h.update(bytes);
    B256::from_slice(h.finalize().as_slice())
}

/// Parse a hex private key, with or without `0x`.
pub fn parse_signing_key(hex_key: &str) -> Result<SigningKey, SignError> {
    let trimmed = hex_key.trim();
    let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(trimmed).map_err(|_| SignError::KeyNotHex)?;
    SigningKey::from_slice(&bytes).map_err(|_| SignError::InvalidKey)
}

/// Ethereum address of a public key: low 20 bytes of keccak256 of the uncompressed point.
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256_bytes(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// Sign a 32-byte digest, returning `r || s || v` with `v` in {27, 28} and low-s.
pub fn sign_digest(digest: B256, key: &SigningKey) -> Result<Bytes, SignError> {
    let (signature, recovery_id) = key.sign_prehash_recoverable(digest.as_slice())?;

    let mut sig_bytes = Vec::with_capacity(65);
    sig_bytes.extend_from_slice(&signature.to_bytes());
    sig_bytes.push(27 + recovery_id.to_byte());
    Ok(sig_bytes.into())
}

/// Sign the EIP-712 digest of `request` under `domain`.
pub fn sign_request(
    domain: &ForwarderDomain,
    request: &ForwardRequest,
    key: &SigningKey,
) -> Result<Bytes, SignError> {
    let digest = typed_data::digest(domain, request)?;
    sign_digest(digest, key)
}

/// A signing key paired with its address.
#[derive(Clone)]
pub struct LocalSigner {
    key: SigningKey,
    address: Address,
}

impl LocalSigner {
    pub fn new(key: SigningKey) -> Self {
        let address = address_of(key.verifying_key());
        Self { key, address }
    }

    pub fn from_hex(hex_key: &str) -> Result<Self, SignError> {
        parse_signing_key(hex_key).map(Self::new)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn sign_request(
        &self,
        domain: &ForwarderDomain,
        request: &ForwardRequest,
    ) -> Result<Bytes, SignError> {
        sign_request(domain, request, &self.key)
    }
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner").field("address", &self.address).finish_non_exhaustive()
    }
}
