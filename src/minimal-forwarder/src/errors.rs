use alloy_primitives::{Address, U256};
use minimal_forwarder_types::EncodingError;
use thiserror::Error;

/// Errors while recovering a signer from a proof.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("signature must be 65 bytes, got {0}")]
    InvalidLength(usize),
    #[error("unsupported recovery id {0}")]
    InvalidRecoveryId(u8),
    #[error("signature s value is in the upper half of the curve order")]
    HighS,
    #[error("signature scalars are zero or out of range")]
    Malformed,
    #[error("no public key recovers from this signature")]
    RecoveryFailed,
    #[error("signature recovers to the zero address")]
    ZeroAddress,
}

/// A request nonce that is not the signer's next expected value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("nonce mismatch for {signer}: expected {expected}, got {provided}")]
pub struct NonceMismatch {
    pub signer: Address,
    pub expected: U256,
    pub provided: U256,
}

/// Why a nonce could not be consumed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NonceError {
    #[error(transparent)]
    Mismatch(#[from] NonceMismatch),
    #[error("nonce space exhausted for {signer}")]
    Exhausted { signer: Address },
}

/// Fatal `execute` failures. None of them mutate forwarder state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForwarderError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error("invalid signature: {0}")]
    InvalidSignature(#[from] SignatureError),
    #[error("signature recovers to {recovered}, request is from {declared}")]
    SignerMismatch { declared: Address, recovered: Address },
    #[error("nonce mismatch for {signer}: expected {expected}, got {provided}")]
    NonceMismatch {
        signer: Address,
        expected: U256,
        provided: U256,
    },
    #[error("nonce space exhausted for {signer}")]
    NonceExhausted { signer: Address },
}

impl From<NonceMismatch> for ForwarderError {
    fn from(e: NonceMismatch) -> Self {
        ForwarderError::NonceMismatch {
            signer: e.signer,
            expected: e.expected,
            provided: e.provided,
        }
    }
}

impl From<NonceError> for ForwarderError {
    fn from(e: NonceError) -> Self {
        match e {
            NonceError::Mismatch(e) => e.into(),
            NonceError::Exhausted { signer } => ForwarderError::NonceExhausted { signer },
        }
    }
}

impl ForwarderError {
    /// Whether a relayer can resubmit after the signer re-signs with a fresh nonce.
    /// Every other failure means the request itself is bad.
    pub fn is_stale_nonce(&self) -> bool {
        matches!(self, ForwarderError::NonceMismatch { .. })
    }
}
