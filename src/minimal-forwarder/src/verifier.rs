//! Signer recovery.
//!
//! Forward requests are authorised with 65-byte secp256k1 signatures (`r || s || v`) over the
//! EIP-712 digest, recovered the way `ecrecover` does with OpenZeppelin's malleability rules.

use alloy_primitives::{keccak256, uint, Address, B256, U256};
use k256::{
    ecdsa::{RecoveryId, Signature, VerifyingKey},
    elliptic_curve::sec1::ToEncodedPoint,
};

use crate::errors::SignatureError;

pub const SIGNATURE_LEN: usize = 65;

/// secp256k1n / 2. Any `s` above it has a low-s twin that verifies for the same digest.
const SECP256K1N_HALF: U256 =
    uint!(0x7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF5D576E7357A4501DDFE92F46681B20A0_U256);

/// Recovers the identity that produced `proof` over `digest`.
///
/// Implementations must be free of side effects so the forwarder can call them speculatively.
pub trait SignatureScheme: Send + Sync {
    fn recover(&self, digest: B256, proof: &[u8]) -> Result<Address, SignatureError>;
}

/// ECDSA over secp256k1 with Ethereum address recovery.
#[derive(Clone, Copy, Debug, Default)]
pub struct Secp256k1Recovery;

impl SignatureScheme for Secp256k1Recovery {
    fn recover(&self, digest: B256, proof: &[u8]) -> Result<Address, SignatureError> {
        ecrecover_address(digest, proof)
    }
}

/// Recover an EOA address from a 32-byte digest and an `r || s || v` signature.
///
/// `v` may be 27/28 or the raw recovery id 0/1. High-s signatures are rejected.
pub fn ecrecover_address(digest: B256, sig: &[u8]) -> Result<Address, SignatureError> {
    if sig.len() != SIGNATURE_LEN {
        return Err(SignatureError::InvalidLength(sig.len()));
    }

    let v_raw = sig[64];
    let recovery_byte = match v_raw {
        27 | 28 => v_raw - 27,
        0 | 1 => v_raw,
        other => return Err(SignatureError::InvalidRecoveryId(other)),
    };
    let recovery_id =
        RecoveryId::from_byte(recovery_byte).ok_or(SignatureError::InvalidRecoveryId(v_raw))?;

    if U256::from_be_slice(&sig[32..64]) > SECP256K1N_HALF {
        return Err(SignatureError::HighS);
    }
    let signature = Signature::from_slice(&sig[..64]).map_err(|_| SignatureError::Malformed)?;

    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &signature, recovery_id)
        .map_err(|_| SignatureError::RecoveryFailed)?;

    let recovered = public_key_address(&key);
    if recovered == Address::ZERO {
        return Err(SignatureError::ZeroAddress);
    }
    Ok(recovered)
}

fn public_key_address(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    Address::from_slice(&keccak256(&point.as_bytes()[1..])[12..])
}
