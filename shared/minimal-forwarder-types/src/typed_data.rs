//! EIP-712 encoding of forward requests.
//!
//! The digest a user signs is `keccak256("\x19\x01" || domainSeparator || structHash(request))`.
//! Field order and types below are part of the protocol; changing them requires a new
//! `FORWARDER_VERSION`.

use alloy_primitives::{keccak256, Address, B256};
use thiserror::Error;

use crate::{domain::ForwarderDomain, request::ForwardRequest};

/// Upper bound on `ForwardRequest::data`, bounding the cost of hashing a request.
pub const MAX_DATA_LEN: usize = 32 * 1024;

const FORWARD_REQUEST_TYPE: &[u8] =
    b"ForwardRequest(address from,address to,uint256 value,uint256 gas,uint256 nonce,bytes data)";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("request data is {len} bytes, limit is {max}")]
    DataTooLong { len: usize, max: usize },
}

/// Left-pad an address to a 32-byte ABI word.
pub fn address_word(address: Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..32].copy_from_slice(address.as_slice());
    word
}

/// `hashStruct(ForwardRequest)`. Dynamic `bytes` are encoded as their keccak256.
pub fn struct_hash(request: &ForwardRequest) -> B256 {
    let mut buf = Vec::with_capacity(32 * 7);
    buf.extend_from_slice(keccak256(FORWARD_REQUEST_TYPE).as_slice());
    buf.extend_from_slice(&address_word(request.from));
    buf.extend_from_slice(&address_word(request.to));
    buf.extend_from_slice(&request.value.to_be_bytes::<32>());
    buf.extend_from_slice(&request.gas.to_be_bytes::<32>());
    buf.extend_from_slice(&request.nonce.to_be_bytes::<32>());
    buf.extend_from_slice(keccak256(&request.data).as_slice());
    keccak256(buf)
}

/// Digest of `request` under `domain`.
pub fn digest(domain: &ForwarderDomain, request: &ForwardRequest) -> Result<B256, EncodingError> {
    digest_with_separator(domain.separator(), request)
}

/// Same as [`digest`] for callers that cache the domain separator.
pub fn digest_with_separator(
    separator: B256,
    request: &ForwardRequest,
) -> Result<B256, EncodingError> {
    if request.data.len() > MAX_DATA_LEN {
        return Err(EncodingError::DataTooLong {
            len: request.data.len(),
            max: MAX_DATA_LEN,
        });
    }

    let mut buf = Vec::with_capacity(2 + 32 + 32);
    buf.extend_from_slice(b"\x19\x01");
    buf.extend_from_slice(separator.as_slice());
    buf.extend_from_slice(struct_hash(request).as_slice());
    Ok(keccak256(buf))
}
