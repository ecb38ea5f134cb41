use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::typed_data;

/// A call a signer authorises a relayer to submit on their behalf.
///
/// Signed as `ForwardRequest(address from,address to,uint256 value,uint256 gas,uint256 nonce,bytes data)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForwardRequest {
    /// Intended signer.
    pub from: Address,
    /// Target of the dispatched call.
    pub to: Address,
    /// Native value forwarded with the call.
    pub value: U256,
    /// Execution budget for the dispatched call.
    pub gas: U256,
    /// Must equal the forwarder's current nonce for `from`.
    pub nonce: U256,
    /// Encoded inner call (selector + arguments).
    pub data: Bytes,
}

impl ForwardRequest {
    pub fn struct_hash(&self) -> B256 {
        typed_data::struct_hash(self)
    }
}

/// Outcome of a dispatched call. `return_data` carries the revert payload when `success` is false.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    pub return_data: Bytes,
}

impl ExecutionResult {
    pub fn returned(return_data: Bytes) -> Self {
        Self { success: true, return_data }
    }

    pub fn reverted(return_data: Bytes) -> Self {
        Self { success: false, return_data }
    }
}
