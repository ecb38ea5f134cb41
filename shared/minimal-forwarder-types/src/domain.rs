use alloy_primitives::{keccak256, Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::typed_data::address_word;

/// Domain name every forwarder instance signs under.
pub const FORWARDER_NAME: &str = "MinimalForwarder";
/// Protocol version. Field order and types of `ForwardRequest` are bound to it.
pub const FORWARDER_VERSION: &str = "0.0.1";

const DOMAIN_TYPE: &[u8] =
    b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// EIP-712 domain scoping signatures to one forwarder instance on one chain.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwarderDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl ForwarderDomain {
    /// Canonical `MinimalForwarder` / `0.0.1` domain for a forwarder at `verifying_contract`.
    pub fn minimal_forwarder(chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            name: FORWARDER_NAME.to_string(),
            version: FORWARDER_VERSION.to_string(),
            chain_id,
            verifying_contract,
        }
    }

    /// Domain separator: `keccak256(typeHash || nameHash || versionHash || chainId || verifyingContract)`.
    pub fn separator(&self) -> B256 {
        let mut buf = Vec::with_capacity(32 * 5);
        buf.extend_from_slice(keccak256(DOMAIN_TYPE).as_slice());
        buf.extend_from_slice(keccak256(self.name.as_bytes()).as_slice());
        buf.extend_from_slice(keccak256(self.version.as_bytes()).as_slice());
        buf.extend_from_slice(&U256::from(self.chain_id).to_be_bytes::<32>());
        buf.extend_from_slice(&address_word(self.verifying_contract));
        keccak256(buf)
    }
}
