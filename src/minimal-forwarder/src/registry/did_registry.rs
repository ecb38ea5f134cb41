use std::collections::HashMap;

use alloy_primitives::{Address, Bytes, FixedBytes, U256};
use alloy_sol_types::{SolCall, SolError, SolInterface};
use minimal_forwarder_types::AuthenticatedCall;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    registry::{
        clock::{Clock, SystemClock},
        interfaces::IDIDRegistry::{self, IDIDRegistryCalls, IDIDRegistryErrors},
    },
    target::{CallTarget, Revert},
};

/// Execution cost charged against the call's gas budget.
pub const REGISTER_DID_GAS: u64 = 60_000;
pub const UPDATE_DID_GAS: u64 = 35_000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    pub owner: Address,
    pub metadata: String,
    pub created_at: u64,
    pub updated_at: u64,
}

impl From<IdentityRecord> for IDIDRegistry::DIDRecord {
    fn from(record: IdentityRecord) -> Self {
        Self {
            owner: record.owner,
            metadata: record.metadata,
            createdAt: U256::from(record.created_at),
            updatedAt: U256::from(record.updated_at),
        }
    }
}

impl From<IDIDRegistry::DIDRecord> for IdentityRecord {
    fn from(record: IDIDRegistry::DIDRecord) -> Self {
        Self {
            owner: record.owner,
            metadata: record.metadata,
            created_at: record.createdAt.saturating_to(),
            updated_at: record.updatedAt.saturating_to(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("identifier {did} is already registered")]
    DuplicateIdentifier { did: String },
    #[error("identifier {did} is not registered")]
    NotFound { did: String },
    #[error("{caller} does not own {did}")]
    NotOwner { did: String, caller: Address },
    #[error("identifier must not be empty")]
    EmptyIdentifier,
    #[error("registry does not accept value, got {0}")]
    NonPayable(U256),
    #[error("call needs {required} gas, {provided} provided")]
    OutOfGas { required: u64, provided: u64 },
    #[error("calldata with selector {selector} does not match any registry function")]
    MalformedCall { selector: FixedBytes<4> },
}

impl RegistryError {
    /// ABI-encoded custom error, as returned in a reverted `ExecutionResult`.
    pub fn revert_data(&self) -> Bytes {
        let encoded = match self {
            RegistryError::DuplicateIdentifier { did } => {
                IDIDRegistry::DuplicateIdentifier { did: did.clone() }.abi_encode()
            }
            RegistryError::NotFound { did } => {
                IDIDRegistry::IdentifierNotFound { did: did.clone() }.abi_encode()
            }
            RegistryError::NotOwner { did, caller } => IDIDRegistry::NotIdentifierOwner {
                did: did.clone(),
                caller: *caller,
            }
            .abi_encode(),
            RegistryError::EmptyIdentifier => IDIDRegistry::EmptyIdentifier {}.abi_encode(),
            RegistryError::NonPayable(value) => {
                IDIDRegistry::NonPayable { value: *value }.abi_encode()
            }
            RegistryError::OutOfGas { required, provided } => IDIDRegistry::OutOfGas {
                required: U256::from(*required),
                provided: U256::from(*provided),
            }
            .abi_encode(),
            RegistryError::MalformedCall { selector } => {
                IDIDRegistry::MalformedCall { selector: *selector }.abi_encode()
            }
        };
        encoded.into()
    }

    /// Decode a revert payload produced by [`RegistryError::revert_data`].
    pub fn from_revert_data(data: &[u8]) -> Option<Self> {
        let decoded = IDIDRegistryErrors::abi_decode(data, true).ok()?;
        Some(match decoded {
            IDIDRegistryErrors::DuplicateIdentifier(e) => {
                RegistryError::DuplicateIdentifier { did: e.did }
            }
            IDIDRegistryErrors::IdentifierNotFound(e) => RegistryError::NotFound { did: e.did },
            IDIDRegistryErrors::NotIdentifierOwner(e) => RegistryError::NotOwner {
                did: e.did,
                caller: e.caller,
            },
            IDIDRegistryErrors::EmptyIdentifier(_) => RegistryError::EmptyIdentifier,
            IDIDRegistryErrors::NonPayable(e) => RegistryError::NonPayable(e.value),
            IDIDRegistryErrors::OutOfGas(e) => RegistryError::OutOfGas {
                required: e.required.saturating_to(),
                provided: e.provided.saturating_to(),
            },
            IDIDRegistryErrors::MalformedCall(e) => {
                RegistryError::MalformedCall { selector: e.selector }
            }
        })
    }
}

/// Identifier registry that trusts exactly one forwarder to vouch for signers.
///
/// The owner of a record is the effective caller of the call that created it:
/// - forwarded by the trusted forwarder: the signer it injected,
/// - forwarded by anyone else: that forwarder (it is only the immediate caller),
/// - direct: the caller.
pub struct DidRegistry<C = SystemClock> {
    address: Address,
    trusted_forwarder: Address,
    records: RwLock<HashMap<String, IdentityRecord>>,
    clock: C,
}

impl DidRegistry<SystemClock> {
    pub fn new(address: Address, trusted_forwarder: Address) -> Self {
        Self::with_clock(address, trusted_forwarder, SystemClock)
    }
}

impl<C: Clock> DidRegistry<C> {
    pub fn with_clock(address: Address, trusted_forwarder: Address, clock: C) -> Self {
        Self {
            address,
            trusted_forwarder,
            records: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Preload records, e.g. from a state snapshot.
    pub fn with_records(self, records: impl IntoIterator<Item = (String, IdentityRecord)>) -> Self {
        self.records.write().extend(records);
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn trusted_forwarder(&self) -> Address {
        self.trusted_forwarder
    }

    pub fn is_trusted_forwarder(&self, forwarder: Address) -> bool {
        forwarder == self.trusted_forwarder
    }

    pub fn effective_caller(&self, call: &AuthenticatedCall) -> Address {
        match call.forwarder {
            Some(forwarder) if self.is_trusted_forwarder(forwarder) => call.caller,
            Some(forwarder) => forwarder,
            None => call.caller,
        }
    }

    pub fn register_did(
        &self,
        call: &AuthenticatedCall,
        did: &str,
        metadata: &str,
    ) -> Result<IdentityRecord, RegistryError> {
        self.require_no_value(call)?;
        self.charge(call, REGISTER_DID_GAS)?;
        if did.is_empty() {
            return Err(RegistryError::EmptyIdentifier);
        }

        let owner = self.effective_caller(call);
        let mut records = self.records.write();
        if records.contains_key(did) {
            return Err(RegistryError::DuplicateIdentifier { did: did.to_string() });
        }

        let now = self.clock.now();
        let record = IdentityRecord {
            owner,
            metadata: metadata.to_string(),
            created_at: now,
            updated_at: now,
        };
        records.insert(did.to_string(), record.clone());
        info!(did, %owner, via = ?call.forwarder, "identifier registered");
        Ok(record)
    }

    /// Replace the metadata of a record owned by the effective caller.
    pub fn update_did(
        &self,
        call: &AuthenticatedCall,
        did: &str,
        metadata: &str,
    ) -> Result<IdentityRecord, RegistryError> {
        self.require_no_value(call)?;
        self.charge(call, UPDATE_DID_GAS)?;

        let caller = self.effective_caller(call);
        let mut records = self.records.write();
        let record = records
            .get_mut(did)
            .ok_or_else(|| RegistryError::NotFound { did: did.to_string() })?;
        if record.owner != caller {
            return Err(RegistryError::NotOwner {
                did: did.to_string(),
                caller,
            });
        }

        record.metadata = metadata.to_string();
        record.updated_at = self.clock.now();
        info!(did, owner = %caller, "identifier updated");
        Ok(record.clone())
    }

    pub fn get_did(&self, did: &str) -> Result<IdentityRecord, RegistryError> {
        self.records
            .read()
            .get(did)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound { did: did.to_string() })
    }

    /// Snapshot of all records, ordered by identifier.
    pub fn records(&self) -> Vec<(String, IdentityRecord)> {
        let mut records: Vec<_> = self
            .records
            .read()
            .iter()
            .map(|(did, record)| (did.clone(), record.clone()))
            .collect();
        records.sort_by(|a, b| a.0.cmp(&b.0));
        records
    }

    fn require_no_value(&self, call: &AuthenticatedCall) -> Result<(), RegistryError> {
        if call.value.is_zero() {
            Ok(())
        } else {
            Err(RegistryError::NonPayable(call.value))
        }
    }

    fn charge(&self, call: &AuthenticatedCall, cost: u64) -> Result<(), RegistryError> {
        if call.gas < cost {
            return Err(RegistryError::OutOfGas {
                required: cost,
                provided: call.gas,
            });
        }
        Ok(())
    }

    fn dispatch(&self, call: &AuthenticatedCall) -> Result<Bytes, RegistryError> {
        let decoded = IDIDRegistryCalls::abi_decode(&call.payload, true).map_err(|_| {
            let mut selector = FixedBytes::<4>::ZERO;
            let len = call.payload.len().min(4);
            selector[..len].copy_from_slice(&call.payload[..len]);
            RegistryError::MalformedCall { selector }
        })?;

        match decoded {
            IDIDRegistryCalls::registerDID(c) => {
                self.register_did(call, &c.did, &c.metadata)?;
                Ok(Bytes::new())
            }
            IDIDRegistryCalls::updateDID(c) => {
                self.update_did(call, &c.did, &c.metadata)?;
                Ok(Bytes::new())
            }
            IDIDRegistryCalls::getDID(c) => {
                let record: IDIDRegistry::DIDRecord = self.get_did(&c.did)?.into();
                Ok(IDIDRegistry::getDIDCall::abi_encode_returns(&(record,)).into())
            }
            IDIDRegistryCalls::isTrustedForwarder(c) => {
                let trusted = self.is_trusted_forwarder(c.forwarder);
                Ok(IDIDRegistry::isTrustedForwarderCall::abi_encode_returns(&(trusted,)).into())
            }
        }
    }
}

impl<C: Clock> CallTarget for DidRegistry<C> {
    fn call(&self, call: &AuthenticatedCall) -> Result<Bytes, Revert> {
        self.dispatch(call).map_err(|e| {
            debug!(registry = %self.address, error = %e, "registry call reverted");
            Revert(e.revert_data())
        })
    }
}
