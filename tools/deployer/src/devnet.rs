//! In-process devnet: a forwarder, a registry that trusts it, and the state they carry between
//! CLI invocations.

use std::sync::Arc;

use alloy_primitives::{keccak256, Address, U256};
use alloy_sol_types::SolCall;
use anyhow::{anyhow, Context, Result};
use minimal_forwarder::{
    registry::interfaces::IDIDRegistry, AuthenticatedCall, DidRegistry, Forwarder, ForwarderDomain,
    IdentityRecord, NonceLedger, RegistryError, Revert, TargetDirectory,
};
use serde::{Deserialize, Serialize};

/// Local development chain id.
pub const DEFAULT_CHAIN_ID: u64 = 31337;

/// Well-known local development accounts #0 and #1. Never use them outside a devnet.
pub const DEV_ACCOUNT_0_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const DEV_ACCOUNT_1_KEY: &str =
    "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

/// Mutable state of a deployed forwarder + registry pair.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevnetState {
    pub nonces: Vec<(Address, U256)>,
    pub records: Vec<(String, IdentityRecord)>,
}

/// Address of the `n`th instance deployed by `deployer`.
pub fn instance_address(deployer: Address, n: u64) -> Address {
    let mut buf = Vec::with_capacity(20 + 8);
    buf.extend_from_slice(deployer.as_slice());
    buf.extend_from_slice(&n.to_be_bytes());
    Address::from_slice(&keccak256(buf)[12..])
}

pub struct Devnet {
    pub targets: Arc<TargetDirectory>,
    pub forwarder: Arc<Forwarder>,
    pub registry: Arc<DidRegistry>,
}

impl Devnet {
    /// Fresh forwarder at `forwarder_address`, then a registry at `registry_address` trusting it.
    pub fn deploy(chain_id: u64, forwarder_address: Address, registry_address: Address) -> Result<Self> {
        Self::restore(chain_id, forwarder_address, registry_address, DevnetState::default())
    }

    pub fn restore(
        chain_id: u64,
        forwarder_address: Address,
        registry_address: Address,
        state: DevnetState,
    ) -> Result<Self> {
        if forwarder_address == registry_address {
            return Err(anyhow!("forwarder and registry cannot share address {forwarder_address}"));
        }

        let targets = Arc::new(TargetDirectory::new());
        let forwarder = Arc::new(Forwarder::new(
            ForwarderDomain::minimal_forwarder(chain_id, forwarder_address),
            Arc::new(NonceLedger::from_entries(state.nonces)),
            targets.clone(),
        ));
        let registry = Arc::new(
            DidRegistry::new(registry_address, forwarder.address()).with_records(state.records),
        );
        targets
            .register(registry_address, registry.clone())
            .context("failed deploying DIDRegistry")?;

        Ok(Self {
            targets,
            forwarder,
            registry,
        })
    }

    pub fn snapshot(&self) -> DevnetState {
        DevnetState {
            nonces: self.forwarder.nonces().entries(),
            records: self.registry.records(),
        }
    }

    /// `getDID` through the registry's ABI, the way an external client reads it.
    pub fn lookup_did(&self, did: &str) -> Result<IdentityRecord> {
        let query = IDIDRegistry::getDIDCall { did: did.to_string() }.abi_encode();
        let call = AuthenticatedCall::direct(Address::ZERO, query);
        match self.targets.call(self.registry.address(), &call) {
            Ok(out) => {
                let decoded = IDIDRegistry::getDIDCall::abi_decode_returns(&out, true)
                    .context("failed decoding getDID return data")?;
                Ok(decoded.record.into())
            }
            Err(Revert(data)) => Err(match RegistryError::from_revert_data(&data) {
                Some(e) => anyhow!(e),
                None => anyhow!("getDID reverted with {data:?}"),
            }),
        }
    }
}
