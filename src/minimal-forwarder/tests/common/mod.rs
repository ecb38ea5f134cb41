#![allow(dead_code)]

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use forwarder_signer::LocalSigner;
use minimal_forwarder::{
    registry::{interfaces::IDIDRegistry, ManualClock},
    DidRegistry, ExecutionResult, ForwardRequest, Forwarder, ForwarderDomain, ForwarderError,
    NonceLedger, TargetDirectory,
};

pub const CHAIN_ID: u64 = 31337;
pub const FORWARDER_ADDRESS: Address = Address::repeat_byte(0xf0);
pub const REGISTRY_ADDRESS: Address = Address::repeat_byte(0xd1);

pub const RELAYER_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const USER_KEY: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
pub const OTHER_USER_KEY: &str = "5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a";

pub fn signer(key: &str) -> LocalSigner {
    LocalSigner::from_hex(key).unwrap()
}

/// A forwarder and a registry that trusts it, sharing one target directory.
pub struct Deployment {
    pub targets: Arc<TargetDirectory>,
    pub forwarder: Arc<Forwarder>,
    pub registry: Arc<DidRegistry<Arc<ManualClock>>>,
    pub clock: Arc<ManualClock>,
}

impl Deployment {
    pub fn new() -> Self {
        Self::at(CHAIN_ID, FORWARDER_ADDRESS)
    }

    pub fn at(chain_id: u64, forwarder_address: Address) -> Self {
        let targets = Arc::new(TargetDirectory::new());
        let forwarder = Arc::new(Forwarder::new(
            ForwarderDomain::minimal_forwarder(chain_id, forwarder_address),
            Arc::new(NonceLedger::new()),
            targets.clone(),
        ));
        let clock = Arc::new(ManualClock::new(1_700_000_000));
        let registry = Arc::new(DidRegistry::with_clock(
            REGISTRY_ADDRESS,
            forwarder_address,
            clock.clone(),
        ));
        targets.register(REGISTRY_ADDRESS, registry.clone()).unwrap();
        Self {
            targets,
            forwarder,
            registry,
            clock,
        }
    }

    /// Request from `signer` to `to` at the signer's current nonce.
    pub fn request(&self, signer: &LocalSigner, to: Address, data: impl Into<Bytes>) -> ForwardRequest {
        ForwardRequest {
            from: signer.address(),
            to,
            value: U256::ZERO,
            gas: U256::from(1_000_000u64),
            nonce: self.forwarder.get_nonce(signer.address()),
            data: data.into(),
        }
    }

    pub fn sign(&self, signer: &LocalSigner, request: &ForwardRequest) -> Bytes {
        signer.sign_request(self.forwarder.domain(), request).unwrap()
    }
}

/// Submits signed requests; its own identity never reaches the targets.
pub struct Relayer {
    pub signer: LocalSigner,
    pub forwarder: Arc<Forwarder>,
}

impl Relayer {
    pub fn new(key: &str, forwarder: Arc<Forwarder>) -> Self {
        Self {
            signer: signer(key),
            forwarder,
        }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn relay(&self, request: &ForwardRequest, signature: &[u8]) -> Result<ExecutionResult, ForwarderError> {
        self.forwarder.execute(request, signature)
    }
}

pub fn register_did_calldata(did: &str, metadata: &str) -> Bytes {
    IDIDRegistry::registerDIDCall {
        did: did.to_string(),
        metadata: metadata.to_string(),
    }
    .abi_encode()
    .into()
}
