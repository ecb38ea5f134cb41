//! Trustless meta-transaction forwarding.
//!
//! A signer authorises a [`ForwardRequest`] with an EIP-712 signature, a relayer submits it to a
//! [`Forwarder`], and the forwarder dispatches the embedded call with the verified signer as the
//! effective caller. [`DidRegistry`] is a call target that attributes records to that signer.

pub mod errors;
pub mod forwarder;
pub mod nonce_ledger;
pub mod registry;
pub mod target;
pub mod verifier;

pub use minimal_forwarder_types as types;
pub use minimal_forwarder_types::{
    AuthenticatedCall, ExecutionResult, ForwardRequest, ForwarderDomain,
};

pub use errors::{ForwarderError, NonceError, NonceMismatch, SignatureError};
pub use forwarder::Forwarder;
pub use nonce_ledger::NonceLedger;
pub use registry::{Clock, DidRegistry, IdentityRecord, RegistryError, SystemClock};
pub use target::{AddressTaken, CallTarget, Revert, TargetDirectory};
pub use verifier::{Secp256k1Recovery, SignatureScheme};
