//! Identity registry: a forwarder-aware call target mapping identifiers to their owners.

pub mod clock;
pub mod did_registry;
pub mod interfaces;

pub use clock::{Clock, ManualClock, SystemClock};
pub use did_registry::{DidRegistry, IdentityRecord, RegistryError, REGISTER_DID_GAS, UPDATE_DID_GAS};
