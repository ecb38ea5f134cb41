//! Call targets reachable through the forwarder.

use std::{collections::HashMap, sync::Arc};

use alloy_primitives::{Address, Bytes};
use minimal_forwarder_types::AuthenticatedCall;
use parking_lot::RwLock;
use thiserror::Error;

/// Revert payload of a failed call (ABI-encoded custom error, or empty).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Revert(pub Bytes);

/// Something a forwarded call can be dispatched to.
pub trait CallTarget: Send + Sync {
    fn call(&self, call: &AuthenticatedCall) -> Result<Bytes, Revert>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("an account already exists at {0}")]
pub struct AddressTaken(pub Address);

/// Address book of deployed call targets.
#[derive(Default)]
pub struct TargetDirectory {
    targets: RwLock<HashMap<Address, Arc<dyn CallTarget>>>,
}

impl TargetDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, address: Address, target: Arc<dyn CallTarget>) -> Result<(), AddressTaken> {
        let mut targets = self.targets.write();
        if targets.contains_key(&address) {
            return Err(AddressTaken(address));
        }
        targets.insert(address, target);
        Ok(())
    }

    pub fn resolve(&self, address: Address) -> Option<Arc<dyn CallTarget>> {
        self.targets.read().get(&address).cloned()
    }

    pub fn contains(&self, address: Address) -> bool {
        self.targets.read().contains_key(&address)
    }

    /// Call the target at `to`. An address with nothing deployed reverts with empty data.
    ///
    /// The directory lock is released before the target runs, so targets may call back in.
    pub fn call(&self, to: Address, call: &AuthenticatedCall) -> Result<Bytes, Revert> {
        match self.resolve(to) {
            Some(target) => target.call(call),
            None => Err(Revert::default()),
        }
    }
}
