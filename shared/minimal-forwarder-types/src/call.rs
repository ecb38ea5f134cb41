use alloy_primitives::{Address, Bytes, U256};

use crate::request::ForwardRequest;

/// Call context handed to a call target.
///
/// `caller` is the identity asserting the call. When `forwarder` is set, the call was submitted by
/// that forwarder on behalf of `caller`; a target must only attribute the call to `caller` if it
/// trusts that forwarder, otherwise the forwarder itself is the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedCall {
    pub caller: Address,
    pub forwarder: Option<Address>,
    pub value: U256,
    pub gas: u64,
    pub payload: Bytes,
}

impl AuthenticatedCall {
    /// Call submitted by `caller` itself.
    pub fn direct(caller: Address, payload: impl Into<Bytes>) -> Self {
        Self {
            caller,
            forwarder: None,
            value: U256::ZERO,
            gas: u64::MAX,
            payload: payload.into(),
        }
    }

    /// Call dispatched by `forwarder` for a request verified to be signed by `signer`.
    pub fn forwarded(forwarder: Address, signer: Address, request: &ForwardRequest) -> Self {
        Self {
            caller: signer,
            forwarder: Some(forwarder),
            value: request.value,
            gas: request.gas.saturating_to::<u64>(),
            payload: request.data.clone(),
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_gas(mut self, gas: u64) -> Self {
        self.gas = gas;
        self
    }

    /// Address that physically submitted the call.
    pub fn immediate_caller(&self) -> Address {
        self.forwarder.unwrap_or(self.caller)
    }
}
