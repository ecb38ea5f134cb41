//! The forwarder: verifies signed requests and dispatches them as their signer.
//!
//! Execution order is fixed:
//! 1. digest the request under this forwarder's domain,
//! 2. recover the signer and require it to be `request.from`,
//! 3. consume the signer's nonce,
//! 4. dispatch `request.data` to `request.to` with the signer injected as the caller.
//!
//! Steps 1-3 fail atomically and leave the ledger untouched. Once the nonce is consumed the request
//! counts as executed, whether or not the dispatched call succeeds.

use std::sync::Arc;

use alloy_primitives::{Address, B256, U256};
use minimal_forwarder_types::{
    typed_data, AuthenticatedCall, ExecutionResult, ForwardRequest, ForwarderDomain,
};
use tracing::{info, warn};

use crate::{
    errors::{ForwarderError, SignatureError},
    nonce_ledger::NonceLedger,
    target::{Revert, TargetDirectory},
    verifier::{Secp256k1Recovery, SignatureScheme},
};

pub struct Forwarder<S = Secp256k1Recovery> {
    domain: ForwarderDomain,
    separator: B256,
    scheme: S,
    nonces: Arc<NonceLedger>,
    targets: Arc<TargetDirectory>,
}

impl Forwarder<Secp256k1Recovery> {
    pub fn new(
        domain: ForwarderDomain,
        nonces: Arc<NonceLedger>,
        targets: Arc<TargetDirectory>,
    ) -> Self {
        Self::with_scheme(domain, Secp256k1Recovery, nonces, targets)
    }
}

impl<S: SignatureScheme> Forwarder<S> {
    pub fn with_scheme(
        domain: ForwarderDomain,
        scheme: S,
        nonces: Arc<NonceLedger>,
        targets: Arc<TargetDirectory>,
    ) -> Self {
        let separator = domain.separator();
        Self {
            domain,
            separator,
            scheme,
            nonces,
            targets,
        }
    }

    /// Identity targets see as the immediate caller of forwarded calls.
    pub fn address(&self) -> Address {
        self.domain.verifying_contract
    }

    pub fn domain(&self) -> &ForwarderDomain {
        &self.domain
    }

    pub fn domain_separator(&self) -> B256 {
        self.separator
    }

    pub fn nonces(&self) -> &NonceLedger {
        &self.nonces
    }

    /// Next nonce `signer` must sign.
    pub fn get_nonce(&self, signer: Address) -> U256 {
        self.nonces.current(signer)
    }

    /// Digest a signer must sign for `request` on this forwarder.
    pub fn digest(&self, request: &ForwardRequest) -> Result<B256, ForwarderError> {
        Ok(typed_data::digest_with_separator(self.separator, request)?)
    }

    /// Dry-run validation: signature, signer and current nonce, without consuming anything.
    pub fn verify(&self, request: &ForwardRequest, signature: &[u8]) -> Result<Address, ForwarderError> {
        let signer = self.authenticate(request, signature)?;
        let expected = self.nonces.current(request.from);
        if expected == U256::MAX {
            return Err(ForwarderError::NonceExhausted { signer: request.from });
        }
        if request.nonce != expected {
            return Err(ForwarderError::NonceMismatch {
                signer: request.from,
                expected,
                provided: request.nonce,
            });
        }
        Ok(signer)
    }

    /// Verify `request` and dispatch it as its signer.
    ///
    /// `Err` means nothing happened. `Ok` means the nonce was consumed; the dispatched call's
    /// outcome is in the returned [`ExecutionResult`].
    pub fn execute(
        &self,
        request: &ForwardRequest,
        signature: &[u8],
    ) -> Result<ExecutionResult, ForwarderError> {
        let signer = self.authenticate(request, signature).inspect_err(|e| {
            warn!(from = %request.from, to = %request.to, error = %e, "rejected forward request");
        })?;

        self.nonces
            .consume(request.from, request.nonce)
            .inspect_err(|e| warn!(error = %e, "rejected forward request"))?;

        let call = AuthenticatedCall::forwarded(self.address(), signer, request);
        let result = match self.targets.call(request.to, &call) {
            Ok(return_data) => ExecutionResult::returned(return_data),
            Err(Revert(revert_data)) => {
                warn!(
                    %signer,
                    to = %request.to,
                    nonce = %request.nonce,
                    revert = ?revert_data,
                    "forwarded call reverted"
                );
                ExecutionResult::reverted(revert_data)
            }
        };

        info!(
            %signer,
            to = %request.to,
            nonce = %request.nonce,
            success = result.success,
            "forward request executed"
        );
        Ok(result)
    }

    fn authenticate(&self, request: &ForwardRequest, signature: &[u8]) -> Result<Address, ForwarderError> {
        let digest = self.digest(request)?;
        let recovered = self.scheme.recover(digest, signature)?;
        if recovered == Address::ZERO {
            return Err(SignatureError::ZeroAddress.into());
        }
        if recovered != request.from {
            return Err(ForwarderError::SignerMismatch {
                declared: request.from,
                recovered,
            });
        }
        Ok(recovered)
    }
}
