//! Per-signer replay nonces.
//!
//! Signers are spread over a fixed set of mutex-guarded shards. The compare-and-increment in
//! [`NonceLedger::consume`] runs under the signer's shard lock, so two requests carrying the same
//! nonce can never both be accepted, while signers in different shards never contend.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use parking_lot::Mutex;
use tracing::debug;

use crate::errors::{NonceError, NonceMismatch};

const SHARD_COUNT: usize = 16;

pub struct NonceLedger {
    shards: [Mutex<HashMap<Address, U256>>; SHARD_COUNT],
}

impl Default for NonceLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl NonceLedger {
    pub fn new() -> Self {
        Self {
            shards: std::array::from_fn(|_| Mutex::new(HashMap::new())),
        }
    }

    /// Restore a ledger from `(signer, next nonce)` pairs.
    pub fn from_entries(entries: impl IntoIterator<Item = (Address, U256)>) -> Self {
        let ledger = Self::new();
        for (signer, nonce) in entries {
            ledger.shard(signer).lock().insert(signer, nonce);
        }
        ledger
    }

    fn shard(&self, signer: Address) -> &Mutex<HashMap<Address, U256>> {
        &self.shards[signer[19] as usize % SHARD_COUNT]
    }

    /// Next nonce expected from `signer`. Unseen signers start at zero.
    pub fn current(&self, signer: Address) -> U256 {
        self.shard(signer)
            .lock()
            .get(&signer)
            .copied()
            .unwrap_or_default()
    }

    /// Accept `nonce` if it is the signer's current value and advance by one.
    ///
    /// Returns the new current value. On any error the ledger is left untouched. A signer whose
    /// counter has reached `U256::MAX` can never execute again.
    pub fn consume(&self, signer: Address, nonce: U256) -> Result<U256, NonceError> {
        let mut shard = self.shard(signer).lock();
        let expected = shard.get(&signer).copied().unwrap_or_default();
        if nonce != expected {
            return Err(NonceMismatch {
                signer,
                expected,
                provided: nonce,
            }
            .into());
        }

        let next = expected
            .checked_add(U256::from(1u64))
            .ok_or(NonceError::Exhausted { signer })?;
        shard.insert(signer, next);
        debug!(%signer, %nonce, "nonce consumed");
        Ok(next)
    }

    /// Snapshot of every signer seen so far, ordered by address.
    pub fn entries(&self) -> Vec<(Address, U256)> {
        let mut entries: Vec<_> = self
            .shards
            .iter()
            .flat_map(|shard| {
                shard
                    .lock()
                    .iter()
                    .map(|(signer, nonce)| (*signer, *nonce))
                    .collect::<Vec<_>>()
            })
            .collect();
        entries.sort_by_key(|(signer, _)| *signer);
        entries
    }
}
