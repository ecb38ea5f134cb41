mod common;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, OnceLock,
};

use alloy_primitives::{Address, Bytes, U256};
use common::{signer, Deployment, OTHER_USER_KEY, USER_KEY};
use minimal_forwarder::{
    types::{EncodingError, MAX_DATA_LEN},
    AuthenticatedCall, CallTarget, Forwarder, ForwarderError, Revert, SignatureError,
};

/// Records who it was called by and returns the payload.
#[derive(Default)]
struct Probe {
    calls: parking_lot::Mutex<Vec<AuthenticatedCall>>,
}

impl CallTarget for Probe {
    fn call(&self, call: &AuthenticatedCall) -> Result<Bytes, Revert> {
        self.calls.lock().push(call.clone());
        if call.payload.first() == Some(&0xff) {
            return Err(Revert(Bytes::from_static(b"boom")));
        }
        Ok(call.payload.clone())
    }
}

const PROBE: Address = Address::repeat_byte(0x9b);

fn with_probe() -> (Deployment, Arc<Probe>) {
    let deployment = Deployment::new();
    let probe = Arc::new(Probe::default());
    deployment.targets.register(PROBE, probe.clone()).unwrap();
    (deployment, probe)
}

#[test]
fn dispatch_injects_the_signer() {
    let (d, probe) = with_probe();
    let user = signer(USER_KEY);
    let request = d.request(&user, PROBE, vec![0x01, 0x02]);
    let sig = d.sign(&user, &request);

    let result = d.forwarder.execute(&request, &sig).unwrap();
    assert!(result.success);
    assert_eq!(result.return_data, Bytes::from_static(&[0x01, 0x02]));

    let calls = probe.calls.lock();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].caller, user.address());
    assert_eq!(calls[0].forwarder, Some(d.forwarder.address()));
    assert_eq!(calls[0].gas, 1_000_000);
}

#[test]
fn replayed_request_fails_with_nonce_mismatch() {
    let (d, probe) = with_probe();
    let user = signer(USER_KEY);
    let request = d.request(&user, PROBE, vec![0x01]);
    let sig = d.sign(&user, &request);

    d.forwarder.execute(&request, &sig).unwrap();
    assert_eq!(d.forwarder.get_nonce(user.address()), request.nonce + U256::from(1u8));

    let err = d.forwarder.execute(&request, &sig).unwrap_err();
    assert_eq!(
        err,
        ForwarderError::NonceMismatch {
            signer: user.address(),
            expected: U256::from(1u8),
            provided: U256::ZERO,
        }
    );
    assert!(err.is_stale_nonce());
    assert_eq!(probe.calls.lock().len(), 1);
    assert_eq!(d.forwarder.get_nonce(user.address()), U256::from(1u8));
}

#[test]
fn nonces_must_be_used_in_order() {
    let (d, _) = with_probe();
    let user = signer(USER_KEY);
    let signed: Vec<_> = (0..3u64)
        .map(|n| {
            let request = minimal_forwarder::ForwardRequest {
                nonce: U256::from(n),
                ..d.request(&user, PROBE, vec![n as u8])
            };
            let sig = d.sign(&user, &request);
            (request, sig)
        })
        .collect();

    let (r2, s2) = &signed[2];
    assert!(d.forwarder.execute(r2, s2).unwrap_err().is_stale_nonce());

    for (request, sig) in &signed {
        assert!(d.forwarder.execute(request, sig).unwrap().success);
    }
    assert_eq!(d.forwarder.get_nonce(user.address()), U256::from(3u8));
}

#[test]
fn get_nonce_is_a_pure_read() {
    let (d, _) = with_probe();
    let user = signer(USER_KEY);
    let before: Vec<_> = (0..5).map(|_| d.forwarder.get_nonce(user.address())).collect();
    assert!(before.iter().all(|n| *n == U256::ZERO));

    let request = d.request(&user, PROBE, Vec::new());
    d.forwarder.verify(&request, &d.sign(&user, &request)).unwrap();
    assert_eq!(d.forwarder.get_nonce(user.address()), U256::ZERO);
}

#[test]
fn signature_is_bound_to_the_forwarder_instance() {
    let a = Deployment::at(31337, Address::repeat_byte(0xa0));
    let b = Deployment::at(31337, Address::repeat_byte(0xb0));
    let user = signer(USER_KEY);

    let request = a.request(&user, common::REGISTRY_ADDRESS, common::register_did_calldata("did:x", "{}"));
    assert_ne!(a.forwarder.digest(&request).unwrap(), b.forwarder.digest(&request).unwrap());

    let sig = a.sign(&user, &request);
    let err = b.forwarder.execute(&request, &sig).unwrap_err();
    assert!(
        matches!(
            err,
            ForwarderError::SignerMismatch { .. } | ForwarderError::InvalidSignature(_)
        ),
        "{err:?}"
    );
    assert_eq!(b.forwarder.get_nonce(user.address()), U256::ZERO);

    assert!(a.forwarder.execute(&request, &sig).unwrap().success);
}

#[test]
fn signature_is_bound_to_the_chain() {
    let mainnet = Deployment::at(1, common::FORWARDER_ADDRESS);
    let devnet = Deployment::at(31337, common::FORWARDER_ADDRESS);
    let user = signer(USER_KEY);

    let request = devnet.request(&user, PROBE, Vec::new());
    let sig = devnet.sign(&user, &request);
    assert!(mainnet.forwarder.execute(&request, &sig).is_err());
}

#[test]
fn signer_must_be_the_declared_sender() {
    let (d, probe) = with_probe();
    let user = signer(USER_KEY);
    let impostor = signer(OTHER_USER_KEY);

    let request = d.request(&user, PROBE, vec![0x01]);
    let sig = d.sign(&impostor, &request);

    assert_eq!(
        d.forwarder.execute(&request, &sig),
        Err(ForwarderError::SignerMismatch {
            declared: user.address(),
            recovered: impostor.address(),
        })
    );
    assert_eq!(d.forwarder.get_nonce(user.address()), U256::ZERO);
    assert_eq!(d.forwarder.get_nonce(impostor.address()), U256::ZERO);
    assert!(probe.calls.lock().is_empty());
}

#[test]
fn malformed_proofs_consume_nothing() {
    let (d, probe) = with_probe();
    let user = signer(USER_KEY);
    let request = d.request(&user, PROBE, vec![0x01]);
    let sig = d.sign(&user, &request);

    assert_eq!(
        d.forwarder.execute(&request, &sig[..64]),
        Err(ForwarderError::InvalidSignature(SignatureError::InvalidLength(64)))
    );
    let mut zeroed = vec![0u8; 65];
    zeroed[64] = 27;
    assert_eq!(
        d.forwarder.execute(&request, &zeroed),
        Err(ForwarderError::InvalidSignature(SignatureError::Malformed))
    );

    assert_eq!(d.forwarder.get_nonce(user.address()), U256::ZERO);
    assert!(probe.calls.lock().is_empty());

    // The original proof is still good.
    assert!(d.forwarder.execute(&request, &sig).unwrap().success);
}

#[test]
fn tampered_request_fails_verification() {
    let (d, _) = with_probe();
    let user = signer(USER_KEY);
    let request = d.request(&user, PROBE, vec![0x01]);
    let sig = d.sign(&user, &request);

    let tampered = minimal_forwarder::ForwardRequest { gas: U256::from(5_000_000u64), ..request };
    assert!(d.forwarder.execute(&tampered, &sig).is_err());
    assert_eq!(d.forwarder.get_nonce(user.address()), U256::ZERO);
}

#[test]
fn oversized_payload_is_an_encoding_error() {
    let (d, _) = with_probe();
    let user = signer(USER_KEY);
    let request = d.request(&user, PROBE, vec![0u8; MAX_DATA_LEN + 1]);

    assert_eq!(
        d.forwarder.execute(&request, &[0u8; 65]),
        Err(ForwarderError::Encoding(EncodingError::DataTooLong {
            len: MAX_DATA_LEN + 1,
            max: MAX_DATA_LEN,
        }))
    );
    assert_eq!(d.forwarder.get_nonce(user.address()), U256::ZERO);
}

#[test]
fn failed_dispatch_still_consumes_the_nonce() {
    let (d, _) = with_probe();
    let user = signer(USER_KEY);
    let request = d.request(&user, PROBE, vec![0xff]);
    let sig = d.sign(&user, &request);

    let result = d.forwarder.execute(&request, &sig).unwrap();
    assert!(!result.success);
    assert_eq!(result.return_data, Bytes::from_static(b"boom"));
    assert_eq!(d.forwarder.get_nonce(user.address()), U256::from(1u8));
    assert!(d.forwarder.execute(&request, &sig).unwrap_err().is_stale_nonce());
}

#[test]
fn unknown_target_is_a_failed_dispatch() {
    let d = Deployment::new();
    let user = signer(USER_KEY);
    let request = d.request(&user, Address::repeat_byte(0x00), vec![0x01]);
    let sig = d.sign(&user, &request);

    let result = d.forwarder.execute(&request, &sig).unwrap();
    assert!(!result.success);
    assert!(result.return_data.is_empty());
    assert_eq!(d.forwarder.get_nonce(user.address()), U256::from(1u8));
}

/// Target that re-submits whatever request it is handed back to the forwarder.
struct Reentrant {
    forwarder: OnceLock<Arc<Forwarder>>,
    replay: OnceLock<(minimal_forwarder::ForwardRequest, Bytes)>,
    inner: parking_lot::Mutex<Option<Result<bool, ForwarderError>>>,
}

impl CallTarget for Reentrant {
    fn call(&self, _call: &AuthenticatedCall) -> Result<Bytes, Revert> {
        if let (Some(forwarder), Some((request, sig))) = (self.forwarder.get(), self.replay.get()) {
            let outcome = forwarder.execute(request, sig).map(|r| r.success);
            *self.inner.lock() = Some(outcome);
        }
        Ok(Bytes::new())
    }
}

#[test]
fn reentrant_replay_sees_the_consumed_nonce() {
    let d = Deployment::new();
    let target_address = Address::repeat_byte(0x4e);
    let target = Arc::new(Reentrant {
        forwarder: OnceLock::new(),
        replay: OnceLock::new(),
        inner: parking_lot::Mutex::new(None),
    });
    d.targets.register(target_address, target.clone()).unwrap();

    let user = signer(USER_KEY);
    let request = d.request(&user, target_address, vec![0x01]);
    let sig = d.sign(&user, &request);
    let _ = target.forwarder.set(d.forwarder.clone());
    let _ = target.replay.set((request.clone(), sig.clone()));

    assert!(d.forwarder.execute(&request, &sig).unwrap().success);

    let inner = target.inner.lock().clone().unwrap();
    assert!(matches!(inner, Err(ForwarderError::NonceMismatch { .. })), "{inner:?}");
    assert_eq!(d.forwarder.get_nonce(user.address()), U256::from(1u8));
}

#[test]
fn concurrent_submissions_of_one_request_execute_once() {
    let (d, probe) = with_probe();
    let user = signer(USER_KEY);
    let request = d.request(&user, PROBE, vec![0x01]);
    let sig = d.sign(&user, &request);
    let executed = AtomicUsize::new(0);
    let stale = AtomicUsize::new(0);

    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| match d.forwarder.execute(&request, &sig) {
                Ok(_) => {
                    executed.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) if e.is_stale_nonce() => {
                    stale.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => panic!("unexpected {e:?}"),
            });
        }
    });

    assert_eq!(executed.load(Ordering::SeqCst), 1);
    assert_eq!(stale.load(Ordering::SeqCst), 7);
    assert_eq!(probe.calls.lock().len(), 1);
}

#[test]
fn distinct_signers_run_in_parallel() {
    let (d, probe) = with_probe();
    let users = [signer(USER_KEY), signer(OTHER_USER_KEY), signer(common::RELAYER_KEY)];

    std::thread::scope(|s| {
        for user in &users {
            let d = &d;
            s.spawn(move || {
                for _ in 0..10 {
                    let request = d.request(user, PROBE, vec![0x01]);
                    let sig = d.sign(user, &request);
                    assert!(d.forwarder.execute(&request, &sig).unwrap().success);
                }
            });
        }
    });

    for user in &users {
        assert_eq!(d.forwarder.get_nonce(user.address()), U256::from(10u8));
    }
    assert_eq!(probe.calls.lock().len(), 30);
}
