//! Signs forward requests the way a wallet would via `eth_signTypedData_v4`.

pub mod signer;

pub use signer::{address_of, parse_signing_key, sign_digest, sign_request, SignError, LocalSigner};
