//! Shared types for forwardable requests, their typed-data domain, and the call context a
//! forwarder hands to its targets.

pub mod call;
pub mod domain;
pub mod request;
pub mod typed_data;

pub use call::AuthenticatedCall;
pub use domain::ForwarderDomain;
pub use request::{ExecutionResult, ForwardRequest};
pub use typed_data::{digest, EncodingError, MAX_DATA_LEN};
