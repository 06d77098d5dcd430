//! Boundary HTTP types.
//!
//! - [`RequestEnvelope`] / [`ResponseEnvelope`]: framework-agnostic request
//!   and response values consumed and produced by every verifier
//! - [`HttpAttempt`]: ordered per-attempt trace entries for operations that
//!   call the network

mod attempt;
mod envelope;

pub use attempt::{HttpAttempt, RequestSnapshot, ResponseSnapshot};
pub use envelope::{RequestEnvelope, RequestEnvelopeBuilder, ResponseEnvelope};

pub(crate) use envelope::decode_component;
