//! Admin GraphQL call execution.
//!
//! - [`GraphqlCall`]: one call's inputs, assembled via its builder
//! - [`execute_graphql`]: runs the call with classification-driven retries
//!   (rate-limit waits, exponential backoff on upstream 5xx, terminal
//!   classification for everything else)

mod client;

pub use client::{
    execute_graphql, GraphqlCall, GraphqlCallBuilder, GraphqlFailure, GraphqlSuccess,
};
