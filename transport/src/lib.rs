//! Transports that answer channel requests and form posts.
//!
//! The [`Transport`] trait is the seam between the channel registry and the
//! network: [`HttpTransport`] talks to a real server, tests substitute
//! scripted implementations with controlled latency.

mod http;
pub mod retry;

use std::future::Future;

use serde_json::Value;

use retro_types::{ChannelError, FormParams, RequestKey, ResourceName};

pub use http::{
    DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, HttpTransport, HttpTransportConfig, TransportInitError,
};
pub use retry::RetryConfig;

/// Source of values for channel keys and sink for form posts.
///
/// Failures are reported as [`ChannelError`] and end up as the terminal state
/// of the future the caller is holding; they are never raised synchronously.
pub trait Transport: Send + Sync + 'static {
    /// Fetch the current value for `key`.
    fn fetch(&self, key: &RequestKey) -> impl Future<Output = Result<Value, ChannelError>> + Send;

    /// Post `form` to `resource`. The response body is not consumed.
    fn post(
        &self,
        resource: &ResourceName,
        form: &FormParams,
    ) -> impl Future<Output = Result<(), ChannelError>> + Send;
}
