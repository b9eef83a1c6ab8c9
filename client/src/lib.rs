//! Blocking-style reads over asynchronous HTTP values.
//!
//! ```ignore
//! let retro = Retro::http(HttpTransportConfig::new("http://localhost:8000/")?)?;
//! retro.post_str("values", "name=pouet&value=pouetvalue");
//!
//! let channel = retro.channel();
//! let delayed = channel.get_str("delayedvalues");
//! let values = channel.get_str("values");
//! println!("{}", values.read().await?);
//! ```
//!
//! `get` and `post` return at once; `read().await` is where a lightweight
//! thread waits. Run several readers on an [`EventLoop`] and each one
//! resumes as soon as its own value arrives.

use std::sync::Arc;

use serde_json::Value;

pub use retro_channel::{AsyncChannel, ChannelOptions, EventLoop, spawn_request};
pub use retro_config::{ConfigError, ResolvedConfig, RetroConfig};
pub use retro_future::{Future, Resolver, promise};
pub use retro_transport::{
    HttpTransport, HttpTransportConfig, RetryConfig, Transport, TransportInitError,
};
pub use retro_types::{
    ChannelError, DedupPolicy, ErrorCode, FormParams, FutureState, KeyError, RequestKey,
    ResourceName,
};

/// Entry point: posts forms and opens channels over one shared transport.
pub struct Retro<T: Transport = HttpTransport> {
    transport: Arc<T>,
    channel_options: ChannelOptions,
}

impl Retro<HttpTransport> {
    pub fn http(config: HttpTransportConfig) -> Result<Self, TransportInitError> {
        Ok(Self::new(HttpTransport::new(config)?))
    }

    pub fn from_config(config: &ResolvedConfig) -> Result<Self, TransportInitError> {
        let transport = HttpTransport::new(config.http.clone())?;
        Ok(Self::new(transport).with_channel_options(config.channel))
    }
}

impl<T: Transport> Retro<T> {
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            channel_options: ChannelOptions::default(),
        }
    }

    /// Options applied to every channel opened afterwards.
    #[must_use]
    pub fn with_channel_options(mut self, options: ChannelOptions) -> Self {
        self.channel_options = options;
        self
    }

    #[must_use]
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Post `form` to `resource` in the background.
    ///
    /// The returned future settles when the server has answered; callers
    /// that do not care may drop it without cancelling the post.
    pub fn post(&self, resource: &ResourceName, form: &FormParams) -> Future<()> {
        let transport = Arc::clone(&self.transport);
        let resource = resource.clone();
        let form = form.clone();
        tracing::debug!(resource = %resource, fields = form.len(), "post issued");

        spawn_request(async move {
            let outcome = transport.post(&resource, &form).await;
            if let Err(err) = &outcome {
                tracing::warn!(
                    resource = %resource,
                    code = %err.code,
                    status = err.status,
                    "post failed: {}",
                    err.message
                );
            }
            outcome
        })
    }

    /// [`post`](Self::post) with an unparsed resource name and
    /// `name=value&...` body. Invalid input yields a failed future.
    pub fn post_str(&self, resource: &str, body: &str) -> Future<()> {
        let resource = match ResourceName::new(resource) {
            Ok(resource) => resource,
            Err(err) => return Future::failed(ChannelError::protocol(err.to_string())),
        };
        match FormParams::parse(body) {
            Ok(form) => self.post(&resource, &form),
            Err(err) => Future::failed(ChannelError::protocol(err.to_string())),
        }
    }

    /// A new channel sharing this client's transport.
    #[must_use]
    pub fn channel(&self) -> AsyncChannel<T> {
        AsyncChannel::new(Arc::clone(&self.transport), self.channel_options)
    }
}

impl<T: Transport> Clone for Retro<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            channel_options: self.channel_options,
        }
    }
}

/// Text shown for a channel value: strings verbatim, anything else as JSON.
#[must_use]
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
