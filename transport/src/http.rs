//! reqwest-backed transport.
//!
//! Keys and resource names are resolved as paths relative to a base URL:
//! `get("values")` against `http://host/app/` requests `http://host/app/values`.

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Client, Response, redirect};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use retro_types::{ChannelError, FormParams, RequestKey, ResourceName};

use crate::Transport;
use crate::retry::{RetryConfig, RetryOutcome, error_from_reqwest, send_with_retry};

pub const DEFAULT_USER_AGENT: &str = concat!("retro/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Error)]
pub enum TransportInitError {
    #[error("invalid base URL {url:?}: {reason}")]
    BaseUrl { url: String, reason: String },
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    base_url: Url,
    pub timeout: Duration,
    pub user_agent: String,
    pub retry: RetryConfig,
}

impl HttpTransportConfig {
    /// Parse and normalize `base_url`. Only `http` and `https` are accepted.
    pub fn new(base_url: &str) -> Result<Self, TransportInitError> {
        let base_url = normalize_base_url(base_url)?;
        Ok(Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry: RetryConfig::default(),
        })
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

fn normalize_base_url(raw: &str) -> Result<Url, TransportInitError> {
    let invalid = |reason: String| TransportInitError::BaseUrl {
        url: raw.to_string(),
        reason,
    };

    let mut url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    if url.cannot_be_a_base() {
        return Err(invalid("URL cannot be a base".to_string()));
    }
    url.set_query(None);
    url.set_fragment(None);
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// HTTP implementation of [`Transport`].
///
/// GETs follow redirects. POSTs do not: the server answers a form post by
/// bouncing back to the referring page, and that page is not the result.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    post_client: Client,
    config: HttpTransportConfig,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self, TransportInitError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        let post_client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            post_client,
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    /// Resolve `path` against the base URL. The result must stay on the
    /// base URL's origin and under its path.
    fn url_for(&self, path: &str) -> Result<Url, ChannelError> {
        let base = &self.config.base_url;
        let url = base.join(path).map_err(|e| {
            ChannelError::protocol(format!("cannot resolve {path:?} against {base}: {e}"))
        })?;
        if url.origin() != base.origin() || !url.path().starts_with(base.path()) {
            tracing::warn!(path, resolved = %url, "rejected path outside the base URL");
            return Err(ChannelError::protocol(format!(
                "{path:?} resolves to {url}, outside {base}"
            )));
        }
        Ok(url)
    }

    async fn get_value(&self, key: &RequestKey) -> Result<Value, ChannelError> {
        let url = self.url_for(key.as_str())?;
        tracing::debug!(key = %key, url = %url, "GET");

        let timeout = self.config.timeout;
        let response = send_with_retry(
            || self.client.get(url.clone()).timeout(timeout),
            &self.config.retry,
        )
        .await
        .into_result()
        .await?;

        decode_value(response).await
    }

    async fn post_form(&self, resource: &ResourceName, form: &FormParams) -> Result<(), ChannelError> {
        let url = self.url_for(resource.as_str())?;
        let body = form.encode();
        tracing::debug!(resource = %resource, url = %url, fields = form.len(), "POST");

        let timeout = self.config.timeout;
        let outcome = send_with_retry(
            || {
                self.post_client
                    .post(url.clone())
                    .header(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE))
                    .body(body.clone())
                    .timeout(timeout)
            },
            &self.config.retry,
        )
        .await;

        match outcome {
            RetryOutcome::HttpError(response) if response.status().is_redirection() => {
                tracing::trace!(status = %response.status(), "POST bounced");
                Ok(())
            }
            other => other.into_result().await.map(|_| ()),
        }
    }
}

impl Transport for HttpTransport {
    async fn fetch(&self, key: &RequestKey) -> Result<Value, ChannelError> {
        self.get_value(key).await
    }

    async fn post(&self, resource: &ResourceName, form: &FormParams) -> Result<(), ChannelError> {
        self.post_form(resource, form).await
    }
}

/// Decode a successful response into a value.
///
/// JSON content types are parsed (a malformed body is a protocol error);
/// anything else is returned as a string.
async fn decode_value(response: Response) -> Result<Value, ChannelError> {
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(is_json_content_type);

    let body = response.text().await.map_err(|e| error_from_reqwest(&e))?;

    if is_json {
        serde_json::from_str(&body)
            .map_err(|e| ChannelError::protocol(format!("invalid JSON in response body: {e}")))
    } else {
        Ok(Value::String(body))
    }
}

fn is_json_content_type(value: &str) -> bool {
    let mime = value.split(';').next().unwrap_or_default().trim();
    mime.eq_ignore_ascii_case("application/json")
        || mime
            .rsplit_once('+')
            .is_some_and(|(_, suffix)| suffix.eq_ignore_ascii_case("json"))
}
