//! Storefront backend HTTP transport.
//!
//! [`ApiClient`] is the raw transport: it builds URLs, attaches the bearer
//! token, and turns responses into typed results. It applies no 401 policy.
//! Page-level calls go through [`crate::gateway::RequestGateway`], which adds
//! recovery on top; the session manager uses the transport directly for its
//! own auth endpoints and for the recovery fetch itself.
//!
//! # Endpoints
//!
//! - `POST /auth/login` - email/password login → `{token, user}`
//! - `POST /auth/register` - account creation → `{message}`
//! - `GET /auth/confirm?token=` - email confirmation → `{message}`
//! - `POST /auth/logout` - best-effort server-side logout
//! - `GET /user/me` - current profile, 401 when the token is rejected
//! - `PUT /user/profile` - profile update
//! - `GET /user/orders` - order history
//! - `POST /orders` - order submission → `{orderId}`

pub mod types;

pub use types::*;

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::instrument;
use url::Url;
use uuid::Uuid;

use vdiamond_core::{BearerToken, UserProfile};

use crate::config::StorefrontClientConfig;

/// Path of the profile endpoint, also used for 401 recovery.
pub const PROFILE_PATH: &str = "/user/me";

/// Longest backend error text kept in a [`GatewayError::Status`].
const MAX_ERROR_TEXT: usize = 200;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request never produced a response (DNS, connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A request path could not be resolved against the base URL.
    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A body could not be encoded or a response could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend answered 401 and no recovery was attempted.
    #[error("unauthorized")]
    Unauthorized,

    /// The backend answered 401 and the session could not be recovered.
    /// Credentials have been cleared.
    #[error("session expired")]
    SessionExpired,

    /// Any other non-2xx response.
    #[error("backend returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Backend-provided error text, if any.
        message: String,
    },
}

impl GatewayError {
    /// Whether this is a 401 outcome (recovered or not).
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::SessionExpired)
    }

    /// Whether the failure is on the network or server side and may succeed
    /// on a later attempt.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// A message suitable for showing to the shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Http(_) => "Could not reach the store. Check your connection and try again.".to_string(),
            Self::Unauthorized => "Please sign in to continue.".to_string(),
            Self::SessionExpired => "Your session has expired. Please sign in again.".to_string(),
            Self::Status { status, .. } if *status >= 500 => {
                "The store is having trouble right now. Please try again shortly.".to_string()
            }
            Self::Status { message, .. } if !message.is_empty() => message.clone(),
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }
}

/// One outgoing backend call.
///
/// Carries the "already retried" flag that bounds 401 recovery to a single
/// resubmission per original call. The request id is preserved across the
/// resubmission so both attempts correlate in logs.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    request_id: Uuid,
    retried: bool,
}

impl PendingRequest {
    /// A request with no body.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            request_id: Uuid::new_v4(),
            retried: false,
        }
    }

    /// `GET path`.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// `DELETE path`.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// `POST path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be serialized.
    pub fn post<B: Serialize + ?Sized>(path: impl Into<String>, body: &B) -> Result<Self, GatewayError> {
        Self::new(Method::POST, path).with_json(body)
    }

    /// `PUT path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be serialized.
    pub fn put<B: Serialize + ?Sized>(path: impl Into<String>, body: &B) -> Result<Self, GatewayError> {
        Self::new(Method::PUT, path).with_json(body)
    }

    /// Append a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_owned(), value.to_owned()));
        self
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be serialized.
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, GatewayError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub const fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Whether this call has already been resubmitted after a 401.
    #[must_use]
    pub const fn is_retried(&self) -> bool {
        self.retried
    }

    /// Mark the call as resubmitted.
    #[must_use]
    pub fn into_retry(mut self) -> Self {
        self.retried = true;
        self
    }
}

/// Raw HTTP transport to the storefront backend.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &StorefrontClientConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_url.clone(),
            }),
        })
    }

    /// Resolve a request path against the base URL.
    ///
    /// Paths are always relative to the API root, with or without a
    /// leading slash.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be joined.
    pub fn url(&self, path: &str) -> Result<Url, GatewayError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Send `request` once, attaching `token` as a bearer credential.
    ///
    /// Returns the response whatever its status.
    ///
    /// # Errors
    ///
    /// Returns an error only if no response was received.
    #[instrument(skip(self, request, token), fields(
        method = %request.method(),
        path = request.path(),
        request_id = %request.request_id(),
        retried = request.is_retried(),
    ))]
    pub async fn execute(
        &self,
        request: &PendingRequest,
        token: Option<&BearerToken>,
    ) -> Result<reqwest::Response, GatewayError> {
        let mut url = self.url(request.path())?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }

        let mut builder = self
            .inner
            .client
            .request(request.method().clone(), url)
            .header("X-Request-Id", request.request_id().to_string());

        if let Some(token) = token {
            builder = builder.bearer_auth(token.expose());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        tracing::debug!(status = response.status().as_u16(), "backend responded");
        Ok(response)
    }

    /// Send `request` once and decode the response.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unauthorized`] on 401, [`GatewayError::Status`]
    /// on any other non-2xx, and transport or decode errors otherwise.
    pub async fn send<T: DeserializeOwned>(
        &self,
        request: &PendingRequest,
        token: Option<&BearerToken>,
    ) -> Result<T, GatewayError> {
        let response = self.execute(request, token).await?;
        decode(response).await
    }

    /// Fetch the profile for `token`, bypassing any 401 policy.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unauthorized`] when the token is rejected.
    pub async fn fetch_profile(&self, token: &BearerToken) -> Result<UserProfile, GatewayError> {
        self.send(&PendingRequest::get(PROFILE_PATH), Some(token)).await
    }
}

/// Decode a backend response.
///
/// An empty 2xx body decodes as JSON `null`, so `()` and `Option<T>` work
/// for endpoints that return nothing.
///
/// # Errors
///
/// See [`ApiClient::send`].
pub async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GatewayError> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED {
        return Err(GatewayError::Unauthorized);
    }

    let bytes = response.bytes().await?;

    if !status.is_success() {
        return Err(GatewayError::Status {
            status: status.as_u16(),
            message: error_message(&bytes),
        });
    }

    let body: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        &bytes
    };
    Ok(serde_json::from_slice(body)?)
}

/// Pull a human-readable message out of an error body.
fn error_message(bytes: &[u8]) -> String {
    if let Ok(body) = serde_json::from_slice::<ErrorBody>(bytes)
        && let Some(message) = body.error.or(body.message)
    {
        return message;
    }

    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    if text.len() <= MAX_ERROR_TEXT {
        return text.to_string();
    }
    let mut end = MAX_ERROR_TEXT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", text.get(..end).unwrap_or_default())
}
