//! Backend REST API clients.
//!
//! # Architecture
//!
//! - The backend is the source of truth - no local sync, direct API calls
//! - Every outbound request flows through [`ApiClient`], the single
//!   chokepoint that attaches the bearer credential and applies the
//!   fault policy (credential rejection and forbidden responses escalate
//!   to app-wide prompts; the error still reaches the caller)
//! - Catalog reads are cached in-memory via `moka` (5 minute TTL)
//!
//! # Services
//!
//! - [`AuthService`] - sign-in and registration
//! - [`CatalogService`] - products, suggestions, categories
//! - [`AddressService`] - delivery addresses
//! - [`OrderService`] - order history and submission
//! - [`UserService`] - admin account management

mod addresses;
mod auth;
mod catalog;
mod orders;
pub mod types;
mod users;

pub use addresses::AddressService;
pub use auth::AuthService;
pub use catalog::CatalogService;
pub use orders::OrderService;
pub use users::UserService;

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::StorefrontConfig;
use crate::fault::PromptHost;
use crate::storage::{StorageArea, keys};

/// Errors that can occur when calling the backend API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be parsed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The stored credential was rejected (401 with a token-related
    /// reason). The credential has already been deleted and the
    /// session-expired prompt raised.
    #[error("session expired: {0}")]
    SessionExpired(String),

    /// The operation is forbidden for this account (403). The
    /// not-authorized prompt has already been raised.
    #[error("not authorized: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend reported success but returned no payload where one
    /// was required.
    #[error("empty response data: {0}")]
    EmptyData(String),

    /// Any other non-success response.
    #[error("API error {status}: {title}")]
    Api {
        status: u16,
        title: String,
        detail: String,
    },
}

/// The backend's uniform response envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::Deserialize<'de>"))]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub data: Vec<T>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub status: i32,
    #[serde(default)]
    pub instance: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(rename = "type", default)]
    pub problem_type: String,
}

impl<T> Envelope<T> {
    /// The payload items (empty on failure envelopes).
    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// The first payload item, if any.
    pub fn into_first(self) -> Option<T> {
        self.data.into_iter().next()
    }
}

// =============================================================================
// Fault classification
// =============================================================================

/// Markers in a 401 reason phrase that identify a credential problem.
const CREDENTIAL_REJECTION_MARKERS: &[&str] = &["token", "invalid", "expired"];

#[derive(Debug, PartialEq, Eq)]
enum FaultKind {
    /// 401 with a token-related reason phrase.
    CredentialRejected,
    /// 403 flagged Forbidden.
    Forbidden,
    /// Everything else.
    Other,
}

/// Decide whether a non-success response escalates to an app-wide prompt.
fn classify_failure(status: u16, title: &str, detail: &str) -> FaultKind {
    match status {
        401 => {
            let reason = format!("{title} {detail}").to_lowercase();
            if CREDENTIAL_REJECTION_MARKERS
                .iter()
                .any(|marker| reason.contains(marker))
            {
                FaultKind::CredentialRejected
            } else {
                FaultKind::Other
            }
        }
        403 if title.eq_ignore_ascii_case("forbidden") => FaultKind::Forbidden,
        _ => FaultKind::Other,
    }
}

/// Reason fields of a failure body, tolerant of any envelope shape.
#[derive(Debug, Default, Deserialize)]
struct ProblemReport {
    #[serde(default)]
    title: String,
    #[serde(default)]
    detail: String,
}

// =============================================================================
// ApiClient
// =============================================================================

/// HTTP chokepoint for every backend call.
///
/// Attaches the stored bearer credential before send and applies the
/// fault policy on every non-success response. Cheaply cloneable.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: String,
    credentials: StorageArea,
    prompts: PromptHost,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// `credentials` is the durable area holding the bearer credential;
    /// the client reads it fresh on every request and deletes it when
    /// the backend rejects it.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client fails to build.
    pub fn new(
        config: &StorefrontConfig,
        credentials: StorageArea,
        prompts: PromptHost,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url: config.api_base_url.as_str().trim_end_matches('/').to_string(),
                credentials,
                prompts,
            }),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'))
    }

    /// The stored bearer credential, if any.
    fn stored_credential(&self) -> Option<SecretString> {
        self.inner
            .credentials
            .get(keys::CREDENTIAL)
            .map(SecretString::from)
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Envelope<T>, ApiError> {
        let request = self.inner.http.get(self.endpoint(path));
        self.execute(request).await
    }

    pub(crate) async fn post_json<T: DeserializeOwned, B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Envelope<T>, ApiError> {
        let request = self.inner.http.post(self.endpoint(path)).json(body);
        self.execute(request).await
    }

    pub(crate) async fn put_json<T: DeserializeOwned, B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Envelope<T>, ApiError> {
        let request = self.inner.http.put(self.endpoint(path)).json(body);
        self.execute(request).await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Envelope<T>, ApiError> {
        let request = self.inner.http.delete(self.endpoint(path));
        self.execute(request).await
    }

    pub(crate) async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<Envelope<T>, ApiError> {
        let request = self.inner.http.post(self.endpoint(path)).multipart(form);
        self.execute(request).await
    }

    /// Send a request through the fault policy.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Envelope<T>, ApiError> {
        // Before send: attach the credential if one is stored.
        let request = match self.stored_credential() {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(self.fault(status.as_u16(), &body));
        }

        let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "failed to parse API response envelope"
            );
            ApiError::Parse(e)
        })?;

        Ok(envelope)
    }

    /// Apply the fault policy to a non-success response and produce the
    /// error handed back to the caller.
    fn fault(&self, status: u16, body: &str) -> ApiError {
        let report: ProblemReport = serde_json::from_str(body).unwrap_or_default();

        match classify_failure(status, &report.title, &report.detail) {
            FaultKind::CredentialRejected => {
                // The credential is dead; forget it before prompting so a
                // retry from the prompt starts clean.
                if let Err(e) = self.inner.credentials.remove(keys::CREDENTIAL) {
                    tracing::warn!(error = %e, "failed to delete rejected credential");
                }
                self.inner.prompts.show_session_expired();
                ApiError::SessionExpired(reason_of(&report, status))
            }
            FaultKind::Forbidden => {
                self.inner.prompts.show_not_authorized();
                ApiError::Forbidden(reason_of(&report, status))
            }
            FaultKind::Other => ApiError::Api {
                status,
                title: report.title,
                detail: report.detail,
            },
        }
    }
}

fn reason_of(report: &ProblemReport, status: u16) -> String {
    if report.detail.is_empty() {
        if report.title.is_empty() {
            format!("HTTP {status}")
        } else {
            report.title.clone()
        }
    } else {
        report.detail.clone()
    }
}
