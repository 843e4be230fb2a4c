//! Admin account-management endpoints.
//!
//! The locally decoded role only decides whether the UI offers these
//! views; the backend authorizes every one of these calls on its own.

use chrono::{DateTime, Utc};
use tracing::instrument;

use juniper_core::UserId;

use super::types::{User, UserUpdate};
use super::{ApiClient, ApiError, Envelope};

/// Client for the user endpoints.
#[derive(Clone)]
pub struct UserService {
    api: ApiClient,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// List every account (admin).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn all(&self) -> Result<Vec<User>, ApiError> {
        let envelope: Envelope<User> = self.api.get("user/all").await?;

        Ok(envelope.into_data())
    }

    /// When the account joined.
    ///
    /// Failures are absorbed to the current time so the profile header
    /// always has something to show; the fault policy side effects (401
    /// prompt etc.) have already fired inside the chokepoint.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn join_date(&self, user_id: UserId) -> DateTime<Utc> {
        let envelope: Result<Envelope<String>, ApiError> =
            self.api.get(&format!("user/{user_id}/joindate")).await;

        match envelope {
            Ok(envelope) if envelope.success => envelope
                .into_first()
                .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
                .map_or_else(Utc::now, |date| date.with_timezone(&Utc)),
            Ok(_) => Utc::now(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch join date");
                Utc::now()
            }
        }
    }

    /// Update an account (admin). Returns the backend's success flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, update), fields(user_id = %user_id))]
    pub async fn update(&self, user_id: UserId, update: &UserUpdate) -> Result<bool, ApiError> {
        let envelope: Envelope<serde_json::Value> = self
            .api
            .put_json(&format!("user/update/{user_id}"), update)
            .await?;

        Ok(envelope.success)
    }

    /// Delete an account (admin). Returns the backend's success flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn delete(&self, user_id: UserId) -> Result<bool, ApiError> {
        let envelope: Envelope<serde_json::Value> =
            self.api.delete(&format!("user/{user_id}")).await?;

        Ok(envelope.success)
    }
}
