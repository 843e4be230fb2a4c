//! Order endpoints: history reads and the single-shot submission.

use tracing::instrument;

use juniper_core::UserId;

use super::types::{Order, OrderSubmission};
use super::{ApiClient, ApiError, Envelope};

/// Client for the order endpoints.
#[derive(Clone)]
pub struct OrderService {
    api: ApiClient,
}

impl OrderService {
    /// Create a new order service.
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Get a user's order history.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn for_user(&self, user_id: UserId) -> Result<Vec<Order>, ApiError> {
        let envelope: Envelope<Order> = self.api.get(&format!("order/user/{user_id}")).await?;

        Ok(envelope.into_data())
    }

    /// Submit an order.
    ///
    /// Called exactly once per checkout confirmation; retries are a
    /// repeated user action, never automatic.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the created order is
    /// not returned.
    #[instrument(skip(self, submission), fields(user_id = %submission.user_id))]
    pub async fn create(&self, submission: &OrderSubmission) -> Result<Order, ApiError> {
        let envelope: Envelope<Order> = self.api.post_json("order/create", submission).await?;

        envelope
            .into_first()
            .ok_or_else(|| ApiError::EmptyData("created order not returned".to_string()))
    }
}
