//! Delivery address endpoints.
//!
//! Addresses are owned by the backend; the client only holds a
//! read-through copy for the duration of a checkout session.

use tracing::instrument;

use juniper_core::UserId;

use super::types::{NewAddress, UserAddress};
use super::{ApiClient, ApiError, Envelope};

/// Client for the address endpoints.
#[derive(Clone)]
pub struct AddressService {
    api: ApiClient,
}

impl AddressService {
    /// Create a new address service.
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Get the addresses saved by a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn for_user(&self, user_id: UserId) -> Result<Vec<UserAddress>, ApiError> {
        let envelope: Envelope<UserAddress> =
            self.api.get(&format!("address/user/{user_id}")).await?;

        Ok(envelope.into_data())
    }

    /// Save a new address.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the created address
    /// is not returned.
    #[instrument(skip(self, address), fields(label = %address.label))]
    pub async fn create(&self, address: &NewAddress) -> Result<UserAddress, ApiError> {
        let envelope: Envelope<UserAddress> =
            self.api.post_json("address/create", address).await?;

        envelope
            .into_first()
            .ok_or_else(|| ApiError::EmptyData("created address not returned".to_string()))
    }
}
