//! Sign-in and registration endpoints.
//!
//! Both endpoints accept browser-style form posts. Sign-in answers with
//! the bearer credential as the single payload item; registration
//! answers with a bare success flag.

use tracing::instrument;

use super::types::RegisterForm;
use super::{ApiClient, ApiError, Envelope};

/// Client for the auth endpoints.
#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    /// Create a new auth service.
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Exchange credentials for a bearer token.
    ///
    /// Returns `Ok(Some(token))` only when the backend reports success
    /// and the token is non-empty after trimming; a failure envelope is
    /// `Ok(None)`, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the request itself fails (transport, parse,
    /// non-success status).
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<String>, ApiError> {
        let form = reqwest::multipart::Form::new()
            .text("email", email.to_owned())
            .text("password", password.to_owned());

        let envelope: Envelope<String> = self.api.post_multipart("auth/login", form).await?;
        Ok(extract_token(envelope))
    }

    /// Create a new account.
    ///
    /// # Errors
    ///
    /// Returns an error if the request itself fails; a rejected
    /// registration is `Ok(false)`.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn register(&self, form: &RegisterForm) -> Result<bool, ApiError> {
        let multipart = reqwest::multipart::Form::new()
            .text("name", form.name.clone())
            .text("surname", form.surname.clone())
            .text("email", form.email.to_string())
            .text("password", form.password.clone())
            .text("dateOfBirth", form.date_of_birth.to_rfc3339());

        let envelope: Envelope<serde_json::Value> =
            self.api.post_multipart("auth/register", multipart).await?;

        Ok(envelope.success)
    }
}

/// Pull a usable token out of the login envelope.
///
/// A failure envelope, an empty payload, or a blank token all count as
/// "no token".
fn extract_token(envelope: Envelope<String>) -> Option<String> {
    if !envelope.success {
        return None;
    }

    envelope
        .into_first()
        .map(|token| token.trim().to_owned())
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn envelope(raw: &str) -> Envelope<String> {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_success_envelope_with_token() {
        let token = extract_token(envelope(
            r#"{"success": true, "data": ["abc.def.ghi"], "status": 200}"#,
        ));
        assert_eq!(token.as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_failure_envelope_yields_no_token() {
        assert_eq!(extract_token(envelope(r#"{"success": false}"#)), None);
        assert_eq!(
            extract_token(envelope(r#"{"success": false, "data": ["abc.def.ghi"]}"#)),
            None
        );
    }

    #[test]
    fn test_blank_token_yields_none() {
        assert_eq!(
            extract_token(envelope(r#"{"success": true, "data": [""]}"#)),
            None
        );
        assert_eq!(
            extract_token(envelope(r#"{"success": true, "data": ["   "]}"#)),
            None
        );
        assert_eq!(
            extract_token(envelope(r#"{"success": true, "data": []}"#)),
            None
        );
    }

    #[test]
    fn test_token_is_trimmed() {
        let token = extract_token(envelope(
            r#"{"success": true, "data": ["  abc.def.ghi  "]}"#,
        ));
        assert_eq!(token.as_deref(), Some("abc.def.ghi"));
    }
}
