//! Session manager: owns the bearer credential and answers who is
//! signed in.
//!
//! The credential is an opaque string whose middle segment carries
//! unsigned, client-decodable identity claims. Decoding here is advisory
//! only - it personalizes the UI. It is never an authorization decision;
//! the backend independently authorizes every call, and a locally
//! decoded role must never gate anything security-relevant.
//!
//! Every decode failure is absorbed into `None`: a malformed credential
//! behaves exactly like an absent one (fail closed).

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use juniper_core::{UserId, UserRole};

use crate::api::AuthService;
use crate::api::types::RegisterForm;
use crate::storage::{StorageArea, keys};

/// Claims embedded in the credential.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionClaims {
    /// Subject: the account's numeric id, as a string.
    pub sub: String,
    pub given_name: String,
    pub family_name: String,
    #[serde(default)]
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub jti: String,
    /// Expiry as epoch seconds.
    pub exp: i64,
    #[serde(default)]
    pub iss: String,
    #[serde(default)]
    pub aud: String,
}

/// Identity projection handed to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: UserId,
    pub name: String,
    pub surname: String,
    pub role: UserRole,
}

/// Owner of the stored credential and its decoded claims.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionManagerInner>,
}

struct SessionManagerInner {
    auth: AuthService,
    store: StorageArea,
}

impl SessionManager {
    /// Create a new session manager over the durable storage area.
    #[must_use]
    pub fn new(auth: AuthService, store: StorageArea) -> Self {
        Self {
            inner: Arc::new(SessionManagerInner { auth, store }),
        }
    }

    /// Decode the stored credential's claims.
    ///
    /// Returns `None` for a missing credential, a malformed structure,
    /// or any decode failure - never an error.
    #[must_use]
    pub fn decode_credential(&self) -> Option<SessionClaims> {
        let token = self.inner.store.get(keys::CREDENTIAL)?;
        decode_claims(&token)
    }

    /// Whether a credential is present and unexpired right now.
    ///
    /// Expiry is checked against the wall clock at the instant of the
    /// call, never cached.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.decode_credential()
            .is_some_and(|claims| claims.exp > Utc::now().timestamp())
    }

    /// The signed-in identity, if any.
    ///
    /// An unknown role claim degrades to the least-privileged role.
    #[must_use]
    pub fn current_identity(&self) -> Option<Identity> {
        let claims = self.decode_credential()?;
        let id = claims.sub.parse::<i32>().ok()?;

        Some(Identity {
            id: UserId::new(id),
            name: claims.given_name,
            surname: claims.family_name,
            role: claims.role.parse().unwrap_or_default(),
        })
    }

    /// Sign in and durably store the returned credential.
    ///
    /// Returns `true` only when the backend handed back a non-empty
    /// credential. Everything else - failure envelope, transport error,
    /// empty token - is `false`; the underlying error never propagates.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> bool {
        match self.inner.auth.login(email, password).await {
            Ok(Some(token)) => {
                if let Err(e) = self.inner.store.set(keys::CREDENTIAL, &token) {
                    tracing::error!(error = %e, "failed to store credential");
                    return false;
                }
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(error = %e, "login failed");
                false
            }
        }
    }

    /// Create an account. Same absorb-all-errors discipline as
    /// [`Self::login`].
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn register(&self, form: &RegisterForm) -> bool {
        match self.inner.auth.register(form).await {
            Ok(created) => created,
            Err(e) => {
                tracing::warn!(error = %e, "registration failed");
                false
            }
        }
    }

    /// Delete the stored credential. Always succeeds.
    pub fn logout(&self) {
        if let Err(e) = self.inner.store.remove(keys::CREDENTIAL) {
            tracing::warn!(error = %e, "failed to delete credential from storage");
        }
    }
}

/// Decode the claims segment of a credential string.
///
/// The segment is base64url without padding on the wire, but credentials
/// that went through standard-alphabet encoders are accepted too.
fn decode_claims(token: &str) -> Option<SessionClaims> {
    let payload = token.split('.').nth(1)?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD.decode(payload))
        .ok()?;

    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn claims_json(exp: i64, role: &str) -> String {
        format!(
            r#"{{"sub":"7","given_name":"Ada","family_name":"Nowak","email":"ada@example.com","role":"{role}","jti":"j1","exp":{exp},"iss":"juniper","aud":"storefront"}}"#
        )
    }

    fn token_with(exp: i64, role: &str) -> String {
        let payload = URL_SAFE_NO_PAD.encode(claims_json(exp, role));
        format!("hdr.{payload}.sig")
    }

    fn manager_with_token(token: Option<&str>) -> SessionManager {
        let store = StorageArea::in_memory();
        if let Some(token) = token {
            store.set(keys::CREDENTIAL, token).unwrap();
        }

        let prompts = crate::fault::PromptHost::detached();
        let api = crate::api::ApiClient::new(
            &crate::config::StorefrontConfig::default(),
            store.clone(),
            prompts,
        )
        .unwrap();

        SessionManager::new(AuthService::new(api), store)
    }

    fn far_future() -> i64 {
        Utc::now().timestamp() + 3600
    }

    #[test]
    fn test_decode_credential_roundtrip() {
        let manager = manager_with_token(Some(&token_with(far_future(), "Admin")));

        let claims = manager.decode_credential().unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.given_name, "Ada");
        assert_eq!(claims.role, "Admin");
    }

    #[test]
    fn test_non_jwt_shaped_credential_fails_closed() {
        for garbage in ["", "no-dots-here", "a.%%%.c", "a.b"] {
            let manager = manager_with_token(Some(garbage));
            assert!(manager.decode_credential().is_none(), "decoded {garbage:?}");
            assert!(!manager.is_authenticated());
        }
    }

    #[test]
    fn test_missing_credential_is_not_authenticated() {
        let manager = manager_with_token(None);
        assert!(manager.decode_credential().is_none());
        assert!(!manager.is_authenticated());
        assert!(manager.current_identity().is_none());
    }

    #[test]
    fn test_expired_credential_is_not_authenticated() {
        let expired = Utc::now().timestamp() - 10;
        let manager = manager_with_token(Some(&token_with(expired, "User")));

        // Decodes fine, but the expiry check fails at time-of-check.
        assert!(manager.decode_credential().is_some());
        assert!(!manager.is_authenticated());
    }

    #[test]
    fn test_current_identity_projection() {
        let manager = manager_with_token(Some(&token_with(far_future(), "Admin")));

        let identity = manager.current_identity().unwrap();
        assert_eq!(identity.id, UserId::new(7));
        assert_eq!(identity.name, "Ada");
        assert_eq!(identity.surname, "Nowak");
        assert_eq!(identity.role, UserRole::Admin);
    }

    #[test]
    fn test_unknown_role_degrades_to_user() {
        let manager = manager_with_token(Some(&token_with(far_future(), "Owner")));
        assert_eq!(manager.current_identity().unwrap().role, UserRole::User);
    }

    #[test]
    fn test_standard_base64_payload_accepted() {
        let payload = STANDARD.encode(claims_json(far_future(), "User"));
        let manager = manager_with_token(Some(&format!("hdr.{payload}.sig")));
        assert!(manager.is_authenticated());
    }

    #[test]
    fn test_logout_deletes_credential() {
        let manager = manager_with_token(Some(&token_with(far_future(), "User")));
        assert!(manager.is_authenticated());

        manager.logout();
        assert!(!manager.is_authenticated());
        assert!(manager.decode_credential().is_none());
    }

    #[test]
    fn test_non_numeric_subject_yields_no_identity() {
        let payload = URL_SAFE_NO_PAD.encode(
            r#"{"sub":"not-a-number","given_name":"A","family_name":"B","role":"User","exp":9999999999}"#,
        );
        let manager = manager_with_token(Some(&format!("hdr.{payload}.sig")));

        assert!(manager.decode_credential().is_some());
        assert!(manager.current_identity().is_none());
    }
}
