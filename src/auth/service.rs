//! Login, registration and session bootstrap on top of [`ApiClient`].

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};

use crate::auth::types::{AuthError, LoginOutcome, RegisterRequest};
use crate::http::ApiClient;
use crate::session::UserProfile;

pub struct AuthService {
    client: Arc<ApiClient>,
}

impl AuthService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    /// Email/password login.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let path = self.client.config().endpoints.login.clone();
        self.sign_in(&path, json!({ "email": email, "password": password }), "Invalid credentials")
            .await
    }

    /// Google sign-in with an ID token obtained by the caller.
    pub async fn google_login(&self, id_token: &str) -> Result<LoginOutcome, AuthError> {
        let path = self.client.config().endpoints.google_login.clone();
        self.sign_in(&path, json!({ "id_token": id_token }), "Google Login failed")
            .await
    }

    /// Register a patient account. Returns the server's confirmation message.
    pub async fn register(&self, request: &RegisterRequest) -> Result<String, AuthError> {
        self.client.fetch_csrf_token().await;

        if request.password != request.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }

        let path = &self.client.config().endpoints.register;
        let response = self
            .client
            .post(path, request)
            .await
            .map_err(|e| AuthError::from_api(e, "Registration failed"))?;

        let body: Value = response.json().unwrap_or(Value::Null);
        let message = message_or(&body, "Registration successful");
        tracing::info!(email = %request.email, "Registration accepted");
        Ok(message)
    }

    /// Log out. See [`ApiClient::logout`].
    pub async fn logout(&self, redirect: bool) {
        self.client.logout(redirect).await;
    }

    /// Fetch the signed-in user's profile and cache it.
    ///
    /// On failure the cached profile is cleared.
    pub async fn fetch_profile(&self) -> Result<UserProfile, AuthError> {
        let path = format!(
            "{}?_={}",
            self.client.config().endpoints.profile,
            cache_buster()
        );

        let result = async {
            let response = self.client.get(&path).await?;
            let body: Value = response.json()?;
            let profile: UserProfile = serde_json::from_value(body.clone())
                .map_err(crate::http::ApiError::from)?;
            if let Err(e) = self.client.profile().set(&body) {
                tracing::warn!(error = %e, "Failed to cache profile");
            }
            Ok::<_, AuthError>(profile)
        }
        .await;

        match result {
            Ok(profile) => {
                tracing::info!(user_id = ?profile.id, role = ?profile.role, "User profile fetched");
                Ok(profile)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Profile fetch failed; clearing cached profile");
                self.client.profile().clear();
                Err(e)
            }
        }
    }

    /// Bootstrap authentication state at startup.
    ///
    /// Every step is best-effort. Returns the signed-in user, if any.
    pub async fn initialize(&self) -> Option<UserProfile> {
        self.client.fetch_csrf_token().await;

        // Reading drops an unparsable cached blob
        if let Some(cached) = self.client.profile().get() {
            tracing::info!(user_id = ?cached.id, "Restored cached user profile");
        }

        if !self.client.refresh_session().await {
            tracing::debug!("Silent refresh at startup was denied");
        }

        match self.fetch_profile().await {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::info!(error = %e, "No authenticated user");
                None
            }
        }
    }

    /// The cached user profile.
    pub fn current_user(&self) -> Option<UserProfile> {
        self.client.profile().get()
    }

    async fn sign_in(
        &self,
        path: &str,
        payload: Value,
        fallback: &str,
    ) -> Result<LoginOutcome, AuthError> {
        self.client.fetch_csrf_token().await;

        let response = self
            .client
            .post(path, &payload)
            .await
            .map_err(|e| AuthError::from_api(e, fallback))?;
        let body: Value = response.json()?;

        if let Err(e) = self.client.profile().set(&body) {
            tracing::warn!(error = %e, "Failed to cache profile after login");
        }

        let outcome = LoginOutcome {
            message: message_or(&body, "Login successful"),
            role: body.get("role").and_then(Value::as_str).map(str::to_string),
        };
        tracing::info!(role = ?outcome.role, "Login successful");
        Ok(outcome)
    }
}

fn message_or(body: &Value, fallback: &str) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_string()
}

fn cache_buster() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;

    fn offline_service() -> AuthService {
        let mut config = ClientConfig::default();
        config.api.base_url = "http://127.0.0.1:1/auth/".into();
        config.api.connect_timeout_secs = 1;
        config.api.system_proxy = false;
        AuthService::new(Arc::new(ApiClient::new(config).unwrap()))
    }

    #[tokio::test]
    async fn test_register_rejects_mismatched_passwords() {
        let service = offline_service();
        let request = RegisterRequest {
            email: "p@clinic.test".into(),
            password: "secret-1".into(),
            confirm_password: "secret-2".into(),
            ..Default::default()
        };

        let err = service.register(&request).await.unwrap_err();
        assert!(matches!(err, AuthError::PasswordMismatch));
    }

    #[tokio::test]
    async fn test_current_user_reads_cache() {
        let service = offline_service();
        assert!(service.current_user().is_none());

        service
            .client()
            .profile()
            .set(&json!({"id": 5, "role": "receptionist"}))
            .unwrap();
        assert_eq!(service.current_user().unwrap().id, Some(5));
    }

    #[test]
    fn test_message_fallback() {
        assert_eq!(message_or(&json!({"message": "Welcome"}), "x"), "Welcome");
        assert_eq!(message_or(&json!({}), "Login successful"), "Login successful");
    }
}
