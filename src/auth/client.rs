//! Email/password authentication adapter
//!
//! Talks to the Identity Toolkit REST API. The service is opaque to the
//! rest of the crate: sign-in and sign-up either produce an authenticated
//! session or a typed failure the UI can show.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API base URL
const API_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CredentialsRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

/// An authenticated user session
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    /// Bearer token for subsequent API calls
    pub id_token: String,

    /// Token used to refresh the session
    pub refresh_token: String,

    /// Stable user ID
    pub local_id: String,

    pub email: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Errors from the authentication layer
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account with this email already exists")]
    EmailInUse,

    #[error("password is too weak: {0}")]
    WeakPassword(String),

    #[error("request failed: {0}")]
    Network(String),

    #[error("authentication service error: {0}")]
    Api(String),

    #[error("failed to parse authentication response: {0}")]
    Parse(String),
}

/// Client for email/password sign-in and sign-up.
pub struct AuthClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AuthClient {
    /// Create a client with the project's API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: API_BASE_URL.to_string(),
        }
    }

    /// Override the API base URL (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sign an existing user in.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        self.request("accounts:signInWithPassword", email, password)
            .await
    }

    /// Create a new account.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        self.request("accounts:signUp", email, password).await
    }

    async fn request(
        &self,
        endpoint: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let url = format!("{}/{}?key={}", self.base_url, endpoint, self.api_key);

        let response = self
            .client
            .post(&url)
            .json(&CredentialsRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let code = response
                .json::<ApiErrorResponse>()
                .await
                .map(|body| body.error.message)
                .unwrap_or_else(|_| format!("HTTP {status}"));
            tracing::debug!("Authentication rejected: {}", code);
            return Err(Self::map_error_code(code));
        }

        response
            .json::<AuthSession>()
            .await
            .map_err(|e| AuthError::Parse(e.to_string()))
    }

    /// The service reports machine-readable codes, sometimes suffixed with
    /// details (`WEAK_PASSWORD : Password should be at least 6 characters`).
    fn map_error_code(code: String) -> AuthError {
        if code.starts_with("EMAIL_EXISTS") {
            AuthError::EmailInUse
        } else if code.starts_with("EMAIL_NOT_FOUND")
            || code.starts_with("INVALID_PASSWORD")
            || code.starts_with("INVALID_LOGIN_CREDENTIALS")
        {
            AuthError::InvalidCredentials
        } else if code.starts_with("WEAK_PASSWORD") {
            AuthError::WeakPassword(code)
        } else {
            AuthError::Api(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn error_codes_map_to_typed_failures() {
        assert!(matches!(
            AuthClient::map_error_code("EMAIL_EXISTS".into()),
            AuthError::EmailInUse
        ));
        assert!(matches!(
            AuthClient::map_error_code("INVALID_LOGIN_CREDENTIALS".into()),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            AuthClient::map_error_code(
                "WEAK_PASSWORD : Password should be at least 6 characters".into()
            ),
            AuthError::WeakPassword(_)
        ));
        assert!(matches!(
            AuthClient::map_error_code("TOO_MANY_ATTEMPTS_TRY_LATER".into()),
            AuthError::Api(_)
        ));
    }

    #[tokio::test]
    async fn sign_in_returns_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accounts:signInWithPassword"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "idToken": "token-123",
                "refreshToken": "refresh-456",
                "localId": "user-789",
                "email": "me@example.com"
            })))
            .mount(&server)
            .await;

        let client = AuthClient::new("project-key").with_base_url(server.uri());
        let session = client.sign_in("me@example.com", "hunter22").await.unwrap();

        assert_eq!(session.id_token, "token-123");
        assert_eq!(session.local_id, "user-789");
        assert_eq!(session.email, "me@example.com");
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accounts:signInWithPassword"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "message": "INVALID_LOGIN_CREDENTIALS" }
            })))
            .mount(&server)
            .await;

        let client = AuthClient::new("project-key").with_base_url(server.uri());
        let err = client.sign_in("me@example.com", "nope").await.unwrap_err();

        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn duplicate_sign_up_is_email_in_use() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accounts:signUp"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "message": "EMAIL_EXISTS" }
            })))
            .mount(&server)
            .await;

        let client = AuthClient::new("project-key").with_base_url(server.uri());
        let err = client
            .sign_up("me@example.com", "hunter22")
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::EmailInUse));
    }
}
