use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts, http::StatusCode};
use headers::{authorization::Bearer, Authorization, HeaderMapExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::server_state::ServerState;

const IDENTITY_TOOLKIT_BASE: &str = "https://identitytoolkit.googleapis.com/v1";

/// The signed-in identity as reported by the authentication provider.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct Session {
    pub identity: Identity,
    pub id_token: String,
    pub refresh_token: Option<String>,
}

/// Provider failures, already phrased for the person at the keyboard.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    #[error("Incorrect password. Please try again.")]
    WrongPassword,

    #[error("No account found with this email.")]
    UserNotFound,

    #[error("Too many attempts. Please try again later.")]
    TooManyAttempts,

    #[error("This email is already registered.")]
    EmailInUse,

    #[error("Password is too weak. Use at least 6 characters.")]
    WeakPassword,

    #[error("Please enter a valid email address.")]
    InvalidEmail,

    #[error("This account has been disabled.")]
    UserDisabled,

    #[error("Your session has expired. Please sign in again.")]
    InvalidToken,

    #[error("Network error. Check your connection and try again.")]
    Network,

    #[error("Sign-in failed: {0}")]
    Provider(String),
}

impl AuthError {
    /// Map an Identity Toolkit error message such as `WEAK_PASSWORD : Password should be...`.
    pub fn from_provider_code(message: &str) -> Self {
        let code = message.split(':').next().unwrap_or_default().trim();

        match code {
            "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => AuthError::WrongPassword,
            "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" => AuthError::UserNotFound,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthError::TooManyAttempts,
            "EMAIL_EXISTS" => AuthError::EmailInUse,
            "WEAK_PASSWORD" => AuthError::WeakPassword,
            "INVALID_EMAIL" => AuthError::InvalidEmail,
            "USER_DISABLED" => AuthError::UserDisabled,
            "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "USER_NOT_FOUND_FOR_TOKEN" => {
                AuthError::InvalidToken
            }
            _ => AuthError::Provider(message.to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
            AuthError::EmailInUse => StatusCode::CONFLICT,
            AuthError::WeakPassword | AuthError::InvalidEmail => StatusCode::UNPROCESSABLE_ENTITY,
            AuthError::Network => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Provider(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Session, AuthError>;

    async fn verify(&self, id_token: &str) -> Result<Identity, AuthError>;
}

/// Firebase Authentication through the Identity Toolkit REST API.
pub struct IdentityToolkit {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    error: ProviderError,
}

#[derive(Deserialize)]
struct ProviderError {
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    local_id: String,
    id_token: String,
    refresh_token: Option<String>,
    email: Option<String>,
    display_name: Option<String>,
    profile_picture: Option<String>,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
}

impl IdentityToolkit {
    pub fn new(api_key: &str) -> Self {
        IdentityToolkit {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            base_url: IDENTITY_TOOLKIT_BASE.to_string(),
        }
    }

    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, AuthError> {
        let url = format!("{}/accounts:{}", self.base_url, method);
        let response = self
            .client
            .post(url)
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|error| {
                tracing::warn!(?error, %method, "Identity provider unreachable.");
                AuthError::Network
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let message = match response.json::<ProviderErrorBody>().await {
                Ok(body) => body.error.message,
                Err(_) => status.to_string(),
            };
            tracing::info!(%method, %status, %message, "Identity provider rejected request.");

            return Err(AuthError::from_provider_code(&message));
        }

        response.json().await.map_err(|error| {
            tracing::error!(?error, %method, "Unreadable identity provider response.");
            AuthError::Provider(error.to_string())
        })
    }
}

impl From<TokenResponse> for Session {
    fn from(token: TokenResponse) -> Self {
        Session {
            identity: Identity {
                uid: token.local_id,
                email: token.email,
                display_name: token.display_name,
                photo_url: token.profile_picture,
            },
            id_token: token.id_token,
            refresh_token: token.refresh_token,
        }
    }
}

#[async_trait]
impl AuthProvider for IdentityToolkit {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let token: TokenResponse = self
            .call(
                "signInWithPassword",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;

        Ok(token.into())
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Session, AuthError> {
        let token: TokenResponse = self
            .call(
                "signUp",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;

        let _: serde_json::Value = self
            .call(
                "update",
                json!({ "idToken": token.id_token, "displayName": display_name, "returnSecureToken": false }),
            )
            .await?;

        let mut session = Session::from(token);
        session.identity.display_name = Some(display_name.to_string());

        Ok(session)
    }

    async fn verify(&self, id_token: &str) -> Result<Identity, AuthError> {
        let lookup: LookupResponse = self.call("lookup", json!({ "idToken": id_token })).await?;
        let user = lookup
            .users
            .into_iter()
            .next()
            .ok_or(AuthError::InvalidToken)?;

        Ok(Identity {
            uid: user.local_id,
            email: user.email,
            display_name: user.display_name,
            photo_url: user.photo_url,
        })
    }
}

/// The caller's identity, if a valid bearer token was presented.
///
/// Never rejects: an absent or invalid token is simply an anonymous caller, and
/// the access guard decides what that means for the route.
pub struct Caller(pub Option<Identity>);

#[async_trait]
impl FromRequestParts<ServerState> for Caller {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let token = match parts.headers.typed_get::<Authorization<Bearer>>() {
            Some(Authorization(bearer)) => bearer.token().to_string(),
            None => return Ok(Caller(None)),
        };

        match state.auth.verify(&token).await {
            Ok(identity) => Ok(Caller(Some(identity))),
            Err(error) => {
                tracing::info!(%error, "Ignoring unverifiable bearer token.");
                Ok(Caller(None))
            }
        }
    }
}
