//! Account endpoints: register, login, logout, profile.
//!
//! Login persists both session credentials through the injected store;
//! logout removes them again. Everything else rides on the pipeline's
//! transparent renewal.

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::api::{unwrap_data, unwrap_message, StorefrontClient};
use crate::errors::ClientError;
use crate::security::credentials::{CredentialStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::transport::RequestDescriptor;

/// Credential pair returned by the login endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionTokens {
    #[serde(rename = "accesstoken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

/// Logged-in user's profile.
#[derive(Debug, Clone, Deserialize)]
pub struct UserDetails {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub mobile: Option<serde_json::Value>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl StorefrontClient {
    /// Create an account. The backend sends a verification mail; nothing
    /// is persisted client-side.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<String, ClientError> {
        let request = RequestDescriptor::post("/api/user/register").json(json!({
            "name": name,
            "email": email,
            "password": password,
        }));
        let message = unwrap_message(self.pipeline().send(request).await?)?;
        info!(email = %email, "account registered");
        Ok(message)
    }

    /// Authenticate and persist both session credentials.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), ClientError> {
        let request = RequestDescriptor::post("/api/user/login").json(json!({
            "email": email,
            "password": password,
        }));
        let tokens: SessionTokens = unwrap_data(self.pipeline().send(request).await?)?;

        self.storage().set(ACCESS_TOKEN_KEY, &tokens.access_token);
        self.storage().set(REFRESH_TOKEN_KEY, &tokens.refresh_token);
        info!(email = %email, "logged in, session credentials stored");
        Ok(())
    }

    /// End the session server-side and clear stored credentials.
    ///
    /// Credentials are cleared even when the backend call fails: a stale
    /// local session is worse than an unacknowledged logout.
    pub async fn logout(&self) -> Result<String, ClientError> {
        let result = self.pipeline().send(RequestDescriptor::get("/api/user/logout")).await;

        self.storage().remove(ACCESS_TOKEN_KEY);
        self.storage().remove(REFRESH_TOKEN_KEY);
        debug!("session credentials cleared");

        unwrap_message(result?)
    }

    /// Fetch the logged-in user's profile.
    pub async fn user_details(&self) -> Result<UserDetails, ClientError> {
        let request = RequestDescriptor::get("/api/user/user-details");
        unwrap_data(self.pipeline().send(request).await?)
    }
}
