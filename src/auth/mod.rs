//! Authentication and user management

mod admin;
mod session;
mod types;

use log::{debug, info};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::fetch::Fetch;

pub use admin::*;
pub use session::*;
pub use types::*;

/// Client for the auth service
#[derive(Clone)]
pub struct Auth {
    /// The base URL for the backend project
    url: String,

    /// The anonymous API key
    key: String,

    /// HTTP client used for requests
    client: Client,

    /// The current session
    session: Arc<RwLock<Option<Session>>>,

    timeout: Option<Duration>,
}

impl Auth {
    /// Create a new Auth client
    pub(crate) fn new(url: &str, key: &str, client: Client, timeout: Option<Duration>) -> Self {
        Self {
            url: url.to_string(),
            key: key.to_string(),
            client,
            session: Arc::new(RwLock::new(None)),
            timeout,
        }
    }

    fn get_auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.url, path)
    }

    /// Sign up a new identity with email and password.
    ///
    /// When the project auto-confirms emails a session comes back and is
    /// kept; otherwise only the identity is returned.
    pub async fn sign_up(&self, credentials: &Credentials) -> Result<User> {
        let url = self.get_auth_url("/signup");

        let value = Fetch::post(&self.client, &url)
            .api_key(&self.key)
            .timeout(self.timeout)
            .json(credentials)?
            .execute::<Value>()
            .await?;

        if value.get("access_token").is_some() {
            let session: Session = serde_json::from_value(value)?;
            let user = session.user.clone();
            self.set_session(session).await;
            return Ok(user);
        }

        let user = match value.get("user") {
            Some(user) => serde_json::from_value(user.clone())?,
            None => serde_json::from_value(value)?,
        };
        Ok(user)
    }

    /// Sign in with email and password
    pub async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session> {
        let url = self.get_auth_url("/token");

        let session = Fetch::post(&self.client, &url)
            .api_key(&self.key)
            .timeout(self.timeout)
            .query(&[("grant_type".to_string(), "password".to_string())])
            .json(credentials)?
            .execute::<Session>()
            .await
            .map_err(|err| match err {
                Error::Api { message, .. } => Error::auth(message),
                other => other,
            })?;

        info!("signed in as {}", session.user.id);
        self.set_session(session.clone()).await;
        Ok(session)
    }

    /// Sign out the current identity.
    ///
    /// The local session is dropped even if the server call fails.
    pub async fn sign_out(&self) -> Result<()> {
        let url = self.get_auth_url("/logout");

        let token = match self.session.write().await.take() {
            Some(session) => session.access_token,
            None => return Err(Error::NotAuthenticated),
        };

        Fetch::post(&self.client, &url)
            .api_key(&self.key)
            .bearer_auth(&token)
            .timeout(self.timeout)
            .execute_empty()
            .await?;

        debug!("session revoked");
        Ok(())
    }

    /// Fetch the identity owning the current session
    pub async fn get_user(&self) -> Result<User> {
        let url = self.get_auth_url("/user");
        let token = self.access_token().await.ok_or(Error::NotAuthenticated)?;

        Fetch::get(&self.client, &url)
            .api_key(&self.key)
            .bearer_auth(&token)
            .timeout(self.timeout)
            .execute::<User>()
            .await
    }

    /// Get the current session
    pub async fn get_session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// Set the session
    pub async fn set_session(&self, session: Session) {
        *self.session.write().await = Some(session);
    }

    /// Drop the session without contacting the server
    pub async fn clear_session(&self) {
        *self.session.write().await = None;
    }

    /// Access token of the current session
    pub async fn access_token(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
    }
}
