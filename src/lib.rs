//! Chantier: project-scoped construction management client
//!
//! A client for a Supabase-hosted construction management backend. It
//! signs identities in, tracks which projects they can see and which one
//! is current, and tags every expense, deposit, order and supplier link
//! with that project.
//!
//! ```no_run
//! use chantier::prelude::*;
//!
//! # async fn run() -> chantier::error::Result<()> {
//! let client = Chantier::from_env()?;
//! let ctx = SessionContext::start(client).await?;
//! ctx.auth.sign_in("chef@chantier.test", "secret").await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cancel;
pub mod config;
pub mod context;
pub mod directory;
pub mod error;
pub mod fetch;
pub mod functions;
pub mod models;
pub mod postgrest;
pub mod scoped;
pub mod session;
pub mod workflow;

use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;

use crate::auth::{AdminAuth, Auth};
use crate::config::{ChantierConfig, ClientOptions};
use crate::error::{Error, Result};
use crate::functions::FunctionsClient;
use crate::postgrest::{PostgrestClient, RpcBuilder};

/// Handle on the hosted backend
#[derive(Clone)]
pub struct Chantier {
    config: Arc<ChantierConfig>,
    options: ClientOptions,
    http_client: Client,
    auth: Auth,
}

impl Chantier {
    /// Create a new client
    ///
    /// ```
    /// use chantier::{Chantier, config::{ChantierConfig, ClientOptions}};
    ///
    /// let config = ChantierConfig::new("https://your-project.supabase.co", "anon-key").unwrap();
    /// let client = Chantier::new(config, ClientOptions::default()).unwrap();
    /// ```
    pub fn new(config: ChantierConfig, options: ClientOptions) -> Result<Self> {
        let http_client = Client::builder().build()?;
        let auth = Auth::new(
            &config.base_url(),
            &config.anon_key,
            http_client.clone(),
            options.request_timeout,
        );

        Ok(Self {
            config: Arc::new(config),
            options,
            http_client,
            auth,
        })
    }

    /// Create a client from `SUPABASE_URL`, `SUPABASE_ANON_KEY`,
    /// `SUPABASE_SERVICE_ROLE_KEY` and `SITE_URL`
    pub fn from_env() -> Result<Self> {
        Self::new(ChantierConfig::from_env()?, ClientOptions::from_env())
    }

    /// Base URL of the backend, without trailing slash
    pub fn url(&self) -> String {
        self.config.base_url()
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Get a reference to the auth client
    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// Create a PostgrestClient for a table or view
    pub fn from(&self, table: &str) -> PostgrestClient {
        PostgrestClient::new(
            &self.url(),
            &self.config.anon_key,
            table,
            self.http_client.clone(),
        )
        .with_schema(&self.options.db_schema)
        .with_timeout(self.options.request_timeout)
    }

    /// Call a stored procedure
    pub fn rpc<T: Serialize>(&self, function: &str, params: T) -> RpcBuilder<T> {
        RpcBuilder::new(
            &self.url(),
            &self.config.anon_key,
            function,
            params,
            self.http_client.clone(),
        )
    }

    /// Get the Edge Functions client
    pub fn functions(&self) -> FunctionsClient {
        FunctionsClient::new(
            &self.url(),
            &self.config.anon_key,
            self.http_client.clone(),
            self.options.request_timeout,
        )
    }

    /// Privileged client; refused when no service role key is configured
    pub fn admin(&self) -> Result<AdminAuth> {
        let key = self
            .config
            .service_role_key
            .as_deref()
            .ok_or_else(|| Error::missing_config("SUPABASE_SERVICE_ROLE_KEY"))?;

        Ok(AdminAuth::new(
            &self.url(),
            key,
            self.http_client.clone(),
            self.options.request_timeout,
        ))
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::config::{ChantierConfig, ClientOptions};
    pub use crate::context::SessionContext;
    pub use crate::directory::{DirectoryState, LoadOutcome, ProjectDirectory};
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
    pub use crate::scoped::{Scoped, ScopedStore};
    pub use crate::session::{Access, AuthProvider, AuthState};
    pub use crate::Chantier;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_requires_service_key() {
        let config = ChantierConfig::new("http://localhost:54321", "anon").unwrap();
        let client = Chantier::new(config, ClientOptions::default()).unwrap();
        match client.admin() {
            Err(Error::MissingConfiguration(name)) => assert_eq!(name, "SUPABASE_SERVICE_ROLE_KEY"),
            _ => panic!("expected missing configuration"),
        }
    }

    #[test]
    fn url_has_no_trailing_slash() {
        let config = ChantierConfig::new("http://localhost:54321/", "anon").unwrap();
        let client = Chantier::new(config, ClientOptions::default()).unwrap();
        assert_eq!(client.url(), "http://localhost:54321");
    }
}
