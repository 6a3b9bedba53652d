//! Configuration for the chantier client

use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};

/// Site used in invitation links when nothing else is configured
pub const DEFAULT_SITE_URL: &str = "http://localhost:3000";

/// Edge Function that delivers invitation notices
pub const DEFAULT_INVITATION_FUNCTION: &str = "send-invitation-email";

/// Connection settings for the hosted backend
#[derive(Debug, Clone)]
pub struct ChantierConfig {
    /// The base URL of the backend project
    pub url: Url,

    /// The public (anonymous) API key
    pub anon_key: String,

    /// The privileged key used by administrative operations
    pub service_role_key: Option<String>,
}

impl ChantierConfig {
    /// Creates a new configuration, validating the URL.
    pub fn new(url_str: &str, anon_key: &str) -> Result<Self> {
        let url = Url::parse(url_str)?;
        if anon_key.is_empty() {
            return Err(Error::missing_config("anon key"));
        }
        Ok(Self {
            url,
            anon_key: anon_key.to_string(),
            service_role_key: None,
        })
    }

    /// Attach the privileged service key
    pub fn with_service_role_key(mut self, key: &str) -> Self {
        self.service_role_key = Some(key.to_string()).filter(|k| !k.is_empty());
        self
    }

    /// Reads `SUPABASE_URL`, `SUPABASE_ANON_KEY` and the optional
    /// `SUPABASE_SERVICE_ROLE_KEY` from the environment.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("SUPABASE_URL").map_err(|_| Error::missing_config("SUPABASE_URL"))?;
        let anon_key =
            std::env::var("SUPABASE_ANON_KEY").map_err(|_| Error::missing_config("SUPABASE_ANON_KEY"))?;

        let config = Self::new(&url, &anon_key)?;
        Ok(match std::env::var("SUPABASE_SERVICE_ROLE_KEY") {
            Ok(key) => config.with_service_role_key(&key),
            Err(_) => config,
        })
    }

    /// Base URL without the trailing slash `Url` adds
    pub fn base_url(&self) -> String {
        self.url.as_str().trim_end_matches('/').to_string()
    }
}

/// Configuration options for the chantier client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// The database schema
    pub db_schema: String,

    /// Public site URL used to build invitation links
    pub site_url: String,

    /// Name of the Edge Function that sends invitation notices
    pub invitation_function: String,

    /// File holding the last selected project; `None` keeps it in memory
    pub selection_file: Option<PathBuf>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(30)),
            db_schema: "public".to_string(),
            site_url: DEFAULT_SITE_URL.to_string(),
            invitation_function: DEFAULT_INVITATION_FUNCTION.to_string(),
            selection_file: None,
        }
    }
}

impl ClientOptions {
    /// Options seeded from `SITE_URL` and `CHANTIER_SELECTION_FILE`
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Ok(site) = std::env::var("SITE_URL") {
            options = options.with_site_url(&site);
        }
        if let Ok(path) = std::env::var("CHANTIER_SELECTION_FILE") {
            options = options.with_selection_file(path);
        }
        options
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the database schema
    pub fn with_db_schema(mut self, value: &str) -> Self {
        self.db_schema = value.to_string();
        self
    }

    /// Set the public site URL
    pub fn with_site_url(mut self, value: &str) -> Self {
        self.site_url = value.trim_end_matches('/').to_string();
        self
    }

    /// Set the invitation Edge Function name
    pub fn with_invitation_function(mut self, value: &str) -> Self {
        self.invitation_function = value.to_string();
        self
    }

    /// Persist the project selection in `path`
    pub fn with_selection_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.selection_file = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_new_valid() {
        let config = ChantierConfig::new("http://localhost:54321", "anon").unwrap();
        assert_eq!(config.base_url(), "http://localhost:54321");
        assert!(config.service_role_key.is_none());
    }

    #[test]
    fn config_new_invalid_url() {
        let config = ChantierConfig::new("not a valid url", "anon");
        assert!(matches!(config, Err(Error::Url(_))));
    }

    #[test]
    fn config_new_empty_key() {
        match ChantierConfig::new("http://localhost:54321", "") {
            Err(Error::MissingConfiguration(name)) => assert_eq!(name, "anon key"),
            other => panic!("expected missing configuration, got {:?}", other),
        }
    }

    #[test]
    fn empty_service_key_is_ignored() {
        let config = ChantierConfig::new("http://localhost:54321", "anon")
            .unwrap()
            .with_service_role_key("");
        assert!(config.service_role_key.is_none());
    }

    #[test]
    fn site_url_drops_trailing_slash() {
        let options = ClientOptions::default().with_site_url("https://chantier.example/");
        assert_eq!(options.site_url, "https://chantier.example");
    }
}
