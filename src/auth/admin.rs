//! Privileged identity operations, authorized by the service role key

use log::info;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use super::{InviteOptions, User};
use crate::error::Result;
use crate::fetch::Fetch;
use crate::postgrest::PostgrestClient;

/// Admin client for the auth service
#[derive(Clone)]
pub struct AdminAuth {
    url: String,
    service_role_key: String,
    client: Client,
    timeout: Option<Duration>,
}

impl AdminAuth {
    pub(crate) fn new(
        url: &str,
        service_role_key: &str,
        client: Client,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            url: url.to_string(),
            service_role_key: service_role_key.to_string(),
            client,
            timeout,
        }
    }

    /// Fetch an identity by id
    pub async fn get_user_by_id(&self, user_id: &str) -> Result<User> {
        let url = format!("{}/auth/v1/admin/users/{}", self.url, user_id);

        Fetch::get(&self.client, &url)
            .api_key(&self.service_role_key)
            .bearer_auth(&self.service_role_key)
            .timeout(self.timeout)
            .execute::<User>()
            .await
    }

    /// Create an identity for `email` and send it an invitation link
    pub async fn invite_user_by_email(&self, email: &str, options: &InviteOptions) -> Result<User> {
        let url = format!("{}/auth/v1/invite", self.url);

        let mut body = json!({ "email": email });
        if let Some(data) = &options.data {
            body["data"] = data.clone();
        }

        let mut fetch = Fetch::post(&self.client, &url)
            .api_key(&self.service_role_key)
            .bearer_auth(&self.service_role_key)
            .timeout(self.timeout);

        if let Some(redirect_to) = &options.redirect_to {
            fetch = fetch.query(&[("redirect_to".to_string(), redirect_to.clone())]);
        }

        let user = fetch.json(&body)?.execute::<User>().await?;
        info!("invitation issued for {}", email);
        Ok(user)
    }

    /// Table access that bypasses row-level security
    pub fn from(&self, table: &str) -> PostgrestClient {
        PostgrestClient::new(&self.url, &self.service_role_key, table, self.client.clone())
            .with_auth(&self.service_role_key)
            .with_timeout(self.timeout)
    }
}
