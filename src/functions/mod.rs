//! Edge Functions client

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::fetch::Fetch;

/// Client for Edge Functions
#[derive(Clone)]
pub struct FunctionsClient {
    /// The base URL for the backend project
    url: String,

    /// The anonymous API key
    key: String,

    /// HTTP client
    client: Client,

    timeout: Option<Duration>,
}

/// Response from an Edge Function
#[derive(Debug, Clone)]
pub struct FunctionResponse<T> {
    /// Response data
    pub data: T,

    /// Response status
    pub status: u16,
}

/// Options for invoking an edge function
#[derive(Debug, Clone)]
pub struct FunctionInvokeOptions<T> {
    /// Request body
    pub body: Option<T>,

    /// Authorization token; the anonymous key is used when absent
    pub authorization: Option<String>,
}

impl<T> Default for FunctionInvokeOptions<T> {
    fn default() -> Self {
        Self {
            body: None,
            authorization: None,
        }
    }
}

impl<T> FunctionInvokeOptions<T> {
    /// Create new empty invoke options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request body
    pub fn with_body(mut self, body: T) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the authorization token
    pub fn with_auth(mut self, token: &str) -> Self {
        self.authorization = Some(token.to_string());
        self
    }
}

impl FunctionsClient {
    /// Create a new FunctionsClient
    pub(crate) fn new(url: &str, key: &str, client: Client, timeout: Option<Duration>) -> Self {
        Self {
            url: url.to_string(),
            key: key.to_string(),
            client,
            timeout,
        }
    }

    fn get_url(&self, function_name: &str) -> String {
        format!("{}/functions/v1/{}", self.url, function_name)
    }

    /// Invoke an edge function.
    ///
    /// A 2xx answer whose JSON body carries an `error` field is reported
    /// as a failure too, matching how the functions signal errors.
    pub async fn invoke<T: Serialize, R: DeserializeOwned>(
        &self,
        function_name: &str,
        invoke_options: &FunctionInvokeOptions<T>,
    ) -> Result<FunctionResponse<R>> {
        let url = self.get_url(function_name);
        let token = invoke_options.authorization.as_deref().unwrap_or(&self.key);

        let fetch = Fetch::post(&self.client, &url)
            .api_key(&self.key)
            .bearer_auth(token)
            .timeout(self.timeout);

        let fetch = match &invoke_options.body {
            Some(body) => fetch.json(body)?,
            None => fetch,
        };

        let response = fetch.execute_raw().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        let value: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text.clone()))
        };

        if !(200..300).contains(&status) {
            let message = value
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or(text);
            return Err(Error::function(format!(
                "{} failed with status {}: {}",
                function_name, status, message
            )));
        }

        if let Some(message) = value.get("error").and_then(Value::as_str) {
            return Err(Error::function(format!("{}: {}", function_name, message)));
        }

        let data = serde_json::from_value::<R>(value)?;
        Ok(FunctionResponse { data, status })
    }
}
