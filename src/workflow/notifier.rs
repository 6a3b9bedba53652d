//! Delivery of invitation notices

use async_trait::async_trait;
use log::{debug, info};
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::functions::{FunctionInvokeOptions, FunctionsClient};

/// What an invitee is told
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationNotice {
    pub email: String,
    pub project_name: String,
    pub invite_link: String,
    pub inviter_name: String,
}

/// Sends invitation notices
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notice: &InvitationNotice) -> Result<()>;
}

/// Hands notices to an Edge Function, which does the actual mailing
#[derive(Clone)]
pub struct EdgeFunctionNotifier {
    functions: FunctionsClient,
    function_name: String,
    token: Option<String>,
}

impl EdgeFunctionNotifier {
    pub fn new(functions: FunctionsClient, function_name: &str) -> Self {
        Self {
            functions,
            function_name: function_name.to_string(),
            token: None,
        }
    }

    /// Invoke the function as the identity owning `token`
    pub fn with_auth(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }
}

#[async_trait]
impl Notifier for EdgeFunctionNotifier {
    async fn send(&self, notice: &InvitationNotice) -> Result<()> {
        let mut options = FunctionInvokeOptions::new().with_body(notice);
        if let Some(token) = &self.token {
            options = options.with_auth(token);
        }

        debug!("invoking {} for {}", self.function_name, notice.email);
        self.functions
            .invoke::<_, Value>(&self.function_name, &options)
            .await?;

        info!("invitation notice sent to {}", notice.email);
        Ok(())
    }
}
