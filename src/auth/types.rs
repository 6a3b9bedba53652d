//! Types for authentication and user management

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An identity as known to the auth service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user ID
    pub id: String,

    /// The user's email address
    #[serde(default)]
    pub email: Option<String>,

    /// The user's phone number
    #[serde(default)]
    pub phone: Option<String>,

    /// Metadata only the service role can write
    #[serde(default)]
    pub app_metadata: Value,

    /// Metadata attached at sign-up or invitation
    #[serde(default)]
    pub user_metadata: Value,

    /// When the invitation was sent, if any
    #[serde(default)]
    pub invited_at: Option<String>,

    /// The last sign-in time
    #[serde(default)]
    pub last_sign_in_at: Option<String>,

    /// The creation time
    #[serde(default)]
    pub created_at: Option<String>,

    /// The update time
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl User {
    /// Whether the identity was created through an invitation
    pub fn is_invited(&self) -> bool {
        self.user_metadata
            .get("invited")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Whether the identity has signed in at least once
    pub fn has_authenticated(&self) -> bool {
        self.last_sign_in_at.is_some()
    }

    /// `full_name` from the metadata, if set
    pub fn full_name(&self) -> Option<&str> {
        self.user_metadata
            .get("full_name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
    }

    /// Name used when this identity invites someone
    pub fn display_name(&self) -> String {
        self.full_name()
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
            .to_string()
    }
}

/// Email/password credentials
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
        }
    }
}

/// Options for an admin invitation
#[derive(Debug, Clone, Default)]
pub struct InviteOptions {
    /// Where the invitation link lands after confirmation
    pub redirect_to: Option<String>,

    /// Metadata stored on the invited identity
    pub data: Option<Value>,
}
