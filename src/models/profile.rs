//! Profiles and their approval status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Table holding one profile per identity
pub const PROFILES_TABLE: &str = "user_profiles";

/// Approval status of a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
    Pending,
    Approved,
    Rejected,
}

impl ProfileStatus {
    /// Convert the status to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileStatus::Pending => "pending",
            ProfileStatus::Approved => "approved",
            ProfileStatus::Rejected => "rejected",
        }
    }

    /// Only pending profiles move, and only to approved or rejected.
    pub fn can_transition_to(&self, next: ProfileStatus) -> bool {
        matches!(
            (self, next),
            (ProfileStatus::Pending, ProfileStatus::Approved)
                | (ProfileStatus::Pending, ProfileStatus::Rejected)
        )
    }
}

impl fmt::Display for ProfileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application-wide role of a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Viewer,
    #[default]
    User,
    Admin,
}

impl UserRole {
    /// Convert the role to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Viewer => "viewer",
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

/// A row of `user_profiles`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub user_id: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    pub status: ProfileStatus,
    #[serde(default)]
    pub requested_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

impl Profile {
    /// Whether the profile grants access to project screens
    pub fn is_approved(&self) -> bool {
        self.status == ProfileStatus::Approved
    }

    /// Name shown to other members
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.user_id)
    }
}

/// Payload written when an identity is invited
#[derive(Debug, Clone, Serialize)]
pub struct NewProfile {
    pub user_id: String,
    pub email: String,
    pub role: UserRole,
    pub status: ProfileStatus,
    pub approved_at: Option<DateTime<Utc>>,
    pub full_name: String,
}

/// Status change applied by approve/reject
#[derive(Debug, Clone, Serialize)]
pub(crate) struct StatusChange {
    pub status: ProfileStatus,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

/// Filter used by the administration screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfileFilter {
    #[default]
    All,
    Only(ProfileStatus),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_pending_profiles_transition() {
        use ProfileStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn profile_deserializes_without_optional_columns() {
        let profile: Profile = serde_json::from_value(json!({
            "id": "p1",
            "user_id": "u1",
            "email": "chef@chantier.test",
            "full_name": null,
            "status": "pending"
        }))
        .unwrap();

        assert_eq!(profile.role, UserRole::User);
        assert!(profile.approved_at.is_none());
        assert_eq!(profile.display_name(), "chef@chantier.test");
        assert!(!profile.is_approved());
    }
}
