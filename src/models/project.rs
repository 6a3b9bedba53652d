//! Projects and memberships

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Table holding projects
pub const PROJECTS_TABLE: &str = "projects";

/// Table linking identities to projects
pub const MEMBERS_TABLE: &str = "project_members";

/// Identifier of a project
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ProjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Role of an identity within one project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectRole {
    Admin,
    Editor,
    #[default]
    Viewer,
}

impl ProjectRole {
    /// Convert the role to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Admin => "admin",
            ProjectRole::Editor => "editor",
            ProjectRole::Viewer => "viewer",
        }
    }
}

/// A construction project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a project
#[derive(Debug, Clone, Serialize)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
}

/// A row of `project_members`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMember {
    pub project_id: ProjectId,
    pub user_id: String,
    pub role: ProjectRole,
}

/// A membership row with the project embedded, as returned by
/// `select=project_id,role,projects(*)`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MembershipRow {
    pub project_id: ProjectId,
    #[serde(default)]
    pub role: ProjectRole,
    pub projects: Option<Project>,
}

/// Sort projects by creation time, oldest first.
pub fn sort_by_creation(projects: &mut [Project]) {
    projects.sort_by(|a, b| a.created_at.cmp(&b.created_at));
}
