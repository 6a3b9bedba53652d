//! Project-tagged payloads

use serde::{de::DeserializeOwned, Serialize};

use crate::models::ProjectId;

/// A row type living in a project-scoped table
pub trait ScopedRow: DeserializeOwned + Send {
    /// The table the rows live in
    const TABLE: &'static str;

    /// Columns requested when listing
    const SELECT: &'static str = "*";

    /// Whether rows carry a `deleted_at` column that hides them when set
    const SOFT_DELETE: bool = false;
}

/// A payload that can only reach the database through [`Scoped::new`]
pub trait ScopedRecord: Serialize + Send + Sync {
    /// The row returned once the payload is stored
    type Row: ScopedRow;
}

/// A payload tagged with its owning project.
///
/// The fields are private: the only way to build one is [`Scoped::new`],
/// which takes the project id, so every insert carries it.
#[derive(Debug, Clone, Serialize)]
pub struct Scoped<T> {
    project_id: ProjectId,
    #[serde(flatten)]
    record: T,
}

impl<T: ScopedRecord> Scoped<T> {
    pub fn new(project_id: ProjectId, record: T) -> Self {
        Self { project_id, record }
    }

    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    pub fn record(&self) -> &T {
        &self.record
    }
}
