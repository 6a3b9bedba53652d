//! Reads and writes confined to the current project.
//!
//! Every operation checks, before touching the network, that an identity
//! is signed in, that its profile is approved and that a project is
//! selected.

mod ledger;
mod record;
mod suppliers;
mod view;

use log::debug;
use std::future::Future;
use std::sync::Arc;

use crate::cancel::CancelSignal;
use crate::directory::ProjectDirectory;
use crate::error::{Error, Result};
use crate::models::Project;
use crate::postgrest::PostgrestClient;
use crate::session::AuthProvider;
use crate::Chantier;

pub use ledger::*;
pub use record::*;
pub use view::*;

/// Token, project and session an operation runs under
#[derive(Debug, Clone)]
pub(crate) struct Scope {
    pub token: String,
    pub project: Project,
    /// Fires when the identity that resolved this scope goes away
    pub signal: CancelSignal,
}

impl Scope {
    /// Await `request` unless the session ends first
    pub async fn run<T, F>(&self, request: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.signal.run(request).await?
    }
}

/// Data access for the current project
#[derive(Clone)]
pub struct ScopedStore {
    client: Chantier,
    auth: Arc<AuthProvider>,
    directory: Arc<ProjectDirectory>,
}

impl ScopedStore {
    pub fn new(client: Chantier, auth: Arc<AuthProvider>, directory: Arc<ProjectDirectory>) -> Self {
        Self {
            client,
            auth,
            directory,
        }
    }

    pub fn directory(&self) -> &Arc<ProjectDirectory> {
        &self.directory
    }

    pub fn auth(&self) -> &Arc<AuthProvider> {
        &self.auth
    }

    pub(crate) fn client(&self) -> &Chantier {
        &self.client
    }

    /// Resolve the scope or refuse. No request is sent from here.
    pub(crate) async fn scope(&self) -> Result<Scope> {
        let signal = self.directory.session_signal().await;
        let token = self.auth.require_approved().await?;
        let project = self.directory.require_current()?;
        Ok(Scope {
            token,
            project,
            signal,
        })
    }

    /// Scope for an explicit `project`, used by views that follow the
    /// selection themselves
    pub(crate) async fn scope_for(&self, project: Project) -> Result<Scope> {
        let signal = self.directory.session_signal().await;
        let token = self.auth.require_approved().await?;
        Ok(Scope {
            token,
            project,
            signal,
        })
    }

    /// Table access restricted to the scope's project
    pub(crate) fn table(&self, scope: &Scope, table: &str) -> PostgrestClient {
        self.client
            .from(table)
            .with_auth(&scope.token)
            .eq("project_id", &scope.project.id)
    }

    /// Store one record in the current project
    pub async fn insert<R: ScopedRecord>(&self, record: R) -> Result<R::Row> {
        let scope = self.scope().await?;
        self.insert_in(&scope, record).await
    }

    pub(crate) async fn insert_in<R: ScopedRecord>(&self, scope: &Scope, record: R) -> Result<R::Row> {
        let table = <R::Row as ScopedRow>::TABLE;
        let payload = [Scoped::new(scope.project.id.clone(), record)];
        let query = self.client.from(table).with_auth(&scope.token);
        let rows = scope.run(query.insert::<_, R::Row>(&payload)).await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| Error::general(format!("insert into {} returned no row", table)))
    }

    /// Store several records in the current project with one request
    pub async fn insert_many<R: ScopedRecord>(&self, records: Vec<R>) -> Result<Vec<R::Row>> {
        let scope = self.scope().await?;
        self.insert_many_in(&scope, records).await
    }

    pub(crate) async fn insert_many_in<R: ScopedRecord>(
        &self,
        scope: &Scope,
        records: Vec<R>,
    ) -> Result<Vec<R::Row>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let payload: Vec<Scoped<R>> = records
            .into_iter()
            .map(|record| Scoped::new(scope.project.id.clone(), record))
            .collect();

        let query = self
            .client
            .from(<R::Row as ScopedRow>::TABLE)
            .with_auth(&scope.token);
        scope.run(query.insert::<_, R::Row>(&payload)).await
    }

    /// Insert or merge a record colliding on `on_conflict`
    pub async fn upsert<R: ScopedRecord>(&self, record: R, on_conflict: &str) -> Result<R::Row> {
        let scope = self.scope().await?;
        let table = <R::Row as ScopedRow>::TABLE;
        let payload = [Scoped::new(scope.project.id.clone(), record)];
        let query = self.client.from(table).with_auth(&scope.token);
        let rows = scope
            .run(query.upsert::<_, R::Row>(&payload, on_conflict))
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| Error::general(format!("upsert into {} returned no row", table)))
    }

    /// Live rows of the current project
    pub async fn list<T: ScopedRow>(&self) -> Result<Vec<T>> {
        let scope = self.scope().await?;
        self.list_in(&scope).await
    }

    pub(crate) async fn list_in<T: ScopedRow>(&self, scope: &Scope) -> Result<Vec<T>> {
        debug!("listing {} for project {}", T::TABLE, scope.project.id);
        let mut query = self.table(scope, T::TABLE).select(T::SELECT);
        if T::SOFT_DELETE {
            query = query.is_null("deleted_at");
        }
        scope.run(query.execute::<T>()).await
    }

    /// A view of `T` that follows the current project until `signal` fires
    pub fn view<T: ScopedRow>(&self, signal: CancelSignal) -> ScopedView<T> {
        ScopedView::new(self.clone(), signal)
    }
}
