//! Wiring of the session, the project directory and the scoped store

use log::debug;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::directory::{FileSelectionStore, MemorySelectionStore, ProjectDirectory, SelectionStore};
use crate::error::Result;
use crate::scoped::ScopedStore;
use crate::session::AuthProvider;
use crate::workflow::{Approvals, EdgeFunctionNotifier, Notifier, ProjectInvitations};
use crate::Chantier;

/// Everything a project screen needs, owned in one place.
///
/// The directory follows the auth provider for as long as the context
/// lives.
pub struct SessionContext {
    pub client: Chantier,
    pub auth: Arc<AuthProvider>,
    pub projects: Arc<ProjectDirectory>,
    follower: JoinHandle<()>,
}

impl SessionContext {
    /// Build the context and resolve the stored session, if any
    pub async fn start(client: Chantier) -> Result<Self> {
        let selection: Arc<dyn SelectionStore> = match &client.options().selection_file {
            Some(path) => Arc::new(FileSelectionStore::new(path)),
            None => Arc::new(MemorySelectionStore::new()),
        };
        Self::start_with(client, selection).await
    }

    /// Same as [`start`](Self::start) with an explicit selection store
    pub async fn start_with(client: Chantier, selection: Arc<dyn SelectionStore>) -> Result<Self> {
        let auth = Arc::new(AuthProvider::new(client.clone()));
        let projects = Arc::new(ProjectDirectory::new(client.clone(), selection));
        let follower = projects.clone().follow(&auth);

        auth.initialize().await?;
        debug!("session context started");

        Ok(Self {
            client,
            auth,
            projects,
            follower,
        })
    }

    /// Data access for the current project
    pub fn store(&self) -> ScopedStore {
        ScopedStore::new(self.client.clone(), self.auth.clone(), self.projects.clone())
    }

    pub fn approvals(&self) -> Approvals {
        Approvals::new(self.client.clone())
    }

    /// Project invitations delivered through `notifier`
    pub fn invitations(&self, notifier: Arc<dyn Notifier>) -> ProjectInvitations {
        ProjectInvitations::new(self.store(), notifier)
    }

    /// Notifier calling the configured invitation Edge Function
    pub fn edge_notifier(&self) -> EdgeFunctionNotifier {
        EdgeFunctionNotifier::new(
            self.client.functions(),
            &self.client.options().invitation_function,
        )
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.follower.abort();
    }
}
