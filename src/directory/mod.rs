//! Projects visible to the signed-in identity and the current selection

mod store;

use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

use crate::auth::User;
use crate::cancel::{CancelHandle, CancelSignal};
use crate::error::{Error, Result, UNDEFINED_TABLE};
use crate::models::{
    sort_by_creation, MembershipRow, NewProject, Project, ProjectId, ProjectMember, ProjectRole,
    MEMBERS_TABLE, PROJECTS_TABLE,
};
use crate::postgrest::SortOrder;
use crate::session::{AuthProvider, AuthState};
use crate::Chantier;

pub use store::*;

/// Where the directory stands with respect to the current identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryState {
    /// No identity, nothing loaded
    Uninitialized,
    Loading,
    /// At least one project is visible
    Ready,
    /// The identity sees no project
    Empty,
    /// The last load failed; the previous list was kept
    Failed(String),
}

/// Result of [`ProjectDirectory::load_projects`]
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded(Vec<Project>),
    Empty,
    Failed(String),
    /// The identity changed while loading; the result was dropped
    Cancelled,
}

struct Inner {
    user: Option<User>,
    projects: Vec<Project>,
    roles: HashMap<ProjectId, ProjectRole>,
    role: Option<ProjectRole>,
    state: DirectoryState,
    epoch: u64,
    cancel: CancelHandle,
}

impl Inner {
    fn role_for(&self, id: &ProjectId) -> ProjectRole {
        self.roles.get(id).copied().unwrap_or_default()
    }
}

/// Pick the remembered project when still visible, else the oldest one
pub fn choose_default(projects: &[Project], remembered: Option<&ProjectId>) -> Option<Project> {
    remembered
        .and_then(|id| projects.iter().find(|p| &p.id == id))
        .or_else(|| projects.first())
        .cloned()
}

/// Single source of truth for the projects of the signed-in identity.
///
/// The current project is published on a watch channel; only the
/// directory writes to it.
pub struct ProjectDirectory {
    client: Chantier,
    selection: Arc<dyn SelectionStore>,
    inner: RwLock<Inner>,
    current: watch::Sender<Option<Project>>,
}

impl ProjectDirectory {
    pub fn new(client: Chantier, selection: Arc<dyn SelectionStore>) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            client,
            selection,
            inner: RwLock::new(Inner {
                user: None,
                projects: Vec::new(),
                roles: HashMap::new(),
                role: None,
                state: DirectoryState::Uninitialized,
                epoch: 0,
                cancel: CancelHandle::new(),
            }),
            current,
        }
    }

    /// Watch the current project
    pub fn subscribe(&self) -> watch::Receiver<Option<Project>> {
        self.current.subscribe()
    }

    pub fn current_project(&self) -> Option<Project> {
        self.current.borrow().clone()
    }

    /// The current project, or `NoProjectSelected`
    pub fn require_current(&self) -> Result<Project> {
        self.current_project().ok_or(Error::NoProjectSelected)
    }

    /// Role of the identity in the current project
    pub async fn current_role(&self) -> Option<ProjectRole> {
        self.inner.read().await.role
    }

    pub async fn projects(&self) -> Vec<Project> {
        self.inner.read().await.projects.clone()
    }

    pub async fn state(&self) -> DirectoryState {
        self.inner.read().await.state.clone()
    }

    /// Fetch the projects of the current identity and pick a default
    /// selection when there is none.
    pub async fn load_projects(&self) -> LoadOutcome {
        let (user, epoch, signal) = {
            let mut inner = self.inner.write().await;
            let user = match inner.user.clone() {
                Some(user) => user,
                None => {
                    debug!("no identity, nothing to load");
                    return LoadOutcome::Empty;
                }
            };
            inner.state = DirectoryState::Loading;
            (user, inner.epoch, inner.cancel.signal())
        };

        let fetched = match signal.run(self.fetch_projects(&user)).await {
            Ok(fetched) => fetched,
            Err(_) => {
                debug!("project load for {} cancelled", user.id);
                return LoadOutcome::Cancelled;
            }
        };

        let mut inner = self.inner.write().await;
        if inner.epoch != epoch {
            debug!("discarding projects loaded for a previous identity");
            return LoadOutcome::Cancelled;
        }

        let (projects, roles) = match fetched {
            Ok(fetched) => fetched,
            Err(err) => {
                error!("error loading projects: {}", err);
                let reason = err.to_string();
                inner.state = DirectoryState::Failed(reason.clone());
                return LoadOutcome::Failed(reason);
            }
        };

        info!("{} projects visible to {}", projects.len(), user.id);
        inner.projects = projects.clone();
        inner.roles = roles;

        let current = self.current_project();
        let kept = current
            .as_ref()
            .and_then(|c| projects.iter().find(|p| p.id == c.id))
            .cloned();

        let next = match kept {
            Some(project) => Some(project),
            None => {
                let remembered = self.selection.load().await;
                choose_default(&projects, remembered.as_ref())
            }
        };

        let role = next.as_ref().map(|p| inner.role_for(&p.id));
        inner.role = role;
        if next != current {
            self.current.send_replace(next);
        }

        if projects.is_empty() {
            inner.state = DirectoryState::Empty;
            LoadOutcome::Empty
        } else {
            inner.state = DirectoryState::Ready;
            LoadOutcome::Loaded(projects)
        }
    }

    /// Same as [`load_projects`](Self::load_projects)
    pub async fn refresh_projects(&self) -> LoadOutcome {
        self.load_projects().await
    }

    /// Make `project` current and remember it.
    ///
    /// Membership is not checked here.
    pub async fn select_project(&self, project: Project) {
        let mut inner = self.inner.write().await;
        let role = inner.role_for(&project.id);
        inner.role = Some(role);

        if let Err(err) = self.selection.save(&project.id).await {
            warn!("could not persist selected project: {}", err);
        }
        debug!("selected project {}", project.id);
        self.current.send_replace(Some(project));
    }

    /// Create a project owned by the current identity and select it.
    ///
    /// Returns `None` when the project could not be created.
    pub async fn create_project(&self, name: &str, description: Option<&str>) -> Option<Project> {
        let (user, token) = match self.identity().await {
            Ok(identity) => identity,
            Err(err) => {
                warn!("cannot create project: {}", err);
                return None;
            }
        };

        let new_project = NewProject {
            name: name.to_string(),
            description: description.map(str::to_string),
        };

        let created = self
            .client
            .from(PROJECTS_TABLE)
            .with_auth(&token)
            .insert::<_, Project>(&[new_project])
            .await;

        let project = match created.map(|rows| rows.into_iter().next()) {
            Ok(Some(project)) => project,
            Ok(None) => {
                error!("project insert returned no row");
                return None;
            }
            Err(err) => {
                error!("error creating project: {}", err);
                return None;
            }
        };

        let membership = ProjectMember {
            project_id: project.id.clone(),
            user_id: user.id.clone(),
            role: ProjectRole::Admin,
        };
        if let Err(err) = self
            .client
            .from(MEMBERS_TABLE)
            .with_auth(&token)
            .insert_minimal(&[membership])
            .await
        {
            error!("error adding creator to project {}: {}", project.id, err);
        }

        self.load_projects().await;
        self.inner
            .write()
            .await
            .roles
            .entry(project.id.clone())
            .or_insert(ProjectRole::Admin);
        self.select_project(project.clone()).await;

        info!("created project {}", project.name);
        Some(project)
    }

    /// Delete a project. Only its admins may; anyone else gets `false`
    /// without a request being sent.
    pub async fn delete_project(&self, id: &ProjectId) -> bool {
        let role = self.inner.read().await.roles.get(id).copied();
        if role != Some(ProjectRole::Admin) {
            warn!("only project admins can delete project {}", id);
            return false;
        }

        let token = match self.identity().await {
            Ok((_, token)) => token,
            Err(err) => {
                warn!("cannot delete project: {}", err);
                return false;
            }
        };

        if let Err(err) = self
            .client
            .from(PROJECTS_TABLE)
            .with_auth(&token)
            .eq("id", id)
            .delete()
            .await
        {
            error!("error deleting project {}: {}", id, err);
            return false;
        }

        let mut inner = self.inner.write().await;
        inner.projects.retain(|p| &p.id != id);
        inner.roles.remove(id);

        let was_current = self.current.borrow().as_ref().map(|p| &p.id == id).unwrap_or(false);
        if was_current {
            let remembered = self.selection.load().await;
            let next = choose_default(&inner.projects, remembered.as_ref());
            let role = next.as_ref().map(|p| inner.role_for(&p.id));
            inner.role = role;
            if let Some(project) = &next {
                if let Err(err) = self.selection.save(&project.id).await {
                    warn!("could not persist selected project: {}", err);
                }
            }
            self.current.send_replace(next);
        }

        if inner.projects.is_empty() {
            inner.state = DirectoryState::Empty;
        }

        info!("deleted project {}", id);
        true
    }

    /// Apply a change of signed-in identity and reload
    pub async fn on_identity_change(&self, user: Option<User>) -> LoadOutcome {
        if self.reset_identity(user).await {
            self.load_projects().await
        } else {
            LoadOutcome::Empty
        }
    }

    /// Start a new epoch for `user`, cancelling loads of the previous one.
    /// Returns whether an identity is present.
    async fn reset_identity(&self, user: Option<User>) -> bool {
        let mut inner = self.inner.write().await;
        inner.cancel.cancel();
        inner.cancel = CancelHandle::new();
        inner.epoch += 1;

        match user {
            Some(user) => {
                let same = inner.user.as_ref().map(|u| u.id == user.id).unwrap_or(false);
                if !same {
                    self.forget(&mut inner);
                }
                debug!("identity is now {}", user.id);
                inner.user = Some(user);
                inner.state = DirectoryState::Loading;
                true
            }
            None => {
                debug!("identity cleared");
                self.forget(&mut inner);
                inner.user = None;
                inner.state = DirectoryState::Uninitialized;
                false
            }
        }
    }

    /// Drop everything learned for the previous identity
    fn forget(&self, inner: &mut Inner) {
        inner.projects.clear();
        inner.roles.clear();
        inner.role = None;
        self.current.send_replace(None);
    }

    /// Follow the identity published by `auth` until the provider goes
    /// away. Loads run in their own tasks so a new identity can cancel
    /// the previous load.
    pub fn follow(self: Arc<Self>, auth: &AuthProvider) -> JoinHandle<()> {
        let mut rx = auth.subscribe();

        tokio::spawn(async move {
            let mut last: Option<Option<String>> = None;
            loop {
                let user = {
                    let state = rx.borrow_and_update();
                    if matches!(*state, AuthState::Initializing) {
                        None
                    } else {
                        Some(state.user().cloned())
                    }
                };

                if let Some(user) = user {
                    let id = user.as_ref().map(|u| u.id.clone());
                    if last.as_ref() != Some(&id) {
                        last = Some(id);
                        if self.reset_identity(user).await {
                            let directory = self.clone();
                            tokio::spawn(async move {
                                directory.load_projects().await;
                            });
                        }
                    }
                }

                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    /// Signal that fires when the current identity changes
    pub async fn session_signal(&self) -> CancelSignal {
        self.inner.read().await.cancel.signal()
    }

    async fn identity(&self) -> Result<(User, String)> {
        let user = self
            .inner
            .read()
            .await
            .user
            .clone()
            .ok_or(Error::NotAuthenticated)?;
        let token = self
            .client
            .auth()
            .access_token()
            .await
            .ok_or(Error::NotAuthenticated)?;
        Ok((user, token))
    }

    async fn fetch_projects(
        &self,
        user: &User,
    ) -> Result<(Vec<Project>, HashMap<ProjectId, ProjectRole>)> {
        let token = self
            .client
            .auth()
            .access_token()
            .await
            .ok_or(Error::NotAuthenticated)?;

        let memberships = self
            .client
            .from(MEMBERS_TABLE)
            .with_auth(&token)
            .select("project_id,role,projects(*)")
            .eq("user_id", &user.id)
            .execute::<MembershipRow>()
            .await;

        match memberships {
            Ok(rows) => {
                let mut roles = HashMap::new();
                let mut projects = Vec::with_capacity(rows.len());
                for row in rows {
                    match row.projects {
                        Some(project) => {
                            roles.insert(project.id.clone(), row.role);
                            projects.push(project);
                        }
                        None => debug!("membership of {} has no visible project", row.project_id),
                    }
                }
                sort_by_creation(&mut projects);
                Ok((projects, roles))
            }
            Err(err) if err.has_code(UNDEFINED_TABLE) => {
                warn!("{} is missing, listing every project", MEMBERS_TABLE);
                let mut projects = self
                    .client
                    .from(PROJECTS_TABLE)
                    .with_auth(&token)
                    .select("*")
                    .order("created_at", SortOrder::Ascending)
                    .execute::<Project>()
                    .await?;
                sort_by_creation(&mut projects);
                let roles = projects
                    .iter()
                    .map(|p| (p.id.clone(), ProjectRole::Admin))
                    .collect();
                Ok((projects, roles))
            }
            Err(err) => Err(err),
        }
    }
}
