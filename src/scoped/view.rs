//! Reads that follow the current project

use log::debug;
use std::marker::PhantomData;
use tokio::sync::watch;

use super::{ScopedRow, ScopedStore};
use crate::cancel::CancelSignal;
use crate::error::{Error, Result};
use crate::models::{Project, ProjectId};

/// Rows read for one project
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSnapshot<T> {
    /// `None` when no project was selected
    pub project: Option<ProjectId>,
    pub rows: Vec<T>,
}

/// Re-reads `T` each time the current project changes.
///
/// The view ends when its signal fires: pending and later calls return
/// `Error::Cancelled`.
pub struct ScopedView<T> {
    store: ScopedStore,
    current: watch::Receiver<Option<Project>>,
    signal: CancelSignal,
    _row: PhantomData<fn() -> T>,
}

impl<T: ScopedRow> ScopedView<T> {
    pub(crate) fn new(store: ScopedStore, signal: CancelSignal) -> Self {
        let current = store.directory().subscribe();
        Self {
            store,
            current,
            signal,
            _row: PhantomData,
        }
    }

    /// Read for the project that is current now
    pub async fn refresh(&mut self) -> Result<ViewSnapshot<T>> {
        let project = self.current.borrow_and_update().clone();
        self.read(project).await
    }

    /// Wait for the current project to change, then read for it
    pub async fn changed(&mut self) -> Result<ViewSnapshot<T>> {
        let changed = self.signal.run(self.current.changed()).await?;
        if changed.is_err() {
            return Err(Error::Cancelled);
        }
        let project = self.current.borrow_and_update().clone();
        self.read(project).await
    }

    async fn read(&self, project: Option<Project>) -> Result<ViewSnapshot<T>> {
        let project = match project {
            Some(project) => project,
            None => {
                return Ok(ViewSnapshot {
                    project: None,
                    rows: Vec::new(),
                })
            }
        };

        debug!("view of {} reading project {}", T::TABLE, project.id);
        let scope = self.store.scope_for(project).await?;
        let rows = self.signal.run(self.store.list_in::<T>(&scope)).await??;

        Ok(ViewSnapshot {
            project: Some(scope.project.id),
            rows,
        })
    }
}
