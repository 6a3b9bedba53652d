//! Invitations to join a single project

use log::{error, info, warn};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::notifier::{InvitationNotice, Notifier};
use crate::error::{Error, Result};
use crate::models::{
    NewProjectInvitation, ProjectInvitation, ProjectMember, ProjectRole, MEMBERS_TABLE,
};
use crate::scoped::{ScopedRow, ScopedStore};

/// Link an invitee follows to accept
pub fn invitation_link(site_url: &str, token: &str) -> String {
    format!("{}/invite/accept?token={}", site_url, token)
}

/// Answer of the invitation procedures
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InvitationReply {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub role: Option<ProjectRole>,
}

/// An invitation that was created, whether or not its notice went out
#[derive(Debug, Clone)]
pub struct SentInvitation {
    pub invitation: ProjectInvitation,
    pub link: String,
    /// Why the notice could not be delivered, if it could not
    pub notice_error: Option<String>,
}

impl SentInvitation {
    pub fn notified(&self) -> bool {
        self.notice_error.is_none()
    }
}

/// Per-project invitations for the current project
#[derive(Clone)]
pub struct ProjectInvitations {
    store: ScopedStore,
    notifier: Arc<dyn Notifier>,
}

impl ProjectInvitations {
    pub fn new(store: ScopedStore, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Invite `email` into the current project with `role`.
    ///
    /// A notice is handed to the notifier once; a failed delivery is
    /// reported in the result and the invitation stays valid.
    pub async fn invite_to_project(&self, email: &str, role: ProjectRole) -> Result<SentInvitation> {
        let scope = self.store.scope().await?;
        let inviter = self.store.auth().current_user();
        let project = scope.project.clone();

        let invitation = self
            .store
            .insert_in(
                &scope,
                NewProjectInvitation {
                    email: email.to_string(),
                    role,
                    invited_by: inviter.as_ref().map(|u| u.id.clone()),
                },
            )
            .await?;

        let link = invitation_link(&self.store.client().options().site_url, &invitation.token);
        info!("invited {} to project {}", email, project.name);

        let notice = InvitationNotice {
            email: email.to_string(),
            project_name: project.name.clone(),
            invite_link: link.clone(),
            inviter_name: inviter.map(|u| u.display_name()).unwrap_or_default(),
        };

        let notice_error = match self.notifier.send(&notice).await {
            Ok(()) => None,
            Err(err) => {
                error!("invitation notice for {} failed: {}", email, err);
                Some(err.to_string())
            }
        };

        Ok(SentInvitation {
            invitation,
            link,
            notice_error,
        })
    }

    /// Invitations of the current project still waiting for an answer
    pub async fn pending_invitations(&self) -> Result<Vec<ProjectInvitation>> {
        let scope = self.store.scope().await?;
        let query = self
            .store
            .table(&scope, ProjectInvitation::TABLE)
            .eq("status", "pending");
        scope.run(query.execute::<ProjectInvitation>()).await
    }

    pub async fn delete_invitation(&self, invitation_id: &str) -> Result<()> {
        let scope = self.store.scope().await?;
        let query = self
            .store
            .table(&scope, ProjectInvitation::TABLE)
            .eq("id", invitation_id);
        scope.run(query.delete()).await
    }

    /// Members of the current project
    pub async fn members(&self) -> Result<Vec<ProjectMember>> {
        let scope = self.store.scope().await?;
        let query = self.store.table(&scope, MEMBERS_TABLE);
        scope.run(query.execute::<ProjectMember>()).await
    }

    /// Public details of an invitation, readable before signing in
    pub async fn invitation_details(&self, token: &str) -> Result<InvitationReply> {
        self.store
            .client()
            .rpc("get_invitation_details", json!({ "invite_token": token }))
            .execute::<InvitationReply>()
            .await
    }

    /// Accept an invitation as the signed-in identity, then reload the
    /// directory so the project shows up
    pub async fn accept_invitation(&self, token: &str) -> Result<InvitationReply> {
        let session = self.store.auth().require_session().await?;
        let reply = self
            .store
            .client()
            .rpc("accept_project_invitation", json!({ "invite_token": token }))
            .with_auth(&session)
            .execute::<InvitationReply>()
            .await?;

        if !reply.success {
            let reason = reply
                .error
                .clone()
                .unwrap_or_else(|| "invitation could not be accepted".to_string());
            warn!("invitation refused: {}", reason);
            return Err(Error::general(reason));
        }

        self.store.directory().refresh_projects().await;
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_carries_token() {
        assert_eq!(
            invitation_link("http://localhost:3000", "abc"),
            "http://localhost:3000/invite/accept?token=abc"
        );
    }

    #[test]
    fn reply_tolerates_sparse_body() {
        let reply: InvitationReply =
            serde_json::from_value(json!({ "success": false, "error": "expired" })).unwrap();
        assert!(!reply.success);
        assert_eq!(reply.error.as_deref(), Some("expired"));
    }
}
