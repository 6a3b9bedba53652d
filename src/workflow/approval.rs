//! Platform invitations and the pending/approved/rejected workflow.
//!
//! Every operation here runs with the service role key and is refused
//! up front, before any request, when that key is not configured.

use chrono::Utc;
use log::{info, warn};
use serde_json::json;

use crate::auth::{AdminAuth, InviteOptions, User};
use crate::error::{Error, Result};
use crate::models::{
    NewProfile, Profile, ProfileFilter, ProfileStatus, StatusChange, UserRole, PROFILES_TABLE,
};
use crate::postgrest::SortOrder;
use crate::session::AuthProvider;
use crate::Chantier;

/// Reason stored when an administrator rejects without giving one
pub const DEFAULT_REJECTION_REASON: &str = "Access denied by administrator";

/// Administrative operations on profiles
#[derive(Clone)]
pub struct Approvals {
    client: Chantier,
}

/// Where the invitation link sends the invitee
pub fn invitation_redirect(site_url: &str) -> String {
    format!("{}/auth/callback?next=/auth/set-password", site_url)
}

/// Name stored on a fresh profile
fn initial_full_name(user: &User, email: &str) -> String {
    user.full_name()
        .map(str::to_string)
        .unwrap_or_else(|| email.split('@').next().unwrap_or(email).to_string())
}

impl Approvals {
    pub fn new(client: Chantier) -> Self {
        Self { client }
    }

    fn admin(&self) -> Result<AdminAuth> {
        self.client.admin()
    }

    /// Invite `email` and create its profile as pending
    pub async fn invite(&self, email: &str, role: UserRole) -> Result<Profile> {
        let admin = self.admin()?;

        let options = InviteOptions {
            redirect_to: Some(invitation_redirect(&self.client.options().site_url)),
            data: Some(json!({ "invited": true })),
        };
        let user = admin.invite_user_by_email(email, &options).await?;

        let profile = NewProfile {
            user_id: user.id.clone(),
            email: email.to_string(),
            role,
            status: ProfileStatus::Pending,
            approved_at: None,
            full_name: initial_full_name(&user, email),
        };

        let rows = admin
            .from(PROFILES_TABLE)
            .upsert::<_, Profile>(&[profile], "user_id")
            .await
            .map_err(|err| {
                warn!("{} invited but profile not written: {}", email, err);
                err
            })?;

        rows.into_iter()
            .next()
            .ok_or_else(|| Error::general(format!("no profile written for {}", email)))
    }

    /// Send the invitation again; the profile is left as it is
    pub async fn resend_invitation(&self, email: &str) -> Result<User> {
        let admin = self.admin()?;
        let options = InviteOptions {
            redirect_to: Some(invitation_redirect(&self.client.options().site_url)),
            data: Some(json!({ "invited": true })),
        };
        admin.invite_user_by_email(email, &options).await
    }

    /// Approve a pending profile whose identity came through an
    /// invitation and has signed in since
    pub async fn approve(&self, profile_id: &str) -> Result<Profile> {
        let admin = self.admin()?;
        let profile = self.load(&admin, "id", profile_id).await?;
        check_transition(&profile, ProfileStatus::Approved)?;

        let user = admin.get_user_by_id(&profile.user_id).await?;
        if !user.has_authenticated() || !user.is_invited() {
            warn!("refusing to approve {}: not an invited identity", profile_id);
            return Err(Error::NotInvited);
        }

        let change = StatusChange {
            status: ProfileStatus::Approved,
            approved_at: Some(Utc::now()),
            rejection_reason: None,
        };
        let approved = self.apply(&admin, "id", profile_id, &change).await?;
        info!("approved profile {}", profile_id);
        Ok(approved)
    }

    /// Reject a pending profile
    pub async fn reject(&self, profile_id: &str, reason: Option<&str>) -> Result<Profile> {
        let admin = self.admin()?;
        let profile = self.load(&admin, "id", profile_id).await?;
        check_transition(&profile, ProfileStatus::Rejected)?;

        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REJECTION_REASON);
        let change = StatusChange {
            status: ProfileStatus::Rejected,
            approved_at: None,
            rejection_reason: Some(reason.to_string()),
        };
        let rejected = self.apply(&admin, "id", profile_id, &change).await?;
        info!("rejected profile {}", profile_id);
        Ok(rejected)
    }

    /// Approve the caller's own profile after it accepted an invitation
    pub async fn confirm_invite(&self, auth: &AuthProvider) -> Result<Profile> {
        let admin = self.admin()?;
        if auth.current_user().is_none() {
            return Err(Error::NotAuthenticated);
        }

        let user = self.client.auth().get_user().await?;
        if !user.is_invited() {
            return Err(Error::NotInvited);
        }

        let current = self.load(&admin, "user_id", &user.id).await?;
        check_transition(&current, ProfileStatus::Approved)?;

        let change = StatusChange {
            status: ProfileStatus::Approved,
            approved_at: Some(Utc::now()),
            rejection_reason: None,
        };
        let profile = self.apply(&admin, "user_id", &user.id, &change).await?;

        auth.refresh_profile().await?;
        info!("{} confirmed its invitation", user.id);
        Ok(profile)
    }

    /// Profiles for the administration screen, newest request first
    pub async fn list_profiles(&self, filter: ProfileFilter) -> Result<Vec<Profile>> {
        let admin = self.admin()?;
        let mut query = admin
            .from(PROFILES_TABLE)
            .select("*")
            .order("requested_at", SortOrder::Descending);
        if let ProfileFilter::Only(status) = filter {
            query = query.eq("status", status);
        }
        query.execute::<Profile>().await
    }

    pub async fn update_role(&self, profile_id: &str, role: UserRole) -> Result<Profile> {
        let admin = self.admin()?;
        let rows = admin
            .from(PROFILES_TABLE)
            .eq("id", profile_id)
            .update::<_, Profile>(&json!({ "role": role }))
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::general(format!("profile {} not found", profile_id)))
    }

    async fn load(&self, admin: &AdminAuth, column: &str, value: &str) -> Result<Profile> {
        admin
            .from(PROFILES_TABLE)
            .select("*")
            .eq(column, value)
            .execute_one::<Profile>()
            .await?
            .ok_or_else(|| Error::general(format!("profile {} not found", value)))
    }

    async fn apply(
        &self,
        admin: &AdminAuth,
        column: &str,
        value: &str,
        change: &StatusChange,
    ) -> Result<Profile> {
        // only pending profiles move; a concurrent decision leaves no row
        let rows = admin
            .from(PROFILES_TABLE)
            .eq(column, value)
            .eq("status", ProfileStatus::Pending)
            .update::<_, Profile>(change)
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::general(format!("profile {} is no longer pending", value)))
    }
}

fn check_transition(profile: &Profile, to: ProfileStatus) -> Result<()> {
    if profile.status.can_transition_to(to) {
        Ok(())
    } else {
        Err(Error::InvalidTransition {
            from: profile.status,
            to,
        })
    }
}
