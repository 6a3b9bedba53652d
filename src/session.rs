//! Signed-in identity and its approval status, published to observers

use log::{debug, info, warn};
use tokio::sync::watch;

use crate::auth::{Credentials, Session, User};
use crate::error::{Error, Result};
use crate::models::{Profile, ProfileStatus, UserRole, PROFILES_TABLE};
use crate::Chantier;

/// Authentication state as seen by the rest of the application
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    /// No session has been looked at yet
    Initializing,
    SignedOut,
    SignedIn {
        user: User,
        /// `None` when the identity has no profile row yet
        profile: Option<Profile>,
    },
}

impl AuthState {
    pub fn user(&self) -> Option<&User> {
        match self {
            AuthState::SignedIn { user, .. } => Some(user),
            _ => None,
        }
    }

    pub fn profile(&self) -> Option<&Profile> {
        match self {
            AuthState::SignedIn { profile, .. } => profile.as_ref(),
            _ => None,
        }
    }

    /// Where a protected screen should send this identity
    pub fn access(&self) -> Access {
        match self {
            AuthState::Initializing | AuthState::SignedOut => Access::Login,
            AuthState::SignedIn { profile, .. } => match profile.as_ref().map(|p| p.status) {
                Some(ProfileStatus::Approved) => Access::Allowed,
                Some(ProfileStatus::Rejected) => Access::Rejected,
                Some(ProfileStatus::Pending) | None => Access::Pending,
            },
        }
    }
}

/// Outcome of the protected-route check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Not signed in: go to the login screen
    Login,
    /// Signed in but waiting for approval
    Pending,
    /// Signed in and refused
    Rejected,
    Allowed,
}

/// Owns the session and tells subscribers when the identity changes
pub struct AuthProvider {
    client: Chantier,
    state: watch::Sender<AuthState>,
}

impl AuthProvider {
    pub fn new(client: Chantier) -> Self {
        let (state, _) = watch::channel(AuthState::Initializing);
        Self { client, state }
    }

    /// Resolve the initial state from whatever session the client holds
    pub async fn initialize(&self) -> Result<()> {
        if self.client.auth().get_session().await.is_none() {
            self.state.send_replace(AuthState::SignedOut);
            return Ok(());
        }

        match self.client.auth().get_user().await {
            Ok(user) => self.publish(user).await,
            Err(err) => {
                warn!("stored session is no longer valid: {}", err);
                self.client.auth().clear_session().await;
                self.state.send_replace(AuthState::SignedOut);
                Ok(())
            }
        }
    }

    /// Sign in with email and password
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        let session = self
            .client
            .auth()
            .sign_in_with_password(&Credentials::new(email, password))
            .await?;
        let user = session.user.clone();
        self.publish(user.clone()).await?;
        Ok(user)
    }

    /// Adopt a session obtained elsewhere, such as an invitation callback
    pub async fn restore(&self, session: Session) -> Result<User> {
        self.client.auth().set_session(session).await;
        let user = self.client.auth().get_user().await?;
        self.publish(user.clone()).await?;
        Ok(user)
    }

    /// Sign out. Observers always see `SignedOut`, even if the server
    /// could not be reached.
    pub async fn sign_out(&self) -> Result<()> {
        let result = self.client.auth().sign_out().await;
        self.state.send_replace(AuthState::SignedOut);
        match result {
            Ok(()) | Err(Error::NotAuthenticated) => Ok(()),
            Err(err) => {
                warn!("sign out did not reach the server: {}", err);
                Err(err)
            }
        }
    }

    /// Re-read the profile of the signed-in identity
    pub async fn refresh_profile(&self) -> Result<Option<Profile>> {
        let user = self.current_user().ok_or(Error::NotAuthenticated)?;
        self.publish(user).await?;
        Ok(self.profile())
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    pub fn profile(&self) -> Option<Profile> {
        self.state.borrow().profile().cloned()
    }

    pub fn access(&self) -> Access {
        self.state.borrow().access()
    }

    pub fn is_admin(&self) -> bool {
        self.state
            .borrow()
            .profile()
            .map(|p| p.role == UserRole::Admin)
            .unwrap_or(false)
    }

    /// Access token of an approved identity.
    ///
    /// Checked locally; nothing is sent when this fails.
    pub async fn require_approved(&self) -> Result<String> {
        match self.access() {
            Access::Login => return Err(Error::NotAuthenticated),
            Access::Pending => return Err(Error::NotApproved(ProfileStatus::Pending)),
            Access::Rejected => return Err(Error::NotApproved(ProfileStatus::Rejected)),
            Access::Allowed => {}
        }

        self.client
            .auth()
            .access_token()
            .await
            .ok_or(Error::NotAuthenticated)
    }

    /// Access token of any signed-in identity
    pub async fn require_session(&self) -> Result<String> {
        self.client
            .auth()
            .access_token()
            .await
            .ok_or(Error::NotAuthenticated)
    }

    async fn publish(&self, user: User) -> Result<()> {
        let profile = self.load_profile(&user).await?;
        match &profile {
            Some(p) => info!("{} is {}", user.id, p.status),
            None => debug!("{} has no profile yet", user.id),
        }
        self.state.send_replace(AuthState::SignedIn { user, profile });
        Ok(())
    }

    async fn load_profile(&self, user: &User) -> Result<Option<Profile>> {
        let token = self.require_session().await?;
        self.client
            .from(PROFILES_TABLE)
            .with_auth(&token)
            .select("*")
            .eq("user_id", &user.id)
            .execute_one::<Profile>()
            .await
    }
}
