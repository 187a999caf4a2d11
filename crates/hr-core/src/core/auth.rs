use crate::api::client::BackendClient;
use crate::api::models::AppRole;
use crate::error::{ApiError, AppError, AuthError};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

/// Acting user: identity, bearer token and assigned roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub access_token: String,
    pub roles: BTreeSet<AppRole>,
}

impl Session {
    pub fn new(user_id: Uuid, access_token: impl Into<String>) -> Self {
        Self {
            user_id,
            email: None,
            access_token: access_token.into(),
            roles: BTreeSet::new(),
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = AppRole>) -> Self {
        self.roles.extend(roles);
        self
    }

    pub fn has_role(&self, role: AppRole) -> bool {
        self.roles.contains(&role)
    }

    pub fn has_any_role(&self, roles: &[AppRole]) -> bool {
        roles.iter().any(|role| self.has_role(*role))
    }
}

/// Shared handle on the acting identity.
///
/// Clones observe the same session. Stores read it synchronously before each
/// backend call, and watchers subscribe to it to restart when the identity
/// changes.
#[derive(Debug, Clone)]
pub struct AuthContext {
    sender: Arc<watch::Sender<Option<Session>>>,
}

impl Default for AuthContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthContext {
    /// Context with no signed-in user.
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn signed_in(session: Session) -> Self {
        let context = Self::new();
        context.sign_in(session);
        context
    }

    pub fn current(&self) -> Option<Session> {
        self.sender.borrow().clone()
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.sender.borrow().as_ref().map(|s| s.user_id)
    }

    pub fn is_signed_in(&self) -> bool {
        self.sender.borrow().is_some()
    }

    pub fn has_role(&self, role: AppRole) -> bool {
        self.sender
            .borrow()
            .as_ref()
            .is_some_and(|session| session.has_role(role))
    }

    pub fn has_any_role(&self, roles: &[AppRole]) -> bool {
        self.sender
            .borrow()
            .as_ref()
            .is_some_and(|session| session.has_any_role(roles))
    }

    /// Require a session, returning it or `NotSignedIn`.
    pub fn require_session(&self) -> Result<Session, AuthError> {
        self.current().ok_or(AuthError::NotSignedIn)
    }

    pub fn sign_in(&self, session: Session) {
        log::debug!("Signed in as {}", session.user_id);
        self.sender.send_replace(Some(session));
    }

    pub fn sign_out(&self) {
        if self.sender.send_replace(None).is_some() {
            log::debug!("Signed out");
        }
    }

    /// Receiver that is marked changed on every sign-in or sign-out.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.sender.subscribe()
    }
}

/// Build a session for the client's access token from the auth endpoint and
/// the `get_user_roles` procedure.
pub async fn restore_session(client: &BackendClient) -> Result<Session, AppError> {
    let access_token = client
        .access_token()
        .ok_or(AuthError::NotSignedIn)?
        .to_string();

    let user = client.current_user().await.map_err(|e| match e {
        ApiError::Unauthorized { .. } => AppError::Auth(AuthError::SessionInvalid),
        other => AppError::Api(other),
    })?;
    let roles = client.user_roles(user.id).await?;
    log::debug!("Resolved {} role(s) for user {}", roles.len(), user.id);

    Ok(Session {
        user_id: user.id,
        email: user.email,
        access_token,
        roles: roles.into_iter().collect(),
    })
}
