use crate::api::models::AppRole;
use crate::core::auth::{AuthContext, Session};
use crate::core::classify::notify_error;
use crate::core::notify::Notifier;
use crate::error::{AppError, AuthError};
use std::future::Future;
use tokio::sync::RwLock;

/// Observable state of one backend resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceState<T> {
    pub data: T,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T: Default> ResourceState<T> {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Role requirement checked before a gated backend call.
#[derive(Debug, Clone, Copy)]
pub struct RoleGate {
    pub any_of: &'static [AppRole],
    pub denied_message: &'static str,
}

impl RoleGate {
    pub const EMPLOYEE: RoleGate = RoleGate {
        any_of: &[AppRole::Employee],
        denied_message: "Access denied. Employee role required.",
    };

    pub const ADMINISTRATOR: RoleGate = RoleGate {
        any_of: &[AppRole::Admin, AppRole::SuperAdmin],
        denied_message: "Access denied. Administrative privileges required.",
    };

    /// The session when it holds one of the required roles.
    pub fn check(&self, auth: &AuthContext) -> Result<Session, AuthError> {
        match auth.current() {
            Some(session) if session.has_any_role(self.any_of) => Ok(session),
            _ => Err(AuthError::AccessDenied {
                message: self.denied_message.to_string(),
            }),
        }
    }
}

/// Run a load against `state`: flag loading, then store the data or the
/// error. Failures are classified and delivered to `notifier`.
pub(crate) async fn load_into<T, F>(
    state: &RwLock<ResourceState<T>>,
    notifier: &dyn Notifier,
    load: F,
) -> Result<T, AppError>
where
    T: Clone,
    F: Future<Output = Result<T, AppError>>,
{
    state.write().await.loading = true;

    let result = load.await;
    let mut guard = state.write().await;
    guard.loading = false;
    match result {
        Ok(data) => {
            guard.data = data.clone();
            guard.error = None;
            Ok(data)
        }
        Err(error) => {
            guard.error = Some(error.display_friendly());
            drop(guard);
            notify_error(notifier, &error);
            Err(error)
        }
    }
}

/// Record an access-denied outcome without touching the backend.
pub(crate) async fn deny_into<T>(state: &RwLock<ResourceState<T>>, error: AuthError) -> AppError {
    let mut guard = state.write().await;
    guard.loading = false;
    guard.error = Some(error.to_string());
    log::debug!("{}", error);
    AppError::Auth(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::notify::MemoryNotifier;
    use crate::error::ApiError;
    use uuid::Uuid;

    #[test]
    fn test_role_gate() {
        let auth = AuthContext::new();
        let err = RoleGate::EMPLOYEE.check(&auth).unwrap_err();
        assert_eq!(err.to_string(), "Access denied. Employee role required.");

        auth.sign_in(Session::new(Uuid::new_v4(), "t").with_roles([AppRole::SuperAdmin]));
        assert!(RoleGate::ADMINISTRATOR.check(&auth).is_ok());
        assert!(RoleGate::EMPLOYEE.check(&auth).is_err());
    }

    #[tokio::test]
    async fn test_load_into_success_clears_error() {
        let state = RwLock::new(ResourceState::<Vec<u32>> {
            data: Vec::new(),
            loading: false,
            error: Some("stale".to_string()),
        });
        let notifier = MemoryNotifier::new();

        let data = load_into(&state, &notifier, async { Ok(vec![1, 2]) })
            .await
            .unwrap();
        assert_eq!(data, vec![1, 2]);

        let snapshot = state.read().await.clone();
        assert_eq!(snapshot.data, vec![1, 2]);
        assert!(!snapshot.loading);
        assert!(snapshot.error.is_none());
        assert!(notifier.is_empty());
    }

    #[tokio::test]
    async fn test_load_into_failure_keeps_data() {
        let state = RwLock::new(ResourceState {
            data: vec![7u32],
            loading: false,
            error: None,
        });
        let notifier = MemoryNotifier::new();

        let result = load_into(&state, &notifier, async {
            Err(AppError::Api(ApiError::Transport {
                endpoint: "/rest/v1/cost_centers".to_string(),
                message: "connection refused".to_string(),
            }))
        })
        .await;
        assert!(result.is_err());

        let snapshot = state.read().await.clone();
        assert_eq!(snapshot.data, vec![7]);
        assert!(!snapshot.loading);
        assert_eq!(snapshot.error.as_deref(), Some("Network error: connection refused"));
        assert_eq!(notifier.len(), 1);
    }
}
