use super::types::{ResourceState, RoleGate, deny_into, load_into};
use crate::api::backend::{DataBackend, decode};
use crate::api::models::SafeEmployeeData;
use crate::core::auth::AuthContext;
use crate::core::classify::notify_error;
use crate::core::notify::Notifier;
use crate::error::AppError;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::RwLock;

pub const SAFE_DATA_FUNCTION: &str = "get_employee_safe_data";

/// The signed-in employee's own record, without sensitive fields.
pub struct EmployeeSelfStore {
    backend: Arc<dyn DataBackend>,
    auth: AuthContext,
    notifier: Arc<dyn Notifier>,
    state: RwLock<ResourceState<Option<SafeEmployeeData>>>,
}

impl EmployeeSelfStore {
    pub fn new(backend: Arc<dyn DataBackend>, auth: AuthContext, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            backend,
            auth,
            notifier,
            state: RwLock::new(ResourceState::new()),
        }
    }

    pub async fn snapshot(&self) -> ResourceState<Option<SafeEmployeeData>> {
        self.state.read().await.clone()
    }

    /// Fetch the caller's safe projection. Requires the `employee` role; the
    /// procedure is not called otherwise.
    pub async fn fetch(&self) -> Result<Option<SafeEmployeeData>, AppError> {
        if let Err(denied) = RoleGate::EMPLOYEE.check(&self.auth) {
            let error = deny_into(&self.state, denied).await;
            notify_error(self.notifier.as_ref(), &error);
            return Err(error);
        }

        let backend = Arc::clone(&self.backend);
        load_into(&self.state, self.notifier.as_ref(), async move {
            let value = backend.rpc(SAFE_DATA_FUNCTION, json!({})).await?;
            let endpoint = format!("rpc/{}", SAFE_DATA_FUNCTION);
            let first = match value {
                Value::Array(rows) => rows.into_iter().next(),
                Value::Null => None,
                row => Some(row),
            };
            match first {
                Some(row) => Ok(Some(decode::<SafeEmployeeData>(row, &endpoint)?)),
                None => Ok(None),
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::AppRole;
    use crate::core::auth::Session;
    use crate::core::notify::MemoryNotifier;
    use crate::core::services::test_support::MemoryBackend;
    use crate::error::AuthError;
    use uuid::Uuid;

    fn employee_row(employee_id: &str) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "employee_id": employee_id,
            "english_name": "Sara Ahmed",
            "status": "active",
            "position_title": "Accountant",
            "id_number": "784-1990-1234567-1"
        })
    }

    fn auth_with(roles: &[AppRole]) -> AuthContext {
        AuthContext::signed_in(Session::new(Uuid::new_v4(), "t").with_roles(roles.iter().copied()))
    }

    #[tokio::test]
    async fn test_fetch_takes_first_row() {
        let backend = Arc::new(MemoryBackend::new().with_rpc(
            SAFE_DATA_FUNCTION,
            Ok(json!([employee_row("EMP-001"), employee_row("EMP-002")])),
        ));
        let store = EmployeeSelfStore::new(
            backend.clone(),
            auth_with(&[AppRole::Employee]),
            Arc::new(MemoryNotifier::new()),
        );

        let data = store.fetch().await.unwrap().unwrap();
        assert_eq!(data.employee_id, "EMP-001");
        assert_eq!(data.position_title.as_deref(), Some("Accountant"));
        assert_eq!(backend.rpc_calls()[0].0, SAFE_DATA_FUNCTION);
    }

    #[tokio::test]
    async fn test_fetch_empty_result_is_none() {
        let backend = Arc::new(MemoryBackend::new().with_rpc(SAFE_DATA_FUNCTION, Ok(json!([]))));
        let store = EmployeeSelfStore::new(
            backend,
            auth_with(&[AppRole::Employee]),
            Arc::new(MemoryNotifier::new()),
        );
        assert!(store.fetch().await.unwrap().is_none());
        assert!(store.snapshot().await.error.is_none());
    }

    #[tokio::test]
    async fn test_fetch_without_employee_role_is_denied_without_call() {
        let backend = Arc::new(MemoryBackend::new());
        let notifier = Arc::new(MemoryNotifier::new());
        let store = EmployeeSelfStore::new(
            backend.clone(),
            auth_with(&[AppRole::Admin]),
            notifier.clone(),
        );

        let err = store.fetch().await.unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthError::AccessDenied { .. })));
        assert_eq!(backend.call_count(), 0);

        let state = store.snapshot().await;
        assert_eq!(
            state.error.as_deref(),
            Some("Access denied. Employee role required.")
        );
        assert!(state.data.is_none());
        assert!(!state.loading);
        assert_eq!(notifier.len(), 1);
    }

    #[tokio::test]
    async fn test_signed_out_is_denied() {
        let backend = Arc::new(MemoryBackend::new());
        let store = EmployeeSelfStore::new(
            backend.clone(),
            AuthContext::new(),
            Arc::new(MemoryNotifier::new()),
        );
        assert!(store.fetch().await.is_err());
        assert_eq!(backend.call_count(), 0);
    }
}
