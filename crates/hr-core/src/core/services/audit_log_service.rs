use super::types::{ResourceState, RoleGate, deny_into};
use crate::api::backend::{AuditApi, DataBackend, decode_rows};
use crate::api::models::AuditLogEntry;
use crate::core::auth::AuthContext;
use crate::error::AppError;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

const AUDIT_LOGS_ENDPOINT: &str = "/api/audit-logs";
const LOG_EVENT_FUNCTION: &str = "log_audit_event";

/// Client-side audit event.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuditEvent {
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl AuditEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            ..Default::default()
        }
    }

    pub fn resource(mut self, resource_type: &str, resource_id: impl ToString) -> Self {
        self.resource_type = Some(resource_type.to_string());
        self.resource_id = Some(resource_id.to_string());
        self
    }
}

/// Audit log listing for administrators.
///
/// A failed request is not surfaced as a notification: the listing falls
/// back to empty and the failure is kept in `error`.
pub struct AuditLogStore {
    api: Arc<dyn AuditApi>,
    backend: Arc<dyn DataBackend>,
    auth: AuthContext,
    state: RwLock<ResourceState<Vec<AuditLogEntry>>>,
}

impl AuditLogStore {
    pub fn new(api: Arc<dyn AuditApi>, backend: Arc<dyn DataBackend>, auth: AuthContext) -> Self {
        Self {
            api,
            backend,
            auth,
            state: RwLock::new(ResourceState::new()),
        }
    }

    pub async fn snapshot(&self) -> ResourceState<Vec<AuditLogEntry>> {
        self.state.read().await.clone()
    }

    pub async fn fetch(&self) -> Result<Vec<AuditLogEntry>, AppError> {
        let session = match RoleGate::ADMINISTRATOR.check(&self.auth) {
            Ok(session) => session,
            Err(denied) => return Err(deny_into(&self.state, denied).await),
        };

        self.state.write().await.loading = true;
        let result = match self.api.fetch_audit_logs(&session.access_token).await {
            Ok(rows) => decode_rows::<AuditLogEntry>(rows, AUDIT_LOGS_ENDPOINT),
            Err(e) => Err(e),
        };

        let mut guard = self.state.write().await;
        guard.loading = false;
        match result {
            Ok(entries) => {
                guard.data = entries.clone();
                guard.error = None;
                Ok(entries)
            }
            Err(e) => {
                log::warn!("Audit log request failed, showing no entries: {}", e);
                guard.data = Vec::new();
                guard.error = Some(e.message());
                Ok(Vec::new())
            }
        }
    }

    /// Record an event attributed to the acting user. Failures are logged and
    /// never returned.
    pub async fn log_audit_event(&self, event: AuditEvent) {
        log::info!(
            "Audit event: {}",
            json!({
                "event": &event,
                "actor_id": self.auth.user_id(),
                "timestamp": Utc::now().to_rfc3339(),
            })
        );

        let args = json!({
            "p_event_type": event.event_type,
            "p_actor_id": self.auth.user_id(),
            "p_target_user_id": event.target_user_id,
            "p_resource_type": event.resource_type,
            "p_resource_id": event.resource_id,
            "p_metadata": event.metadata,
        });
        if let Err(e) = self.backend.rpc(LOG_EVENT_FUNCTION, args).await {
            log::warn!("Failed to log audit event: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::AppRole;
    use crate::core::auth::Session;
    use crate::core::services::test_support::MemoryBackend;
    use crate::error::{ApiError, AuthError};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeAuditApi {
        response: Result<Vec<Value>, ApiError>,
        calls: AtomicUsize,
        tokens: Mutex<Vec<String>>,
    }

    impl FakeAuditApi {
        fn new(response: Result<Vec<Value>, ApiError>) -> Self {
            Self {
                response,
                calls: AtomicUsize::new(0),
                tokens: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AuditApi for FakeAuditApi {
        async fn fetch_audit_logs(&self, access_token: &str) -> Result<Vec<Value>, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.tokens.lock().unwrap().push(access_token.to_string());
            self.response.clone()
        }
    }

    fn admin() -> AuthContext {
        AuthContext::signed_in(Session::new(Uuid::new_v4(), "admin-jwt").with_roles([AppRole::Admin]))
    }

    fn entry() -> Value {
        json!({
            "id": Uuid::new_v4(),
            "event_type": "role_assigned",
            "actor_id": Uuid::new_v4(),
            "old_values": null,
            "new_values": {"role": "hr_staff"},
            "created_at": "2024-05-01T10:00:00Z"
        })
    }

    #[tokio::test]
    async fn test_admin_fetch_uses_bearer_token() {
        let api = Arc::new(FakeAuditApi::new(Ok(vec![entry(), entry()])));
        let store = AuditLogStore::new(api.clone(), Arc::new(MemoryBackend::new()), admin());

        let logs = store.fetch().await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].event_type, "role_assigned");
        assert_eq!(api.tokens.lock().unwrap().as_slice(), ["admin-jwt"]);
    }

    #[tokio::test]
    async fn test_non_admin_is_denied_without_request() {
        let api = Arc::new(FakeAuditApi::new(Ok(vec![entry()])));
        let auth = AuthContext::signed_in(
            Session::new(Uuid::new_v4(), "t").with_roles([AppRole::HrManager, AppRole::Employee]),
        );
        let store = AuditLogStore::new(api.clone(), Arc::new(MemoryBackend::new()), auth);

        let err = store.fetch().await.unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthError::AccessDenied { .. })));
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            store.snapshot().await.error.as_deref(),
            Some("Access denied. Administrative privileges required.")
        );
    }

    #[tokio::test]
    async fn test_request_failure_degrades_to_empty() {
        let api = Arc::new(FakeAuditApi::new(Err(ApiError::Http {
            status: 404,
            endpoint: AUDIT_LOGS_ENDPOINT.to_string(),
            message: "Not Found".to_string(),
        })));
        let super_admin = AuthContext::signed_in(
            Session::new(Uuid::new_v4(), "t").with_roles([AppRole::SuperAdmin]),
        );
        let store = AuditLogStore::new(api, Arc::new(MemoryBackend::new()), super_admin);

        let logs = store.fetch().await.unwrap();
        assert!(logs.is_empty());
        let state = store.snapshot().await;
        assert!(state.data.is_empty());
        assert_eq!(state.error.as_deref(), Some("Not Found"));
    }

    #[tokio::test]
    async fn test_log_audit_event_is_best_effort() {
        let backend = Arc::new(MemoryBackend::new());
        let store = AuditLogStore::new(
            Arc::new(FakeAuditApi::new(Ok(Vec::new()))),
            backend.clone(),
            admin(),
        );

        store
            .log_audit_event(AuditEvent::new("cost_center_deleted").resource("cost_center", "CC-1"))
            .await;
        let calls = backend.rpc_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, LOG_EVENT_FUNCTION);
        assert_eq!(calls[0].1["p_resource_id"], json!("CC-1"));

        backend.fail_with(crate::core::services::test_support::backend_error(None, "boom"));
        store.log_audit_event(AuditEvent::new("noop")).await;
    }
}
