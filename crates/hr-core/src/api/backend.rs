use crate::api::query::{Filter, Query};
use crate::error::ApiError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Table and procedure access against the hosted database.
///
/// Stores receive this as an injected handle so they can be exercised
/// against an in-memory implementation.
#[async_trait]
pub trait DataBackend: Send + Sync {
    /// Rows matching the query.
    async fn select(&self, query: &Query) -> Result<Vec<Value>, ApiError>;

    /// Insert one row and return the stored representation.
    async fn insert(&self, table: &str, row: Value) -> Result<Value, ApiError>;

    /// Apply `patch` to every row matching `filters`; returns the updated rows.
    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Value,
    ) -> Result<Vec<Value>, ApiError>;

    /// Physically delete matching rows.
    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), ApiError>;

    /// Call a stored procedure.
    async fn rpc(&self, function: &str, args: Value) -> Result<Value, ApiError>;
}

/// The audit HTTP API.
#[async_trait]
pub trait AuditApi: Send + Sync {
    async fn fetch_audit_logs(&self, access_token: &str) -> Result<Vec<Value>, ApiError>;
}

/// Decode a JSON value into a model, tagging failures with the endpoint.
pub fn decode<T: DeserializeOwned>(value: Value, endpoint: &str) -> Result<T, ApiError> {
    serde_json::from_value(value)
        .map_err(|e| crate::utils::error_helpers::convert_json_error(e, endpoint))
}

pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>, endpoint: &str) -> Result<Vec<T>, ApiError> {
    rows.into_iter().map(|row| decode(row, endpoint)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::RolePermission;
    use serde_json::json;

    #[test]
    fn test_decode_rows_reports_endpoint() {
        let rows = vec![json!({"id": "not-a-uuid", "role": "admin", "permission": "roles.read"})];
        let err = decode_rows::<RolePermission>(rows, "role_permissions").unwrap_err();
        match err {
            ApiError::Decode { endpoint, .. } => assert_eq!(endpoint, "role_permissions"),
            other => panic!("Expected Decode error, got {:?}", other),
        }
    }
}
