use crate::api::backend::{AuditApi, DataBackend, decode};
use crate::api::models::{AppRole, CurrentUser};
use crate::api::query::{Filter, Query};
use crate::error::ApiError;
use crate::utils::error_helpers::*;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::{Value, json};
use std::time::Duration;
use uuid::Uuid;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("hr-cli/", env!("CARGO_PKG_VERSION"));
const REST_PREFIX: &str = "/rest/v1";
const AUDIT_LOGS_PATH: &str = "/api/audit-logs";
const REALTIME_PATH: &str = "/realtime/v1/websocket";

/// HTTP client for the hosted backend (tables, procedures, auth, audit API).
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    pub base_url: String,
    anon_key: String,
    access_token: Option<String>,
}

impl BackendClient {
    // Create base client with default settings
    pub fn new(base_url: String, anon_key: String) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| convert_request_error(e, "client_init"))?;

        Ok(BackendClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
            access_token: None,
        })
    }

    pub fn with_access_token(
        base_url: String,
        anon_key: String,
        access_token: String,
    ) -> Result<Self, ApiError> {
        let mut client = BackendClient::new(base_url, anon_key)?;
        client.access_token = Some(access_token);
        Ok(client)
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    pub fn build_request(&self, method: Method, path: &str) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        self.build_request_with_bearer(method, path, bearer)
    }

    /// Request carrying `apikey` and exactly one `Authorization` header for `bearer`.
    pub fn build_request_with_bearer(&self, method: Method, path: &str, bearer: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);

        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    async fn send(&self, request: RequestBuilder, endpoint: &str) -> Result<Value, ApiError> {
        let response = crate::map_api_error!(request.send().await, endpoint)?;
        Self::handle_response(response, endpoint).await
    }

    pub async fn handle_response<T>(response: Response, endpoint: &str) -> Result<T, ApiError>
    where
        T: serde::de::DeserializeOwned,
    {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| convert_request_error(e, endpoint))?;

        if status.is_success() {
            let body = if body.trim().is_empty() { "null" } else { &body };
            serde_json::from_str(body).map_err(|e| convert_json_error(e, endpoint))
        } else {
            match status.as_u16() {
                408 | 504 => Err(convert_timeout_error(endpoint, DEFAULT_TIMEOUT_SECS)),
                code => Err(convert_error_body(code, endpoint, &body)),
            }
        }
    }

    /// Resolve the user behind the current access token.
    pub async fn current_user(&self) -> Result<CurrentUser, ApiError> {
        let endpoint = "/auth/v1/user";
        let value = self
            .send(self.build_request(Method::GET, endpoint), endpoint)
            .await?;
        decode(value, endpoint)
    }

    /// Roles assigned to a user, via the `get_user_roles` procedure.
    ///
    /// Role names this client does not know are skipped.
    pub async fn user_roles(&self, user_id: Uuid) -> Result<Vec<AppRole>, ApiError> {
        let value = self
            .rpc("get_user_roles", json!({ "_user_id": user_id }))
            .await?;
        let names: Vec<String> = match value {
            Value::Null => Vec::new(),
            other => decode(other, "rpc/get_user_roles")?,
        };
        Ok(names
            .iter()
            .filter_map(|name| match name.parse::<AppRole>() {
                Ok(role) => Some(role),
                Err(e) => {
                    log::warn!("Ignoring role from backend: {}", e);
                    None
                }
            })
            .collect())
    }

    /// Websocket URL of the realtime service.
    pub fn realtime_url(&self) -> Result<String, ApiError> {
        let mut url = url::Url::parse(&self.base_url).map_err(|e| ApiError::Realtime {
            topic: "phoenix".to_string(),
            message: format!("invalid backend URL '{}': {}", self.base_url, e),
        })?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme).map_err(|_| ApiError::Realtime {
            topic: "phoenix".to_string(),
            message: format!("cannot derive websocket URL from '{}'", self.base_url),
        })?;
        let path = format!("{}{}", url.path().trim_end_matches('/'), REALTIME_PATH);
        url.set_path(&path);
        url.query_pairs_mut()
            .clear()
            .append_pair("apikey", &self.anon_key)
            .append_pair("vsn", "1.0.0");
        Ok(url.to_string())
    }
}

#[async_trait]
impl DataBackend for BackendClient {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, ApiError> {
        let endpoint = format!("{}/{}", REST_PREFIX, query.table);
        let request = self
            .build_request(Method::GET, &endpoint)
            .query(&query.to_params());
        let value = self.send(request, &endpoint).await?;
        decode(value, &endpoint)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, ApiError> {
        let endpoint = format!("{}/{}", REST_PREFIX, table);
        let request = self
            .build_request(Method::POST, &endpoint)
            .header("Prefer", "return=representation")
            .json(&row);
        let rows: Vec<Value> = decode(self.send(request, &endpoint).await?, &endpoint)?;
        rows.into_iter().next().ok_or_else(|| ApiError::Decode {
            endpoint,
            message: "insert returned no rows".to_string(),
        })
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Value,
    ) -> Result<Vec<Value>, ApiError> {
        let endpoint = format!("{}/{}", REST_PREFIX, table);
        let params: Vec<(String, String)> = filters.iter().map(Filter::to_param).collect();
        let request = self
            .build_request(Method::PATCH, &endpoint)
            .header("Prefer", "return=representation")
            .query(&params)
            .json(&patch);
        decode(self.send(request, &endpoint).await?, &endpoint)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), ApiError> {
        let endpoint = format!("{}/{}", REST_PREFIX, table);
        let params: Vec<(String, String)> = filters.iter().map(Filter::to_param).collect();
        let request = self.build_request(Method::DELETE, &endpoint).query(&params);
        self.send(request, &endpoint).await?;
        Ok(())
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<Value, ApiError> {
        let endpoint = format!("{}/rpc/{}", REST_PREFIX, function);
        let request = self.build_request(Method::POST, &endpoint).json(&args);
        self.send(request, &endpoint).await
    }
}

#[async_trait]
impl AuditApi for BackendClient {
    async fn fetch_audit_logs(&self, access_token: &str) -> Result<Vec<Value>, ApiError> {
        let request = self.build_request_with_bearer(Method::GET, AUDIT_LOGS_PATH, access_token);
        let value = self.send(request, AUDIT_LOGS_PATH).await?;
        decode(value, AUDIT_LOGS_PATH)
    }
}
