//! In-memory backend and change feed for store tests.

use crate::api::backend::DataBackend;
use crate::api::query::{Filter, Order, Query};
use crate::api::realtime::{ChangeEvent, ChangeFeed, ChangeFilter, Subscription, topic_for};
use crate::error::ApiError;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    unique: Mutex<HashMap<String, String>>,
    rpc_results: Mutex<HashMap<String, Result<Value, ApiError>>>,
    rpc_calls: Mutex<Vec<(String, Value)>>,
    failure: Mutex<Option<ApiError>>,
    calls: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(self, table: &str, rows: Vec<Value>) -> Self {
        self.tables.lock().unwrap().insert(table.to_string(), rows);
        self
    }

    pub fn with_unique(self, table: &str, column: &str) -> Self {
        self.unique
            .lock()
            .unwrap()
            .insert(table.to_string(), column.to_string());
        self
    }

    pub fn with_rpc(self, function: &str, result: Result<Value, ApiError>) -> Self {
        self.set_rpc(function, result);
        self
    }

    pub fn set_rpc(&self, function: &str, result: Result<Value, ApiError>) {
        self.rpc_results
            .lock()
            .unwrap()
            .insert(function.to_string(), result);
    }

    /// Make every following call fail with `error`.
    pub fn fail_with(&self, error: ApiError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn rpc_calls(&self) -> Vec<(String, Value)> {
        self.rpc_calls.lock().unwrap().clone()
    }

    fn begin(&self) -> Result<(), ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failure.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

pub fn backend_error(code: Option<&str>, message: &str) -> ApiError {
    ApiError::Backend {
        status: 400,
        endpoint: "memory".to_string(),
        code: code.map(str::to_string),
        message: message.to_string(),
        details: None,
        hint: None,
    }
}

fn sort_key(row: &Value, column: &str) -> String {
    match row.get(column) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[async_trait]
impl DataBackend for MemoryBackend {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, ApiError> {
        self.begin()?;
        let mut rows: Vec<Value> = self
            .rows(&query.table)
            .into_iter()
            .filter(|row| query.filters.iter().all(|f| f.matches(row)))
            .collect();
        for (column, order) in query.order.iter().rev() {
            rows.sort_by(|a, b| {
                let ord = sort_key(a, column).cmp(&sort_key(b, column));
                match order {
                    Order::Asc => ord,
                    Order::Desc => ord.reverse(),
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, ApiError> {
        self.begin()?;
        let mut row = row;
        if let Value::Object(map) = &mut row {
            let now = Utc::now().to_rfc3339();
            map.entry("id").or_insert_with(|| json!(Uuid::new_v4()));
            map.entry("created_at").or_insert_with(|| json!(now));
            map.entry("updated_at").or_insert_with(|| json!(now));
            map.entry("is_active").or_insert(json!(true));
        }

        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();
        if let Some(column) = self.unique.lock().unwrap().get(table) {
            if rows.iter().any(|r| r.get(column) == row.get(column)) {
                return Err(backend_error(
                    Some("23505"),
                    &format!(
                        "duplicate key value violates unique constraint \"{}_{}_key\"",
                        table, column
                    ),
                ));
            }
        }
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Value,
    ) -> Result<Vec<Value>, ApiError> {
        self.begin()?;
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();
        let mut updated = Vec::new();
        for row in rows.iter_mut() {
            if !filters.iter().all(|f| f.matches(row)) {
                continue;
            }
            if let (Value::Object(target), Value::Object(changes)) = (&mut *row, &patch) {
                for (key, value) in changes {
                    target.insert(key.clone(), value.clone());
                }
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), ApiError> {
        self.begin()?;
        let mut tables = self.tables.lock().unwrap();
        if let Some(rows) = tables.get_mut(table) {
            rows.retain(|row| !filters.iter().all(|f| f.matches(row)));
        }
        Ok(())
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<Value, ApiError> {
        self.begin()?;
        self.rpc_calls
            .lock()
            .unwrap()
            .push((function.to_string(), args));
        self.rpc_results
            .lock()
            .unwrap()
            .get(function)
            .cloned()
            .unwrap_or(Ok(Value::Null))
    }
}

/// Change feed whose events are pushed by the test.
#[derive(Default)]
pub struct FakeFeed {
    senders: Mutex<Vec<mpsc::Sender<ChangeEvent>>>,
    tokens: Mutex<Vec<CancellationToken>>,
}

impl FakeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscription_count(&self) -> usize {
        self.tokens.lock().unwrap().len()
    }

    pub fn cancelled_count(&self) -> usize {
        self.tokens
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.is_cancelled())
            .count()
    }

    /// Deliver an event to the most recent subscription.
    pub async fn push(&self, event: ChangeEvent) -> bool {
        let sender = self.senders.lock().unwrap().last().cloned();
        match sender {
            Some(sender) => sender.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Close the most recent subscription's event stream.
    pub fn close_latest(&self) {
        self.senders.lock().unwrap().pop();
    }
}

#[async_trait]
impl ChangeFeed for FakeFeed {
    async fn subscribe(&self, table: &str, _filter: ChangeFilter) -> Result<Subscription, ApiError> {
        let (tx, rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        self.senders.lock().unwrap().push(tx);
        self.tokens.lock().unwrap().push(cancel.clone());
        Ok(Subscription::new(topic_for(table), rx, cancel))
    }
}
