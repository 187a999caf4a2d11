//! Cost center store: active listing, CRUD and live refresh.

use super::types::{ResourceState, load_into};
use crate::api::backend::{DataBackend, decode, decode_rows};
use crate::api::models::{CostCenter, CostCenterPatch, NewCostCenter};
use crate::api::query::{Filter, Order, Query};
use crate::api::realtime::{ChangeFeed, ChangeFilter};
use crate::core::auth::AuthContext;
use crate::core::classify::notify_error;
use crate::core::notify::{Notification, Notifier};
use crate::error::{AppError, ServiceError, UtilsError};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const COST_CENTERS_TABLE: &str = "cost_centers";

/// Why a [`CostCenterStore::watch`] loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchExit {
    Shutdown,
    SignedOut,
    FeedClosed,
}

#[derive(Clone)]
pub struct CostCenterStore {
    backend: Arc<dyn DataBackend>,
    auth: AuthContext,
    notifier: Arc<dyn Notifier>,
    state: Arc<RwLock<ResourceState<Vec<CostCenter>>>>,
    revision: Arc<watch::Sender<u64>>,
}

impl CostCenterStore {
    pub fn new(backend: Arc<dyn DataBackend>, auth: AuthContext, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            backend,
            auth,
            notifier,
            state: Arc::new(RwLock::new(ResourceState::new())),
            revision: Arc::new(watch::channel(0).0),
        }
    }

    /// Ticks every time the local list changes.
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    pub async fn snapshot(&self) -> ResourceState<Vec<CostCenter>> {
        self.state.read().await.clone()
    }

    /// Load active cost centers ordered by code.
    ///
    /// Without a session nothing is requested and the current list is
    /// returned unchanged.
    pub async fn fetch(&self) -> Result<Vec<CostCenter>, AppError> {
        if !self.auth.is_signed_in() {
            log::debug!("Skipping cost center fetch: no session");
            return Ok(self.state.read().await.data.clone());
        }

        let query = Query::table(COST_CENTERS_TABLE)
            .eq("is_active", true)
            .order("code", Order::Asc);
        let backend = Arc::clone(&self.backend);
        let result = load_into(&self.state, self.notifier.as_ref(), async move {
            let rows = backend.select(&query).await?;
            Ok(decode_rows::<CostCenter>(rows, COST_CENTERS_TABLE)?)
        })
        .await;
        if result.is_ok() {
            self.bump();
        }
        result
    }

    /// Create a cost center owned by the acting user.
    pub async fn create(&self, input: NewCostCenter) -> Result<CostCenter, AppError> {
        let result = self.try_create(input).await;
        match &result {
            Ok(created) => {
                self.replace_local(created.clone()).await;
                self.notifier.notify(Notification::success(format!(
                    "Cost center {} created successfully",
                    created.code
                )));
            }
            Err(error) => {
                notify_error(self.notifier.as_ref(), error);
            }
        }
        result
    }

    async fn try_create(&self, input: NewCostCenter) -> Result<CostCenter, AppError> {
        let session = self.auth.require_session()?;
        if input.code.trim().is_empty() || input.name.trim().is_empty() {
            return Err(UtilsError::Validation {
                message: "Code and name are required".to_string(),
            }
            .into());
        }

        let input = NewCostCenter {
            code: input.code.trim().to_string(),
            name: input.name.trim().to_string(),
            ..input
        };
        let mut row = crate::map_json_error!(serde_json::to_value(&input), COST_CENTERS_TABLE)?;
        if let Value::Object(map) = &mut row {
            map.insert("created_by".to_string(), json!(session.user_id));
        }

        let stored = self.backend.insert(COST_CENTERS_TABLE, row).await?;
        Ok(decode(stored, COST_CENTERS_TABLE)?)
    }

    /// Apply a partial update and replace the local entry.
    pub async fn update(&self, id: Uuid, patch: CostCenterPatch) -> Result<CostCenter, AppError> {
        let result = self.try_update(id, patch).await;
        match &result {
            Ok(updated) => {
                self.replace_local(updated.clone()).await;
                self.notifier
                    .notify(Notification::success("Cost center updated successfully"));
            }
            Err(error) => {
                notify_error(self.notifier.as_ref(), error);
            }
        }
        result
    }

    async fn try_update(&self, id: Uuid, patch: CostCenterPatch) -> Result<CostCenter, AppError> {
        self.auth.require_session()?;
        if patch.is_empty() {
            return Err(UtilsError::Validation {
                message: "No changes to apply".to_string(),
            }
            .into());
        }
        let body = crate::map_json_error!(serde_json::to_value(&patch), COST_CENTERS_TABLE)?;
        self.patch_one(id, body).await
    }

    /// Soft delete: set `is_active = false` and drop the entry from the
    /// visible list. The row stays on the server.
    pub async fn deactivate(&self, id: Uuid) -> Result<(), AppError> {
        let result = match self.auth.require_session() {
            Ok(_) => self.patch_one(id, json!({ "is_active": false })).await,
            Err(e) => Err(AppError::Auth(e)),
        };
        match result {
            Ok(_) => {
                self.state.write().await.data.retain(|cc| cc.id != id);
                self.bump();
                self.notifier
                    .notify(Notification::success("Cost center deleted successfully"));
                Ok(())
            }
            Err(error) => {
                notify_error(self.notifier.as_ref(), &error);
                Err(error)
            }
        }
    }

    async fn patch_one(&self, id: Uuid, body: Value) -> Result<CostCenter, AppError> {
        let rows = self
            .backend
            .update(COST_CENTERS_TABLE, &[Filter::eq("id", id)], body)
            .await?;
        let row = rows.into_iter().next().ok_or_else(|| ServiceError::NotFound {
            resource_type: "Cost center".to_string(),
            id: id.to_string(),
        })?;
        Ok(decode(row, COST_CENTERS_TABLE)?)
    }

    async fn replace_local(&self, updated: CostCenter) {
        let mut guard = self.state.write().await;
        if !updated.is_active {
            guard.data.retain(|cc| cc.id != updated.id);
        } else if let Some(entry) = guard.data.iter_mut().find(|cc| cc.id == updated.id) {
            *entry = updated;
        } else {
            guard.data.push(updated);
        }
        guard.data.sort_by(|a, b| a.code.cmp(&b.code));
        drop(guard);
        self.bump();
    }

    /// Keep the list current with backend changes until `shutdown` fires,
    /// the feed closes or the user signs out.
    ///
    /// Every insert, update or delete on the table triggers a re-fetch. When
    /// the acting identity changes the subscription is released, the list is
    /// re-fetched and a new subscription is opened for the new identity.
    pub async fn watch(
        &self,
        feed: Arc<dyn ChangeFeed>,
        shutdown: CancellationToken,
    ) -> Result<WatchExit, AppError> {
        let mut identity = self.auth.subscribe();

        loop {
            if identity.borrow_and_update().is_none() {
                log::debug!("Cost center watch stopped: signed out");
                return Ok(WatchExit::SignedOut);
            }

            let _ = self.fetch().await;
            let mut subscription = match feed.subscribe(COST_CENTERS_TABLE, ChangeFilter::All).await
            {
                Ok(subscription) => subscription,
                Err(e) => {
                    let error = AppError::Api(e);
                    notify_error(self.notifier.as_ref(), &error);
                    return Err(error);
                }
            };
            log::debug!("Watching {}", subscription.topic());

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => return Ok(WatchExit::Shutdown),
                    changed = identity.changed() => {
                        if changed.is_err() {
                            return Ok(WatchExit::SignedOut);
                        }
                        log::debug!("Identity changed; restarting cost center watch");
                        break;
                    }
                    event = subscription.next_event() => match event {
                        Some(event) => {
                            log::debug!("{} on {}; refreshing", event.kind, event.table);
                            let _ = self.fetch().await;
                        }
                        None => {
                            log::warn!("Cost center change feed closed");
                            return Ok(WatchExit::FeedClosed);
                        }
                    }
                }
            }
        }
    }
}
