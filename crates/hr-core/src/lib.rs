//! # hr-core
//!
//! Client library for the HR administration backend: a PostgREST-style
//! query surface, realtime change feeds, and per-resource stores that apply
//! role gates, classify failures and raise user notifications.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hr_core::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> hr_core::Result<()> {
//!     let connection = ConfigService::load(None)?.connection()?;
//!     let client = BackendClient::with_access_token(
//!         connection.url,
//!         connection.anon_key,
//!         std::env::var("HR_ACCESS_TOKEN").unwrap_or_default(),
//!     )?;
//!     let auth = AuthContext::signed_in(restore_session(&client).await?);
//!
//!     let store = CostCenterStore::new(Arc::new(client), auth, Arc::new(ConsoleNotifier));
//!     for cost_center in store.fetch().await? {
//!         println!("{} {}", cost_center.code, cost_center.name);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │           API Layer                 │  REST/RPC client, realtime, models
//! ├─────────────────────────────────────┤
//! │          Core Layer                 │  Auth context, stores, classification
//! ├─────────────────────────────────────┤
//! │        Storage Layer                │  Config file, access token lookup
//! ├─────────────────────────────────────┤
//! │         Utils Layer                 │  Validation, sanitization, helpers
//! └─────────────────────────────────────┘
//! ```

pub use error::AppError;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use hr_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::Result;
    pub use crate::error::AppError;

    pub use crate::api::backend::{AuditApi, DataBackend};
    pub use crate::api::client::BackendClient;
    pub use crate::api::models::{
        AppPermission, AppRole, AuditLogEntry, CostCenter, EmployeeStatus, EmployeeUpdateData,
        SafeEmployeeData,
    };
    pub use crate::api::realtime::{ChangeFeed, RealtimeClient};

    pub use crate::core::auth::{AuthContext, Session, restore_session};
    pub use crate::core::notify::{Notification, Notifier};
    pub use crate::core::services::audit_log_service::AuditLogStore;
    pub use crate::core::services::config_service::ConfigService;
    pub use crate::core::services::cost_center_service::CostCenterStore;
    pub use crate::core::services::employee_self_service::EmployeeSelfStore;
    pub use crate::core::services::employee_update_service::EmployeeUpdateService;
    pub use crate::core::services::role_service::{RolePermissionStore, RoleService};

    pub use crate::storage::config::Config;

    pub use crate::display::{ConsoleNotifier, TableDisplay};
}

/// Auth context, error classification, notifications, promotion progress
/// and the per-resource stores.
pub mod core;

/// Config file and access token lookup.
pub mod storage;

/// Validation, sanitization, text and error conversion helpers.
pub mod utils;

/// Backend client, query builder, realtime feed and data models.
pub mod api;

/// Terminal tables, progress rendering and the console notifier.
pub mod display;

/// Layered error types with severity levels and troubleshooting hints.
pub mod error;

/// Convenient Result type alias using [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
