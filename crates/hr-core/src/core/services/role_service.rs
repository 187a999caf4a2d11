//! Roles: the permission catalog, role-permission assignments and role
//! creation requests.

use super::types::{ResourceState, load_into};
use crate::api::backend::{DataBackend, decode, decode_rows};
use crate::api::models::{AppPermission, AppRole, RolePermission};
use crate::api::query::{Filter, Query};
use crate::core::classify::with_error_handling;
use crate::core::notify::{Notification, Notifier, Variant};
use crate::error::AppError;
use regex::Regex;
use serde_json::json;
use std::sync::{Arc, LazyLock};
use tokio::sync::RwLock;

pub const ROLE_PERMISSIONS_TABLE: &str = "role_permissions";

pub const ROLE_NAME_REQUIRED: &str = "Role name is required";
pub const MIGRATION_REQUIRED_TITLE: &str = "Database Migration Required";
pub const MIGRATION_REQUIRED_MESSAGE: &str = "Adding new roles requires a database migration to update the app_role enum. Contact your system administrator.";

static ROLE_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("valid role name pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionCategory {
    pub name: &'static str,
    pub description: &'static str,
    pub permissions: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppCategory {
    pub name: &'static str,
    pub description: &'static str,
    pub permission_categories: &'static [PermissionCategory],
}

pub const APP_CATEGORIES: &[AppCategory] = &[
    AppCategory {
        name: "HR Management",
        description: "Human Resources management modules",
        permission_categories: &[
            PermissionCategory {
                name: "Employees",
                description: "Manage employee records and data",
                permissions: &["employees.read", "employees.create", "employees.update", "employees.delete"],
            },
            PermissionCategory {
                name: "Attendance",
                description: "Manage employee attendance records",
                permissions: &["attendance.read", "attendance.create", "attendance.update", "attendance.delete"],
            },
            PermissionCategory {
                name: "Recruitment",
                description: "Manage recruitment processes and candidates",
                permissions: &["recruitment.read", "recruitment.create", "recruitment.update", "recruitment.delete"],
            },
        ],
    },
    AppCategory {
        name: "Finance Management",
        description: "Financial management and cost centers",
        permission_categories: &[
            PermissionCategory {
                name: "Cost Centers",
                description: "Manage financial cost centers",
                permissions: &["cost_centers.read", "cost_centers.create", "cost_centers.update", "cost_centers.delete"],
            },
            PermissionCategory {
                name: "Budget Management",
                description: "Manage budgets and financial planning",
                permissions: &["budget.read", "budget.create", "budget.update", "budget.delete"],
            },
        ],
    },
    AppCategory {
        name: "System Administration",
        description: "System-wide settings and user management",
        permission_categories: &[
            PermissionCategory {
                name: "User Management",
                description: "Manage user accounts and access",
                permissions: &["users.read", "users.create", "users.update", "users.delete"],
            },
            PermissionCategory {
                name: "Role Management",
                description: "Manage roles and permissions",
                permissions: &["roles.read", "roles.create", "roles.update", "roles.delete"],
            },
            PermissionCategory {
                name: "System Settings",
                description: "Manage system configuration",
                permissions: &["settings.read", "settings.update"],
            },
        ],
    },
];

/// Every permission key in the catalog, in catalog order.
pub fn all_permissions() -> Vec<&'static str> {
    APP_CATEGORIES
        .iter()
        .flat_map(|app| app.permission_categories.iter())
        .flat_map(|category| category.permissions.iter().copied())
        .collect()
}

/// `cost_centers.read` -> `Read cost_centers`.
pub fn permission_label(permission: &str) -> String {
    match permission.split_once('.') {
        Some((area, action)) => {
            let mut chars = action.chars();
            let action = match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            };
            format!("{} {}", action, area)
        }
        None => permission.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleRequestOutcome {
    Rejected,
    MigrationRequired,
}

/// Role creation. Roles are a database enum, so a request never mutates the
/// backend; it only validates the name and reports what is needed.
pub struct RoleService {
    notifier: Arc<dyn Notifier>,
}

impl RoleService {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub fn request_role(&self, name: &str, description: Option<&str>) -> RoleRequestOutcome {
        let name = name.trim();
        if name.is_empty() {
            self.reject(ROLE_NAME_REQUIRED);
            return RoleRequestOutcome::Rejected;
        }
        if !ROLE_NAME_PATTERN.is_match(name) {
            self.reject("Role name must start with a letter and use only lowercase letters, digits and underscores");
            return RoleRequestOutcome::Rejected;
        }
        if name.parse::<AppRole>().is_ok() {
            self.reject(&format!("Role '{}' already exists", name));
            return RoleRequestOutcome::Rejected;
        }

        log::info!(
            "Role creation requested: {} ({})",
            name,
            description.unwrap_or("no description")
        );
        self.notifier.notify(Notification::new(
            MIGRATION_REQUIRED_TITLE,
            MIGRATION_REQUIRED_MESSAGE,
            Variant::Destructive,
        ));
        RoleRequestOutcome::MigrationRequired
    }

    fn reject(&self, message: &str) {
        self.notifier.notify(Notification::error("Error", message));
    }
}

/// Role-to-permission assignments.
pub struct RolePermissionStore {
    backend: Arc<dyn DataBackend>,
    notifier: Arc<dyn Notifier>,
    state: RwLock<ResourceState<Vec<RolePermission>>>,
}

impl RolePermissionStore {
    pub fn new(backend: Arc<dyn DataBackend>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            backend,
            notifier,
            state: RwLock::new(ResourceState::new()),
        }
    }

    pub async fn snapshot(&self) -> ResourceState<Vec<RolePermission>> {
        self.state.read().await.clone()
    }

    pub async fn fetch(&self) -> Result<Vec<RolePermission>, AppError> {
        let backend = Arc::clone(&self.backend);
        load_into(&self.state, self.notifier.as_ref(), async move {
            let rows = backend.select(&Query::table(ROLE_PERMISSIONS_TABLE)).await?;
            Ok(decode_rows::<RolePermission>(rows, ROLE_PERMISSIONS_TABLE)?)
        })
        .await
    }

    pub async fn has_permission(&self, role: AppRole, permission: &AppPermission) -> bool {
        self.state
            .read()
            .await
            .data
            .iter()
            .any(|rp| rp.role == role && &rp.permission == permission)
    }

    /// Grant the permission if the role lacks it, revoke it otherwise.
    /// Returns whether the change was applied.
    pub async fn toggle_permission(&self, role: AppRole, permission: AppPermission) -> bool {
        let granted = self.has_permission(role, &permission).await;
        let filters = [
            Filter::eq("role", role),
            Filter::eq("permission", &permission),
        ];

        if granted {
            let removed = with_error_handling(self.notifier.as_ref(), "update permission", async {
                Ok(self.backend.delete(ROLE_PERMISSIONS_TABLE, &filters).await?)
            })
            .await;
            if removed.is_none() {
                return false;
            }
            self.state
                .write()
                .await
                .data
                .retain(|rp| !(rp.role == role && rp.permission == permission));
            self.notifier.notify(Notification::new(
                "Permission Removed",
                format!("Removed {} from {}", permission, role),
                Variant::Default,
            ));
        } else {
            let row = json!({ "role": role, "permission": &permission });
            let added = with_error_handling(self.notifier.as_ref(), "update permission", async {
                let stored = self.backend.insert(ROLE_PERMISSIONS_TABLE, row).await?;
                Ok(decode::<RolePermission>(stored, ROLE_PERMISSIONS_TABLE)?)
            })
            .await;
            let Some(added) = added else {
                return false;
            };
            self.state.write().await.data.push(added);
            self.notifier.notify(Notification::new(
                "Permission Added",
                format!("Added {} to {}", permission, role),
                Variant::Default,
            ));
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::notify::MemoryNotifier;
    use crate::core::services::test_support::{MemoryBackend, backend_error};
    use uuid::Uuid;

    fn permission(key: &str) -> AppPermission {
        AppPermission::new(key).unwrap()
    }

    #[test]
    fn test_catalog_keys_are_valid_permissions() {
        let keys = all_permissions();
        assert_eq!(keys.len(), 30);
        for key in keys {
            assert!(AppPermission::new(key).is_ok(), "{}", key);
        }
    }

    #[test]
    fn test_permission_label() {
        assert_eq!(permission_label("cost_centers.read"), "Read cost_centers");
        assert_eq!(permission_label("settings.update"), "Update settings");
        assert_eq!(permission_label("plain"), "plain");
    }

    #[test]
    fn test_blank_role_name_is_rejected() {
        let notifier = Arc::new(MemoryNotifier::new());
        let service = RoleService::new(notifier.clone());

        assert_eq!(service.request_role("   ", None), RoleRequestOutcome::Rejected);
        let shown = notifier.last().unwrap();
        assert_eq!(shown.title, "Error");
        assert_eq!(shown.description, ROLE_NAME_REQUIRED);
        assert_eq!(shown.variant, Variant::Destructive);
    }

    #[test]
    fn test_valid_role_name_requires_migration() {
        let notifier = Arc::new(MemoryNotifier::new());
        let service = RoleService::new(notifier.clone());

        assert_eq!(
            service.request_role("payroll_officer", Some("Runs payroll")),
            RoleRequestOutcome::MigrationRequired
        );
        let shown = notifier.last().unwrap();
        assert_eq!(shown.title, MIGRATION_REQUIRED_TITLE);
        assert_eq!(shown.variant, Variant::Destructive);
    }

    #[test]
    fn test_malformed_or_existing_role_names() {
        let notifier = Arc::new(MemoryNotifier::new());
        let service = RoleService::new(notifier.clone());

        assert_eq!(service.request_role("Payroll Officer", None), RoleRequestOutcome::Rejected);
        assert_eq!(service.request_role("hr_staff", None), RoleRequestOutcome::Rejected);
        assert!(notifier.last().unwrap().description.contains("already exists"));
    }

    #[tokio::test]
    async fn test_toggle_adds_then_removes() {
        let backend = Arc::new(MemoryBackend::new());
        let notifier = Arc::new(MemoryNotifier::new());
        let store = RolePermissionStore::new(backend.clone(), notifier.clone());
        let key = permission("cost_centers.read");

        store.fetch().await.unwrap();
        assert!(!store.has_permission(AppRole::HrStaff, &key).await);

        assert!(store.toggle_permission(AppRole::HrStaff, key.clone()).await);
        assert!(store.has_permission(AppRole::HrStaff, &key).await);
        assert_eq!(backend.rows(ROLE_PERMISSIONS_TABLE).len(), 1);
        let added = notifier.last().unwrap();
        assert_eq!(added.title, "Permission Added");
        assert_eq!(added.description, "Added cost_centers.read to hr_staff");

        assert!(store.toggle_permission(AppRole::HrStaff, key.clone()).await);
        assert!(!store.has_permission(AppRole::HrStaff, &key).await);
        assert!(backend.rows(ROLE_PERMISSIONS_TABLE).is_empty());
        assert_eq!(notifier.last().unwrap().title, "Permission Removed");
    }

    #[tokio::test]
    async fn test_toggle_only_touches_matching_role() {
        let backend = Arc::new(MemoryBackend::new().with_rows(
            ROLE_PERMISSIONS_TABLE,
            vec![
                json!({"id": Uuid::new_v4(), "role": "admin", "permission": "roles.read"}),
                json!({"id": Uuid::new_v4(), "role": "hr_manager", "permission": "roles.read"}),
            ],
        ));
        let store = RolePermissionStore::new(backend.clone(), Arc::new(MemoryNotifier::new()));
        store.fetch().await.unwrap();

        assert!(store.toggle_permission(AppRole::Admin, permission("roles.read")).await);
        let remaining = backend.rows(ROLE_PERMISSIONS_TABLE);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0]["role"], json!("hr_manager"));
        assert!(store.has_permission(AppRole::HrManager, &permission("roles.read")).await);
    }

    #[tokio::test]
    async fn test_toggle_failure_keeps_state() {
        let backend = Arc::new(MemoryBackend::new());
        let notifier = Arc::new(MemoryNotifier::new());
        let store = RolePermissionStore::new(backend.clone(), notifier.clone());
        backend.fail_with(backend_error(Some("42501"), "new row violates row-level security policy"));

        assert!(!store.toggle_permission(AppRole::Employee, permission("users.delete")).await);
        assert!(store.snapshot().await.data.is_empty());
        assert_eq!(notifier.last().unwrap().title, "Permission Denied (update permission)");
    }
}
