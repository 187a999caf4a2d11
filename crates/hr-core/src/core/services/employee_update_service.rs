//! Employee writes through the `upsert_employee_data` procedure, single and
//! bulk, plus status changes.

use crate::api::backend::{DataBackend, decode};
use crate::api::models::{EmployeeStatus, EmployeeUpdateData, UpsertOperation, UpsertResponse};
use crate::api::query::Filter;
use crate::core::classify::notify_error;
use crate::core::notify::{Notification, Notifier, Variant};
use crate::error::{AppError, ServiceError};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub const UPSERT_FUNCTION: &str = "upsert_employee_data";
pub const EMPLOYEES_TABLE: &str = "employees";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Uploading,
    Completed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadProgress {
    pub current: usize,
    pub total: usize,
    pub current_employee: String,
    pub status: UploadStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadRowError {
    /// 1-based position in the submitted batch.
    pub row: usize,
    pub employee_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    pub success: bool,
    pub created: usize,
    pub updated: usize,
    pub errors: Vec<UploadRowError>,
}

pub struct EmployeeUpdateService {
    backend: Arc<dyn DataBackend>,
    notifier: Arc<dyn Notifier>,
    loading: AtomicBool,
}

impl EmployeeUpdateService {
    pub fn new(backend: Arc<dyn DataBackend>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            backend,
            notifier,
            loading: AtomicBool::new(false),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    async fn call_upsert(&self, data: &EmployeeUpdateData) -> Result<Option<UpsertOperation>, AppError> {
        let value = self.backend.rpc(UPSERT_FUNCTION, data.to_rpc_args()).await?;
        let endpoint = format!("rpc/{}", UPSERT_FUNCTION);
        match value {
            Value::Null => Ok(None),
            value => Ok(decode::<UpsertResponse>(value, &endpoint)?.operation),
        }
    }

    /// Create or update one employee keyed by `employee_id`.
    pub async fn upsert_employee(
        &self,
        data: &EmployeeUpdateData,
    ) -> Result<Option<UpsertOperation>, AppError> {
        self.loading.store(true, Ordering::SeqCst);
        let result = self.call_upsert(data).await;
        self.loading.store(false, Ordering::SeqCst);

        match &result {
            Ok(operation) => {
                let verb = match operation {
                    Some(UpsertOperation::Created) => "created",
                    _ => "updated",
                };
                self.notifier.notify(Notification::success(format!(
                    "Employee {} {} successfully.",
                    data.employee_id.trim(),
                    verb
                )));
            }
            Err(error) => {
                notify_error(self.notifier.as_ref(), error);
            }
        }
        result
    }

    /// Upsert every row in order, reporting progress before each one.
    ///
    /// Rows without an `employee_id` are recorded as errors and not sent. A
    /// failing row does not stop the batch.
    pub async fn upload_employees<F>(
        &self,
        rows: &[EmployeeUpdateData],
        mut on_progress: F,
    ) -> UploadResult
    where
        F: FnMut(&UploadProgress),
    {
        self.loading.store(true, Ordering::SeqCst);
        let total = rows.len();
        let mut result = UploadResult {
            success: true,
            ..Default::default()
        };

        for (index, employee) in rows.iter().enumerate() {
            let row = index + 1;
            let employee_id = employee.employee_id.trim();
            on_progress(&UploadProgress {
                current: row,
                total,
                current_employee: if employee_id.is_empty() {
                    format!("Record {}", row)
                } else {
                    employee_id.to_string()
                },
                status: UploadStatus::Uploading,
            });

            if employee_id.is_empty() {
                result.errors.push(UploadRowError {
                    row,
                    employee_id: "N/A".to_string(),
                    error: "Employee ID is required".to_string(),
                });
                continue;
            }

            match self.call_upsert(employee).await {
                Ok(Some(UpsertOperation::Created)) => result.created += 1,
                Ok(Some(UpsertOperation::Updated)) => result.updated += 1,
                Ok(None) => {}
                Err(e) => {
                    log::debug!("Row {} ({}) failed: {}", row, employee_id, e);
                    result.errors.push(UploadRowError {
                        row,
                        employee_id: employee_id.to_string(),
                        error: e.display_friendly(),
                    });
                }
            }
        }

        let final_status = if result.errors.is_empty() {
            self.notifier.notify(Notification::new(
                "Upload Successful",
                format!(
                    "Created {} new employees, updated {} existing employees.",
                    result.created, result.updated
                ),
                Variant::Default,
            ));
            UploadStatus::Completed
        } else {
            result.success = false;
            self.notifier.notify(Notification::error(
                "Upload Completed with Errors",
                format!(
                    "Created {}, updated {}. {} errors occurred.",
                    result.created,
                    result.updated,
                    result.errors.len()
                ),
            ));
            UploadStatus::Error
        };
        on_progress(&UploadProgress {
            current: total,
            total,
            current_employee: String::new(),
            status: final_status,
        });

        self.loading.store(false, Ordering::SeqCst);
        result
    }

    /// Change an employee's status by employee id.
    pub async fn set_status(&self, employee_id: &str, status: EmployeeStatus) -> Result<(), AppError> {
        let result = self.try_set_status(employee_id, status).await;
        match &result {
            Ok(()) => self.notifier.notify(Notification::new(
                "Status Updated",
                format!("Employee status changed to {}", status),
                Variant::Default,
            )),
            Err(error) => {
                notify_error(self.notifier.as_ref(), error);
            }
        }
        result
    }

    async fn try_set_status(&self, employee_id: &str, status: EmployeeStatus) -> Result<(), AppError> {
        let updated = self
            .backend
            .update(
                EMPLOYEES_TABLE,
                &[Filter::eq("employee_id", employee_id.trim())],
                json!({ "status": status }),
            )
            .await?;
        if updated.is_empty() {
            return Err(ServiceError::NotFound {
                resource_type: "Employee".to_string(),
                id: employee_id.trim().to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Soft delete: the record stays, marked inactive.
    pub async fn deactivate(&self, employee_id: &str) -> Result<(), AppError> {
        self.set_status(employee_id, EmployeeStatus::Inactive).await
    }
}
