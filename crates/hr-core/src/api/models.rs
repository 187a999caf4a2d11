use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// Cost center models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostCenter {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCostCenter {
    pub code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostCenterPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl CostCenterPatch {
    pub fn is_empty(&self) -> bool {
        self.code.is_none()
            && self.name.is_none()
            && self.description.is_none()
            && self.is_active.is_none()
    }
}

// Employee models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmployeeStatus {
    Active,
    Inactive,
    Pending,
}

impl EmployeeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmployeeStatus::Active => "active",
            EmployeeStatus::Inactive => "inactive",
            EmployeeStatus::Pending => "pending",
        }
    }
}

impl fmt::Display for EmployeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmployeeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(EmployeeStatus::Active),
            "inactive" => Ok(EmployeeStatus::Inactive),
            "pending" => Ok(EmployeeStatus::Pending),
            other => Err(format!("unknown employee status '{}'", other)),
        }
    }
}

/// Employee projection returned by `get_employee_safe_data`.
///
/// This type has no fields for identity documents, next-of-kin or birth data.
/// Sensitive keys present in a payload are dropped during deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeEmployeeData {
    pub id: Uuid,
    pub employee_id: String,
    pub english_name: String,
    #[serde(default)]
    pub arabic_name: Option<String>,
    #[serde(default)]
    pub position_title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub status: String,
    #[serde(default)]
    pub date_of_joining: Option<String>,
    #[serde(default)]
    pub date_of_leaving: Option<String>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub work_phone: Option<String>,
    #[serde(default)]
    pub qualifications: Option<String>,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Full employee row including sensitive data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub id: Uuid,
    pub employee_id: String,
    pub english_name: String,
    pub status: EmployeeStatus,
    #[serde(default)]
    pub arabic_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub date_of_joining: Option<String>,
    #[serde(default)]
    pub date_of_leaving: Option<String>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub work_phone: Option<String>,
    #[serde(default)]
    pub qualifications: Option<String>,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub marital_status: Option<String>,
    #[serde(default)]
    pub id_number: Option<String>,
    #[serde(default)]
    pub issuing_body: Option<String>,
    #[serde(default)]
    pub issue_date: Option<String>,
    #[serde(default)]
    pub home_phone: Option<String>,
    #[serde(default)]
    pub nok_person: Option<String>,
    #[serde(default)]
    pub nok_name: Option<String>,
    #[serde(default)]
    pub nok_phone_number: Option<String>,
    #[serde(default)]
    pub personal_email: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub birth_place: Option<String>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<EmployeeRecord> for SafeEmployeeData {
    fn from(record: EmployeeRecord) -> Self {
        SafeEmployeeData {
            id: record.id,
            employee_id: record.employee_id,
            english_name: record.english_name,
            arabic_name: record.arabic_name,
            position_title: record.position,
            category: record.category,
            status: record.status.to_string(),
            date_of_joining: record.date_of_joining,
            date_of_leaving: record.date_of_leaving,
            nationality: record.nationality,
            work_phone: record.work_phone,
            qualifications: record.qualifications,
            user_id: record.user_id,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Input for the `upsert_employee_data` procedure, keyed by `employee_id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmployeeUpdateData {
    #[serde(default)]
    pub employee_id: String,
    pub english_name: Option<String>,
    pub arabic_name: Option<String>,
    pub status: Option<String>,
    pub position: Option<String>,
    pub personal_email: Option<String>,
    pub qualifications: Option<String>,
    pub nationality: Option<String>,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
    pub id_number: Option<String>,
    pub issuing_body: Option<String>,
    pub birth_place: Option<String>,
    pub work_phone: Option<String>,
    pub home_phone: Option<String>,
    pub nok_person: Option<String>,
    pub nok_name: Option<String>,
    pub nok_phone_number: Option<String>,
    pub category: Option<String>,
    pub date_of_joining: Option<String>,
    pub date_of_leaving: Option<String>,
    pub issue_date: Option<String>,
    pub birth_date: Option<String>,
}

impl EmployeeUpdateData {
    /// Procedure arguments. Empty strings are sent as `null` so the backend
    /// keeps the stored value.
    pub fn to_rpc_args(&self) -> Value {
        fn opt(value: &Option<String>) -> Value {
            match value.as_deref().map(str::trim) {
                Some(v) if !v.is_empty() => Value::String(v.to_string()),
                _ => Value::Null,
            }
        }

        let mut args = Map::new();
        args.insert(
            "p_employee_id".to_string(),
            Value::String(self.employee_id.trim().to_string()),
        );
        let fields: [(&str, &Option<String>); 22] = [
            ("p_english_name", &self.english_name),
            ("p_arabic_name", &self.arabic_name),
            ("p_status", &self.status),
            ("p_position", &self.position),
            ("p_personal_email", &self.personal_email),
            ("p_qualifications", &self.qualifications),
            ("p_nationality", &self.nationality),
            ("p_gender", &self.gender),
            ("p_marital_status", &self.marital_status),
            ("p_id_number", &self.id_number),
            ("p_issuing_body", &self.issuing_body),
            ("p_birth_place", &self.birth_place),
            ("p_work_phone", &self.work_phone),
            ("p_home_phone", &self.home_phone),
            ("p_nok_person", &self.nok_person),
            ("p_nok_name", &self.nok_name),
            ("p_nok_phone_number", &self.nok_phone_number),
            ("p_category", &self.category),
            ("p_date_of_joining", &self.date_of_joining),
            ("p_date_of_leaving", &self.date_of_leaving),
            ("p_issue_date", &self.issue_date),
            ("p_birth_date", &self.birth_date),
        ];
        for (name, value) in fields {
            args.insert(name.to_string(), opt(value));
        }
        Value::Object(args)
    }
}

/// Result of `upsert_employee_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOperation {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpsertResponse {
    pub operation: Option<UpsertOperation>,
}

// Audit models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub event_type: String,
    #[serde(default)]
    pub actor_id: Option<Uuid>,
    #[serde(default)]
    pub target_user_id: Option<Uuid>,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub old_values: Option<Value>,
    #[serde(default)]
    pub new_values: Option<Value>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

// Role and permission models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppRole {
    SuperAdmin,
    Admin,
    HrManager,
    HrStaff,
    Recruiter,
    Employee,
}

impl AppRole {
    pub const ALL: [AppRole; 6] = [
        AppRole::SuperAdmin,
        AppRole::Admin,
        AppRole::HrManager,
        AppRole::HrStaff,
        AppRole::Recruiter,
        AppRole::Employee,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppRole::SuperAdmin => "super_admin",
            AppRole::Admin => "admin",
            AppRole::HrManager => "hr_manager",
            AppRole::HrStaff => "hr_staff",
            AppRole::Recruiter => "recruiter",
            AppRole::Employee => "employee",
        }
    }
}

impl fmt::Display for AppRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AppRole::ALL
            .into_iter()
            .find(|role| role.as_str() == s.trim())
            .ok_or_else(|| format!("unknown role '{}'", s))
    }
}

/// Permission key of the form `<area>.<action>`, e.g. `cost_centers.read`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppPermission(String);

impl AppPermission {
    pub fn new(key: impl Into<String>) -> Result<Self, String> {
        let key = key.into();
        match key.split_once('.') {
            Some((area, action))
                if !area.is_empty() && !action.is_empty() && !action.contains('.') =>
            {
                Ok(Self(key))
            }
            _ => Err(format!(
                "invalid permission '{}': expected <area>.<action>",
                key
            )),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolePermission {
    pub id: Uuid,
    pub role: AppRole,
    pub permission: AppPermission,
}

// Auth models
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CurrentUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}
