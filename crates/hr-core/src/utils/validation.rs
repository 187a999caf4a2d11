//! Input validation and sanitization utilities
//!
//! Free-text sanitization for values that end up in employee records, field
//! validators, and the employee form and bulk upload rules.

use crate::api::models::EmployeeUpdateData;
use crate::error::{CliError, UtilsError};
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::LazyLock;

static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b.*?</script\s*>").expect("valid regex"));
static DANGEROUS_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(iframe|object|embed|link|meta|style|form)[^>]*>").expect("valid regex")
});
static DANGEROUS_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)javascript:|data:|vbscript:").expect("valid regex"));
static EVENT_HANDLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\son\w+\s*=\s*["'][^"']*["']"#).expect("valid regex")
});
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("valid regex")
});
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+]?[1-9][\d\s\-()]{6,20}$").expect("valid regex"));
static EMPLOYEE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid regex"));
static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));

/// Validate that a URL is properly formatted
pub fn validate_url(url: &str) -> crate::Result<()> {
    if url.is_empty() {
        return Err(CliError::InvalidArguments("URL cannot be empty".to_string()).into());
    }

    // Basic URL validation - must start with http:// or https://
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(CliError::InvalidArguments(format!(
            "Invalid URL '{}': URL must start with http:// or https://",
            url
        ))
        .into());
    }

    Ok(())
}

/// Escape characters with meaning in HTML.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            '/' => escaped.push_str("&#x2F;"),
            '`' => escaped.push_str("&#x60;"),
            '=' => escaped.push_str("&#x3D;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Strip script blocks, embedding tags, script URL schemes and inline event
/// handlers, then trim.
pub fn sanitize_input(input: &str) -> String {
    let cleaned = SCRIPT_BLOCK.replace_all(input, "");
    let cleaned = DANGEROUS_TAG.replace_all(&cleaned, "");
    let cleaned = DANGEROUS_SCHEME.replace_all(&cleaned, "");
    let cleaned = EVENT_HANDLER.replace_all(&cleaned, "");
    cleaned.trim().to_string()
}

/// Sanitize every string in a JSON document, keys included.
pub fn sanitize_file_content(content: Value) -> Value {
    match content {
        Value::String(s) => Value::String(sanitize_input(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_file_content).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (sanitize_input(&k), sanitize_file_content(v)))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

#[derive(Debug, Clone)]
pub struct TextRules<'a> {
    pub min_length: usize,
    pub max_length: usize,
    pub allow_empty: bool,
    pub pattern: Option<&'a Regex>,
    pub field_name: &'a str,
}

impl Default for TextRules<'_> {
    fn default() -> Self {
        Self {
            min_length: 0,
            max_length: 255,
            allow_empty: true,
            pattern: None,
            field_name: "Field",
        }
    }
}

fn invalid(message: String) -> UtilsError {
    UtilsError::Validation { message }
}

/// Sanitize and check `input`. Returns the sanitized text.
pub fn validate_text_input(input: &str, rules: &TextRules<'_>) -> Result<String, UtilsError> {
    if input.trim().is_empty() {
        if !rules.allow_empty {
            return Err(invalid(format!("{} is required", rules.field_name)));
        }
        return Ok(String::new());
    }

    let sanitized = sanitize_input(input);
    let length = sanitized.chars().count();

    if length < rules.min_length {
        return Err(invalid(format!(
            "{} must be at least {} characters long",
            rules.field_name, rules.min_length
        )));
    }
    if length > rules.max_length {
        return Err(invalid(format!(
            "{} must not exceed {} characters",
            rules.field_name, rules.max_length
        )));
    }
    if let Some(pattern) = rules.pattern {
        if !pattern.is_match(&sanitized) {
            return Err(invalid(format!("{} format is invalid", rules.field_name)));
        }
    }
    Ok(sanitized)
}

/// Optional email; empty input is accepted.
pub fn validate_email(email: &str) -> Result<String, UtilsError> {
    validate_text_input(
        email,
        &TextRules {
            min_length: 5,
            max_length: 254,
            pattern: Some(&EMAIL),
            field_name: "Email",
            ..Default::default()
        },
    )
}

/// Optional phone number in international format.
pub fn validate_phone(phone: &str) -> Result<String, UtilsError> {
    validate_text_input(
        phone,
        &TextRules {
            min_length: 7,
            max_length: 25,
            pattern: Some(&PHONE),
            field_name: "Phone number",
            ..Default::default()
        },
    )
}

pub fn validate_employee_id(employee_id: &str) -> Result<String, UtilsError> {
    validate_text_input(
        employee_id,
        &TextRules {
            min_length: 1,
            max_length: 50,
            allow_empty: false,
            pattern: Some(&EMPLOYEE_ID),
            field_name: "Employee ID",
        },
    )
}

/// Optional `YYYY-MM-DD` date between 1900 and 2100.
pub fn validate_date(date: &str) -> Result<String, UtilsError> {
    if date.trim().is_empty() {
        return Ok(String::new());
    }

    let sanitized = sanitize_input(date.trim());
    if !ISO_DATE.is_match(&sanitized) {
        return Err(invalid("Date must be in YYYY-MM-DD format".to_string()));
    }
    let parsed = NaiveDate::parse_from_str(&sanitized, "%Y-%m-%d")
        .map_err(|_| invalid("Invalid date".to_string()))?;
    if !(1900..=2100).contains(&parsed.year()) {
        return Err(invalid("Date must be between 1900 and 2100".to_string()));
    }
    Ok(sanitized)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Form rules for one employee. The employee id is read-only when editing,
/// and the English name is only required on create.
pub fn validate_employee_data(data: &EmployeeUpdateData, is_edit: bool) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if !is_edit {
        let employee_id = sanitize_input(&data.employee_id);
        if employee_id.is_empty() {
            errors.push(FieldError::new("employee_id", "Employee ID is required"));
        } else if let Err(e) = validate_employee_id(&employee_id) {
            errors.push(FieldError::new("employee_id", validation_message(e)));
        }
    }

    let english_name = data.english_name.as_deref().map(sanitize_input).unwrap_or_default();
    if english_name.is_empty() {
        if !is_edit {
            errors.push(FieldError::new("english_name", "English name is required"));
        }
    } else if let Err(e) = validate_text_input(&english_name, &TextRules::default()) {
        errors.push(FieldError::new("english_name", validation_message(e)));
    }

    if let Some(email) = data.personal_email.as_deref().map(sanitize_input) {
        if !email.is_empty() {
            if let Err(e) = validate_email(&email) {
                errors.push(FieldError::new("personal_email", validation_message(e)));
            }
        }
    }

    for (field, value) in [
        ("date_of_joining", &data.date_of_joining),
        ("date_of_leaving", &data.date_of_leaving),
        ("issue_date", &data.issue_date),
        ("birth_date", &data.birth_date),
    ] {
        if let Some(Err(e)) = value.as_deref().map(validate_date) {
            errors.push(FieldError::new(field, format!("{}: {}", field_label(field), validation_message(e))));
        }
    }

    errors
}

fn validation_message(error: UtilsError) -> String {
    match error {
        UtilsError::Validation { message } | UtilsError::InputProcessing { message } => message,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowErrors {
    /// 1-based row number.
    pub row: usize,
    pub errors: Vec<String>,
}

/// Required-field checks for a bulk upload. Only rows with problems are
/// returned.
pub fn validate_bulk_employee_data(rows: &[EmployeeUpdateData]) -> Vec<RowErrors> {
    rows.iter()
        .enumerate()
        .filter_map(|(index, row)| {
            let row_number = index + 1;
            let mut errors = Vec::new();
            if row.english_name.as_deref().map(str::trim).unwrap_or("").is_empty() {
                errors.push(format!("Row {}: English name is required", row_number));
            }
            if row.employee_id.trim().is_empty() {
                errors.push(format!("Row {}: Employee ID is required", row_number));
            }
            (!errors.is_empty()).then_some(RowErrors {
                row: row_number,
                errors,
            })
        })
        .collect()
}

/// Employee ids that occur more than once, each reported once, in order of
/// first repetition.
pub fn find_duplicate_employee_ids(rows: &[EmployeeUpdateData]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut duplicates = Vec::new();
    for id in rows.iter().map(|r| r.employee_id.trim()).filter(|id| !id.is_empty()) {
        if !seen.insert(id) && !duplicates.iter().any(|d: &String| d == id) {
            duplicates.push(id.to_string());
        }
    }
    duplicates
}

pub fn field_label(field: &str) -> String {
    match field {
        "employee_id" => "Employee ID".to_string(),
        "english_name" => "English Name".to_string(),
        "arabic_name" => "Arabic Name".to_string(),
        "personal_email" => "Personal Email".to_string(),
        other => other.replace('_', " ").to_uppercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_url_accepts_valid_urls() {
        assert!(validate_url("http://localhost:54321").is_ok());
        assert!(validate_url("https://proj.example.test").is_ok());
    }

    #[test]
    fn test_validate_url_rejects_invalid_urls() {
        assert!(validate_url("").is_err());
        assert!(validate_url("localhost:3000").is_err());
        assert!(validate_url("ftp://example.com").is_err());
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href&#x3D;&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;&#x2F;a&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_sanitize_input_strips_active_content() {
        assert_eq!(sanitize_input("  Sara <script>alert(1)</script>Ahmed "), "Sara Ahmed");
        assert_eq!(sanitize_input("<IFRAME src=x>name"), "name");
        assert_eq!(sanitize_input("javascript:alert(1)"), "alert(1)");
        assert_eq!(sanitize_input(r#"<b onclick="steal()">x</b>"#), "<b>x</b>");
        assert_eq!(sanitize_input("Multi\n<Script type='a'>\nx\n</SCRIPT>line"), "Multi\nline");
    }

    #[test]
    fn test_sanitize_file_content_recurses() {
        let content = json!({" name ": ["<script>x</script>Ali", 3], "ok": true});
        assert_eq!(
            sanitize_file_content(content),
            json!({"name": ["Ali", 3], "ok": true})
        );
    }

    #[test]
    fn test_text_rules() {
        let rules = TextRules {
            min_length: 3,
            max_length: 5,
            allow_empty: false,
            field_name: "Code",
            ..Default::default()
        };
        assert_eq!(
            validate_text_input(" ", &rules).unwrap_err().to_string(),
            "Validation error: Code is required"
        );
        assert!(validate_text_input("ab", &rules).is_err());
        assert!(validate_text_input("abcdef", &rules).is_err());
        assert_eq!(validate_text_input(" abc ", &rules).unwrap(), "abc");
        assert_eq!(validate_text_input("", &TextRules::default()).unwrap(), "");
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("").is_ok());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@domain.com").is_err());
        assert!(validate_email("user@domain@com").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+971 50 123 4567").is_ok());
        assert!(validate_phone("(04) 123-4567").is_err());
        assert!(validate_phone("0501234567").is_err());
        assert!(validate_phone("12345").is_err());
    }

    #[test]
    fn test_validate_employee_id() {
        assert_eq!(validate_employee_id("EMP_001-a").unwrap(), "EMP_001-a");
        assert!(validate_employee_id("").is_err());
        assert!(validate_employee_id("EMP 001").is_err());
        assert!(validate_employee_id(&"x".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_date() {
        assert_eq!(validate_date("2024-02-29").unwrap(), "2024-02-29");
        assert_eq!(validate_date("  ").unwrap(), "");
        assert_eq!(
            validate_date("29/02/2024").unwrap_err().to_string(),
            "Validation error: Date must be in YYYY-MM-DD format"
        );
        assert!(validate_date("2023-02-29").is_err());
        assert!(validate_date("1899-12-31").is_err());
        assert!(validate_date("2101-01-01").is_err());
    }

    #[test]
    fn test_employee_data_create_vs_edit() {
        let empty = EmployeeUpdateData::default();
        let fields: Vec<&str> = validate_employee_data(&empty, false)
            .iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(fields, vec!["employee_id", "english_name"]);
        assert!(validate_employee_data(&empty, true).is_empty());

        let bad = EmployeeUpdateData {
            employee_id: "EMP 1".to_string(),
            english_name: Some("Ali".to_string()),
            personal_email: Some("nope".to_string()),
            birth_date: Some("01-01-1990".to_string()),
            ..Default::default()
        };
        let errors = validate_employee_data(&bad, false);
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["employee_id", "personal_email", "birth_date"]);
    }

    #[test]
    fn test_bulk_validation_and_duplicates() {
        let rows = vec![
            EmployeeUpdateData {
                employee_id: "E1".to_string(),
                english_name: Some("A".to_string()),
                ..Default::default()
            },
            EmployeeUpdateData {
                employee_id: " ".to_string(),
                ..Default::default()
            },
            EmployeeUpdateData {
                employee_id: "E1".to_string(),
                english_name: Some("B".to_string()),
                ..Default::default()
            },
            EmployeeUpdateData {
                employee_id: "E1 ".to_string(),
                english_name: Some("C".to_string()),
                ..Default::default()
            },
        ];

        let problems = validate_bulk_employee_data(&rows);
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].row, 2);
        assert_eq!(
            problems[0].errors,
            vec![
                "Row 2: English name is required".to_string(),
                "Row 2: Employee ID is required".to_string()
            ]
        );
        assert_eq!(find_duplicate_employee_ids(&rows), vec!["E1".to_string()]);
    }

    #[test]
    fn test_field_label() {
        assert_eq!(field_label("employee_id"), "Employee ID");
        assert_eq!(field_label("date_of_joining"), "DATE OF JOINING");
    }
}
