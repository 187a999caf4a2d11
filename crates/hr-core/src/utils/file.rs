//! Reading bulk upload files
//!
//! An upload file is a JSON array of employee records, typically exported
//! from a spreadsheet. Every string is sanitized before it is decoded, and
//! numeric or boolean cells are read as text.

use crate::api::models::EmployeeUpdateData;
use crate::error::{StorageError, UtilsError};
use crate::utils::type_utils::safe_string;
use crate::utils::validation::sanitize_file_content;
use serde_json::Value;
use std::path::Path;

pub fn read_employee_file<P: AsRef<Path>>(path: P) -> crate::Result<Vec<EmployeeUpdateData>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| StorageError::FileIo {
        path: path.to_string_lossy().to_string(),
        source,
    })?;
    parse_employee_rows(&content)
}

pub fn parse_employee_rows(content: &str) -> crate::Result<Vec<EmployeeUpdateData>> {
    let document: Value = serde_json::from_str(content).map_err(|e| UtilsError::InputProcessing {
        message: format!("Upload file is not valid JSON: {}", e),
    })?;

    let Value::Array(rows) = sanitize_file_content(document) else {
        return Err(UtilsError::InputProcessing {
            message: "Upload file must contain a JSON array of employee records".to_string(),
        }
        .into());
    };

    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            serde_json::from_value(cells_as_text(row)).map_err(|e| {
                UtilsError::InputProcessing {
                    message: format!("Row {}: {}", index + 1, e),
                }
                .into()
            })
        })
        .collect()
}

fn cells_as_text(row: Value) -> Value {
    match row {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, cell)| {
                    let cell = match cell {
                        Value::Number(_) | Value::Bool(_) => Value::String(safe_string(&cell)),
                        other => other,
                    };
                    (key, cell)
                })
                .collect(),
        ),
        other => other,
    }
}
