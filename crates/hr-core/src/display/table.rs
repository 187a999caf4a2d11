use crate::api::models::{AppRole, AuditLogEntry, CostCenter, RolePermission, SafeEmployeeData};
use crate::core::services::employee_update_service::UploadRowError;
use crate::core::services::role_service::APP_CATEGORIES;
use crate::utils::text::{format_datetime, truncate_text};
use crate::utils::validation::RowErrors;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table, presets};
use crossterm::terminal;
use serde_json::Value;
use std::collections::HashSet;
use std::io::IsTerminal;

struct ColumnWidths {
    name: usize,
    description: usize,
}

pub struct TableDisplay {
    max_width: Option<usize>,
    use_colors: bool,
}

impl TableDisplay {
    pub fn new() -> Self {
        Self {
            max_width: Self::detect_terminal_width(),
            use_colors: std::io::stdout().is_terminal(),
        }
    }

    fn detect_terminal_width() -> Option<usize> {
        match terminal::size() {
            Ok((cols, _)) => Some((cols as usize).clamp(40, 200)),
            Err(_) => Some(80),
        }
    }

    pub fn with_max_width(mut self, width: usize) -> Self {
        self.max_width = Some(width);
        self
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    fn bold_header(&self, text: &str, color: Color) -> Cell {
        if self.use_colors {
            Cell::new(text).add_attribute(Attribute::Bold).fg(color)
        } else {
            Cell::new(text).add_attribute(Attribute::Bold)
        }
    }

    fn colored_cell(&self, text: &str, color: Color) -> Cell {
        if self.use_colors {
            Cell::new(text).fg(color)
        } else {
            Cell::new(text)
        }
    }

    fn new_table(&self, headers: &[&str], color: Color) -> Table {
        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        self.configure_table_width(&mut table);
        let cells: Vec<Cell> = headers.iter().map(|h| self.bold_header(h, color)).collect();
        table.set_header(cells);
        table
    }

    fn configure_table_width(&self, table: &mut Table) {
        let width = self
            .max_width
            .map(|w| if w > 20 { w - 6 } else { w.max(40) })
            .unwrap_or(80);
        table.set_width(width as u16);
    }

    fn get_responsive_column_widths(&self) -> ColumnWidths {
        match self.max_width.unwrap_or(80) {
            0..=59 => ColumnWidths {
                name: 12,
                description: 15,
            },
            60..=79 => ColumnWidths {
                name: 18,
                description: 20,
            },
            80..=119 => ColumnWidths {
                name: 28,
                description: 30,
            },
            _ => ColumnWidths {
                name: 40,
                description: 50,
            },
        }
    }

    pub fn render_cost_centers(&self, cost_centers: &[CostCenter]) -> String {
        if cost_centers.is_empty() {
            return "No active cost centers.".to_string();
        }

        let mut table = self.new_table(&["Code", "Name", "Description", "Updated"], Color::Cyan);
        let widths = self.get_responsive_column_widths();

        for cost_center in cost_centers {
            let description = cost_center.description.as_deref().unwrap_or("-");
            table.add_row(vec![
                self.colored_cell(&cost_center.code, Color::Cyan),
                Cell::new(truncate_text(&cost_center.name, widths.name)),
                self.colored_cell(
                    &truncate_text(description, widths.description),
                    Color::DarkGrey,
                ),
                Cell::new(format_datetime(&cost_center.updated_at.to_rfc3339())),
            ]);
        }

        table.to_string()
    }

    pub fn render_audit_logs(&self, entries: &[AuditLogEntry], limit: Option<usize>) -> String {
        if entries.is_empty() {
            return "No audit log entries.".to_string();
        }

        let mut table = self.new_table(&["Time", "Event", "Actor", "Resource", "Changes"], Color::Magenta);
        let widths = self.get_responsive_column_widths();
        let shown = limit.unwrap_or(entries.len()).min(entries.len());

        for entry in &entries[..shown] {
            let resource = match (&entry.resource_type, &entry.resource_id) {
                (Some(kind), Some(id)) => format!("{}:{}", kind, id),
                (Some(kind), None) => kind.clone(),
                _ => "-".to_string(),
            };
            let changes = entry
                .new_values
                .as_ref()
                .or(entry.metadata.as_ref())
                .map(|v| self.format_cell_value(v))
                .unwrap_or_else(|| "-".to_string());
            table.add_row(vec![
                Cell::new(entry.created_at.format("%Y-%m-%d %H:%M").to_string()),
                self.colored_cell(&entry.event_type, Color::Yellow),
                Cell::new(
                    entry
                        .actor_id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "system".to_string()),
                ),
                Cell::new(truncate_text(&resource, widths.name)),
                Cell::new(truncate_text(&changes, widths.description)),
            ]);
        }

        if entries.len() > shown {
            let note = format!("... and {} more entries", entries.len() - shown);
            table.add_row(vec![
                Cell::new(""),
                self.colored_cell(&note, Color::DarkGrey),
                Cell::new(""),
                Cell::new(""),
                Cell::new(""),
            ]);
        }

        table.to_string()
    }

    /// Permission keys down the side, roles across the top.
    pub fn render_permission_matrix(&self, grants: &[RolePermission]) -> String {
        let granted: HashSet<(AppRole, &str)> = grants
            .iter()
            .map(|g| (g.role, g.permission.as_str()))
            .collect();

        let mut headers = vec!["Permission"];
        headers.extend(AppRole::ALL.iter().map(|r| r.as_str()));
        let mut table = self.new_table(&headers, Color::Cyan);

        for app in APP_CATEGORIES {
            for category in app.permission_categories {
                for permission in category.permissions {
                    let mut row = vec![Cell::new(*permission)];
                    for role in AppRole::ALL {
                        row.push(if granted.contains(&(role, *permission)) {
                            self.colored_cell("✓", Color::Green)
                        } else {
                            self.colored_cell("·", Color::DarkGrey)
                        });
                    }
                    table.add_row(row);
                }
            }
        }

        table.to_string()
    }

    pub fn render_employee_profile(&self, employee: &SafeEmployeeData) -> String {
        let mut table = self.new_table(&["Field", "Value"], Color::Green);
        let optional = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());

        let rows = [
            ("Employee ID", employee.employee_id.clone()),
            ("English Name", employee.english_name.clone()),
            ("Arabic Name", optional(&employee.arabic_name)),
            ("Position", optional(&employee.position_title)),
            ("Category", optional(&employee.category)),
            ("Status", employee.status.clone()),
            ("Date of Joining", optional(&employee.date_of_joining)),
            ("Nationality", optional(&employee.nationality)),
            ("Work Phone", optional(&employee.work_phone)),
            ("Qualifications", optional(&employee.qualifications)),
        ];
        for (label, value) in rows {
            table.add_row(vec![self.colored_cell(label, Color::Cyan), Cell::new(value)]);
        }

        table.to_string()
    }

    pub fn render_upload_errors(&self, errors: &[UploadRowError]) -> String {
        let rows: Vec<Vec<String>> = errors
            .iter()
            .map(|e| vec![e.row.to_string(), e.employee_id.clone(), e.error.clone()])
            .collect();
        self.render_simple_table(&["Row", "Employee ID", "Error"], &rows)
    }

    pub fn render_row_errors(&self, problems: &[RowErrors]) -> String {
        let rows: Vec<Vec<String>> = problems
            .iter()
            .map(|p| vec![p.row.to_string(), p.errors.join("\n")])
            .collect();
        self.render_simple_table(&["Row", "Problems"], &rows)
    }

    pub fn format_cell_value(&self, value: &Value) -> String {
        match value {
            Value::Null => "-".to_string(),
            Value::String(s) if s.len() > 100 => truncate_text(s, 100),
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Array(arr) if arr.is_empty() => "[]".to_string(),
            Value::Array(arr) => format!("[{} items]", arr.len()),
            Value::Object(obj) if obj.is_empty() => "{}".to_string(),
            Value::Object(obj) => obj
                .iter()
                .map(|(k, v)| match v {
                    Value::String(s) => format!("{}={}", k, s),
                    other => format!("{}={}", k, other),
                })
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Render a simple table with custom headers and rows
    pub fn render_simple_table(&self, headers: &[&str], rows: &[Vec<String>]) -> String {
        let mut table = self.new_table(headers, Color::Cyan);
        for row in rows {
            let cells: Vec<Cell> = row.iter().map(Cell::new).collect();
            table.add_row(cells);
        }
        table.to_string()
    }
}

impl Default for TableDisplay {
    fn default() -> Self {
        Self::new()
    }
}
