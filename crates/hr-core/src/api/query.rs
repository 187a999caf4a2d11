//! Table query description, encoded as PostgREST query parameters.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Order::Asc => f.write_str("asc"),
            Order::Desc => f.write_str("desc"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterOp::Eq => f.write_str("eq"),
            FilterOp::Neq => f.write_str("neq"),
        }
    }
}

/// Column filter, e.g. `is_active=eq.true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: String,
}

impl Filter {
    pub fn eq(column: &str, value: impl ToString) -> Self {
        Self {
            column: column.to_string(),
            op: FilterOp::Eq,
            value: value.to_string(),
        }
    }

    pub fn neq(column: &str, value: impl ToString) -> Self {
        Self {
            column: column.to_string(),
            op: FilterOp::Neq,
            value: value.to_string(),
        }
    }

    pub fn to_param(&self) -> (String, String) {
        (self.column.clone(), format!("{}.{}", self.op, self.value))
    }

    /// Whether a JSON row satisfies this filter. Used by in-memory backends.
    pub fn matches(&self, row: &serde_json::Value) -> bool {
        let actual = match row.get(&self.column) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => "null".to_string(),
            Some(other) => other.to_string(),
        };
        match self.op {
            FilterOp::Eq => actual == self.value,
            FilterOp::Neq => actual != self.value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub table: String,
    pub select: String,
    pub filters: Vec<Filter>,
    pub order: Vec<(String, Order)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            select: "*".to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.select = columns.to_string();
        self
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order(mut self, column: &str, order: Order) -> Self {
        self.order.push((column.to_string(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.select.clone())];
        params.extend(self.filters.iter().map(Filter::to_param));
        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|(column, order)| format!("{}.{}", column, order))
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".to_string(), order));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_active_cost_center_query_params() {
        let query = Query::table("cost_centers")
            .eq("is_active", true)
            .order("code", Order::Asc);
        assert_eq!(
            query.to_params(),
            vec![
                ("select".to_string(), "*".to_string()),
                ("is_active".to_string(), "eq.true".to_string()),
                ("order".to_string(), "code.asc".to_string()),
            ]
        );
    }

    #[test]
    fn test_multiple_orders_and_limit() {
        let query = Query::table("audit_logs")
            .select("id,event_type")
            .order("created_at", Order::Desc)
            .order("id", Order::Asc)
            .limit(50);
        let params = query.to_params();
        assert!(params.contains(&("order".to_string(), "created_at.desc,id.asc".to_string())));
        assert!(params.contains(&("limit".to_string(), "50".to_string())));
        assert_eq!(params[0], ("select".to_string(), "id,event_type".to_string()));
    }

    #[test]
    fn test_filter_matches_rows() {
        let row = json!({"is_active": true, "code": "CC-1", "description": null});
        assert!(Filter::eq("is_active", true).matches(&row));
        assert!(!Filter::eq("is_active", false).matches(&row));
        assert!(Filter::eq("code", "CC-1").matches(&row));
        assert!(Filter::eq("description", "null").matches(&row));
        assert!(Filter::neq("code", "CC-2").matches(&row));
    }
}
