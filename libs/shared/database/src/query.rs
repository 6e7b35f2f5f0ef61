use std::cmp::Ordering;

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    In,
}

impl FilterOp {
    fn postgrest(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::In => "in",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: &'static str,
    pub op: FilterOp,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: &'static str,
    pub descending: bool,
}

/// A single table request built per call. Column names are compile-time
/// constants; values are carried as data and encoded by the store, never
/// spliced into the request path.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: &'static str,
    filters: Vec<Filter>,
    order: Vec<Order>,
    limit: Option<usize>,
}

impl Query {
    pub fn table(table: &'static str) -> Self {
        Self {
            table,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn table_name(&self) -> &'static str {
        self.table
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    fn filter(mut self, column: &'static str, op: FilterOp, values: Vec<Value>) -> Self {
        self.filters.push(Filter { column, op, values });
        self
    }

    pub fn eq(self, column: &'static str, value: impl Into<Value>) -> Self {
        self.filter(column, FilterOp::Eq, vec![value.into()])
    }

    pub fn in_list<I, V>(self, column: &'static str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.filter(column, FilterOp::In, values.into_iter().map(Into::into).collect())
    }

    pub fn order_by(mut self, column: &'static str) -> Self {
        self.order.push(Order { column, descending: false });
        self
    }

    pub fn order_by_desc(mut self, column: &'static str) -> Self {
        self.order.push(Order { column, descending: true });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// PostgREST query-string pairs, e.g. `("status", "in.(available,cancelled)")`.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self.filters.iter()
            .map(|filter| {
                let rendered = match filter.op {
                    FilterOp::In => format!(
                        "in.({})",
                        filter.values.iter().map(render_in_value).collect::<Vec<_>>().join(",")
                    ),
                    op => format!(
                        "{}.{}",
                        op.postgrest(),
                        filter.values.first().map(render_value).unwrap_or_default()
                    ),
                };
                (filter.column.to_string(), rendered)
            })
            .collect();

        if !self.order.is_empty() {
            let order = self.order.iter()
                .map(|o| format!("{}.{}", o.column, if o.descending { "desc" } else { "asc" }))
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("order".to_string(), order));
        }

        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }

        pairs
    }

    /// Whether a stored row satisfies every filter.
    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|filter| {
            let field = row.get(filter.column).unwrap_or(&Value::Null);
            match filter.op {
                FilterOp::Eq => filter.values.first().is_some_and(|v| values_equal(field, v)),
                FilterOp::In => filter.values.iter().any(|v| values_equal(field, v)),
            }
        })
    }

    /// Applies ordering and limit to rows that already passed `matches`.
    pub fn arrange(&self, mut rows: Vec<Value>) -> Vec<Value> {
        if !self.order.is_empty() {
            rows.sort_by(|a, b| {
                for order in &self.order {
                    let left = a.get(order.column).unwrap_or(&Value::Null);
                    let right = b.get(order.column).unwrap_or(&Value::Null);
                    let ordering = compare_values(left, right).unwrap_or(Ordering::Equal);
                    let ordering = if order.descending { ordering.reverse() } else { ordering };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }

        rows
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn render_in_value(value: &Value) -> String {
    match value {
        Value::String(s) if s.contains(',') || s.contains('(') || s.contains(')') => {
            format!("\"{}\"", s.replace('"', "\\\""))
        }
        other => render_value(other),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (a, b) => a == b,
    }
}

/// Numbers compare numerically; strings lexicographically, which is correct
/// for ISO dates, `HH:MM` times and RFC 3339 timestamps.
fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Greater),
        (_, Value::Null) => Some(Ordering::Less),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encodes_filters_order_and_limit_for_postgrest() {
        let query = Query::table("slots_availability")
            .eq("doctor_id", 3)
            .in_list("status", ["available", "cancelled"])
            .order_by("slot_date")
            .order_by_desc("slot_time")
            .limit(10);

        assert_eq!(query.to_query_pairs(), vec![
            ("doctor_id".to_string(), "eq.3".to_string()),
            ("status".to_string(), "in.(available,cancelled)".to_string()),
            ("order".to_string(), "slot_date.asc,slot_time.desc".to_string()),
            ("limit".to_string(), "10".to_string()),
        ]);
    }

    #[test]
    fn hostile_values_stay_inside_their_parameter() {
        let query = Query::table("doctor_schedule").eq("day", "Monday' OR 1=1 --");
        let pairs = query.to_query_pairs();

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].1, "eq.Monday' OR 1=1 --");
    }

    #[test]
    fn in_values_with_delimiters_are_quoted() {
        let query = Query::table("t").in_list("name", ["a,b"]);
        assert_eq!(query.to_query_pairs()[0].1, "in.(\"a,b\")");
    }

    #[test]
    fn matches_equality_and_membership() {
        let row = json!({"id": 4, "status": "cancelled", "slot_date": "2026-10-20"});

        assert!(Query::table("t").eq("id", 4).matches(&row));
        assert!(!Query::table("t").eq("id", 5).matches(&row));
        assert!(Query::table("t").in_list("status", ["available", "cancelled"]).matches(&row));
        assert!(!Query::table("t").in_list("status", ["available", "booked"]).matches(&row));
        assert!(Query::table("t").eq("id", 4).eq("slot_date", "2026-10-20").matches(&row));
        assert!(!Query::table("t").eq("missing", "x").matches(&row));
    }

    #[test]
    fn arrange_sorts_by_each_order_then_limits() {
        let rows = vec![
            json!({"d": "2026-10-21", "t": "09:00"}),
            json!({"d": "2026-10-20", "t": "10:00"}),
            json!({"d": "2026-10-20", "t": "09:00"}),
        ];
        let arranged = Query::table("t").order_by("d").order_by("t").limit(2).arrange(rows);

        assert_eq!(arranged, vec![
            json!({"d": "2026-10-20", "t": "09:00"}),
            json!({"d": "2026-10-20", "t": "10:00"}),
        ]);
    }
}
