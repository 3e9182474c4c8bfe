//! Query Builder
//!
//! Renders parameterized statements against a named table. Identifiers are
//! quoted here; values never appear in the SQL text and are returned as
//! positional bind parameters instead.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::Value;
use crate::schema::DefaultValue;

/// Column → exact-match value, ANDed together
pub type Filters = BTreeMap<String, Value>;

/// Ordered (column, direction) pairs
pub type OrderBy = Vec<(String, OrderDirection)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for OrderDirection {
    type Err = std::convert::Infallible;

    /// Anything other than an explicit descending marker sorts ascending
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("desc") || s.trim().eq_ignore_ascii_case("descending") {
            Ok(Self::Desc)
        } else {
            Ok(Self::Asc)
        }
    }
}

/// Parse `col[:dir],col[:dir]`; a missing direction sorts ascending
pub fn parse_order_by(raw: &str) -> OrderBy {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once(':') {
            Some((column, direction)) => (
                column.trim().to_string(),
                direction.parse().unwrap_or_default(),
            ),
            None => (part.to_string(), OrderDirection::Asc),
        })
        .collect()
}

/// Parse a comma-separated column list
pub fn parse_columns(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect()
}

/// A single restriction in a WHERE clause
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(String, Value),
    /// `column IN (subquery)`; binds only the subquery's own parameters
    InSelect(String, BuiltQuery),
    NotNull(String),
}

/// Rendered SQL plus its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Composable SELECT against one table
#[derive(Debug, Clone)]
pub struct SelectQuery {
    table: String,
    columns: Vec<String>,
    distinct: bool,
    predicates: Vec<Predicate>,
    order_by: OrderBy,
}

impl SelectQuery {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
            distinct: false,
            predicates: Vec::new(),
            order_by: Vec::new(),
        }
    }

    /// `SELECT DISTINCT column`, used to collect bridging keys
    pub fn distinct_column(table: &str, column: &str) -> Self {
        let mut query = Self::new(table);
        query.columns = vec![column.to_string()];
        query.distinct = true;
        query
    }

    /// Requested columns. Zero or one column selects every column.
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for column in columns {
            let column = column.into();
            if !self.columns.contains(&column) {
                self.columns.push(column);
            }
        }
        self
    }

    pub fn filter_eq(mut self, column: &str, value: Value) -> Self {
        self.predicates.push(Predicate::Eq(column.to_string(), value));
        self
    }

    pub fn filter_in_select(mut self, column: &str, subquery: BuiltQuery) -> Self {
        self.predicates.push(Predicate::InSelect(column.to_string(), subquery));
        self
    }

    pub fn filter_not_null(mut self, column: &str) -> Self {
        self.predicates.push(Predicate::NotNull(column.to_string()));
        self
    }

    pub fn filters(mut self, filters: &Filters) -> Self {
        for (column, value) in filters {
            self.predicates.push(Predicate::Eq(column.clone(), value.clone()));
        }
        self
    }

    pub fn order_by(mut self, order_by: &[(String, OrderDirection)]) -> Self {
        self.order_by.extend(order_by.iter().cloned());
        self
    }

    pub fn build(&self) -> BuiltQuery {
        let mut sql = String::from("SELECT ");
        let mut params = Vec::new();

        if self.distinct {
            sql.push_str("DISTINCT ");
        }

        if self.distinct || self.columns.len() > 1 {
            let list: Vec<String> = self.columns.iter().map(|c| quote_identifier(c)).collect();
            sql.push_str(&list.join(", "));
        } else {
            sql.push('*');
        }

        sql.push_str(" FROM ");
        sql.push_str(&quote_identifier(&self.table));

        if !self.predicates.is_empty() {
            let clauses: Vec<String> = self
                .predicates
                .iter()
                .map(|predicate| match predicate {
                    Predicate::Eq(column, value) => {
                        params.push(value.clone());
                        format!("{} = ?", quote_identifier(column))
                    }
                    Predicate::InSelect(column, subquery) => {
                        params.extend(subquery.params.iter().cloned());
                        format!("{} IN ({})", quote_identifier(column), subquery.sql)
                    }
                    Predicate::NotNull(column) => format!("{} IS NOT NULL", quote_identifier(column)),
                })
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        if !self.order_by.is_empty() {
            let clauses: Vec<String> = self
                .order_by
                .iter()
                .map(|(column, direction)| format!("{} {}", quote_identifier(column), direction.as_sql()))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&clauses.join(", "));
        }

        BuiltQuery { sql, params }
    }
}

/// Render a SELECT from a filter map, requested columns and ordering
pub fn build_select(table: &str, columns: &[String], filters: &Filters, order_by: &[(String, OrderDirection)]) -> BuiltQuery {
    SelectQuery::new(table)
        .columns(columns.iter().cloned())
        .filters(filters)
        .order_by(order_by)
        .build()
}

/// Render one multi-row INSERT binding every row's values positionally
pub fn build_insert(table: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> BuiltQuery {
    let column_list: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();
    let row_placeholder = format!("({})", vec!["?"; columns.len()].join(", "));
    let placeholders = vec![row_placeholder.as_str(); rows.len()].join(", ");

    BuiltQuery {
        sql: format!(
            "INSERT INTO {} ({}) VALUES {}",
            quote_identifier(table),
            column_list.join(", "),
            placeholders
        ),
        params: rows.into_iter().flatten().collect(),
    }
}

/// Quote an SQL identifier, doubling embedded quotes
pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Render a schema literal for DDL (CHECK bounds, DEFAULT values)
pub fn quote_literal(value: &DefaultValue) -> String {
    match value {
        DefaultValue::Integer(i) => i.to_string(),
        DefaultValue::Real(f) => f.to_string(),
        DefaultValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters(pairs: &[(&str, &str)]) -> Filters {
        pairs.iter().map(|(k, v)| (k.to_string(), Value::from(*v))).collect()
    }

    #[test]
    fn test_parse_order_by_and_columns() {
        assert_eq!(
            parse_order_by("route_short_name:desc, route_id,stop_id:up"),
            vec![
                ("route_short_name".to_string(), OrderDirection::Desc),
                ("route_id".to_string(), OrderDirection::Asc),
                ("stop_id".to_string(), OrderDirection::Asc),
            ]
        );
        assert!(parse_order_by("").is_empty());
        assert_eq!(parse_columns("a, b,,c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_unfiltered_full_scan() {
        let built = build_select("agency", &[], &Filters::new(), &[]);
        assert_eq!(built.sql, "SELECT * FROM \"agency\"");
        assert!(built.params.is_empty());
    }

    #[test]
    fn test_single_column_selects_all() {
        let built = build_select("agency", &["agency_url".to_string()], &Filters::new(), &[]);
        assert_eq!(built.sql, "SELECT * FROM \"agency\"");
    }

    #[test]
    fn test_columns_are_deduplicated_and_quoted() {
        let columns = vec!["agency_url".to_string(), "agency_lang".to_string(), "agency_url".to_string()];
        let built = build_select("agency", &columns, &Filters::new(), &[]);
        assert_eq!(built.sql, "SELECT \"agency_url\", \"agency_lang\" FROM \"agency\"");
    }

    #[test]
    fn test_filters_are_bound_not_interpolated() {
        let built = build_select(
            "agency",
            &[],
            &filters(&[("agency_id", "CT'; DROP TABLE agency; --"), ("agency_lang", "en")]),
            &[],
        );
        assert_eq!(built.sql, "SELECT * FROM \"agency\" WHERE \"agency_id\" = ? AND \"agency_lang\" = ?");
        assert_eq!(built.params[0], Value::from("CT'; DROP TABLE agency; --"));
        assert_eq!(built.params[1], Value::from("en"));
    }

    #[test]
    fn test_order_by_defaults_to_ascending() {
        let order: OrderBy = vec![
            ("route_long_name".to_string(), "sideways".parse().unwrap()),
            ("route_id".to_string(), "DESC".parse().unwrap()),
        ];
        let built = build_select("routes", &[], &Filters::new(), &order);
        assert_eq!(built.sql, "SELECT * FROM \"routes\" ORDER BY \"route_long_name\" ASC, \"route_id\" DESC");
    }

    #[test]
    fn test_in_subquery_and_distinct() {
        let trips = SelectQuery::distinct_column("trips", "trip_id")
            .filters(&filters(&[("service_id", "WK")]))
            .build();
        let built = SelectQuery::distinct_column("stop_times", "stop_id")
            .filter_in_select("trip_id", trips)
            .filter_not_null("stop_id")
            .build();
        assert_eq!(
            built.sql,
            "SELECT DISTINCT \"stop_id\" FROM \"stop_times\" WHERE \"trip_id\" IN \
             (SELECT DISTINCT \"trip_id\" FROM \"trips\" WHERE \"service_id\" = ?) AND \"stop_id\" IS NOT NULL"
        );
        assert_eq!(built.params, vec![Value::from("WK")]);
    }

    #[test]
    fn test_identifier_escaping() {
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(quote_literal(&DefaultValue::Text("it's")), "'it''s'");
        assert_eq!(quote_literal(&DefaultValue::Integer(0)), "0");
    }

    #[test]
    fn test_multi_row_insert() {
        let built = build_insert(
            "levels",
            &["level_id", "level_index"],
            vec![
                vec![Value::from("L0"), Value::Real(0.0)],
                vec![Value::from("L1"), Value::Real(1.0)],
            ],
        );
        assert_eq!(built.sql, "INSERT INTO \"levels\" (\"level_id\", \"level_index\") VALUES (?, ?), (?, ?)");
        assert_eq!(built.params.len(), 4);
    }
}
