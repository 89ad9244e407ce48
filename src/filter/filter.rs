use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter_where::FilterWhere;
use super::types::{quote_identifier, validate_column, SqlResult, TableName};
use crate::types::SortOrder;

const BIGINT_MAX: u64 = i64::MAX as u64;

/// SELECT / COUNT statement builder for one table.
pub struct Filter {
    table: TableName,
    select_columns: Vec<String>,
    where_data: Map<String, Value>,
    order: Option<SortOrder>,
    limit: Option<u64>,
    offset: u64,
}

impl Filter {
    pub fn new(table: TableName) -> Self {
        Self {
            table,
            select_columns: vec![],
            where_data: Map::new(),
            order: None,
            limit: None,
            offset: 0,
        }
    }

    pub fn select<S: AsRef<str>>(&mut self, columns: &[S]) -> Result<&mut Self, FilterError> {
        let mut out = Vec::with_capacity(columns.len());
        for column in columns {
            let column = column.as_ref();
            if column != "*" {
                validate_column(column)?;
            }
            out.push(column.to_string());
        }
        self.select_columns = out;
        Ok(self)
    }

    pub fn where_eq(&mut self, conditions: &Map<String, Value>) -> &mut Self {
        self.where_data = conditions.clone();
        self
    }

    pub fn order(&mut self, order: Option<SortOrder>) -> Result<&mut Self, FilterError> {
        if let Some(sort) = &order {
            validate_column(sort.field)?;
        }
        self.order = order;
        Ok(self)
    }

    /// Values above `i64::MAX` are clamped; Postgres rejects larger ones.
    pub fn limit(&mut self, limit: Option<u64>, offset: u64) -> &mut Self {
        self.limit = limit.map(|l| l.min(BIGINT_MAX));
        self.offset = offset.min(BIGINT_MAX);
        self
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = FilterWhere::generate(&self.where_data, 0)?;

        let query = [
            format!("SELECT {}", self.build_select_clause()),
            format!("FROM {}", self.table.qualified()),
            format!("WHERE {}", where_clause),
            self.build_order_clause(),
            self.build_limit_clause(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params })
    }

    /// Same statement, each row folded into one JSON column named `row`.
    pub fn to_json_sql(&self) -> Result<SqlResult, FilterError> {
        let inner = self.to_sql()?;
        Ok(SqlResult {
            query: format!("SELECT row_to_json(t) AS row FROM ({}) t", inner.query),
            params: inner.params,
        })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = FilterWhere::generate(&self.where_data, 0)?;
        Ok(SqlResult {
            query: format!(
                "SELECT COUNT(*) AS count FROM {} WHERE {}",
                self.table.qualified(),
                where_clause
            ),
            params,
        })
    }

    fn build_select_clause(&self) -> String {
        if self.select_columns.is_empty() || self.select_columns.iter().any(|c| c == "*") {
            "*".to_string()
        } else {
            self.select_columns
                .iter()
                .map(|c| quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", ")
        }
    }

    fn build_order_clause(&self) -> String {
        match &self.order {
            Some(sort) => format!("ORDER BY {} {}", quote_identifier(sort.field), sort.direction.to_sql()),
            None => String::new(),
        }
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), 0) => format!("LIMIT {}", l),
            (Some(l), o) => format!("LIMIT {} OFFSET {}", l, o),
            (None, 0) => String::new(),
            (None, o) => format!("OFFSET {}", o),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn usuarios() -> Filter {
        Filter::new(TableName::new("public", "usuarios").unwrap())
    }

    #[test]
    fn select_with_filters_order_and_page() {
        let mut filter = usuarios();
        filter
            .select(&["id_usuario", "username"])
            .unwrap()
            .where_eq(json!({ "deleted_at": null }).as_object().unwrap())
            .order(Some(SortOrder::asc("id_usuario")))
            .unwrap()
            .limit(Some(10), 20);

        let sql = filter.to_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT \"id_usuario\", \"username\" FROM \"public\".\"usuarios\" WHERE \"deleted_at\" IS NULL \
             ORDER BY \"id_usuario\" ASC LIMIT 10 OFFSET 20"
        );
        assert!(sql.params.is_empty());
    }

    #[test]
    fn count_ignores_paging_but_keeps_the_predicate() {
        let mut filter = usuarios();
        filter
            .where_eq(json!({ "rol": "admin", "deleted_at": null }).as_object().unwrap())
            .limit(Some(5), 5);

        let count = filter.to_count_sql().unwrap();
        let select = filter.to_sql().unwrap();
        assert_eq!(
            count.query,
            "SELECT COUNT(*) AS count FROM \"public\".\"usuarios\" WHERE \"deleted_at\" IS NULL AND \"rol\"::text = $1"
        );
        assert_eq!(count.params, select.params);
    }

    #[test]
    fn json_sql_wraps_rows() {
        let filter = usuarios();
        let sql = filter.to_json_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT row_to_json(t) AS row FROM (SELECT * FROM \"public\".\"usuarios\" WHERE 1=1) t"
        );
    }

    #[test]
    fn rejects_invalid_select_column() {
        let mut filter = usuarios();
        assert!(filter.select(&["username; --"]).is_err());
    }

    #[test]
    fn paging_stays_within_bigint() {
        let mut filter = usuarios();
        filter.limit(Some(u64::MAX), u64::MAX);
        let sql = filter.to_sql().unwrap();
        assert!(sql
            .query
            .ends_with("LIMIT 9223372036854775807 OFFSET 9223372036854775807"));
    }
}
