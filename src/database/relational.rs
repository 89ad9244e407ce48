//! Relational backend: one Postgres table per collection.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{postgres::PgArguments, types::Json, Arguments, PgPool, Postgres};

use super::backend::{Backend, BackendError, BackendResult, Filters, QueryOptions, Record};
use super::binding::CollectionBinding;
use crate::filter::filter_where::FilterWhere;
use crate::filter::{quote_identifier, validate_column, Filter, FilterError, SqlResult, TableName};

/// One relational table.
///
/// Rows are returned as JSON through `row_to_json`; writes go through
/// `jsonb_populate_record` so Postgres coerces JSON values to column types.
pub struct PgTableBackend {
    pool: PgPool,
    table: TableName,
    id_field: &'static str,
    select: &'static [&'static str],
}

impl PgTableBackend {
    pub fn new(pool: PgPool, schema: &str, binding: &CollectionBinding) -> Result<Self, FilterError> {
        let table = TableName::new(schema, binding.name)?;
        validate_column(binding.id_field)?;
        for column in binding.default_select {
            validate_column(column)?;
        }
        Ok(Self {
            pool,
            table,
            id_field: binding.id_field,
            select: binding.default_select,
        })
    }

    fn filter(&self) -> Result<Filter, FilterError> {
        let mut filter = Filter::new(self.table.clone());
        filter.select(self.select)?;
        Ok(filter)
    }

    fn select_clause(&self) -> String {
        if self.select.is_empty() {
            "*".to_string()
        } else {
            self.select.iter().map(|c| quote_identifier(c)).collect::<Vec<_>>().join(", ")
        }
    }

    fn id_conditions(&self, id: &Value) -> Map<String, Value> {
        let mut conditions = Map::new();
        conditions.insert(self.id_field.to_string(), id.clone());
        conditions
    }

    async fn fetch_rows(&self, sql: &SqlResult, payload: Option<&Value>) -> BackendResult<Vec<Record>> {
        let args = arguments(payload, &sql.params)?;
        let rows = sqlx::query_scalar_with::<Postgres, Value, _>(&sql.query, args)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(into_record).collect()
    }

    fn writable_columns(payload: &Record) -> Result<Vec<String>, FilterError> {
        let mut columns = Vec::with_capacity(payload.len());
        for key in payload.keys() {
            validate_column(key)?;
            columns.push(quote_identifier(key));
        }
        Ok(columns)
    }
}

fn into_record(value: Value) -> BackendResult<Record> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(BackendError::Decode(format!("expected JSON object row, got {}", other))),
    }
}

#[async_trait]
impl Backend for PgTableBackend {
    async fn query(&self, filters: &Filters, opts: QueryOptions) -> BackendResult<Vec<Record>> {
        let mut filter = self.filter()?;
        filter.where_eq(filters).order(opts.sort)?.limit(opts.limit, opts.skip);
        let sql = filter.to_json_sql()?;
        tracing::debug!(table = self.table.table(), query = %sql.query, "select");
        self.fetch_rows(&sql, None).await
    }

    async fn count(&self, filters: &Filters) -> BackendResult<u64> {
        let mut filter = self.filter()?;
        filter.where_eq(filters);
        let sql = filter.to_count_sql()?;

        let args = arguments(None, &sql.params)?;
        let count = sqlx::query_scalar_with::<Postgres, i64, _>(&sql.query, args)
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn get_by_id(&self, id: &Value) -> BackendResult<Option<Record>> {
        let mut filter = self.filter()?;
        filter.where_eq(&self.id_conditions(id)).limit(Some(1), 0);
        let sql = filter.to_json_sql()?;
        Ok(self.fetch_rows(&sql, None).await?.into_iter().next())
    }

    async fn insert(&self, payload: Record) -> BackendResult<Record> {
        let table = self.table.qualified();
        let columns = Self::writable_columns(&payload)?;

        let insert = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES RETURNING *", table)
        } else {
            let list = columns.join(", ");
            format!(
                "INSERT INTO {table} ({list}) SELECT {list} FROM jsonb_populate_record(NULL::{table}, $1) RETURNING *"
            )
        };
        let sql = SqlResult {
            query: format!(
                "WITH ins AS ({}) SELECT row_to_json(r) AS row FROM (SELECT {} FROM ins) r",
                insert,
                self.select_clause()
            ),
            params: vec![],
        };

        let body = Value::Object(payload);
        let bound = if columns.is_empty() { None } else { Some(&body) };
        self.fetch_rows(&sql, bound)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Query(format!("insert into {} returned no row", self.table.table())))
    }

    async fn update_by_id(&self, id: &Value, payload: Record) -> BackendResult<Option<Record>> {
        let columns = Self::writable_columns(&payload)?;
        if columns.is_empty() {
            return self.get_by_id(id).await;
        }

        let table = self.table.qualified();
        let assignments = columns
            .iter()
            .map(|c| format!("{c} = (SELECT {c} FROM jsonb_populate_record(NULL::{table}, $1))"))
            .collect::<Vec<_>>()
            .join(", ");
        let (where_clause, params) = FilterWhere::generate(&self.id_conditions(id), 1)?;

        let sql = SqlResult {
            query: format!(
                "WITH upd AS (UPDATE {} SET {} WHERE {} RETURNING *) \
                 SELECT row_to_json(r) AS row FROM (SELECT {} FROM upd) r",
                table,
                assignments,
                where_clause,
                self.select_clause()
            ),
            params,
        };

        let body = Value::Object(payload);
        Ok(self.fetch_rows(&sql, Some(&body)).await?.into_iter().next())
    }

    async fn delete_by_id(&self, id: &Value) -> BackendResult<bool> {
        let (where_clause, params) = FilterWhere::generate(&self.id_conditions(id), 0)?;
        let query = format!("DELETE FROM {} WHERE {}", self.table.qualified(), where_clause);

        let args = arguments(None, &params)?;
        let result = sqlx::query_with(&query, args).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    fn kind(&self) -> &'static str {
        "postgres"
    }
}

/// Encodes the optional JSON payload as `$1`, then every filter parameter in order.
fn arguments(payload: Option<&Value>, params: &[Value]) -> BackendResult<PgArguments> {
    let mut args = PgArguments::default();
    if let Some(payload) = payload {
        args.add(Json(payload));
    }
    for value in params {
        match value {
            Value::Null => args.add(None::<String>),
            Value::Bool(b) => args.add(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    args.add(i)
                } else if let Some(u) = n.as_u64() {
                    let i = i64::try_from(u)
                        .map_err(|_| BackendError::Query(format!("integer {} does not fit in bigint", u)))?;
                    args.add(i)
                } else if let Some(f) = n.as_f64() {
                    args.add(f)
                } else {
                    args.add(n.to_string())
                }
            }
            Value::String(s) => args.add(s.as_str()),
            Value::Array(_) | Value::Object(_) => args.add(Json(value)),
        }
    }
    Ok(args)
}
