//! Document collections stored as JSONB.
//!
//! Each collection is a table `(id uuid, doc jsonb, created_at, updated_at)`.
//! The public id field (`_id`) and the `createdAt` / `updatedAt` timestamps
//! are folded into the returned document; everything else lives in `doc`.
//! Updates merge top-level keys into the stored document.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{postgres::PgArguments, types::Json, PgPool};
use uuid::Uuid;

use super::backend::{Backend, BackendError, BackendResult, Filters, QueryOptions, Record};
use super::binding::CollectionBinding;
use crate::filter::{quote_identifier, validate_column, FilterError, TableName};
use crate::types::SortOrder;

pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";

type DocumentRow = (Uuid, Value, DateTime<Utc>, DateTime<Utc>);

enum Param {
    Id(Uuid),
    Doc(Value),
}

pub struct PgDocumentBackend {
    pool: PgPool,
    table: TableName,
    id_field: &'static str,
    projection: &'static [&'static str],
}

impl PgDocumentBackend {
    pub fn new(pool: PgPool, schema: &str, binding: &CollectionBinding) -> Result<Self, FilterError> {
        Ok(Self {
            pool,
            table: TableName::new(schema, binding.name)?,
            id_field: binding.id_field,
            projection: binding.default_select,
        })
    }

    /// Creates the backing table and the indexes for `indexed_fields`.
    pub async fn ensure_collection(&self, indexed_fields: &[&str]) -> BackendResult<()> {
        let table = self.table.qualified();
        let name = self.table.table();

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
                id uuid PRIMARY KEY, \
                doc jsonb NOT NULL DEFAULT '{{}}'::jsonb, \
                created_at timestamptz NOT NULL DEFAULT now(), \
                updated_at timestamptz NOT NULL DEFAULT now())"
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {} ON {table} USING gin (doc jsonb_path_ops)",
            quote_identifier(&format!("{name}_doc_idx"))
        ))
        .execute(&self.pool)
        .await?;

        for field in indexed_fields {
            validate_column(field)?;
            sqlx::query(&format!(
                "CREATE INDEX IF NOT EXISTS {} ON {table} ((doc -> '{field}'))",
                quote_identifier(&format!("{name}_{field}_idx"))
            ))
            .execute(&self.pool)
            .await?;
        }

        tracing::info!(collection = name, "Document collection ready");
        Ok(())
    }

    /// WHERE body and its parameters, numbered from `$1`.
    fn where_clause(&self, filters: &Filters) -> Result<(String, Vec<Param>), FilterError> {
        let mut conditions = Vec::new();
        let mut params = Vec::new();
        let mut contained = Map::new();

        for (field, value) in filters {
            validate_column(field)?;
            if field == self.id_field {
                match value.as_str().and_then(|s| Uuid::parse_str(s).ok()) {
                    Some(id) => {
                        params.push(Param::Id(id));
                        conditions.push(format!("id = ${}", params.len()));
                    }
                    None => conditions.push("1=0".to_string()),
                }
                continue;
            }
            match value {
                Value::Null => conditions.push(format!("coalesce(doc -> '{field}', 'null'::jsonb) = 'null'::jsonb")),
                Value::Array(_) => {
                    params.push(Param::Doc(value.clone()));
                    conditions.push(format!("${} @> jsonb_build_array(doc -> '{field}')", params.len()));
                }
                _ => {
                    contained.insert(field.clone(), value.clone());
                }
            }
        }

        if !contained.is_empty() {
            params.push(Param::Doc(Value::Object(contained)));
            conditions.push(format!("doc @> ${}", params.len()));
        }

        let sql = if conditions.is_empty() { "1=1".to_string() } else { conditions.join(" AND ") };
        Ok((sql, params))
    }

    fn order_clause(&self, sort: Option<SortOrder>) -> Result<String, FilterError> {
        let Some(sort) = sort else {
            return Ok("ORDER BY created_at ASC, id ASC".to_string());
        };
        validate_column(sort.field)?;
        let dir = sort.direction.to_sql();
        let expr = match sort.field {
            f if f == self.id_field => "id".to_string(),
            CREATED_AT => "created_at".to_string(),
            UPDATED_AT => "updated_at".to_string(),
            f => format!("doc -> '{f}'"),
        };
        Ok(format!("ORDER BY {expr} {dir}, id {dir}"))
    }

    fn into_record(&self, (id, doc, created_at, updated_at): DocumentRow) -> BackendResult<Record> {
        let Value::Object(mut map) = doc else {
            return Err(BackendError::Decode(format!("document {} is not a JSON object", id)));
        };
        map.insert(self.id_field.to_string(), Value::String(id.to_string()));
        map.insert(CREATED_AT.to_string(), Value::String(created_at.to_rfc3339()));
        map.insert(UPDATED_AT.to_string(), Value::String(updated_at.to_rfc3339()));

        if !self.projection.is_empty() {
            map.retain(|k, _| k == self.id_field || self.projection.contains(&k.as_str()));
        }
        Ok(map)
    }

    fn strip_reserved(&self, mut payload: Record) -> Record {
        payload.remove(self.id_field);
        payload.remove(CREATED_AT);
        payload.remove(UPDATED_AT);
        payload
    }

    fn parse_id(id: &Value) -> Option<Uuid> {
        id.as_str().and_then(|s| Uuid::parse_str(s).ok())
    }

    async fn fetch(&self, query: &str, params: &[Param]) -> BackendResult<Vec<Record>> {
        let mut q = sqlx::query_as::<_, DocumentRow>(query);
        for p in params {
            q = bind_doc_param(q, p);
        }
        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(|row| self.into_record(row)).collect()
    }
}

fn bind_doc_param<'q>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, DocumentRow, PgArguments>,
    p: &'q Param,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, DocumentRow, PgArguments> {
    match p {
        Param::Id(id) => q.bind(*id),
        Param::Doc(v) => q.bind(Json(v)),
    }
}

const COLUMNS: &str = "id, doc, created_at, updated_at";

#[async_trait]
impl Backend for PgDocumentBackend {
    async fn query(&self, filters: &Filters, opts: QueryOptions) -> BackendResult<Vec<Record>> {
        let (where_clause, params) = self.where_clause(filters)?;
        let mut query = format!(
            "SELECT {COLUMNS} FROM {} WHERE {} {}",
            self.table.qualified(),
            where_clause,
            self.order_clause(opts.sort)?
        );
        if let Some(limit) = opts.limit {
            query.push_str(&format!(" LIMIT {}", limit.min(i64::MAX as u64)));
        }
        if opts.skip > 0 {
            query.push_str(&format!(" OFFSET {}", opts.skip.min(i64::MAX as u64)));
        }
        tracing::debug!(collection = self.table.table(), %query, "find");
        self.fetch(&query, &params).await
    }

    async fn count(&self, filters: &Filters) -> BackendResult<u64> {
        let (where_clause, params) = self.where_clause(filters)?;
        let query = format!("SELECT COUNT(*) FROM {} WHERE {}", self.table.qualified(), where_clause);

        let mut q = sqlx::query_scalar::<_, i64>(&query);
        for p in params.iter() {
            q = match p {
                Param::Id(id) => q.bind(*id),
                Param::Doc(v) => q.bind(Json(v)),
            };
        }
        let count = q.fetch_one(&self.pool).await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn get_by_id(&self, id: &Value) -> BackendResult<Option<Record>> {
        let Some(id) = Self::parse_id(id) else { return Ok(None) };
        let query = format!("SELECT {COLUMNS} FROM {} WHERE id = $1", self.table.qualified());
        Ok(self.fetch(&query, &[Param::Id(id)]).await?.into_iter().next())
    }

    async fn insert(&self, payload: Record) -> BackendResult<Record> {
        let doc = Value::Object(self.strip_reserved(payload));
        let query = format!(
            "INSERT INTO {} (id, doc) VALUES ($1, $2) RETURNING {COLUMNS}",
            self.table.qualified()
        );
        self.fetch(&query, &[Param::Id(Uuid::new_v4()), Param::Doc(doc)])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Query(format!("insert into {} returned no row", self.table.table())))
    }

    async fn update_by_id(&self, id: &Value, payload: Record) -> BackendResult<Option<Record>> {
        let Some(id) = Self::parse_id(id) else { return Ok(None) };
        let changes = Value::Object(self.strip_reserved(payload));
        let query = format!(
            "UPDATE {} SET doc = doc || $2, updated_at = now() WHERE id = $1 RETURNING {COLUMNS}",
            self.table.qualified()
        );
        Ok(self.fetch(&query, &[Param::Id(id), Param::Doc(changes)]).await?.into_iter().next())
    }

    async fn delete_by_id(&self, id: &Value) -> BackendResult<bool> {
        let Some(id) = Self::parse_id(id) else { return Ok(false) };
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", self.table.qualified()))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    fn kind(&self) -> &'static str {
        "postgres-jsonb"
    }
}
