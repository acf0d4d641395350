//! PostgreSQL implementation of [`SearchBackend`].
//!
//! Calls the `search_all`, `autocomplete`, `spelling_suggestions` and
//! `fuzzy_search` functions in the configured schema. All SQL is
//! runtime-checked (`sqlx::query`, not `sqlx::query!`) so building the crate
//! never needs a live database.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgColumn, PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Row as _, TypeInfo};
use std::time::Duration;

use super::{
    ColumnValue, Row, SearchBackend, AUTOCOMPLETE, FUZZY_SEARCH, SEARCH_ALL, SPELLING_SUGGESTIONS,
};
use crate::config::DatabaseConfig;
use crate::error::{Result, SearchError};
use crate::models::EntityType;

/// Postgres-backed search functions.
pub struct PgSearchBackend {
    pool: PgPool,
    schema: String,
    entity_type_column: String,
}

impl PgSearchBackend {
    /// Wrap an existing pool. `config` must already be validated: the schema
    /// and column names are interpolated into SQL.
    pub fn new(pool: PgPool, config: &DatabaseConfig) -> Self {
        Self {
            pool,
            schema: config.schema.clone(),
            entity_type_column: config.entity_type_column.clone(),
        }
    }

    /// Build a pool from configuration and wrap it.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await?;
        tracing::info!(
            schema = %config.schema,
            max_connections = config.max_connections,
            "Connected to search database"
        );
        Ok(Self::new(pool, config))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// `WHERE` clause restricting `search_all` rows, or `None` when every
    /// entity type is selected.
    fn type_filter(&self, types: &[EntityType], param: usize) -> Option<(String, Vec<String>)> {
        if EntityType::ALL.iter().all(|t| types.contains(t)) {
            return None;
        }
        let clause = format!(" WHERE lower(s.{}) = ANY(${param})", self.entity_type_column);
        let names = types.iter().map(|t| t.as_str().to_string()).collect();
        Some((clause, names))
    }

    fn count_sql(&self, filter: Option<&str>) -> String {
        format!(
            "SELECT COUNT(*) FROM {}.search_all($1) AS s{}",
            self.schema,
            filter.unwrap_or("")
        )
    }

    fn window_sql(&self, filter: Option<&str>, limit_param: usize) -> String {
        format!(
            "SELECT * FROM {}.search_all($1) AS s{} ORDER BY s.rank DESC LIMIT ${} OFFSET ${}",
            self.schema,
            filter.unwrap_or(""),
            limit_param,
            limit_param + 1
        )
    }
}

#[async_trait]
impl SearchBackend for PgSearchBackend {
    async fn count_all(&self, term: &str, types: &[EntityType]) -> Result<u64> {
        let filter = self.type_filter(types, 2);
        let sql = self.count_sql(filter.as_ref().map(|(clause, _)| clause.as_str()));

        let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(term);
        if let Some((_, names)) = filter {
            query = query.bind(names);
        }
        let count = query.fetch_one(&self.pool).await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn search_all(
        &self,
        term: &str,
        types: &[EntityType],
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Row>> {
        let limit = i64::try_from(limit)
            .map_err(|_| SearchError::InvalidPaging(format!("limit {limit} out of range")))?;
        let offset = i64::try_from(offset)
            .map_err(|_| SearchError::InvalidPaging(format!("offset {offset} out of range")))?;

        let filter = self.type_filter(types, 2);
        let limit_param = if filter.is_some() { 3 } else { 2 };
        let sql = self.window_sql(filter.as_ref().map(|(clause, _)| clause.as_str()), limit_param);

        let mut query = sqlx::query(&sql).bind(term);
        if let Some((_, names)) = filter {
            query = query.bind(names);
        }
        let rows = query.bind(limit).bind(offset).fetch_all(&self.pool).await?;
        decode_rows(SEARCH_ALL, &rows)
    }

    async fn autocomplete(&self, prefix: &str, limit: u32) -> Result<Vec<Row>> {
        let sql = format!("SELECT * FROM {}.autocomplete($1, $2)", self.schema);
        let rows = sqlx::query(&sql)
            .bind(prefix)
            .bind(limit_param(limit))
            .fetch_all(&self.pool)
            .await?;
        decode_rows(AUTOCOMPLETE, &rows)
    }

    async fn spelling_suggestions(&self, term: &str, limit: u32) -> Result<Vec<Row>> {
        let sql = format!("SELECT * FROM {}.spelling_suggestions($1, $2)", self.schema);
        let rows = sqlx::query(&sql)
            .bind(term)
            .bind(limit_param(limit))
            .fetch_all(&self.pool)
            .await?;
        decode_rows(SPELLING_SUGGESTIONS, &rows)
    }

    async fn fuzzy_search(&self, term: &str, threshold: f32) -> Result<Vec<Row>> {
        let sql = format!("SELECT * FROM {}.fuzzy_search($1, $2)", self.schema);
        let rows = sqlx::query(&sql)
            .bind(term)
            .bind(threshold)
            .fetch_all(&self.pool)
            .await?;
        decode_rows(FUZZY_SEARCH, &rows)
    }
}

/// The search functions declare their limit as `int`.
fn limit_param(limit: u32) -> i32 {
    i32::try_from(limit).unwrap_or(i32::MAX)
}

fn decode_rows(function: &'static str, rows: &[PgRow]) -> Result<Vec<Row>> {
    rows.iter()
        .map(|row| {
            row.columns()
                .iter()
                .map(|col| decode_column(function, row, col))
                .collect()
        })
        .collect()
}

/// Decode one cell by its Postgres type name. Unknown types are schema
/// drift, not backend failures.
fn decode_column(function: &'static str, row: &PgRow, col: &PgColumn) -> Result<ColumnValue> {
    let idx = col.ordinal();
    let type_name = col.type_info().name();
    let decode_err = |e: sqlx::Error| {
        SearchError::malformed(
            function,
            format!("column {} ({type_name}): {e}", col.name()),
        )
    };

    let value = match type_name {
        // sqlx names blank-padded `char(n)` "CHAR".
        "TEXT" | "VARCHAR" | "CHAR" | "NAME" => row
            .try_get::<Option<String>, _>(idx)
            .map_err(decode_err)?
            .map(ColumnValue::Text),
        "INT2" => row
            .try_get::<Option<i16>, _>(idx)
            .map_err(decode_err)?
            .map(|v| ColumnValue::Int(i64::from(v))),
        "INT4" => row
            .try_get::<Option<i32>, _>(idx)
            .map_err(decode_err)?
            .map(|v| ColumnValue::Int(i64::from(v))),
        "INT8" => row
            .try_get::<Option<i64>, _>(idx)
            .map_err(decode_err)?
            .map(ColumnValue::Int),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(idx)
            .map_err(decode_err)?
            .map(|v| ColumnValue::Float(f64::from(v))),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(idx)
            .map_err(decode_err)?
            .map(ColumnValue::Float),
        "NUMERIC" => row
            .try_get::<Option<Decimal>, _>(idx)
            .map_err(decode_err)?
            .map(ColumnValue::Decimal),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(idx)
            .map_err(decode_err)?
            .map(ColumnValue::Timestamp),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(idx)
            .map_err(decode_err)?
            .map(|v| ColumnValue::Timestamp(v.naive_utc())),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(idx)
            .map_err(decode_err)?
            .map(|v| ColumnValue::Timestamp(v.and_time(NaiveTime::MIN))),
        other => {
            return Err(SearchError::malformed(
                function,
                format!("column {} has unsupported type {other}", col.name()),
            ))
        }
    };
    Ok(value.unwrap_or(ColumnValue::Null))
}
