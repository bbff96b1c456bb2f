use serde_json::{Map, Value};
use sqlx::postgres::PgArguments;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::tables::EntityTable;
use crate::filter::filter_where::cast_suffix;
use crate::filter::{Filter, FilterData};
use crate::types::Page;

/// Fields owned by the storage layer; write payloads may not set them.
pub const SYSTEM_FIELDS: &[&str] = &["id", "created_at", "updated_at"];

/// Table-parametrized CRUD over entity records. Every entity controller
/// reaches storage through this one interface; query composition lives here
/// and in the filter module, nowhere else.
///
/// Records are materialized as JSON objects via `row_to_json`, so one service
/// covers every registry table without a struct per entity. Concurrent
/// updates to the same row are last-write-wins; no optimistic locking is
/// provided.
pub struct DataService {
    pool: PgPool,
    table: &'static EntityTable,
}

impl DataService {
    pub fn new(pool: PgPool, table: &'static EntityTable) -> Self {
        Self { pool, table }
    }

    /// Insert a record and return it as stored, including the generated `id`
    /// and timestamps.
    pub async fn create(&self, fields: Map<String, Value>) -> Result<Value, DatabaseError> {
        validate_columns(fields.keys())?;
        if fields.is_empty() {
            return Err(DatabaseError::QueryError(
                "no fields to insert".to_string(),
            ));
        }

        let sql = insert_sql(self.table.name, &fields);

        let mut query = sqlx::query(&sql);
        for value in fields.values() {
            query = bind_param(query, value);
        }
        let row = query
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        json_row(&row)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Value, DatabaseError> {
        self.find_optional(id).await?.ok_or_else(|| {
            DatabaseError::NotFound(format!("{} record {} not found", self.table.name, id))
        })
    }

    pub async fn find_optional(&self, id: Uuid) -> Result<Option<Value>, DatabaseError> {
        let sql = format!(
            "SELECT row_to_json(t) AS row FROM (SELECT * FROM \"{}\" WHERE \"id\" = $1) t",
            self.table.name
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        row.map(|r| json_row(&r)).transpose()
    }

    /// Filtered, ordered, sliced read plus the total count of the filtered
    /// set before slicing - callers derive `totalPages` from the pair.
    pub async fn find_all(&self, data: FilterData) -> Result<(Vec<Value>, i64), DatabaseError> {
        let mut filter = Filter::new(self.table.name).map_err(to_query_error)?;
        filter.assign(data).map_err(to_query_error)?;
        if !filter.has_order() {
            // Stable default order so pagination never duplicates or skips.
            filter
                .order(Value::String("created_at desc, id asc".to_string()))
                .map_err(to_query_error)?;
        }

        let total = {
            let count_sql = filter.to_count_sql().map_err(to_query_error)?;
            let mut query = sqlx::query(&count_sql.query);
            for param in &count_sql.params {
                query = bind_param(query, param);
            }
            let row = query
                .fetch_one(&self.pool)
                .await
                .map_err(DatabaseError::from_sqlx)?;
            row.try_get::<i64, _>("count")
                .map_err(DatabaseError::from_sqlx)?
        };

        let select = filter.to_sql().map_err(to_query_error)?;
        let sql = format!("SELECT row_to_json(t) AS row FROM ({}) t", select.query);
        let mut query = sqlx::query(&sql);
        for param in &select.params {
            query = bind_param(query, param);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        let records = rows
            .iter()
            .map(json_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((records, total))
    }

    /// Partial update: only the provided fields change; `updated_at` is
    /// refreshed by the statement itself.
    pub async fn update(&self, id: Uuid, fields: Map<String, Value>) -> Result<Value, DatabaseError> {
        validate_columns(fields.keys())?;
        if fields.is_empty() {
            return Err(DatabaseError::QueryError(
                "no fields to update".to_string(),
            ));
        }

        let sql = update_sql(self.table.name, &fields);

        let mut query = sqlx::query(&sql);
        for value in fields.values() {
            query = bind_param(query, value);
        }
        query = query.bind(id);

        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?
            .ok_or_else(|| {
                DatabaseError::NotFound(format!("{} record {} not found", self.table.name, id))
            })?;
        json_row(&row)
    }

    /// Hard delete. Idempotent success: removing a missing id returns
    /// `Ok(false)` rather than an error, so retries are safe.
    pub async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let sql = format!("DELETE FROM \"{}\" WHERE \"id\" = $1", self.table.name);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self, data: FilterData) -> Result<i64, DatabaseError> {
        let mut filter = Filter::new(self.table.name).map_err(to_query_error)?;
        filter.assign(data).map_err(to_query_error)?;
        let count_sql = filter.to_count_sql().map_err(to_query_error)?;

        let mut query = sqlx::query(&count_sql.query);
        for param in &count_sql.params {
            query = bind_param(query, param);
        }
        let row = query
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        row.try_get::<i64, _>("count")
            .map_err(DatabaseError::from_sqlx)
    }

    /// Case-insensitive substring match, OR-combined across `fields`.
    pub async fn search(
        &self,
        term: &str,
        fields: &[&str],
        page: &Page,
    ) -> Result<Vec<Value>, DatabaseError> {
        validate_columns(fields.iter().map(|f| *f))?;
        if fields.is_empty() {
            return Err(DatabaseError::QueryError(
                "no fields to search".to_string(),
            ));
        }

        let sql = search_sql(self.table.name, fields, page.limit, page.offset());
        let pattern = format!("%{}%", escape_like(term));
        let rows = sqlx::query(&sql)
            .bind(&pattern)
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        rows.iter().map(json_row).collect()
    }
}

fn to_query_error(err: crate::filter::FilterError) -> DatabaseError {
    DatabaseError::QueryError(err.to_string())
}

fn json_row(row: &sqlx::postgres::PgRow) -> Result<Value, DatabaseError> {
    row.try_get::<Value, _>("row")
        .map_err(DatabaseError::from_sqlx)
}

fn validate_columns(
    columns: impl Iterator<Item = impl AsRef<str>>,
) -> Result<(), DatabaseError> {
    for column in columns {
        let column = column.as_ref();
        if SYSTEM_FIELDS.contains(&column) {
            return Err(DatabaseError::QueryError(format!(
                "system field '{}' cannot be written",
                column
            )));
        }
        if !crate::filter::filter::is_valid_identifier(column) {
            return Err(DatabaseError::QueryError(format!(
                "invalid column name: {}",
                column
            )));
        }
    }
    Ok(())
}

fn insert_sql(table: &str, fields: &Map<String, Value>) -> String {
    let columns = fields
        .keys()
        .map(|k| format!("\"{}\"", k))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = fields
        .values()
        .enumerate()
        .map(|(i, v)| format!("${}{}", i + 1, cast_suffix(v)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "WITH inserted AS (INSERT INTO \"{}\" ({}) VALUES ({}) RETURNING *) \
         SELECT row_to_json(inserted) AS row FROM inserted",
        table, columns, placeholders
    )
}

fn update_sql(table: &str, fields: &Map<String, Value>) -> String {
    let assignments = fields
        .iter()
        .enumerate()
        .map(|(i, (k, v))| format!("\"{}\" = ${}{}", k, i + 1, cast_suffix(v)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "WITH updated AS (UPDATE \"{}\" SET {}, \"updated_at\" = NOW() WHERE \"id\" = ${} RETURNING *) \
         SELECT row_to_json(updated) AS row FROM updated",
        table,
        assignments,
        fields.len() + 1
    )
}

fn search_sql(table: &str, fields: &[&str], limit: i64, offset: i64) -> String {
    let matches = fields
        .iter()
        .map(|f| format!("\"{}\" ILIKE $1", f))
        .collect::<Vec<_>>()
        .join(" OR ");
    format!(
        "SELECT row_to_json(t) AS row FROM (SELECT * FROM \"{}\" WHERE {} \
         ORDER BY \"created_at\" DESC, \"id\" ASC LIMIT {} OFFSET {}) t",
        table, matches, limit, offset
    )
}

/// Escape LIKE wildcards so the search term is matched literally.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

pub(crate) fn bind_param<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(u) = n.as_u64() {
                // Postgres doesn't have u64; cast down if safe
                q.bind(u as i64)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        // Arrays are expanded to one placeholder per element before binding
        Value::Array(_) => q,
        Value::Object(_) => q.bind(v.clone()), // JSONB
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn insert_sql_shape() {
        let sql = insert_sql("subjects", &fields(&[("class_id", json!(1)), ("name", json!("Math"))]));
        assert_eq!(
            sql,
            "WITH inserted AS (INSERT INTO \"subjects\" (\"class_id\", \"name\") VALUES ($1, $2) RETURNING *) \
             SELECT row_to_json(inserted) AS row FROM inserted"
        );
    }

    #[test]
    fn insert_sql_casts_uuid_strings() {
        let sql = insert_sql(
            "marks",
            &fields(&[("student_id", json!("8b0bbaa0-54b9-41b5-8f0e-3dc60e0a4bbf"))]),
        );
        assert!(sql.contains("VALUES ($1::uuid)"));
    }

    #[test]
    fn update_sql_touches_only_given_fields() {
        let sql = update_sql("subjects", &fields(&[("name", json!("Mathematics"))]));
        assert_eq!(
            sql,
            "WITH updated AS (UPDATE \"subjects\" SET \"name\" = $1, \"updated_at\" = NOW() WHERE \"id\" = $2 RETURNING *) \
             SELECT row_to_json(updated) AS row FROM updated"
        );
    }

    #[test]
    fn search_sql_ors_across_fields() {
        let sql = search_sql("students", &["first_name", "last_name"], 20, 40);
        assert!(sql.contains("\"first_name\" ILIKE $1 OR \"last_name\" ILIKE $1"));
        assert!(sql.contains("LIMIT 20 OFFSET 40"));
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_a\\b"), "50\\%\\_a\\\\b");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn system_fields_rejected() {
        let err = validate_columns(["id"].into_iter()).unwrap_err();
        assert!(matches!(err, DatabaseError::QueryError(_)));
        assert!(validate_columns(["updated_at"].into_iter()).is_err());
        assert!(validate_columns(["name", "class_id"].into_iter()).is_ok());
    }

    #[test]
    fn unsafe_columns_rejected() {
        assert!(validate_columns(["name; --"].into_iter()).is_err());
    }
}
