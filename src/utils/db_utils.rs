use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};
use sqlx::MySqlPool;

use crate::error::ApiError;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, PartialEq)]
pub enum SqlValue {
    String(String),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Null,
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug, PartialEq)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Columns a partial update may touch, and whether each one accepts NULL.
pub struct UpdatableColumns<'a> {
    pub table: &'a str,
    pub id_column: &'a str,
    pub columns: &'a [(&'a str, bool)],
}

fn to_sql_value(column: &str, nullable: bool, value: &Value) -> Result<SqlValue, ApiError> {
    match value {
        Value::String(s) => {
            if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                Ok(SqlValue::Date(d))
            } else if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
                Ok(SqlValue::DateTime(dt))
            } else {
                Ok(SqlValue::String(s.trim().to_string()))
            }
        }
        Value::Number(n) => n
            .as_i64()
            .map(SqlValue::I64)
            .or_else(|| n.as_u64().map(SqlValue::U64))
            .or_else(|| n.as_f64().map(SqlValue::F64))
            .ok_or_else(|| ApiError::bad_request(format!("Unsupported number for {column}"))),
        Value::Bool(b) => Ok(SqlValue::Bool(*b)),
        Value::Null if nullable => Ok(SqlValue::Null),
        Value::Null => Err(ApiError::bad_request(format!("{column} cannot be null"))),
        _ => Err(ApiError::bad_request(format!(
            "Unsupported JSON value type for {column}"
        ))),
    }
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
///
/// Only keys listed in `spec.columns` are accepted; column names are never
/// taken from the payload verbatim. `extra` adds server-side assignments
/// (e.g. `updated_at = NOW()`) that are not bound.
pub fn build_update_sql(
    spec: &UpdatableColumns,
    payload: &Value,
    id_value: u64,
    extra: &[&str],
) -> Result<SqlUpdate, ApiError> {
    let obj: &Map<String, Value> = payload
        .as_object()
        .ok_or_else(|| ApiError::bad_request("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(ApiError::bad_request("No fields provided for update"));
    }

    let mut assignments = Vec::with_capacity(obj.len() + extra.len());
    let mut values = Vec::with_capacity(obj.len() + 1);

    for (key, value) in obj {
        let (column, nullable) = spec
            .columns
            .iter()
            .find(|(name, _)| *name == key.as_str())
            .ok_or_else(|| ApiError::bad_request(format!("Field {key} cannot be updated")))?;

        assignments.push(format!("{} = ?", column));
        values.push(to_sql_value(column, *nullable, value)?);
    }
    assignments.extend(extra.iter().map(|s| s.to_string()));

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        spec.table,
        assignments.join(", "),
        spec.id_column
    );

    // WHERE id = ?
    values.push(SqlValue::U64(id_value));

    Ok(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::DateTime(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PROFILE: UpdatableColumns = UpdatableColumns {
        table: "users",
        id_column: "id",
        columns: &[("name", false), ("phone", true)],
    };

    #[test]
    fn builds_update_for_known_columns() {
        let update = build_update_sql(&PROFILE, &json!({"phone": null}), 7, &[]).unwrap();
        assert_eq!(update.sql, "UPDATE users SET phone = ? WHERE id = ?");
        assert_eq!(update.values, vec![SqlValue::Null, SqlValue::U64(7)]);
    }

    #[test]
    fn appends_server_side_assignments() {
        let update =
            build_update_sql(&PROFILE, &json!({"name": " Asha "}), 7, &["updated_at = NOW()"])
                .unwrap();
        assert_eq!(
            update.sql,
            "UPDATE users SET name = ?, updated_at = NOW() WHERE id = ?"
        );
        assert_eq!(update.values[0], SqlValue::String("Asha".into()));
    }

    #[test]
    fn rejects_unknown_columns() {
        let err = build_update_sql(&PROFILE, &json!({"role_id": 1}), 7, &[]).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn rejects_null_for_required_column() {
        assert!(build_update_sql(&PROFILE, &json!({"name": null}), 7, &[]).is_err());
    }

    #[test]
    fn rejects_empty_and_non_object_payloads() {
        assert!(build_update_sql(&PROFILE, &json!({}), 7, &[]).is_err());
        assert!(build_update_sql(&PROFILE, &json!(["name"]), 7, &[]).is_err());
    }
}
