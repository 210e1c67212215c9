//! Runs a stats query and collects the rows for JSON responses
use rusqlite::{types::Value, Connection, Params};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::error::Result;

/// Column names plus every row of a finished query
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<JsonValue>>,
}

impl QueryResult {
    /// Rows as objects keyed by column name
    pub fn into_records(self) -> Vec<JsonValue> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|row| {
                let mut record = Map::with_capacity(columns.len());
                for (name, value) in columns.iter().zip(row) {
                    record.insert(name.clone(), value);
                }
                JsonValue::Object(record)
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Runs `sql` and fetches all rows into memory.
pub fn run_query<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<QueryResult> {
    let mut stmt = conn.prepare(sql)?;

    let column_count = stmt.column_count();
    let columns: Vec<String> = (0..column_count)
        .map(|i| stmt.column_name(i).unwrap_or("").to_string())
        .collect();

    let rows_iter = stmt.query_map(params, |row| {
        let mut vals = Vec::with_capacity(column_count);
        for i in 0..column_count {
            let v: Value = row.get(i)?;
            vals.push(to_json(v));
        }
        Ok(vals)
    })?;

    let mut rows = Vec::new();
    for row_res in rows_iter {
        rows.push(row_res?);
    }

    Ok(QueryResult { columns, rows })
}

fn to_json(v: Value) -> JsonValue {
    match v {
        Value::Null => JsonValue::Null,
        Value::Integer(i) => JsonValue::from(i),
        Value::Real(f) => JsonValue::from(f),
        Value::Text(t) => JsonValue::String(t),
        Value::Blob(_) => JsonValue::String("<blob>".to_string()),
    }
}
