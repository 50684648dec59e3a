use std::path::Path;
use std::time::Duration;

use rusqlite::types::Value;
use rusqlite::{Connection, Transaction, params_from_iter};

use super::{Session, SqlError, SqlRow, SqlValue};

const SCHEMA: &str = include_str!("../schema.sql");

struct SqliteSession<'conn> {
    tx: Transaction<'conn>,
}

impl Session for SqliteSession<'_> {
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, SqlError> {
        let changed = self
            .tx
            .execute(sql, params_from_iter(params.iter().map(to_sqlite)))
            .map_err(sql_error)?;
        Ok(changed as u64)
    }

    fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<SqlRow>, SqlError> {
        let mut stmt = self.tx.prepare(sql).map_err(sql_error)?;
        let width = stmt.column_count();
        let rows = stmt
            .query_map(params_from_iter(params.iter().map(to_sqlite)), |row| {
                (0..width)
                    .map(|idx| row.get::<_, Value>(idx).map(from_sqlite))
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .map(SqlRow::new)
            })
            .map_err(sql_error)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(sql_error)
    }

    fn last_insert_id(&self) -> i64 {
        self.tx.last_insert_rowid()
    }
}

pub(super) fn ensure_schema(path: &Path) -> Result<(), SqlError> {
    connect(path)?.execute_batch(SCHEMA).map_err(sql_error)
}

pub(super) fn session_scope<T, F>(path: &Path, work: F) -> Result<T, SqlError>
where
    F: FnOnce(&mut dyn Session) -> Result<T, SqlError>,
{
    let mut conn = connect(path)?;
    let tx = conn.transaction().map_err(sql_error)?;
    let mut session = SqliteSession { tx };
    match work(&mut session) {
        Ok(value) => {
            session.tx.commit().map_err(sql_error)?;
            Ok(value)
        }
        Err(err) => {
            // The original error matters more than a failed rollback.
            let _ = session.tx.rollback();
            Err(err)
        }
    }
}

fn connect(path: &Path) -> Result<Connection, SqlError> {
    let conn = Connection::open(path)
        .map_err(|err| SqlError(format!("failed to open {}: {err}", path.display())))?;
    conn.busy_timeout(Duration::from_secs(5)).map_err(sql_error)?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(sql_error)?;
    Ok(conn)
}

fn to_sqlite(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(value) => Value::Integer(*value),
        SqlValue::Text(text) => Value::Text(text.clone()),
    }
}

fn from_sqlite(value: Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(value) => SqlValue::Integer(value),
        Value::Real(value) => SqlValue::Text(value.to_string()),
        Value::Text(text) => SqlValue::Text(text),
        Value::Blob(bytes) => SqlValue::Text(String::from_utf8_lossy(&bytes).into_owned()),
    }
}

fn sql_error(err: rusqlite::Error) -> SqlError {
    SqlError(err.to_string())
}
