use std::fmt;
use std::marker::PhantomData;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

use crate::config::{DatabaseConfig, DatabaseEngine};
use crate::domain::ChromSize;
use crate::error::CbioError;

mod mysql_server;
mod sqlite;

/// Engine-neutral SQL value. Text, integers and NULL cover every portal
/// column this crate touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

macro_rules! sql_params {
    ($($value:expr),* $(,)?) => {
        vec![$($crate::db::SqlValue::from($value)),*]
    };
}
pub(crate) use sql_params;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct SqlError(pub String);

pub trait FromSqlValue: Sized {
    fn from_sql(value: &SqlValue) -> Result<Self, SqlError>;
}

impl FromSqlValue for i64 {
    fn from_sql(value: &SqlValue) -> Result<Self, SqlError> {
        match value {
            SqlValue::Integer(value) => Ok(*value),
            SqlValue::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| SqlError(format!("expected an integer, found {text:?}"))),
            SqlValue::Null => Err(SqlError("unexpected NULL".to_string())),
        }
    }
}

impl FromSqlValue for String {
    fn from_sql(value: &SqlValue) -> Result<Self, SqlError> {
        match value {
            SqlValue::Text(text) => Ok(text.clone()),
            SqlValue::Integer(value) => Ok(value.to_string()),
            SqlValue::Null => Err(SqlError("unexpected NULL".to_string())),
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql(value: &SqlValue) -> Result<Self, SqlError> {
        match value {
            SqlValue::Null => Ok(None),
            other => T::from_sql(other).map(Some),
        }
    }
}

/// One result row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlRow(Vec<SqlValue>);

impl SqlRow {
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self(values)
    }

    pub fn get<T: FromSqlValue>(&self, idx: usize) -> Result<T, SqlError> {
        let value = self
            .0
            .get(idx)
            .ok_or_else(|| SqlError(format!("no column {idx} in result row")))?;
        T::from_sql(value).map_err(|err| SqlError(format!("column {idx}: {err}")))
    }
}

/// An open transaction. Statements use positional `?` placeholders.
pub trait Session {
    /// Returns the number of affected rows.
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, SqlError>;
    fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<SqlRow>, SqlError>;
    /// Id generated by the last insert of this session.
    fn last_insert_id(&self) -> i64;
}

/// A record kind stored in one portal table.
pub trait Entity: Sized {
    type Key: fmt::Display;

    /// Human readable record kind used in error messages.
    const KIND: &'static str;
    const TABLE: &'static str;
    /// Columns read by `from_row`, in order.
    const COLUMNS: &'static [&'static str];
    const KEY_COLUMNS: &'static [&'static str];

    fn key_values(key: &Self::Key) -> Vec<SqlValue>;
    fn from_row(row: &SqlRow) -> Result<Self, SqlError>;
    /// Domain error for a failed operation on `key`.
    fn error(key: &Self::Key, message: String) -> CbioError;
}

pub trait Insertable: Entity {
    type Draft;

    fn insert(session: &mut dyn Session, draft: &Self::Draft) -> Result<Self::Key, SqlError>;
    fn draft_error(draft: &Self::Draft, message: String) -> CbioError;
}

pub trait Updatable: Entity {
    fn key(&self) -> Self::Key;
    /// Returns the number of rows changed.
    fn update(session: &mut dyn Session, record: &Self) -> Result<u64, SqlError>;
}

#[derive(Clone)]
enum Backend {
    MySql(mysql::Opts),
    Sqlite(PathBuf),
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::MySql(opts) => f
                .debug_struct("MySql")
                .field("host", &opts.get_ip_or_hostname())
                .field("port", &opts.get_tcp_port())
                .field("database", &opts.get_db_name())
                .finish(),
            Backend::Sqlite(path) => f.debug_tuple("Sqlite").field(path).finish(),
        }
    }
}

/// Handle on the portal database. Every unit of work opens its own
/// connection and transaction through [`Database::session_scope`].
#[derive(Debug, Clone)]
pub struct Database {
    backend: Backend,
}

impl Database {
    /// Connects to the portal's MySQL server, or to a local SQLite file when
    /// `cbioportal_db.engine = sqlite`.
    pub fn open(config: &DatabaseConfig) -> Result<Self, CbioError> {
        if config.name.trim().is_empty() {
            return Err(CbioError::ConfigParse(
                "cbioportal_db.name must not be empty".to_string(),
            ));
        }
        match config.engine {
            DatabaseEngine::MySql => {
                debug!(
                    host = %config.host,
                    port = config.port,
                    user = %config.username,
                    database = %config.name,
                    "using portal database"
                );
                Ok(Self {
                    backend: Backend::MySql(mysql_server::opts(config)),
                })
            }
            DatabaseEngine::Sqlite => {
                let db = Self::at(&config.name);
                db.ensure_schema()?;
                Ok(db)
            }
        }
    }

    /// A SQLite database file.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: Backend::Sqlite(path.into()),
        }
    }

    /// Creates the portal tables missing from a SQLite file. A MySQL schema
    /// belongs to the portal and is never touched.
    pub fn ensure_schema(&self) -> Result<(), CbioError> {
        match &self.backend {
            Backend::Sqlite(path) => {
                sqlite::ensure_schema(path).map_err(|err| CbioError::Database(err.to_string()))
            }
            Backend::MySql(_) => {
                debug!("schema is owned by the portal, leaving it as is");
                Ok(())
            }
        }
    }

    /// Runs `work` inside one transaction: commit on `Ok`, roll back on
    /// `Err`. The connection is closed on every path.
    pub fn session_scope<T, F>(&self, work: F) -> Result<T, SqlError>
    where
        F: FnOnce(&mut dyn Session) -> Result<T, SqlError>,
    {
        match &self.backend {
            Backend::MySql(opts) => mysql_server::session_scope(opts, work),
            Backend::Sqlite(path) => sqlite::session_scope(path, work),
        }
    }

    pub fn repository<E: Entity>(&self) -> Repository<'_, E> {
        Repository {
            db: self,
            _entity: PhantomData,
        }
    }

    /// All chromosome sizes of a reference genome ordered by chromosome id.
    pub fn chrom_sizes(&self, reference_genome_id: i64) -> Result<Vec<ChromSize>, CbioError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE reference_genome_id = ? ORDER BY chrom_id",
            ChromSize::COLUMNS.join(", "),
            ChromSize::TABLE
        );
        self.session_scope(|session| {
            session
                .query(&sql, &sql_params![reference_genome_id])?
                .iter()
                .map(ChromSize::from_row)
                .collect()
        })
        .map_err(|err| CbioError::ReferenceGenome {
            message: format!("failed to read chromosome sizes: {err}"),
            reference_genome_id,
        })
    }
}

/// Generic CRUD over one record kind.
pub struct Repository<'db, E> {
    db: &'db Database,
    _entity: PhantomData<E>,
}

impl<E: Entity> Repository<'_, E> {
    pub fn exists(&self, key: &E::Key) -> Result<bool, CbioError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {}",
            E::TABLE,
            key_filter(E::KEY_COLUMNS)
        );
        self.db
            .session_scope(|session| {
                let rows = session.query(&sql, &E::key_values(key))?;
                match rows.first() {
                    Some(row) => row.get::<i64>(0),
                    None => Ok(0),
                }
            })
            .map(|count| count > 0)
            .map_err(|err| E::error(key, format!("existence check failed: {err}")))
    }

    /// Fetches exactly one record. Zero or several matches are errors.
    pub fn get(&self, key: &E::Key) -> Result<E, CbioError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} LIMIT 2",
            E::COLUMNS.join(", "),
            E::TABLE,
            key_filter(E::KEY_COLUMNS)
        );
        let mut records = self
            .db
            .session_scope(|session| {
                session
                    .query(&sql, &E::key_values(key))?
                    .iter()
                    .map(E::from_row)
                    .collect::<Result<Vec<E>, SqlError>>()
            })
            .map_err(|err| E::error(key, format!("lookup failed: {err}")))?;

        match records.len() {
            0 => Err(CbioError::RecordNotFound {
                kind: E::KIND,
                key: key.to_string(),
            }),
            1 => Ok(records.remove(0)),
            _ => Err(CbioError::DuplicateRecords {
                kind: E::KIND,
                key: key.to_string(),
            }),
        }
    }
}

impl<E: Insertable> Repository<'_, E> {
    pub fn add(&self, draft: &E::Draft) -> Result<E::Key, CbioError> {
        self.db
            .session_scope(|session| E::insert(session, draft))
            .map_err(|err| E::draft_error(draft, format!("failed to add record: {err}")))
    }
}

impl<E: Updatable> Repository<'_, E> {
    pub fn update(&self, record: &E) -> Result<(), CbioError> {
        let key = record.key();
        let changed = self
            .db
            .session_scope(|session| E::update(session, record))
            .map_err(|err| E::error(&key, format!("failed to update record: {err}")))?;
        if changed == 0 {
            return Err(CbioError::RecordNotFound {
                kind: E::KIND,
                key: key.to_string(),
            });
        }
        Ok(())
    }
}

fn key_filter(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|column| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(" AND ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_filter_uses_positional_placeholders() {
        assert_eq!(key_filter(&["A"]), "A = ?");
        assert_eq!(key_filter(&["A", "B"]), "A = ? AND B = ?");
    }

    #[test]
    fn row_values_convert() {
        let row = SqlRow::new(sql_params![7157_i64, "TP53", None::<String>, "19149"]);
        assert_eq!(row.get::<i64>(0).unwrap(), 7157);
        assert_eq!(row.get::<String>(1).unwrap(), "TP53");
        assert_eq!(row.get::<Option<String>>(2).unwrap(), None);
        assert_eq!(row.get::<Option<i64>>(3).unwrap(), Some(19149));
        assert!(row.get::<i64>(2).is_err());
        assert!(row.get::<String>(9).is_err());
    }

    #[test]
    fn portal_server_schema_is_left_alone() {
        let config = DatabaseConfig {
            host: "db.internal".to_string(),
            name: "cbioportal".to_string(),
            ..DatabaseConfig::default()
        };
        let db = Database::open(&config).unwrap();
        assert!(matches!(db.backend, Backend::MySql(_)));
        db.ensure_schema().unwrap();
    }

    #[test]
    fn sqlite_engine_creates_the_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portal.db");
        let config = DatabaseConfig {
            engine: DatabaseEngine::Sqlite,
            name: path.to_string_lossy().to_string(),
            ..DatabaseConfig::default()
        };
        let db = Database::open(&config).unwrap();
        assert!(db.chrom_sizes(1).unwrap().is_empty());
    }

    #[test]
    fn failed_work_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::at(dir.path().join("portal.db"));
        db.ensure_schema().unwrap();

        let result: Result<(), SqlError> = db.session_scope(|session| {
            session.execute(
                "INSERT INTO genetic_entity (ENTITY_TYPE) VALUES (?)",
                &sql_params!["GENE"],
            )?;
            Err(SqlError("abort".to_string()))
        });
        assert!(result.is_err());

        let count: i64 = db
            .session_scope(|session| {
                session.query("SELECT COUNT(*) FROM genetic_entity", &[])?[0].get(0)
            })
            .unwrap();
        assert_eq!(count, 0);
    }
}
