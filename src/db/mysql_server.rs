use mysql::prelude::Queryable;
use mysql::{Conn, Opts, OptsBuilder, Params, Row, Transaction, TxOpts, Value};

use super::{Session, SqlError, SqlRow, SqlValue};
use crate::config::DatabaseConfig;

struct MySqlSession<'conn> {
    tx: Transaction<'conn>,
    last_insert_id: i64,
}

impl Session for MySqlSession<'_> {
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, SqlError> {
        self.tx.exec_drop(sql, to_params(params)).map_err(sql_error)?;
        if let Some(id) = self.tx.last_insert_id().filter(|id| *id > 0) {
            self.last_insert_id = id as i64;
        }
        Ok(self.tx.affected_rows())
    }

    fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<SqlRow>, SqlError> {
        let rows: Vec<Row> = self.tx.exec(sql, to_params(params)).map_err(sql_error)?;
        Ok(rows.iter().map(from_row).collect())
    }

    fn last_insert_id(&self) -> i64 {
        self.last_insert_id
    }
}

/// Connection options of the portal's MySQL server.
pub(super) fn opts(config: &DatabaseConfig) -> Opts {
    OptsBuilder::new()
        .ip_or_hostname(Some(config.host.clone()))
        .tcp_port(config.port)
        .user(Some(config.username.clone()).filter(|user| !user.is_empty()))
        .pass(Some(config.password.clone()).filter(|pass| !pass.is_empty()))
        .db_name(Some(config.name.clone()))
        .into()
}

pub(super) fn session_scope<T, F>(opts: &Opts, work: F) -> Result<T, SqlError>
where
    F: FnOnce(&mut dyn Session) -> Result<T, SqlError>,
{
    let mut conn = Conn::new(opts.clone()).map_err(|err| {
        SqlError(format!(
            "failed to connect to {}:{}: {err}",
            opts.get_ip_or_hostname(),
            opts.get_tcp_port()
        ))
    })?;
    let tx = conn.start_transaction(TxOpts::default()).map_err(sql_error)?;
    let mut session = MySqlSession {
        tx,
        last_insert_id: 0,
    };
    match work(&mut session) {
        Ok(value) => {
            session.tx.commit().map_err(sql_error)?;
            Ok(value)
        }
        Err(err) => {
            let _ = session.tx.rollback();
            Err(err)
        }
    }
}

fn to_params(params: &[SqlValue]) -> Params {
    if params.is_empty() {
        return Params::Empty;
    }
    Params::Positional(params.iter().map(to_mysql).collect())
}

fn to_mysql(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::NULL,
        SqlValue::Integer(value) => Value::Int(*value),
        SqlValue::Text(text) => Value::Bytes(text.clone().into_bytes()),
    }
}

fn from_row(row: &Row) -> SqlRow {
    SqlRow::new(
        (0..row.len())
            .map(|idx| row.as_ref(idx).map_or(SqlValue::Null, from_mysql))
            .collect(),
    )
}

fn from_mysql(value: &Value) -> SqlValue {
    match value {
        Value::NULL => SqlValue::Null,
        Value::Int(value) => SqlValue::Integer(*value),
        Value::UInt(value) => i64::try_from(*value)
            .map(SqlValue::Integer)
            .unwrap_or_else(|_| SqlValue::Text(value.to_string())),
        Value::Bytes(bytes) => SqlValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        Value::Float(value) => SqlValue::Text(value.to_string()),
        Value::Double(value) => SqlValue::Text(value.to_string()),
        Value::Date(year, month, day, hour, minute, second, _) => SqlValue::Text(format!(
            "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
        )),
        Value::Time(negative, days, hours, minutes, seconds, _) => {
            let sign = if *negative { "-" } else { "" };
            let hours = u32::from(*hours) + days * 24;
            SqlValue::Text(format!("{sign}{hours:02}:{minutes:02}:{seconds:02}"))
        }
    }
}

fn sql_error(err: mysql::Error) -> SqlError {
    SqlError(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_come_from_the_portal_section() {
        let config = DatabaseConfig {
            username: "cbio_user".to_string(),
            password: "s3cr=t".to_string(),
            host: "db.internal".to_string(),
            name: "cbioportal".to_string(),
            ..DatabaseConfig::default()
        };
        let opts = opts(&config);
        assert_eq!(opts.get_ip_or_hostname(), "db.internal");
        assert_eq!(opts.get_tcp_port(), 3306);
        assert_eq!(opts.get_user(), Some("cbio_user"));
        assert_eq!(opts.get_pass(), Some("s3cr=t"));
        assert_eq!(opts.get_db_name(), Some("cbioportal"));
    }

    #[test]
    fn server_values_convert() {
        assert_eq!(from_mysql(&Value::NULL), SqlValue::Null);
        assert_eq!(from_mysql(&Value::UInt(22)), SqlValue::Integer(22));
        assert_eq!(
            from_mysql(&Value::Bytes(b"hg19".to_vec())),
            SqlValue::Text("hg19".to_string())
        );
        assert_eq!(
            from_mysql(&Value::Date(2009, 2, 27, 0, 0, 0, 0)),
            SqlValue::Text("2009-02-27 00:00:00".to_string())
        );
        assert!(matches!(to_params(&[]), Params::Empty));
    }
}
