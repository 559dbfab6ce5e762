use std::path::PathBuf;

use log::{debug, info};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use super::{
    count_sql, create_table_sql, drop_table_sql, select_all_sql, Model, OrmError, Result,
};
use crate::traced;

/// Log target for echoed SQL.
pub const ECHO_TARGET: &str = "sql_echo";

/// Where a `sqlite://` URL points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    Memory,
    File(PathBuf),
}

impl DatabaseTarget {
    /// Parse `sqlite://`, `sqlite:///:memory:`, `sqlite:///relative.db` or
    /// `sqlite:////absolute/path.db`.
    pub fn parse(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix("sqlite://")
            .ok_or_else(|| OrmError::UnsupportedUrl(url.to_string()))?;
        if rest.is_empty() {
            return Ok(DatabaseTarget::Memory);
        }
        let path = rest
            .strip_prefix('/')
            .ok_or_else(|| OrmError::UnsupportedUrl(url.to_string()))?;
        match path {
            "" | ":memory:" => Ok(DatabaseTarget::Memory),
            path => Ok(DatabaseTarget::File(PathBuf::from(path))),
        }
    }
}

/// A database connection plus statement echoing.
pub struct Engine {
    conn: Connection,
    echo: bool,
    url: String,
}

impl Engine {
    pub fn connect(url: &str, echo: bool) -> Result<Self> {
        let conn = match DatabaseTarget::parse(url)? {
            DatabaseTarget::Memory => Connection::open_in_memory()?,
            DatabaseTarget::File(path) => Connection::open(path)?,
        };
        debug!("connected to {url}");
        Ok(Self {
            conn,
            echo,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn echo(&self) -> bool {
        self.echo
    }

    pub fn create_all<M: Model>(&self) -> Result<()> {
        self.execute(&create_table_sql::<M>(), &[])?;
        Ok(())
    }

    pub fn drop_all<M: Model>(&self) -> Result<()> {
        self.execute(&drop_table_sql::<M>(), &[])?;
        Ok(())
    }

    pub fn count<M: Model>(&self) -> Result<i64> {
        let sql = count_sql::<M>();
        self.log_statement(&sql, &[]);
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }

    /// Every row of `M`'s table in primary-key order, outside any session.
    pub fn all<M: Model>(&self) -> Result<Vec<M>> {
        self.query(&select_all_sql::<M>(), &[])
    }

    pub(crate) fn begin(&self) -> Result<()> {
        self.execute_batch("BEGIN")
    }

    pub(crate) fn commit(&self) -> Result<()> {
        self.execute_batch("COMMIT")
    }

    pub(crate) fn rollback(&self) -> Result<()> {
        self.execute_batch("ROLLBACK")
    }

    fn execute_batch(&self, sql: &str) -> Result<()> {
        self.log_statement(sql, &[]);
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    pub(crate) fn execute(&self, sql: &str, params: &[Value]) -> Result<usize> {
        traced!("Engine::execute");
        self.log_statement(sql, params);
        let mut stmt = self.conn.prepare_cached(sql)?;
        Ok(stmt.execute(params_from_iter(params.iter()))?)
    }

    pub(crate) fn query<M: Model>(&self, sql: &str, params: &[Value]) -> Result<Vec<M>> {
        traced!("Engine::query");
        self.log_statement(sql, params);
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), |row| M::from_row(row))?;
        Ok(rows.collect::<rusqlite::Result<Vec<M>>>()?)
    }

    fn log_statement(&self, sql: &str, params: &[Value]) {
        if !self.echo {
            return;
        }
        info!(target: ECHO_TARGET, "{sql}");
        if !params.is_empty() {
            let rendered = params.iter().map(render_value).collect::<Vec<_>>();
            info!(target: ECHO_TARGET, "[{}]", rendered.join(", "));
        }
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => format!("'{s}'"),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}
