//! A small session / unit-of-work layer over SQLite.
//!
//! [`Engine`] owns the connection and generates DDL. [`Session`] tracks the
//! objects it has loaded or added in an identity map and turns their
//! changes into INSERT and UPDATE statements on flush. Models describe their
//! table through [`Model`]; all SQL is generated from the column list.

mod engine;
mod session;

pub use engine::{DatabaseTarget, Engine, ECHO_TARGET};
pub use session::Session;

use rusqlite::types::Value;
use rusqlite::Row;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrmError {
    #[error("unsupported database URL `{0}`; expected sqlite://<path>")]
    UnsupportedUrl(String),

    #[error("an object with identity {table}#{id} is already present in this session")]
    DuplicateIdentity { table: &'static str, id: i64 },

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, OrmError>;

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub primary_key: bool,
}

impl Column {
    pub const fn primary_key(name: &'static str, sql_type: &'static str) -> Self {
        Self {
            name,
            sql_type,
            primary_key: true,
        }
    }

    pub const fn new(name: &'static str, sql_type: &'static str) -> Self {
        Self {
            name,
            sql_type,
            primary_key: false,
        }
    }
}

/// A row type mapped to one table with a single integer primary key.
pub trait Model: Clone + PartialEq + std::fmt::Debug {
    const TABLE: &'static str;
    /// Columns in the order used by [`Model::values`] and [`Model::from_row`].
    const COLUMNS: &'static [Column];

    fn primary_key(&self) -> i64;

    fn values(&self) -> Vec<Value>;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

// ---------------------------------------------------------------------------
// SQL generation
// ---------------------------------------------------------------------------

fn pk_column<M: Model>() -> &'static str {
    M::COLUMNS
        .iter()
        .find(|c| c.primary_key)
        .map(|c| c.name)
        .unwrap_or("id")
}

fn column_list<M: Model>() -> String {
    M::COLUMNS
        .iter()
        .map(|c| c.name)
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn create_table_sql<M: Model>() -> String {
    let columns = M::COLUMNS
        .iter()
        .map(|c| {
            if c.primary_key {
                format!("{} {} NOT NULL PRIMARY KEY", c.name, c.sql_type)
            } else {
                format!("{} {}", c.name, c.sql_type)
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({})", M::TABLE, columns)
}

pub(crate) fn drop_table_sql<M: Model>() -> String {
    format!("DROP TABLE IF EXISTS {}", M::TABLE)
}

pub(crate) fn select_all_sql<M: Model>() -> String {
    format!(
        "SELECT {} FROM {} ORDER BY {}",
        column_list::<M>(),
        M::TABLE,
        pk_column::<M>()
    )
}

pub(crate) fn select_by_pk_sql<M: Model>() -> String {
    format!(
        "SELECT {} FROM {} WHERE {} = ?1",
        column_list::<M>(),
        M::TABLE,
        pk_column::<M>()
    )
}

pub(crate) fn select_between_sql<M: Model>() -> String {
    let pk = pk_column::<M>();
    format!(
        "SELECT {} FROM {} WHERE {} BETWEEN ?1 AND ?2 ORDER BY {}",
        column_list::<M>(),
        M::TABLE,
        pk,
        pk
    )
}

pub(crate) fn insert_sql<M: Model>() -> String {
    let placeholders = (1..=M::COLUMNS.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        M::TABLE,
        column_list::<M>(),
        placeholders
    )
}

/// UPDATE binding every column by position; the primary key goes in WHERE.
pub(crate) fn update_sql<M: Model>() -> String {
    let mut assignments = Vec::new();
    let mut pk_index = 1;
    for (i, c) in M::COLUMNS.iter().enumerate() {
        if c.primary_key {
            pk_index = i + 1;
        } else {
            assignments.push(format!("{} = ?{}", c.name, i + 1));
        }
    }
    format!(
        "UPDATE {} SET {} WHERE {} = ?{}",
        M::TABLE,
        assignments.join(", "),
        pk_column::<M>(),
        pk_index
    )
}

pub(crate) fn count_sql<M: Model>() -> String {
    format!("SELECT COUNT(*) FROM {}", M::TABLE)
}
