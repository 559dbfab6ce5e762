//! Different ways to UPSERT (INSERT ... ON CONFLICT UPDATE) a large number
//! of rows in bulk through the session layer.
//!
//! Setup seeds every even id below `num`; each test then upserts ids
//! `0..num`, so half the operations update and half insert.

use rusqlite::types::Value;
use rusqlite::Row;

use crate::error::{BoxError, HarnessError};
use crate::orm::{Column, Engine, Model, Session};
use crate::registry::{SetupArgs, Suite};
use crate::runner::LoadedSuite;
use crate::traced;

pub const SUITE_NAME: &str = "bulk_upserts";
pub const DEFAULT_NUM: u64 = 100_000;

const SEED_CHUNK: u64 = 10_000;
const BATCH: u64 = 1_000;

#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub description: String,
}

impl Customer {
    fn seeded(id: i64) -> Self {
        Self {
            id,
            name: format!("customer name {id}"),
            description: format!("customer description {id}"),
        }
    }

    fn new_row(id: i64) -> Self {
        Self {
            id,
            name: format!("customer name {id}"),
            description: format!("customer description {id} new"),
        }
    }
}

impl Model for Customer {
    const TABLE: &'static str = "customer";
    const COLUMNS: &'static [Column] = &[
        Column::primary_key("id", "INTEGER"),
        Column::new("name", "VARCHAR(255)"),
        Column::new("description", "VARCHAR(255)"),
    ];

    fn primary_key(&self) -> i64 {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.id),
            Value::Text(self.name.clone()),
            Value::Text(self.description.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
        })
    }
}

/// State shared between the setup hook and the tests.
#[derive(Default)]
pub struct UpsertContext {
    engine: Option<Engine>,
}

impl UpsertContext {
    pub fn engine(&self) -> Result<&Engine, BoxError> {
        self.engine
            .as_ref()
            .ok_or_else(|| "database engine not initialised; setup_database has not run".into())
    }
}

pub fn suite() -> Result<Suite<UpsertContext>, HarnessError> {
    let mut suite = Suite::new();
    suite.init(SUITE_NAME, DEFAULT_NUM);
    suite.register_setup("setup_database", setup_database)?;
    suite.register_test(
        "test_customer_individual_orm_select",
        "UPSERT statements via individual checks on whether objects exist
         and add new objects individually",
        test_customer_individual_orm_select,
    )?;
    suite.register_test(
        "test_customer_batched_orm_select",
        "UPSERT statements via batched checks on whether objects exist
         and add new objects individually",
        test_customer_batched_orm_select,
    )?;
    suite.register_test(
        "test_customer_batched_orm_select_add_all",
        "UPSERT statements via batched checks on whether objects exist
         and add new objects in bulk",
        test_customer_batched_orm_select_add_all,
    )?;
    suite.register_test(
        "test_customer_batched_orm_select_add_all_no_flush",
        "UPSERT statements via batched checks on whether objects exist
         and add new objects in bulk - without flushing",
        test_customer_batched_orm_select_add_all_no_flush,
    )?;
    suite.register_test(
        "test_customer_batched_orm_merge_result",
        "UPSERT statements using batched merge_results",
        test_customer_batched_orm_merge_result,
    )?;
    Ok(suite)
}

pub fn load() -> Result<Box<dyn LoadedSuite>, HarnessError> {
    Ok(Box::new(suite()?))
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

/// Recreate the customer table and insert every even id below `num`.
pub fn setup_database(ctx: &mut UpsertContext, args: &SetupArgs<'_>) -> Result<(), BoxError> {
    ctx.engine = None;
    let engine = Engine::connect(args.dburl, args.echo)?;
    engine.drop_all::<Customer>()?;
    engine.create_all::<Customer>()?;
    seed_customers(&engine, args.num)?;
    ctx.engine = Some(engine);
    Ok(())
}

/// Insert every even id below `num` in chunks of 10,000.
///
/// The last chunk stops at `num` rather than at the next multiple of the
/// chunk size, so small runs seed only the even ids of `0..num`.
pub fn seed_customers(engine: &Engine, num: u64) -> Result<(), BoxError> {
    let num = id_limit(num)?;
    let mut session = Session::<Customer>::new(engine);
    for chunk in (0..num).step_by(SEED_CHUNK as usize) {
        let end = chunk.saturating_add(SEED_CHUNK as i64).min(num);
        let rows: Vec<Customer> = (chunk..end).step_by(2).map(Customer::seeded).collect();
        session.bulk_insert_mappings(&rows)?;
    }
    session.commit()?;
    Ok(())
}

/// `n` as an exclusive upper bound on customer ids.
fn id_limit(n: u64) -> Result<i64, BoxError> {
    i64::try_from(n).map_err(|_| format!("num {n} exceeds the largest customer id").into())
}

/// Start of each batch below `n` paired with its exclusive end.
fn batches(n: u64) -> Result<impl Iterator<Item = (i64, i64)>, BoxError> {
    let n = id_limit(n)?;
    Ok((0..n)
        .step_by(BATCH as usize)
        .map(move |chunk| (chunk, chunk.saturating_add(BATCH as i64).min(n))))
}

fn mark_updated(customer: &mut Customer) {
    customer.description.push_str("updated");
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

pub fn test_customer_individual_orm_select(ctx: &mut UpsertContext, n: u64) -> Result<(), BoxError> {
    let mut session = Session::<Customer>::new(ctx.engine()?);
    for i in 0..id_limit(n)? {
        match session.get(i)? {
            Some(customer) => mark_updated(customer),
            None => session.add(Customer::new_row(i))?,
        }
        session.flush()?;
    }
    session.commit()?;
    Ok(())
}

pub fn test_customer_batched_orm_select(ctx: &mut UpsertContext, n: u64) -> Result<(), BoxError> {
    let mut session = Session::<Customer>::new(ctx.engine()?);
    for (start, end) in batches(n)? {
        session.select_between(start, start.saturating_add(BATCH as i64))?;
        for i in start..end {
            match session.get_loaded_mut(i) {
                Some(customer) => mark_updated(customer),
                None => session.add(Customer::new_row(i))?,
            }
        }
        session.flush()?;
    }
    session.commit()?;
    Ok(())
}

pub fn test_customer_batched_orm_select_add_all(
    ctx: &mut UpsertContext,
    n: u64,
) -> Result<(), BoxError> {
    let mut session = Session::<Customer>::new(ctx.engine()?);
    for (start, end) in batches(n)? {
        upsert_batch_bulk(&mut session, start, end)?;
        session.flush()?;
    }
    session.commit()?;
    Ok(())
}

pub fn test_customer_batched_orm_select_add_all_no_flush(
    ctx: &mut UpsertContext,
    n: u64,
) -> Result<(), BoxError> {
    let mut session = Session::<Customer>::new(ctx.engine()?);
    for (start, end) in batches(n)? {
        upsert_batch_bulk(&mut session, start, end)?;
    }
    session.commit()?;
    Ok(())
}

/// Update loaded rows in place and bulk insert the rest of `start..end`.
fn upsert_batch_bulk(session: &mut Session<'_, Customer>, start: i64, end: i64) -> Result<(), BoxError> {
    traced!("upsert_batch_bulk");
    session.select_between(start, start.saturating_add(BATCH as i64))?;
    let mut to_add = Vec::new();
    for i in start..end {
        match session.get_loaded_mut(i) {
            Some(customer) => mark_updated(customer),
            None => to_add.push(Customer::new_row(i)),
        }
    }
    session.bulk_insert_mappings(&to_add)?;
    Ok(())
}

pub fn test_customer_batched_orm_merge_result(
    ctx: &mut UpsertContext,
    n: u64,
) -> Result<(), BoxError> {
    let mut session = Session::<Customer>::new(ctx.engine()?);
    for (start, end) in batches(n)? {
        session.select_between(start, start.saturating_add(BATCH as i64))?;
        for i in start..end {
            session.merge(Customer::new_row(i))?;
        }
        session.flush()?;
    }
    session.commit()?;
    Ok(())
}
