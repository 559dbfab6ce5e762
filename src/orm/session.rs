use std::collections::HashMap;

use log::{trace, warn};
use rusqlite::types::Value;

use super::{
    insert_sql, select_between_sql, select_by_pk_sql, update_sql, Engine, Model, OrmError, Result,
};
use crate::traced;

struct Tracked<M> {
    current: M,
    /// State as of the last flush; `None` until the object has been inserted.
    flushed: Option<M>,
}

/// A unit of work over one model type.
///
/// Objects loaded or added through the session are kept in an identity map
/// keyed by primary key, so each row is materialised at most once. Queries
/// autoflush pending changes first. A transaction is opened on the first
/// statement and closed by [`Session::commit`] or [`Session::rollback`];
/// dropping a session with an open transaction rolls it back.
pub struct Session<'e, M: Model> {
    engine: &'e Engine,
    identity: HashMap<i64, Tracked<M>>,
    pending: Vec<i64>,
    in_transaction: bool,
}

impl<'e, M: Model> Session<'e, M> {
    pub fn new(engine: &'e Engine) -> Self {
        Self {
            engine,
            identity: HashMap::new(),
            pending: Vec::new(),
            in_transaction: false,
        }
    }

    fn begin(&mut self) -> Result<()> {
        if !self.in_transaction {
            self.engine.begin()?;
            self.in_transaction = true;
        }
        Ok(())
    }

    /// Fetch by primary key, consulting the identity map before the database.
    pub fn get(&mut self, id: i64) -> Result<Option<&mut M>> {
        traced!("Session::get");
        if !self.identity.contains_key(&id) {
            self.flush()?;
            self.begin()?;
            let found = self
                .engine
                .query::<M>(&select_by_pk_sql::<M>(), &[Value::Integer(id)])?;
            match found.into_iter().next() {
                Some(row) => {
                    self.track_loaded(row);
                }
                None => return Ok(None),
            }
        }
        Ok(self.identity.get_mut(&id).map(|t| &mut t.current))
    }

    /// Load every row with `lo <= id <= hi` into the identity map and return
    /// their ids. Objects already in the map keep their in-session state.
    pub fn select_between(&mut self, lo: i64, hi: i64) -> Result<Vec<i64>> {
        traced!("Session::select_between");
        self.flush()?;
        self.begin()?;
        let rows = self.engine.query::<M>(
            &select_between_sql::<M>(),
            &[Value::Integer(lo), Value::Integer(hi)],
        )?;
        Ok(rows.into_iter().map(|row| self.track_loaded(row)).collect())
    }

    /// Identity-map lookup only; never touches the database.
    pub fn get_loaded_mut(&mut self, id: i64) -> Option<&mut M> {
        self.identity.get_mut(&id).map(|t| &mut t.current)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.identity.contains_key(&id)
    }

    fn track_loaded(&mut self, row: M) -> i64 {
        let id = row.primary_key();
        self.identity.entry(id).or_insert_with(|| Tracked {
            flushed: Some(row.clone()),
            current: row,
        });
        id
    }

    /// Schedule `obj` for insertion on the next flush.
    pub fn add(&mut self, obj: M) -> Result<()> {
        traced!("Session::add");
        let id = obj.primary_key();
        if self.identity.contains_key(&id) {
            return Err(OrmError::DuplicateIdentity { table: M::TABLE, id });
        }
        self.identity.insert(
            id,
            Tracked {
                current: obj,
                flushed: None,
            },
        );
        self.pending.push(id);
        Ok(())
    }

    /// Insert `rows` immediately, bypassing the identity map.
    pub fn bulk_insert_mappings(&mut self, rows: &[M]) -> Result<()> {
        traced!("Session::bulk_insert_mappings");
        if rows.is_empty() {
            return Ok(());
        }
        self.begin()?;
        let sql = insert_sql::<M>();
        for row in rows {
            self.engine.execute(&sql, &row.values())?;
        }
        Ok(())
    }

    /// Copy `obj`'s state onto the persistent instance with the same
    /// identity, loading it if needed, or add it as new when none exists.
    pub fn merge(&mut self, obj: M) -> Result<()> {
        traced!("Session::merge");
        let id = obj.primary_key();
        self.get(id)?;
        match self.identity.get_mut(&id) {
            Some(tracked) => tracked.current = obj,
            None => self.add(obj)?,
        }
        Ok(())
    }

    /// Write pending inserts in add order, then dirty objects in key order.
    pub fn flush(&mut self) -> Result<()> {
        traced!("Session::flush");
        let dirty: Vec<i64> = {
            let mut ids: Vec<i64> = self
                .identity
                .iter()
                .filter(|(_, t)| matches!(&t.flushed, Some(f) if *f != t.current))
                .map(|(id, _)| *id)
                .collect();
            ids.sort_unstable();
            ids
        };
        if self.pending.is_empty() && dirty.is_empty() {
            return Ok(());
        }
        trace!(
            "flushing {} inserts and {} updates on {}",
            self.pending.len(),
            dirty.len(),
            M::TABLE
        );
        self.begin()?;

        // An insert that fails stays pending along with everything after it,
        // so a later flush or commit reports the failure again.
        let insert = insert_sql::<M>();
        let pending = std::mem::take(&mut self.pending);
        for (done, id) in pending.iter().enumerate() {
            if let Some(tracked) = self.identity.get_mut(id) {
                if let Err(err) = self.engine.execute(&insert, &tracked.current.values()) {
                    self.pending = pending[done..].to_vec();
                    return Err(err);
                }
                tracked.flushed = Some(tracked.current.clone());
            }
        }

        let update = update_sql::<M>();
        for id in dirty {
            if let Some(tracked) = self.identity.get_mut(&id) {
                self.engine.execute(&update, &tracked.current.values())?;
                tracked.flushed = Some(tracked.current.clone());
            }
        }
        Ok(())
    }

    /// Flush, commit, and expire the identity map.
    pub fn commit(&mut self) -> Result<()> {
        traced!("Session::commit");
        self.flush()?;
        if self.in_transaction {
            self.engine.commit()?;
            self.in_transaction = false;
        }
        self.identity.clear();
        Ok(())
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.identity.clear();
        self.pending.clear();
        if self.in_transaction {
            self.in_transaction = false;
            self.engine.rollback()?;
        }
        Ok(())
    }
}

impl<M: Model> Drop for Session<'_, M> {
    fn drop(&mut self) {
        if self.in_transaction {
            if let Err(err) = self.rollback() {
                warn!("rollback on session drop failed: {err}");
            }
        }
    }
}
