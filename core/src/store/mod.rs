//! SQLite persistence for the planning runner.
//!
//! RULE: Only the store talks to the database. The engine never calls it;
//! the runner persists feed snapshots and finished runs around an engine call.

mod feed_cache;
mod plan_run;

pub use plan_run::{new_run_id, PlanRunSummary};

use crate::error::EngineResult;
use rusqlite::Connection;

pub struct PlanStore {
    conn: Connection,
}

impl PlanStore {
    pub fn open(path: &str) -> EngineResult<Self> {
        let conn = Connection::open(path)?;
        // WAL only matters for real files; :memory: ignores it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> EngineResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> EngineResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_plan_store.sql"))?;
        Ok(())
    }
}
