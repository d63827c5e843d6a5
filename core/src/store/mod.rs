//! SQLite run record.
//!
//! RULE: Only the store talks to the database.
//! The engine calls store methods; it never executes SQL directly.
//! Append-only: nothing here reads state back into a running shop.

use crate::{error::SimResult, event::EventLogEntry, types::Tick};
use rusqlite::{params, Connection};

mod daily_stats;

pub struct SimStore {
    conn: Connection,
}

impl SimStore {
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open(path)?;
        // WAL only matters for real files; ignore the result.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_daily_stats.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, seed: u64, version: &str) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO run (run_id, seed, version, started_at) VALUES (?1, ?2, ?3, ?4)",
            params![run_id, seed as i64, version, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (run_id, tick, source, event_type, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.run_id,
                entry.tick as i64,
                entry.source,
                entry.event_type,
                entry.payload,
            ],
        )?;
        Ok(())
    }

    pub fn events_for_tick(&self, run_id: &str, tick: Tick) -> SimResult<Vec<EventLogEntry>> {
        self.query_events(
            "SELECT id, run_id, tick, source, event_type, payload
             FROM event_log WHERE run_id = ?1 AND tick = ?2
             ORDER BY id ASC",
            params![run_id, tick as i64],
        )
    }

    /// Whole log for a run, in append order.
    pub fn events_for_run(&self, run_id: &str) -> SimResult<Vec<EventLogEntry>> {
        self.query_events(
            "SELECT id, run_id, tick, source, event_type, payload
             FROM event_log WHERE run_id = ?1
             ORDER BY id ASC",
            params![run_id],
        )
    }

    pub fn event_count(&self, run_id: &str, event_type: &str) -> SimResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE run_id = ?1 AND event_type = ?2",
            params![run_id, event_type],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn query_events(
        &self,
        sql:  &str,
        args: impl rusqlite::Params,
    ) -> SimResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(sql)?;
        let entries = stmt
            .query_map(args, |row| {
                Ok(EventLogEntry {
                    id:         Some(row.get(0)?),
                    run_id:     row.get(1)?,
                    tick:       row.get::<_, i64>(2)? as u64,
                    source:     row.get(3)?,
                    event_type: row.get(4)?,
                    payload:    row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SimStore {
        let store = SimStore::in_memory().unwrap();
        store.migrate().unwrap();
        store.insert_run("run-1", 42, "test").unwrap();
        store
    }

    fn entry(tick: Tick, event_type: &str) -> EventLogEntry {
        EventLogEntry {
            id: None,
            run_id: "run-1".into(),
            tick,
            source: "engine".into(),
            event_type: event_type.into(),
            payload: "{}".into(),
        }
    }

    #[test]
    fn events_come_back_in_append_order() {
        let store = store();
        store.append_event(&entry(1, "shop_opened")).unwrap();
        store.append_event(&entry(2, "customer_arrived")).unwrap();
        store.append_event(&entry(2, "customer_feedback")).unwrap();

        let tick2: Vec<String> = store
            .events_for_tick("run-1", 2)
            .unwrap()
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(tick2, vec!["customer_arrived", "customer_feedback"]);
        assert_eq!(store.events_for_run("run-1").unwrap().len(), 3);
        assert_eq!(store.event_count("run-1", "shop_opened").unwrap(), 1);
    }

    #[test]
    fn events_require_a_known_run() {
        let store = store();
        let mut orphan = entry(1, "shop_opened");
        orphan.run_id = "missing".into();
        assert!(store.append_event(&orphan).is_err());
    }
}
