//! Store methods for frozen trading days.

use crate::{error::SimResult, stats::DailyStats};
use rusqlite::params;

use super::SimStore;

impl SimStore {
    pub fn insert_daily_stats(&self, run_id: &str, stats: &DailyStats) -> SimResult<()> {
        let json = serde_json::to_string(stats)?;
        self.conn.execute(
            "INSERT INTO daily_stats
             (run_id, day_number, customers, revenue, expenses, profit,
              satisfaction, reputation, stats_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                run_id,
                stats.day_number,
                stats.customer_count,
                stats.revenue,
                stats.expenses,
                stats.profit,
                stats.satisfaction,
                stats.reputation,
                json,
            ],
        )?;
        Ok(())
    }

    /// All frozen days for a run, oldest first.
    pub fn daily_stats_for_run(&self, run_id: &str) -> SimResult<Vec<DailyStats>> {
        let mut stmt = self.conn.prepare(
            "SELECT stats_json FROM daily_stats WHERE run_id = ?1 ORDER BY day_number ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        let mut days = Vec::with_capacity(rows.len());
        for json in rows {
            days.push(serde_json::from_str(&json)?);
        }
        Ok(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_stats_round_trip_through_json_column() {
        let store = SimStore::in_memory().unwrap();
        store.migrate().unwrap();
        store.insert_run("run-1", 1, "test").unwrap();

        let mut day = DailyStats::new(1, 95.0, 5.4);
        day.revenue = 12.5;
        day.item_sales.insert("Bread".into(), 4);
        store.insert_daily_stats("run-1", &day).unwrap();

        let back = store.daily_stats_for_run("run-1").unwrap();
        assert_eq!(back, vec![day]);
    }

    #[test]
    fn one_row_per_day() {
        let store = SimStore::in_memory().unwrap();
        store.migrate().unwrap();
        store.insert_run("run-1", 1, "test").unwrap();
        let day = DailyStats::new(1, 100.0, 5.0);
        store.insert_daily_stats("run-1", &day).unwrap();
        assert!(store.insert_daily_stats("run-1", &day).is_err());
    }
}
