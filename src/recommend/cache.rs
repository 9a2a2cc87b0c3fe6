//! Session-scoped cohort cache: a temp table holding a cohort's user ids,
//! inserted in 1000-row batches, dropped on scope exit.
//!
//! Inserting the cohort into a session-scoped table lets the engine
//! evaluate a membership predicate via `ANY(...)` instead of an inlined
//! `IN (...)` literal that would blow past practical statement size for
//! large cohorts.

use duckdb::Connection;

const TABLE_NAME: &str = "mart_cohort_cache";
const INSERT_BATCH_SIZE: usize = 1000;

/// RAII guard around a `TEMPORARY TABLE` of cohort user ids. Dropping it
/// drops the table; constructing a second `CohortCache` against the same
/// connection replaces the first (`DROP TABLE IF EXISTS` up front).
pub struct CohortCache<'conn> {
    conn: &'conn Connection,
}

impl<'conn> CohortCache<'conn> {
    pub fn table_name(&self) -> &'static str {
        TABLE_NAME
    }

    /// Create the temp table and batch-insert `user_ids`, 1000 rows per
    /// `INSERT`.
    pub fn create(conn: &'conn Connection, user_ids: &[i64]) -> anyhow::Result<Self> {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {TABLE_NAME};"))?;
        conn.execute_batch(&format!(
            "CREATE TEMPORARY TABLE {TABLE_NAME} (user_id BIGINT PRIMARY KEY);"
        ))?;

        for batch in user_ids.chunks(INSERT_BATCH_SIZE) {
            let values = batch
                .iter()
                .map(|uid| format!("({uid})"))
                .collect::<Vec<_>>()
                .join(",");
            conn.execute_batch(&format!("INSERT INTO {TABLE_NAME} (user_id) VALUES {values};"))?;
        }

        Ok(Self { conn })
    }
}

impl Drop for CohortCache<'_> {
    fn drop(&mut self) {
        let _ = self
            .conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {TABLE_NAME};"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_table(conn: &Connection, name: &str) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
            [name],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn creates_table_and_inserts_all_ids() {
        let conn = Connection::open_in_memory().unwrap();
        let cache = CohortCache::create(&conn, &[1, 2, 3]).unwrap();
        let n: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", cache.table_name()), [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(n, 3);
    }

    #[test]
    fn empty_cohort_yields_empty_table() {
        let conn = Connection::open_in_memory().unwrap();
        let cache = CohortCache::create(&conn, &[]).unwrap();
        let n: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", cache.table_name()), [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn drop_removes_the_temp_table() {
        let conn = Connection::open_in_memory().unwrap();
        {
            let _cache = CohortCache::create(&conn, &[1]).unwrap();
            assert_eq!(count_table(&conn, TABLE_NAME), 1);
        }
        assert_eq!(count_table(&conn, TABLE_NAME), 0);
    }

    #[test]
    fn batches_inserts_past_one_thousand_rows() {
        let conn = Connection::open_in_memory().unwrap();
        let ids: Vec<i64> = (0..2500).collect();
        let cache = CohortCache::create(&conn, &ids).unwrap();
        let n: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", cache.table_name()), [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(n, 2500);
    }
}
