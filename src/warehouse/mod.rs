//! Warehouse materializer (component F): drives DuckDB through the fixed
//! bronze→silver→gold sequence, producing the seven warehouse tables plus
//! the two lookup indexes, via one owned `duckdb::Connection` and no
//! query-builder abstraction.

use std::path::{Path, PathBuf};

use duckdb::Connection;
use serde::Serialize;

/// Bronze tables loaded directly from a shard glob, no silver/gold
/// derivation. `scores` feeds the rest of the pipeline; `beatmaps`/
/// `beatmapsets` exist purely so the recommender contract has metadata to
/// join against.
pub const BRONZE_TABLES: &[&str] = &["scores", "beatmaps", "beatmapsets"];

const RAW_SCORES: &str = "raw_scores";
const STG_SCORES: &str = "stg_scores";
const MART_BEST_SCORES: &str = "mart_best_scores";
const MART_USER_TOPK: &str = "mart_user_topk";
const MART_BEATMAP_USER_SETS: &str = "mart_beatmap_user_sets";

#[derive(Debug, Clone, Serialize)]
pub struct WarehouseManifest {
    pub table_row_counts: Vec<(String, u64)>,
}

pub struct Warehouse {
    conn: Connection,
}

impl Warehouse {
    /// Open (or create) the database file and disable preservation of
    /// insertion order, since ordering is explicitly not a contract.
    pub fn open(db_path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path).map_err(|e| {
            anyhow::anyhow!("failed to open warehouse database {}: {e}", db_path.display())
        })?;
        conn.execute_batch("SET preserve_insertion_order = false;")?;
        Ok(Self { conn })
    }

    /// Run the full ordered pipeline against shards rooted at
    /// `parquet_dir`, returning the populated manifest.
    pub fn materialize(&self, parquet_dir: &Path) -> anyhow::Result<WarehouseManifest> {
        for table in BRONZE_TABLES {
            self.load_bronze_table(parquet_dir, table)?;
        }
        self.create_stg_scores()?;
        self.create_mart_best_scores()?;
        self.create_mart_user_topk()?;
        self.create_mart_beatmap_user_sets()?;
        self.create_indexes()?;
        self.build_manifest()
    }

    fn load_bronze_table(&self, parquet_dir: &Path, table: &str) -> anyhow::Result<()> {
        let raw_name = format!("raw_{table}");
        let glob = resolve_parquet_glob(parquet_dir, table);
        if !glob_has_matches(&glob) {
            // Absence is not fatal to the core pipeline; only the
            // recommender's metadata join degrades.
            return Ok(());
        }
        self.conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {raw_name};"))
            .map_err(|e| anyhow::anyhow!("dropping {raw_name}: {e}"))?;
        self.conn
            .execute_batch(&format!(
                "CREATE TABLE {raw_name} AS SELECT * FROM read_parquet('{glob}');"
            ))
            .map_err(|e| anyhow::anyhow!("materializing {raw_name}: {e}"))?;
        Ok(())
    }

    fn create_stg_scores(&self) -> anyhow::Result<()> {
        if !self.table_exists(RAW_SCORES)? {
            self.conn
                .execute_batch(&format!("DROP TABLE IF EXISTS {STG_SCORES};"))?;
            return Ok(());
        }
        // A dump whose explicit column list omitted `score` still loads into
        // `raw_scores`; fall back to a null column rather than aborting the
        // whole materialization on a missing-column error.
        let score_expr = if self.column_exists(RAW_SCORES, "score")? {
            "score"
        } else {
            "NULL AS score"
        };
        self.conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS {STG_SCORES};
             CREATE TABLE {STG_SCORES} AS
             SELECT id, user_id, beatmap_id, {score_expr}, pp, data, mods_key, speed_mod
             FROM {RAW_SCORES}
             WHERE playmode = 0;"
        ))?;
        Ok(())
    }

    fn create_mart_best_scores(&self) -> anyhow::Result<()> {
        if !self.table_exists(STG_SCORES)? {
            self.conn
                .execute_batch(&format!("DROP TABLE IF EXISTS {MART_BEST_SCORES};"))?;
            return Ok(());
        }
        self.conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS {MART_BEST_SCORES};
             CREATE TABLE {MART_BEST_SCORES} AS
             SELECT * EXCLUDE (rn) FROM (
                 SELECT *, ROW_NUMBER() OVER (
                     PARTITION BY user_id, beatmap_id, mods_key
                     ORDER BY pp DESC
                 ) AS rn
                 FROM {STG_SCORES}
             ) WHERE rn = 1;"
        ))?;
        Ok(())
    }

    fn create_mart_user_topk(&self) -> anyhow::Result<()> {
        if !self.table_exists(MART_BEST_SCORES)? {
            self.conn
                .execute_batch(&format!("DROP TABLE IF EXISTS {MART_USER_TOPK};"))?;
            return Ok(());
        }
        self.conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS {MART_USER_TOPK};
             CREATE TABLE {MART_USER_TOPK} AS
             SELECT * EXCLUDE (rn) FROM (
                 SELECT *, ROW_NUMBER() OVER (
                     PARTITION BY user_id, speed_mod
                     ORDER BY pp DESC
                 ) AS rn
                 FROM {MART_BEST_SCORES}
             ) WHERE rn <= 100;"
        ))?;
        Ok(())
    }

    fn create_mart_beatmap_user_sets(&self) -> anyhow::Result<()> {
        if !self.table_exists(MART_BEST_SCORES)? {
            self.conn
                .execute_batch(&format!("DROP TABLE IF EXISTS {MART_BEATMAP_USER_SETS};"))?;
            return Ok(());
        }
        self.conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS {MART_BEATMAP_USER_SETS};
             CREATE TABLE {MART_BEATMAP_USER_SETS} AS
             SELECT
                 beatmap_id,
                 mods_key,
                 ARRAY_AGG(user_id) AS user_ids,
                 COUNT(*) AS user_count,
                 AVG(pp) AS avg_pp,
                 STDDEV(pp) AS std_pp,
                 MIN(pp) AS min_pp,
                 PERCENTILE_CONT(0.5) WITHIN GROUP (ORDER BY pp) AS median_pp,
                 PERCENTILE_CONT(0.75) WITHIN GROUP (ORDER BY pp) AS p75_pp,
                 PERCENTILE_CONT(0.9) WITHIN GROUP (ORDER BY pp) AS p90_pp
             FROM {MART_BEST_SCORES}
             GROUP BY beatmap_id, mods_key;"
        ))?;
        Ok(())
    }

    fn create_indexes(&self) -> anyhow::Result<()> {
        if !self.table_exists(MART_BEST_SCORES)? {
            return Ok(());
        }
        self.conn.execute_batch(
            "DROP INDEX IF EXISTS idx_mart_best_scores_beatmap_lookup;
             CREATE INDEX idx_mart_best_scores_beatmap_lookup
                 ON mart_best_scores (beatmap_id, pp, mods_key, user_id);
             DROP INDEX IF EXISTS idx_mart_best_scores_user_lookup;
             CREATE INDEX idx_mart_best_scores_user_lookup
                 ON mart_best_scores (user_id, beatmap_id, pp);",
        )?;
        Ok(())
    }

    fn table_exists(&self, name: &str) -> anyhow::Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
            [name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn column_exists(&self, table: &str, column: &str) -> anyhow::Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.columns
             WHERE table_name = ? AND column_name = ?",
            [table, column],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn table_row_count(&self, name: &str) -> anyhow::Result<u64> {
        if !self.table_exists(name)? {
            return Ok(0);
        }
        let count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {name}"), [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn build_manifest(&self) -> anyhow::Result<WarehouseManifest> {
        let tables = [
            RAW_SCORES,
            "raw_beatmaps",
            "raw_beatmapsets",
            STG_SCORES,
            MART_BEST_SCORES,
            MART_USER_TOPK,
            MART_BEATMAP_USER_SETS,
        ];
        let mut table_row_counts = Vec::with_capacity(tables.len());
        for table in tables {
            table_row_counts.push((table.to_string(), self.table_row_count(table)?));
        }
        Ok(WarehouseManifest { table_row_counts })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Glob resolution rule: prefer a per-table subdirectory, fall back to the
/// bare directory.
fn resolve_parquet_glob(parquet_dir: &Path, table: &str) -> String {
    let per_table_dir = parquet_dir.join(table);
    if has_parquet_files(&per_table_dir) {
        per_table_dir.join("part-*.parquet").to_string_lossy().into_owned()
    } else {
        parquet_dir.join("part-*.parquet").to_string_lossy().into_owned()
    }
}

fn has_parquet_files(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .any(|e| e.path().extension().is_some_and(|ext| ext == "parquet"))
        })
        .unwrap_or(false)
}

fn glob_has_matches(glob: &str) -> bool {
    let pattern_dir: PathBuf = Path::new(glob)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    has_parquet_files(&pattern_dir)
}
