//! Recommender contract: thin library surface over the warehouse's gold
//! tables. Not a network API; callable from the CLI's `recommend`
//! subcommand or from tests only.

pub mod cache;

use duckdb::Connection;
use serde::Serialize;

pub use cache::CohortCache;

/// Select the cohort of users who played a seed beatmap, optionally
/// restricted to a pp band and/or a mods key.
pub fn cohort_users(
    conn: &Connection,
    beatmap_id: i64,
    mods_key: Option<&str>,
    pp_lower: Option<f64>,
    pp_upper: Option<f64>,
) -> anyhow::Result<Vec<i64>> {
    let mut sql = "SELECT DISTINCT user_id FROM mart_best_scores WHERE beatmap_id = ?".to_string();
    let mut params: Vec<Box<dyn duckdb::ToSql>> = vec![Box::new(beatmap_id)];

    if let Some(lower) = pp_lower {
        sql.push_str(" AND pp >= ?");
        params.push(Box::new(lower));
    }
    if let Some(upper) = pp_upper {
        sql.push_str(" AND pp <= ?");
        params.push(Box::new(upper));
    }
    if let Some(mods_key) = mods_key {
        sql.push_str(" AND mods_key = ?");
        params.push(Box::new(mods_key.to_string()));
    }

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn duckdb::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt
        .query_map(param_refs.as_slice(), |row| row.get::<_, i64>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// One recommended beatmap. The metadata fields (`difficulty_name`,
/// `star_rating`, `artist`, `title`) come from a join against
/// `raw_beatmaps`/`raw_beatmapsets`; they are `None` when either bronze
/// table is absent or the specific beatmap has no matching row there,
/// never a reason to drop the recommendation itself.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub beatmap_id: i64,
    pub total_players: i64,
    pub cohort_overlap: i64,
    pub avg_pp: f64,
    pub std_pp: Option<f64>,
    pub min_pp: f64,
    pub median_pp: f64,
    pub p75_pp: f64,
    pub p90_pp: f64,
    pub novelty_score: f64,
    pub difficulty_name: Option<String>,
    pub star_rating: Option<f64>,
    pub artist: Option<String>,
    pub title: Option<String>,
}

fn table_exists(conn: &Connection, name: &str) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
        [name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Beatmap recommendations by cohort array-overlap against
/// `mart_beatmap_user_sets`. `min_total_players` filters candidate
/// beatmaps by popularity; `min_cohort_overlap` filters by how many
/// cohort members already played them. Joins `raw_beatmaps`/
/// `raw_beatmapsets` for human-readable metadata with `LEFT JOIN`s, so a
/// missing bronze table or an unmatched beatmap only blanks the metadata
/// fields instead of dropping the recommendation.
pub fn recommendations(
    conn: &Connection,
    cache: &CohortCache,
    min_cohort_overlap: i64,
    min_total_players: i64,
    limit: i64,
) -> anyhow::Result<Vec<Recommendation>> {
    let has_metadata = table_exists(conn, "raw_beatmaps")? && table_exists(conn, "raw_beatmapsets")?;

    let (metadata_select, metadata_join) = if has_metadata {
        (
            "b.difficulty_name, b.star_rating, bs.artist, bs.title",
            "LEFT JOIN raw_beatmaps b ON cb.beatmap_id = b.id
             LEFT JOIN raw_beatmapsets bs ON b.beatmapset_id = bs.id",
        )
    } else {
        (
            "CAST(NULL AS VARCHAR), CAST(NULL AS DOUBLE), CAST(NULL AS VARCHAR), CAST(NULL AS VARCHAR)",
            "",
        )
    };

    let sql = format!(
        "WITH candidate_beatmaps AS (
             SELECT
                 beatmap_id,
                 user_count,
                 avg_pp,
                 std_pp,
                 min_pp,
                 median_pp,
                 p75_pp,
                 p90_pp,
                 (SELECT COUNT(*) FROM {cache_table} c
                  WHERE c.user_id = ANY(bus.user_ids)) AS cohort_overlap
             FROM mart_beatmap_user_sets bus
             WHERE user_count >= ?
         )
         SELECT
             cb.beatmap_id, cb.user_count, cb.cohort_overlap, cb.avg_pp, cb.std_pp,
             cb.min_pp, cb.median_pp, cb.p75_pp, cb.p90_pp,
             (1.0 - (cb.cohort_overlap::DOUBLE / cb.user_count)) AS novelty_score,
             {metadata_select}
         FROM candidate_beatmaps cb
         {metadata_join}
         WHERE cb.cohort_overlap >= ?
         ORDER BY cb.cohort_overlap DESC, cb.avg_pp DESC
         LIMIT ?",
        cache_table = cache.table_name(),
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            duckdb::params![min_total_players, min_cohort_overlap, limit],
            |row| {
                Ok(Recommendation {
                    beatmap_id: row.get(0)?,
                    total_players: row.get(1)?,
                    cohort_overlap: row.get(2)?,
                    avg_pp: row.get(3)?,
                    std_pp: row.get(4)?,
                    min_pp: row.get(5)?,
                    median_pp: row.get(6)?,
                    p75_pp: row.get(7)?,
                    p90_pp: row.get(8)?,
                    novelty_score: row.get(9)?,
                    difficulty_name: row.get(10)?,
                    star_rating: row.get(11)?,
                    artist: row.get(12)?,
                    title: row.get(13)?,
                })
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warehouse_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE mart_best_scores (user_id BIGINT, beatmap_id BIGINT, pp DOUBLE, mods_key VARCHAR);
             INSERT INTO mart_best_scores VALUES (1, 10, 500.0, 'DT'), (2, 10, 480.0, 'DT'), (3, 10, 520.0, 'HD');
             CREATE TABLE mart_beatmap_user_sets (
                 beatmap_id BIGINT, user_ids BIGINT[], user_count BIGINT,
                 avg_pp DOUBLE, std_pp DOUBLE, min_pp DOUBLE, median_pp DOUBLE, p75_pp DOUBLE, p90_pp DOUBLE
             );
             INSERT INTO mart_beatmap_user_sets VALUES
                 (20, [1, 2, 3], 3, 500.0, 10.0, 480.0, 500.0, 510.0, 518.0);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn cohort_users_filters_by_beatmap_and_pp_band() {
        let conn = warehouse_conn();
        let users = cohort_users(&conn, 10, None, Some(490.0), None).unwrap();
        assert_eq!(users, vec![1, 3]);
    }

    #[test]
    fn cohort_users_filters_by_mods_key() {
        let conn = warehouse_conn();
        let users = cohort_users(&conn, 10, Some("DT"), None, None).unwrap();
        let mut sorted = users;
        sorted.sort();
        assert_eq!(sorted, vec![1, 2]);
    }

    #[test]
    fn recommendations_computes_overlap_and_novelty() {
        let conn = warehouse_conn();
        let cache = CohortCache::create(&conn, &[1, 2]).unwrap();
        let recs = recommendations(&conn, &cache, 1, 1, 10).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].beatmap_id, 20);
        assert_eq!(recs[0].cohort_overlap, 2);
        assert!((recs[0].novelty_score - (1.0 - 2.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn recommendations_blank_metadata_when_bronze_tables_absent() {
        let conn = warehouse_conn();
        let cache = CohortCache::create(&conn, &[1, 2]).unwrap();
        let recs = recommendations(&conn, &cache, 1, 1, 10).unwrap();
        assert_eq!(recs[0].artist, None);
        assert_eq!(recs[0].title, None);
        assert_eq!(recs[0].difficulty_name, None);
        assert_eq!(recs[0].star_rating, None);
    }

    #[test]
    fn recommendations_join_beatmap_metadata_when_present() {
        let conn = warehouse_conn();
        conn.execute_batch(
            "CREATE TABLE raw_beatmapsets (id BIGINT, artist VARCHAR, title VARCHAR, creator VARCHAR, status BIGINT);
             INSERT INTO raw_beatmapsets VALUES (5, 'Nova', 'Eclipse Horizon', 'Alice_1', 1);
             CREATE TABLE raw_beatmaps (id BIGINT, beatmapset_id BIGINT, difficulty_name VARCHAR, star_rating DOUBLE, mode BIGINT);
             INSERT INTO raw_beatmaps VALUES (20, 5, 'Insane', 6.42, 0);",
        )
        .unwrap();

        let cache = CohortCache::create(&conn, &[1, 2]).unwrap();
        let recs = recommendations(&conn, &cache, 1, 1, 10).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].artist.as_deref(), Some("Nova"));
        assert_eq!(recs[0].title.as_deref(), Some("Eclipse Horizon"));
        assert_eq!(recs[0].difficulty_name.as_deref(), Some("Insane"));
        assert_eq!(recs[0].star_rating, Some(6.42));
    }

    #[test]
    fn recommendations_blank_metadata_for_unmatched_beatmap() {
        let conn = warehouse_conn();
        conn.execute_batch(
            "CREATE TABLE raw_beatmapsets (id BIGINT, artist VARCHAR, title VARCHAR, creator VARCHAR, status BIGINT);
             CREATE TABLE raw_beatmaps (id BIGINT, beatmapset_id BIGINT, difficulty_name VARCHAR, star_rating DOUBLE, mode BIGINT);",
        )
        .unwrap();

        let cache = CohortCache::create(&conn, &[1, 2]).unwrap();
        let recs = recommendations(&conn, &cache, 1, 1, 10).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].artist, None);
    }
}
