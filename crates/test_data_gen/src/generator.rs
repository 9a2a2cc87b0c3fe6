//! Deterministic synthetic osu!-score dump generation: a seeded
//! `rand_chacha::ChaCha8Rng` drives a generator struct that produces row
//! data and renders it as MySQL `INSERT` statements for the fixed
//! three-table `scores` / `beatmaps` / `beatmapsets` schema this warehouse
//! ingests.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::fake::FakeData;

/// Row-count presets for a single-tenant scores warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Small,
    Medium,
    Large,
    XLarge,
}

impl Scale {
    pub fn beatmapsets(&self) -> u32 {
        match self {
            Scale::Small => 20,
            Scale::Medium => 200,
            Scale::Large => 2_000,
            Scale::XLarge => 20_000,
        }
    }

    pub fn beatmaps_per_set(&self) -> u32 {
        match self {
            Scale::Small => 3,
            Scale::Medium => 4,
            Scale::Large => 4,
            Scale::XLarge => 5,
        }
    }

    pub fn users(&self) -> u32 {
        match self {
            Scale::Small => 50,
            Scale::Medium => 500,
            Scale::Large => 5_000,
            Scale::XLarge => 50_000,
        }
    }

    pub fn scores_per_user(&self) -> u32 {
        match self {
            Scale::Small => 10,
            Scale::Medium => 20,
            Scale::Large => 30,
            Scale::XLarge => 40,
        }
    }
}

impl std::str::FromStr for Scale {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "small" | "s" => Ok(Scale::Small),
            "medium" | "m" => Ok(Scale::Medium),
            "large" | "l" => Ok(Scale::Large),
            "xlarge" | "xl" | "x" => Ok(Scale::XLarge),
            other => Err(anyhow::anyhow!("unknown scale: {other}")),
        }
    }
}

struct Beatmapset {
    id: i64,
    artist: String,
    title: String,
    creator: String,
    status: i64,
}

struct Beatmap {
    id: i64,
    beatmapset_id: i64,
    difficulty_name: String,
    star_rating: f64,
    mode: i64,
}

struct ScoreRow {
    id: i64,
    user_id: i64,
    beatmap_id: i64,
    score: i64,
    pp: f64,
    playmode: i64,
    mods: Vec<&'static str>,
}

/// Generated row data for all three bronze tables, ready to be rendered as
/// MySQL dump text.
pub struct GeneratedData {
    beatmapsets: Vec<Beatmapset>,
    beatmaps: Vec<Beatmap>,
    scores: Vec<ScoreRow>,
}

/// Deterministic generator producing a fixed schema's worth of synthetic
/// osu!-score data: beatmapsets, their beatmaps, and scores played against
/// them by a pool of users.
pub struct Generator {
    fake: FakeData<ChaCha8Rng>,
    scale: Scale,
}

impl Generator {
    pub fn new(scale: Scale, seed: u64) -> Self {
        Self {
            fake: FakeData::new(ChaCha8Rng::seed_from_u64(seed)),
            scale,
        }
    }

    pub fn generate(&mut self) -> GeneratedData {
        let beatmapsets = self.generate_beatmapsets();
        let beatmaps = self.generate_beatmaps(&beatmapsets);
        let scores = self.generate_scores(&beatmaps);
        GeneratedData {
            beatmapsets,
            beatmaps,
            scores,
        }
    }

    fn generate_beatmapsets(&mut self) -> Vec<Beatmapset> {
        (1..=self.scale.beatmapsets() as i64)
            .map(|id| Beatmapset {
                id,
                artist: self.fake.username(),
                title: self.fake.title(),
                creator: self.fake.username(),
                status: if self.fake.bool_with_probability(0.8) { 1 } else { 0 },
            })
            .collect()
    }

    fn generate_beatmaps(&mut self, sets: &[Beatmapset]) -> Vec<Beatmap> {
        let difficulty_names = ["Easy", "Normal", "Hard", "Insane", "Expert"];
        let mut beatmaps = Vec::new();
        let mut next_id = 1i64;
        for set in sets {
            for i in 0..self.scale.beatmaps_per_set() {
                let difficulty_name = difficulty_names[i as usize % difficulty_names.len()];
                beatmaps.push(Beatmap {
                    id: next_id,
                    beatmapset_id: set.id,
                    difficulty_name: difficulty_name.to_string(),
                    star_rating: self.fake.star_rating(),
                    mode: self.fake.int_range(0, 3),
                });
                next_id += 1;
            }
        }
        beatmaps
    }

    fn generate_scores(&mut self, beatmaps: &[Beatmap]) -> Vec<ScoreRow> {
        let mut scores = Vec::new();
        let mut next_id = 1i64;
        for user_id in 1..=self.scale.users() as i64 {
            for _ in 0..self.scale.scores_per_user() {
                let beatmap = self.fake.pick(beatmaps);
                let score_value = self.fake.int_range(100_000, 1_000_000);
                let pp = (self.fake.int_range(0, 100_000) as f64) / 100.0;
                scores.push(ScoreRow {
                    id: next_id,
                    user_id,
                    beatmap_id: beatmap.id,
                    score: score_value,
                    pp,
                    playmode: beatmap.mode,
                    mods: self.fake.mod_subset(0.25),
                });
                next_id += 1;
            }
        }
        scores
    }
}

fn escape_sql_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "''")
}

fn mods_json(mods: &[&str]) -> String {
    let entries: Vec<String> = mods
        .iter()
        .map(|acronym| format!(r#"{{"acronym":"{acronym}"}}"#))
        .collect();
    format!(r#"{{"mods":[{}]}}"#, entries.join(","))
}

impl GeneratedData {
    /// Render the `beatmapsets` table as a single MySQL `INSERT` statement.
    pub fn beatmapsets_dump(&self) -> String {
        let mut sql = String::from(
            "INSERT INTO `beatmapsets` (`id`,`artist`,`title`,`creator`,`status`) VALUES\n",
        );
        let rows: Vec<String> = self
            .beatmapsets
            .iter()
            .map(|b| {
                format!(
                    "({},'{}','{}','{}',{})",
                    b.id,
                    escape_sql_string(&b.artist),
                    escape_sql_string(&b.title),
                    escape_sql_string(&b.creator),
                    b.status
                )
            })
            .collect();
        sql.push_str(&rows.join(",\n"));
        sql.push_str(";\n");
        sql
    }

    /// Render the `beatmaps` table as a single MySQL `INSERT` statement.
    pub fn beatmaps_dump(&self) -> String {
        let mut sql = String::from(
            "INSERT INTO `beatmaps` (`id`,`beatmapset_id`,`difficulty_name`,`star_rating`,`mode`) VALUES\n",
        );
        let rows: Vec<String> = self
            .beatmaps
            .iter()
            .map(|b| {
                format!(
                    "({},{},'{}',{},{})",
                    b.id,
                    b.beatmapset_id,
                    escape_sql_string(&b.difficulty_name),
                    b.star_rating,
                    b.mode
                )
            })
            .collect();
        sql.push_str(&rows.join(",\n"));
        sql.push_str(";\n");
        sql
    }

    /// Render the `scores` table as a single MySQL `INSERT` statement, in
    /// the exact column order `score_warehouse::scanner::DEFAULT_COLUMNS`
    /// expects when no explicit column list is given.
    pub fn scores_dump(&self) -> String {
        let mut sql = String::from(
            "INSERT INTO `scores` (`id`,`user_id`,`beatmap_id`,`score`,`pp`,`playmode`,`data`) VALUES\n",
        );
        let rows: Vec<String> = self
            .scores
            .iter()
            .map(|s| {
                format!(
                    "({},{},{},{},{},{},'{}')",
                    s.id,
                    s.user_id,
                    s.beatmap_id,
                    s.score,
                    s.pp,
                    s.playmode,
                    escape_sql_string(&mods_json(&s.mods))
                )
            })
            .collect();
        sql.push_str(&rows.join(",\n"));
        sql.push_str(";\n");
        sql
    }

    pub fn beatmapsets_row_count(&self) -> usize {
        self.beatmapsets.len()
    }

    pub fn beatmaps_row_count(&self) -> usize {
        self.beatmaps.len()
    }

    pub fn scores_row_count(&self) -> usize {
        self.scores.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_produces_identical_dumps() {
        let a = Generator::new(Scale::Small, 1).generate();
        let b = Generator::new(Scale::Small, 1).generate();
        assert_eq!(a.scores_dump(), b.scores_dump());
        assert_eq!(a.beatmaps_dump(), b.beatmaps_dump());
        assert_eq!(a.beatmapsets_dump(), b.beatmapsets_dump());
        let c = Generator::new(Scale::Small, 2).generate();
        assert_ne!(a.scores_dump(), c.scores_dump());
    }

    #[test]
    fn row_counts_match_scale() {
        let data = Generator::new(Scale::Small, 7).generate();
        assert_eq!(data.beatmapsets_row_count(), Scale::Small.beatmapsets() as usize);
        assert_eq!(
            data.beatmaps_row_count(),
            (Scale::Small.beatmapsets() * Scale::Small.beatmaps_per_set()) as usize
        );
        assert_eq!(
            data.scores_row_count(),
            (Scale::Small.users() * Scale::Small.scores_per_user()) as usize
        );
    }

    #[test]
    fn scores_dump_is_parseable_by_the_scanner() {
        use score_warehouse::error::Diagnostics;
        use score_warehouse::scanner::Scanner;
        use std::sync::Arc;

        let data = Generator::new(Scale::Small, 3).generate();
        let dump = data.scores_dump();
        let diag = Arc::new(Diagnostics::new());
        let mut scanner = Scanner::new(dump.as_bytes(), "scores");
        let mut count = 0;
        while scanner.next_row(&diag).unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, data.scores_row_count());
    }

    #[test]
    fn scale_from_str_parses_aliases() {
        assert_eq!("s".parse::<Scale>().unwrap(), Scale::Small);
        assert_eq!("medium".parse::<Scale>().unwrap(), Scale::Medium);
        assert_eq!("xl".parse::<Scale>().unwrap(), Scale::XLarge);
        assert!("bogus".parse::<Scale>().is_err());
    }
}
