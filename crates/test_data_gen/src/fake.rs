//! Fake data generation helpers for synthetic osu!-score dumps: picking
//! from a pool, integer ranges, and a deterministic RNG wrapper.

use rand::Rng;

/// Player usernames, recycled across generated users (deterministic, not
/// unique) purely for `beatmapsets.creator`-style display fields.
const USERNAMES: &[&str] = &[
    "Alice", "Bob", "Carol", "David", "Emma", "Frank", "Grace", "Henry", "Iris", "Jack", "Kate",
    "Leo", "Maya", "Noah", "Olivia", "Peter", "Quinn", "Rose", "Sam", "Tara", "Uma", "Victor",
    "Wendy", "Xavier", "Yara", "Zack",
];

/// Song-title-ish words, combined two at a time for synthetic beatmapset
/// titles.
const TITLE_WORDS: &[&str] = &[
    "Eclipse", "Horizon", "Velocity", "Fracture", "Nova", "Cascade", "Tempest", "Mirage",
    "Paradox", "Lumen", "Echo", "Zenith", "Vortex", "Solstice", "Odyssey", "Catalyst",
];

/// Mod acronyms, matching the recognized subset in `score_warehouse::mods`
/// plus a handful that never affect `speed_mod`, for realistic diversity in
/// generated `mods_key` values.
pub const MOD_ACRONYMS: &[&str] = &["HD", "HR", "DT", "NC", "HT", "EZ", "FL", "SO", "PF", "SD"];

/// Deterministic fake-data generator wrapping a seeded RNG.
pub struct FakeData<R: Rng> {
    rng: R,
}

impl<R: Rng> FakeData<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Pick a random element from a non-empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.rng.random_range(0..items.len())]
    }

    /// Generate a random integer in `[min, max]`.
    pub fn int_range(&mut self, min: i64, max: i64) -> i64 {
        self.rng.random_range(min..=max)
    }

    /// True with the given probability.
    pub fn bool_with_probability(&mut self, probability: f64) -> bool {
        self.rng.random::<f64>() < probability
    }

    /// Generate a synthetic username, e.g. `"Alice_482"`.
    pub fn username(&mut self) -> String {
        let name = *self.pick(USERNAMES);
        let suffix = self.int_range(1, 9999);
        format!("{name}_{suffix}")
    }

    /// Generate a synthetic beatmapset title, e.g. `"Nova Horizon"`.
    pub fn title(&mut self) -> String {
        let a = *self.pick(TITLE_WORDS);
        let b = *self.pick(TITLE_WORDS);
        format!("{a} {b}")
    }

    /// Generate a star rating in a plausible osu! range.
    pub fn star_rating(&mut self) -> f64 {
        let value = self.rng.random_range(1.0..9.0_f64);
        (value * 100.0).round() / 100.0
    }

    /// Choose a subset of [`MOD_ACRONYMS`] with each acronym included
    /// independently at `inclusion_probability`.
    pub fn mod_subset(&mut self, inclusion_probability: f64) -> Vec<&'static str> {
        MOD_ACRONYMS
            .iter()
            .copied()
            .filter(|_| self.bool_with_probability(inclusion_probability))
            .collect()
    }
}
