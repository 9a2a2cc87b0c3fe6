//! Deterministic synthetic data generator for `score-warehouse` fixtures
//! and benchmarks.
//!
//! Generates FK-consistent `beatmapsets` / `beatmaps` / `scores` MySQL
//! dump text at a chosen [`Scale`], seeded for reproducibility.
//!
//! # Example
//!
//! ```rust
//! use test_data_gen::{Generator, Scale};
//!
//! let mut gen = Generator::new(Scale::Small, 42);
//! let data = gen.generate();
//! let sql = data.scores_dump();
//! println!("{}", sql);
//! ```

pub mod fake;
pub mod generator;

pub use generator::{GeneratedData, Generator, Scale};
