//! CLI for generating osu!-score dump fixtures.
//!
//! Usage:
//!   gen-fixtures --scale small --seed 42 --output fixtures/small

use std::path::PathBuf;

use clap::Parser;
use test_data_gen::{Generator, Scale};

#[derive(Parser, Debug)]
#[command(name = "gen-fixtures")]
#[command(about = "Generate synthetic scores/beatmaps/beatmapsets dump fixtures", long_about = None)]
struct Args {
    /// Scale preset: small, medium, large, xlarge
    #[arg(short, long, default_value = "small")]
    scale: String,

    /// Random seed for reproducibility
    #[arg(long, default_value = "12345")]
    seed: u64,

    /// Output directory; writes scores.sql, beatmaps.sql, beatmapsets.sql
    #[arg(short, long)]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let scale: Scale = args.scale.parse()?;

    let mut gen = Generator::new(scale, args.seed);
    let data = gen.generate();

    std::fs::create_dir_all(&args.output)?;
    std::fs::write(args.output.join("beatmapsets.sql"), data.beatmapsets_dump())?;
    std::fs::write(args.output.join("beatmaps.sql"), data.beatmaps_dump())?;
    std::fs::write(args.output.join("scores.sql"), data.scores_dump())?;

    eprintln!(
        "Generated {} beatmapsets, {} beatmaps, {} scores to {}",
        data.beatmapsets_row_count(),
        data.beatmaps_row_count(),
        data.scores_row_count(),
        args.output.display()
    );

    Ok(())
}
