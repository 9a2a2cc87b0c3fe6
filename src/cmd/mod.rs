mod ingest;
mod materialize;
mod recommend;
mod run;

use clap::{CommandFactory, Parser, Subcommand, ValueHint};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

const AFTER_HELP: &str = "\x1b[1mCommon workflows:\x1b[0m
  Ingest one dump file for a table into sharded Parquet:
    score-warehouse ingest scores.sql --table scores -o shards/

  Materialize the warehouse from an existing shard set:
    score-warehouse materialize shards/ -w warehouse/

  Run ingest + materialize in one invocation:
    score-warehouse run scores.sql --table scores -o shards/ -w warehouse/

  Smoke-test a cohort recommendation:
    score-warehouse recommend -w warehouse/ --beatmap-id 201 --limit 10

\x1b[1mMore info:\x1b[0m
  Run 'score-warehouse <command> --help' for command-specific options.
  Documentation: https://github.com/helgesverre/score-warehouse
  Enable completions: score-warehouse completions <shell>";

#[derive(Parser)]
#[command(name = "score-warehouse")]
#[command(author = "Helge Sverre <helge.sverre@gmail.com>")]
#[command(version)]
#[command(about = "Batch ETL that turns MySQL score dumps into a columnar analytical warehouse")]
#[command(after_help = AFTER_HELP)]
#[command(arg_required_else_help = true)]
#[command(max_term_width = 100)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional YAML config file overriding pipeline defaults
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
}

const INPUT_OUTPUT: &str = "Input/Output";
const TUNING: &str = "Tuning";
const BEHAVIOR: &str = "Behavior";
const COHORT: &str = "Cohort selection";

#[derive(Subcommand)]
pub enum Commands {
    /// Scan one dump file for a table and write sharded Parquet + manifest (A–E)
    #[command(after_help = "\x1b[1mExamples:\x1b[0m
  score-warehouse ingest scores.sql --table scores -o shards/
  score-warehouse ingest scores.sql.gz --table scores -o shards/ --progress")]
    Ingest {
        /// Input dump file (optionally gzip/bzip2/xz/zstd compressed)
        #[arg(value_hint = ValueHint::FilePath, help_heading = INPUT_OUTPUT)]
        file: PathBuf,

        /// Table name targeted by the scanner
        #[arg(short, long, help_heading = INPUT_OUTPUT)]
        table: String,

        /// Shard output directory (a `<table>/` subdirectory is created under it)
        #[arg(short, long, default_value = "shards", value_hint = ValueHint::DirPath, help_heading = INPUT_OUTPUT)]
        output: PathBuf,

        /// Rows buffered per sealed batch
        #[arg(long, help_heading = TUNING)]
        batch_rows: Option<usize>,

        /// Max rows per shard file
        #[arg(long, help_heading = TUNING)]
        file_rows: Option<usize>,

        /// Show a byte-based progress bar
        #[arg(short, long, help_heading = BEHAVIOR)]
        progress: bool,
    },

    /// Drive the analytical engine through bronze→silver→gold (F)
    #[command(after_help = "\x1b[1mExamples:\x1b[0m
  score-warehouse materialize shards/ -w warehouse/
  score-warehouse materialize shards/ -w warehouse/ --database-name osu")]
    Materialize {
        /// Shard root directory (expects `<dir>/<table>/part-*.parquet`)
        #[arg(value_hint = ValueHint::DirPath, help_heading = INPUT_OUTPUT)]
        shard_dir: PathBuf,

        /// Warehouse directory holding the DuckDB database file
        #[arg(short = 'w', long, default_value = "warehouse", value_hint = ValueHint::DirPath, help_heading = INPUT_OUTPUT)]
        warehouse_dir: PathBuf,

        /// Database file stem (file is `<name>.duckdb`)
        #[arg(long, help_heading = INPUT_OUTPUT)]
        database_name: Option<String>,
    },

    /// Ingest then materialize in one invocation, optionally chunked across workers (G)
    #[command(after_help = "\x1b[1mExamples:\x1b[0m
  score-warehouse run scores.sql --table scores -o shards/ -w warehouse/
  score-warehouse run scores.sql --table scores -o shards/ -w warehouse/ --parallel")]
    Run {
        /// Input dump file
        #[arg(value_hint = ValueHint::FilePath, help_heading = INPUT_OUTPUT)]
        file: PathBuf,

        /// Table name targeted by the scanner
        #[arg(short, long, help_heading = INPUT_OUTPUT)]
        table: String,

        /// Shard output directory
        #[arg(short, long, default_value = "shards", value_hint = ValueHint::DirPath, help_heading = INPUT_OUTPUT)]
        output: PathBuf,

        /// Warehouse directory holding the DuckDB database file
        #[arg(short = 'w', long, default_value = "warehouse", value_hint = ValueHint::DirPath, help_heading = INPUT_OUTPUT)]
        warehouse_dir: PathBuf,

        /// Pre-split the input into chunk files and dispatch across a worker pool (G)
        #[arg(long, help_heading = TUNING)]
        parallel: bool,

        /// Show a byte-based progress bar
        #[arg(short, long, help_heading = BEHAVIOR)]
        progress: bool,
    },

    /// Smoke-test a cohort-based recommendation against the gold tables
    #[command(after_help = "\x1b[1mExamples:\x1b[0m
  score-warehouse recommend -w warehouse/ --beatmap-id 201
  score-warehouse recommend -w warehouse/ --beatmap-id 201 --mods-key DT --limit 20")]
    Recommend {
        /// Warehouse directory holding the DuckDB database file
        #[arg(short = 'w', long, default_value = "warehouse", value_hint = ValueHint::DirPath, help_heading = INPUT_OUTPUT)]
        warehouse_dir: PathBuf,

        /// Database file stem (file is `<name>.duckdb`)
        #[arg(long, help_heading = INPUT_OUTPUT)]
        database_name: Option<String>,

        /// Seed beatmap id defining the cohort
        #[arg(long, help_heading = COHORT)]
        beatmap_id: i64,

        /// Restrict the cohort to this mods key (e.g. "DT", "HR,DT")
        #[arg(long, help_heading = COHORT)]
        mods_key: Option<String>,

        /// Minimum cohort overlap for a candidate beatmap
        #[arg(long, default_value_t = 3, help_heading = COHORT)]
        min_overlap: i64,

        /// Minimum total players for a candidate beatmap
        #[arg(long, default_value_t = 5, help_heading = COHORT)]
        min_players: i64,

        /// Maximum recommendations returned
        #[arg(long, default_value_t = 20, help_heading = COHORT)]
        limit: i64,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let base_config = match &cli.config {
        Some(path) => crate::config::PipelineConfig::from_path(path)?,
        None => crate::config::PipelineConfig::default(),
    };

    match cli.command {
        Commands::Ingest {
            file,
            table,
            output,
            batch_rows,
            file_rows,
            progress,
        } => ingest::run(file, table, output, base_config, batch_rows, file_rows, progress),
        Commands::Materialize {
            shard_dir,
            warehouse_dir,
            database_name,
        } => materialize::run(shard_dir, warehouse_dir, database_name, base_config),
        Commands::Run {
            file,
            table,
            output,
            warehouse_dir,
            parallel,
            progress,
        } => run::run(file, table, output, warehouse_dir, base_config, parallel, progress),
        Commands::Recommend {
            warehouse_dir,
            database_name,
            beatmap_id,
            mods_key,
            min_overlap,
            min_players,
            limit,
        } => recommend::run(
            warehouse_dir,
            database_name,
            base_config,
            beatmap_id,
            mods_key,
            min_overlap,
            min_players,
            limit,
        ),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}
