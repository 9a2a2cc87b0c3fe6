// Allow dead code for items that are part of the public API but only used in tests
#![allow(dead_code)]

mod batch;
mod chunk;
mod cmd;
mod compress;
mod config;
mod error;
mod ingest;
mod mods;
mod progress;
mod recommend;
mod scanner;
mod shard;
mod value;
mod warehouse;

use clap::Parser;
use cmd::Cli;

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = cmd::run(cli) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
