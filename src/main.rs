// src/main.rs
use clap::Parser;
use colorful::Colorful;

use breathnet::cli::{self, Args};

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = cli::run(args) {
        eprintln!("{} {:#}", "error:".red(), e);
        std::process::exit(1);
    }
}

/// `info` by default, crate-level `debug` with `-v`; `RUST_LOG` overrides both
fn init_logging(verbose: bool) {
    let default_filter = if verbose { "info,breathnet=debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}
