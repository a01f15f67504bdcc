mod args;
mod driver;
mod samples;
mod target;

use clap::Parser;
use log::LevelFilter;

use args::{Arguments, Command};

fn main() -> anyhow::Result<()> {
    let args = Arguments::parse();

    let level = match args.verbosity() {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match args.command {
        Command::Lower(opts) => driver::lower(opts),
        Command::List => driver::list(),
    }
}
