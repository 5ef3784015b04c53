mod cli;
mod commands;
mod logging;

use std::io;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Command};
use commands::{Session, list_encodings};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Command::Inspect { file, open } => Session::start(cli.config.as_deref())?.inspect(file, open, &mut out),
        Command::Convert(args) => Session::start(cli.config.as_deref())?.convert(args, &mut out),
        Command::Encodings { all } => list_encodings(*all, &mut out),
    }
}
