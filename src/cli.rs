//! Command-line argument parsing
//!
//! Supports:
//! - Inspecting how a file would be opened
//! - Converting a file to another encoding or line ending
//! - Listing known encodings

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use mousepad_fs::LineEnding;

/// Read and write text files the way the mousepad editor does
#[derive(Parser, Debug)]
#[command(name = "mousepad", version, about)]
pub struct Cli {
    /// Increase log verbosity (RUST_LOG takes precedence)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file to use instead of the default search path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the encoding, line ending and BOM a file is opened with
    Inspect {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        open: OpenArgs,
    },

    /// Rewrite a file in another encoding or line ending
    Convert(ConvertArgs),

    /// List known encodings
    Encodings {
        /// Include encodings without a converter
        #[arg(long)]
        all: bool,
    },
}

/// How to open the input file
#[derive(Args, Debug, Clone, Default)]
pub struct OpenArgs {
    /// Encoding to open with, e.g. ISO-8859-15
    #[arg(short, long, value_name = "CHARSET")]
    pub encoding: Option<String>,

    /// Encodings to retry with when decoding fails, in order
    #[arg(long, value_name = "CHARSET", value_delimiter = ',')]
    pub fallback: Vec<String>,

    /// Replace invalid UTF-8 sequences instead of failing
    #[arg(long)]
    pub make_valid: bool,

    /// Do not let a byte order mark choose the encoding
    #[arg(long)]
    pub ignore_bom: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    #[command(flatten)]
    pub open: OpenArgs,

    /// Encoding to write
    #[arg(long, value_name = "CHARSET")]
    pub to_encoding: Option<String>,

    /// Line ending to write
    #[arg(long, value_enum, value_name = "STYLE")]
    pub to_line_ending: Option<LineEndingArg>,

    /// Write a byte order mark
    #[arg(long, conflicts_with = "no_bom")]
    pub bom: bool,

    /// Drop the byte order mark
    #[arg(long)]
    pub no_bom: bool,

    /// Write to this file instead of replacing the input
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Overwrite even if the target changed or already exists
    #[arg(long)]
    pub force: bool,

    /// Keep a copy of the replaced file
    #[arg(long)]
    pub backup: bool,
}

impl ConvertArgs {
    /// `Some(true)` for `--bom`, `Some(false)` for `--no-bom`.
    pub fn bom_choice(&self) -> Option<bool> {
        match (self.bom, self.no_bom) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LineEndingArg {
    Unix,
    Dos,
    Mac,
}

impl From<LineEndingArg> for LineEnding {
    fn from(arg: LineEndingArg) -> Self {
        match arg {
            LineEndingArg::Unix => LineEnding::Unix,
            LineEndingArg::Dos => LineEnding::Dos,
            LineEndingArg::Mac => LineEnding::Mac,
        }
    }
}
