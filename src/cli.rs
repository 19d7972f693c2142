use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::zip::ZipOptions;

#[derive(Parser, Debug)]
#[command(name = "fileutil")]
#[command(version)]
#[command(about = "Copy files, zip files or directories, and extract ZIP archives", long_about = None)]
#[command(after_help = "Examples:\n  \
  fileutil copy a.txt b.txt             copy a.txt over b.txt\n  \
  fileutil zip-dir src out.zip          zip everything below src\n  \
  fileutil unzip out.zip restore        extract out.zip into restore/\n  \
  fileutil list -l out.zip              show sizes and dates of entries")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// More log output (-vv => debug, -vvv => trace)
    #[arg(short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', global = true, action = clap::ArgAction::Count)]
    pub quiet: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Copy a file, creating or truncating the destination
    Copy {
        #[arg(value_name = "SRC")]
        src: PathBuf,
        #[arg(value_name = "DEST")]
        dest: PathBuf,
    },

    /// Extract a ZIP archive into an existing directory
    Unzip {
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,
        #[arg(value_name = "DIR", default_value = ".")]
        dest_dir: PathBuf,
    },

    /// Zip every regular file below a directory
    ZipDir {
        #[arg(value_name = "DIR")]
        src_dir: PathBuf,
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,
        #[command(flatten)]
        compression: CompressionArgs,
    },

    /// Zip a single file, stored under its base name
    ZipFile {
        #[arg(value_name = "FILE")]
        src: PathBuf,
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,
        #[command(flatten)]
        compression: CompressionArgs,
    },

    /// List the entries of a ZIP archive
    List {
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,
        /// Show sizes, compression ratio and timestamps
        #[arg(short = 'l', long)]
        long: bool,
    },
}

#[derive(Args, Debug)]
pub struct CompressionArgs {
    /// Store entries without compression
    #[arg(short = 's', long)]
    pub store: bool,

    /// DEFLATE level, 0 (fastest) to 9 (smallest)
    #[arg(long, default_value_t = 6, value_parser = clap::value_parser!(u32).range(0..=9))]
    pub level: u32,
}

impl CompressionArgs {
    pub fn options(&self) -> ZipOptions {
        if self.store {
            ZipOptions::stored()
        } else {
            ZipOptions::deflate(self.level)
        }
    }
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }

    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (q, _) if q > 1 => "off",
            (1, _) => "error",
            (_, 0) => "warn",
            (_, 1) => "fileutil=info",
            (_, 2) => "fileutil=debug",
            _ => "fileutil=trace",
        }
    }
}
