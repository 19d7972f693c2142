//! Command-line front end for the fileutil library.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use fileutil::ZipFileEntry;
use fileutil::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v/-q
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match &cli.command {
        Command::Copy { src, dest } => {
            fileutil::copy_file(src, dest)
                .await
                .with_context(|| format!("copying {}", src.display()))?;
        }
        Command::Unzip { archive, dest_dir } => {
            fileutil::unzip_file(archive, dest_dir)
                .await
                .with_context(|| format!("extracting {}", archive.display()))?;
        }
        Command::ZipDir {
            src_dir,
            archive,
            compression,
        } => {
            fileutil::zip_dir_with(src_dir, archive, &compression.options())
                .await
                .with_context(|| format!("zipping {}", src_dir.display()))?;
            report_written(&cli, archive).await?;
        }
        Command::ZipFile {
            src,
            archive,
            compression,
        } => {
            fileutil::zip_file_with(src, archive, &compression.options())
                .await
                .with_context(|| format!("zipping {}", src.display()))?;
            report_written(&cli, archive).await?;
        }
        Command::List { archive, long } => {
            let entries = fileutil::list_archive(archive)
                .await
                .with_context(|| format!("reading {}", archive.display()))?;
            list_files(&entries, *long);
        }
    }

    Ok(())
}

/// Print the size of a freshly written archive.
async fn report_written(cli: &Cli, archive: &Path) -> Result<()> {
    if !cli.is_quiet() {
        let size = tokio::fs::metadata(archive).await?.len();
        eprintln!("Wrote {} ({})", archive.display(), format_size(size));
    }
    Ok(())
}

/// List files in the ZIP archive.
///
/// The long format (`-l`) is a table with size, compression ratio and
/// timestamps followed by a totals line; otherwise one name per line.
fn list_files(entries: &[ZipFileEntry], long: bool) {
    if long {
        println!(
            "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
            "Length", "Size", "Cmpr", "Date", "Time"
        );
        println!("{}", "-".repeat(70));
    }

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in entries {
        if !long {
            println!("{}", entry.file_name);
            continue;
        }

        let (year, month, day) = entry.mod_date();
        let (hour, minute, _second) = entry.mod_time();

        println!(
            "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
            entry.uncompressed_size,
            entry.compressed_size,
            ratio(entry.compressed_size, entry.uncompressed_size),
            year,
            month,
            day,
            hour,
            minute,
            entry.file_name
        );

        if !entry.is_directory {
            total_uncompressed += entry.uncompressed_size;
            total_compressed += entry.compressed_size;
            file_count += 1;
        }
    }

    if long {
        println!("{}", "-".repeat(70));
        println!(
            "{:>10}  {:>10}  {}  {:>21}  {} files",
            total_uncompressed,
            total_compressed,
            ratio(total_compressed, total_uncompressed),
            "",
            file_count
        );
    }
}

/// Space saved by compression, as a right-aligned percentage.
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed > 0 && compressed <= uncompressed {
        format!("{:>4}%", 100 - (compressed * 100 / uncompressed))
    } else {
        "  0%".to_string()
    }
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
