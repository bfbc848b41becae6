//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Mirror every specification archive of a release, resumably.
///
/// Scans the release's series listings, downloads each archive that is not
/// already recorded as complete, and keeps a state file so an interrupted or
/// partially failed run picks up where it left off.
#[derive(Parser, Debug)]
#[command(name = "specfetch")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Config file to read instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Release to download [default: 18]
    #[arg(short = 'r', long)]
    pub release: Option<String>,

    /// Maximum concurrent downloads (1-100) [default: 7]
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: Option<u8>,

    /// Listing root the series directories are joined onto
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Directory archives are written under [default: data/Rel-<release>]
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Directory holding the resume state file [default: .]
    #[arg(long, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// Only download links whose path ends with this suffix [default: .zip]
    #[arg(long)]
    pub suffix: Option<String>,

    /// Listing to scan, relative to the base URL (repeatable; replaces the defaults)
    #[arg(long = "listing", value_name = "ID")]
    pub listings: Vec<String>,

    /// HTTP connect timeout in seconds [default: 30]
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: Option<u64>,

    /// HTTP read timeout in seconds [default: 120]
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub read_timeout: Option<u64>,

    /// Keep the state file after a fully successful run
    #[arg(long)]
    pub keep_state: bool,

    /// List the files a run would download, then exit without downloading
    #[arg(long)]
    pub list: bool,
}

impl Args {
    /// Default log level implied by `-q` / `-v`.
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }
}
