use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(about, long_about = None, version)]
pub(crate) struct Args {
    #[command(subcommand)]
    pub(crate) command: Command,
    /// Treats a (possibly metered) network as available.
    #[arg(short, long, global = true, default_value_t)]
    pub(crate) network: bool,
    /// Treats an unmetered network as available.
    #[arg(short, long, global = true, default_value_t)]
    pub(crate) unmetered: bool,
    /// Monotonic clock reading, in nanoseconds, to start evaluating at.
    #[arg(
        short = 't',
        long,
        global = true,
        default_value_t = 0,
        allow_negative_numbers = true
    )]
    pub(crate) now_ns: i64,
    /// Enables human-friendly logging.
    #[arg(short, long, global = true, default_value_t)]
    pub(crate) debug: bool,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Prints whether each stored job may run right now.
    Check {
        /// YAML file holding a list of job records.
        file: PathBuf,
    },
    /// Re-evaluates the stored jobs as time passes, logging every change,
    /// until interrupted.
    Watch {
        /// YAML file holding a list of job records.
        file: PathBuf,
        /// How often to re-evaluate.
        #[arg(short, long, default_value_t = 1000)]
        interval_ms: u64,
    },
}
