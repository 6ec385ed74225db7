use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vigil")]
#[command(version)]
#[command(about = "Concurrent reachability prober for hosts, URLs and SSH endpoints", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format: text, json, csv
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub output_format: OutputFormat,

    /// Also append logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

/// How the final report is printed.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Streamed lines, sweep summaries and campaign totals
    Text,
    /// Pretty JSON of the whole campaign, printed once at the end
    Json,
    /// One row per outcome, printed once at the end
    Csv,
}

/// Where the targets of a sweep come from.
#[derive(Args, Clone, Debug, Default)]
pub struct TargetArgs {
    /// Targets, comma separated. Example: 8.8.8.8,1.1.1.1
    #[arg(short = 't', long)]
    pub targets: Option<String>,

    /// File with one target per line
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Clone, Debug)]
pub struct SweepArgs {
    /// Max concurrent probes (overrides the preset)
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Timeout per probe in milliseconds (overrides the preset)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Preset: fast, balanced, accurate
    #[arg(long, default_value = "balanced", value_parser = ["fast", "balanced", "accurate"])]
    pub preset: String,
}

#[derive(Args, Clone, Debug)]
pub struct ExecArgs {
    /// Remote login user
    #[arg(short, long, default_value = "root")]
    pub user: String,

    /// Private key used for the ssh session
    #[arg(short, long)]
    pub key_file: Option<PathBuf>,

    /// Command to run on every host
    #[arg(long = "command", default_value = "hostname")]
    pub remote_command: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ping hosts in parallel
    Ping {
        #[command(flatten)]
        targets: TargetArgs,

        #[command(flatten)]
        sweep: SweepArgs,

        /// Echo requests per host (1 or 2)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=2))]
        count: Option<u8>,
    },

    /// Fetch URLs in parallel and report status codes
    Fetch {
        #[command(flatten)]
        targets: TargetArgs,

        #[command(flatten)]
        sweep: SweepArgs,
    },

    /// Run one command on many hosts over ssh
    Exec {
        #[command(flatten)]
        targets: TargetArgs,

        #[command(flatten)]
        sweep: SweepArgs,

        #[command(flatten)]
        exec: ExecArgs,
    },

    /// Ping sweep, then fetch sweep, then optional remote-exec sweep
    Campaign {
        /// JSON campaign description; other campaign flags are ignored when set
        #[arg(long)]
        config: Option<PathBuf>,

        /// Host list for the ping sweep (built-in examples when omitted)
        #[arg(long)]
        hosts: Option<PathBuf>,

        /// URL list for the fetch sweep (built-in examples when omitted)
        #[arg(long)]
        urls: Option<PathBuf>,

        /// Host list for a trailing remote-exec sweep
        #[arg(long)]
        ssh_hosts: Option<PathBuf>,

        #[command(flatten)]
        sweep: SweepArgs,

        #[command(flatten)]
        exec: ExecArgs,
    },
}
