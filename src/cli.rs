//! Command-line argument parsing for duneq.
//!
//! One subcommand per API operation, plus `watch` for the live TUI and
//! `key` for API key management.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::api::PerformanceTier;
use crate::config::Defaults;
use crate::output::OutputFormat;

/// A terminal client for the Dune Analytics query API.
#[derive(Parser, Debug)]
#[command(name = "duneq")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Dune API key (overrides DUNE_API_KEY, the keyring, and the config file)
    #[arg(long, global = true, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Config file path
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, global = true, value_enum, default_value = "table")]
    pub output: OutputFormat,

    /// Write results to a file instead of stdout
    #[arg(long, global = true, value_name = "PATH")]
    pub output_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Polling flags shared by the commands that wait for completion.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct PollArgs {
    /// Seconds between status checks
    #[arg(long, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// Give up waiting after this many seconds (the execution keeps running)
    #[arg(long, value_name = "SECS", conflicts_with = "no_max_wait")]
    pub max_wait: Option<u64>,

    /// Wait indefinitely (until interrupted)
    #[arg(long)]
    pub no_max_wait: bool,
}

impl PollArgs {
    /// Resolves the poll interval, falling back to the config default.
    pub fn interval(&self, defaults: &Defaults) -> Duration {
        self.poll_interval
            .map(|secs| Duration::from_secs(secs.max(1)))
            .unwrap_or_else(|| defaults.poll_interval())
    }

    /// Resolves the max wait, falling back to the config default.
    pub fn wait_budget(&self, defaults: &Defaults) -> Option<Duration> {
        if self.no_max_wait {
            return None;
        }
        self.max_wait
            .map(Duration::from_secs)
            .or_else(|| defaults.max_wait())
    }
}

/// Supported subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a saved query and wait for its results (consumes credits)
    Run {
        /// Saved query id (from the query URL: dune.com/queries/[ID])
        query_id: u64,

        /// Query parameter as name=value (repeatable)
        #[arg(short = 'P', long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,

        /// Execution performance tier
        #[arg(long, value_enum)]
        performance: Option<PerformanceTier>,

        #[command(flatten)]
        poll: PollArgs,
    },

    /// Start an async execution of a saved query and print its id
    Exec {
        /// Saved query id
        query_id: u64,

        /// Query parameter as name=value (repeatable)
        #[arg(short = 'P', long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,

        /// Execution performance tier
        #[arg(long, value_enum)]
        performance: Option<PerformanceTier>,
    },

    /// Check the status of an execution
    Status {
        /// Execution id returned by exec or sql --no-wait
        execution_id: String,
    },

    /// Fetch the results of an execution
    Results {
        /// Execution id
        execution_id: String,
    },

    /// Cancel an execution
    Cancel {
        /// Execution id
        execution_id: String,
    },

    /// Fetch the latest cached results without spending credits
    Latest {
        /// Saved query id
        query_id: u64,

        /// Reject results older than this many hours instead of returning them
        #[arg(long, value_name = "HOURS")]
        max_age_hours: Option<u64>,
    },

    /// Run ad-hoc SQL ({{name}} placeholders are filled from --param)
    Sql {
        /// SQL text; omit when using --file
        sql: Option<String>,

        /// Read the SQL from a file ("-" for stdin)
        #[arg(long, value_name = "PATH", conflicts_with = "sql")]
        file: Option<String>,

        /// Placeholder value as name=value (repeatable)
        #[arg(short = 'P', long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,

        /// Execution performance tier
        #[arg(long, value_enum)]
        performance: Option<PerformanceTier>,

        /// Submit and print the execution id instead of waiting
        #[arg(long)]
        no_wait: bool,

        #[command(flatten)]
        poll: PollArgs,
    },

    /// Watch an execution live in a terminal UI
    Watch {
        /// Execution id to attach to
        execution_id: String,

        #[command(flatten)]
        poll: PollArgs,
    },

    /// Manage the stored API key
    Key {
        #[command(subcommand)]
        command: KeyCommand,
    },
}

/// API key management subcommands.
#[derive(Subcommand, Debug)]
pub enum KeyCommand {
    /// Store an API key in the OS keyring
    Set {
        /// The key; read from stdin when omitted
        value: Option<String>,
    },
    /// Show the stored key (masked)
    Show,
    /// Remove the stored key
    Clear,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::Config::default_path)
    }
}
