use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "leavebook")]
#[command(about = "Record and view team leave from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub global: GlobalOptions,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Optional path to the config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Base URL of the shared leave store
    #[arg(long, global = true, value_name = "URL")]
    pub remote_url: Option<String>,

    /// Work from the local copy only
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record a leave period
    #[command(alias = "add")]
    Submit {
        /// Who is on leave
        name: String,
        /// First day (YYYY-MM-DD)
        start: String,
        /// Last day (YYYY-MM-DD)
        end: String,
        /// Record even if it overlaps existing leave for the same person
        #[arg(long)]
        allow_overlap: bool,
    },
    /// List all leave records
    List {
        /// Only show this person
        #[arg(long)]
        name: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show who is on leave on a day
    Day {
        /// Day to show (YYYY-MM-DD, default today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show leave intersecting a month
    Month {
        /// Month to show (YYYY-MM, default this month)
        month: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a period for overlapping leave without recording it
    Check {
        /// Who would be on leave
        name: String,
        /// First day (YYYY-MM-DD)
        start: String,
        /// Last day (YYYY-MM-DD)
        end: String,
        /// Ignore this record id
        #[arg(long, value_name = "ID")]
        exclude: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a leave record
    #[command(alias = "rm")]
    Delete {
        /// Record id
        id: String,
    },
    /// Remove duplicate submissions of the same leave
    Cleanup {
        /// Only list the duplicates
        #[arg(long)]
        dry_run: bool,
    },
    /// Pull the shared store once
    Sync {
        /// Push the local records afterwards
        #[arg(long)]
        push: bool,
    },
    /// Keep refreshing from the shared store until interrupted
    Watch,
    /// Export records
    Export {
        /// Export format
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
        /// Write a replacement data.json for the shared folder
        #[arg(long, conflicts_with_all = ["format", "output"])]
        manual: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Markdown,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
