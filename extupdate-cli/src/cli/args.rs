use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use super::types::{ConflictArg, OutputFormat};

const LONG_ABOUT: &str = "\
Swap spreadsheet file extensions in bulk.

Every file in FOLDER whose name ends with the source extension is renamed so
that it ends with the target extension instead. Only the name changes; file
contents are never rewritten, so this does not turn one spreadsheet format
into another.";

const AFTER_HELP: &str = "\
Warning: files are renamed in place. Pass --backup (or set `backup = true` in
.extupdate/config.toml) to keep a `.backup` copy of every file before it is
renamed.

Examples:
  extupdate scan ./reports --from xls
  extupdate convert ./reports --from .xls --to .xlsx --backup
  extupdate convert ./archive --from xlsm --to xltm --recursive
  extupdate history --limit 20";

/// Swap spreadsheet file extensions in bulk, with backups and a rename history
#[derive(Parser, Debug)]
#[command(name = "extupdate")]
#[command(author, version, about, long_about = LONG_ABOUT, after_help = AFTER_HELP)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Increase log verbosity (-v info, -vv debug). EXTUPDATE_LOG takes precedence
    #[arg(short = 'v', long = "verbose", global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Run as if started in <path> instead of the current working directory
    #[arg(short = 'C', global = true, value_name = "PATH")]
    pub directory: Option<PathBuf>,

    /// Use this history file instead of .extupdate/history.json
    #[arg(long, global = true, value_name = "FILE")]
    pub history_file: Option<PathBuf>,

    /// Assume yes for all prompts
    #[arg(short = 'y', long = "yes", global = true, env = "EXTUPDATE_YES")]
    pub yes: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the files a conversion would rename, without touching them
    Scan {
        /// Folder to scan
        folder: PathBuf,

        /// Extension to look for (default from config, else .xls)
        #[arg(long = "from", value_name = "EXT")]
        source: Option<String>,

        /// Include files in subfolders
        #[arg(short, long, conflicts_with = "no_recursive")]
        recursive: bool,

        /// Stay in the top folder, even if the config enables recursion
        #[arg(long)]
        no_recursive: bool,

        /// Output format for machine consumption
        #[arg(long, value_enum, default_value = "summary")]
        output: OutputFormat,

        /// Suppress all output
        #[arg(long)]
        quiet: bool,
    },

    /// Rename every matching file from one extension to another
    Convert {
        /// Folder containing the files to convert
        folder: PathBuf,

        /// Extension to convert from (default from config, else .xls)
        #[arg(long = "from", value_name = "EXT")]
        source: Option<String>,

        /// Extension to convert to (default from config, else .xlsx)
        #[arg(long = "to", value_name = "EXT")]
        target: Option<String>,

        /// Include files in subfolders
        #[arg(short, long, conflicts_with = "no_recursive")]
        recursive: bool,

        /// Stay in the top folder, even if the config enables recursion
        #[arg(long)]
        no_recursive: bool,

        /// Keep a `.backup` copy of each file before renaming it
        #[arg(long, conflicts_with = "no_backup")]
        backup: bool,

        /// Do not keep backups, even if the config enables them
        #[arg(long)]
        no_backup: bool,

        /// What to do when the renamed file already exists
        #[arg(long, value_enum)]
        on_conflict: Option<ConflictArg>,

        /// Output format for machine consumption
        #[arg(long, value_enum, default_value = "summary")]
        output: OutputFormat,

        /// Suppress all output
        #[arg(long)]
        quiet: bool,
    },

    /// Show past renames, newest first
    History {
        /// Limit number of entries
        #[arg(long)]
        limit: Option<usize>,

        /// Output format for machine consumption
        #[arg(long, value_enum, default_value = "summary")]
        output: OutputFormat,

        /// Suppress all output
        #[arg(long)]
        quiet: bool,
    },

    /// Delete every history entry (cannot be undone)
    ClearHistory {
        /// Output format for machine consumption
        #[arg(long, value_enum, default_value = "summary")]
        output: OutputFormat,

        /// Suppress all output
        #[arg(long)]
        quiet: bool,
    },

    /// List the known spreadsheet extensions
    Extensions {
        /// Output format for machine consumption
        #[arg(long, value_enum, default_value = "summary")]
        output: OutputFormat,
    },

    /// Show version information
    Version {
        /// Output format for machine consumption
        #[arg(long, value_enum, default_value = "summary")]
        output: OutputFormat,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,

        /// Write the completion file into this directory instead of stdout
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },
}
