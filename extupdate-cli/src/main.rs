use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use extupdate_core::{
    execute, Command, CommandOutcome, Config, ConversionJob, Extension, ExtensionError, JobError,
    LockHeld, OutputFormatter, VersionResult, Workspace,
};
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process;
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod clear_history;
mod cli;
mod convert;
mod extensions;
mod history;
mod scan;

use cli::{Cli, Commands, ConflictArg, OutputFormat, OutputOptions};

/// Environment variable holding a tracing filter, e.g. `extupdate_core=debug`
const LOG_ENV: &str = "EXTUPDATE_LOG";

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Handle -C directory flag
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir)
            .with_context(|| format!("Failed to change to directory: {}", dir.display()))
            .unwrap_or_else(|e| {
                eprintln!("Error: {e:#}");
                process::exit(2);
            });
    }

    let working_dir = std::env::current_dir().unwrap_or_else(|e| {
        eprintln!("Error: Failed to read current directory: {e}");
        process::exit(3);
    });

    // Load config to get defaults
    let config = Config::load(&working_dir).unwrap_or_else(|e| {
        let reason = format!("{e:#}");
        warn!(%reason, "ignoring unreadable config, using defaults");
        Config::default()
    });

    let mut workspace = Workspace::from_config(&working_dir, &config);
    if let Some(ref history_file) = cli.history_file {
        workspace = workspace.with_history_path(history_file);
    }

    let use_color = !cli.no_color
        && config
            .defaults
            .use_color
            .unwrap_or_else(|| io::stdout().is_terminal());

    let result = match cli.command {
        Commands::Scan {
            folder,
            source,
            recursive,
            no_recursive,
            output,
            quiet,
        } => parse_extension(source.as_deref(), &config.defaults.source_extension).and_then(
            |source| {
                let command = Command::Scan {
                    folder: working_dir.join(folder),
                    source,
                    recursive: resolve_recursive(recursive, no_recursive, &config),
                };
                run_command(command, &workspace, output_options(output, quiet, use_color))
            },
        ),

        Commands::Convert {
            folder,
            source,
            target,
            recursive,
            no_recursive,
            backup,
            no_backup,
            on_conflict,
            output,
            quiet,
        } => build_job(
            &config,
            &working_dir,
            JobArgs {
                folder,
                source,
                target,
                recursive,
                no_recursive,
                backup,
                no_backup,
                on_conflict,
            },
        )
        .and_then(|job| {
            run_command(
                Command::Convert(job),
                &workspace,
                output_options(output, quiet, use_color),
            )
        }),

        Commands::History {
            limit,
            output,
            quiet,
        } => run_command(
            Command::History { limit },
            &workspace,
            output_options(output, quiet, use_color),
        ),

        Commands::ClearHistory { output, quiet } => {
            clear_history::confirm_clear(&workspace, cli.yes).and_then(|confirmed| {
                if confirmed {
                    run_command(
                        Command::ClearHistory,
                        &workspace,
                        output_options(output, quiet, use_color),
                    )
                } else {
                    Ok(0)
                }
            })
        },

        Commands::Extensions { output } => {
            extensions::handle_extensions(&config, output).map(|()| 0)
        },

        Commands::Version { output } => handle_version(output).map(|()| 0),

        Commands::Completions { shell, dir } => {
            let mut cmd = Cli::command();
            match dir {
                Some(dir) => generate_completions(shell, &mut cmd, "extupdate", &dir).map(|()| 0),
                None => {
                    clap_complete::generate(shell, &mut cmd, "extupdate", &mut io::stdout());
                    Ok(0)
                },
            }
        },
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(exit_code(&e));
        },
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .try_init();
}

/// Map an error to the process exit code: 2 for anything the user can fix
/// by changing the command line, 3 for everything else
fn exit_code(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(job_err) = cause.downcast_ref::<JobError>() {
            return match job_err {
                JobError::Scan { .. } => 3,
                _ => 2,
            };
        }
        if cause.is::<ExtensionError>() || cause.is::<LockHeld>() {
            return 2;
        }
    }
    3
}

const fn output_options(output: OutputFormat, quiet: bool, use_color: bool) -> OutputOptions {
    OutputOptions {
        output,
        quiet,
        use_color,
    }
}

/// Hand `command` to the core and print its outcome. Returns the exit code.
fn run_command(command: Command, workspace: &Workspace, options: OutputOptions) -> Result<i32> {
    let mut progress = convert::ProgressLine::new(matches!(command, Command::Convert(_)), options);
    let outcome = execute(command, workspace, |p| progress.draw(p));
    progress.finish();

    match outcome? {
        CommandOutcome::Scanned(result) => scan::print_scan(&result, options),
        CommandOutcome::Converted(report) => {
            convert::print_report(&report, options);
            if report.has_failures() {
                return Ok(1);
            }
        },
        CommandOutcome::History(result) => history::print_history(&result, options),
        CommandOutcome::HistoryCleared(result) => clear_history::print_cleared(&result, options)?,
    }
    Ok(0)
}

fn parse_extension(arg: Option<&str>, default: &str) -> Result<Extension> {
    let ext = Extension::parse(arg.unwrap_or(default))?;
    if !ext.is_known() {
        warn!(extension = %ext, "not a known spreadsheet extension");
    }
    Ok(ext)
}

struct JobArgs {
    folder: PathBuf,
    source: Option<String>,
    target: Option<String>,
    recursive: bool,
    no_recursive: bool,
    backup: bool,
    no_backup: bool,
    on_conflict: Option<ConflictArg>,
}

/// Combine command-line flags with config defaults. Flags always win.
fn build_job(config: &Config, working_dir: &Path, args: JobArgs) -> Result<ConversionJob> {
    let defaults = &config.defaults;
    let source = parse_extension(args.source.as_deref(), &defaults.source_extension)?;
    let target = parse_extension(args.target.as_deref(), &defaults.target_extension)?;
    let backup = !args.no_backup && (args.backup || defaults.backup);

    Ok(ConversionJob::new(working_dir.join(args.folder), source, target)
        .recursive(resolve_recursive(args.recursive, args.no_recursive, config))
        .backup(backup)
        .on_conflict(args.on_conflict.map_or(defaults.on_conflict, Into::into)))
}

fn resolve_recursive(recursive: bool, no_recursive: bool, config: &Config) -> bool {
    !no_recursive && (recursive || config.defaults.recursive)
}

// Generate shell completions
pub fn generate_completions<G: clap_complete::Generator>(
    gen: G,
    cmd: &mut clap::Command,
    name: &str,
    out_dir: &Path,
) -> Result<()> {
    use clap_complete::generate_to;
    use std::fs;

    fs::create_dir_all(out_dir)?;
    let path = generate_to(gen, cmd, name, out_dir)?;
    println!("Generated completion file: {}", path.display());
    Ok(())
}

fn handle_version(output: OutputFormat) -> Result<()> {
    let version_result = VersionResult {
        name: "extupdate".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    println!("{}", version_result.format(output.into()));
    Ok(())
}
