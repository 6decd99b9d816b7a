use anyhow::{anyhow, Result};
use extupdate_core::{ClearHistoryResult, History, OutputFormatter, Workspace};
use std::io::{self, BufRead, Write};

use crate::{OutputFormat, OutputOptions};

/// Ask before wiping a non-empty history unless `yes` was given
pub fn confirm_clear(workspace: &Workspace, yes: bool) -> Result<bool> {
    let pending = History::load_from_path(&workspace.history_path).len();
    if pending == 0 || yes {
        return Ok(true);
    }

    let prompt = format!(
        "Delete {pending} history entries from {}? This cannot be undone. [y/N]: ",
        workspace.history_path.display()
    );
    let confirmed = confirm_with_input(&prompt, &mut io::stdin().lock())?;
    if !confirmed {
        eprintln!("Aborted, history left unchanged");
    }
    Ok(confirmed)
}

pub fn print_cleared(result: &ClearHistoryResult, options: OutputOptions) -> Result<()> {
    match options.output {
        OutputFormat::Json => {
            println!("{}", result.format_json());
        },
        OutputFormat::Summary => {
            if !options.quiet {
                print!("{}", result.format_summary());
            }
        },
    }

    if result.status.is_saved() {
        Ok(())
    } else {
        Err(anyhow!(
            "Failed to clear history at {}",
            result.path.display()
        ))
    }
}

/// Ask a yes/no question on stderr. Anything but an explicit yes, including
/// end of input, counts as no.
fn confirm_with_input<R: BufRead>(prompt: &str, reader: &mut R) -> Result<bool> {
    eprint!("{prompt}");
    io::stderr().flush()?;

    let mut input = String::new();
    reader.read_line(&mut input)?;
    let choice = input.trim().to_lowercase();

    Ok(matches!(choice.as_str(), "y" | "yes"))
}
