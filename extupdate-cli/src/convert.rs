use extupdate_core::{render_conversion, ConversionReport, OutputFormatter, Progress};
use std::io::{self, IsTerminal, Write};

use crate::{OutputFormat, OutputOptions};

pub fn print_report(report: &ConversionReport, options: OutputOptions) {
    match options.output {
        OutputFormat::Json => {
            println!("{}", report.format_json());
        },
        OutputFormat::Summary => {
            if !options.quiet {
                print!("{}", render_conversion(report, options.use_color));
            }
        },
    }
}

/// Single self-overwriting progress line on stderr
pub struct ProgressLine {
    enabled: bool,
    drawn: bool,
}

impl ProgressLine {
    /// Only draws for summary output on an interactive stderr
    pub fn new(wanted: bool, options: OutputOptions) -> Self {
        Self {
            enabled: wanted && options.shows_summary() && io::stderr().is_terminal(),
            drawn: false,
        }
    }

    pub fn draw(&mut self, progress: &Progress) {
        if !self.enabled {
            return;
        }
        let mut stderr = io::stderr().lock();
        // Progress is best effort; a closed stderr must not fail the job
        let _ = write!(
            stderr,
            "\r\x1b[2K[{:>3}%] {}/{} {}",
            progress.percent(),
            progress.processed,
            progress.total,
            progress.current
        );
        let _ = stderr.flush();
        self.drawn = true;
    }

    /// End the line so the report starts on a fresh one
    pub fn finish(&self) {
        if self.drawn {
            eprintln!();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_line_disabled_for_json() {
        let options = OutputOptions {
            output: OutputFormat::Json,
            quiet: false,
            use_color: false,
        };
        let mut line = ProgressLine::new(true, options);
        line.draw(&Progress {
            processed: 1,
            total: 2,
            current: "a.xls".to_string(),
        });
        assert!(!line.drawn);
    }
}
