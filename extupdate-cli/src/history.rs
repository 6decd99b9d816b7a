use extupdate_core::{render_history, HistoryResult, OutputFormatter};

use crate::{OutputFormat, OutputOptions};

pub fn print_history(result: &HistoryResult, options: OutputOptions) {
    // Handle output based on format
    match options.output {
        OutputFormat::Json => {
            println!("{}", result.format_json());
        },
        OutputFormat::Summary => {
            if !options.quiet {
                print!("{}", render_history(result, options.use_color));
            }
        },
    }
}
