use extupdate_core::{render_scan, OutputFormatter, ScanResult};

use crate::{OutputFormat, OutputOptions};

pub fn print_scan(result: &ScanResult, options: OutputOptions) {
    match options.output {
        OutputFormat::Json => {
            println!("{}", result.format_json());
        },
        OutputFormat::Summary => {
            if !options.quiet {
                print!("{}", render_scan(result, options.use_color));
            }
        },
    }
}
