use anyhow::Result;
use extupdate_core::{format_extensions, Config, Extension, EXCEL_EXTENSIONS};
use serde_json::json;

use crate::OutputFormat;

pub fn handle_extensions(config: &Config, output: OutputFormat) -> Result<()> {
    let source = normalized(&config.defaults.source_extension);
    let target = normalized(&config.defaults.target_extension);

    match output {
        OutputFormat::Json => {
            let listing = json!({
                "extensions": EXCEL_EXTENSIONS,
                "default_source": source,
                "default_target": target,
            });
            println!("{}", serde_json::to_string(&listing)?);
        },
        OutputFormat::Summary => {
            print!("{}", format_extensions(&source, &target));
        },
    }

    Ok(())
}

/// Config values may omit the leading dot
fn normalized(raw: &str) -> String {
    Extension::parse(raw).map_or_else(|_| raw.to_string(), |ext| ext.to_string())
}
