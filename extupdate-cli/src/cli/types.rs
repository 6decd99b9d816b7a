use clap::ValueEnum;
use extupdate_core::ConflictPolicy;

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Summary,
    Json,
}

impl From<OutputFormat> for extupdate_core::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Summary => Self::Summary,
            OutputFormat::Json => Self::Json,
        }
    }
}

/// What to do when the renamed file already exists
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ConflictArg {
    /// Leave both files alone and report the file as failed
    Skip,
    /// Replace the existing file
    Overwrite,
}

impl From<ConflictArg> for ConflictPolicy {
    fn from(arg: ConflictArg) -> Self {
        match arg {
            ConflictArg::Skip => Self::Skip,
            ConflictArg::Overwrite => Self::Overwrite,
        }
    }
}

/// How a command's result is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputOptions {
    pub output: OutputFormat,
    pub quiet: bool,
    pub use_color: bool,
}

impl OutputOptions {
    /// Whether human-readable text goes to stdout
    pub fn shows_summary(self) -> bool {
        self.output == OutputFormat::Summary && !self.quiet
    }
}
