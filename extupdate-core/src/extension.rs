use crate::error::ExtensionError;
use serde::{Deserialize, Serialize};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::str::FromStr;

/// Spreadsheet extensions offered to users when picking a source or target
pub const EXCEL_EXTENSIONS: [&str; 8] = [
    ".xls", ".xlsx", ".xlsm", ".xlsb", ".xltx", ".xltm", ".xlt", ".xml",
];

/// A file extension, always stored with its leading dot
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Extension(String);

impl Extension {
    /// Normalize user input into an extension.
    ///
    /// Whitespace is trimmed and a leading dot is added when missing, so
    /// `xls`, `.xls` and ` .xls ` all produce `.xls`. Case is preserved:
    /// matching against file names is case-sensitive.
    pub fn parse(input: &str) -> Result<Self, ExtensionError> {
        let trimmed = input.trim();
        let body = trimmed.strip_prefix('.').unwrap_or(trimmed);

        if body.is_empty() {
            return Err(ExtensionError::Empty);
        }
        if body.contains('\0') {
            return Err(ExtensionError::ContainsNul(trimmed.to_string()));
        }
        if body.contains('/') || body.contains('\\') {
            return Err(ExtensionError::ContainsSeparator(trimmed.to_string()));
        }

        Ok(Self(format!(".{body}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is one of the [`EXCEL_EXTENSIONS`]
    pub fn is_known(&self) -> bool {
        EXCEL_EXTENSIONS.contains(&self.0.as_str())
    }

    /// True if `file_name` ends with this extension
    pub fn matches(&self, file_name: &str) -> bool {
        file_name.ends_with(&self.0)
    }

    /// Like [`Extension::matches`] for names straight from the filesystem,
    /// which need not be valid Unicode.
    pub fn matches_os(&self, file_name: &OsStr) -> bool {
        match file_name.to_str() {
            Some(name) => self.matches(name),
            None => os_suffix_matches(file_name, &self.0),
        }
    }
}

#[cfg(unix)]
fn os_suffix_matches(file_name: &OsStr, suffix: &str) -> bool {
    use std::os::unix::ffi::OsStrExt;
    file_name.as_bytes().ends_with(suffix.as_bytes())
}

// Invalid sequences become U+FFFD and never swallow the ASCII suffix
#[cfg(not(unix))]
fn os_suffix_matches(file_name: &OsStr, suffix: &str) -> bool {
    file_name.to_string_lossy().ends_with(suffix)
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Extension {
    type Err = ExtensionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Extension {
    type Error = ExtensionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Extension> for String {
    fn from(ext: Extension) -> Self {
        ext.0
    }
}

impl AsRef<str> for Extension {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Replace the trailing `source` suffix of `file_name` with `target`.
///
/// Only the matched suffix is removed; everything before it, including
/// other dots, is kept. Returns `None` when `file_name` does not end with
/// `source`.
pub fn swap_extension(file_name: &str, source: &Extension, target: &Extension) -> Option<String> {
    file_name
        .strip_suffix(source.as_str())
        .map(|stem| format!("{stem}{target}"))
}

/// [`swap_extension`] for raw file names.
///
/// On unix a name that is not valid UTF-8 is handled byte-wise, so it keeps
/// every byte before the suffix. Elsewhere such names yield `None`.
pub fn swap_extension_os(
    file_name: &OsStr,
    source: &Extension,
    target: &Extension,
) -> Option<OsString> {
    if let Some(name) = file_name.to_str() {
        return swap_extension(name, source, target).map(OsString::from);
    }
    swap_raw(file_name, source, target)
}

#[cfg(unix)]
fn swap_raw(file_name: &OsStr, source: &Extension, target: &Extension) -> Option<OsString> {
    use std::os::unix::ffi::{OsStrExt, OsStringExt};

    let stem = file_name.as_bytes().strip_suffix(source.as_str().as_bytes())?;
    let mut bytes = stem.to_vec();
    bytes.extend_from_slice(target.as_str().as_bytes());
    Some(OsString::from_vec(bytes))
}

#[cfg(not(unix))]
fn swap_raw(_file_name: &OsStr, _source: &Extension, _target: &Extension) -> Option<OsString> {
    None
}
