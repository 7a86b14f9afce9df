/// Core domain types for linemark facts, breakpoints, and path encoding.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// An entry in the external breakpoint set. Ordered by (file, line) so
/// enumeration and the persisted list are deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Breakpoint {
    /// Target source file, encoded per the configured path style.
    pub file: PathBuf,
    /// Zero-based line number.
    pub line: u32,
}

/// A remembered source position. `content` always holds the exact line text
/// confirmed at `lineno` the last time this fact was captured or reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationFact {
    /// Exact text of the bookmarked line at last reconciliation.
    pub content: String,
    /// Set when fuzzy search exhausted its radius without an acceptable
    /// match; the position is kept but considered possibly wrong.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
    /// Bookmarked source file, encoded per the configured path style.
    pub file: PathBuf,
    /// Zero-based line number.
    pub lineno: u32,
    /// Revision at which `lineno` was last confirmed. Absent when the file
    /// lives outside version control.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

impl LocationFact {
    /// The breakpoint corresponding to this fact's current position.
    pub fn breakpoint(&self) -> Breakpoint {
        return Breakpoint { file: self.file.clone(), line: self.lineno };
    }
}

/// How fact and breakpoint file paths are written to disk. Injected into
/// every operation that encodes or resolves a path, so callers never read
/// configuration ambiently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathStyle {
    /// Store paths exactly as captured, absolute.
    Absolute,
    /// Store paths relative to the workspace root.
    Relative,
}

impl PathStyle {
    /// Encode a path for storage.
    pub fn encode(self, root: &Path, path: &Path) -> PathBuf {
        return match self {
            PathStyle::Absolute => {
                if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    root.join(path)
                }
            },
            PathStyle::Relative => path.strip_prefix(root).unwrap_or(path).to_path_buf(),
        };
    }

    /// Resolve a stored path to a location on disk.
    pub fn resolve(self, root: &Path, stored: &Path) -> PathBuf {
        if stored.is_absolute() {
            return stored.to_path_buf();
        }
        return root.join(stored);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_style_strips_root() {
        let style = PathStyle::Relative;
        let encoded = style.encode(Path::new("/work"), Path::new("/work/src/main.rs"));
        assert_eq!(encoded, PathBuf::from("src/main.rs"));
    }

    #[test]
    fn resolve_joins_relative_onto_root() {
        let style = PathStyle::Relative;
        let resolved = style.resolve(Path::new("/work"), Path::new("src/main.rs"));
        assert_eq!(resolved, PathBuf::from("/work/src/main.rs"));
    }

    #[test]
    fn optional_fields_omitted_when_empty() {
        let fact = LocationFact {
            content: "let x = 1;".to_string(),
            deleted: false,
            file: PathBuf::from("src/main.rs"),
            lineno: 3,
            revision: None,
        };
        let value = serde_json::to_value(&fact).unwrap();
        assert!(value.get("deleted").is_none());
        assert!(value.get("revision").is_none());
    }
}
