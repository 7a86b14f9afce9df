use std::path::Path;

use crate::error::Error;
use crate::types::PathStyle;

/// Project configuration loaded from `.linemark.toml`.
/// Everything has a default; the file only exists to override.
pub struct Config {
    /// On-disk name of the shared breakpoint list.
    pub breakpoints_file: String,
    /// How fact and breakpoint paths are stored.
    pub path_style: PathStyle,
    /// Fuzzy search radius in lines.
    pub search_radius: u32,
    /// On-disk name of the bookmark store.
    pub store_file: String,
}

/// Raw TOML structure for `.linemark.toml`.
#[derive(serde::Deserialize)]
struct LinemarkTomlConfig {
    #[serde(default)]
    breakpoints_file: Option<String>,
    #[serde(default)]
    path_style: Option<PathStyle>,
    #[serde(default)]
    search_radius: Option<u32>,
    #[serde(default)]
    store_file: Option<String>,
}

impl Default for Config {
    /// Relative paths, radius 16, dotfile names in the workspace root.
    fn default() -> Self {
        return Self {
            breakpoints_file: ".linemark-breakpoints.json".to_string(),
            path_style: PathStyle::Relative,
            search_radius: 16,
            store_file: ".linemark.json".to_string(),
        };
    }
}

impl Config {
    /// Load config from `.linemark.toml` in the given root directory.
    /// Returns the defaults if the file doesn't exist. Returns an error if
    /// the file exists but is malformed — never silently falls back to
    /// defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(".linemark.toml");
        let content = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };

        let raw: LinemarkTomlConfig = toml::from_str(&content)?;
        let defaults = Self::default();
        return Ok(Self {
            breakpoints_file: raw.breakpoints_file.unwrap_or(defaults.breakpoints_file),
            path_style: raw.path_style.unwrap_or(defaults.path_style),
            search_radius: raw.search_radius.unwrap_or(defaults.search_radius),
            store_file: raw.store_file.unwrap_or(defaults.store_file),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.search_radius, 16);
        assert_eq!(config.path_style, PathStyle::Relative);
        assert_eq!(config.store_file, ".linemark.json");
    }

    #[test]
    fn partial_file_overrides_only_named_keys() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".linemark.toml"),
            "search_radius = 40\npath_style = \"absolute\"\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.search_radius, 40);
        assert_eq!(config.path_style, PathStyle::Absolute);
        assert_eq!(config.breakpoints_file, ".linemark-breakpoints.json");
    }

    #[test]
    fn malformed_file_is_an_error_not_a_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".linemark.toml"), "search_radius = \"many\"\n").unwrap();
        assert!(matches!(Config::load(dir.path()), Err(Error::TomlDe(_))));
    }
}
