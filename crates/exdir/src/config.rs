//! Open modes and per-file options.
//!
//! [`FileOptions`] is the programmatic form. [`FileConfig`] is its TOML
//! counterpart, used by the command line tool and anything else that wants
//! file settings from disk:
//!
//! ```toml
//! mode = "r+"
//! naming_rule = "strict"
//! allow_remove = false
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use exdir_plugin::Plugin;
use exdir_store::NamingRule;
use serde::{Deserialize, Serialize};

use crate::error::{ExdirError, Result};

/// How [`File::open`](crate::File::open) treats the root directory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpenMode {
    /// `r`: the file must exist; nothing may be written.
    #[serde(rename = "r")]
    ReadOnly,
    /// `r+`: the file must exist.
    #[serde(rename = "r+")]
    ReadWrite,
    /// `w`: create a fresh file, replacing an existing one only when
    /// [`FileOptions::allow_remove`] is set.
    #[serde(rename = "w")]
    Truncate,
    /// `x` (or `w-`): create a fresh file; fail if it exists.
    #[serde(rename = "x", alias = "w-")]
    Exclusive,
    /// `a`: open if present, create otherwise.
    #[default]
    #[serde(rename = "a")]
    Append,
}

impl OpenMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadOnly => "r",
            Self::ReadWrite => "r+",
            Self::Truncate => "w",
            Self::Exclusive => "x",
            Self::Append => "a",
        }
    }

    pub fn is_read_only(self) -> bool {
        self == Self::ReadOnly
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpenMode {
    type Err = ExdirError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "r" => Ok(Self::ReadOnly),
            "r+" => Ok(Self::ReadWrite),
            "w" => Ok(Self::Truncate),
            "x" | "w-" => Ok(Self::Exclusive),
            "a" => Ok(Self::Append),
            other => Err(ExdirError::Config(format!(
                "unknown open mode {other:?} (expected r, r+, w, x, w- or a)"
            ))),
        }
    }
}

/// Settings fixed for the lifetime of an open file.
#[derive(Clone, Debug, Default)]
pub struct FileOptions {
    pub naming_rule: NamingRule,
    /// Let [`OpenMode::Truncate`] delete an existing file.
    pub allow_remove: bool,
    pub plugins: Vec<Plugin>,
}

impl FileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn naming_rule(mut self, rule: NamingRule) -> Self {
        self.naming_rule = rule;
        self
    }

    pub fn allow_remove(mut self, allow: bool) -> Self {
        self.allow_remove = allow;
        self
    }

    pub fn plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn plugins(mut self, plugins: impl IntoIterator<Item = Plugin>) -> Self {
        self.plugins.extend(plugins);
        self
    }
}

/// File settings as read from a TOML document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub mode: OpenMode,
    pub naming_rule: NamingRule,
    pub allow_remove: bool,
}

impl FileConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ExdirError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
            .map_err(|e| ExdirError::Config(format!("{}: {e}", path.display())))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| ExdirError::Config(e.to_string()))
    }

    /// Options for opening with this configuration. Plugins are never
    /// configured from text and have to be added afterwards.
    pub fn into_options(self) -> FileOptions {
        FileOptions {
            naming_rule: self.naming_rule,
            allow_remove: self.allow_remove,
            plugins: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exdir_types::ErrorKind;

    #[test]
    fn mode_parses_short_forms() {
        assert_eq!("r".parse::<OpenMode>().unwrap(), OpenMode::ReadOnly);
        assert_eq!("r+".parse::<OpenMode>().unwrap(), OpenMode::ReadWrite);
        assert_eq!("w-".parse::<OpenMode>().unwrap(), OpenMode::Exclusive);
        assert_eq!("x".parse::<OpenMode>().unwrap(), OpenMode::Exclusive);
        assert!("rw".parse::<OpenMode>().is_err());
    }

    #[test]
    fn defaults_when_empty() {
        let config = FileConfig::from_toml_str("").unwrap();
        assert_eq!(config.mode, OpenMode::Append);
        assert_eq!(config.naming_rule, NamingRule::Thorough);
        assert!(!config.allow_remove);
    }

    #[test]
    fn reads_all_fields() {
        let config = FileConfig::from_toml_str(
            r#"
            mode = "w-"
            naming_rule = "strict"
            allow_remove = true
            "#,
        )
        .unwrap();
        assert_eq!(config.mode, OpenMode::Exclusive);
        assert_eq!(config.naming_rule, NamingRule::Strict);

        let options = config.into_options();
        assert!(options.allow_remove);
        assert!(options.plugins.is_empty());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = FileConfig::from_toml_str("compression = true").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    }

    #[test]
    fn round_trips_through_text() {
        let config = FileConfig {
            mode: OpenMode::ReadOnly,
            naming_rule: NamingRule::Minimal,
            allow_remove: false,
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(FileConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn load_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exdir.toml");
        std::fs::write(&path, "mode = 3").unwrap();
        let err = FileConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("exdir.toml"));
    }
}
