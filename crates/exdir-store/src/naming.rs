//! Name validation for new objects.
//!
//! Every rule rejects:
//! - the empty name
//! - names containing `/`
//! - `.` and `..`
//! - the reserved names `exdir.yaml`, `attributes.yaml` and `__raw__`
//!
//! and reports an existing entry with the same name as `AlreadyExists`.
//! On top of that:
//! - `strict` allows only `[a-z0-9_-]`
//! - `thorough` allows `[a-z0-9_.-]` after lowercasing, rejects Windows
//!   device names, and rejects names that differ from an existing entry
//!   only by case

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::layout;

/// Names Windows refuses as file names, regardless of extension.
const DEVICE_NAMES: &[&str] = &[
    "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7", "com8",
    "com9", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

/// How strictly new object names are checked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingRule {
    None,
    Minimal,
    Strict,
    #[default]
    Thorough,
}

impl NamingRule {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Minimal => "minimal",
            Self::Strict => "strict",
            Self::Thorough => "thorough",
        }
    }

    /// Check that `name` may be created inside `parent`.
    ///
    /// # Examples
    ///
    /// ```
    /// use exdir_store::NamingRule;
    ///
    /// let dir = std::env::temp_dir().join("exdir-naming-doc-missing");
    /// assert!(NamingRule::Strict.validate(&dir, "trial_01").is_ok());
    /// assert!(NamingRule::Strict.validate(&dir, "Trial").is_err());
    /// assert!(NamingRule::None.validate(&dir, "__raw__").is_err());
    /// ```
    pub fn validate(self, parent: &Path, name: &str) -> StoreResult<()> {
        validate_always(name)?;
        if self == Self::Thorough && layout::is_reserved(&name.to_lowercase()) {
            return Err(StoreError::invalid_name(name, "name is reserved in any case"));
        }

        let target = parent.join(name);
        if target.symlink_metadata().is_ok() {
            return Err(StoreError::AlreadyExists(target));
        }

        match self {
            Self::None | Self::Minimal => Ok(()),
            Self::Strict => {
                if let Some(ch) = name.chars().find(|c| !is_strict_char(*c)) {
                    return Err(StoreError::invalid_name(
                        name,
                        format!("character {ch:?} is not allowed; use a-z, 0-9, '_' or '-'"),
                    ));
                }
                Ok(())
            }
            Self::Thorough => {
                let lower = name.to_lowercase();
                if let Some(ch) = lower.chars().find(|c| !is_thorough_char(*c)) {
                    return Err(StoreError::invalid_name(
                        name,
                        format!("character {ch:?} is not allowed; use a-z, 0-9, '_', '-' or '.'"),
                    ));
                }
                let stem = lower.split('.').next().unwrap_or_default();
                if DEVICE_NAMES.contains(&stem) {
                    return Err(StoreError::invalid_name(name, "reserved device name"));
                }
                check_case_collision(parent, name, &lower)
            }
        }
    }
}

fn validate_always(name: &str) -> StoreResult<()> {
    if name.is_empty() {
        return Err(StoreError::invalid_name(name, "name must not be empty"));
    }
    if name.contains('/') {
        return Err(StoreError::invalid_name(name, "name must not contain '/'"));
    }
    if name == "." || name == ".." {
        return Err(StoreError::invalid_name(name, "name must not be '.' or '..'"));
    }
    if layout::is_reserved(name) {
        return Err(StoreError::invalid_name(name, "name is reserved"));
    }
    Ok(())
}

fn check_case_collision(parent: &Path, name: &str, lower: &str) -> StoreResult<()> {
    let entries = match std::fs::read_dir(parent) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    for entry in entries {
        let entry = entry?;
        let existing = entry.file_name().to_string_lossy().into_owned();
        if existing != name && existing.to_lowercase() == lower {
            return Err(StoreError::NameConflict {
                name: name.to_string(),
                existing,
            });
        }
    }
    Ok(())
}

fn is_strict_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-'
}

fn is_thorough_char(c: char) -> bool {
    is_strict_char(c) || c == '.'
}

impl fmt::Display for NamingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NamingRule {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "minimal" => Ok(Self::Minimal),
            "strict" => Ok(Self::Strict),
            "thorough" => Ok(Self::Thorough),
            other => Err(StoreError::invalid_name(
                other,
                "naming rule must be one of none, minimal, strict, thorough",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exdir_types::ErrorKind;
    use proptest::prelude::*;

    const ALL_RULES: [NamingRule; 4] = [
        NamingRule::None,
        NamingRule::Minimal,
        NamingRule::Strict,
        NamingRule::Thorough,
    ];

    fn kind_of(rule: NamingRule, parent: &Path, name: &str) -> Option<ErrorKind> {
        rule.validate(parent, name).err().map(|e| e.kind())
    }

    #[test]
    fn always_applied_checks() {
        let dir = tempfile::tempdir().unwrap();
        for rule in ALL_RULES {
            for bad in ["", ".", "..", "a/b", "exdir.yaml", "attributes.yaml", "__raw__"] {
                assert_eq!(
                    kind_of(rule, dir.path(), bad),
                    Some(ErrorKind::InvalidName),
                    "{rule} accepted {bad:?}"
                );
            }
        }
    }

    #[test]
    fn existing_entry_is_already_exists_for_every_rule() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("trial")).unwrap();
        for rule in ALL_RULES {
            assert_eq!(
                kind_of(rule, dir.path(), "trial"),
                Some(ErrorKind::AlreadyExists)
            );
        }
    }

    #[test]
    fn strict_rejects_uppercase_and_dots() {
        let dir = tempfile::tempdir().unwrap();
        assert!(NamingRule::Strict.validate(dir.path(), "a_b-1").is_ok());
        assert_eq!(
            kind_of(NamingRule::Strict, dir.path(), "Ab"),
            Some(ErrorKind::InvalidName)
        );
        assert_eq!(
            kind_of(NamingRule::Strict, dir.path(), "a.b"),
            Some(ErrorKind::InvalidName)
        );
    }

    #[test]
    fn thorough_allows_mixed_case_and_dots() {
        let dir = tempfile::tempdir().unwrap();
        assert!(NamingRule::Thorough.validate(dir.path(), "Spikes.v2").is_ok());
        assert_eq!(
            kind_of(NamingRule::Thorough, dir.path(), "spaces here"),
            Some(ErrorKind::InvalidName)
        );
        assert_eq!(
            kind_of(NamingRule::Thorough, dir.path(), "ümlaut"),
            Some(ErrorKind::InvalidName)
        );
    }

    #[test]
    fn thorough_rejects_device_names() {
        let dir = tempfile::tempdir().unwrap();
        for bad in ["con", "NUL", "com1", "lpt9.txt", "aux.tar.gz"] {
            assert_eq!(
                kind_of(NamingRule::Thorough, dir.path(), bad),
                Some(ErrorKind::InvalidName),
                "{bad}"
            );
        }
        assert!(NamingRule::Thorough.validate(dir.path(), "console").is_ok());
        assert!(NamingRule::Minimal.validate(dir.path(), "con").is_ok());
    }

    #[test]
    fn thorough_rejects_reserved_names_in_any_case() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("exdir.yaml"), "").unwrap();
        for bad in ["__RAW__", "Attributes.yaml", "EXDIR.yaml"] {
            assert_eq!(
                kind_of(NamingRule::Thorough, dir.path(), bad),
                Some(ErrorKind::InvalidName),
                "{bad}"
            );
        }
        assert!(NamingRule::Minimal.validate(dir.path(), "__RAW__").is_ok());
    }

    #[test]
    fn thorough_detects_case_collisions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("Session")).unwrap();
        assert_eq!(
            kind_of(NamingRule::Thorough, dir.path(), "session"),
            Some(ErrorKind::NameConflict)
        );
        assert!(NamingRule::Minimal.validate(dir.path(), "session").is_ok());
    }

    #[test]
    fn parse_and_display() {
        for rule in ALL_RULES {
            assert_eq!(rule.to_string().parse::<NamingRule>().unwrap(), rule);
        }
        assert!("loose".parse::<NamingRule>().is_err());
        assert_eq!(NamingRule::default(), NamingRule::Thorough);
    }

    proptest! {
        #[test]
        fn strict_names_pass_every_rule(name in "[a-z0-9_-]{1,24}") {
            let dir = std::env::temp_dir().join("exdir-naming-proptest-missing");
            prop_assume!(!DEVICE_NAMES.contains(&name.as_str()));
            for rule in ALL_RULES {
                prop_assert!(rule.validate(&dir, &name).is_ok());
            }
        }

        #[test]
        fn slashes_are_always_rejected(a in "[a-z]{1,8}", b in "[a-z]{1,8}") {
            let dir = std::env::temp_dir().join("exdir-naming-proptest-missing");
            let name = format!("{a}/{b}");
            for rule in ALL_RULES {
                prop_assert_eq!(kind_of(rule, &dir, &name), Some(ErrorKind::InvalidName));
            }
        }
    }
}
