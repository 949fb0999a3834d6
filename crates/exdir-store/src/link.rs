use std::fmt;

use serde::{Deserialize, Serialize};

/// Target of a link directory.
///
/// Links are stored as their own directory whose meta record carries a
/// `link` section. Targets are not checked when the link is written.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Link {
    /// A path inside the same file. Absolute paths start at the root,
    /// relative paths at the group holding the link.
    Soft { target: String },
    /// A path inside another exdir file.
    External { file: String, target: String },
}

impl Link {
    pub fn soft(target: impl Into<String>) -> Self {
        Self::Soft {
            target: target.into(),
        }
    }

    pub fn external(file: impl Into<String>, target: impl Into<String>) -> Self {
        Self::External {
            file: file.into(),
            target: target.into(),
        }
    }

    pub fn target(&self) -> &str {
        match self {
            Self::Soft { target } | Self::External { target, .. } => target,
        }
    }

    pub fn file(&self) -> Option<&str> {
        match self {
            Self::Soft { .. } => None,
            Self::External { file, .. } => Some(file),
        }
    }

    pub fn is_soft(&self) -> bool {
        matches!(self, Self::Soft { .. })
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Soft { target } => write!(f, "-> {target}"),
            Self::External { file, target } => write!(f, "-> {file}:{target}"),
        }
    }
}
