use exdir_types::{ErrorKind, TypeError};
use thiserror::Error;

use crate::plugin::{Capability, Direction};

#[derive(Debug, Error)]
pub enum PluginError {
    /// No plugin is free to run next while some remain unordered.
    #[error("circular dependency among {capability} {direction} plugins: {}", plugins.join(", "))]
    CircularDependency {
        capability: Capability,
        direction: Direction,
        plugins: Vec<String>,
    },

    #[error("plugin {0:?} is registered twice")]
    DuplicatePlugin(String),

    /// The object was written by a plugin marked required that is not
    /// enabled for reading.
    #[error("required plugin {0:?} is not enabled")]
    MissingRequiredPlugin(String),

    /// A stage reported a failure.
    #[error("plugin {plugin:?} failed: {message}")]
    Stage { plugin: String, message: String },

    #[error(transparent)]
    Type(#[from] TypeError),
}

impl PluginError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CircularDependency { .. } => ErrorKind::CircularDependency,
            Self::MissingRequiredPlugin(_) => ErrorKind::MissingRequiredPlugin,
            Self::DuplicatePlugin(_) | Self::Stage { .. } => ErrorKind::Plugin,
            Self::Type(e) => e.kind(),
        }
    }

    /// Convenience for stage implementations.
    pub fn stage(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stage {
            plugin: plugin.into(),
            message: message.into(),
        }
    }
}

pub type PluginResult<T> = Result<T, PluginError>;
