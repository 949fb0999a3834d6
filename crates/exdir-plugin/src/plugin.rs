//! Plugin descriptors.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::stage::{AttributeStage, DatasetStage, ObjectStage};

/// The kind of object a stage applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    Dataset,
    Attribute,
    Group,
    File,
    Raw,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::Dataset,
        Capability::Attribute,
        Capability::Group,
        Capability::File,
        Capability::Raw,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Dataset => "dataset",
            Self::Attribute => "attribute",
            Self::Group => "group",
            Self::File => "file",
            Self::Raw => "raw",
        })
    }
}

/// Whether data is going to disk or coming back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Write,
    Read,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Write => "write",
            Self::Read => "read",
        })
    }
}

/// Ordering constraints relative to other plugins, by name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Constraints {
    pub write_before: BTreeSet<String>,
    pub write_after: BTreeSet<String>,
    pub read_before: BTreeSet<String>,
    pub read_after: BTreeSet<String>,
}

impl Constraints {
    pub fn before(&self, direction: Direction) -> &BTreeSet<String> {
        match direction {
            Direction::Write => &self.write_before,
            Direction::Read => &self.read_before,
        }
    }

    pub fn after(&self, direction: Direction) -> &BTreeSet<String> {
        match direction {
            Direction::Write => &self.write_after,
            Direction::Read => &self.read_after,
        }
    }
}

/// A named bundle of stages plus the constraints that place it in the
/// pipeline.
///
/// ```
/// use exdir_plugin::Plugin;
///
/// let plugin = Plugin::new("units").write_before(["compression"]).required(true);
/// assert_eq!(plugin.name(), "units");
/// assert!(plugin.is_required());
/// ```
#[derive(Clone)]
pub struct Plugin {
    name: String,
    constraints: Constraints,
    required: bool,
    dataset: Option<Arc<dyn DatasetStage>>,
    attribute: Option<Arc<dyn AttributeStage>>,
    group: Option<Arc<dyn ObjectStage>>,
    file: Option<Arc<dyn ObjectStage>>,
    raw: Option<Arc<dyn ObjectStage>>,
}

fn names<I, S>(names: I) -> impl Iterator<Item = String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(Into::into)
}

impl Plugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraints: Constraints::default(),
            required: false,
            dataset: None,
            attribute: None,
            group: None,
            file: None,
            raw: None,
        }
    }

    pub fn write_before<I: IntoIterator<Item = S>, S: Into<String>>(mut self, other: I) -> Self {
        self.constraints.write_before.extend(names(other));
        self
    }

    pub fn write_after<I: IntoIterator<Item = S>, S: Into<String>>(mut self, other: I) -> Self {
        self.constraints.write_after.extend(names(other));
        self
    }

    pub fn read_before<I: IntoIterator<Item = S>, S: Into<String>>(mut self, other: I) -> Self {
        self.constraints.read_before.extend(names(other));
        self
    }

    pub fn read_after<I: IntoIterator<Item = S>, S: Into<String>>(mut self, other: I) -> Self {
        self.constraints.read_after.extend(names(other));
        self
    }

    /// Objects written by a required plugin refuse to be read without it.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn dataset(mut self, stage: impl DatasetStage + 'static) -> Self {
        self.dataset = Some(Arc::new(stage));
        self
    }

    pub fn attribute(mut self, stage: impl AttributeStage + 'static) -> Self {
        self.attribute = Some(Arc::new(stage));
        self
    }

    pub fn group(mut self, stage: impl ObjectStage + 'static) -> Self {
        self.group = Some(Arc::new(stage));
        self
    }

    pub fn file(mut self, stage: impl ObjectStage + 'static) -> Self {
        self.file = Some(Arc::new(stage));
        self
    }

    pub fn raw(mut self, stage: impl ObjectStage + 'static) -> Self {
        self.raw = Some(Arc::new(stage));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::Dataset => self.dataset.is_some(),
            Capability::Attribute => self.attribute.is_some(),
            Capability::Group => self.group.is_some(),
            Capability::File => self.file.is_some(),
            Capability::Raw => self.raw.is_some(),
        }
    }

    pub(crate) fn dataset_stage(&self) -> Option<&dyn DatasetStage> {
        self.dataset.as_deref()
    }

    pub(crate) fn attribute_stage(&self) -> Option<&dyn AttributeStage> {
        self.attribute.as_deref()
    }

    pub(crate) fn object_stage(&self, capability: Capability) -> Option<&dyn ObjectStage> {
        match capability {
            Capability::Group => self.group.as_deref(),
            Capability::File => self.file.as_deref(),
            Capability::Raw => self.raw.as_deref(),
            Capability::Dataset | Capability::Attribute => None,
        }
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let capabilities: Vec<Capability> = Capability::ALL
            .into_iter()
            .filter(|c| self.has(*c))
            .collect();
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("required", &self.required)
            .field("capabilities", &capabilities)
            .field("constraints", &self.constraints)
            .finish()
    }
}
