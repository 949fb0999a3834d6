use std::path::{Path, PathBuf};

use crate::group::Group;
use crate::object::Object;

/// A directory the store does not interpret.
///
/// Raw directories hold whatever an application wants to keep next to
/// its datasets: vendor files, logs, images. They have no records, so
/// there are no attributes to read or write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raw {
    object: Object,
}

impl Raw {
    pub(crate) fn new(object: Object) -> Self {
        Self { object }
    }

    pub fn name(&self) -> String {
        self.object.name()
    }

    pub fn relative_path(&self) -> &Path {
        self.object.relative_path()
    }

    pub fn directory(&self) -> PathBuf {
        self.object.directory()
    }

    pub fn file_root(&self) -> &Path {
        self.object.file_root()
    }

    pub fn parent(&self) -> Option<Group> {
        self.object.parent()
    }
}
