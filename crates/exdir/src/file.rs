//! Open files and the state their handles share.

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError,
    Weak,
};

use exdir_array::AccessMode;
use exdir_plugin::{Capability, Pipeline};
use exdir_store::layout::FILE_EXTENSION;
use exdir_store::{self as store, Entry, NamingRule, ObjectKind};
use tracing::{debug, warn};

use crate::config::{FileConfig, FileOptions, OpenMode};
use crate::dataset::Slot;
use crate::error::{ExdirError, Result};
use crate::group::Group;
use crate::node::Node;
use crate::object::Object;

// ---------------------------------------------------------------------------
// Lock helpers
// ---------------------------------------------------------------------------

// Poisoned locks are recovered, not propagated.

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum State {
    ReadWrite,
    ReadOnly,
    Closed,
}

/// Everything handles into one open file share.
pub(crate) struct FileCore {
    root: PathBuf,
    mode: OpenMode,
    state: RwLock<State>,
    naming_rule: NamingRule,
    pipeline: Pipeline,
    /// Mapping slots of dataset handles, for close-out only.
    datasets: Mutex<Vec<Weak<RwLock<Slot>>>>,
    /// Files opened to resolve external links, keyed by root.
    externals: Mutex<HashMap<PathBuf, File>>,
}

impl fmt::Debug for FileCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileCore")
            .field("root", &self.root)
            .field("mode", &self.mode)
            .field("state", &self.state())
            .field("naming_rule", &self.naming_rule)
            .field("plugins", &self.pipeline.plugins().len())
            .finish()
    }
}

impl FileCore {
    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn state(&self) -> State {
        *read_lock(&self.state)
    }

    pub(crate) fn naming_rule(&self) -> NamingRule {
        self.naming_rule
    }

    pub(crate) fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        match self.state() {
            State::Closed => Err(ExdirError::Closed),
            State::ReadOnly | State::ReadWrite => Ok(()),
        }
    }

    pub(crate) fn ensure_writable(&self) -> Result<()> {
        match self.state() {
            State::Closed => Err(ExdirError::Closed),
            State::ReadOnly => Err(ExdirError::ReadOnlyViolation),
            State::ReadWrite => Ok(()),
        }
    }

    /// How new dataset mappings are opened.
    pub(crate) fn access_mode(&self) -> AccessMode {
        match self.state() {
            State::ReadWrite => AccessMode::ReadWrite,
            State::ReadOnly | State::Closed => AccessMode::ReadOnly,
        }
    }

    pub(crate) fn register(&self, slot: &Arc<RwLock<Slot>>) {
        let mut datasets = lock(&self.datasets);
        datasets.retain(|weak| weak.strong_count() > 0);
        datasets.push(Arc::downgrade(slot));
    }

    /// Open (or reuse) the file an external link points into.
    ///
    /// Relative paths are taken from the directory holding this file.
    pub(crate) fn external(&self, file: &str) -> Result<File> {
        let path = Path::new(file);
        let path = if path.is_absolute() {
            with_extension(path)
        } else {
            let base = self.root.parent().unwrap_or(Path::new("/"));
            with_extension(&base.join(path))
        };

        let mut cache = lock(&self.externals);
        if let Some(open) = cache.get(&path) {
            return Ok(open.clone());
        }
        let mode = match self.state() {
            State::ReadOnly => OpenMode::ReadOnly,
            State::ReadWrite | State::Closed => OpenMode::ReadWrite,
        };
        let options = FileOptions {
            naming_rule: self.naming_rule,
            allow_remove: false,
            plugins: self.pipeline.plugins().to_vec(),
        };
        let opened = File::open_with(&path, mode, options)?;
        cache.insert(path, opened.clone());
        Ok(opened)
    }

    fn close(&self) -> Result<()> {
        {
            let mut state = write_lock(&self.state);
            if *state == State::Closed {
                return Ok(());
            }
            *state = State::Closed;
        }

        let mut result = Ok(());
        let slots = std::mem::take(&mut *lock(&self.datasets));
        let mut pinned = 0usize;
        for slot in slots.iter().filter_map(Weak::upgrade) {
            let released = match slot.try_write() {
                Ok(mut guard) => guard.release(),
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().release(),
                Err(TryLockError::WouldBlock) => {
                    pinned += 1;
                    match slot.try_read() {
                        Ok(guard) => guard.flush(),
                        Err(_) => Ok(()),
                    }
                }
            };
            if let Err(e) = released {
                result = result.and(Err(e));
            }
        }
        if pinned > 0 {
            warn!(
                root = %self.root.display(),
                pinned,
                "datasets in use during close keep their mapping until dropped"
            );
        }

        let externals = std::mem::take(&mut *lock(&self.externals));
        for file in externals.into_values() {
            if let Err(e) = file.close() {
                result = result.and(Err(e));
            }
        }
        debug!(root = %self.root.display(), "closed file");
        result
    }
}

/// `path` with `.exdir` appended unless it already ends that way.
pub(crate) fn with_extension(path: &Path) -> PathBuf {
    let path: PathBuf = path.components().collect();
    if path.extension().is_some_and(|ext| ext == FILE_EXTENSION) {
        return path;
    }
    let mut name = path.into_os_string();
    name.push(".");
    name.push(FILE_EXTENSION);
    PathBuf::from(name)
}

// ---------------------------------------------------------------------------
// File
// ---------------------------------------------------------------------------

/// An open exdir file.
///
/// A `File` dereferences to its root [`Group`]. Clones share the same open
/// state: closing one closes them all, along with every group, dataset and
/// attribute handle obtained through them.
///
/// ```no_run
/// use exdir::{File, OpenMode};
///
/// let file = File::open("experiment", OpenMode::Append)?;
/// let session = file.require_group("session")?;
/// session.attrs().set("subject", "mouse-12")?;
/// file.close()?;
/// # Ok::<(), exdir::ExdirError>(())
/// ```
#[derive(Clone, Debug)]
pub struct File {
    root: Group,
}

impl File {
    /// Open with default options.
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self> {
        Self::open_with(path, mode, FileOptions::default())
    }

    /// Open with settings read from a [`FileConfig`].
    pub fn from_config(path: impl AsRef<Path>, config: &FileConfig) -> Result<Self> {
        Self::open_with(path, config.mode, config.clone().into_options())
    }

    pub fn open_with(path: impl AsRef<Path>, mode: OpenMode, options: FileOptions) -> Result<Self> {
        Self::open_root(&with_extension(path.as_ref()), mode, options)
    }

    /// Open the root directory at exactly `root`, with no extension added.
    fn open_root(root: &Path, mode: OpenMode, options: FileOptions) -> Result<Self> {
        let root = std::path::absolute(root)?;
        let pipeline = Pipeline::new(options.plugins)?;

        let state = match store::classify(&root) {
            Entry::Object(ObjectKind::File) => match mode {
                OpenMode::ReadOnly => State::ReadOnly,
                OpenMode::ReadWrite | OpenMode::Append => State::ReadWrite,
                OpenMode::Exclusive => return Err(ExdirError::AlreadyExists(root)),
                OpenMode::Truncate => {
                    if !options.allow_remove {
                        return Err(ExdirError::AlreadyExists(root));
                    }
                    debug!(root = %root.display(), "removing existing file");
                    std::fs::remove_dir_all(&root)?;
                    create_root(&root, &pipeline)?;
                    State::ReadWrite
                }
            },
            Entry::Missing => match mode {
                OpenMode::ReadOnly | OpenMode::ReadWrite => {
                    return Err(ExdirError::not_found(root.display().to_string()))
                }
                OpenMode::Truncate | OpenMode::Exclusive | OpenMode::Append => {
                    create_root(&root, &pipeline)?;
                    State::ReadWrite
                }
            },
            Entry::Object(_) | Entry::Raw | Entry::NotADirectory => {
                return Err(ExdirError::NotAnObjectStore(root))
            }
        };

        debug!(root = %root.display(), %mode, "opened file");
        let core = Arc::new(FileCore {
            root,
            mode,
            state: RwLock::new(state),
            naming_rule: options.naming_rule,
            pipeline,
            datasets: Mutex::new(Vec::new()),
            externals: Mutex::new(HashMap::new()),
        });
        Ok(Self {
            root: Group::from_object(Object::root(core)),
        })
    }

    /// Open the file enclosing `path` and look up the object `path` names.
    pub fn locate(path: impl AsRef<Path>, mode: OpenMode) -> Result<(Self, Node)> {
        let (root, relative) = store::find_root(path.as_ref())?;
        // The enclosing root may predate the `.exdir` suffix.
        let file = Self::open_root(&root, mode, FileOptions::default())?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let node = file.get(&name)?;
        Ok((file, node))
    }

    /// Flush and release every dataset mapping, close externally linked
    /// files, and reject all later operations. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        self.root.core().close()
    }

    pub fn is_closed(&self) -> bool {
        self.root.core().state() == State::Closed
    }

    pub fn is_writable(&self) -> bool {
        self.root.core().state() == State::ReadWrite
    }

    /// The mode this file was opened with.
    pub fn mode(&self) -> OpenMode {
        self.root.core().mode
    }

    pub fn naming_rule(&self) -> NamingRule {
        self.root.core().naming_rule()
    }

    pub fn pipeline(&self) -> &Pipeline {
        self.root.core().pipeline()
    }

    pub fn root(&self) -> &Group {
        &self.root
    }
}

impl Deref for File {
    type Target = Group;

    fn deref(&self) -> &Group {
        &self.root
    }
}

impl PartialEq for File {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

fn create_root(root: &Path, pipeline: &Pipeline) -> Result<()> {
    store::create_object_directory(root, ObjectKind::File)?;
    let meta = pipeline.create_object(Capability::File, "/", root)?;
    Object::merge_meta_at(root, meta)
}
