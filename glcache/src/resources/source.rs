use std::{
    path::PathBuf,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use parking_lot::Mutex;

use crate::util::typedefs::{FastHashMap, SsoString};

/// Opaque modification marker. Only compared for equality.
pub type ModificationStamp = u64;

/// Answers "when did this origin last change?" for the hot-reload poll.
///
/// Queried without the cache lock held, so implementations may do blocking I/O.
pub trait ModificationSource: Send + Sync {
    /// `None` when the origin can't be queried right now.
    fn modification_stamp(&self, origin: &str) -> Option<ModificationStamp>;
}

impl<T: ModificationSource + ?Sized> ModificationSource for Arc<T> {
    fn modification_stamp(&self, origin: &str) -> Option<ModificationStamp> {
        (**self).modification_stamp(origin)
    }
}

/// Origins are paths relative to a root directory, stamped with their mtime in
/// milliseconds.
#[derive(Debug, Clone)]
pub struct FileSystemSource {
    root: PathBuf,
}

impl FileSystemSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ModificationSource for FileSystemSource {
    fn modification_stamp(&self, origin: &str) -> Option<ModificationStamp> {
        let path = self.root.join(origin);
        match std::fs::metadata(&path).and_then(|meta| meta.modified()) {
            Ok(modified) => Some(system_time_stamp(modified)),
            Err(err) => {
                log::trace!("No modification time for {}: {}", path.display(), err);
                None
            }
        }
    }
}

fn system_time_stamp(time: SystemTime) -> ModificationStamp {
    // Times before the epoch can only come from a badly set clock, fold them to zero.
    time.duration_since(UNIX_EPOCH)
        .map_or(0, |since| since.as_millis() as ModificationStamp)
}

/// Stamps set by hand. For embedded assets, editors that know when they save, and tests.
#[derive(Debug, Default)]
pub struct MemorySource {
    stamps: Mutex<FastHashMap<SsoString, ModificationStamp>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_stamp(&self, origin: &str, stamp: ModificationStamp) {
        self.stamps.lock().insert(SsoString::from(origin), stamp);
    }

    pub fn remove(&self, origin: &str) {
        self.stamps.lock().remove(origin);
    }
}

impl ModificationSource for MemorySource {
    fn modification_stamp(&self, origin: &str) -> Option<ModificationStamp> {
        self.stamps.lock().get(origin).copied()
    }
}
