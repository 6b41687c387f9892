use std::{fmt, sync::Arc};

use fs::File;

use crate::CapsicumRights;

// Capability binds an open file to the rights a descriptor holds on it.
// Capabilities never wrap other capabilities and are never modified once
// built; narrowing produces a fresh one.
#[derive(Debug)]
pub struct Capability {
    rights: Arc<CapsicumRights>,
    underlying: Arc<File>,
}

impl Capability {
    pub(crate) fn new(rights: CapsicumRights, underlying: Arc<File>) -> Self {
        Self {
            rights: Arc::new(rights),
            underlying,
        }
    }

    #[inline]
    pub fn rights(&self) -> &Arc<CapsicumRights> {
        &self.rights
    }

    #[inline]
    pub(crate) fn underlying(&self) -> &Arc<File> {
        &self.underlying
    }
}

impl Drop for Capability {
    fn drop(&mut self) {
        logger::trace!(
            "dropping capability on {} ({} other references to the file)",
            self.underlying.name(),
            Arc::strong_count(&self.underlying) - 1
        );
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.rights, f)
    }
}

// FileRef is what a descriptor table slot holds: either a plain file or a
// capability wrapping one.
#[derive(Clone, Debug)]
pub enum FileRef {
    File(Arc<File>),
    Capability(Arc<Capability>),
}

impl FileRef {
    #[inline]
    pub fn is_capability(&self) -> bool {
        matches!(self, FileRef::Capability(_))
    }

    // rights returns the wrapped rights, None for a plain file.
    pub fn rights(&self) -> Option<&Arc<CapsicumRights>> {
        match self {
            FileRef::File(_) => None,
            FileRef::Capability(cap) => Some(cap.rights()),
        }
    }

    // same_file reports whether both entries end up at the same open file.
    pub fn same_file(&self, other: &FileRef) -> bool {
        Arc::ptr_eq(self.underlying(), other.underlying())
    }

    // same_entry reports whether both entries are the very same reference.
    pub fn same_entry(&self, other: &FileRef) -> bool {
        match (self, other) {
            (FileRef::File(a), FileRef::File(b)) => Arc::ptr_eq(a, b),
            (FileRef::Capability(a), FileRef::Capability(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub(crate) fn underlying(&self) -> &Arc<File> {
        match self {
            FileRef::File(file) => file,
            FileRef::Capability(cap) => cap.underlying(),
        }
    }
}

impl From<Arc<File>> for FileRef {
    fn from(file: Arc<File>) -> Self {
        FileRef::File(file)
    }
}

impl From<File> for FileRef {
    fn from(file: File) -> Self {
        FileRef::File(Arc::new(file))
    }
}
