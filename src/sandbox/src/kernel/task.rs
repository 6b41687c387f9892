use std::sync::Arc;

use capsicum::FileRef;
use fs::{FdFlags, File};
use linux::CapRight;
use utils::SysResult;

use super::fd_table::FdTable;

// Task is a thread of the sandboxed process. Threads created with new_thread
// share one descriptor table.
#[derive(Clone, Debug)]
pub struct Task {
    fd_table: Arc<FdTable>,
}

impl Task {
    pub fn new(fd_table: FdTable) -> Self {
        Self {
            fd_table: Arc::new(fd_table),
        }
    }

    pub fn from_context() -> Self {
        Self::new(FdTable::from_context())
    }

    pub fn new_thread(&self) -> Self {
        Self {
            fd_table: Arc::clone(&self.fd_table),
        }
    }

    #[inline]
    pub fn fd_table(&self) -> &FdTable {
        &self.fd_table
    }

    pub fn get_file<I: IntoIterator<Item = CapRight>>(
        &self,
        fd: i32,
        rights: I,
    ) -> SysResult<Arc<File>> {
        self.fd_table.get_file(fd, rights)
    }

    pub fn new_fd_from(&self, fd: i32, file: &FileRef, flags: FdFlags) -> SysResult<i32> {
        self.fd_table.new_fd(fd, file, flags)
    }

    // install_file places a freshly opened file at the lowest free descriptor.
    pub fn install_file(&self, file: File, flags: FdFlags) -> SysResult<i32> {
        self.new_fd_from(0, &FileRef::from(file), flags)
    }
}
