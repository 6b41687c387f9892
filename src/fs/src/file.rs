use std::sync::{
    atomic::{AtomicI32, AtomicI64, Ordering},
    RwLock,
};

use utils::{bail_libc, SysError, SysResult};

use crate::{attr::UnstableAttr, seek::SeekWhence, FileOperations};

pub const FILE_MAX_OFFSET: i64 = i64::MAX;

// File is an open file description. It is shared between descriptor table
// entries (and capability wrappers) through Arc and torn down when the last
// reference goes away.
#[derive(Debug)]
pub struct File {
    name: String,
    flags: RwLock<FileFlags>,
    file_operations: Box<dyn FileOperations>,
    offset: AtomicI64,
    owner: AtomicI32,
}

impl File {
    pub fn new(name: String, flags: FileFlags, file_operations: Box<dyn FileOperations>) -> Self {
        Self {
            name,
            flags: RwLock::new(flags),
            file_operations,
            offset: AtomicI64::new(0),
            owner: AtomicI32::new(0),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn flags(&self) -> FileFlags {
        *self.flags.read().unwrap()
    }

    #[inline]
    pub fn offset(&self) -> i64 {
        self.offset.load(Ordering::SeqCst)
    }

    pub fn set_flags(&self, new_flags: SettableFileFlags) {
        let mut flags = self.flags.write().unwrap();
        flags.direct = new_flags.direct;
        flags.non_blocking = new_flags.non_blocking;
        flags.append = new_flags.append;
        flags.async_ = new_flags.async_;
    }

    pub fn owner(&self) -> i32 {
        self.owner.load(Ordering::SeqCst)
    }

    pub fn set_owner(&self, pid: i32) {
        self.owner.store(pid, Ordering::SeqCst);
    }

    pub fn read(&self, dst: &mut [u8]) -> SysResult<usize> {
        let flags = self.flags();
        if !flags.read {
            bail_libc!(libc::EBADF);
        }
        let n = self
            .file_operations
            .read(flags, dst, self.offset.load(Ordering::SeqCst))?;
        if n > 0 && !flags.non_seekable {
            self.offset.fetch_add(n as i64, Ordering::SeqCst);
        }
        Ok(n)
    }

    pub fn pread(&self, dst: &mut [u8], offset: i64) -> SysResult<usize> {
        let flags = self.flags();
        if offset < 0 || offset.checked_add(dst.len() as i64).is_none() {
            bail_libc!(libc::EINVAL);
        }
        if !flags.pread {
            bail_libc!(libc::ESPIPE);
        }
        if !flags.read {
            bail_libc!(libc::EBADF);
        }
        self.file_operations.read(flags, dst, offset)
    }

    pub fn write(&self, src: &[u8]) -> SysResult<usize> {
        let flags = self.flags();
        if !flags.write {
            bail_libc!(libc::EBADF);
        }
        if flags.append {
            self.offset_for_append()?;
        }
        let offset = self.offset.load(Ordering::SeqCst);
        let n = self.file_operations.write(flags, src, offset)?;
        if !flags.non_seekable {
            self.offset.fetch_add(n as i64, Ordering::SeqCst);
        }
        Ok(n)
    }

    pub fn pwrite(&self, src: &[u8], offset: i64) -> SysResult<usize> {
        let flags = self.flags();
        if offset < 0 || offset.checked_add(src.len() as i64).is_none() {
            bail_libc!(libc::EINVAL);
        }
        if !flags.pwrite {
            bail_libc!(libc::ESPIPE);
        }
        if !flags.write {
            bail_libc!(libc::EBADF);
        }
        self.file_operations.write(flags, src, offset)
    }

    fn offset_for_append(&self) -> SysResult<()> {
        let uattr = self
            .file_operations
            .unstable_attr()
            .map_err(|_| SysError::new(libc::EIO))?;
        self.offset.store(uattr.size, Ordering::SeqCst);
        Ok(())
    }

    pub fn seek(&self, whence: SeekWhence, offset: i64) -> SysResult<i64> {
        let current = self.offset();
        let new_offset = self.file_operations.seek(whence, current, offset)?;
        self.offset.store(new_offset, Ordering::SeqCst);
        Ok(new_offset)
    }

    pub fn unstable_attr(&self) -> SysResult<UnstableAttr> {
        self.file_operations.unstable_attr()
    }

    pub fn ioctl(&self, request: u64) -> SysResult<usize> {
        self.file_operations.ioctl(request, self.offset())
    }

    pub fn flush(&self) -> SysResult<()> {
        self.file_operations.flush()
    }
}

impl Drop for File {
    fn drop(&mut self) {
        logger::trace!("releasing last reference to {}", self.name);
        if let Err(e) = self.file_operations.close() {
            logger::warn!("closing {} failed: {}", self.name, e);
        }
    }
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileFlags {
    pub direct: bool,
    pub dsync: bool,
    pub sync: bool,
    pub append: bool,
    pub non_blocking: bool,
    pub read: bool,
    pub write: bool,
    pub pread: bool,
    pub pwrite: bool,
    pub async_: bool,
    pub large_file: bool,
    pub non_seekable: bool,
}

impl FileFlags {
    pub fn from_linux_flags(mask: i32) -> Self {
        Self {
            direct: mask & libc::O_DIRECT != 0,
            dsync: mask & (libc::O_DSYNC | libc::O_SYNC) != 0,
            sync: mask & libc::O_SYNC != 0,
            non_blocking: mask & libc::O_NONBLOCK != 0,
            read: (mask & libc::O_ACCMODE) != libc::O_WRONLY,
            write: (mask & libc::O_ACCMODE) != libc::O_RDONLY,
            pread: false,
            pwrite: false,
            append: mask & libc::O_APPEND != 0,
            async_: mask & libc::O_ASYNC != 0,
            large_file: mask & libc::O_LARGEFILE != 0,
            non_seekable: false,
        }
    }

    pub fn to_linux_flags(self) -> i32 {
        let mut mask = 0;
        if self.read && self.write {
            mask |= libc::O_RDWR;
        } else if self.read {
            mask |= libc::O_RDONLY;
        } else if self.write {
            mask |= libc::O_WRONLY;
        }
        if self.direct {
            mask |= libc::O_DIRECT;
        }
        if self.non_blocking {
            mask |= libc::O_NONBLOCK;
        }
        if self.dsync {
            mask |= libc::O_DSYNC;
        }
        if self.sync {
            mask |= libc::O_SYNC;
        }
        if self.append {
            mask |= libc::O_APPEND;
        }
        if self.async_ {
            mask |= libc::O_ASYNC;
        }
        if self.large_file {
            mask |= libc::O_LARGEFILE;
        }
        mask
    }

    pub fn as_settable(&self) -> SettableFileFlags {
        SettableFileFlags {
            direct: self.direct,
            non_blocking: self.non_blocking,
            append: self.append,
            async_: self.async_,
        }
    }
}

#[derive(Copy, Clone, Default, Debug)]
pub struct SettableFileFlags {
    pub direct: bool,
    pub non_blocking: bool,
    pub append: bool,
    pub async_: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_test_utils::{new_test_file, TEST_CONTENTS};

    #[test]
    fn read_advances_offset() {
        let file = new_test_file();
        let mut buf = [0; 4];
        assert_eq!(file.read(&mut buf), Ok(4));
        assert_eq!(&buf, &TEST_CONTENTS[..4]);
        assert_eq!(file.offset(), 4);
    }

    #[test]
    fn pread_keeps_offset() {
        let file = new_test_file();
        let mut buf = [0; 3];
        assert_eq!(file.pread(&mut buf, 2), Ok(3));
        assert_eq!(&buf, &TEST_CONTENTS[2..5]);
        assert_eq!(file.offset(), 0);
    }

    #[test]
    fn append_writes_at_end() {
        let file = new_test_file();
        file.set_flags(SettableFileFlags {
            append: true,
            ..SettableFileFlags::default()
        });
        assert_eq!(file.write(b"!"), Ok(1));
        let size = file.unstable_attr().unwrap().size;
        assert_eq!(size, TEST_CONTENTS.len() as i64 + 1);
    }

    #[test]
    fn read_only_file_rejects_write() {
        let file = crate::tmpfs::new_regular_file(
            "ro".to_string(),
            FileFlags::from_linux_flags(libc::O_RDONLY),
            Vec::new(),
        );
        assert_eq!(file.write(b"x").unwrap_err().code(), libc::EBADF);
    }

    #[test]
    fn linux_flags_round_trip_access_mode() {
        let flags = FileFlags::from_linux_flags(libc::O_RDWR | libc::O_APPEND);
        assert!(flags.read && flags.write && flags.append);
        assert_eq!(flags.to_linux_flags(), libc::O_RDWR | libc::O_APPEND);
    }
}
