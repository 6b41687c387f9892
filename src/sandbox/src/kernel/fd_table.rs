use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use capsicum::{all_rights, CapsicumRights, Enforcement, FileRef};
use fs::{FdFlags, File};
use linux::CapRight;
use utils::{bail_libc, SysError, SysResult};

use crate::context;

#[derive(Clone, Debug)]
struct Descriptor {
    file: FileRef,
    flags: FdFlags,
}

#[derive(Debug, Default)]
struct Descriptors {
    next: i32, // start position to find fd
    table: HashMap<i32, Descriptor>,
}

// FdTable maps descriptors to files or capabilities. Every access that needs
// the file goes through the enforcement gate; replacing a slot happens under
// the write lock so concurrent lookups see either the old or the new entry.
#[derive(Debug)]
pub struct FdTable {
    descriptors: RwLock<Descriptors>,
    gate: Arc<dyn Enforcement>,
    max_fds: i32,
}

impl FdTable {
    pub fn new(gate: Arc<dyn Enforcement>, max_fds: u64) -> Self {
        Self {
            descriptors: RwLock::new(Descriptors::default()),
            gate,
            max_fds: std::cmp::min(max_fds, i32::MAX as u64) as i32,
        }
    }

    pub fn from_context() -> Self {
        let ctx = context::context();
        Self::new(ctx.gate(), ctx.max_fds())
    }

    #[inline]
    pub fn gate(&self) -> &Arc<dyn Enforcement> {
        &self.gate
    }

    // get_raw returns the slot as stored, without any rights check.
    pub fn get_raw(&self, fd: i32) -> Option<(FileRef, FdFlags)> {
        self.descriptors
            .read()
            .unwrap()
            .table
            .get(&fd)
            .map(|d| (d.file.clone(), d.flags))
    }

    // get_file_with_rights resolves fd to its file, provided the entry holds
    // `required`, and reports the rights it actually holds.
    pub fn get_file_with_rights(
        &self,
        fd: i32,
        required: &CapsicumRights,
    ) -> SysResult<(Arc<File>, Arc<CapsicumRights>)> {
        let (entry, _) = self.get_raw(fd).ok_or_else(|| SysError::new(libc::EBADF))?;
        self.gate.lookup(&entry, required)
    }

    pub fn get_file<I: IntoIterator<Item = CapRight>>(
        &self,
        fd: i32,
        rights: I,
    ) -> SysResult<Arc<File>> {
        let required = CapsicumRights::init(rights);
        self.get_file_with_rights(fd, &required).map(|(file, _)| file)
    }

    pub fn new_fds(&self, fd: i32, files: &[&FileRef], flags: FdFlags) -> SysResult<Vec<i32>> {
        if fd < 0 {
            bail_libc!(libc::EINVAL);
        }
        let end = self.max_fds;
        if fd as i64 + files.len() as i64 > end as i64 {
            bail_libc!(libc::EMFILE);
        }

        let mut descriptors = self.descriptors.write().unwrap();
        let start = std::cmp::max(fd, descriptors.next);
        let mut fds = Vec::new();
        fds.try_reserve(files.len())?;
        for i in start..end {
            if fds.len() >= files.len() {
                break;
            }
            if !descriptors.table.contains_key(&i) {
                let file = files[fds.len()].clone();
                descriptors.table.insert(i, Descriptor { file, flags });
                fds.push(i);
            }
        }

        if fds.len() < files.len() {
            for i in &fds {
                descriptors.table.remove(i);
            }
            bail_libc!(libc::EMFILE);
        }

        if start == descriptors.next {
            if let Some(last) = fds.last() {
                descriptors.next = last + 1;
            }
        }
        Ok(fds)
    }

    pub fn new_fd(&self, fd: i32, file: &FileRef, flags: FdFlags) -> SysResult<i32> {
        self.new_fds(fd, &[file], flags).map(|fds| fds[0])
    }

    // new_fd_at stores file at exactly fd and returns whatever was there.
    pub fn new_fd_at(&self, fd: i32, file: &FileRef, flags: FdFlags) -> SysResult<Option<FileRef>> {
        if fd < 0 || fd >= self.max_fds {
            bail_libc!(libc::EBADF);
        }
        let mut descriptors = self.descriptors.write().unwrap();
        let orig = descriptors.table.insert(
            fd,
            Descriptor {
                file: file.clone(),
                flags,
            },
        );
        Ok(orig.map(|d| d.file))
    }

    pub fn remove(&self, fd: i32) -> Option<FileRef> {
        if fd < 0 {
            return None;
        }
        let mut descriptors = self.descriptors.write().unwrap();
        let orig = descriptors.table.remove(&fd)?;
        if fd < descriptors.next {
            descriptors.next = fd;
        }
        Some(orig.file)
    }

    pub fn set_flags(&self, fd: i32, flags: FdFlags) -> SysResult<()> {
        let mut descriptors = self.descriptors.write().unwrap();
        let desc = descriptors
            .table
            .get_mut(&fd)
            .ok_or_else(|| SysError::new(libc::EBADF))?;
        desc.flags = flags;
        Ok(())
    }

    // limit_rights narrows the entry at fd to `base`.
    pub fn limit_rights(&self, fd: i32, base: &CapsicumRights) -> SysResult<()> {
        self.limit_rights_with(fd, |_| base.try_clone())
    }

    // limit_rights_with derives the new base from the rights currently held.
    // The slot is only replaced once both the derivation and the install have
    // succeeded.
    pub fn limit_rights_with<F>(&self, fd: i32, narrow: F) -> SysResult<()>
    where
        F: FnOnce(&CapsicumRights) -> SysResult<CapsicumRights>,
    {
        let mut descriptors = self.descriptors.write().unwrap();
        let desc = descriptors
            .table
            .get_mut(&fd)
            .ok_or_else(|| SysError::new(libc::EBADF))?;
        let current = match desc.file.rights() {
            Some(rights) => Arc::clone(rights),
            None => all_rights(),
        };
        let base = narrow(&current)?;
        desc.file = self.gate.install(&base, &desc.file)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.descriptors.read().unwrap().table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use capsicum::{cap_rights, EnforcementMode};
    use fs::file_test_utils::new_test_file;
    use linux::*;
    use utils::SysErrorKind;

    use super::*;

    const MAX_FD: u64 = 2 * 1024;

    fn run_test(f: fn(&FdTable, FileRef)) {
        let fd_table = FdTable::new(EnforcementMode::Enforcing.gate(), MAX_FD);
        let file = FileRef::from(new_test_file());
        f(&fd_table, file);
    }

    #[test]
    fn fd_table_many() {
        run_test(|fd_table, file| {
            for _ in 0..MAX_FD {
                assert!(fd_table.new_fds(0, &[&file], FdFlags::default()).is_ok());
            }
            assert!(fd_table.new_fds(0, &[&file], FdFlags::default()).is_err());
            assert!(fd_table.new_fd_at(1, &file, FdFlags::default()).is_ok());
            let i = 2;
            fd_table.remove(i);
            let fds = fd_table.new_fds(0, &[&file], FdFlags::default());
            assert!(fds.is_ok());
            assert_eq!(fds.unwrap()[0], i);
        });
    }

    #[test]
    fn fd_table_over_limit() {
        run_test(|fd_table, file| {
            assert!(fd_table
                .new_fds(MAX_FD as i32, &[&file], FdFlags::default())
                .is_err());
            assert!(fd_table
                .new_fds(
                    MAX_FD as i32 - 2,
                    &[&file, &file, &file],
                    FdFlags::default()
                )
                .is_err());
            let res = fd_table.new_fds(
                MAX_FD as i32 - 3,
                &[&file, &file, &file],
                FdFlags::default(),
            );
            assert!(res.is_ok());
            for fd in res.unwrap() {
                fd_table.remove(fd);
            }
            let res = fd_table.new_fds(MAX_FD as i32 - 1, &[&file], FdFlags::default());
            assert!(res.is_ok());
            assert_eq!(res.unwrap(), vec![MAX_FD as i32 - 1]);
            assert_eq!(
                fd_table.new_fd_at(MAX_FD as i32, &file, FdFlags::default()).unwrap_err().code(),
                libc::EBADF
            );
        });
    }

    #[test]
    fn unknown_descriptor_is_ebadf() {
        run_test(|fd_table, _| {
            let err = fd_table.get_file(3, [CAP_READ]).unwrap_err();
            assert_eq!(err.code(), libc::EBADF);
            assert_eq!(fd_table.set_flags(3, FdFlags::default()).unwrap_err().code(), libc::EBADF);
            assert_eq!(
                fd_table.limit_rights(3, &cap_rights![]).unwrap_err().code(),
                libc::EBADF
            );
            assert!(fd_table.remove(-1).is_none());
        });
    }

    #[test]
    fn limit_rights_applies_to_later_lookups() {
        run_test(|fd_table, file| {
            let fd = fd_table.new_fd(0, &file, FdFlags::default()).unwrap();
            assert!(fd_table.get_file(fd, [CAP_WRITE]).is_ok());
            fd_table.limit_rights(fd, &cap_rights![CAP_READ]).unwrap();
            let (got, actual) = fd_table
                .get_file_with_rights(fd, &cap_rights![CAP_READ])
                .unwrap();
            assert!(FileRef::from(got).same_file(&file));
            assert_eq!(*actual, cap_rights![CAP_READ]);
            let err = fd_table.get_file(fd, [CAP_WRITE]).unwrap_err();
            assert_eq!(err.kind(), SysErrorKind::NotCapable);
            assert_eq!(err.code(), libc::EPERM);

            fd_table.limit_rights(fd, &CapsicumRights::all()).unwrap();
            assert!(fd_table.get_file(fd, [CAP_WRITE]).is_err());
        });
    }

    #[test]
    fn failed_limit_leaves_slot_untouched() {
        run_test(|fd_table, file| {
            let fd = fd_table.new_fd(0, &file, FdFlags::default()).unwrap();
            fd_table.limit_rights(fd, &cap_rights![CAP_READ, CAP_WRITE]).unwrap();
            let (before, _) = fd_table.get_raw(fd).unwrap();
            let res = fd_table.limit_rights_with(fd, |_| Err(SysError::no_memory()));
            assert_eq!(res.unwrap_err().kind(), SysErrorKind::AllocationFailure);
            let (after, _) = fd_table.get_raw(fd).unwrap();
            assert!(before.same_entry(&after));
        });
    }

    #[test]
    fn duplicated_entry_keeps_capability() {
        run_test(|fd_table, file| {
            let fd = fd_table.new_fd(0, &file, FdFlags::default()).unwrap();
            fd_table.limit_rights(fd, &cap_rights![CAP_READ]).unwrap();
            let (entry, _) = fd_table.get_raw(fd).unwrap();
            let dup = fd_table.new_fd(0, &entry, FdFlags::default()).unwrap();
            assert_ne!(dup, fd);
            assert!(fd_table.get_file(dup, [CAP_WRITE]).unwrap_err().is_not_capable());
            // narrowing the copy does not touch the original slot
            fd_table.limit_rights(dup, &cap_rights![]).unwrap();
            assert!(fd_table.get_file(fd, [CAP_READ]).is_ok());
            assert!(fd_table.get_file(dup, [CAP_READ]).is_err());
        });
    }

    #[test]
    fn pass_through_table_never_wraps() {
        let fd_table = FdTable::new(EnforcementMode::PassThrough.gate(), MAX_FD);
        let file = FileRef::from(new_test_file());
        let fd = fd_table.new_fd(0, &file, FdFlags::default()).unwrap();
        fd_table.limit_rights(fd, &cap_rights![]).unwrap();
        let (entry, _) = fd_table.get_raw(fd).unwrap();
        assert!(!entry.is_capability());
        assert!(fd_table.get_file(fd, [CAP_WRITE]).is_ok());
    }

    #[test]
    fn concurrent_lookups_during_narrowing() {
        let fd_table = Arc::new(FdTable::new(EnforcementMode::Enforcing.gate(), MAX_FD));
        let file = FileRef::from(new_test_file());
        let fd = fd_table.new_fd(0, &file, FdFlags::default()).unwrap();
        fd_table
            .limit_rights(fd, &cap_rights![CAP_READ, CAP_WRITE])
            .unwrap();

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let fd_table = Arc::clone(&fd_table);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        assert!(fd_table.get_file(fd, [CAP_READ]).is_ok());
                        match fd_table.get_file(fd, [CAP_WRITE]) {
                            Ok(_) => (),
                            Err(err) => assert!(err.is_not_capable()),
                        }
                    }
                })
            })
            .collect();
        fd_table.limit_rights(fd, &cap_rights![CAP_READ]).unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert!(fd_table.get_file(fd, [CAP_WRITE]).is_err());
    }

    #[test]
    fn table_from_context() {
        context::init_for_test();
        let fd_table = FdTable::from_context();
        assert_eq!(fd_table.gate().mode(), EnforcementMode::Enforcing);
        assert!(fd_table.is_empty());
    }
}
