use std::sync::RwLock;

use utils::{bail_libc, err_libc, SysError, SysResult};

use crate::{
    attr::{InodeType, UnstableAttr},
    seek::SeekWhence,
    FileFlags, FileOperations, FILE_MAX_OFFSET,
};

// RegularFileOperations implements FileOperations for a regular tmpfs file
// whose data lives entirely in memory.
#[derive(Debug, Default)]
pub struct RegularFileOperations {
    data: RwLock<Vec<u8>>,
}

impl RegularFileOperations {
    pub fn with_contents(contents: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(contents),
        }
    }

    fn len(&self) -> i64 {
        self.data.read().unwrap().len() as i64
    }
}

impl FileOperations for RegularFileOperations {
    fn read(&self, _: FileFlags, dst: &mut [u8], offset: i64) -> SysResult<usize> {
        if offset < 0 {
            bail_libc!(libc::EINVAL);
        }
        let data = self.data.read().unwrap();
        let start = offset as usize;
        if start >= data.len() {
            return Ok(0);
        }
        let n = std::cmp::min(dst.len(), data.len() - start);
        dst[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    fn write(&self, _: FileFlags, src: &[u8], offset: i64) -> SysResult<usize> {
        if offset < 0 {
            bail_libc!(libc::EINVAL);
        }
        let end = offset
            .checked_add(src.len() as i64)
            .filter(|end| *end <= FILE_MAX_OFFSET)
            .ok_or_else(|| SysError::new(libc::EFBIG))?;
        let mut data = self.data.write().unwrap();
        if end as usize > data.len() {
            let extra = end as usize - data.len();
            data.try_reserve(extra)?;
            data.resize(end as usize, 0);
        }
        data[offset as usize..end as usize].copy_from_slice(src);
        Ok(src.len())
    }

    fn unstable_attr(&self) -> SysResult<UnstableAttr> {
        Ok(UnstableAttr {
            typ: InodeType::RegularFile,
            size: self.len(),
        })
    }

    fn ioctl(&self, request: u64, offset: i64) -> SysResult<usize> {
        match request {
            linux::FIONREAD => Ok(std::cmp::max(self.len() - offset, 0) as usize),
            _ => err_libc!(libc::ENOTTY),
        }
    }

    fn seek(&self, whence: SeekWhence, current_offset: i64, offset: i64) -> SysResult<i64> {
        whence.resolve(current_offset, self.len(), offset)
    }

    fn flush(&self) -> SysResult<()> {
        Ok(())
    }

    fn close(&self) -> SysResult<()> {
        Ok(())
    }
}
