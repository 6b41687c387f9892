use utils::SysResult;

use crate::{attr::UnstableAttr, seek::SeekWhence, FileFlags};

pub trait FileOperations: std::fmt::Debug + Send + Sync {
    fn read(&self, flags: FileFlags, dst: &mut [u8], offset: i64) -> SysResult<usize>;
    fn write(&self, flags: FileFlags, src: &[u8], offset: i64) -> SysResult<usize>;
    fn unstable_attr(&self) -> SysResult<UnstableAttr>;
    fn ioctl(&self, request: u64, offset: i64) -> SysResult<usize>;
    fn seek(&self, whence: SeekWhence, current_offset: i64, offset: i64) -> SysResult<i64>;
    fn flush(&self) -> SysResult<()>;
    fn close(&self) -> SysResult<()>;
}
