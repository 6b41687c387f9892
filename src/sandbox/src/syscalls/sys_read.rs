use linux::{CAP_PREAD, CAP_READ};
use utils::SysErrorKind;

use crate::kernel::task::Task;

// read implements linux syscall read(2)
pub fn read(task: &Task, fd: i32, buf: &mut [u8]) -> super::Result {
    let file = task.get_file(fd, [CAP_READ])?;
    match file.read(buf) {
        Ok(n) => Ok(n),
        Err(err) if err.kind() == SysErrorKind::Eof => Ok(0),
        Err(err) => Err(err),
    }
}

// pread64 implements linux syscall pread64(2)
pub fn pread64(task: &Task, fd: i32, buf: &mut [u8], offset: i64) -> super::Result {
    let file = task.get_file(fd, [CAP_PREAD])?;
    file.pread(buf, offset)
}
