use linux::{CAP_PWRITE, CAP_WRITE};

use crate::kernel::task::Task;

// write implements linux syscall write(2)
pub fn write(task: &Task, fd: i32, buf: &[u8]) -> super::Result {
    let file = task.get_file(fd, [CAP_WRITE])?;
    file.write(buf)
}

// pwrite64 implements linux syscall pwrite64(2)
pub fn pwrite64(task: &Task, fd: i32, buf: &[u8], offset: i64) -> super::Result {
    let file = task.get_file(fd, [CAP_PWRITE])?;
    file.pwrite(buf, offset)
}
