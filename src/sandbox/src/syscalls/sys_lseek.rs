use fs::seek::SeekWhence;
use linux::{CAP_SEEK, CAP_SEEK_TELL};

use crate::kernel::task::Task;

// lseek implements linux syscall lseek(2)
pub fn lseek(task: &Task, fd: i32, offset: i64, whence: i32) -> super::Result {
    let whence = SeekWhence::from_linux(whence)?;
    // reporting the current offset does not move it
    let right = if whence == SeekWhence::Current && offset == 0 {
        CAP_SEEK_TELL
    } else {
        CAP_SEEK
    };
    let file = task.get_file(fd, [right])?;
    file.seek(whence, offset).map(|p| p as usize)
}
