use linux::CAP_FSTAT;
use utils::SysResult;

use crate::kernel::task::Task;

// fstat implements linux syscall fstat(2)
pub fn fstat(task: &Task, fd: i32) -> SysResult<libc::stat> {
    let file = task.get_file(fd, [CAP_FSTAT])?;
    let uattr = file.unstable_attr()?;
    let flags = file.flags();
    let mut stat: libc::stat = unsafe { std::mem::zeroed() };
    stat.st_mode = uattr.typ.linux_mode();
    if flags.read {
        stat.st_mode |= libc::S_IRUSR;
    }
    if flags.write {
        stat.st_mode |= libc::S_IWUSR;
    }
    stat.st_nlink = 1;
    stat.st_size = uattr.size;
    stat.st_blksize = 4096;
    stat.st_blocks = (uattr.size + 511) / 512;
    Ok(stat)
}
