use capsicum::{cap_rights, CapsicumRights};
use fs::{FdFlags, FileFlags};
use linux::{CAP_FCNTL, CAP_IOCTL};
use utils::{bail_libc, bit, SysError};

use crate::kernel::task::Task;

// close implements linux syscall close(2)
pub fn close(task: &Task, fd: i32) -> super::Result {
    let fd_table = task.fd_table();
    let entry = fd_table
        .remove(fd)
        .ok_or_else(|| SysError::new(libc::EBADF))?;
    // closing needs no rights, the empty set always passes
    let (file, _) = fd_table.gate().lookup(&entry, &CapsicumRights::none())?;
    file.flush()?;
    Ok(0)
}

// dup implements linux syscall dup(2)
pub fn dup(task: &Task, fd: i32) -> super::Result {
    let (entry, _) = task
        .fd_table()
        .get_raw(fd)
        .ok_or_else(|| SysError::new(libc::EBADF))?;
    task.new_fd_from(0, &entry, FdFlags::default())
        .map(|fd| fd as usize)
}

// dup2 implements linux syscall dup2(2)
pub fn dup2(task: &Task, old_fd: i32, new_fd: i32) -> super::Result {
    let fd_table = task.fd_table();
    let (entry, _) = fd_table
        .get_raw(old_fd)
        .ok_or_else(|| SysError::new(libc::EBADF))?;
    if old_fd != new_fd {
        fd_table.new_fd_at(new_fd, &entry, FdFlags::default())?;
    }
    Ok(new_fd as usize)
}

// fcntl implements linux syscall fcntl(2)
pub fn fcntl(task: &Task, fd: i32, cmd: i32, arg: u64) -> super::Result {
    let fd_table = task.fd_table();
    match cmd {
        libc::F_GETFD => {
            let (_, flags) = fd_table
                .get_raw(fd)
                .ok_or_else(|| SysError::new(libc::EBADF))?;
            Ok(flags.as_linux_fd_flags() as usize)
        }
        libc::F_SETFD => fd_table
            .set_flags(fd, FdFlags::from_linux_fd_flags(arg as i32))
            .map(|()| 0),
        libc::F_DUPFD | libc::F_DUPFD_CLOEXEC => {
            let (entry, _) = fd_table
                .get_raw(fd)
                .ok_or_else(|| SysError::new(libc::EBADF))?;
            let flags = FdFlags {
                close_on_exec: cmd == libc::F_DUPFD_CLOEXEC,
            };
            task.new_fd_from(arg as i32, &entry, flags)
                .map(|fd| fd as usize)
        }
        libc::F_GETFL | libc::F_SETFL | libc::F_GETOWN | libc::F_SETOWN => {
            let required = cap_rights![CAP_FCNTL].with_fcntls(bit::mask_of::<u32>(cmd));
            let (file, _) = fd_table.get_file_with_rights(fd, &required)?;
            match cmd {
                libc::F_GETFL => Ok(file.flags().to_linux_flags() as usize),
                libc::F_SETFL => {
                    file.set_flags(FileFlags::from_linux_flags(arg as i32).as_settable());
                    Ok(0)
                }
                libc::F_GETOWN => Ok(file.owner() as usize),
                _ => {
                    file.set_owner(arg as i32);
                    Ok(0)
                }
            }
        }
        _ => {
            logger::warn!("fcntl(2) command {} is not supported", cmd);
            bail_libc!(libc::EINVAL)
        }
    }
}

// ioctl implements linux syscall ioctl(2)
pub fn ioctl(task: &Task, fd: i32, request: u64, arg: u64) -> super::Result {
    // the command is an unsigned int, high bits are not part of it
    let request = request as u32 as u64;
    let fd_table = task.fd_table();
    if linux::is_fd_table_ioctl(request) {
        let flags = FdFlags {
            close_on_exec: request == linux::FIOCLEX,
        };
        return fd_table.set_flags(fd, flags).map(|()| 0);
    }

    let required = cap_rights![CAP_IOCTL].with_ioctls([request as u32])?;
    let (file, _) = fd_table.get_file_with_rights(fd, &required)?;
    match request {
        linux::FIONBIO => {
            let mut flags = file.flags();
            flags.non_blocking = arg != 0;
            file.set_flags(flags.as_settable());
            Ok(0)
        }
        _ => file.ioctl(request),
    }
}
