use capsicum::{CapsicumRights, IoctlAllow};
use linux::{CAP_FCNTL_ALL, CAP_IOCTLS_ALL, CAP_RIGHTS_ELEMENTS};
use utils::{bail_libc, SysError, SysResult};

use crate::kernel::task::Task;

// cap_rights_limit narrows fd to the rights described by the raw arguments.
// Rights not held already are silently dropped.
pub fn cap_rights_limit(
    task: &Task,
    fd: i32,
    rights: [u64; CAP_RIGHTS_ELEMENTS],
    fcntls: u32,
    nioctls: i32,
    ioctls: &[u32],
) -> super::Result {
    let base = CapsicumRights::from_raw(rights, fcntls, nioctls, ioctls)?;
    task.fd_table().limit_rights(fd, &base).map(|()| 0)
}

// cap_fcntls_limit narrows the fcntl commands fd may use, keeping every other
// right as it is.
pub fn cap_fcntls_limit(task: &Task, fd: i32, fcntls: u32) -> super::Result {
    if fcntls & !CAP_FCNTL_ALL != 0 {
        bail_libc!(libc::EINVAL);
    }
    task.fd_table()
        .limit_rights_with(fd, |current| {
            warn_if_dominated(fd, current);
            Ok(current.try_clone()?.with_fcntls(fcntls))
        })
        .map(|()| 0)
}

// cap_ioctls_limit narrows the ioctl commands fd may use, keeping every other
// right as it is.
pub fn cap_ioctls_limit(task: &Task, fd: i32, cmds: &[u32]) -> super::Result {
    task.fd_table()
        .limit_rights_with(fd, |current| {
            warn_if_dominated(fd, current);
            current.try_clone()?.with_ioctls(cmds.iter().copied())
        })
        .map(|()| 0)
}

fn warn_if_dominated(fd: i32, current: &CapsicumRights) {
    if current.is_all() {
        logger::warn!(
            "fd {} holds every primary right, command limits take effect only after cap_rights_limit",
            fd
        );
    }
}

fn actual_rights(task: &Task, fd: i32) -> SysResult<std::sync::Arc<CapsicumRights>> {
    let (_, actual) = task
        .fd_table()
        .get_file_with_rights(fd, &CapsicumRights::none())?;
    Ok(actual)
}

pub fn cap_rights_get(task: &Task, fd: i32) -> SysResult<CapsicumRights> {
    actual_rights(task, fd)?.try_clone()
}

pub fn cap_fcntls_get(task: &Task, fd: i32) -> SysResult<u32> {
    Ok(actual_rights(task, fd)?.fcntls())
}

// cap_ioctls_get copies as many allowed commands as fit into cmds and returns
// the total count, or CAP_IOCTLS_ALL when every command is allowed.
pub fn cap_ioctls_get(task: &Task, fd: i32, cmds: &mut [u32]) -> SysResult<i32> {
    let actual = actual_rights(task, fd)?;
    match actual.ioctls() {
        IoctlAllow::All => Ok(CAP_IOCTLS_ALL),
        IoctlAllow::Subset(allowed) => {
            let n = std::cmp::min(allowed.len(), cmds.len());
            cmds[..n].copy_from_slice(&allowed[..n]);
            Ok(allowed.len() as i32)
        }
    }
}

// fdinfo renders /proc/<pid>/fdinfo/<fd>. Capabilities append their rights.
pub fn fdinfo(task: &Task, fd: i32) -> SysResult<String> {
    let fd_table = task.fd_table();
    let (entry, fd_flags) = fd_table
        .get_raw(fd)
        .ok_or_else(|| SysError::new(libc::EBADF))?;
    let (file, _) = fd_table.gate().lookup(&entry, &CapsicumRights::none())?;
    let mut flags = file.flags().to_linux_flags();
    if fd_flags.close_on_exec {
        flags |= libc::O_CLOEXEC;
    }
    let mut info = format!("pos:\t{}\nflags:\t0{:o}\n", file.offset(), flags);
    if let Some(rights) = entry.rights() {
        info.push_str(&rights.to_string());
    }
    Ok(info)
}

#[cfg(test)]
mod tests {
    use capsicum::{cap_rights, EnforcementMode};
    use linux::*;
    use utils::SysErrorKind;

    use super::*;
    use crate::syscalls::{fcntl, ioctl, read, test_utils::task_with_test_file};

    #[test]
    fn rights_limit_from_raw_vector() {
        let (task, fd) = task_with_test_file(EnforcementMode::Enforcing);
        let raw = cap_rights![CAP_READ].primary().raw();
        assert_eq!(cap_rights_limit(&task, fd, raw, 0, 0, &[]), Ok(0));
        assert_eq!(cap_rights_get(&task, fd), Ok(cap_rights![CAP_READ]));
        let mut buf = [0; 2];
        assert_eq!(read(&task, fd, &mut buf), Ok(2));
    }

    #[test]
    fn rights_limit_rejects_malformed_vector() {
        let (task, fd) = task_with_test_file(EnforcementMode::Enforcing);
        let err = cap_rights_limit(&task, fd, [0, 0], 0, 0, &[]).unwrap_err();
        assert_eq!(err.kind(), SysErrorKind::InvalidRight);
        let (entry, _) = task.fd_table().get_raw(fd).unwrap();
        assert!(!entry.is_capability());
    }

    #[test]
    fn rights_get_on_plain_descriptor_is_universal() {
        let (task, fd) = task_with_test_file(EnforcementMode::Enforcing);
        assert!(cap_rights_get(&task, fd).unwrap().is_all());
        assert_eq!(cap_fcntls_get(&task, fd), Ok(CAP_FCNTL_ALL));
        assert_eq!(cap_ioctls_get(&task, fd, &mut []), Ok(CAP_IOCTLS_ALL));
    }

    #[test]
    fn fcntls_limit_narrows_sub_rights() {
        let (task, fd) = task_with_test_file(EnforcementMode::Enforcing);
        let base = cap_rights![CAP_READ, CAP_FCNTL].with_fcntls(CAP_FCNTL_ALL);
        task.fd_table().limit_rights(fd, &base).unwrap();
        assert_eq!(cap_fcntls_limit(&task, fd, CAP_FCNTL_GETFL), Ok(0));
        assert_eq!(cap_fcntls_get(&task, fd), Ok(CAP_FCNTL_GETFL));
        assert!(fcntl(&task, fd, libc::F_GETFL, 0).is_ok());
        assert!(fcntl(&task, fd, libc::F_SETFL, 0).unwrap_err().is_not_capable());
        // widening the mask again has no effect
        assert_eq!(cap_fcntls_limit(&task, fd, CAP_FCNTL_ALL), Ok(0));
        assert_eq!(cap_fcntls_get(&task, fd), Ok(CAP_FCNTL_GETFL));
        assert_eq!(
            cap_fcntls_limit(&task, fd, 1 << 31).unwrap_err().code(),
            libc::EINVAL
        );
    }

    #[test]
    fn ioctls_limit_narrows_sub_rights() {
        let (task, fd) = task_with_test_file(EnforcementMode::Enforcing);
        let base = cap_rights![CAP_READ, CAP_IOCTL].with_all_ioctls();
        task.fd_table().limit_rights(fd, &base).unwrap();
        assert_eq!(
            cap_ioctls_limit(&task, fd, &[FIONREAD as u32, FIONBIO as u32]),
            Ok(0)
        );
        assert_eq!(cap_ioctls_limit(&task, fd, &[FIONREAD as u32, 0x99]), Ok(0));

        let mut cmds = [0; 4];
        assert_eq!(cap_ioctls_get(&task, fd, &mut cmds), Ok(1));
        assert_eq!(cmds[0], FIONREAD as u32);
        assert!(ioctl(&task, fd, FIONREAD, 0).is_ok());
        assert!(ioctl(&task, fd, FIONBIO, 1).unwrap_err().is_not_capable());
    }

    #[test]
    fn fdinfo_shows_capability_rights() {
        let (task, fd) = task_with_test_file(EnforcementMode::Enforcing);
        let plain = fdinfo(&task, fd).unwrap();
        assert_eq!(plain.lines().count(), 2);
        assert!(plain.starts_with("pos:\t0\nflags:\t0"));

        task.fd_table().limit_rights(fd, &cap_rights![CAP_READ]).unwrap();
        let mut buf = [0; 3];
        read(&task, fd, &mut buf).unwrap();
        let info = fdinfo(&task, fd).unwrap();
        let lines: Vec<&str> = info.lines().collect();
        assert_eq!(lines[0], "pos:\t3");
        assert!(lines[2].starts_with("rights:\t0x"));
        assert_eq!(lines[3], " fcntls: 0x000000");
    }

    #[test]
    fn pass_through_limits_are_no_ops() {
        let (task, fd) = task_with_test_file(EnforcementMode::PassThrough);
        assert_eq!(cap_fcntls_limit(&task, fd, 0), Ok(0));
        assert_eq!(cap_ioctls_limit(&task, fd, &[]), Ok(0));
        assert!(cap_rights_get(&task, fd).unwrap().is_all());
        assert!(fcntl(&task, fd, libc::F_SETFL, 0).is_ok());
    }
}
