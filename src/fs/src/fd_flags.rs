#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct FdFlags {
    pub close_on_exec: bool,
}

impl FdFlags {
    pub fn from_linux_fd_flags(flags: i32) -> Self {
        Self {
            close_on_exec: flags & libc::FD_CLOEXEC != 0,
        }
    }

    pub fn as_linux_fd_flags(&self) -> i32 {
        if self.close_on_exec {
            libc::FD_CLOEXEC
        } else {
            0
        }
    }
}
