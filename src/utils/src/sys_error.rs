use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SysErrorKind {
    Libc,
    Eof,
    // required rights are not held by the descriptor's capability
    NotCapable,
    // a capability right identifier with a malformed encoding
    InvalidRight,
    AllocationFailure,
    StdIoError,
}

#[derive(Debug, PartialEq, Eq)]
pub struct SysError {
    code: i32,
    desc: Option<String>,
    kind: SysErrorKind,
}

impl fmt::Display for SysError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SysError occured with code: {} {:?} {:?}",
            self.code, self.desc, self.kind
        )
    }
}

impl std::error::Error for SysError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl SysError {
    pub fn new(code: i32) -> Self {
        Self {
            code,
            desc: None,
            kind: SysErrorKind::Libc,
        }
    }

    pub fn new_with_msg(code: i32, msg: String) -> Self {
        Self {
            code,
            desc: Some(msg),
            kind: SysErrorKind::Libc,
        }
    }

    pub fn kind(&self) -> SysErrorKind {
        self.kind
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn desc(&self) -> Option<&str> {
        self.desc.as_deref()
    }

    pub fn eof() -> Self {
        Self {
            code: -1,
            desc: Some("EOF".to_string()),
            kind: SysErrorKind::Eof,
        }
    }

    pub fn not_capable() -> Self {
        Self {
            code: libc::EPERM,
            desc: Some("operation not permitted in capability mode".to_string()),
            kind: SysErrorKind::NotCapable,
        }
    }

    pub fn invalid_right(raw: u64) -> Self {
        Self {
            code: libc::EINVAL,
            desc: Some(format!("invalid capability right {:#018x}", raw)),
            kind: SysErrorKind::InvalidRight,
        }
    }

    pub fn no_memory() -> Self {
        Self {
            code: libc::ENOMEM,
            desc: None,
            kind: SysErrorKind::AllocationFailure,
        }
    }

    pub fn from_io_error(e: std::io::Error) -> Self {
        Self {
            code: e.raw_os_error().unwrap_or(-1),
            desc: Some(e.to_string()),
            kind: SysErrorKind::StdIoError,
        }
    }

    pub fn is_not_capable(&self) -> bool {
        self.kind == SysErrorKind::NotCapable
    }
}

impl From<std::collections::TryReserveError> for SysError {
    fn from(_: std::collections::TryReserveError) -> Self {
        Self::no_memory()
    }
}

#[macro_export]
macro_rules! err_libc {
    ($libc_code:expr) => {
        Err(SysError::new($libc_code))
    };
}

#[macro_export]
macro_rules! bail_libc {
    ($libc_code:expr) => {
        return Err(SysError::new($libc_code))
    };
}

pub type SysResult<T> = std::result::Result<T, SysError>;
