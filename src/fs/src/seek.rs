use utils::{bail_libc, err_libc, SysError, SysResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekWhence {
    Set,
    Current,
    End,
}

impl SeekWhence {
    pub fn from_linux(n: i32) -> SysResult<Self> {
        match n {
            libc::SEEK_SET => Ok(Self::Set),
            libc::SEEK_CUR => Ok(Self::Current),
            libc::SEEK_END => Ok(Self::End),
            _ => err_libc!(libc::EINVAL),
        }
    }

    // resolve computes the new offset of a seekable file of the given size.
    pub fn resolve(self, current_offset: i64, size: i64, offset: i64) -> SysResult<i64> {
        let base = match self {
            Self::Set => 0,
            Self::Current => current_offset,
            Self::End => size,
        };
        let new_offset = base
            .checked_add(offset)
            .ok_or_else(|| SysError::new(libc::EOVERFLOW))?;
        if new_offset < 0 {
            bail_libc!(libc::EINVAL);
        }
        Ok(new_offset)
    }
}
