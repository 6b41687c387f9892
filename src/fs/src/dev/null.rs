use utils::{err_libc, SysError, SysResult};

use crate::{
    attr::{InodeType, UnstableAttr},
    seek::SeekWhence,
    File, FileFlags, FileOperations,
};

// NullDeviceFileOperations implements /dev/null: reads hit EOF immediately,
// writes are discarded.
#[derive(Debug, Default)]
pub struct NullDeviceFileOperations;

impl NullDeviceFileOperations {
    pub fn open(mut flags: FileFlags) -> File {
        flags.pread = true;
        flags.pwrite = true;
        File::new("/dev/null".to_string(), flags, Box::new(Self))
    }
}

impl FileOperations for NullDeviceFileOperations {
    fn read(&self, _: FileFlags, _: &mut [u8], _: i64) -> SysResult<usize> {
        Ok(0)
    }
    fn write(&self, _: FileFlags, src: &[u8], _: i64) -> SysResult<usize> {
        Ok(src.len())
    }
    fn unstable_attr(&self) -> SysResult<UnstableAttr> {
        Ok(UnstableAttr {
            typ: InodeType::CharacterDevice,
            size: 0,
        })
    }
    fn ioctl(&self, _: u64, _: i64) -> SysResult<usize> {
        err_libc!(libc::ENOTTY)
    }
    fn seek(&self, _: SeekWhence, _: i64, _: i64) -> SysResult<i64> {
        Ok(0)
    }
    fn flush(&self) -> SysResult<()> {
        Ok(())
    }
    fn close(&self) -> SysResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_device_discards_writes() {
        let file = NullDeviceFileOperations::open(FileFlags::from_linux_flags(libc::O_RDWR));
        assert_eq!(file.write(b"gone"), Ok(4));
        let mut buf = [0; 4];
        assert_eq!(file.read(&mut buf), Ok(0));
        assert_eq!(file.pread(&mut buf, 100), Ok(0));
        let attr = file.unstable_attr().unwrap();
        assert_eq!(attr.typ, InodeType::CharacterDevice);
        assert_eq!(file.ioctl(linux::FIONREAD).unwrap_err().code(), libc::ENOTTY);
    }
}
