use crate::{tmpfs, File, FileFlags};

pub const TEST_CONTENTS: &[u8] = b"capsicum test file";

pub fn new_test_file() -> File {
    tmpfs::new_regular_file(
        "test".to_string(),
        FileFlags::from_linux_flags(libc::O_RDWR),
        TEST_CONTENTS.to_vec(),
    )
}
