mod regular;

pub use regular::*;

use crate::{File, FileFlags};

// new_regular_file opens an in-memory regular file holding `contents`.
pub fn new_regular_file(name: String, mut flags: FileFlags, contents: Vec<u8>) -> File {
    flags.pread = true;
    flags.pwrite = true;
    File::new(
        name,
        flags,
        Box::new(RegularFileOperations::with_contents(contents)),
    )
}
