pub mod attr;
pub mod dev;
mod fd_flags;
mod file;
mod file_operations;
pub mod seek;
pub mod tmpfs;

pub mod file_test_utils;

pub use fd_flags::FdFlags;
pub use file::*;
pub use file_operations::FileOperations;
