mod capsicum;
mod file;

pub use capsicum::*;
pub use file::*;
