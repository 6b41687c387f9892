#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InodeType {
    RegularFile,
    CharacterDevice,
}

impl InodeType {
    pub fn linux_mode(&self) -> u32 {
        match self {
            InodeType::RegularFile => libc::S_IFREG,
            InodeType::CharacterDevice => libc::S_IFCHR,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnstableAttr {
    pub typ: InodeType,
    pub size: i64,
}
