// Capsicum capability rights, as laid out in the uapi rights structure.
//
// A right is a u64: bits 62..63 hold the rights version, bits 57..61 hold a
// one-hot index into the primary rights array and the low 57 bits hold the
// right itself. Some rights are unions of others (CAP_SEEK includes
// CAP_SEEK_TELL), so holding a right means holding all of its bits.

use std::fmt;

pub const CAP_RIGHTS_VERSION: u64 = 0;
pub const CAP_RIGHTS_ELEMENTS: usize = CAP_RIGHTS_VERSION as usize + 2;

const INDEX_SHIFT: u32 = 57;
const INDEX_MASK: u64 = 0x1f;
const VERSION_SHIFT: u32 = 62;
const BITS_MASK: u64 = (1 << INDEX_SHIFT) - 1;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapRight(u64);

impl CapRight {
    const fn new(idx: u32, bits: u64) -> Self {
        Self((1u64 << (INDEX_SHIFT + idx)) | bits)
    }

    const fn or(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    // from_raw decodes a right handed in from user space. The version must be
    // zero, the index bit must name one of the primary array elements and no
    // bit outside the catalogue may be set.
    pub fn from_raw(raw: u64) -> Option<Self> {
        if raw >> VERSION_SHIFT != CAP_RIGHTS_VERSION {
            return None;
        }
        let idx = utils::bit::one_hot_index((raw >> INDEX_SHIFT) & INDEX_MASK)? as usize;
        let all = match idx {
            0 => CAP_ALL0,
            1 => CAP_ALL1,
            _ => return None,
        };
        if raw & !all != 0 {
            return None;
        }
        Some(Self(raw))
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    // index of the primary array element this right lives in.
    #[inline]
    pub fn index(self) -> usize {
        ((self.0 >> INDEX_SHIFT) & INDEX_MASK).trailing_zeros() as usize
    }

    #[inline]
    pub const fn bits(self) -> u64 {
        self.0 & BITS_MASK
    }

    pub fn from_name(name: &str) -> Option<Self> {
        CAP_NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, r)| *r)
    }

    // name returns the catalogue name of an exact catalogue entry.
    pub fn name(self) -> Option<&'static str> {
        CAP_NAMES.iter().find(|(_, r)| *r == self).map(|(n, _)| *n)
    }
}

impl fmt::Debug for CapRight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "CapRight({})", name),
            None => write!(f, "CapRight({:#018x})", self.0),
        }
    }
}

// Index 0: general file I/O, VFS methods and sockets.
pub const CAP_READ: CapRight = CapRight::new(0, 0x0000_0000_0000_0001);
pub const CAP_WRITE: CapRight = CapRight::new(0, 0x0000_0000_0000_0002);
pub const CAP_SEEK_TELL: CapRight = CapRight::new(0, 0x0000_0000_0000_0004);
pub const CAP_SEEK: CapRight = CAP_SEEK_TELL.or(CapRight::new(0, 0x0000_0000_0000_0008));
pub const CAP_PREAD: CapRight = CAP_SEEK.or(CAP_READ);
pub const CAP_PWRITE: CapRight = CAP_SEEK.or(CAP_WRITE);
pub const CAP_MMAP: CapRight = CapRight::new(0, 0x0000_0000_0000_0010);
pub const CAP_MMAP_R: CapRight = CAP_MMAP.or(CAP_SEEK).or(CAP_READ);
pub const CAP_MMAP_W: CapRight = CAP_MMAP.or(CAP_SEEK).or(CAP_WRITE);
pub const CAP_MMAP_X: CapRight = CAP_MMAP
    .or(CAP_SEEK)
    .or(CapRight::new(0, 0x0000_0000_0000_0020));
pub const CAP_MMAP_RW: CapRight = CAP_MMAP_R.or(CAP_MMAP_W);
pub const CAP_MMAP_RX: CapRight = CAP_MMAP_R.or(CAP_MMAP_X);
pub const CAP_MMAP_WX: CapRight = CAP_MMAP_W.or(CAP_MMAP_X);
pub const CAP_MMAP_RWX: CapRight = CAP_MMAP_R.or(CAP_MMAP_W).or(CAP_MMAP_X);
pub const CAP_CREATE: CapRight = CapRight::new(0, 0x0000_0000_0000_0040);
pub const CAP_FEXECVE: CapRight = CapRight::new(0, 0x0000_0000_0000_0080);
pub const CAP_FSYNC: CapRight = CapRight::new(0, 0x0000_0000_0000_0100);
pub const CAP_FTRUNCATE: CapRight = CapRight::new(0, 0x0000_0000_0000_0200);
pub const CAP_LOOKUP: CapRight = CapRight::new(0, 0x0000_0000_0000_0400);
pub const CAP_FCHDIR: CapRight = CapRight::new(0, 0x0000_0000_0000_0800);
pub const CAP_FCHFLAGS: CapRight = CapRight::new(0, 0x0000_0000_0000_1000);
pub const CAP_CHFLAGSAT: CapRight = CAP_FCHFLAGS.or(CAP_LOOKUP);
pub const CAP_FCHMOD: CapRight = CapRight::new(0, 0x0000_0000_0000_2000);
pub const CAP_FCHMODAT: CapRight = CAP_FCHMOD.or(CAP_LOOKUP);
pub const CAP_FCHOWN: CapRight = CapRight::new(0, 0x0000_0000_0000_4000);
pub const CAP_FCHOWNAT: CapRight = CAP_FCHOWN.or(CAP_LOOKUP);
pub const CAP_FCNTL: CapRight = CapRight::new(0, 0x0000_0000_0000_8000);
pub const CAP_FLOCK: CapRight = CapRight::new(0, 0x0000_0000_0001_0000);
pub const CAP_FPATHCONF: CapRight = CapRight::new(0, 0x0000_0000_0002_0000);
pub const CAP_FSCK: CapRight = CapRight::new(0, 0x0000_0000_0004_0000);
pub const CAP_FSTAT: CapRight = CapRight::new(0, 0x0000_0000_0008_0000);
pub const CAP_FSTATAT: CapRight = CAP_FSTAT.or(CAP_LOOKUP);
pub const CAP_FSTATFS: CapRight = CapRight::new(0, 0x0000_0000_0010_0000);
pub const CAP_FUTIMES: CapRight = CapRight::new(0, 0x0000_0000_0020_0000);
pub const CAP_FUTIMESAT: CapRight = CAP_FUTIMES.or(CAP_LOOKUP);
pub const CAP_LINKAT: CapRight = CAP_LOOKUP.or(CapRight::new(0, 0x0000_0000_0040_0000));
pub const CAP_MKDIRAT: CapRight = CAP_LOOKUP.or(CapRight::new(0, 0x0000_0000_0080_0000));
pub const CAP_MKFIFOAT: CapRight = CAP_LOOKUP.or(CapRight::new(0, 0x0000_0000_0100_0000));
pub const CAP_MKNODAT: CapRight = CAP_LOOKUP.or(CapRight::new(0, 0x0000_0000_0200_0000));
pub const CAP_RENAMEAT: CapRight = CAP_LOOKUP.or(CapRight::new(0, 0x0000_0000_0400_0000));
pub const CAP_SYMLINKAT: CapRight = CAP_LOOKUP.or(CapRight::new(0, 0x0000_0000_0800_0000));
pub const CAP_UNLINKAT: CapRight = CAP_LOOKUP.or(CapRight::new(0, 0x0000_0000_1000_0000));
pub const CAP_ACCEPT: CapRight = CapRight::new(0, 0x0000_0000_2000_0000);
pub const CAP_BIND: CapRight = CapRight::new(0, 0x0000_0000_4000_0000);
pub const CAP_CONNECT: CapRight = CapRight::new(0, 0x0000_0000_8000_0000);
pub const CAP_GETPEERNAME: CapRight = CapRight::new(0, 0x0000_0001_0000_0000);
pub const CAP_GETSOCKNAME: CapRight = CapRight::new(0, 0x0000_0002_0000_0000);
pub const CAP_GETSOCKOPT: CapRight = CapRight::new(0, 0x0000_0004_0000_0000);
pub const CAP_LISTEN: CapRight = CapRight::new(0, 0x0000_0008_0000_0000);
pub const CAP_PEELOFF: CapRight = CapRight::new(0, 0x0000_0010_0000_0000);
pub const CAP_RECV: CapRight = CAP_READ;
pub const CAP_SEND: CapRight = CAP_WRITE;
pub const CAP_SETSOCKOPT: CapRight = CapRight::new(0, 0x0000_0020_0000_0000);
pub const CAP_SHUTDOWN: CapRight = CapRight::new(0, 0x0000_0040_0000_0000);
pub const CAP_SOCK_CLIENT: CapRight = CAP_CONNECT
    .or(CAP_GETPEERNAME)
    .or(CAP_GETSOCKNAME)
    .or(CAP_GETSOCKOPT)
    .or(CAP_PEELOFF)
    .or(CAP_RECV)
    .or(CAP_SEND)
    .or(CAP_SETSOCKOPT)
    .or(CAP_SHUTDOWN);
pub const CAP_SOCK_SERVER: CapRight = CAP_ACCEPT
    .or(CAP_BIND)
    .or(CAP_GETPEERNAME)
    .or(CAP_GETSOCKNAME)
    .or(CAP_GETSOCKOPT)
    .or(CAP_LISTEN)
    .or(CAP_PEELOFF)
    .or(CAP_RECV)
    .or(CAP_SEND)
    .or(CAP_SETSOCKOPT)
    .or(CAP_SHUTDOWN);

pub const CAP_ALL0: u64 = CapRight::new(0, 0x0000_007f_ffff_ffff).raw();

// Index 1: MAC, semaphores, events, ioctl, process descriptors, xattrs, ACLs.
pub const CAP_MAC_GET: CapRight = CapRight::new(1, 0x0000_0000_0000_0001);
pub const CAP_MAC_SET: CapRight = CapRight::new(1, 0x0000_0000_0000_0002);
pub const CAP_SEM_GETVALUE: CapRight = CapRight::new(1, 0x0000_0000_0000_0004);
pub const CAP_SEM_POST: CapRight = CapRight::new(1, 0x0000_0000_0000_0008);
pub const CAP_SEM_WAIT: CapRight = CapRight::new(1, 0x0000_0000_0000_0010);
pub const CAP_EVENT: CapRight = CapRight::new(1, 0x0000_0000_0000_0020);
pub const CAP_KQUEUE_EVENT: CapRight = CapRight::new(1, 0x0000_0000_0000_0040);
pub const CAP_IOCTL: CapRight = CapRight::new(1, 0x0000_0000_0000_0080);
pub const CAP_TTYHOOK: CapRight = CapRight::new(1, 0x0000_0000_0000_0100);
pub const CAP_PDGETPID: CapRight = CapRight::new(1, 0x0000_0000_0000_0200);
pub const CAP_PDWAIT: CapRight = CapRight::new(1, 0x0000_0000_0000_0400);
pub const CAP_PDKILL: CapRight = CapRight::new(1, 0x0000_0000_0000_0800);
pub const CAP_EXTATTR_DELETE: CapRight = CapRight::new(1, 0x0000_0000_0000_1000);
pub const CAP_EXTATTR_GET: CapRight = CapRight::new(1, 0x0000_0000_0000_2000);
pub const CAP_EXTATTR_LIST: CapRight = CapRight::new(1, 0x0000_0000_0000_4000);
pub const CAP_EXTATTR_SET: CapRight = CapRight::new(1, 0x0000_0000_0000_8000);
pub const CAP_ACL_CHECK: CapRight = CapRight::new(1, 0x0000_0000_0001_0000);
pub const CAP_ACL_DELETE: CapRight = CapRight::new(1, 0x0000_0000_0002_0000);
pub const CAP_ACL_GET: CapRight = CapRight::new(1, 0x0000_0000_0004_0000);
pub const CAP_ACL_SET: CapRight = CapRight::new(1, 0x0000_0000_0008_0000);
pub const CAP_KQUEUE_CHANGE: CapRight = CapRight::new(1, 0x0000_0000_0010_0000);
pub const CAP_KQUEUE: CapRight = CAP_KQUEUE_EVENT.or(CAP_KQUEUE_CHANGE);
pub const CAP_FSIGNAL: CapRight = CapRight::new(1, 0x0000_0000_0020_0000);
pub const CAP_EPOLL_CTL: CapRight = CapRight::new(1, 0x0000_0000_0040_0000);
pub const CAP_NOTIFY: CapRight = CapRight::new(1, 0x0000_0000_0080_0000);
pub const CAP_SETNS: CapRight = CapRight::new(1, 0x0000_0000_0100_0000);
pub const CAP_PERFMON: CapRight = CapRight::new(1, 0x0000_0000_0200_0000);
pub const CAP_BPF: CapRight = CapRight::new(1, 0x0000_0000_0400_0000);
pub const CAP_POLL_EVENT: CapRight = CAP_EVENT;

pub const CAP_ALL1: u64 = CapRight::new(1, 0x0000_0000_07ff_ffff).raw();

// Allowed fcntl(2) commands, meaningful only alongside CAP_FCNTL.
pub const CAP_FCNTL_GETFL: u32 = 1 << libc::F_GETFL;
pub const CAP_FCNTL_SETFL: u32 = 1 << libc::F_SETFL;
pub const CAP_FCNTL_GETOWN: u32 = 1 << libc::F_GETOWN;
pub const CAP_FCNTL_SETOWN: u32 = 1 << libc::F_SETOWN;
pub const CAP_FCNTL_ALL: u32 =
    CAP_FCNTL_GETFL | CAP_FCNTL_SETFL | CAP_FCNTL_GETOWN | CAP_FCNTL_SETOWN;

// nioctls value meaning "every ioctl command".
pub const CAP_IOCTLS_ALL: i32 = -1;

pub const CAP_FCNTL_NAMES: &[(&str, u32)] = &[
    ("getfl", CAP_FCNTL_GETFL),
    ("setfl", CAP_FCNTL_SETFL),
    ("getown", CAP_FCNTL_GETOWN),
    ("setown", CAP_FCNTL_SETOWN),
];

pub const CAP_NAMES: &[(&str, CapRight)] = &[
    ("read", CAP_READ),
    ("write", CAP_WRITE),
    ("seek_tell", CAP_SEEK_TELL),
    ("seek", CAP_SEEK),
    ("pread", CAP_PREAD),
    ("pwrite", CAP_PWRITE),
    ("mmap", CAP_MMAP),
    ("mmap_r", CAP_MMAP_R),
    ("mmap_w", CAP_MMAP_W),
    ("mmap_x", CAP_MMAP_X),
    ("create", CAP_CREATE),
    ("fexecve", CAP_FEXECVE),
    ("fsync", CAP_FSYNC),
    ("ftruncate", CAP_FTRUNCATE),
    ("lookup", CAP_LOOKUP),
    ("fchdir", CAP_FCHDIR),
    ("fchflags", CAP_FCHFLAGS),
    ("fchmod", CAP_FCHMOD),
    ("fchown", CAP_FCHOWN),
    ("fcntl", CAP_FCNTL),
    ("flock", CAP_FLOCK),
    ("fpathconf", CAP_FPATHCONF),
    ("fsck", CAP_FSCK),
    ("fstat", CAP_FSTAT),
    ("fstatat", CAP_FSTATAT),
    ("fstatfs", CAP_FSTATFS),
    ("futimes", CAP_FUTIMES),
    ("linkat", CAP_LINKAT),
    ("mkdirat", CAP_MKDIRAT),
    ("mkfifoat", CAP_MKFIFOAT),
    ("mknodat", CAP_MKNODAT),
    ("renameat", CAP_RENAMEAT),
    ("symlinkat", CAP_SYMLINKAT),
    ("unlinkat", CAP_UNLINKAT),
    ("accept", CAP_ACCEPT),
    ("bind", CAP_BIND),
    ("connect", CAP_CONNECT),
    ("getpeername", CAP_GETPEERNAME),
    ("getsockname", CAP_GETSOCKNAME),
    ("getsockopt", CAP_GETSOCKOPT),
    ("listen", CAP_LISTEN),
    ("peeloff", CAP_PEELOFF),
    ("setsockopt", CAP_SETSOCKOPT),
    ("shutdown", CAP_SHUTDOWN),
    ("mac_get", CAP_MAC_GET),
    ("mac_set", CAP_MAC_SET),
    ("sem_getvalue", CAP_SEM_GETVALUE),
    ("sem_post", CAP_SEM_POST),
    ("sem_wait", CAP_SEM_WAIT),
    ("event", CAP_EVENT),
    ("kqueue_event", CAP_KQUEUE_EVENT),
    ("ioctl", CAP_IOCTL),
    ("ttyhook", CAP_TTYHOOK),
    ("pdgetpid", CAP_PDGETPID),
    ("pdwait", CAP_PDWAIT),
    ("pdkill", CAP_PDKILL),
    ("extattr_delete", CAP_EXTATTR_DELETE),
    ("extattr_get", CAP_EXTATTR_GET),
    ("extattr_list", CAP_EXTATTR_LIST),
    ("extattr_set", CAP_EXTATTR_SET),
    ("acl_check", CAP_ACL_CHECK),
    ("acl_delete", CAP_ACL_DELETE),
    ("acl_get", CAP_ACL_GET),
    ("acl_set", CAP_ACL_SET),
    ("kqueue_change", CAP_KQUEUE_CHANGE),
    ("fsignal", CAP_FSIGNAL),
    ("epoll_ctl", CAP_EPOLL_CTL),
    ("notify", CAP_NOTIFY),
    ("setns", CAP_SETNS),
    ("perfmon", CAP_PERFMON),
    ("bpf", CAP_BPF),
    // composites and aliases; name() reports the entries above first
    ("mmap_rw", CAP_MMAP_RW),
    ("mmap_rx", CAP_MMAP_RX),
    ("mmap_wx", CAP_MMAP_WX),
    ("mmap_rwx", CAP_MMAP_RWX),
    ("chflagsat", CAP_CHFLAGSAT),
    ("fchmodat", CAP_FCHMODAT),
    ("fchownat", CAP_FCHOWNAT),
    ("futimesat", CAP_FUTIMESAT),
    ("recv", CAP_RECV),
    ("send", CAP_SEND),
    ("sock_client", CAP_SOCK_CLIENT),
    ("sock_server", CAP_SOCK_SERVER),
    ("kqueue", CAP_KQUEUE),
    ("poll_event", CAP_POLL_EVENT),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_follows_encoding() {
        assert_eq!(CAP_READ.index(), 0);
        assert_eq!(CAP_SHUTDOWN.index(), 0);
        assert_eq!(CAP_IOCTL.index(), 1);
        assert_eq!(CAP_BPF.index(), 1);
    }

    #[test]
    fn composite_rights_include_their_parts() {
        assert_eq!(CAP_SEEK.bits() & CAP_SEEK_TELL.bits(), CAP_SEEK_TELL.bits());
        assert_eq!(CAP_PREAD.bits(), CAP_SEEK.bits() | CAP_READ.bits());
        assert_eq!(CAP_FSTATAT.bits(), CAP_FSTAT.bits() | CAP_LOOKUP.bits());
        assert_eq!(
            CAP_MMAP_RWX.bits(),
            CAP_MMAP_R.bits() | CAP_MMAP_W.bits() | CAP_MMAP_X.bits()
        );
        assert_eq!(CAP_FCHOWNAT.bits(), CAP_FCHOWN.bits() | CAP_LOOKUP.bits());
        assert_eq!(CAP_SOCK_SERVER.bits() & CAP_LISTEN.bits(), CAP_LISTEN.bits());
        assert_eq!(CAP_SOCK_CLIENT.bits() & CAP_LISTEN.bits(), 0);
        assert_eq!(CAP_KQUEUE.index(), 1);
    }

    #[test]
    fn aliases_keep_base_names() {
        assert_eq!(CapRight::from_name("poll_event"), Some(CAP_EVENT));
        assert_eq!(CAP_EVENT.name(), Some("event"));
        assert_eq!(CAP_READ.name(), Some("read"));
        assert_eq!(CapRight::from_name("sock_client"), Some(CAP_SOCK_CLIENT));
        assert_eq!(CAP_SOCK_CLIENT.name(), Some("sock_client"));
    }

    #[test]
    fn from_raw_validates_encoding() {
        assert_eq!(CapRight::from_raw(CAP_WRITE.raw()), Some(CAP_WRITE));
        assert_eq!(CapRight::from_raw(CAP_IOCTL.raw()), Some(CAP_IOCTL));
        // no index bit
        assert_eq!(CapRight::from_raw(0x1), None);
        // two index bits
        assert_eq!(CapRight::from_raw((0x3 << 57) | 0x1), None);
        // index 2 does not exist in version 0
        assert_eq!(CapRight::from_raw((0x4 << 57) | 0x1), None);
        // non-zero version
        assert_eq!(CapRight::from_raw(CAP_READ.raw() | (1 << 62)), None);
        // bit outside the catalogue
        assert_eq!(CapRight::from_raw(CAP_READ.raw() | (1 << 40)), None);
    }

    #[test]
    fn catalogue_names_round_trip() {
        assert_eq!(CapRight::from_name("read"), Some(CAP_READ));
        assert_eq!(CapRight::from_name("IOCTL"), Some(CAP_IOCTL));
        assert_eq!(CapRight::from_name("bogus"), None);
        assert_eq!(CAP_FSTAT.name(), Some("fstat"));
    }

    #[test]
    fn all_values_cover_every_right() {
        for (name, right) in CAP_NAMES {
            let all = if right.index() == 0 { CAP_ALL0 } else { CAP_ALL1 };
            assert_eq!(all & right.raw(), right.raw(), "{} not in all", name);
        }
    }
}
