use std::fmt;

use linux::{
    CapRight, CAP_ALL0, CAP_ALL1, CAP_FCNTL, CAP_FCNTL_ALL, CAP_IOCTL, CAP_IOCTLS_ALL,
    CAP_RIGHTS_ELEMENTS, CAP_RIGHTS_VERSION,
};
use utils::{SysError, SysResult};

const VERSION_SHIFT: u32 = 62;
const INDEX_SHIFT: u32 = 57;

const fn index_bit(idx: u32) -> u64 {
    1 << (INDEX_SHIFT + idx)
}

// CapRights is the primary rights vector. Every element carries its own
// one-hot index bit (and element 0 the version) so that each right can be
// OR-ed or AND-ed straight into the element it belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapRights {
    cr_rights: [u64; CAP_RIGHTS_ELEMENTS],
}

impl CapRights {
    pub const fn none() -> Self {
        Self {
            cr_rights: [
                (CAP_RIGHTS_VERSION << VERSION_SHIFT) | index_bit(0),
                index_bit(1),
            ],
        }
    }

    pub const fn all() -> Self {
        Self {
            cr_rights: [(CAP_RIGHTS_VERSION << VERSION_SHIFT) | CAP_ALL0, CAP_ALL1],
        }
    }

    // from_raw validates a rights vector handed in from user space: element i
    // must carry exactly index bit i and no rights outside the catalogue.
    pub fn from_raw(raw: [u64; CAP_RIGHTS_ELEMENTS]) -> SysResult<Self> {
        let all = Self::all();
        for (i, word) in raw.iter().enumerate() {
            if *word >> INDEX_SHIFT != all.cr_rights[i] >> INDEX_SHIFT {
                return Err(SysError::invalid_right(*word));
            }
            if *word & !all.cr_rights[i] != 0 {
                return Err(SysError::invalid_right(*word));
            }
        }
        Ok(Self { cr_rights: raw })
    }

    #[inline]
    pub fn raw(&self) -> [u64; CAP_RIGHTS_ELEMENTS] {
        self.cr_rights
    }

    #[inline]
    pub fn set(&mut self, right: CapRight) {
        self.cr_rights[right.index()] |= right.raw();
    }

    #[inline]
    pub fn has(&self, right: CapRight) -> bool {
        self.cr_rights[right.index()] & right.raw() == right.raw()
    }

    #[inline]
    pub fn contains(&self, little: &CapRights) -> bool {
        self.cr_rights
            .iter()
            .zip(little.cr_rights.iter())
            .fold(true, |acc, (big, little)| acc & (big & little == *little))
    }

    pub fn intersect(&self, other: &CapRights) -> Self {
        let mut cr_rights = self.cr_rights;
        for (word, other) in cr_rights.iter_mut().zip(other.cr_rights.iter()) {
            *word &= other;
        }
        Self { cr_rights }
    }

    #[inline]
    pub fn is_all(&self) -> bool {
        *self == Self::all()
    }
}

impl Default for CapRights {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for CapRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.cr_rights.iter().map(|w| format!("{:#018x}", w)))
            .finish()
    }
}

// IoctlAllow refines CAP_IOCTL down to a set of ioctl commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IoctlAllow {
    All,
    // sorted and free of duplicates
    Subset(Vec<u32>),
}

impl Default for IoctlAllow {
    fn default() -> Self {
        Self::Subset(Vec::new())
    }
}

impl IoctlAllow {
    pub fn from_cmds<I: IntoIterator<Item = u32>>(cmds: I) -> SysResult<Self> {
        let cmds = cmds.into_iter();
        let mut set = Vec::new();
        set.try_reserve(cmds.size_hint().0)?;
        for cmd in cmds {
            set.try_reserve(1)?;
            set.push(cmd);
        }
        set.sort_unstable();
        set.dedup();
        Ok(Self::Subset(set))
    }

    // try_clone copies the command list, reporting allocation failure instead
    // of aborting.
    pub fn try_clone(&self) -> SysResult<Self> {
        match self {
            Self::All => Ok(Self::All),
            Self::Subset(cmds) => {
                let mut copy = Vec::new();
                copy.try_reserve_exact(cmds.len())?;
                copy.extend_from_slice(cmds);
                Ok(Self::Subset(copy))
            }
        }
    }

    pub fn permits(&self, cmd: u32) -> bool {
        match self {
            Self::All => true,
            Self::Subset(cmds) => cmds.binary_search(&cmd).is_ok(),
        }
    }

    pub fn contains(&self, little: &IoctlAllow) -> bool {
        match (self, little) {
            (Self::All, _) => true,
            (Self::Subset(_), Self::All) => false,
            (Self::Subset(big), Self::Subset(little)) => {
                little.len() <= big.len() && little.iter().all(|c| big.binary_search(c).is_ok())
            }
        }
    }

    // intersect treats All as the identity element.
    pub fn intersect(&self, other: &IoctlAllow) -> SysResult<Self> {
        match (self, other) {
            (Self::All, x) | (x, Self::All) => x.try_clone(),
            (Self::Subset(a), Self::Subset(b)) => {
                let mut out = Vec::new();
                out.try_reserve_exact(std::cmp::min(a.len(), b.len()))?;
                let (mut i, mut j) = (0, 0);
                while i < a.len() && j < b.len() {
                    match a[i].cmp(&b[j]) {
                        std::cmp::Ordering::Less => i += 1,
                        std::cmp::Ordering::Greater => j += 1,
                        std::cmp::Ordering::Equal => {
                            out.push(a[i]);
                            i += 1;
                            j += 1;
                        }
                    }
                }
                Ok(Self::Subset(out))
            }
        }
    }

    // nioctls follows the user ABI: CAP_IOCTLS_ALL for All, the count otherwise.
    pub fn nioctls(&self) -> i32 {
        match self {
            Self::All => CAP_IOCTLS_ALL,
            Self::Subset(cmds) => cmds.len() as i32,
        }
    }

    pub fn cmds(&self) -> Option<&[u32]> {
        match self {
            Self::All => None,
            Self::Subset(cmds) => Some(cmds),
        }
    }
}

// CapsicumRights is a complete rights set: the primary rights plus the fcntl
// and ioctl refinements. The refinements are only meaningful while the
// matching primary right is held; regularize() clears them otherwise.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct CapsicumRights {
    primary: CapRights,
    fcntls: u32,
    ioctls: IoctlAllow,
}

impl CapsicumRights {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        let mut rights = Self::none();
        rights.set_all();
        rights
    }

    // init returns a rights set holding exactly the given rights, with empty
    // refinements.
    pub fn init<I: IntoIterator<Item = CapRight>>(rights: I) -> Self {
        let mut r = Self::none();
        r.set(rights);
        r
    }

    // set adds rights without clearing any already held. Refinements are left
    // untouched.
    pub fn set<I: IntoIterator<Item = CapRight>>(&mut self, rights: I) -> &mut Self {
        for right in rights {
            self.primary.set(right);
        }
        self
    }

    pub fn set_all(&mut self) -> &mut Self {
        self.primary = CapRights::all();
        self.fcntls = CAP_FCNTL_ALL;
        self.ioctls = IoctlAllow::All;
        self
    }

    // is_all only looks at the primary rights; a universal set dominates its
    // refinements.
    #[inline]
    pub fn is_all(&self) -> bool {
        self.primary.is_all()
    }

    #[inline]
    pub fn has(&self, right: CapRight) -> bool {
        self.primary.has(right)
    }

    pub fn with_fcntls(mut self, fcntls: u32) -> Self {
        self.fcntls = fcntls & CAP_FCNTL_ALL;
        self.regularize();
        self
    }

    pub fn with_ioctls<I: IntoIterator<Item = u32>>(mut self, cmds: I) -> SysResult<Self> {
        self.ioctls = IoctlAllow::from_cmds(cmds)?;
        self.regularize();
        Ok(self)
    }

    pub fn with_all_ioctls(mut self) -> Self {
        self.ioctls = IoctlAllow::All;
        self.regularize();
        self
    }

    pub(crate) fn from_parts(primary: CapRights, fcntls: u32, ioctls: IoctlAllow) -> Self {
        let mut rights = Self {
            primary,
            fcntls: fcntls & CAP_FCNTL_ALL,
            ioctls,
        };
        rights.regularize();
        rights
    }

    #[inline]
    pub fn primary(&self) -> &CapRights {
        &self.primary
    }

    #[inline]
    pub fn fcntls(&self) -> u32 {
        self.fcntls
    }

    #[inline]
    pub fn ioctls(&self) -> &IoctlAllow {
        &self.ioctls
    }

    // regularize drops refinements whose primary right is not held and
    // reports whether anything changed.
    pub fn regularize(&mut self) -> bool {
        let mut changed = false;
        if !self.has(CAP_FCNTL) && self.fcntls != 0 {
            self.fcntls = 0;
            changed = true;
        }
        if !self.has(CAP_IOCTL) && self.ioctls != IoctlAllow::default() {
            self.ioctls = IoctlAllow::default();
            changed = true;
        }
        changed
    }

    // contains reports whether self grants everything `required` asks for.
    // Refinements are only compared for the categories `required` actually
    // requests.
    pub fn contains(&self, required: &CapsicumRights) -> bool {
        if self.is_all() {
            return true;
        }
        if !self.primary.contains(&required.primary) {
            return false;
        }
        if required.has(CAP_FCNTL) && self.fcntls & required.fcntls != required.fcntls {
            return false;
        }
        if required.has(CAP_IOCTL) && !self.ioctls.contains(&required.ioctls) {
            return false;
        }
        true
    }

    // intersect is what narrowing uses: the result never grants anything
    // either side lacks.
    pub fn intersect(&self, other: &CapsicumRights) -> SysResult<Self> {
        let ioctls = self.ioctls.intersect(&other.ioctls)?;
        Ok(Self::from_parts(
            self.primary.intersect(&other.primary),
            self.fcntls & other.fcntls,
            ioctls,
        ))
    }

    pub fn try_clone(&self) -> SysResult<Self> {
        Ok(Self {
            primary: self.primary,
            fcntls: self.fcntls,
            ioctls: self.ioctls.try_clone()?,
        })
    }
}

// Display renders the rights the way /proc/<pid>/fdinfo shows them.
impl fmt::Display for CapsicumRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rights:")?;
        for word in self.primary.raw().iter() {
            write!(f, "\t{:#016x}", word)?;
        }
        writeln!(f)?;
        writeln!(f, " fcntls: {:#08x}", self.fcntls)?;
        match &self.ioctls {
            IoctlAllow::All if self.has(CAP_IOCTL) => writeln!(f, " ioctls: all")?,
            IoctlAllow::Subset(cmds) if !cmds.is_empty() => {
                write!(f, " ioctls:")?;
                for cmd in cmds {
                    write!(f, "\t{:#08x}", cmd)?;
                }
                writeln!(f)?;
            }
            _ => (),
        }
        Ok(())
    }
}
