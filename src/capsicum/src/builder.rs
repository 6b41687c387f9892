// Construction of rights sets from sequences of rights, names or the raw
// values user space passes to cap_rights_limit(2) and friends.

use std::iter::FromIterator;

use linux::{CapRight, CAP_FCNTL_ALL, CAP_FCNTL_NAMES, CAP_IOCTLS_ALL, CAP_RIGHTS_ELEMENTS};
use utils::{bail_libc, SysError, SysResult};

use crate::{CapRights, CapsicumRights, IoctlAllow};

// cap_rights! builds a rights set from a literal list of rights.
//
//     let rights = cap_rights![CAP_READ, CAP_SEEK];
#[macro_export]
macro_rules! cap_rights {
    () => {
        $crate::CapsicumRights::none()
    };
    ($($right:expr),+ $(,)?) => {
        $crate::CapsicumRights::init([$($right),+])
    };
}

impl FromIterator<CapRight> for CapsicumRights {
    fn from_iter<I: IntoIterator<Item = CapRight>>(iter: I) -> Self {
        CapsicumRights::init(iter)
    }
}

impl Extend<CapRight> for CapsicumRights {
    fn extend<I: IntoIterator<Item = CapRight>>(&mut self, iter: I) {
        self.set(iter);
    }
}

impl CapsicumRights {
    // try_init is init for undecoded rights. A zero (the old list terminator)
    // or any other malformed value is rejected instead of being set.
    pub fn try_init<I: IntoIterator<Item = u64>>(raw: I) -> SysResult<Self> {
        let mut rights = Self::none();
        rights.try_set(raw)?;
        Ok(rights)
    }

    // try_set validates every value before touching self, so a failure leaves
    // the set unchanged.
    pub fn try_set<I: IntoIterator<Item = u64>>(&mut self, raw: I) -> SysResult<&mut Self> {
        let mut decoded = Vec::new();
        for r in raw {
            let right = CapRight::from_raw(r).ok_or_else(|| SysError::invalid_right(r))?;
            decoded.try_reserve(1)?;
            decoded.push(right);
        }
        Ok(self.set(decoded))
    }

    // from_names builds a rights set from catalogue names such as "read" or
    // "seek".
    pub fn from_names<'a, I: IntoIterator<Item = &'a str>>(names: I) -> SysResult<Self> {
        let mut rights = Self::none();
        for name in names {
            let right = CapRight::from_name(name.trim()).ok_or_else(|| {
                SysError::new_with_msg(libc::EINVAL, format!("unknown right {:?}", name))
            })?;
            rights.set([right]);
        }
        Ok(rights)
    }

    // from_raw decodes the arguments of cap_rights_limit(2): the primary
    // vector, the fcntl mask and an ioctl list whose length is CAP_IOCTLS_ALL
    // for "every command".
    pub fn from_raw(
        primary: [u64; CAP_RIGHTS_ELEMENTS],
        fcntls: u32,
        nioctls: i32,
        ioctls: &[u32],
    ) -> SysResult<Self> {
        let primary = CapRights::from_raw(primary)?;
        if fcntls & !CAP_FCNTL_ALL != 0 {
            bail_libc!(libc::EINVAL);
        }
        let ioctls = match nioctls {
            CAP_IOCTLS_ALL => IoctlAllow::All,
            n if n < 0 || n as usize > ioctls.len() => bail_libc!(libc::EINVAL),
            n => IoctlAllow::from_cmds(ioctls[..n as usize].iter().copied())?,
        };
        Ok(Self::from_parts(primary, fcntls, ioctls))
    }
}

pub fn fcntls_from_names<'a, I: IntoIterator<Item = &'a str>>(names: I) -> SysResult<u32> {
    let mut mask = 0;
    for name in names {
        let name = name.trim();
        let bit = CAP_FCNTL_NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, bit)| *bit)
            .ok_or_else(|| {
                SysError::new_with_msg(libc::EINVAL, format!("unknown fcntl {:?}", name))
            })?;
        mask |= bit;
    }
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use linux::*;
    use utils::SysErrorKind;

    use super::*;

    #[test]
    fn macro_matches_init() {
        assert_eq!(cap_rights![], CapsicumRights::none());
        assert_eq!(
            cap_rights![CAP_READ, CAP_SEEK,],
            CapsicumRights::init([CAP_READ, CAP_SEEK])
        );
    }

    #[test]
    fn collect_and_extend() {
        let mut rights: CapsicumRights = vec![CAP_READ].into_iter().collect();
        rights.extend([CAP_WRITE]);
        assert_eq!(rights, cap_rights![CAP_READ, CAP_WRITE]);
    }

    #[test]
    fn try_init_rejects_terminator() {
        let err = CapsicumRights::try_init([CAP_READ.raw(), 0]).unwrap_err();
        assert_eq!(err.kind(), SysErrorKind::InvalidRight);
        assert_eq!(err.code(), libc::EINVAL);
    }

    #[test]
    fn try_set_leaves_rights_untouched_on_error() {
        let mut rights = cap_rights![CAP_READ];
        assert!(rights.try_set([CAP_WRITE.raw(), 0x3]).is_err());
        assert_eq!(rights, cap_rights![CAP_READ]);
        rights.try_set([CAP_WRITE.raw()]).unwrap();
        assert_eq!(rights, cap_rights![CAP_READ, CAP_WRITE]);
    }

    #[test]
    fn from_names_uses_catalogue() {
        let rights = CapsicumRights::from_names("read, seek".split(',')).unwrap();
        assert_eq!(rights, cap_rights![CAP_READ, CAP_SEEK]);
        assert!(CapsicumRights::from_names(["frobnicate"]).is_err());
    }

    #[test]
    fn from_raw_decodes_ioctl_list() {
        let primary = cap_rights![CAP_IOCTL].primary().raw();
        let rights = CapsicumRights::from_raw(primary, 0, 2, &[7, 3, 99]).unwrap();
        assert_eq!(rights.ioctls(), &IoctlAllow::Subset(vec![3, 7]));

        let rights = CapsicumRights::from_raw(primary, 0, CAP_IOCTLS_ALL, &[]).unwrap();
        assert_eq!(rights.ioctls(), &IoctlAllow::All);

        assert!(CapsicumRights::from_raw(primary, 0, 3, &[1]).is_err());
        assert!(CapsicumRights::from_raw(primary, 0, -2, &[]).is_err());
        assert!(CapsicumRights::from_raw(primary, 1 << 30, 0, &[]).is_err());
    }

    #[test]
    fn from_raw_regularizes() {
        let primary = cap_rights![CAP_READ].primary().raw();
        let rights = CapsicumRights::from_raw(primary, CAP_FCNTL_GETFL, CAP_IOCTLS_ALL, &[])
            .unwrap();
        assert_eq!(rights, cap_rights![CAP_READ]);
    }

    #[test]
    fn fcntl_names() {
        assert_eq!(
            fcntls_from_names(["getfl", "SETOWN"]).unwrap(),
            CAP_FCNTL_GETFL | CAP_FCNTL_SETOWN
        );
        assert!(fcntls_from_names(["dupfd"]).is_err());
    }
}
