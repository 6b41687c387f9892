use std::{fmt, str::FromStr, sync::Arc};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use fs::File;
use utils::{SysError, SysResult};

use crate::{Capability, CapsicumRights, FileRef};

static ALL_RIGHTS: Lazy<Arc<CapsicumRights>> = Lazy::new(|| Arc::new(CapsicumRights::all()));

// all_rights is what a lookup reports for a descriptor that is not a
// capability.
pub fn all_rights() -> Arc<CapsicumRights> {
    Arc::clone(&ALL_RIGHTS)
}

// Enforcement is the gate every descriptor access goes through. Exactly one
// implementation is picked at startup.
pub trait Enforcement: fmt::Debug + Send + Sync {
    fn mode(&self) -> EnforcementMode;

    // lookup checks `required` against the entry and hands back the file to
    // operate on together with the rights actually held, which may be
    // broader than `required`.
    fn lookup(
        &self,
        entry: &FileRef,
        required: &CapsicumRights,
    ) -> SysResult<(Arc<File>, Arc<CapsicumRights>)>;

    // install restricts an entry to `base`. The result never holds more than
    // the entry did before.
    fn install(&self, base: &CapsicumRights, entry: &FileRef) -> SysResult<FileRef>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Enforcing;

impl Enforcement for Enforcing {
    fn mode(&self) -> EnforcementMode {
        EnforcementMode::Enforcing
    }

    fn lookup(
        &self,
        entry: &FileRef,
        required: &CapsicumRights,
    ) -> SysResult<(Arc<File>, Arc<CapsicumRights>)> {
        match entry {
            FileRef::File(file) => Ok((Arc::clone(file), all_rights())),
            FileRef::Capability(cap) => {
                if !cap.rights().contains(required) {
                    logger::debug!(
                        "capability on {} lacks rights: have {:?}, need {:?}",
                        cap.underlying().name(),
                        cap.rights(),
                        required
                    );
                    return Err(SysError::not_capable());
                }
                Ok((Arc::clone(cap.underlying()), Arc::clone(cap.rights())))
            }
        }
    }

    fn install(&self, base: &CapsicumRights, entry: &FileRef) -> SysResult<FileRef> {
        let (rights, file) = match entry {
            FileRef::File(file) => {
                let mut rights = base.try_clone()?;
                rights.regularize();
                (rights, Arc::clone(file))
            }
            FileRef::Capability(cap) => (cap.rights().intersect(base)?, Arc::clone(cap.underlying())),
        };
        logger::trace!("installing capability on {}: {:?}", file.name(), rights);
        Ok(FileRef::Capability(Arc::new(Capability::new(rights, file))))
    }
}

// PassThrough switches enforcement off: nothing is ever denied and nothing is
// ever wrapped.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThrough;

impl Enforcement for PassThrough {
    fn mode(&self) -> EnforcementMode {
        EnforcementMode::PassThrough
    }

    fn lookup(
        &self,
        entry: &FileRef,
        _: &CapsicumRights,
    ) -> SysResult<(Arc<File>, Arc<CapsicumRights>)> {
        Ok((Arc::clone(entry.underlying()), all_rights()))
    }

    fn install(&self, _: &CapsicumRights, entry: &FileRef) -> SysResult<FileRef> {
        Ok(entry.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnforcementMode {
    Enforcing,
    PassThrough,
}

impl Default for EnforcementMode {
    fn default() -> Self {
        EnforcementMode::Enforcing
    }
}

impl EnforcementMode {
    pub fn gate(self) -> Arc<dyn Enforcement> {
        match self {
            EnforcementMode::Enforcing => Arc::new(Enforcing),
            EnforcementMode::PassThrough => Arc::new(PassThrough),
        }
    }
}

impl FromStr for EnforcementMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enforcing" => Ok(EnforcementMode::Enforcing),
            "pass-through" | "passthrough" | "disabled" => Ok(EnforcementMode::PassThrough),
            _ => Err(format!("unknown enforcement mode {:?}", s)),
        }
    }
}

impl fmt::Display for EnforcementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnforcementMode::Enforcing => write!(f, "enforcing"),
            EnforcementMode::PassThrough => write!(f, "pass-through"),
        }
    }
}
