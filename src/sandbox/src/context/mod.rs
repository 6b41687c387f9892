use std::sync::Arc;

use capsicum::Enforcement;
use once_cell::sync::OnceCell;

use crate::config::SandboxConfig;

// Context holds what is decided once per process: the configuration and the
// enforcement gate it selected.
#[derive(Debug)]
pub struct Context {
    config: SandboxConfig,
    gate: Arc<dyn Enforcement>,
}

static CONTEXT: OnceCell<Context> = OnceCell::new();

pub fn init_context(config: SandboxConfig) -> anyhow::Result<()> {
    let gate = config.enforcement.gate();
    logger::info!(
        "capability enforcement: {} (max fds {})",
        gate.mode(),
        config.max_fds
    );
    CONTEXT
        .set(Context { config, gate })
        .map_err(|_| anyhow::anyhow!("context is already set"))
}

pub fn context() -> &'static Context {
    CONTEXT.get().expect("Context is not set")
}

#[cfg(test)]
pub fn init_for_test() {
    if CONTEXT.get().is_some() {
        return;
    }
    // another test thread may win the race, which is fine
    let _ = init_context(SandboxConfig::default());
}

impl Context {
    #[inline]
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    #[inline]
    pub fn gate(&self) -> Arc<dyn Enforcement> {
        Arc::clone(&self.gate)
    }

    #[inline]
    pub fn max_fds(&self) -> u64 {
        self.config.max_fds
    }
}
