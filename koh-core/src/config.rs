//! Runtime Configuration
//!
//! A small set of knobs for the per-thread runtime. The defaults are what
//! the runtime uses when nothing is configured; embedders can load a JSON
//! document instead:
//!
//! ```rust,ignore
//! let config = RuntimeConfig::from_json(r#"{ "max_flush_depth": 16 }"#)?;
//! Runtime::configure(config);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{KohError, Result};

/// Script `type` scanned by [`parse_module`](crate::component::parse_module)
/// when nothing else is configured.
pub const DEFAULT_MODULE_SCRIPT_TYPE: &str = "text/x-magento-init";

/// Tunables for the reactive runtime of one thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// How many flushes may be scheduled back to back, each from inside the
    /// previous one, before the batch is dropped. Guards write cycles
    /// between derived signals.
    pub max_flush_depth: usize,

    /// Upper bound on tasks run by a single microtask drain.
    pub max_microtasks_per_drain: usize,

    /// Script `type` attribute holding JSON module configuration.
    pub module_script_type: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_flush_depth: 100,
            max_microtasks_per_drain: 100_000,
            module_script_type: DEFAULT_MODULE_SCRIPT_TYPE.to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| KohError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject limits that would make the runtime unusable.
    pub fn validate(&self) -> Result<()> {
        if self.max_flush_depth == 0 {
            return Err(KohError::InvalidConfig(
                "max_flush_depth must be at least 1".to_string(),
            ));
        }
        if self.max_microtasks_per_drain == 0 {
            return Err(KohError::InvalidConfig(
                "max_microtasks_per_drain must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
