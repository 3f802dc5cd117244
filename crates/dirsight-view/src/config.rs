//! View synchronizer configuration.

use std::time::Duration;

use derive_builder::Builder;

use dirsight_core::ScanConfig;
use dirsight_watch::DEFAULT_DEBOUNCE;

use crate::sort::SortSpec;

/// Default delay between the last change signal and the rescan it causes.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(1500);

/// Configuration for a [`ViewSynchronizer`](crate::ViewSynchronizer) and
/// its driver.
#[derive(Debug, Clone, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct SyncConfig {
    /// Quiet period after the last change signal before rescanning.
    #[builder(default = "DEFAULT_SETTLE")]
    pub settle: Duration,

    /// Per-directory debounce of the change monitor.
    #[builder(default = "DEFAULT_DEBOUNCE")]
    pub debounce: Duration,

    /// Scan settings; the root is replaced by the synchronizer's root.
    #[builder(default)]
    pub scan: ScanConfig,

    /// Initial sort order.
    #[builder(default)]
    pub sort: SortSpec,
}

impl SyncConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        let settle = self.settle.unwrap_or(DEFAULT_SETTLE);
        let debounce = self.debounce.unwrap_or(DEFAULT_DEBOUNCE);
        if debounce.is_zero() {
            return Err("Debounce window must be non-zero".to_string());
        }
        if settle < debounce {
            return Err(format!(
                "Settle delay ({settle:?}) must not be shorter than the debounce window ({debounce:?})"
            ));
        }
        Ok(())
    }
}

impl SyncConfig {
    /// Create a new sync config builder.
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            settle: DEFAULT_SETTLE,
            debounce: DEFAULT_DEBOUNCE,
            scan: ScanConfig::default(),
            sort: SortSpec::default(),
        }
    }
}
