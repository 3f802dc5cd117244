//! Change monitor configuration.

use std::time::Duration;

use derive_builder::Builder;

/// Default quiet period before a directory is reported.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Default cap on how long a continuously changing directory goes unreported.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(5);

/// Default capacity of the outgoing change channel.
pub const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Configuration for a [`ChangeMonitor`](crate::ChangeMonitor).
#[derive(Debug, Clone, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct WatchConfig {
    /// How long a directory must stay quiet before it is emitted. Each new
    /// event for the same directory restarts the wait, up to `max_wait`.
    #[builder(default = "DEFAULT_DEBOUNCE")]
    pub debounce: Duration,

    /// Longest delay between the first event of a burst and its signal, so a
    /// directory that never goes quiet is still reported.
    #[builder(default = "DEFAULT_MAX_WAIT")]
    pub max_wait: Duration,

    /// Capacity of the outgoing change channel.
    #[builder(default = "DEFAULT_CHANNEL_SIZE")]
    pub channel_size: usize,
}

impl WatchConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.debounce == Some(Duration::ZERO) {
            return Err("Debounce window must be non-zero".to_string());
        }
        let debounce = self.debounce.unwrap_or(DEFAULT_DEBOUNCE);
        if self.max_wait.unwrap_or(DEFAULT_MAX_WAIT) < debounce {
            return Err("Max wait must not be shorter than the debounce window".to_string());
        }
        if self.channel_size == Some(0) {
            return Err("Channel size must be at least 1".to_string());
        }
        Ok(())
    }
}

impl WatchConfig {
    /// Create a new watch config builder.
    pub fn builder() -> WatchConfigBuilder {
        WatchConfigBuilder::default()
    }

    /// Config with the given debounce window and defaults otherwise.
    ///
    /// `max_wait` is raised to the window if the default would be shorter.
    pub fn with_debounce(debounce: Duration) -> Self {
        Self {
            debounce,
            max_wait: DEFAULT_MAX_WAIT.max(debounce),
            ..Self::default()
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            max_wait: DEFAULT_MAX_WAIT,
            channel_size: DEFAULT_CHANNEL_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = WatchConfig::builder().build().unwrap();
        assert_eq!(config.debounce, Duration::from_millis(500));
        assert_eq!(config.max_wait, DEFAULT_MAX_WAIT);
        assert_eq!(config.channel_size, DEFAULT_CHANNEL_SIZE);
    }

    #[test]
    fn test_max_wait_shorter_than_debounce_rejected() {
        let result = WatchConfig::builder()
            .debounce(Duration::from_secs(2))
            .max_wait(Duration::from_secs(1))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_with_debounce_keeps_max_wait_valid() {
        let config = WatchConfig::with_debounce(Duration::from_secs(30));
        assert_eq!(config.max_wait, Duration::from_secs(30));
    }

    #[test]
    fn test_zero_debounce_rejected() {
        let result = WatchConfig::builder().debounce(Duration::ZERO).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_channel_rejected() {
        assert!(WatchConfig::builder().channel_size(0).build().is_err());
    }
}
