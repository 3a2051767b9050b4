// ============================================================================
// cuebatch-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for CoreConfig
//
// This module implements a fluent builder for CoreConfig. Every field starts
// at its documented default, so callers only chain the overrides they need.

use std::path::PathBuf;

use super::CoreConfig;

/// Builder for creating CoreConfig instances.
///
/// # Examples
///
/// ```rust
/// use cuebatch_core::config::CoreConfigBuilder;
///
/// let config = CoreConfigBuilder::new()
///     .input_dir("dist-ass")
///     .extension("ass")
///     .resync_offset_ms(-500)
///     .gap_threshold_ms(300)
///     .log_stderr(true)
///     .build();
///
/// assert_eq!(config.extension, "ass");
/// assert_eq!(config.resync_offset_ms, -500);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CoreConfigBuilder {
    config: CoreConfig,
}

impl CoreConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the directory listed for candidate files.
    pub fn input_dir(mut self, input_dir: impl Into<PathBuf>) -> Self {
        self.config.input_dir = input_dir.into();
        self
    }

    /// Sets the candidate extension. A leading dot is ignored.
    pub fn extension(mut self, extension: &str) -> Self {
        self.config.extension = extension.trim_start_matches('.').to_string();
        self
    }

    /// Sets the file name filter pattern.
    pub fn pattern(mut self, pattern: &str) -> Self {
        self.config.pattern = pattern.to_string();
        self
    }

    /// Sets the concurrency cap.
    pub fn max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.config.max_concurrent = max_concurrent;
        self
    }

    /// Sets the resync offset in milliseconds.
    pub fn resync_offset_ms(mut self, offset_ms: i64) -> Self {
        self.config.resync_offset_ms = offset_ms;
        self
    }

    /// Sets the gap-fill threshold in milliseconds.
    pub fn gap_threshold_ms(mut self, threshold_ms: i64) -> Self {
        self.config.gap_threshold_ms = threshold_ms;
        self
    }

    /// Enables forwarding of external command stderr to the log.
    pub fn log_stderr(mut self, enable: bool) -> Self {
        self.config.log_stderr = enable;
        self
    }

    /// Sets the delay applied before every external command spawn.
    pub fn launch_delay_ms(mut self, delay_ms: u64) -> Self {
        self.config.launch_delay_ms = delay_ms;
        self
    }

    /// Builds the configuration. Validation is left to
    /// [`CoreConfig::validate`].
    pub fn build(self) -> CoreConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_match_config_defaults() {
        assert_eq!(CoreConfigBuilder::new().build(), CoreConfig::default());
    }

    #[test]
    fn test_extension_strips_leading_dot() {
        let config = CoreConfigBuilder::new().extension(".ass").build();
        assert_eq!(config.extension, "ass");
    }
}
