//! Adapter configuration
//!
//! Loadable from TOML; every field has a default, so an empty file is valid.
//!
//! ```toml
//! autosave_key = "react-planner_v0"
//! debounce_ms = 500
//! restore_profile = "autosave"
//!
//! [import_allow_list]
//! name = "kiosk"
//! item_kinds = ["bed", "desk"]
//! line_kinds = ["wall"]
//! ```

use crate::error::ConfigError;
use archify_scene::{AllowList, AllowListProfile};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default store key of the autosave slot
pub const DEFAULT_AUTOSAVE_KEY: &str = "react-planner_v0";

/// Default one-shot key for generated documents
pub const DEFAULT_HANDOFF_KEY: &str = "archify_generated_design";

/// Default quiet period before an autosave write
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Persistence adapter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    /// Store key of the autosave slot
    pub autosave_key: String,
    /// Store key generated documents are handed over under
    pub handoff_key: String,
    /// Quiet period before a write, in milliseconds
    pub debounce_ms: u64,
    /// Skip writes whose content matches the last successful write
    pub skip_unchanged: bool,
    /// Maximum sanitized imports held in memory
    pub cache_capacity: u64,
    /// Profile applied when restoring the autosave slot
    pub restore_profile: AllowListProfile,
    /// Profile applied to generated and imported documents
    pub import_profile: AllowListProfile,
    /// Replaces `restore_profile` when set
    pub restore_allow_list: Option<AllowList>,
    /// Replaces `import_profile` when set
    pub import_allow_list: Option<AllowList>,
}

impl AutosaveConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// `ConfigError::Parse` on bad TOML, otherwise whatever
    /// [`AutosaveConfig::validate`] rejects.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// `ConfigError::Read` if the file cannot be read, then as
    /// [`AutosaveConfig::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check keys and custom allow-lists
    ///
    /// # Errors
    /// `ConfigError::Invalid` for empty keys or a handoff key equal to the
    /// autosave key; `ConfigError::AllowList` for an unusable custom list.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.autosave_key.is_empty() || self.handoff_key.is_empty() {
            return Err(ConfigError::Invalid("store keys must not be empty".into()));
        }
        if self.autosave_key == self.handoff_key {
            return Err(ConfigError::Invalid(format!(
                "autosave and handoff keys are both {:?}",
                self.autosave_key
            )));
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::Invalid("cache_capacity must be positive".into()));
        }
        for list in [&self.restore_allow_list, &self.import_allow_list]
            .into_iter()
            .flatten()
        {
            list.validate()?;
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Allow-list used by `restore`
    #[must_use]
    pub fn restore_allow_list(&self) -> AllowList {
        self.restore_allow_list
            .clone()
            .unwrap_or_else(|| self.restore_profile.allow_list())
    }

    /// Allow-list used by imports
    #[must_use]
    pub fn import_allow_list(&self) -> AllowList {
        self.import_allow_list
            .clone()
            .unwrap_or_else(|| self.import_profile.allow_list())
    }

    #[inline]
    #[must_use]
    pub fn with_autosave_key(mut self, key: impl Into<String>) -> Self {
        self.autosave_key = key.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_handoff_key(mut self, key: impl Into<String>) -> Self {
        self.handoff_key = key.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce_ms = u64::try_from(debounce.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_skip_unchanged(mut self, skip: bool) -> Self {
        self.skip_unchanged = skip;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_restore_allow_list(mut self, allow: AllowList) -> Self {
        self.restore_allow_list = Some(allow);
        self
    }

    #[must_use]
    pub fn with_import_allow_list(mut self, allow: AllowList) -> Self {
        self.import_allow_list = Some(allow);
        self
    }
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            autosave_key: DEFAULT_AUTOSAVE_KEY.to_string(),
            handoff_key: DEFAULT_HANDOFF_KEY.to_string(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            skip_unchanged: false,
            cache_capacity: 64,
            restore_profile: AllowListProfile::Autosave,
            import_profile: AllowListProfile::ExternalImport,
            restore_allow_list: None,
            import_allow_list: None,
        }
    }
}
