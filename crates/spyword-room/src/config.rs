//! Room store configuration.

use spyword_protocol::Settings;

/// Display names longer than this are cut, matching the client's input cap.
pub const DEFAULT_MAX_NAME_LEN: usize = 12;

/// Configuration shared by every room in a store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum display name length, in characters. Longer names are
    /// truncated on create and join; names are not otherwise validated.
    pub max_name_len: usize,

    /// Settings a freshly created room starts with.
    pub default_settings: Settings,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_name_len: DEFAULT_MAX_NAME_LEN,
            default_settings: Settings::default(),
        }
    }
}

impl StoreConfig {
    /// Applies the display name cap.
    pub(crate) fn clamp_name(&self, name: &str) -> String {
        name.chars().take(self.max_name_len).collect()
    }
}
