//! Default value functions for configuration.

use std::path::PathBuf;

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// Connection Defaults
// =============================================================================

pub fn default_connect_timeout() -> u64 {
    30
}

pub fn default_registration_timeout() -> u64 {
    60
}

pub fn default_keepalive_interval() -> u64 {
    300
}

pub fn default_max_missed() -> u32 {
    2
}

pub fn default_reconnect_delay() -> u64 {
    10
}

// =============================================================================
// Journal / Lookup Defaults
// =============================================================================

pub fn default_journal_path() -> PathBuf {
    PathBuf::from("logs/cabal.log")
}

pub fn default_centralauth_url() -> String {
    "https://meta.wikimedia.org/w/api.php".to_string()
}

pub fn default_lookup_timeout() -> u64 {
    10
}
