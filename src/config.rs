//! Configuration constants for app_keeper
//!
//! This module contains crate-wide values including file names, the settings
//! schema version and the window defaults used before anything is persisted.

/// On-disk schema version written into every settings file
pub const SCHEMA_VERSION: u32 = 1;

/// Default window size used when no geometry was persisted
pub static WINDOW_SIZE: [f64; 2] = [800.0, 580.0];

/// Smallest size a restored window may have
pub static MIN_WINDOW_SIZE: [f64; 2] = [120.0, 80.0];

/// Fallback position when the screen layout is unknown
pub static FALLBACK_POSITION: [f64; 2] = [100.0, 100.0];

/// Maximum number of log files to keep
pub const MAX_LOG_FILES: usize = 10;

/// Command-line tokens that switch the process to portable mode
pub const PORTABLE_ARGS: [&str; 2] = ["/portable", "--portable"];

/// User agent sent with update checks and downloads
pub const USER_AGENT: &str = concat!("app_keeper/", env!("CARGO_PKG_VERSION"));

// Settings groups
pub const MANAGER_GROUP: &str = "manager";
pub const CUSTOM_GROUP: &str = "custom";
pub const SHARED_GROUP: &str = "shared";

// Common file names/paths
pub const PORTABLE_FILE_SUFFIX: &str = ".settings.json";
pub const SETTINGS_FILE_EXTENSION: &str = "json";
pub const LOG_DIR_NAME: &str = "logs";

// Keys of the manager group
pub const KEY_LEFT: &str = "Left";
pub const KEY_TOP: &str = "Top";
pub const KEY_WIDTH: &str = "Width";
pub const KEY_HEIGHT: &str = "Height";
pub const KEY_WINDOW_STATE: &str = "WindowState";
pub const KEY_CULTURE: &str = "Culture";
pub const KEY_UPDATED: &str = "Updated";
pub const KEY_LAST_SEEN_VERSION: &str = "LastSeenUpdateVersion";

/// Key of the pre-0.4 single-blob store in the shared group
pub const KEY_LEGACY_BLOB: &str = "CustomSettings";
