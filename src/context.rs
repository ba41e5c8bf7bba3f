//! Process-wide configuration threaded through every component.
//!
//! The storage mode is chosen once when the context is built. Stores opened
//! from a context keep their backend for their whole life.

use std::path::{Path, PathBuf};

use crate::config::{LOG_DIR_NAME, PORTABLE_ARGS};
use crate::metadata::AppMetadata;
use crate::settings::SettingsStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageMode {
    /// Per-user roaming/local directories of the platform.
    #[default]
    PerUser,
    /// A single file next to the executable.
    Portable,
}

impl StorageMode {
    pub fn from_flag(portable: bool) -> Self {
        if portable {
            StorageMode::Portable
        } else {
            StorageMode::PerUser
        }
    }

    /// Portable when any argument after the program name is `/portable` or `--portable`.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let portable = args
            .into_iter()
            .skip(1)
            .any(|arg| PORTABLE_ARGS.contains(&arg.as_ref()));
        StorageMode::from_flag(portable)
    }
}

/// Roots of the per-user store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDirs {
    /// Roamed settings (e.g. `%APPDATA%`, `~/.config`).
    pub roaming: PathBuf,
    /// Machine-local settings (e.g. `%LOCALAPPDATA%`, `~/.local/share`).
    pub local: PathBuf,
}

impl UserDirs {
    pub fn new(roaming: impl Into<PathBuf>, local: impl Into<PathBuf>) -> Self {
        UserDirs {
            roaming: roaming.into(),
            local: local.into(),
        }
    }

    pub fn from_system() -> Self {
        let roaming = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        let local = dirs::data_local_dir().unwrap_or_else(|| roaming.clone());
        UserDirs { roaming, local }
    }
}

#[derive(Debug, Clone)]
pub struct AppContext {
    metadata: AppMetadata,
    mode: StorageMode,
    user_dirs: UserDirs,
    portable_dir: PathBuf,
    download_dir: PathBuf,
}

impl AppContext {
    pub fn new(metadata: AppMetadata, mode: StorageMode) -> Self {
        let portable_dir = metadata.executable_dir();
        AppContext {
            metadata,
            mode,
            user_dirs: UserDirs::from_system(),
            portable_dir,
            download_dir: std::env::temp_dir(),
        }
    }

    pub fn with_user_dirs(mut self, user_dirs: UserDirs) -> Self {
        self.user_dirs = user_dirs;
        self
    }

    pub fn with_portable_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.portable_dir = dir.into();
        self
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    pub fn metadata(&self) -> &AppMetadata {
        &self.metadata
    }

    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    pub fn is_portable(&self) -> bool {
        self.mode == StorageMode::Portable
    }

    pub fn user_dirs(&self) -> &UserDirs {
        &self.user_dirs
    }

    pub fn portable_dir(&self) -> &Path {
        &self.portable_dir
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Where log files go: next to the executable in portable mode, else the local root.
    pub fn log_dir(&self) -> PathBuf {
        match self.mode {
            StorageMode::Portable => self.portable_dir.join(LOG_DIR_NAME),
            StorageMode::PerUser => self
                .user_dirs
                .local
                .join(&self.metadata.company)
                .join(&self.metadata.product_name)
                .join(LOG_DIR_NAME),
        }
    }

    /// Opens a settings group using this context's backend.
    pub fn open_store(&self, group: &str) -> SettingsStore {
        SettingsStore::open(self, group)
    }
}
