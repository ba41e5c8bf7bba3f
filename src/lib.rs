//! app_keeper Library Root
//!
//! Keeps a desktop application's window geometry and chosen host properties
//! across runs, in per-user directories or in a portable file next to the
//! executable. Also provides an About view model, culture switching with
//! relaunch, and an update checker that downloads and hands off installers.
//!
//! Hosts usually hold one [`AppManager`] and forward window lifecycle events
//! to it. The `ui` module maps everything onto eframe/egui.

pub mod about;
pub mod config;
pub mod context;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod manager;
pub mod metadata;
pub mod process;
pub mod registry;
pub mod screen;
pub mod settings;
pub mod ui;
pub mod update;
pub mod version;
pub mod window;

pub use about::AboutInfo;
pub use context::{AppContext, StorageMode, UserDirs};
pub use error::{Error, Result};
pub use lifecycle::{BinderState, LifecycleBinder};
pub use manager::AppManager;
pub use metadata::{AppMetadata, Culture, Link, MetadataKey, MetadataSource, RgbColor};
pub use process::{ProcessControl, SystemProcess};
pub use registry::{ManagedPropertyRegistry, RegisterOptions};
pub use settings::{Scope, SerializeAs, SettingEntry, SettingsStore, StoredValue};
pub use update::{
    AppUpdateDescriptor, Notification, UpdateCheckResult, UpdateChecker, UpdateNotifyMode,
};
pub use version::AppVersion;
pub use window::{HostWindow, Rect, WindowGeometry, WindowState};
