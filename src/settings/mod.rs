//! Settings persistence: values, backends, the per-group store and the legacy
//! blob migration.

pub mod backend;
pub mod legacy;
pub mod store;
pub mod value;

pub use backend::{PortableBackend, ScopedValues, SettingsBackend, UserBackend, Values};
pub use legacy::{legacy_blob_entry, migrate_legacy_blob};
pub use store::SettingsStore;
pub use value::{Scope, SerializeAs, SettingEntry, StoredValue};
