// Settings store: one group of named values backed by the context's backend.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::context::{AppContext, StorageMode};
use crate::error::Result;
use crate::settings::backend::{PortableBackend, ScopedValues, SettingsBackend, UserBackend};
use crate::settings::value::{Scope, SettingEntry, StoredValue};

/// Key/value store for one settings group.
///
/// The backend is fixed when the store is opened. Loading never fails: a
/// corrupt or incompatible file is logged and the group falls back to its
/// defaults.
#[derive(Debug)]
pub struct SettingsStore {
    group: String,
    backend: Box<dyn SettingsBackend>,
    entries: BTreeMap<String, SettingEntry>,
    values: ScopedValues,
}

impl SettingsStore {
    pub fn open(ctx: &AppContext, group: &str) -> Self {
        let metadata = ctx.metadata();
        let backend: Box<dyn SettingsBackend> = match ctx.mode() {
            StorageMode::PerUser => Box::new(UserBackend::new(
                ctx.user_dirs(),
                &metadata.company,
                &metadata.product_name,
                &metadata.version,
            )),
            StorageMode::Portable => Box::new(PortableBackend::new(
                ctx.portable_dir(),
                &metadata.product_name,
                &metadata.version,
            )),
        };
        SettingsStore::with_backend(group, backend)
    }

    pub fn with_backend(group: &str, backend: Box<dyn SettingsBackend>) -> Self {
        let mut store = SettingsStore {
            group: group.to_string(),
            backend,
            entries: BTreeMap::new(),
            values: ScopedValues::default(),
        };
        store.reload();
        store
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn location(&self, scope: Scope) -> PathBuf {
        self.backend.location(&self.group, scope)
    }

    /// Declares a setting's default and placement. A value already stored in
    /// the other scope is moved over.
    pub fn define(&mut self, entry: SettingEntry) {
        let other = match entry.scope {
            Scope::Local => Scope::Roamed,
            Scope::Roamed => Scope::Local,
        };
        if let Some(value) = self.values.scope_mut(other).remove(&entry.name) {
            self.values
                .scope_mut(entry.scope)
                .insert(entry.name.clone(), value);
        }
        self.entries.insert(entry.name.clone(), entry);
    }

    pub fn entry(&self, name: &str) -> Option<&SettingEntry> {
        self.entries.get(name)
    }

    fn scope_of(&self, key: &str) -> Scope {
        self.entries.get(key).map(|e| e.scope).unwrap_or_default()
    }

    /// The stored value, ignoring defaults.
    pub fn persisted(&self, key: &str) -> Option<&StoredValue> {
        self.values
            .local
            .get(key)
            .or_else(|| self.values.roamed.get(key))
    }

    /// The stored value or, when nothing is stored, the entry's default.
    pub fn get(&self, key: &str) -> Option<StoredValue> {
        self.persisted(key)
            .cloned()
            .or_else(|| self.entries.get(key).and_then(|e| e.default.clone()))
    }

    /// Typed read; an undecodable stored value falls back to the default.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if let Some(value) = self.persisted(key) {
            match value.decode() {
                Ok(decoded) => return Some(decoded),
                Err(e) => log::warn!("Ignoring stored value of '{}/{}': {}", self.group, key, e),
            }
        }
        self.entries
            .get(key)
            .and_then(|e| e.default.as_ref())
            .and_then(|d| d.decode().ok())
    }

    pub fn set(&mut self, key: &str, value: StoredValue) {
        let scope = self.scope_of(key);
        let other = match scope {
            Scope::Local => Scope::Roamed,
            Scope::Roamed => Scope::Local,
        };
        self.values.scope_mut(other).remove(key);
        self.values.scope_mut(scope).insert(key.to_string(), value);
    }

    /// Typed write using the entry's serialization kind; null removes the key.
    pub fn set_as<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let kind = self.entries.get(key).and_then(|e| e.serialize_as);
        match StoredValue::encode(value, kind)? {
            Some(stored) => self.set(key, stored),
            None => {
                self.remove(key);
            }
        }
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<StoredValue> {
        let local = self.values.local.remove(key);
        let roamed = self.values.roamed.remove(key);
        local.or(roamed)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.persisted(key).is_some()
    }

    pub fn keys(&self) -> Vec<String> {
        self.values
            .local
            .keys()
            .chain(self.values.roamed.keys())
            .cloned()
            .collect()
    }

    pub fn save(&mut self) -> Result<()> {
        self.backend.save(&self.group, &self.values)?;
        log::debug!("Saved settings group '{}'", self.group);
        Ok(())
    }

    /// Re-reads the group from disk, recovering from corruption with defaults.
    pub fn reload(&mut self) {
        match self.backend.load(&self.group) {
            Ok(values) => self.values = values,
            Err(e) => {
                log::warn!(
                    "Settings group '{}' could not be loaded, resetting to defaults: {}",
                    self.group,
                    e
                );
                if let Err(e) = self.reset() {
                    log::warn!("Failed to reset settings group '{}': {}", self.group, e);
                }
            }
        }
    }

    /// Drops every stored value so defaults apply, and writes the empty group.
    pub fn reset(&mut self) -> Result<()> {
        self.values = ScopedValues::default();
        self.save()
    }

    /// Imports values written by an older application version for keys that
    /// are not set yet. Returns whether anything was imported.
    pub fn upgrade(&mut self) -> Result<bool> {
        let Some(previous) = self.backend.load_previous(&self.group)? else {
            return Ok(false);
        };
        let mut imported = 0;
        for scope in [Scope::Local, Scope::Roamed] {
            for (key, value) in previous.scope(scope) {
                if !self.contains(key) {
                    self.values.scope_mut(scope).insert(key.clone(), value.clone());
                    imported += 1;
                }
            }
        }
        if imported > 0 {
            log::info!("Upgraded {} settings of group '{}'", imported, self.group);
            self.save()?;
        }
        Ok(imported > 0)
    }
}
