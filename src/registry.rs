//! Managed host properties persisted as named settings.
//!
//! Each property is bound through a getter/setter pair supplied at
//! registration, so a registered name always refers to a real, writable
//! property of the host type.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::settings::{SerializeAs, SettingEntry, SettingsStore, StoredValue};

type Getter<H> = Box<dyn Fn(&H) -> Result<Option<StoredValue>>>;
type Setter<H> = Box<dyn Fn(&mut H, &StoredValue) -> Result<()>>;

struct ManagedProperty<H> {
    entry: SettingEntry,
    get: Getter<H>,
    set: Setter<H>,
}

/// Optional knobs for [`ManagedPropertyRegistry::register_with`].
pub struct RegisterOptions<T> {
    /// `None` picks `String` for scalar values and `Structured` otherwise.
    pub serialize_as: Option<SerializeAs>,
    /// Value reported by the store when nothing was persisted. Restoring
    /// never applies it; the host's own initial value stands.
    pub default_value: Option<T>,
    pub roamed: bool,
}

impl<T> Default for RegisterOptions<T> {
    fn default() -> Self {
        RegisterOptions {
            serialize_as: None,
            default_value: None,
            roamed: false,
        }
    }
}

pub struct ManagedPropertyRegistry<H> {
    properties: Vec<ManagedProperty<H>>,
}

impl<H: 'static> Default for ManagedPropertyRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: 'static> ManagedPropertyRegistry<H> {
    pub fn new() -> Self {
        ManagedPropertyRegistry {
            properties: Vec::new(),
        }
    }

    /// Registers a property with automatic serialization, no default and local scope.
    pub fn register<T, G, S>(&mut self, name: &str, get: G, set: S)
    where
        T: Serialize + DeserializeOwned + 'static,
        G: Fn(&H) -> T + 'static,
        S: Fn(&mut H, T) + 'static,
    {
        self.insert(SettingEntry::new(name), get, set);
    }

    pub fn register_with<T, G, S>(
        &mut self,
        name: &str,
        get: G,
        set: S,
        options: RegisterOptions<T>,
    ) -> Result<()>
    where
        T: Serialize + DeserializeOwned + 'static,
        G: Fn(&H) -> T + 'static,
        S: Fn(&mut H, T) + 'static,
    {
        let mut entry = SettingEntry::new(name).roamed(options.roamed);
        if let Some(kind) = options.serialize_as {
            entry = entry.serialize_as(kind);
        }
        if let Some(default) = &options.default_value {
            entry = entry
                .with_default(default)
                .map_err(|e| Error::binding(name, e))?;
        }
        self.insert(entry, get, set);
        Ok(())
    }

    fn insert<T, G, S>(&mut self, entry: SettingEntry, get: G, set: S)
    where
        T: Serialize + DeserializeOwned + 'static,
        G: Fn(&H) -> T + 'static,
        S: Fn(&mut H, T) + 'static,
    {
        let kind = entry.serialize_as;
        let name = entry.name.clone();
        let property = ManagedProperty {
            get: Box::new(move |host: &H| {
                StoredValue::encode(&get(host), kind).map_err(|e| Error::binding(&name, e))
            }),
            set: Box::new(move |host: &mut H, value: &StoredValue| {
                set(host, value.decode::<T>()?);
                Ok(())
            }),
            entry,
        };
        match self
            .properties
            .iter_mut()
            .find(|p| p.entry.name == property.entry.name)
        {
            Some(existing) => {
                log::debug!("Re-registering managed property '{}'", property.entry.name);
                *existing = property;
            }
            None => self.properties.push(property),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|p| p.entry.name.as_str())
    }

    pub fn entry(&self, name: &str) -> Option<&SettingEntry> {
        self.properties
            .iter()
            .find(|p| p.entry.name == name)
            .map(|p| &p.entry)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Declares every registered entry on `store` so defaults and scopes apply.
    pub fn define_all(&self, store: &mut SettingsStore) {
        for property in &self.properties {
            store.define(property.entry.clone());
        }
    }

    /// Writes every persisted value onto `host`. Properties without a stored
    /// value keep the host's value; undecodable values are dropped from the
    /// store. Returns how many properties were written.
    pub fn restore_all(&self, host: &mut H, store: &mut SettingsStore) -> usize {
        self.define_all(store);
        let mut restored = 0;
        for property in &self.properties {
            let name = &property.entry.name;
            let Some(value) = store.persisted(name).cloned() else {
                continue;
            };
            match (property.set)(host, &value) {
                Ok(()) => restored += 1,
                Err(e) => {
                    log::warn!("Dropping unreadable value of managed property '{}': {}", name, e);
                    store.remove(name);
                }
            }
        }
        restored
    }

    /// Reads every property off `host` into `store` (without saving).
    pub fn capture_all(&self, host: &H, store: &mut SettingsStore) -> Result<()> {
        self.define_all(store);
        for property in &self.properties {
            let name = &property.entry.name;
            match (property.get)(host)? {
                Some(value) => store.set(name, value),
                None => {
                    store.remove(name);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AppContext, StorageMode, UserDirs};
    use crate::metadata::AppMetadata;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Bounds {
        w: u32,
        h: u32,
    }

    #[derive(Default)]
    struct Host {
        count: i32,
        bounds: Option<Bounds>,
    }

    fn store(tmp: &tempfile::TempDir) -> SettingsStore {
        AppContext::new(AppMetadata::new("Demo", "1.0.0"), StorageMode::PerUser)
            .with_user_dirs(UserDirs::new(tmp.path().join("r"), tmp.path().join("l")))
            .open_store("custom")
    }

    #[test]
    fn last_registration_wins() {
        let mut registry = ManagedPropertyRegistry::<Host>::new();
        registry.register("Count", |h: &Host| h.count, |h: &mut Host, v| h.count = v);
        registry
            .register_with(
                "Count",
                |h: &Host| h.count,
                |h: &mut Host, v| h.count = v,
                RegisterOptions {
                    roamed: true,
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.entry("Count").unwrap().scope, crate::settings::Scope::Roamed);
    }

    #[test]
    fn none_value_is_removed_on_capture() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = store(&tmp);
        let mut registry = ManagedPropertyRegistry::<Host>::new();
        registry.register("Bounds", |h: &Host| h.bounds.clone(), |h: &mut Host, v| h.bounds = v);

        let mut host = Host {
            bounds: Some(Bounds { w: 2, h: 3 }),
            ..Default::default()
        };
        registry.capture_all(&host, &mut store).unwrap();
        assert!(store.contains("Bounds"));

        host.bounds = None;
        registry.capture_all(&host, &mut store).unwrap();
        assert!(!store.contains("Bounds"));
    }

    #[test]
    fn forcing_string_kind_on_struct_is_a_binding_error() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = store(&tmp);
        let mut registry = ManagedPropertyRegistry::<Host>::new();
        registry
            .register_with(
                "Bounds",
                |h: &Host| h.bounds.clone(),
                |h: &mut Host, v| h.bounds = v,
                RegisterOptions {
                    serialize_as: Some(SerializeAs::String),
                    ..Default::default()
                },
            )
            .unwrap();
        let host = Host {
            bounds: Some(Bounds { w: 1, h: 1 }),
            ..Default::default()
        };
        let err = registry.capture_all(&host, &mut store).unwrap_err();
        assert!(matches!(err, Error::PropertyBinding { ref name, .. } if name == "Bounds"));
    }

    #[test]
    fn undecodable_value_is_dropped_and_host_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = store(&tmp);
        store.set_as("Count", "not a number").unwrap();
        let mut registry = ManagedPropertyRegistry::<Host>::new();
        registry.register("Count", |h: &Host| h.count, |h: &mut Host, v| h.count = v);

        let mut host = Host {
            count: 4,
            ..Default::default()
        };
        assert_eq!(registry.restore_all(&mut host, &mut store), 0);
        assert_eq!(host.count, 4);
        assert!(!store.contains("Count"));
    }
}
