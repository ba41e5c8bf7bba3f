//! Storage backends for settings groups.
//!
//! The per-user backend keeps one file per group and scope under
//! `<root>/<company>/<product>/<version>/`. The portable backend keeps every
//! group in a single file next to the executable.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{PORTABLE_FILE_SUFFIX, SCHEMA_VERSION, SETTINGS_FILE_EXTENSION};
use crate::context::UserDirs;
use crate::error::{Error, Result};
use crate::settings::value::{Scope, StoredValue};
use crate::version::AppVersion;

pub type Values = BTreeMap<String, StoredValue>;

/// The values of one group, split by scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopedValues {
    #[serde(default)]
    pub local: Values,
    #[serde(default)]
    pub roamed: Values,
}

impl ScopedValues {
    pub fn scope(&self, scope: Scope) -> &Values {
        match scope {
            Scope::Local => &self.local,
            Scope::Roamed => &self.roamed,
        }
    }

    pub fn scope_mut(&mut self, scope: Scope) -> &mut Values {
        match scope {
            Scope::Local => &mut self.local,
            Scope::Roamed => &mut self.roamed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.local.is_empty() && self.roamed.is_empty()
    }
}

pub trait SettingsBackend: fmt::Debug {
    /// Missing files load as empty; unreadable or incompatible files are `StorageCorrupt`.
    fn load(&self, group: &str) -> Result<ScopedValues>;

    fn save(&self, group: &str, values: &ScopedValues) -> Result<()>;

    /// Values written by the newest older application version, if any.
    fn load_previous(&self, group: &str) -> Result<Option<ScopedValues>>;

    fn location(&self, group: &str, scope: Scope) -> PathBuf;
}

#[derive(Serialize, Deserialize)]
struct SettingsFile {
    schema: u32,
    app_version: String,
    #[serde(default)]
    values: Values,
}

#[derive(Default, Serialize, Deserialize)]
struct PortableFile {
    schema: u32,
    app_version: String,
    #[serde(default)]
    groups: BTreeMap<String, ScopedValues>,
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::io(path, e)),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| Error::StorageCorrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|e| Error::Serialize(e.to_string()))?;
    fs::write(path, json).map_err(|e| Error::io(path, e))
}

fn check_schema(path: &Path, schema: u32) -> Result<()> {
    if schema > SCHEMA_VERSION {
        return Err(Error::StorageCorrupt {
            path: path.to_path_buf(),
            reason: format!("schema {} is newer than supported {}", schema, SCHEMA_VERSION),
        });
    }
    Ok(())
}

/// Per-user store keyed by company, product and version.
#[derive(Debug, Clone)]
pub struct UserBackend {
    roaming_base: PathBuf,
    local_base: PathBuf,
    version: String,
}

impl UserBackend {
    pub fn new(dirs: &UserDirs, company: &str, product: &str, version: &str) -> Self {
        UserBackend {
            roaming_base: dirs.roaming.join(company).join(product),
            local_base: dirs.local.join(company).join(product),
            version: version.to_string(),
        }
    }

    fn base(&self, scope: Scope) -> &Path {
        match scope {
            Scope::Local => &self.local_base,
            Scope::Roamed => &self.roaming_base,
        }
    }

    fn file_in(&self, scope: Scope, version: &str, group: &str) -> PathBuf {
        self.base(scope)
            .join(version)
            .join(group)
            .with_extension(SETTINGS_FILE_EXTENSION)
    }

    fn load_file(path: &Path) -> Result<Values> {
        match read_json::<SettingsFile>(path)? {
            Some(file) => {
                check_schema(path, file.schema)?;
                Ok(file.values)
            }
            None => Ok(Values::new()),
        }
    }

    /// Newest version directory below the running version that holds `group`.
    fn previous_version_dir(&self, scope: Scope, group: &str) -> Option<String> {
        let current = AppVersion::parse(&self.version).ok()?;
        let entries = fs::read_dir(self.base(scope)).ok()?;
        entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().to_string();
                AppVersion::parse(&name).ok().map(|v| (v, name))
            })
            .filter(|(v, name)| *v < current && self.file_in(scope, name, group).exists())
            .max_by(|a, b| a.0.cmp(&b.0))
            .map(|(_, name)| name)
    }
}

impl SettingsBackend for UserBackend {
    fn load(&self, group: &str) -> Result<ScopedValues> {
        Ok(ScopedValues {
            local: Self::load_file(&self.location(group, Scope::Local))?,
            roamed: Self::load_file(&self.location(group, Scope::Roamed))?,
        })
    }

    fn save(&self, group: &str, values: &ScopedValues) -> Result<()> {
        for scope in [Scope::Local, Scope::Roamed] {
            let file = SettingsFile {
                schema: SCHEMA_VERSION,
                app_version: self.version.clone(),
                values: values.scope(scope).clone(),
            };
            write_json(&self.location(group, scope), &file)?;
        }
        Ok(())
    }

    fn load_previous(&self, group: &str) -> Result<Option<ScopedValues>> {
        let mut found = false;
        let mut previous = ScopedValues::default();
        for scope in [Scope::Local, Scope::Roamed] {
            if let Some(dir) = self.previous_version_dir(scope, group) {
                log::debug!("Found {:?} settings of version {} for '{}'", scope, dir, group);
                *previous.scope_mut(scope) = Self::load_file(&self.file_in(scope, &dir, group))?;
                found = true;
            }
        }
        Ok(found.then_some(previous))
    }

    fn location(&self, group: &str, scope: Scope) -> PathBuf {
        self.file_in(scope, &self.version, group)
    }
}

/// Single file next to the executable holding every group.
#[derive(Debug, Clone)]
pub struct PortableBackend {
    file: PathBuf,
    version: String,
}

impl PortableBackend {
    pub fn new(dir: &Path, product: &str, version: &str) -> Self {
        PortableBackend {
            file: dir.join(format!("{}{}", product, PORTABLE_FILE_SUFFIX)),
            version: version.to_string(),
        }
    }

    fn read(&self) -> Result<PortableFile> {
        match read_json::<PortableFile>(&self.file)? {
            Some(file) => {
                check_schema(&self.file, file.schema)?;
                Ok(file)
            }
            None => Ok(PortableFile::default()),
        }
    }
}

impl SettingsBackend for PortableBackend {
    fn load(&self, group: &str) -> Result<ScopedValues> {
        Ok(self.read()?.groups.remove(group).unwrap_or_default())
    }

    fn save(&self, group: &str, values: &ScopedValues) -> Result<()> {
        // Other groups share the file, so merge into what is already there.
        let mut file = match self.read() {
            Ok(file) => file,
            Err(e @ Error::StorageCorrupt { .. }) => {
                log::warn!("Rewriting corrupt portable settings file: {}", e);
                PortableFile::default()
            }
            Err(e) => return Err(e),
        };
        file.schema = SCHEMA_VERSION;
        file.app_version = self.version.clone();
        file.groups.insert(group.to_string(), values.clone());
        write_json(&self.file, &file)
    }

    fn load_previous(&self, _group: &str) -> Result<Option<ScopedValues>> {
        Ok(None)
    }

    fn location(&self, _group: &str, _scope: Scope) -> PathBuf {
        self.file.clone()
    }
}
