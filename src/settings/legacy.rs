// One-way migration of the pre-0.4 single-blob store into per-key settings.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::config::KEY_LEGACY_BLOB;
use crate::error::Result;
use crate::settings::store::SettingsStore;
use crate::settings::value::{SerializeAs, SettingEntry, StoredValue};

/// Entry describing the legacy blob: a roamed, binary map of name to value.
pub fn legacy_blob_entry() -> SettingEntry {
    SettingEntry::new(KEY_LEGACY_BLOB)
        .serialize_as(SerializeAs::Binary)
        .roamed(true)
}

/// Copies every entry of the legacy blob in `shared` into `target`, clears
/// the blob and saves both stores. Returns the number of copied entries;
/// running it again finds no blob and does nothing.
pub fn migrate_legacy_blob(shared: &mut SettingsStore, target: &mut SettingsStore) -> Result<usize> {
    let Some(blob) = shared.persisted(KEY_LEGACY_BLOB).cloned() else {
        return Ok(0);
    };
    let entries: BTreeMap<String, Value> = match blob.decode() {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Discarding unreadable legacy settings blob: {}", e);
            shared.remove(KEY_LEGACY_BLOB);
            shared.save()?;
            return Ok(0);
        }
    };

    let mut copied = 0;
    for (name, value) in entries {
        let kind = target.entry(&name).and_then(|e| e.serialize_as);
        let stored = StoredValue::from_json(value.clone(), kind)
            .or_else(|_| StoredValue::from_json(value, None))?;
        if let Some(stored) = stored {
            target.set(&name, stored);
            copied += 1;
        }
    }

    target.save()?;
    shared.remove(KEY_LEGACY_BLOB);
    shared.save()?;
    log::info!("Migrated {} legacy settings into '{}'", copied, target.group());
    Ok(copied)
}
