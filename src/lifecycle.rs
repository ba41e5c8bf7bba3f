//! Window lifecycle binding
//!
//! Restores geometry and managed properties when the host window loads,
//! tracks position and size while it is in the normal state, and persists
//! everything when it closes. Also owns the culture change, which saves,
//! relaunches the executable and exits.

use std::path::PathBuf;

use crate::config::{
    CUSTOM_GROUP, KEY_CULTURE, KEY_HEIGHT, KEY_LAST_SEEN_VERSION, KEY_LEFT, KEY_TOP, KEY_UPDATED,
    KEY_WIDTH, KEY_WINDOW_STATE, MANAGER_GROUP, SHARED_GROUP,
};
use crate::context::AppContext;
use crate::error::{Error, Result};
use crate::metadata::Culture;
use crate::process::ProcessControl;
use crate::registry::ManagedPropertyRegistry;
use crate::settings::{legacy_blob_entry, migrate_legacy_blob, SettingEntry, SettingsStore};
use crate::window::{HostWindow, WindowGeometry, WindowState};

const GEOMETRY_KEYS: [&str; 5] = [KEY_LEFT, KEY_TOP, KEY_WIDTH, KEY_HEIGHT, KEY_WINDOW_STATE];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinderState {
    NotInitialized,
    Bound,
}

#[derive(Debug)]
pub struct LifecycleBinder {
    state: BinderState,
    settings: SettingsStore,
    custom: SettingsStore,
    shared: SettingsStore,
    executable: PathBuf,
    always_track_resize: bool,
    track_size: bool,
    saved: Option<WindowGeometry>,
    culture: Option<Culture>,
}

impl LifecycleBinder {
    pub fn new(ctx: &AppContext) -> Self {
        let mut settings = ctx.open_store(MANAGER_GROUP);
        settings.define(SettingEntry::new(KEY_CULTURE));
        settings.define(SettingEntry::new(KEY_LAST_SEEN_VERSION));
        let mut shared = ctx.open_store(SHARED_GROUP);
        shared.define(legacy_blob_entry());
        LifecycleBinder {
            state: BinderState::NotInitialized,
            settings,
            custom: ctx.open_store(CUSTOM_GROUP),
            shared,
            executable: ctx.metadata().executable.clone(),
            always_track_resize: false,
            track_size: false,
            saved: None,
            culture: None,
        }
    }

    /// Also save and restore the size of windows that are not resizable.
    pub fn set_always_track_resize(&mut self, always: bool) {
        self.always_track_resize = always;
    }

    pub fn state(&self) -> BinderState {
        self.state
    }

    pub fn is_tracking_size(&self) -> bool {
        self.track_size
    }

    /// The culture persisted by a previous `change_culture`.
    pub fn culture(&self) -> Option<&Culture> {
        self.culture.as_ref()
    }

    /// Last geometry captured while the window was in the normal state.
    pub fn saved_geometry(&self) -> Option<WindowGeometry> {
        self.saved
    }

    /// The manager's own settings group.
    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SettingsStore {
        &mut self.settings
    }

    /// The group holding managed host properties.
    pub fn custom_store(&self) -> &SettingsStore {
        &self.custom
    }

    pub fn custom_store_mut(&mut self) -> &mut SettingsStore {
        &mut self.custom
    }

    /// Runs the one-time settings upgrade, reads the persisted culture and
    /// starts tracking `host`. Geometry defaults are the host's initial values.
    pub fn initialize<H: HostWindow>(&mut self, host: &H) -> Result<()> {
        if self.state == BinderState::Bound {
            log::debug!("Lifecycle binder already initialized");
            return Ok(());
        }
        if !self.settings.get_as::<bool>(KEY_UPDATED).unwrap_or(false) {
            for store in [&mut self.settings, &mut self.custom, &mut self.shared] {
                if let Err(e) = store.upgrade() {
                    log::warn!("Settings upgrade of '{}' failed: {}", store.group(), e);
                }
            }
            self.settings.set_as(KEY_UPDATED, &true)?;
            if let Err(e) = self.settings.save() {
                log::warn!("Failed to save manager settings: {}", e);
            }
        }
        self.culture = self.settings.get_as::<Culture>(KEY_CULTURE);

        let geometry = host.geometry();
        self.define_geometry_defaults(&geometry)?;
        self.track_size = geometry.is_resizable || self.always_track_resize;
        self.saved = Some(geometry);
        self.state = BinderState::Bound;
        log::debug!(
            "Lifecycle binder initialized (track size: {}, culture: {:?})",
            self.track_size,
            self.culture
        );
        Ok(())
    }

    fn define_geometry_defaults(&mut self, g: &WindowGeometry) -> Result<()> {
        self.settings.define(SettingEntry::new(KEY_LEFT).with_default(&g.left)?);
        self.settings.define(SettingEntry::new(KEY_TOP).with_default(&g.top)?);
        self.settings.define(SettingEntry::new(KEY_WIDTH).with_default(&g.width)?);
        self.settings.define(SettingEntry::new(KEY_HEIGHT).with_default(&g.height)?);
        self.settings.define(SettingEntry::new(KEY_WINDOW_STATE).with_default(&g.window_state)?);
        self.settings.define(SettingEntry::new(KEY_UPDATED).with_default(&false)?);
        Ok(())
    }

    fn ensure_bound(&self) -> Result<()> {
        match self.state {
            BinderState::Bound => Ok(()),
            BinderState::NotInitialized => Err(Error::NotInitialized),
        }
    }

    /// Legacy migration, managed property restore, then geometry restore.
    pub fn on_loaded<H: HostWindow + 'static>(
        &mut self,
        host: &mut H,
        registry: &ManagedPropertyRegistry<H>,
    ) -> Result<()> {
        self.ensure_bound()?;
        registry.define_all(&mut self.custom);
        if let Err(e) = migrate_legacy_blob(&mut self.shared, &mut self.custom) {
            log::warn!("Legacy settings migration failed: {}", e);
        }
        let restored = registry.restore_all(host, &mut self.custom);
        log::debug!("Restored {} of {} managed properties", restored, registry.len());

        if let Err(e) = self.apply_geometry(host) {
            log::warn!("Stored window geometry rejected, resetting: {}", e);
            self.reset_geometry()?;
            self.apply_geometry(host)?;
        }
        Ok(())
    }

    fn read_geometry_value<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .settings
            .get(key)
            .ok_or_else(|| Error::InvalidGeometry(format!("{} has no value", key)))?;
        value
            .decode()
            .map_err(|e| Error::InvalidGeometry(format!("{}: {}", key, e)))
    }

    fn apply_geometry<H: HostWindow>(&mut self, host: &mut H) -> Result<()> {
        let mut g = host.geometry();
        g.left = self.read_geometry_value(KEY_LEFT)?;
        g.top = self.read_geometry_value(KEY_TOP)?;
        if self.track_size {
            g.width = self.read_geometry_value(KEY_WIDTH)?;
            g.height = self.read_geometry_value(KEY_HEIGHT)?;
            g.window_state = match self.read_geometry_value(KEY_WINDOW_STATE)? {
                WindowState::Minimized => WindowState::Normal,
                state => state,
            };
        }
        if self.track_size {
            g.validate()?;
        } else {
            g.validate_position()?;
        }
        if let Some(screen) = host.virtual_screen() {
            g.clamp_to(&screen);
        }

        host.set_position(g.left, g.top);
        if self.track_size {
            host.set_size(g.width, g.height)?;
            host.set_window_state(g.window_state);
        }
        self.saved = Some(g);
        Ok(())
    }

    /// Drops persisted geometry so the host's initial geometry applies again.
    pub fn reset_geometry(&mut self) -> Result<()> {
        for key in GEOMETRY_KEYS {
            self.settings.remove(key);
        }
        self.settings.save()
    }

    /// Records the position while the window is in the normal state.
    pub fn on_moved<H: HostWindow>(&mut self, host: &H) -> Result<()> {
        self.ensure_bound()?;
        let g = host.geometry();
        if g.window_state == WindowState::Normal {
            if let Some(saved) = self.saved.as_mut() {
                saved.left = g.left;
                saved.top = g.top;
            }
        }
        Ok(())
    }

    /// Records state and, while normal, size. Ignored while minimized or when
    /// size tracking is off.
    pub fn on_resized<H: HostWindow>(&mut self, host: &H) -> Result<()> {
        self.ensure_bound()?;
        if !self.track_size {
            return Ok(());
        }
        let g = host.geometry();
        if g.window_state == WindowState::Minimized {
            return Ok(());
        }
        if let Some(saved) = self.saved.as_mut() {
            saved.window_state = g.window_state;
            if g.window_state == WindowState::Normal {
                saved.width = g.width;
                saved.height = g.height;
            }
        }
        Ok(())
    }

    /// Captures and persists geometry and managed properties.
    pub fn on_closing<H: HostWindow + 'static>(
        &mut self,
        host: &H,
        registry: &ManagedPropertyRegistry<H>,
    ) -> Result<()> {
        self.on_moved(host)?;
        self.on_resized(host)?;
        if let Some(saved) = self.saved {
            self.settings.set_as(KEY_LEFT, &saved.left)?;
            self.settings.set_as(KEY_TOP, &saved.top)?;
            if self.track_size {
                self.settings.set_as(KEY_WIDTH, &saved.width)?;
                self.settings.set_as(KEY_HEIGHT, &saved.height)?;
                self.settings.set_as(KEY_WINDOW_STATE, &saved.window_state)?;
            }
        }
        self.settings.save()?;

        if registry.is_empty() {
            return Ok(());
        }
        registry.capture_all(host, &mut self.custom)?;
        self.custom.save()
    }

    /// Persists `culture`, saves like a close, relaunches the executable with
    /// the current arguments and exits with code 0. A failed relaunch is
    /// returned before any exit is attempted.
    pub fn change_culture<H: HostWindow + 'static>(
        &mut self,
        host: &H,
        registry: &ManagedPropertyRegistry<H>,
        culture: &Culture,
        process: &dyn ProcessControl,
    ) -> Result<()> {
        self.ensure_bound()?;
        self.settings.set_as(KEY_CULTURE, culture)?;
        self.on_closing(host, registry)?;
        self.culture = Some(culture.clone());

        let args = process.current_args();
        log::info!("Relaunching {} for culture {}", self.executable.display(), culture);
        process
            .spawn(&self.executable, &args)
            .map_err(|source| Error::RelaunchFailed {
                program: self.executable.clone(),
                source,
            })?;
        process.exit(0);
        Ok(())
    }
}
