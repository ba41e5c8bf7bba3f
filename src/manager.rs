//! The facade a host application holds.
//!
//! `AppManager` owns the context, the lifecycle binder, the managed
//! property registry and the update checker. Host windows forward their
//! lifecycle events to it and poll it for update notifications.

use serde::{de::DeserializeOwned, Serialize};

use crate::about::AboutInfo;
use crate::config::KEY_LAST_SEEN_VERSION;
use crate::context::AppContext;
use crate::error::{Error, Result};
use crate::lifecycle::LifecycleBinder;
use crate::metadata::Culture;
use crate::process::ProcessControl;
use crate::registry::{ManagedPropertyRegistry, RegisterOptions};
use crate::settings::SettingsStore;
use crate::update::{
    notification_for, AppUpdateDescriptor, Notification, UpdateCheckHandle, UpdateCheckResult,
    UpdateChecker, UpdateNotifyMode,
};
use crate::version::AppVersion;
use crate::window::HostWindow;

pub struct AppManager<H> {
    ctx: AppContext,
    binder: LifecycleBinder,
    registry: ManagedPropertyRegistry<H>,
    checker: UpdateChecker,
    notify_mode: UpdateNotifyMode,
    update_check_url: Option<String>,
    latest_update: Option<AppUpdateDescriptor>,
    pending_check: Option<UpdateCheckHandle>,
}

impl<H: HostWindow + 'static> AppManager<H> {
    /// Fails only when the metadata version is not a dotted number.
    pub fn new(ctx: AppContext) -> Result<Self> {
        let checker = UpdateChecker::from_context(&ctx)?;
        let binder = LifecycleBinder::new(&ctx);
        log::info!(
            "{} {} using {:?} settings",
            ctx.metadata().product_name,
            ctx.metadata().version,
            ctx.mode()
        );
        Ok(AppManager {
            ctx,
            binder,
            registry: ManagedPropertyRegistry::new(),
            checker,
            notify_mode: UpdateNotifyMode::default(),
            update_check_url: None,
            latest_update: None,
            pending_check: None,
        })
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    pub fn binder(&self) -> &LifecycleBinder {
        &self.binder
    }

    pub fn checker(&self) -> &UpdateChecker {
        &self.checker
    }

    pub fn set_update_check_url(&mut self, url: impl Into<String>) {
        self.update_check_url = Some(url.into());
    }

    pub fn update_check_url(&self) -> Option<&str> {
        self.update_check_url.as_deref()
    }

    pub fn set_notify_mode(&mut self, mode: UpdateNotifyMode) {
        self.notify_mode = mode;
    }

    pub fn notify_mode(&self) -> UpdateNotifyMode {
        self.notify_mode
    }

    pub fn set_always_track_resize(&mut self, always: bool) {
        self.binder.set_always_track_resize(always);
    }

    /// Persists a host property under `name`. A later registration with the
    /// same name replaces the earlier one.
    pub fn add_managed_property<T, G, S>(&mut self, name: &str, get: G, set: S)
    where
        T: Serialize + DeserializeOwned + 'static,
        G: Fn(&H) -> T + 'static,
        S: Fn(&mut H, T) + 'static,
    {
        self.registry.register(name, get, set);
    }

    pub fn add_managed_property_with<T, G, S>(
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
        self.registry.register_with(name, get, set, options)
    }

    pub fn registry(&self) -> &ManagedPropertyRegistry<H> {
        &self.registry
    }

    pub fn initialize(&mut self, host: &H) -> Result<()> {
        self.binder.initialize(host)
    }

    pub fn on_loaded(&mut self, host: &mut H) -> Result<()> {
        self.binder.on_loaded(host, &self.registry)
    }

    pub fn on_moved(&mut self, host: &H) -> Result<()> {
        self.binder.on_moved(host)
    }

    pub fn on_resized(&mut self, host: &H) -> Result<()> {
        self.binder.on_resized(host)
    }

    pub fn on_closing(&mut self, host: &H) -> Result<()> {
        self.binder.on_closing(host, &self.registry)
    }

    pub fn change_culture(
        &mut self,
        host: &H,
        culture: &Culture,
        process: &dyn ProcessControl,
    ) -> Result<()> {
        self.binder
            .change_culture(host, &self.registry, culture, process)
    }

    /// The group holding managed properties.
    pub fn custom_settings(&self) -> &SettingsStore {
        self.binder.custom_store()
    }

    pub fn custom_settings_mut(&mut self) -> &mut SettingsStore {
        self.binder.custom_store_mut()
    }

    /// Opens an additional settings group with the context's backend.
    pub fn open_settings(&self, group: &str) -> SettingsStore {
        self.ctx.open_store(group)
    }

    /// Starts a background check; poll with `poll_update_check`. A check
    /// already running is replaced.
    pub fn check_for_updates<W>(&mut self, wake: W) -> Result<()>
    where
        W: Fn() + Send + 'static,
    {
        let url = self.update_check_url.as_deref().ok_or(Error::MissingUpdateUrl)?;
        log::info!("Checking for updates at {}", url);
        self.pending_check = Some(self.checker.check_for_updates(url, wake));
        Ok(())
    }

    pub fn is_checking_for_updates(&self) -> bool {
        self.pending_check.is_some()
    }

    /// Call from the UI thread, e.g. once per frame.
    pub fn poll_update_check(&mut self) -> Option<Notification> {
        let result = self.pending_check.as_mut()?.try_result()?;
        self.pending_check = None;
        self.handle_update_result(&result)
    }

    /// Remembers a newer version for the About box and applies the
    /// notification policy.
    pub fn handle_update_result(&mut self, result: &UpdateCheckResult) -> Option<Notification> {
        if let Some(newer) = result.newer_version() {
            self.latest_update = Some(newer.clone());
        }
        let last_seen = self.last_seen_update_version();
        notification_for(self.notify_mode, result, last_seen.as_ref())
    }

    pub fn latest_update(&self) -> Option<&AppUpdateDescriptor> {
        self.latest_update.as_ref()
    }

    pub fn last_seen_update_version(&self) -> Option<AppVersion> {
        self.binder
            .settings()
            .get_as::<String>(KEY_LAST_SEEN_VERSION)
            .and_then(|v| AppVersion::parse(&v).ok())
    }

    /// Records that the user has been shown `update`.
    pub fn mark_update_seen(&mut self, update: &AppUpdateDescriptor) -> Result<()> {
        let settings = self.binder.settings_mut();
        settings.set_as(KEY_LAST_SEEN_VERSION, &update.version)?;
        settings.save()
    }

    pub fn about(&self) -> AboutInfo {
        AboutInfo::build(
            self.ctx.metadata(),
            self.binder.culture(),
            self.latest_update.as_ref(),
        )
    }
}
