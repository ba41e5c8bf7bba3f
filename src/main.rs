//! AppKeeper Demo
//!
//! A small egui window whose position, size, open counter, notes and theme
//! survive restarts. Run with `--portable` to keep settings next to the
//! executable. Set `APP_KEEPER_UPDATE_URL` to a descriptor URL to try the
//! update check.

use std::time::Duration;

use app_keeper::config::WINDOW_SIZE;
use app_keeper::screen::{centered_position, virtual_screen_bounds};
use app_keeper::ui::{
    color_icon, show_download_failed, show_notification, to_color32, viewport_builder,
    AboutAction, AboutWindow, EguiWindow,
};
use app_keeper::update::apply_install;
use app_keeper::{
    logging, AppContext, AppManager, AppUpdateDescriptor, Culture, HostWindow, Notification,
    Rect, RegisterOptions, RgbColor, Scope, StorageMode, SystemProcess, UpdateNotifyMode,
    WindowGeometry, WindowState,
};
use eframe::egui;

const UPDATE_URL_VAR: &str = "APP_KEEPER_UPDATE_URL";
const ACCENT: RgbColor = RgbColor::new(189, 147, 249);

/// The host window: viewport geometry plus the properties kept across runs.
struct DemoWindow {
    window: EguiWindow,
    open_count: i64,
    notes: String,
    dark_mode: bool,
}

impl HostWindow for DemoWindow {
    fn geometry(&self) -> WindowGeometry {
        self.window.geometry()
    }

    fn set_position(&mut self, left: f64, top: f64) {
        self.window.set_position(left, top);
    }

    fn set_size(&mut self, width: f64, height: f64) -> app_keeper::Result<()> {
        self.window.set_size(width, height)
    }

    fn set_window_state(&mut self, state: WindowState) {
        self.window.set_window_state(state);
    }

    fn virtual_screen(&self) -> Option<Rect> {
        self.window.virtual_screen()
    }
}

struct DemoApp {
    host: DemoWindow,
    manager: AppManager<DemoWindow>,
    about: Option<AboutWindow>,
    process: SystemProcess,
    status: String,
}

fn initial_geometry() -> WindowGeometry {
    let position = centered_position(WINDOW_SIZE, virtual_screen_bounds());
    WindowGeometry {
        left: position[0],
        top: position[1],
        width: WINDOW_SIZE[0],
        height: WINDOW_SIZE[1],
        window_state: WindowState::Normal,
        is_resizable: true,
    }
}

fn register_properties(manager: &mut AppManager<DemoWindow>) -> app_keeper::Result<()> {
    manager.add_managed_property(
        "OpenCount",
        |w: &DemoWindow| w.open_count,
        |w: &mut DemoWindow, v| w.open_count = v,
    );
    manager.add_managed_property_with(
        "Notes",
        |w: &DemoWindow| w.notes.clone(),
        |w: &mut DemoWindow, v| w.notes = v,
        RegisterOptions {
            roamed: true,
            ..Default::default()
        },
    )?;
    manager.add_managed_property_with(
        "DarkMode",
        |w: &DemoWindow| w.dark_mode,
        |w: &mut DemoWindow, v| w.dark_mode = v,
        RegisterOptions {
            default_value: Some(true),
            ..Default::default()
        },
    )
}

fn apply_theme(ctx: &egui::Context, dark_mode: bool) {
    let mut visuals = if dark_mode {
        egui::Visuals::dark()
    } else {
        egui::Visuals::light()
    };
    visuals.selection.bg_fill = to_color32(ACCENT);
    visuals.hyperlink_color = egui::Color32::from_rgb(139, 233, 253);
    ctx.set_visuals(visuals);
}

impl DemoApp {
    fn check_for_updates(&mut self, ctx: &egui::Context, mode: UpdateNotifyMode) {
        self.manager.set_notify_mode(mode);
        let repaint = ctx.clone();
        match self.manager.check_for_updates(move || repaint.request_repaint()) {
            Ok(()) => self.status = "Checking for updates...".to_string(),
            Err(e) => self.status = e.to_string(),
        }
    }

    fn handle_notification(&mut self, notification: Notification) {
        let product = self.manager.context().metadata().title.clone();
        if let Notification::UpdateAvailable(update) = &notification {
            if let Err(e) = self.manager.mark_update_seen(update) {
                log::warn!("Could not remember update {}: {}", update.version, e);
            }
            self.status = format!("Version {} is available", update.version);
        }
        if show_notification(&product, &notification) {
            if let Notification::UpdateAvailable(update) = notification {
                self.install(update);
            }
        }
    }

    fn install(&mut self, update: AppUpdateDescriptor) {
        self.status = format!("Downloading {}...", update.version);
        let Some(path) = self.manager.checker().download_update_blocking(&update) else {
            show_download_failed(&update);
            self.status = "Download failed".to_string();
            return;
        };
        // The installer path exits the process, so persist first.
        if let Err(e) = self.manager.on_closing(&self.host) {
            log::error!("Failed to save settings before install: {}", e);
        }
        match apply_install(&path, true, &self.process) {
            Ok(action) => self.status = format!("{:?}: {}", action, path.display()),
            Err(e) => self.status = e.to_string(),
        }
    }

    fn change_culture(&mut self, culture: Culture) {
        if let Err(e) = self.manager.change_culture(&self.host, &culture, &self.process) {
            log::error!("Culture change failed: {}", e);
            self.status = e.to_string();
        }
    }

    fn render_main_content(&mut self, ui: &mut egui::Ui) {
        ui.label(
            egui::RichText::new(&self.manager.context().metadata().title)
                .size(18.0)
                .color(to_color32(ACCENT)),
        );
        ui.label(format!("Opened {} times", self.host.open_count));
        ui.add_space(6.0);

        if ui.checkbox(&mut self.host.dark_mode, "Dark mode").changed() {
            apply_theme(ui.ctx(), self.host.dark_mode);
        }
        ui.label("Notes (roamed):");
        ui.add(
            egui::TextEdit::multiline(&mut self.host.notes)
                .desired_rows(6)
                .desired_width(f32::INFINITY),
        );

        ui.add_space(6.0);
        let store = self.manager.custom_settings();
        ui.label(
            egui::RichText::new(format!(
                "{:?} storage: {}",
                self.manager.context().mode(),
                store.location(Scope::Local).display()
            ))
            .weak(),
        );
        if !self.status.is_empty() {
            ui.label(&self.status);
        }
    }
}

impl eframe::App for DemoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let changes = self.host.window.sync();
        if changes.moved {
            if let Err(e) = self.manager.on_moved(&self.host) {
                log::warn!("{}", e);
            }
        }
        if changes.resized {
            if let Err(e) = self.manager.on_resized(&self.host) {
                log::warn!("{}", e);
            }
        }
        if let Some(notification) = self.manager.poll_update_check() {
            self.handle_notification(notification);
        } else if self.manager.is_checking_for_updates() {
            ctx.request_repaint_after(Duration::from_millis(250));
        }

        egui::TopBottomPanel::top("menu").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("About").clicked() {
                    self.about = Some(AboutWindow::new(self.manager.about()));
                }
                let can_check = self.manager.update_check_url().is_some()
                    && !self.manager.is_checking_for_updates();
                if ui
                    .add_enabled(can_check, egui::Button::new("Check for updates"))
                    .clicked()
                {
                    self.check_for_updates(ctx, UpdateNotifyMode::AlwaysIncludingNegativeResult);
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| self.render_main_content(ui));

        let action = self.about.as_mut().and_then(|about| about.show(ctx));
        if self.about.as_ref().map(|a| !a.is_open()).unwrap_or(false) {
            self.about = None;
        }
        match action {
            Some(AboutAction::ChangeCulture(culture)) => self.change_culture(culture),
            Some(AboutAction::InstallUpdate) => {
                if let Some(update) = self.manager.latest_update().cloned() {
                    self.install(update);
                }
            }
            None => {}
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Err(e) = self.manager.on_closing(&self.host) {
            log::error!("Failed to save settings on exit: {}", e);
        }
    }
}

fn main() {
    let mode = StorageMode::from_args(std::env::args());
    let metadata = app_keeper::app_metadata!()
        .with_title("AppKeeper Demo")
        .with_color(ACCENT)
        .with_supported_cultures(
            ["en-US", "de-DE", "fr-FR"]
                .iter()
                .filter_map(|tag| Culture::parse(tag).ok())
                .collect(),
        );
    let ctx = AppContext::new(metadata, mode);
    logging::init(&ctx.metadata().product_name, Some(ctx.log_dir().as_path()));

    let geometry = initial_geometry();
    let mut viewport = viewport_builder(&ctx.metadata().title, &geometry);
    viewport = viewport.with_icon(color_icon(ACCENT, 64));
    let native_options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    let title = ctx.metadata().title.clone();
    let result = eframe::run_native(
        &title,
        native_options,
        Box::new(move |cc| {
            let mut manager = AppManager::new(ctx)?;
            register_properties(&mut manager)?;
            if let Ok(url) = std::env::var(UPDATE_URL_VAR) {
                manager.set_update_check_url(url);
            }

            let mut host = DemoWindow {
                window: EguiWindow::new(cc.egui_ctx.clone(), geometry),
                open_count: 0,
                notes: String::new(),
                dark_mode: true,
            };
            manager.initialize(&host)?;
            manager.on_loaded(&mut host)?;
            host.open_count += 1;
            apply_theme(&cc.egui_ctx, host.dark_mode);

            let mut app = DemoApp {
                host,
                manager,
                about: None,
                process: SystemProcess,
                status: String::new(),
            };
            if app.manager.update_check_url().is_some() {
                app.check_for_updates(&cc.egui_ctx, UpdateNotifyMode::OnlyIfNewerThanLastSeen);
            }
            Ok(Box::new(app))
        }),
    );

    if let Err(e) = result {
        log::error!("Failed to start eframe: {}", e);
        std::process::exit(1);
    }
}
