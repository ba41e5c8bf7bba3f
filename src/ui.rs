//! eframe/egui boundary
//!
//! Mapping functions between the core data model and egui types, a
//! `HostWindow` implementation driven by viewport commands, the About
//! window and the native message dialogs.

use eframe::egui;

use crate::about::{open_link, AboutInfo};
use crate::config::MIN_WINDOW_SIZE;
use crate::error::Result;
use crate::metadata::{Culture, Link, RgbColor};
use crate::screen::virtual_screen_bounds;
use crate::update::{AppUpdateDescriptor, Notification};
use crate::window::{HostWindow, Rect, WindowGeometry, WindowState};

pub fn to_color32(color: RgbColor) -> egui::Color32 {
    egui::Color32::from_rgb(color.r, color.g, color.b)
}

/// Viewport for a window that should open with `geometry`.
pub fn viewport_builder(title: &str, geometry: &WindowGeometry) -> egui::ViewportBuilder {
    egui::ViewportBuilder::default()
        .with_title(title)
        .with_inner_size([geometry.width as f32, geometry.height as f32])
        .with_min_inner_size([MIN_WINDOW_SIZE[0] as f32, MIN_WINDOW_SIZE[1] as f32])
        .with_position([geometry.left as f32, geometry.top as f32])
        .with_resizable(geometry.is_resizable)
        .with_maximized(geometry.window_state == WindowState::Maximized)
}

/// Reads geometry off viewport info; `None` until the backend has reported
/// both rectangles.
pub fn geometry_from_viewport(
    info: &egui::ViewportInfo,
    is_resizable: bool,
) -> Option<WindowGeometry> {
    let outer = info.outer_rect?;
    let inner = info.inner_rect?;
    let window_state = if info.minimized == Some(true) {
        WindowState::Minimized
    } else if info.maximized == Some(true) {
        WindowState::Maximized
    } else {
        WindowState::Normal
    };
    Some(WindowGeometry {
        left: outer.min.x as f64,
        top: outer.min.y as f64,
        width: inner.width() as f64,
        height: inner.height() as f64,
        window_state,
        is_resizable,
    })
}

/// What changed since the previous [`EguiWindow::sync`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowChanges {
    pub moved: bool,
    pub resized: bool,
}

/// The root egui viewport seen as a [`HostWindow`].
pub struct EguiWindow {
    ctx: egui::Context,
    geometry: WindowGeometry,
    monitor: Option<Rect>,
}

impl EguiWindow {
    pub fn new(ctx: egui::Context, initial: WindowGeometry) -> Self {
        EguiWindow {
            ctx,
            geometry: initial,
            monitor: None,
        }
    }

    /// Pulls the current viewport state. Call once per frame.
    pub fn sync(&mut self) -> WindowChanges {
        let info = self.ctx.input(|i| i.viewport().clone());
        if let Some(size) = info.monitor_size {
            self.monitor = Some(Rect::new(0.0, 0.0, size.x as f64, size.y as f64));
        }
        let Some(current) = geometry_from_viewport(&info, self.geometry.is_resizable) else {
            return WindowChanges::default();
        };
        let changes = WindowChanges {
            moved: current.left != self.geometry.left || current.top != self.geometry.top,
            resized: current.width != self.geometry.width
                || current.height != self.geometry.height
                || current.window_state != self.geometry.window_state,
        };
        self.geometry = current;
        changes
    }

    pub fn close_requested(&self) -> bool {
        self.ctx.input(|i| i.viewport().close_requested())
    }
}

impl HostWindow for EguiWindow {
    fn geometry(&self) -> WindowGeometry {
        self.geometry
    }

    fn set_position(&mut self, left: f64, top: f64) {
        self.geometry.left = left;
        self.geometry.top = top;
        self.ctx.send_viewport_cmd(egui::ViewportCommand::OuterPosition(egui::pos2(
            left as f32,
            top as f32,
        )));
    }

    fn set_size(&mut self, width: f64, height: f64) -> Result<()> {
        self.geometry.width = width;
        self.geometry.height = height;
        self.ctx.send_viewport_cmd(egui::ViewportCommand::InnerSize(egui::vec2(
            width as f32,
            height as f32,
        )));
        Ok(())
    }

    fn set_window_state(&mut self, state: WindowState) {
        self.geometry.window_state = state;
        let command = match state {
            WindowState::Normal => egui::ViewportCommand::Maximized(false),
            WindowState::Maximized => egui::ViewportCommand::Maximized(true),
            WindowState::Minimized => egui::ViewportCommand::Minimized(true),
        };
        self.ctx.send_viewport_cmd(command);
    }

    fn virtual_screen(&self) -> Option<Rect> {
        virtual_screen_bounds().or(self.monitor)
    }
}

/// Decodes PNG/ICO bytes into a window icon.
pub fn load_icon(bytes: &[u8]) -> Option<egui::IconData> {
    match image::load_from_memory(bytes) {
        Ok(image) => {
            let rgba = image.to_rgba8();
            let size = [rgba.width(), rgba.height()];
            Some(egui::IconData {
                rgba: rgba.into_raw(),
                width: size[0],
                height: size[1],
            })
        }
        Err(e) => {
            log::warn!("Could not decode icon: {}", e);
            None
        }
    }
}

/// A filled disc in `color`, for apps that ship no icon file.
pub fn color_icon(color: RgbColor, size: u32) -> egui::IconData {
    let radius = size as f32 / 2.0;
    let image = image::RgbaImage::from_fn(size, size, |x, y| {
        let dx = x as f32 + 0.5 - radius;
        let dy = y as f32 + 0.5 - radius;
        if dx * dx + dy * dy <= radius * radius {
            image::Rgba([color.r, color.g, color.b, 255])
        } else {
            image::Rgba([0, 0, 0, 0])
        }
    });
    egui::IconData {
        rgba: image.into_raw(),
        width: size,
        height: size,
    }
}

/// User choices made in the About window.
#[derive(Debug, Clone, PartialEq)]
pub enum AboutAction {
    ChangeCulture(Culture),
    InstallUpdate,
}

pub struct AboutWindow {
    info: AboutInfo,
    open: bool,
    icon: Option<egui::TextureHandle>,
}

impl AboutWindow {
    pub fn new(info: AboutInfo) -> Self {
        AboutWindow {
            info,
            open: true,
            icon: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn show(&mut self, ctx: &egui::Context) -> Option<AboutAction> {
        if self.icon.is_none() {
            self.icon = self.info.icon.as_deref().and_then(|bytes| {
                let decoded = image::load_from_memory(bytes).ok()?.to_rgba8();
                let size = [decoded.width() as usize, decoded.height() as usize];
                let color_image = egui::ColorImage::from_rgba_unmultiplied(size, &decoded);
                Some(ctx.load_texture("about-icon", color_image, Default::default()))
            });
        }

        let info = &self.info;
        let icon = &self.icon;
        let mut action = None;
        egui::Window::new(&info.window_title)
            .open(&mut self.open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if let Some(texture) = icon {
                        ui.image((texture.id(), egui::vec2(48.0, 48.0)));
                    }
                    ui.vertical(|ui| {
                        ui.label(
                            egui::RichText::new(&info.product)
                                .size(20.0)
                                .color(to_color32(info.title_color)),
                        );
                        ui.label(info.version_line());
                    });
                });
                ui.add_space(6.0);
                if !info.description.is_empty() {
                    ui.label(&info.description);
                }
                if !info.copyright.is_empty() {
                    ui.label(egui::RichText::new(&info.copyright).weak());
                }
                for link in [&info.website, &info.license].into_iter().flatten() {
                    link_label(ui, link);
                }

                if info.can_change_culture() {
                    ui.separator();
                    let selected = info
                        .selected_culture()
                        .map(|c| c.as_str().to_string())
                        .unwrap_or_default();
                    egui::ComboBox::from_label("Language")
                        .selected_text(selected)
                        .show_ui(ui, |ui| {
                            for option in &info.cultures {
                                let clicked = ui
                                    .selectable_label(option.selected, option.culture.as_str())
                                    .clicked();
                                if clicked && !option.selected {
                                    action = Some(AboutAction::ChangeCulture(option.culture.clone()));
                                }
                            }
                        });
                }

                if let Some(line) = info.update_line() {
                    ui.separator();
                    ui.colored_label(egui::Color32::from_rgb(255, 184, 108), line);
                    if ui.button("Download and install").clicked() {
                        action = Some(AboutAction::InstallUpdate);
                    }
                }
            });
        action
    }
}

fn link_label(ui: &mut egui::Ui, link: &Link) {
    let text = if link.description.is_empty() {
        &link.url
    } else {
        &link.description
    };
    if ui.link(text).on_hover_text(&link.url).clicked() {
        if let Err(e) = open_link(link) {
            log::warn!("Could not open {}: {}", link.url, e);
        }
    }
}

/// Asks whether to download and install `update`.
pub fn confirm_update(product: &str, update: &AppUpdateDescriptor) -> bool {
    let mut description = format!(
        "{} {} is available. Download and install it now?",
        product, update.version
    );
    if let Some(notes) = &update.release_notes {
        description.push_str("\n\n");
        description.push_str(notes);
    }
    rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Info)
        .set_title("Update available")
        .set_description(&description)
        .set_buttons(rfd::MessageButtons::YesNo)
        .show()
}

/// Shows a notification. Returns true when the user accepted an update.
pub fn show_notification(product: &str, notification: &Notification) -> bool {
    match notification {
        Notification::UpdateAvailable(update) => confirm_update(product, update),
        Notification::UpToDate { latest } => {
            rfd::MessageDialog::new()
                .set_level(rfd::MessageLevel::Info)
                .set_title("No update available")
                .set_description(&format!("{} is up to date (latest: {}).", product, latest))
                .set_buttons(rfd::MessageButtons::Ok)
                .show();
            false
        }
        Notification::CheckFailed(reason) => {
            rfd::MessageDialog::new()
                .set_level(rfd::MessageLevel::Warning)
                .set_title("Update check failed")
                .set_description(&format!("Could not check for updates: {}", reason))
                .set_buttons(rfd::MessageButtons::Ok)
                .show();
            false
        }
    }
}

pub fn show_download_failed(update: &AppUpdateDescriptor) {
    rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title("Download failed")
        .set_description(&format!(
            "Version {} could not be downloaded from {}.",
            update.version, update.download_url
        ))
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}
