//! Window geometry and the host window seam.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::screen;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WindowState {
    #[default]
    Normal,
    Minimized,
    Maximized,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Rect {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right()
            && other.left < self.right()
            && self.top < other.bottom()
            && other.top < self.bottom()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowGeometry {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub window_state: WindowState,
    pub is_resizable: bool,
}

impl WindowGeometry {
    pub fn rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.width, self.height)
    }

    /// Rejects sizes the current display cannot show.
    pub fn validate(&self) -> Result<()> {
        self.validate_position()?;
        let positive = [self.width, self.height]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0);
        if !positive {
            return Err(Error::InvalidGeometry(format!(
                "size {}x{} is not positive",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Position-only check for hosts whose size is not tracked.
    pub fn validate_position(&self) -> Result<()> {
        if !(self.left.is_finite() && self.top.is_finite()) {
            return Err(Error::InvalidGeometry(format!("non-finite position in {:?}", self)));
        }
        Ok(())
    }

    /// Translates the window back onto `screen` axis by axis when the two do
    /// not intersect. Width and height are kept.
    pub fn clamp_to(&mut self, screen: &Rect) {
        if self.rect().intersects(screen) {
            return;
        }
        if self.left < screen.left {
            self.left = screen.left;
        } else if self.left >= screen.right() {
            self.left = screen.right() - self.width;
        }
        if self.top < screen.top {
            self.top = screen.top;
        } else if self.top >= screen.bottom() {
            self.top = screen.bottom() - self.height;
        }
    }
}

/// The host window as seen by the lifecycle binder.
pub trait HostWindow {
    fn geometry(&self) -> WindowGeometry;

    fn set_position(&mut self, left: f64, top: f64);

    /// May reject sizes the toolkit cannot apply.
    fn set_size(&mut self, width: f64, height: f64) -> Result<()>;

    fn set_window_state(&mut self, state: WindowState);

    /// Bounds of the whole virtual screen, when the host knows them.
    fn virtual_screen(&self) -> Option<Rect> {
        screen::virtual_screen_bounds()
    }
}
