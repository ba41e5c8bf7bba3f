//! Screen layout helpers
//!
//! Virtual-screen bounds for clamping restored windows, and the centered
//! position used before any geometry has been persisted.

use crate::config::FALLBACK_POSITION;
use crate::window::Rect;

/// Bounds spanning every monitor, or `None` when the platform does not report them.
#[cfg(windows)]
pub fn virtual_screen_bounds() -> Option<Rect> {
    use windows::Win32::UI::WindowsAndMessaging::{
        GetSystemMetrics, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN,
        SM_YVIRTUALSCREEN,
    };
    unsafe {
        let width = GetSystemMetrics(SM_CXVIRTUALSCREEN);
        let height = GetSystemMetrics(SM_CYVIRTUALSCREEN);
        if width <= 0 || height <= 0 {
            return None;
        }
        Some(Rect::new(
            GetSystemMetrics(SM_XVIRTUALSCREEN) as f64,
            GetSystemMetrics(SM_YVIRTUALSCREEN) as f64,
            width as f64,
            height as f64,
        ))
    }
}

#[cfg(not(windows))]
pub fn virtual_screen_bounds() -> Option<Rect> {
    None
}

/// Top-left position that centers a window of `size` on `screen`.
pub fn centered_position(size: [f64; 2], screen: Option<Rect>) -> [f64; 2] {
    match screen {
        Some(area) => [
            area.left + (area.width - size[0]) / 2.0,
            area.top + (area.height - size[1]) / 2.0,
        ],
        None => FALLBACK_POSITION,
    }
}
