//! About dialog view model
//!
//! Everything the About window shows, computed from product metadata, the
//! active culture and the latest update check. Rendering lives in `ui`.

use crate::error::{Error, Result};
use crate::metadata::{AppMetadata, Culture, Link, RgbColor};
use crate::update::AppUpdateDescriptor;

#[derive(Debug, Clone, PartialEq)]
pub struct CultureOption {
    pub culture: Culture,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AboutInfo {
    pub window_title: String,
    pub product: String,
    pub version: String,
    pub copyright: String,
    pub description: String,
    pub website: Option<Link>,
    pub license: Option<Link>,
    pub title_color: RgbColor,
    pub icon: Option<Vec<u8>>,
    pub cultures: Vec<CultureOption>,
    /// Set when a newer version is known.
    pub update: Option<AppUpdateDescriptor>,
}

impl AboutInfo {
    /// At most one culture is selected: the first supported one sharing the
    /// active culture's language. Without an active culture the environment's
    /// locale is used.
    pub fn build(
        metadata: &AppMetadata,
        current_culture: Option<&Culture>,
        update: Option<&AppUpdateDescriptor>,
    ) -> Self {
        let active = current_culture.cloned().or_else(Culture::from_env);
        let selected_index = active.as_ref().and_then(|active| {
            metadata
                .supported_cultures
                .iter()
                .position(|c| c == active)
                .or_else(|| {
                    metadata
                        .supported_cultures
                        .iter()
                        .position(|c| c.language() == active.language())
                })
        });
        let cultures = metadata
            .supported_cultures
            .iter()
            .enumerate()
            .map(|(i, culture)| CultureOption {
                culture: culture.clone(),
                selected: Some(i) == selected_index,
            })
            .collect();

        AboutInfo {
            window_title: format!("About {}", metadata.product_name),
            product: metadata.title.clone(),
            version: metadata.version.clone(),
            copyright: metadata.copyright.clone(),
            description: metadata.description.clone(),
            website: metadata.website.clone(),
            license: metadata.license.clone(),
            title_color: metadata.color,
            icon: None,
            cultures,
            update: update.cloned(),
        }
    }

    pub fn with_icon(mut self, png: impl Into<Vec<u8>>) -> Self {
        self.icon = Some(png.into());
        self
    }

    pub fn version_line(&self) -> String {
        format!("Version {}", self.version)
    }

    pub fn selected_culture(&self) -> Option<&Culture> {
        self.cultures.iter().find(|c| c.selected).map(|c| &c.culture)
    }

    /// Culture choice is offered only when there is something to choose.
    pub fn can_change_culture(&self) -> bool {
        self.cultures.len() > 1
    }

    pub fn update_line(&self) -> Option<String> {
        self.update
            .as_ref()
            .map(|u| format!("Version {} is available", u.version))
    }
}

/// Opens a website or license link in the default browser.
pub fn open_link(link: &Link) -> Result<()> {
    log::info!("Opening {}", link.url);
    webbrowser::open(&link.url).map_err(|e| Error::io(&link.url, e))
}
