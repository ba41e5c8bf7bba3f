//! Product metadata consumed read-only by the About box, the settings paths and
//! the update checker.
//!
//! Metadata comes either from a key/value [`MetadataSource`] or from the
//! building crate's Cargo environment through [`app_metadata!`](crate::app_metadata).

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

static CULTURE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{2,8})*$").expect("static regex"));

/// A UI culture tag such as `de` or `en-US`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Culture(String);

impl Culture {
    pub fn parse(tag: &str) -> Result<Self> {
        let tag = tag.trim().replace('_', "-");
        if CULTURE_TAG.is_match(&tag) {
            Ok(Culture(tag))
        } else {
            Err(Error::InvalidCulture(tag))
        }
    }

    /// Reads the culture of the process environment (`LC_ALL`, `LC_MESSAGES`, `LANG`).
    pub fn from_env() -> Option<Self> {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .filter(|value| !value.is_empty() && value != "C" && value != "POSIX")
            .find_map(|value| {
                let tag = value.split(['.', '@']).next().unwrap_or_default().to_string();
                Culture::parse(&tag).ok()
            })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The primary language subtag, lower-cased (`en` for `en-US`).
    pub fn language(&self) -> String {
        self.0
            .split('-')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase()
    }
}

impl fmt::Display for Culture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Culture {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Culture::parse(&value)
    }
}

impl From<Culture> for String {
    fn from(value: Culture) -> Self {
        value.0
    }
}

/// A link shown in the About box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    pub description: String,
}

impl Link {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Link {
            description: url.clone(),
            url,
        }
    }

    pub fn with_description(url: impl Into<String>, description: impl Into<String>) -> Self {
        Link {
            url: url.into(),
            description: description.into(),
        }
    }
}

/// An RGB color kept free of any toolkit type; see `ui::to_color32` for the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const GRAY: RgbColor = RgbColor::new(128, 128, 128);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        RgbColor { r, g, b }
    }

    /// Accepts `#335577` or `51,85,119`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(hex) = text.strip_prefix('#') {
            if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            let rgb = u32::from_str_radix(hex, 16).ok()?;
            return Some(RgbColor::new((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8));
        }
        let parts: Vec<u8> = text
            .split(',')
            .map(|p| p.trim().parse::<u8>())
            .collect::<std::result::Result<_, _>>()
            .ok()?;
        match parts.as_slice() {
            [r, g, b] => Some(RgbColor::new(*r, *g, *b)),
            _ => None,
        }
    }
}

impl Default for RgbColor {
    fn default() -> Self {
        RgbColor::GRAY
    }
}

/// Keys a [`MetadataSource`] is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataKey {
    Product,
    Title,
    Company,
    Version,
    Copyright,
    Description,
    WebsiteUrl,
    WebsiteText,
    LicenseUrl,
    LicenseText,
    Color,
    SupportedCultures,
    Executable,
}

impl MetadataKey {
    pub fn name(self) -> &'static str {
        match self {
            MetadataKey::Product => "Product",
            MetadataKey::Title => "Title",
            MetadataKey::Company => "Company",
            MetadataKey::Version => "Version",
            MetadataKey::Copyright => "Copyright",
            MetadataKey::Description => "Description",
            MetadataKey::WebsiteUrl => "WebsiteUrl",
            MetadataKey::WebsiteText => "WebsiteText",
            MetadataKey::LicenseUrl => "LicenseUrl",
            MetadataKey::LicenseText => "LicenseText",
            MetadataKey::Color => "Color",
            MetadataKey::SupportedCultures => "SupportedCultures",
            MetadataKey::Executable => "Executable",
        }
    }
}

/// Read-only key/value source of product metadata.
pub trait MetadataSource {
    fn value(&self, key: MetadataKey) -> Option<String>;
}

impl MetadataSource for HashMap<String, String> {
    fn value(&self, key: MetadataKey) -> Option<String> {
        self.get(key.name()).filter(|v| !v.is_empty()).cloned()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppMetadata {
    pub product_name: String,
    pub title: String,
    pub company: String,
    pub version: String,
    pub copyright: String,
    pub description: String,
    pub website: Option<Link>,
    pub license: Option<Link>,
    pub color: RgbColor,
    pub supported_cultures: Vec<Culture>,
    pub executable: PathBuf,
}

impl AppMetadata {
    pub fn new(product_name: impl Into<String>, version: impl Into<String>) -> Self {
        let product_name = product_name.into();
        AppMetadata {
            title: product_name.clone(),
            company: product_name.clone(),
            product_name,
            version: version.into(),
            copyright: String::new(),
            description: String::new(),
            website: None,
            license: None,
            color: RgbColor::default(),
            supported_cultures: Vec::new(),
            executable: std::env::current_exe().unwrap_or_default(),
        }
    }

    pub fn from_source(source: &dyn MetadataSource) -> Result<Self> {
        let version = source
            .value(MetadataKey::Version)
            .ok_or_else(|| Error::InvalidVersion(String::new()))?;
        let product = source
            .value(MetadataKey::Product)
            .or_else(|| source.value(MetadataKey::Title))
            .unwrap_or_else(|| "Application".to_string());
        let mut metadata = AppMetadata::new(product, version);
        if let Some(title) = source.value(MetadataKey::Title) {
            metadata.title = title;
        }
        if let Some(company) = source.value(MetadataKey::Company) {
            metadata.company = company;
        }
        metadata.copyright = source.value(MetadataKey::Copyright).unwrap_or_default();
        metadata.description = source.value(MetadataKey::Description).unwrap_or_default();
        metadata.website = source.value(MetadataKey::WebsiteUrl).map(|url| {
            let text = source.value(MetadataKey::WebsiteText).unwrap_or_else(|| url.clone());
            Link::with_description(url, text)
        });
        metadata.license = source.value(MetadataKey::LicenseUrl).map(|url| {
            let text = source.value(MetadataKey::LicenseText).unwrap_or_else(|| url.clone());
            Link::with_description(url, text)
        });
        if let Some(color) = source.value(MetadataKey::Color) {
            match RgbColor::parse(&color) {
                Some(parsed) => metadata.color = parsed,
                None => log::warn!("Ignoring invalid product color '{}'", color),
            }
        }
        if let Some(cultures) = source.value(MetadataKey::SupportedCultures) {
            metadata.supported_cultures = cultures
                .split(',')
                .filter(|c| !c.trim().is_empty())
                .map(Culture::parse)
                .collect::<Result<_>>()?;
        }
        if let Some(exe) = source.value(MetadataKey::Executable) {
            metadata.executable = PathBuf::from(exe);
        }
        Ok(metadata)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        let company = company.into();
        if !company.is_empty() {
            self.company = company;
        }
        self
    }

    pub fn with_copyright(mut self, copyright: impl Into<String>) -> Self {
        self.copyright = copyright.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Empty URLs are ignored so Cargo's empty env values can be passed straight through.
    pub fn with_website(mut self, url: &str, description: &str) -> Self {
        if !url.is_empty() {
            self.website = Some(link_or_url(url, description));
        }
        self
    }

    pub fn with_license(mut self, url: &str, description: &str) -> Self {
        if !url.is_empty() {
            self.license = Some(link_or_url(url, description));
        }
        self
    }

    pub fn with_color(mut self, color: RgbColor) -> Self {
        self.color = color;
        self
    }

    pub fn with_supported_cultures(mut self, cultures: Vec<Culture>) -> Self {
        self.supported_cultures = cultures;
        self
    }

    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Directory containing the executable, used by portable mode.
    pub fn executable_dir(&self) -> PathBuf {
        self.executable
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn link_or_url(url: &str, description: &str) -> Link {
    if description.is_empty() {
        Link::new(url)
    } else {
        Link::with_description(url, description)
    }
}

/// Builds an [`AppMetadata`](crate::AppMetadata) from the calling crate's Cargo manifest.
#[macro_export]
macro_rules! app_metadata {
    () => {
        $crate::AppMetadata::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
            .with_company(env!("CARGO_PKG_AUTHORS"))
            .with_description(env!("CARGO_PKG_DESCRIPTION"))
            .with_website(env!("CARGO_PKG_HOMEPAGE"), "")
    };
}
