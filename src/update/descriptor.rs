//! The remote update descriptor.
//!
//! The usual form is an XML document:
//!
//! ```xml
//! <AppUpdate>
//!   <Version>1.2.0</Version>
//!   <DownloadLink>https://example.org/Setup.msi</DownloadLink>
//!   <DownloadFileName>Setup.msi</DownloadFileName>
//!   <VersionNotes>Fixes.</VersionNotes>
//!   <ReleaseDate>2018-07-07T00:00:00</ReleaseDate>
//!   <MD5Hash>9e107d9d372bb6826bd81d3542a419d6</MD5Hash>
//! </AppUpdate>
//! ```
//!
//! A JSON object with the same field names is accepted as well. Only
//! `Version` and `DownloadLink` are required.

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::version::AppVersion;

#[derive(Debug, Clone, PartialEq)]
pub struct AppUpdateDescriptor {
    pub version: String,
    pub download_url: String,
    pub download_file_name: Option<String>,
    pub release_notes: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub md5: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename = "AppUpdate")]
struct RawDescriptor {
    #[serde(rename = "Version")]
    version: String,
    #[serde(rename = "DownloadLink")]
    download_link: String,
    #[serde(rename = "DownloadFileName", default)]
    download_file_name: Option<String>,
    #[serde(rename = "VersionNotes", default)]
    version_notes: Option<String>,
    #[serde(rename = "ReleaseDate", default)]
    release_date: Option<String>,
    #[serde(rename = "MD5Hash", default)]
    md5_hash: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_release_date(text: &str) -> Option<NaiveDate> {
    if let Ok(date_time) = DateTime::parse_from_rfc3339(text) {
        return Some(date_time.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(date_time) = NaiveDateTime::parse_from_str(text, format) {
            return Some(date_time.date());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

impl AppUpdateDescriptor {
    pub fn parse(text: &str) -> Result<Self> {
        let raw: RawDescriptor = if text.trim_start().starts_with('{') {
            serde_json::from_str(text).map_err(|e| Error::DescriptorParse(e.to_string()))?
        } else {
            quick_xml::de::from_str(text).map_err(|e| Error::DescriptorParse(e.to_string()))?
        };

        let version = raw.version.trim().to_string();
        AppVersion::parse(&version)
            .map_err(|_| Error::DescriptorParse(format!("invalid version '{}'", version)))?;
        let download_url = raw.download_link.trim().to_string();
        if download_url.is_empty() {
            return Err(Error::DescriptorParse("empty download link".into()));
        }
        let release_date = non_empty(raw.release_date).and_then(|text| {
            let parsed = parse_release_date(&text);
            if parsed.is_none() {
                log::warn!("Ignoring unparsable release date '{}'", text);
            }
            parsed
        });

        Ok(AppUpdateDescriptor {
            version,
            download_url,
            download_file_name: non_empty(raw.download_file_name),
            release_notes: non_empty(raw.version_notes),
            release_date,
            md5: non_empty(raw.md5_hash),
        })
    }

    pub fn app_version(&self) -> Result<AppVersion> {
        AppVersion::parse(&self.version)
    }

    /// Local file name: the declared one, else the last URL path segment.
    /// Directory parts are stripped.
    pub fn file_name(&self) -> Option<String> {
        let candidate = match &self.download_file_name {
            Some(name) => name.clone(),
            None => {
                let url = reqwest::Url::parse(&self.download_url).ok()?;
                url.path_segments()?.last()?.to_string()
            }
        };
        Path::new(&candidate)
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .filter(|name| !name.is_empty())
    }
}
