//! Dotted numeric versions (`1.2.0`, `v2.0`, `0.4.0.18188`).
//!
//! Components are compared left to right; missing trailing components count
//! as zero, so `2.0` equals `2.0.0`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

#[derive(Debug, Clone)]
pub struct AppVersion {
    parts: Vec<u64>,
}

impl AppVersion {
    pub fn parse(text: &str) -> Result<Self, Error> {
        let trimmed = text.trim();
        let numeric = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        if numeric.is_empty() {
            return Err(Error::InvalidVersion(text.to_string()));
        }
        let parts = numeric
            .split('.')
            .map(|part| part.parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| Error::InvalidVersion(text.to_string()))?;
        Ok(AppVersion { parts })
    }

    pub fn parts(&self) -> &[u64] {
        &self.parts
    }

    /// True when `self` is strictly newer than `other`.
    pub fn is_newer_than(&self, other: &AppVersion) -> bool {
        self > other
    }
}

impl FromStr for AppVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AppVersion::parse(s)
    }
}

impl Ord for AppVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        for i in 0..len {
            let a = self.parts.get(i).copied().unwrap_or(0);
            let b = other.parts.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for AppVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for AppVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AppVersion {}

impl fmt::Display for AppVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text: Vec<String> = self.parts.iter().map(|p| p.to_string()).collect();
        f.write_str(&text.join("."))
    }
}
