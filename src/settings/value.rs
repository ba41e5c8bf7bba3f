//! Setting entries and their on-disk value form.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// How a value is written to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializeAs {
    /// A string, number or boolean scalar.
    String,
    /// A structured document (JSON tree).
    Structured,
    /// MessagePack bytes stored as base64 text.
    Binary,
}

/// Which per-user root a setting lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Local,
    Roamed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredValue {
    #[serde(rename = "kind")]
    pub serialize_as: SerializeAs,
    pub data: Value,
}

impl StoredValue {
    /// Encodes `value`; `None` picks `String` for scalars and `Structured` otherwise.
    /// Returns `Ok(None)` for null values, which are never persisted.
    pub fn encode<T: Serialize + ?Sized>(
        value: &T,
        serialize_as: Option<SerializeAs>,
    ) -> Result<Option<Self>> {
        if serialize_as == Some(SerializeAs::Binary) {
            let bytes =
                rmp_serde::to_vec_named(value).map_err(|e| Error::Serialize(e.to_string()))?;
            // 0xc0 is the MessagePack nil marker
            if bytes == [0xc0] {
                return Ok(None);
            }
            return Ok(Some(StoredValue {
                serialize_as: SerializeAs::Binary,
                data: Value::String(BASE64.encode(bytes)),
            }));
        }
        let json = serde_json::to_value(value).map_err(|e| Error::Serialize(e.to_string()))?;
        StoredValue::from_json(json, serialize_as)
    }

    pub fn from_json(json: Value, serialize_as: Option<SerializeAs>) -> Result<Option<Self>> {
        if json.is_null() {
            return Ok(None);
        }
        let scalar = matches!(json, Value::String(_) | Value::Number(_) | Value::Bool(_));
        let kind = serialize_as.unwrap_or(if scalar {
            SerializeAs::String
        } else {
            SerializeAs::Structured
        });
        match kind {
            SerializeAs::String if !scalar => Err(Error::Serialize(format!(
                "value {} has no string form",
                json
            ))),
            SerializeAs::Binary => StoredValue::encode(&json, Some(SerializeAs::Binary)),
            _ => Ok(Some(StoredValue {
                serialize_as: kind,
                data: json,
            })),
        }
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        match self.serialize_as {
            SerializeAs::String | SerializeAs::Structured => {
                serde_json::from_value(self.data.clone()).map_err(|e| Error::Serialize(e.to_string()))
            }
            SerializeAs::Binary => {
                let text = self
                    .data
                    .as_str()
                    .ok_or_else(|| Error::Serialize("binary value is not base64 text".into()))?;
                let bytes = BASE64
                    .decode(text)
                    .map_err(|e| Error::Serialize(e.to_string()))?;
                rmp_serde::from_slice(&bytes).map_err(|e| Error::Serialize(e.to_string()))
            }
        }
    }

    pub fn to_json(&self) -> Result<Value> {
        self.decode::<Value>()
    }
}

/// A named setting with its default and placement.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingEntry {
    pub name: String,
    pub serialize_as: Option<SerializeAs>,
    pub default: Option<StoredValue>,
    pub scope: Scope,
}

impl SettingEntry {
    pub fn new(name: impl Into<String>) -> Self {
        SettingEntry {
            name: name.into(),
            serialize_as: None,
            default: None,
            scope: Scope::Local,
        }
    }

    pub fn serialize_as(mut self, kind: SerializeAs) -> Self {
        self.serialize_as = Some(kind);
        self
    }

    pub fn roamed(mut self, roamed: bool) -> Self {
        self.scope = if roamed { Scope::Roamed } else { Scope::Local };
        self
    }

    pub fn with_default<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self> {
        self.default = StoredValue::encode(value, self.serialize_as)?;
        Ok(self)
    }
}
