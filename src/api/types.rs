//! API response type definitions.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A creator entry from the site's creator index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Creator {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    pub service: String,
    #[serde(default, with = "flexible_timestamp")]
    pub indexed: Option<DateTime<Utc>>,
    #[serde(default, with = "flexible_timestamp")]
    pub updated: Option<DateTime<Utc>>,
}

impl Creator {
    /// Build a creator record without consulting the index.
    pub fn new(id: impl Into<String>, name: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            service: service.into(),
            indexed: None,
            updated: None,
        }
    }
}

/// A post record from a creator's listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub user: Option<String>,
    #[serde(default)]
    pub service: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default)]
    pub added: Option<String>,
    #[serde(default)]
    pub published: Option<String>,
    #[serde(default)]
    pub edited: Option<String>,
    #[serde(default)]
    pub shared_file: bool,
    /// Embedded external link, usually `{}` when absent.
    #[serde(default)]
    pub embed: serde_json::Value,
    /// Primary file; the API sends `{}` when there is none.
    #[serde(default, deserialize_with = "null_as_default")]
    pub file: FileDescriptor,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attachments: Vec<FileDescriptor>,
}

impl Post {
    /// Whether the post carries a non-empty embed object.
    pub fn has_embed(&self) -> bool {
        match &self.embed {
            serde_json::Value::Null => false,
            serde_json::Value::Object(map) => !map.is_empty(),
            serde_json::Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }
}

/// A downloadable file descriptor as sent by the API.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

impl FileDescriptor {
    /// A descriptor is usable only when it names a server path.
    pub fn is_present(&self) -> bool {
        self.path.as_deref().is_some_and(|p| !p.is_empty())
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    })
}

fn opt_string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Str(s) => s,
        Raw::Int(n) => n.to_string(),
    }))
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Timestamps arrive as epoch seconds (int or float) or as formatted strings.
/// They are written back as epoch seconds.
mod flexible_timestamp {
    use super::*;

    const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Str(String),
    }

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_i64(dt.timestamp()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(raw) = Option::<Raw>::deserialize(deserializer)? else {
            return Ok(None);
        };

        Ok(match raw {
            Raw::Int(secs) => Utc.timestamp_opt(secs, 0).single(),
            Raw::Float(secs) => Utc.timestamp_opt(secs.trunc() as i64, 0).single(),
            Raw::Str(s) => parse_date_string(&s),
        })
    }

    pub(super) fn parse_date_string(s: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(s, HTTP_DATE)
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
            .ok()
            .map(|naive| Utc.from_utc_datetime(&naive))
    }
}
