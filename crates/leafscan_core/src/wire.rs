//! crates/leafscan_core/src/wire.rs
//!
//! JSON shapes returned by the detection backend and their conversion into
//! domain types. Parsing is lenient about key casing and scalar types because
//! the backend is not consistent across endpoints.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::domain::{DetectionResult, Disease};

/// `{ success, message, data }` envelope used by every endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DiseaseRecord {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default, deserialize_with = "lenient_strings")]
    solutions: Vec<String>,
}

impl DiseaseRecord {
    fn to_domain(self) -> Disease {
        Disease {
            name: self.name,
            description: self.description,
            solutions: self.solutions,
        }
    }
}

/// History items sometimes carry only the disease name.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum DiseaseField {
    Name(String),
    Detail(DiseaseRecord),
}

impl DiseaseField {
    pub fn name(&self) -> &str {
        match self {
            DiseaseField::Name(name) => name,
            DiseaseField::Detail(record) => &record.name,
        }
    }

    fn to_domain(self) -> Disease {
        match self {
            DiseaseField::Name(name) => Disease {
                name,
                description: String::new(),
                solutions: Vec::new(),
            },
            DiseaseField::Detail(record) => record.to_domain(),
        }
    }
}

/// A detection as returned by `POST /detections` and `GET /detections/history`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DetectionRecord {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(default, alias = "image_url", alias = "image")]
    pub image_url: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub accuracy: f64,
    #[serde(default)]
    pub status: String,
    #[serde(
        default,
        alias = "detected_at",
        alias = "createdAt",
        alias = "created_at",
        deserialize_with = "lenient_datetime"
    )]
    pub detected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub disease: Option<DiseaseField>,
    #[serde(default, alias = "article_slug", alias = "slug")]
    pub article_slug: Option<String>,
}

impl DetectionRecord {
    /// A missing timestamp is stamped with `received_at`.
    pub fn to_domain(self, received_at: DateTime<Utc>) -> DetectionResult {
        DetectionResult {
            id: self.id,
            image_url: self.image_url,
            accuracy: clamp_accuracy(self.accuracy),
            status: self.status,
            detected_at: self.detected_at.unwrap_or(received_at),
            disease: self.disease.map(DiseaseField::to_domain),
            article_slug: self.article_slug.filter(|s| !s.trim().is_empty()),
        }
    }
}

pub(crate) fn clamp_accuracy(accuracy: f64) -> f64 {
    if accuracy.is_nan() {
        0.0
    } else {
        accuracy.clamp(0.0, 100.0)
    }
}

/// The human-readable error in a failed reply body, if the backend sent one.
pub(crate) fn error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let pick = |v: &Value| v.as_str().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
    pick(&value["message"])
        .or_else(|| pick(&value["error"]))
        .or_else(|| pick(&value["error"]["message"]))
}

//=========================================================================================
// Lenient scalar deserializers
//=========================================================================================

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid id: {}", other))),
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom("accuracy out of range")),
        Value::String(s) => s
            .trim()
            .trim_end_matches('%')
            .parse::<f64>()
            .map_err(serde::de::Error::custom),
        Value::Null => Ok(0.0),
        other => Err(serde::de::Error::custom(format!("invalid accuracy: {}", other))),
    }
}

fn lenient_strings<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let items = match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                Value::Object(map) => ["title", "name", "description"]
                    .iter()
                    .find_map(|key| map.get(*key).and_then(Value::as_str).map(str::to_string))
                    .unwrap_or_default(),
                other => other.to_string(),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => s
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };
    Ok(items)
}

fn lenient_datetime<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

/// RFC 3339 first, then offset-less timestamps read as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}
