use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::time::Duration;

/// Options accepted by every show operation.
///
/// `key` and `duration` drive the lifecycle; every other field is kept in
/// `extra` and handed to the renderer untouched. The JSON form matches the
/// options bag used by front-end callers:
///
/// ```
/// # use keyed_messages::message::MessageOptions;
/// let opts = MessageOptions::from_json(r#"{"key":"save","duration":3000,"closable":true}"#).unwrap();
/// assert_eq!(opts.key.as_deref(), Some("save"));
/// assert!(opts.extra.contains_key("closable"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(
        default,
        with = "duration_ms",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<Duration>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MessageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for a message living in the `key` slot.
    pub fn keyed(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    #[must_use]
    pub fn duration_ms(self, ms: u64) -> Self {
        self.duration(Duration::from_millis(ms))
    }

    /// Adds a passthrough field for the renderer.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    /// The key, treating an empty string as no key.
    pub fn slot(&self) -> Option<&str> {
        self.key.as_deref().filter(|k| !k.is_empty())
    }
}

mod duration_ms {
    use super::*;

    /// Millisecond counts as they arrive from JSON. Fractions and negatives
    /// are accepted and normalised.
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Millis {
        Whole(u64),
        Fraction(f64),
    }

    impl Millis {
        fn into_duration(self) -> Duration {
            match self {
                Millis::Whole(ms) => Duration::from_millis(ms),
                // `as` saturates, so huge values clamp to u64::MAX.
                Millis::Fraction(ms) => Duration::from_millis(ms.max(0.0).round() as u64),
            }
        }
    }

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let ms: Option<Millis> = Option::deserialize(d)?;
        Ok(ms.map(Millis::into_duration))
    }
}
