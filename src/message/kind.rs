use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Severity of a transient message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Loading,
    Success,
    Error,
    Info,
    Warning,
}

impl MessageKind {
    pub const ALL: [MessageKind; 5] = [
        MessageKind::Loading,
        MessageKind::Success,
        MessageKind::Error,
        MessageKind::Info,
        MessageKind::Warning,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Loading => "loading",
            MessageKind::Success => "success",
            MessageKind::Error => "error",
            MessageKind::Info => "info",
            MessageKind::Warning => "warning",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        MessageKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| Error::UnknownKind(trimmed.to_string()))
    }
}
