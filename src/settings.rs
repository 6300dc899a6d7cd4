use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Screen corner the message container is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Placement {
    Top,
    TopLeft,
    TopRight,
    Bottom,
    BottomLeft,
    BottomRight,
}

impl Default for Placement {
    fn default() -> Self {
        Placement::BottomRight
    }
}

impl std::fmt::Display for Placement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Placement::Top => write!(f, "top"),
            Placement::TopLeft => write!(f, "top-left"),
            Placement::TopRight => write!(f, "top-right"),
            Placement::Bottom => write!(f, "bottom"),
            Placement::BottomLeft => write!(f, "bottom-left"),
            Placement::BottomRight => write!(f, "bottom-right"),
        }
    }
}

/// Lifecycle settings for keyed messages.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MessageSettings {
    /// How long a keyed message stays up after its last update.
    #[serde(default = "default_message_duration")]
    pub default_duration_ms: u64,
    /// Delay applied by `MessageManager::destroy` before tearing a message down.
    #[serde(default = "default_destroy_delay")]
    pub destroy_delay_ms: u64,
    /// Append every shown message to this file when set.
    #[serde(default)]
    pub history_file: Option<String>,
}

impl Default for MessageSettings {
    fn default() -> Self {
        Self {
            default_duration_ms: default_message_duration(),
            destroy_delay_ms: default_destroy_delay(),
            history_file: None,
        }
    }
}

impl MessageSettings {
    pub fn default_duration(&self) -> Duration {
        Duration::from_millis(self.default_duration_ms)
    }

    pub fn destroy_delay(&self) -> Duration {
        Duration::from_millis(self.destroy_delay_ms)
    }
}

/// Container settings for the message board.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BoardSettings {
    /// Maximum number of widgets shown at once. The oldest is dismissed when
    /// a new one would exceed it. The default of 5 is the cap the front end
    /// puts on its notification container; the board applies the same cap to
    /// messages, which the front end itself leaves unbounded.
    #[serde(default = "default_max_visible")]
    pub max_visible: usize,
    #[serde(default)]
    pub placement: Placement,
    /// Gap between the container and the bottom edge of the window.
    #[serde(default = "default_margin_bottom")]
    pub margin_bottom: f32,
    /// Length of the exit transition.
    #[serde(default = "default_leave_duration")]
    pub leave_duration_ms: u64,
    /// Auto-hide used for anonymous messages that carry no duration.
    #[serde(default = "default_board_duration")]
    pub default_duration_ms: u64,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            max_visible: default_max_visible(),
            placement: Placement::default(),
            margin_bottom: default_margin_bottom(),
            leave_duration_ms: default_leave_duration(),
            default_duration_ms: default_board_duration(),
        }
    }
}

impl BoardSettings {
    pub fn leave_duration(&self) -> Duration {
        Duration::from_millis(self.leave_duration_ms)
    }

    pub fn default_duration(&self) -> Duration {
        Duration::from_millis(self.default_duration_ms)
    }
}

/// Default labels filled into confirm dialogs.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DialogSettings {
    #[serde(default = "default_positive_text")]
    pub positive_text: String,
    #[serde(default = "default_negative_text")]
    pub negative_text: String,
}

impl Default for DialogSettings {
    fn default() -> Self {
        Self {
            positive_text: default_positive_text(),
            negative_text: default_negative_text(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Settings {
    /// When enabled the logger is initialised at debug level.
    /// Defaults to `false` when the field is missing in the settings file.
    #[serde(default)]
    pub debug_logging: bool,
    /// Write log output to this file instead of stdout.
    #[serde(default)]
    pub log_file: Option<String>,
    #[serde(default)]
    pub messages: MessageSettings,
    #[serde(default)]
    pub board: BoardSettings,
    #[serde(default)]
    pub dialog: DialogSettings,
}

fn default_message_duration() -> u64 {
    5000
}

fn default_destroy_delay() -> u64 {
    200
}

fn default_max_visible() -> usize {
    5
}

fn default_margin_bottom() -> f32 {
    32.0
}

fn default_leave_duration() -> u64 {
    300
}

fn default_board_duration() -> u64 {
    3000
}

fn default_positive_text() -> String {
    "OK".into()
}

fn default_negative_text() -> String {
    "Cancel".into()
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
