//! Wire event schemas for the SAMi event channel.
//!
//! Events travel as JSON envelopes: `{"event": "<name>", "data": {...}}`.
//! Both directions are serde-tagged enums so payload shapes are validated at
//! the channel boundary instead of at use sites.

use serde::{Deserialize, Serialize};

/// Events sent from the client to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// Request the backend to flip its server-side microphone state.
    ToggleListening {
        /// Always [`ToggleAction::Toggle`] — the payload carries no variance.
        action: ToggleAction,
    },
    /// A text command for the assistant to process.
    TextCommand { text: String },
}

/// The only action the `toggle_listening` event carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleAction {
    Toggle,
}

/// Events delivered from the backend to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Assistant status line (e.g. "Listening", "Speaking...").
    StatusUpdate { status: String },
    /// Server-side microphone active indicator.
    MicState { active: bool },
    /// Periodic host telemetry snapshot.
    SystemStats(SystemStats),
    /// A new transcript entry produced by the backend.
    ConversationUpdate {
        role: WireRole,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image: Option<String>,
    },
}

/// Host telemetry carried by `system_stats` events.
///
/// Percentages are nominally 0–100; the session clamps on apply rather than
/// rejecting out-of-range values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStats {
    pub cpu: f32,
    pub ram: f32,
    pub disk: f32,
    pub time: String,
    pub date: String,
    pub weather: String,
}

/// Speaker role on a `conversation_update` event.
///
/// The backend only distinguishes "user" from everything else; any unknown
/// role string is treated as the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WireRole {
    User,
    Sami,
}

impl<'de> Deserialize<'de> for WireRole {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(if raw == "user" {
            Self::User
        } else {
            Self::Sami
        })
    }
}

/// Parse one inbound text frame into a typed event.
///
/// Returns `None` for frames that do not match any recognized event shape;
/// the channel logs and drops those rather than surfacing an error.
#[must_use]
pub fn parse_inbound(frame: &str) -> Option<InboundEvent> {
    match serde_json::from_str(frame) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::debug!("ignoring unrecognized inbound frame: {e}");
            None
        }
    }
}
