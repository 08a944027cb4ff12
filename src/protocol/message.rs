//! Inbound messages (Cinema 4D → editor).
//!
//! The host never correlates replies, so every frame is parsed on its own
//! merits. A frame that is not JSON, lacks an `action`, carries an unknown
//! action, or has an empty or mistyped required field parses to `None`
//! and is simply not a match for whoever is waiting.
//!
//! | Action | Fields | Variant |
//! |--------|--------|---------|
//! | `c4d2ide.set_script_content` | `script_path: string`, `value: string` | [`HostMessage::ScriptContent`] |
//! | `c4d2ide.get_pid` | `value: number` | [`HostMessage::ProcessId`] |
//! | `c4d2ide.get_path` | `value: string` | [`HostMessage::InstallPath`] |
//! | `c4d2ide.console` | `value: string` | [`HostMessage::Console`] |

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;
use tracing::trace;

use crate::error::Result;
use crate::paths::{ContentTarget, Platform};

// ============================================================================
// HostAction
// ============================================================================

/// Action tags the host sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostAction {
    /// Script content pushed to the editor.
    SetScriptContent,
    /// Reply to `get_pid`.
    GetPid,
    /// Reply to `get_path`.
    GetPath,
    /// Console output.
    Console,
}

impl HostAction {
    /// All inbound actions.
    pub const ALL: [Self; 4] = [
        Self::SetScriptContent,
        Self::GetPid,
        Self::GetPath,
        Self::Console,
    ];

    /// Wire tag of this action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SetScriptContent => "c4d2ide.set_script_content",
            Self::GetPid => "c4d2ide.get_pid",
            Self::GetPath => "c4d2ide.get_path",
            Self::Console => "c4d2ide.console",
        }
    }

    /// Looks up an action by wire tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.as_str() == tag)
    }
}

// ============================================================================
// ScriptContent
// ============================================================================

/// Script source pushed by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptContent {
    /// Where the script lives (`c4dfs:...` or `file:///...`).
    pub script_path: String,
    /// Script source.
    pub value: String,
}

impl ScriptContent {
    /// Resolves where this content should be written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedScheme`](crate::Error::UnsupportedScheme)
    /// for paths outside `c4dfs` and `file`.
    pub fn target(&self, platform: Platform) -> Result<ContentTarget> {
        ContentTarget::from_script_path(&self.script_path, platform)
    }
}

// ============================================================================
// HostMessage
// ============================================================================

/// A well-formed inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMessage {
    /// `c4d2ide.set_script_content`.
    ScriptContent(ScriptContent),
    /// `c4d2ide.get_pid`.
    ProcessId(u32),
    /// `c4d2ide.get_path`.
    InstallPath(String),
    /// `c4d2ide.console`.
    Console(String),
}

/// Lenient view of an inbound frame; every field may be absent or mistyped.
#[derive(Debug, Default, Deserialize)]
struct RawFrame {
    #[serde(default)]
    action: Option<Value>,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    script_path: Option<Value>,
}

impl HostMessage {
    /// Parses a raw frame, returning `None` for anything malformed.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let frame: RawFrame = match serde_json::from_str(raw) {
            Ok(frame) => frame,
            Err(e) => {
                trace!(error = %e, "Discarding undecodable frame");
                return None;
            }
        };

        let action = frame
            .action
            .as_ref()
            .and_then(Value::as_str)
            .and_then(HostAction::from_tag)?;

        match action {
            HostAction::SetScriptContent => {
                let value = non_empty_str(frame.value.as_ref())?;
                let script_path = non_empty_str(frame.script_path.as_ref())?;
                Some(Self::ScriptContent(ScriptContent {
                    script_path: script_path.to_string(),
                    value: value.to_string(),
                }))
            }
            HostAction::GetPid => frame
                .value
                .as_ref()
                .and_then(Value::as_u64)
                .filter(|pid| *pid != 0)
                .and_then(|pid| u32::try_from(pid).ok())
                .map(Self::ProcessId),
            HostAction::GetPath => {
                non_empty_str(frame.value.as_ref()).map(|path| Self::InstallPath(path.to_string()))
            }
            HostAction::Console => {
                non_empty_str(frame.value.as_ref()).map(|text| Self::Console(text.to_string()))
            }
        }
    }

    /// Action tag of this message.
    #[must_use]
    pub const fn action(&self) -> HostAction {
        match self {
            Self::ScriptContent(_) => HostAction::SetScriptContent,
            Self::ProcessId(_) => HostAction::GetPid,
            Self::InstallPath(_) => HostAction::GetPath,
            Self::Console(_) => HostAction::Console,
        }
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

// ============================================================================
// Tests
// ============================================================================
