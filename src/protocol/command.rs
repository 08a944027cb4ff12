//! Outbound commands (editor → Cinema 4D).
//!
//! Every command serializes to one JSON object tagged by `action`.
//!
//! | Variant | Action | Fields |
//! |---------|--------|--------|
//! | `GetWorkspace` | `idea2c4d.get_workspace` | |
//! | `GetScriptContent` | `idea2c4d.get_script_content` | `script_path` |
//! | `SetScriptContent` | `idea2c4d.set_script_content` | `script_path`, `value` |
//! | `LoadInScriptManager` | `idea2c4d.load_in_script_manager` | `script_path`, `value` |
//! | `Execute` | `idea2c4d.execute` | `script_path`, `value`, `debug` |
//! | `GetPid` | `idea2c4d.get_pid` | |
//! | `GetPath` | `idea2c4d.get_path` | |

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;

use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// `script_path` sent with inline scripts that have no document.
pub const INLINE_SCRIPT_PATH: &str = "empty";

// ============================================================================
// Command
// ============================================================================

/// A command frame sent to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action")]
pub enum Command {
    /// Ask for the host workspace.
    #[serde(rename = "idea2c4d.get_workspace")]
    GetWorkspace,

    /// Ask for the content of a script.
    #[serde(rename = "idea2c4d.get_script_content")]
    GetScriptContent {
        /// Query-encoded script path.
        script_path: String,
    },

    /// Overwrite a script in the host.
    #[serde(rename = "idea2c4d.set_script_content")]
    SetScriptContent {
        /// Push-encoded script path.
        script_path: String,
        /// Script source.
        value: String,
    },

    /// Open a script in the host's script manager.
    #[serde(rename = "idea2c4d.load_in_script_manager")]
    LoadInScriptManager {
        /// Document-encoded script path.
        script_path: String,
        /// Script source.
        value: String,
    },

    /// Run a script in the host.
    #[serde(rename = "idea2c4d.execute")]
    Execute {
        /// Document-encoded script path, or `"empty"`.
        script_path: String,
        /// Script source.
        value: String,
        /// Run under the attached debugger.
        debug: bool,
    },

    /// Ask for the host process id.
    #[serde(rename = "idea2c4d.get_pid")]
    GetPid,

    /// Ask for the host installation directory.
    #[serde(rename = "idea2c4d.get_path")]
    GetPath,
}

impl Command {
    /// Execute command for an inline script body.
    #[inline]
    #[must_use]
    pub fn execute_inline(script: impl Into<String>) -> Self {
        Self::Execute {
            script_path: INLINE_SCRIPT_PATH.to_string(),
            value: script.into(),
            debug: false,
        }
    }

    /// Returns the action tag of this command.
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::GetWorkspace => "idea2c4d.get_workspace",
            Self::GetScriptContent { .. } => "idea2c4d.get_script_content",
            Self::SetScriptContent { .. } => "idea2c4d.set_script_content",
            Self::LoadInScriptManager { .. } => "idea2c4d.load_in_script_manager",
            Self::Execute { .. } => "idea2c4d.execute",
            Self::GetPid => "idea2c4d.get_pid",
            Self::GetPath => "idea2c4d.get_path",
        }
    }

    /// Serializes the command into a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn to_frame(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{Value, json};

    fn frame(command: &Command) -> Value {
        serde_json::from_str(&command.to_frame().expect("serialize")).expect("parse")
    }

    #[test]
    fn test_unit_commands_carry_only_action() {
        assert_eq!(frame(&Command::GetPid), json!({ "action": "idea2c4d.get_pid" }));
        assert_eq!(frame(&Command::GetPath), json!({ "action": "idea2c4d.get_path" }));
        assert_eq!(
            frame(&Command::GetWorkspace),
            json!({ "action": "idea2c4d.get_workspace" })
        );
    }

    #[test]
    fn test_execute_fields() {
        let command = Command::Execute {
            script_path: "file:///C:/a.py".into(),
            value: "print(1)".into(),
            debug: true,
        };
        assert_eq!(
            frame(&command),
            json!({
                "action": "idea2c4d.execute",
                "script_path": "file:///C:/a.py",
                "value": "print(1)",
                "debug": true,
            })
        );
    }

    #[test]
    fn test_execute_inline_uses_empty_path() {
        let value = frame(&Command::execute_inline("import c4d"));
        assert_eq!(value["script_path"], "empty");
        assert_eq!(value["debug"], false);
    }

    #[test]
    fn test_action_matches_serialized_tag() {
        let commands = [
            Command::GetWorkspace,
            Command::GetScriptContent {
                script_path: "c4dfs:///a".into(),
            },
            Command::SetScriptContent {
                script_path: "c4dfs:/a".into(),
                value: "x".into(),
            },
            Command::LoadInScriptManager {
                script_path: "untitled://u".into(),
                value: "x".into(),
            },
            Command::execute_inline("x"),
            Command::GetPid,
            Command::GetPath,
        ];

        for command in &commands {
            assert_eq!(frame(command)["action"], command.action());
        }
    }
}
