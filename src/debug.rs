//! Debugger attach configuration.
//!
//! Cinema 4D embeds its own Python interpreter and ships `debugpy`. To
//! attach, the editor needs the host's process id plus the interpreter
//! and adapter paths under the install directory. Launching the debugger
//! is left to the caller; once it runs, the document is executed with
//! `debug = true`.

// ============================================================================
// Imports
// ============================================================================

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::client::Client;
use crate::error::{Error, Result};
use crate::host::ScriptDocument;
use crate::paths::{Platform, normalize_path_for};

// ============================================================================
// Constants
// ============================================================================

/// Python versions probed, newest layout last.
const PYTHON_VERSIONS: [&str; 2] = ["python39", "python310"];

// ============================================================================
// AttachConfig
// ============================================================================

/// Python attach configuration for a running Cinema 4D.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachConfig {
    /// Session name, unique per host process.
    pub name: String,
    /// Always `attach`.
    pub request: String,
    /// Debugger type, always `python`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Cinema 4D process id.
    pub process_id: u32,
    /// Directory of the script on this machine.
    pub local_root: String,
    /// Same directory as seen by the host.
    pub remote_root: String,
    /// Break on the first line.
    pub stop_on_entry: bool,
    /// Skip library frames while stepping.
    pub just_my_code: bool,
    /// Whether `debugpy` writes its own log files (`"true"` or `"false"`).
    pub log_to_file: String,
    /// `debugpy/adapter` directory inside the install.
    pub debug_adapter_path: PathBuf,
    /// Interpreter bundled with the install.
    pub python_path: PathBuf,
}

impl AttachConfig {
    /// Builds the configuration for `script` running in the host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Debugger`] if neither a bundled interpreter nor a
    /// bundled `debugpy` adapter exists under `install`.
    pub fn resolve(pid: u32, install: &Path, script: &Path, platform: Platform) -> Result<Self> {
        let python_path = first_existing(install, platform, interpreter_path).ok_or_else(|| {
            Error::debugger("Incorrect path for the c4d python executable, debugger will not work.")
        })?;
        let debug_adapter_path = first_existing(install, platform, |libs, version, _| {
            libs.join(version).join("debugpy").join("adapter")
        })
        .ok_or_else(|| Error::debugger("Incorrect path for the debugpy, debugger will not work."))?;

        let root = script
            .parent()
            .map(|dir| normalize_path_for(platform, &dir.to_string_lossy()))
            .unwrap_or_default();

        Ok(Self {
            name: Self::session_name(pid),
            request: "attach".to_string(),
            kind: "python".to_string(),
            process_id: pid,
            local_root: root.clone(),
            remote_root: root,
            stop_on_entry: false,
            just_my_code: true,
            log_to_file: "true".to_string(),
            debug_adapter_path,
            python_path,
        })
    }

    /// Session name for a host process, used to spot an existing session.
    #[must_use]
    pub fn session_name(pid: u32) -> String {
        format!("Python attached to Cinema 4D - PID {pid}")
    }
}

/// Bundled interpreter of one Python version.
fn interpreter_path(libs: &Path, version: &str, platform: Platform) -> PathBuf {
    match platform {
        Platform::Windows => libs
            .join(format!("{version}.win64.framework"))
            .join("python.exe"),
        Platform::Posix => libs
            .join(format!("{version}.macos.framework"))
            .join("python")
            .join("Contents")
            .join("MacOS")
            .join("python"),
    }
}

/// First candidate under the Python libs directory that exists on disk.
fn first_existing(
    install: &Path,
    platform: Platform,
    candidate: impl Fn(&Path, &str, Platform) -> PathBuf,
) -> Option<PathBuf> {
    let libs = install
        .join("resource")
        .join("modules")
        .join("python")
        .join("libs");

    PYTHON_VERSIONS.iter().find_map(|version| {
        let path = candidate(&libs, version, platform);
        debug!(path = %path.display(), "Probing");
        path.exists().then_some(path)
    })
}

// ============================================================================
// Client - Debugging
// ============================================================================

impl Client {
    /// Gathers what a debugger needs to attach to the host.
    ///
    /// Only documents saved on disk can be debugged.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedScheme`] for anything but `file` documents
    /// - [`Error::Debugger`] if the host does not report its pid or path
    /// - transport errors from the queries
    pub async fn prepare_debug_session(&self, doc: &ScriptDocument) -> Result<AttachConfig> {
        let platform = self.platform();
        let script = doc
            .uri
            .fs_path(platform)
            .ok_or_else(|| Error::unsupported_scheme(doc.uri.scheme().as_str(), "file"))?;

        let pid = self
            .get_pid()
            .await?
            .ok_or_else(|| Error::debugger("Unable to retrieve Cinema 4D Process ID"))?;
        let install = self
            .get_install_path()
            .await?
            .ok_or_else(|| Error::debugger("Unable to retrieve Cinema 4D path"))?;

        let config = AttachConfig::resolve(pid, Path::new(&install), &script, platform)?;
        info!(pid, python = %config.python_path.display(), "Debug session prepared");
        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    use crate::config::{ConfigStore, MemoryConfigStore, ReplyPolicy};
    use crate::paths::ScriptUri;
    use crate::testing::MockHost;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }

    fn libs(install: &Path) -> PathBuf {
        install.join("resource/modules/python/libs")
    }

    #[test]
    fn test_resolve_prefers_python39() {
        let install = tempfile::tempdir().unwrap();
        let libs = libs(install.path());
        touch(&libs.join("python39.macos.framework/python/Contents/MacOS/python"));
        touch(&libs.join("python310.macos.framework/python/Contents/MacOS/python"));
        std::fs::create_dir_all(libs.join("python39/debugpy/adapter")).unwrap();

        let config = AttachConfig::resolve(
            314,
            install.path(),
            Path::new("/home/me/scripts/cube.py"),
            Platform::Posix,
        )
        .unwrap();

        assert_eq!(config.name, "Python attached to Cinema 4D - PID 314");
        assert!(config.python_path.ends_with("python39.macos.framework/python/Contents/MacOS/python"));
        assert!(config.debug_adapter_path.ends_with("python39/debugpy/adapter"));
        assert_eq!(config.local_root, "/home/me/scripts");
        assert_eq!(config.remote_root, config.local_root);
    }

    #[test]
    fn test_resolve_falls_back_to_python310() {
        let install = tempfile::tempdir().unwrap();
        let libs = libs(install.path());
        touch(&libs.join("python310.win64.framework/python.exe"));
        std::fs::create_dir_all(libs.join("python310/debugpy/adapter")).unwrap();

        let config =
            AttachConfig::resolve(1, install.path(), Path::new("/c:/s/a.py"), Platform::Windows)
                .unwrap();

        assert!(config.python_path.ends_with("python310.win64.framework/python.exe"));
        assert!(config.debug_adapter_path.ends_with("python310/debugpy/adapter"));
        assert_eq!(config.local_root, "C:/s");
    }

    #[test]
    fn test_resolve_missing_interpreter() {
        let install = tempfile::tempdir().unwrap();
        let err = AttachConfig::resolve(1, install.path(), Path::new("/a.py"), Platform::Posix)
            .unwrap_err();
        assert!(err.to_string().contains("python executable"));
    }

    #[test]
    fn test_serializes_camel_case() {
        let config = AttachConfig {
            name: AttachConfig::session_name(9),
            request: "attach".into(),
            kind: "python".into(),
            process_id: 9,
            local_root: "/s".into(),
            remote_root: "/s".into(),
            stop_on_entry: false,
            just_my_code: true,
            log_to_file: "true".into(),
            debug_adapter_path: PathBuf::from("/a"),
            python_path: PathBuf::from("/p"),
        };
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["type"], "python");
        assert_eq!(value["processId"], 9);
        assert_eq!(value["justMyCode"], true);
        assert_eq!(value["debugAdapterPath"], "/a");
    }

    #[tokio::test]
    async fn test_prepare_rejects_virtual_documents() {
        let client = Client::builder().build().unwrap();
        let doc = ScriptDocument::new(ScriptUri::virtual_script("/a.py"), "");
        assert!(matches!(
            client.prepare_debug_session(&doc).await,
            Err(Error::UnsupportedScheme { .. })
        ));
    }

    #[tokio::test]
    async fn test_prepare_reports_missing_pid() {
        let mut host = MockHost::bind().await;
        let store = Arc::new(MemoryConfigStore::default());
        store.set_endpoint(host.endpoint());
        let client = Client::builder()
            .config_store(store as Arc<dyn ConfigStore>)
            .reply_policy(ReplyPolicy::new(20, Duration::from_millis(100)))
            .platform(Platform::Posix)
            .build()
            .unwrap();
        client.start().await.unwrap();

        let doc = ScriptDocument::new(ScriptUri::file("/home/me/a.py"), "");
        let task = {
            let client = client.clone();
            tokio::spawn(async move { client.prepare_debug_session(&doc).await })
        };
        assert_eq!(host.next_frame().await["action"], "idea2c4d.get_pid");

        let err = task.await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "Unable to retrieve Cinema 4D Process ID");
    }

    #[tokio::test]
    async fn test_prepare_full_session() {
        let install = tempfile::tempdir().unwrap();
        let libs = libs(install.path());
        touch(&libs.join("python39.macos.framework/python/Contents/MacOS/python"));
        std::fs::create_dir_all(libs.join("python39/debugpy/adapter")).unwrap();

        let mut host = MockHost::bind().await;
        let client = Client::builder()
            .endpoint(host.endpoint())
            .platform(Platform::Posix)
            .build()
            .unwrap();
        client.start().await.unwrap();

        let doc = ScriptDocument::new(ScriptUri::file("/home/me/a.py"), "");
        let task = {
            let client = client.clone();
            tokio::spawn(async move { client.prepare_debug_session(&doc).await })
        };

        host.next_frame().await;
        host.push_json(json!({"action": "c4d2ide.get_pid", "value": 55}));
        assert_eq!(host.next_frame().await["action"], "idea2c4d.get_path");
        host.push_json(json!({
            "action": "c4d2ide.get_path",
            "value": install.path().to_string_lossy(),
        }));

        let config = task.await.unwrap().unwrap();
        assert_eq!(config.process_id, 55);
        assert_eq!(config.local_root, "/home/me");
    }
}
