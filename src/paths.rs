//! Script URIs and path normalization.
//!
//! Editor documents are addressed by URI (`file:`, `c4dfs:`, `untitled:`).
//! Before a path is embedded into a protocol frame it goes through
//! [`normalize_path_for`] so both sides of the socket agree byte for byte.
//!
//! # Wire Encodings
//!
//! | Encoding | `c4dfs` | `file` | `untitled` |
//! |----------|---------|--------|------------|
//! | query    | `c4dfs://{path}` | `file:///{norm}` | `untitled:///{norm}` |
//! | document | `c4dfs:{path}` | `file:///{norm}` | `untitled://{norm}` |
//! | push     | `c4dfs:{path}` | `file:///{norm}` | rejected |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::PathBuf;

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Platform
// ============================================================================

/// Path convention of the machine running the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Drive-letter paths (`C:\...`).
    Windows,
    /// Slash-rooted paths.
    Posix,
}

impl Platform {
    /// Platform this binary was compiled for.
    #[inline]
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Posix
        }
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// Normalizes `path` for the current platform.
#[inline]
#[must_use]
pub fn normalize_path(path: &str) -> String {
    normalize_path_for(Platform::current(), path)
}

/// Normalizes `path` for `platform`.
///
/// On Windows a single leading `/` is stripped and a leading drive letter
/// is uppercased, so `/c:/foo` becomes `C:/foo`. Elsewhere this is the
/// identity.
#[must_use]
pub fn normalize_path_for(platform: Platform, path: &str) -> String {
    if platform == Platform::Posix {
        return path.to_string();
    }

    let path = path.strip_prefix('/').unwrap_or(path);
    let mut chars = path.chars();
    match (chars.next(), chars.next()) {
        (Some(drive), Some(':')) if drive.is_ascii_alphabetic() => {
            format!("{}{}", drive.to_ascii_uppercase(), &path[1..])
        }
        _ => path.to_string(),
    }
}

// ============================================================================
// Scheme
// ============================================================================

/// Scheme of a document URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Real file on disk.
    File,
    /// Script living inside Cinema 4D's script manager.
    Virtual,
    /// Unsaved editor buffer.
    Untitled,
    /// Anything else.
    Other(String),
}

impl Scheme {
    /// Scheme name as it appears in URIs.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::File => "file",
            Self::Virtual => "c4dfs",
            Self::Untitled => "untitled",
            Self::Other(name) => name,
        }
    }

    fn from_name(name: &str) -> Self {
        match name {
            "file" => Self::File,
            "c4dfs" => Self::Virtual,
            "untitled" => Self::Untitled,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ScriptUri
// ============================================================================

/// URI of an editor document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScriptUri {
    scheme: Scheme,
    path: String,
}

impl ScriptUri {
    /// Parses a URI string such as `file:///c%3A/scripts/a.py`.
    ///
    /// The path component is percent-decoded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if `uri` is not a valid URI.
    pub fn parse(uri: &str) -> Result<Self> {
        let url = Url::parse(uri)?;
        let scheme = Scheme::from_name(url.scheme());

        let raw = match url.host_str() {
            Some(host) if !host.is_empty() && scheme != Scheme::File => {
                format!("/{host}{}", url.path())
            }
            _ => url.path().to_string(),
        };
        let path = urlencoding::decode(&raw)
            .map(|decoded| decoded.into_owned())
            .unwrap_or(raw);

        Ok(Self { scheme, path })
    }

    /// URI of a file on disk.
    ///
    /// Backslashes become forward slashes and the path is rooted, so
    /// `C:\a\b.py` becomes `/C:/a/b.py`.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        let raw = path.into().to_string_lossy().replace('\\', "/");
        let path = if raw.starts_with('/') {
            raw
        } else {
            format!("/{raw}")
        };
        Self {
            scheme: Scheme::File,
            path,
        }
    }

    /// URI of a script inside the script manager.
    #[must_use]
    pub fn virtual_script(path: impl Into<String>) -> Self {
        Self {
            scheme: Scheme::Virtual,
            path: path.into(),
        }
    }

    /// URI of an unsaved buffer.
    #[must_use]
    pub fn untitled(name: impl Into<String>) -> Self {
        Self {
            scheme: Scheme::Untitled,
            path: name.into(),
        }
    }

    /// URI with an arbitrary scheme.
    #[must_use]
    pub fn with_scheme(scheme: &str, path: impl Into<String>) -> Self {
        Self {
            scheme: Scheme::from_name(scheme),
            path: path.into(),
        }
    }

    /// Returns the scheme.
    #[inline]
    #[must_use]
    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    /// Returns the decoded path component.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Filesystem path for `file:` URIs.
    #[must_use]
    pub fn fs_path(&self, platform: Platform) -> Option<PathBuf> {
        (self.scheme == Scheme::File).then(|| PathBuf::from(normalize_path_for(platform, &self.path)))
    }

    /// Encoding used by `get_script_content`.
    #[must_use]
    pub fn query_path(&self, platform: Platform) -> String {
        match self.scheme {
            Scheme::Virtual => format!("c4dfs://{}", self.path),
            _ => format!(
                "{}:///{}",
                self.scheme,
                normalize_path_for(platform, &self.path)
            ),
        }
    }

    /// Encoding used by `load_in_script_manager` and `execute`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedScheme`] outside `file`, `c4dfs`, `untitled`.
    pub fn document_path(&self, platform: Platform) -> Result<String> {
        match &self.scheme {
            Scheme::Virtual => Ok(format!("c4dfs:{}", self.path)),
            Scheme::File => Ok(format!(
                "file:///{}",
                normalize_path_for(platform, &self.path)
            )),
            Scheme::Untitled => Ok(format!(
                "untitled://{}",
                normalize_path_for(platform, &self.path)
            )),
            Scheme::Other(name) => Err(Error::unsupported_scheme(
                name.as_str(),
                "file, c4dfs or untitled",
            )),
        }
    }

    /// Encoding used by `set_script_content`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedScheme`] outside `c4dfs` and `file`.
    pub fn push_path(&self, platform: Platform) -> Result<String> {
        match &self.scheme {
            Scheme::Virtual => Ok(format!("c4dfs:{}", self.path)),
            Scheme::File => Ok(format!(
                "file:///{}",
                normalize_path_for(platform, &self.path)
            )),
            other => Err(Error::unsupported_scheme(other.as_str(), "c4dfs or file")),
        }
    }
}

impl fmt::Display for ScriptUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scheme {
            Scheme::File => write!(f, "file://{}", self.path),
            _ => write!(f, "{}:{}", self.scheme, self.path),
        }
    }
}

// ============================================================================
// ContentTarget
// ============================================================================

/// Destination named by an inbound content update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentTarget {
    /// Script manager entry.
    Virtual(ScriptUri),
    /// File on disk.
    File(PathBuf),
}

impl ContentTarget {
    /// Classifies the `script_path` of a content update.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedScheme`] for anything but `c4dfs` and
    /// `file:/` paths, [`Error::Url`] for a malformed `c4dfs` URI.
    pub fn from_script_path(script_path: &str, platform: Platform) -> Result<Self> {
        if script_path.starts_with("c4dfs") {
            return ScriptUri::parse(script_path).map(Self::Virtual);
        }

        if let Some(rest) = script_path.strip_prefix("file:")
            && rest.starts_with('/')
        {
            let rooted = format!("/{}", rest.trim_start_matches('/'));
            return Ok(Self::File(PathBuf::from(normalize_path_for(
                platform, &rooted,
            ))));
        }

        Err(Error::unsupported_scheme(script_path, "c4dfs or file"))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_posix_is_identity() {
        assert_eq!(normalize_path_for(Platform::Posix, "/c:/foo"), "/c:/foo");
        assert_eq!(normalize_path_for(Platform::Posix, "/home/a.py"), "/home/a.py");
    }

    #[test]
    fn test_windows_strips_slash_and_uppercases_drive() {
        assert_eq!(normalize_path_for(Platform::Windows, "/c:/foo"), "C:/foo");
        assert_eq!(normalize_path_for(Platform::Windows, "C:\\foo"), "C:\\foo");
        assert_eq!(normalize_path_for(Platform::Windows, "/c:\\foo"), "C:\\foo");
        assert_eq!(normalize_path_for(Platform::Windows, "/share/x"), "share/x");
    }

    #[test]
    fn test_parse_file_uri_decodes_path() {
        let uri = ScriptUri::parse("file:///c%3A/My%20Scripts/a.py").unwrap();
        assert_eq!(uri.scheme(), &Scheme::File);
        assert_eq!(uri.path(), "/c:/My Scripts/a.py");
    }

    #[test]
    fn test_parse_virtual_and_untitled() {
        let uri = ScriptUri::parse("c4dfs:/scripts/cube.py").unwrap();
        assert_eq!(uri.scheme(), &Scheme::Virtual);
        assert_eq!(uri.path(), "/scripts/cube.py");

        let uri = ScriptUri::parse("untitled:Untitled-1").unwrap();
        assert_eq!(uri.scheme(), &Scheme::Untitled);
        assert_eq!(uri.path(), "Untitled-1");
    }

    #[test]
    fn test_file_constructor_roots_windows_paths() {
        let uri = ScriptUri::file("C:\\scripts\\a.py");
        assert_eq!(uri.path(), "/C:/scripts/a.py");
        assert_eq!(uri.to_string(), "file:///C:/scripts/a.py");
    }

    #[test]
    fn test_query_path_encodings() {
        let virt = ScriptUri::virtual_script("/scripts/a.py");
        assert_eq!(virt.query_path(Platform::Posix), "c4dfs:///scripts/a.py");

        let file = ScriptUri::file("/c:/x/a.py");
        assert_eq!(file.query_path(Platform::Windows), "file:///C:/x/a.py");
    }

    #[test]
    fn test_document_path_encodings() {
        let untitled = ScriptUri::untitled("Untitled-1");
        assert_eq!(
            untitled.document_path(Platform::Posix).unwrap(),
            "untitled://Untitled-1"
        );

        let virt = ScriptUri::virtual_script("/scripts/a.py");
        assert_eq!(virt.document_path(Platform::Posix).unwrap(), "c4dfs:/scripts/a.py");

        let other = ScriptUri::with_scheme("git", "/a.py");
        assert!(matches!(
            other.document_path(Platform::Posix),
            Err(Error::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn test_push_path_rejects_ftp_and_untitled() {
        let ftp = ScriptUri::parse("ftp://example.com/a.py").unwrap();
        assert!(matches!(
            ftp.push_path(Platform::Posix),
            Err(Error::UnsupportedScheme { ref scheme, .. }) if scheme == "ftp"
        ));
        assert!(ScriptUri::untitled("x").push_path(Platform::Posix).is_err());
    }

    #[test]
    fn test_content_target_classification() {
        let target = ContentTarget::from_script_path("c4dfs:/scripts/a.py", Platform::Posix);
        assert_eq!(
            target.unwrap(),
            ContentTarget::Virtual(ScriptUri::virtual_script("/scripts/a.py"))
        );

        let target = ContentTarget::from_script_path("file:///home/u/a.py", Platform::Posix);
        assert_eq!(target.unwrap(), ContentTarget::File(PathBuf::from("/home/u/a.py")));

        let target = ContentTarget::from_script_path("file:///c:/a.py", Platform::Windows);
        assert_eq!(target.unwrap(), ContentTarget::File(PathBuf::from("C:/a.py")));

        assert!(ContentTarget::from_script_path("untitled://x", Platform::Posix).is_err());
    }

    proptest! {
        #[test]
        fn prop_windows_leading_slash_is_irrelevant(
            drive in "[a-zA-Z]",
            rest in "[a-zA-Z0-9_\\\\/ .]{0,24}",
        ) {
            let bare = format!("{drive}:{rest}");
            let slashed = format!("/{bare}");
            let expected = format!("{}:{rest}", drive.to_ascii_uppercase());

            prop_assert_eq!(normalize_path_for(Platform::Windows, &bare), expected.clone());
            prop_assert_eq!(normalize_path_for(Platform::Windows, &slashed), expected);
        }

        #[test]
        fn prop_normalization_is_idempotent(path in "/?[a-zA-Z]:?[a-zA-Z0-9_/]{0,24}") {
            for platform in [Platform::Windows, Platform::Posix] {
                let once = normalize_path_for(platform, &path);
                prop_assert_eq!(normalize_path_for(platform, &once), once.clone());
            }
        }
    }
}
