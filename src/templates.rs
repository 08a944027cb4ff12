//! Python script templates.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::host::ScriptDocument;
use crate::paths::ScriptUri;

/// Name of the template directory shipped next to the editor integration.
pub const BUNDLED_TEMPLATE_DIR: &str = "script_template";

/// A template file offered for selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateItem {
    /// File name shown to the user.
    pub label: String,
    /// Full path of the template.
    pub path: PathBuf,
}

impl TemplateItem {
    /// Creates an item labelled with the file name of `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { label, path }
    }
}

/// Picks the template directory to list.
///
/// Uses `configured` when it exists, otherwise `<bundle_root>/script_template`.
///
/// # Errors
///
/// Returns [`Error::Template`] if neither directory exists.
pub async fn resolve_template_dir(configured: Option<&Path>, bundle_root: &Path) -> Result<PathBuf> {
    if let Some(dir) = configured
        && tokio::fs::try_exists(dir).await.unwrap_or(false)
    {
        return Ok(dir.to_path_buf());
    }

    let bundled = bundle_root.join(BUNDLED_TEMPLATE_DIR);
    if tokio::fs::try_exists(&bundled).await.unwrap_or(false) {
        debug!(dir = %bundled.display(), "Using bundled templates");
        return Ok(bundled);
    }

    Err(Error::template("Can't compute script template."))
}

/// Lists the `.py` files of `dir`, sorted by label.
///
/// # Errors
///
/// - [`Error::Io`] if the directory cannot be read
/// - [`Error::Template`] if it holds no Python file
pub async fn list_templates(dir: &Path) -> Result<Vec<TemplateItem>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut items = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_python = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().ends_with(".py"));
        if is_python && entry.file_type().await?.is_file() {
            items.push(TemplateItem::new(path));
        }
    }

    if items.is_empty() {
        return Err(Error::template(format!(
            "No python template found in {}",
            dir.display()
        )));
    }

    items.sort_by(|a, b| a.label.cmp(&b.label));
    debug!(dir = %dir.display(), count = items.len(), "Templates listed");
    Ok(items)
}

/// Opens a template as a new untitled document.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read.
pub async fn load_template(item: &TemplateItem) -> Result<ScriptDocument> {
    let text = tokio::fs::read_to_string(&item.path).await?;
    Ok(ScriptDocument::new(ScriptUri::untitled(&item.label), text).dirty())
}
