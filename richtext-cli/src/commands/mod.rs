mod annotate;
mod convert;
mod validate;

pub use annotate::*;
pub use convert::*;
pub use validate::*;

use anyhow::{Context, Result};
use doc_model::DocumentTree;
use edit_engine::{EditorSettings, SettingsManager};
use std::path::Path;

pub(crate) fn read_snapshot(path: &Path) -> Result<DocumentTree> {
    let json = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    DocumentTree::from_json(&json).with_context(|| format!("Failed to load snapshot {}", path.display()))
}

/// Print to stdout, or write `content` to `output` when given
pub(crate) fn emit(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::debug!("Wrote {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

/// Settings from `config_dir`, defaults without one
pub fn load_settings(config_dir: Option<&Path>) -> Result<EditorSettings> {
    let Some(dir) = config_dir else {
        return Ok(EditorSettings::default());
    };
    let mut manager = SettingsManager::new(dir);
    let settings = manager.load_sync().context("Failed to load settings")?;
    Ok(settings.clone())
}
