//! Editor settings management
//!
//! Settings live in a JSON file next to the host's other configuration. A
//! missing file means defaults; an unreadable one is logged and replaced by
//! defaults so the editor still starts.

use crate::Result;
use doc_model::AnnotationKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main editor settings container
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorSettings {
    pub floating_editor: FloatingEditorSettings,
    pub undo: UndoSettings,
    pub annotations: AnnotationSettings,
}

/// Placement of the floating annotation editor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FloatingEditorSettings {
    /// Distance in pixels between the selection and the floating editor
    pub vertical_offset: f32,
}

impl Default for FloatingEditorSettings {
    fn default() -> Self {
        Self { vertical_offset: 40.0 }
    }
}

/// Undo history limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UndoSettings {
    pub max_entries: usize,
    pub batch_threshold_ms: u64,
}

impl Default for UndoSettings {
    fn default() -> Self {
        Self {
            max_entries: 100,
            batch_threshold_ms: 500,
        }
    }
}

/// Which annotation features are switched on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AnnotationSettings {
    pub enabled: Vec<AnnotationKind>,
}

impl Default for AnnotationSettings {
    fn default() -> Self {
        Self {
            enabled: AnnotationKind::ALL.to_vec(),
        }
    }
}

impl AnnotationSettings {
    pub fn is_enabled(&self, kind: AnnotationKind) -> bool {
        self.enabled.contains(&kind)
    }
}

/// Settings manager for loading and saving editor settings
#[derive(Debug)]
pub struct SettingsManager {
    settings_path: PathBuf,
    current: EditorSettings,
}

impl SettingsManager {
    /// Create a manager for `settings.json` inside `config_dir`
    pub fn new(config_dir: impl AsRef<Path>) -> Self {
        Self::with_path(config_dir.as_ref().join("settings.json"))
    }

    /// Create a manager for an explicit settings file
    pub fn with_path(settings_path: PathBuf) -> Self {
        Self {
            settings_path,
            current: EditorSettings::default(),
        }
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Load settings from disk, or use defaults if the file doesn't exist
    pub fn load_sync(&mut self) -> Result<&EditorSettings> {
        if self.settings_path.exists() {
            let content = std::fs::read_to_string(&self.settings_path)?;
            match serde_json::from_str::<EditorSettings>(&content) {
                Ok(settings) => {
                    self.current = settings;
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse settings file {}, using defaults: {}",
                        self.settings_path.display(),
                        e
                    );
                    self.current = EditorSettings::default();
                }
            }
        } else {
            self.current = EditorSettings::default();
        }
        Ok(&self.current)
    }

    /// Save current settings to disk
    pub fn save_sync(&self) -> Result<()> {
        if let Some(parent) = self.settings_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.current)?;
        std::fs::write(&self.settings_path, content)?;
        Ok(())
    }

    pub fn get(&self) -> &EditorSettings {
        &self.current
    }

    /// Replace the settings and save them
    pub fn update_sync(&mut self, settings: EditorSettings) -> Result<()> {
        self.current = settings;
        self.save_sync()
    }

    /// Reset settings to defaults and save
    pub fn reset_sync(&mut self) -> Result<&EditorSettings> {
        self.current = EditorSettings::default();
        self.save_sync()?;
        Ok(&self.current)
    }
}
