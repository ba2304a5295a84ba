//! Runtime configuration for the mirror engine.
//!
//! A `MirrorConfig` is read once at startup (optionally from a YAML file) and
//! resolved into `MirrorPaths`, which every component receives by reference.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::error::{MirrorError, Result};
use crate::input_validation::validate_eligible_patterns;
use crate::mirror_engine::CopyOptions;

pub const DEFAULT_MIRROR_FOLDER: &str = "ExternalFile";
pub const DEFAULT_PLUGIN_ID: &str = "external-file";
pub const DEFAULT_RECONCILE_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Root of the host workspace. All relative paths below resolve against it.
    pub vault_root: PathBuf,
    pub mirror_folder: String,
    pub plugin_id: String,
    /// Defaults to `.obsidian/plugins/<plugin_id>/data.json`.
    pub mapping_file: Option<PathBuf>,
    /// Defaults to `.obsidian/snippets/hide-<mirror_folder>.css`.
    pub stylesheet: Option<PathBuf>,
    pub reconcile_interval_ms: u64,
    pub debounce_ms: u64,
    pub eligible_patterns: Vec<String>,
    pub copy: CopyOptions,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            vault_root: PathBuf::from("."),
            mirror_folder: DEFAULT_MIRROR_FOLDER.to_string(),
            plugin_id: DEFAULT_PLUGIN_ID.to_string(),
            mapping_file: None,
            stylesheet: None,
            reconcile_interval_ms: DEFAULT_RECONCILE_INTERVAL_MS,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            eligible_patterns: vec!["*.md".to_string()],
            copy: CopyOptions::default(),
        }
    }
}

impl MirrorConfig {
    pub fn for_vault(vault_root: impl Into<PathBuf>) -> Self {
        Self {
            vault_root: vault_root.into(),
            ..Self::default()
        }
    }

    /// Reads a YAML config file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| MirrorError::io("read config", path, e))?;
        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| MirrorError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.reconcile_interval_ms == 0 {
            return Err(MirrorError::Config(
                "reconcile_interval_ms must be greater than zero".to_string(),
            ));
        }

        let mut components = Path::new(&self.mirror_folder).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => {
                return Err(MirrorError::Config(format!(
                    "mirror_folder must be a single folder name, got '{}'",
                    self.mirror_folder
                )))
            }
        }

        validate_eligible_patterns(&self.eligible_patterns)
            .map_err(|e| MirrorError::Config(e.to_string()))?;

        Ok(())
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.reconcile_interval_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn resolve_paths(&self) -> MirrorPaths {
        let root = self.vault_root.clone();
        let mapping_file = self.mapping_file.clone().unwrap_or_else(|| {
            PathBuf::from(".obsidian")
                .join("plugins")
                .join(&self.plugin_id)
                .join("data.json")
        });
        let stylesheet = self.stylesheet.clone().unwrap_or_else(|| {
            PathBuf::from(".obsidian")
                .join("snippets")
                .join(format!("hide-{}.css", self.mirror_folder))
        });

        MirrorPaths {
            mirror_dir: root.join(&self.mirror_folder),
            mapping_file: root.join(mapping_file),
            stylesheet: root.join(stylesheet),
            folder_id: self.mirror_folder.clone(),
            vault_root: root,
        }
    }
}

/// Absolute locations derived from a `MirrorConfig`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorPaths {
    pub vault_root: PathBuf,
    pub mirror_dir: PathBuf,
    pub mapping_file: PathBuf,
    pub stylesheet: PathBuf,
    /// Folder identifier as the host sees it, relative to the vault root.
    pub folder_id: String,
}

impl MirrorPaths {
    pub fn mirrored_file(&self, mirrored_name: &str) -> PathBuf {
        self.mirror_dir.join(mirrored_name)
    }
}
