use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One mapping row: where a mirrored file originally came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MirrorEntry {
    pub original_path: String,
    pub mirrored_name: String,
}

/// Original path -> mirrored file name, in insertion order.
///
/// Serialized as a plain JSON object so the file stays human-diffable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct MappingTable {
    rows: IndexMap<String, String>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, original_path: &str) -> bool {
        self.rows.contains_key(original_path)
    }

    pub fn get(&self, original_path: &str) -> Option<&str> {
        self.rows.get(original_path).map(String::as_str)
    }

    /// Reverse lookup by mirrored file name. First match in insertion order wins.
    pub fn find_original(&self, mirrored_name: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|(_, name)| name.as_str() == mirrored_name)
            .map(|(original, _)| original.as_str())
    }

    pub fn insert(&mut self, original_path: impl Into<String>, mirrored_name: impl Into<String>) {
        self.rows.insert(original_path.into(), mirrored_name.into());
    }

    /// Keeps rows for which `keep` returns true and returns the removed rows.
    pub fn retain_rows(&mut self, mut keep: impl FnMut(&str, &str) -> bool) -> Vec<MirrorEntry> {
        let mut removed = Vec::new();
        self.rows.retain(|original, name| {
            if keep(original, name) {
                true
            } else {
                removed.push(MirrorEntry {
                    original_path: original.clone(),
                    mirrored_name: name.clone(),
                });
                false
            }
        });
        removed
    }

    pub fn entries(&self) -> impl Iterator<Item = MirrorEntry> + '_ {
        self.rows.iter().map(|(original, name)| MirrorEntry {
            original_path: original.clone(),
            mirrored_name: name.clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum IngestResult {
    /// The external path already had a row; nothing was copied.
    AlreadyTracked(String),
    Ingested(String),
}

impl IngestResult {
    pub fn mirrored_name(&self) -> &str {
        match self {
            Self::AlreadyTracked(name) | Self::Ingested(name) => name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The chooser was dismissed. Nothing changed.
    Cancelled,
    Exported {
        original_path: String,
        destination: PathBuf,
        bytes_copied: u64,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcileReport {
    pub removed: Vec<MirrorEntry>,
    pub remaining: usize,
}

impl ReconcileReport {
    pub fn changed(&self) -> bool {
        !self.removed.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VisibilityState {
    /// Mirror folder is empty; the folder entry is not shown at all.
    Hidden,
    /// Mirror folder has content; the folder and its files are shown faded.
    Dimmed,
}

impl VisibilityState {
    pub fn from_entry_count(count: usize) -> Self {
        if count == 0 {
            Self::Hidden
        } else {
            Self::Dimmed
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyOptions {
    pub preserve_permissions: bool,
    pub preserve_times: bool,
    /// Compare checksums after exporting, before the mirrored copy is deleted.
    pub verify_after_copy: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            preserve_permissions: false,
            preserve_times: false,
            verify_after_copy: true,
        }
    }
}
