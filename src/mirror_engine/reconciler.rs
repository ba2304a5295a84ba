use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio_stream::wrappers::ReadDirStream;
use tokio_stream::StreamExt;
use tracing::{debug, info};

use super::mapping_store::MappingStore;
use super::types::{MappingTable, MirrorEntry, ReconcileReport};
use crate::config::MirrorPaths;
use crate::error::{MirrorError, Result};

/// Drops mapping rows whose mirrored file is no longer in the mirror folder.
///
/// Each pass works on a freshly loaded table, so passes triggered by the
/// timer and by folder events may overlap without extra coordination.
#[derive(Debug, Clone)]
pub struct Reconciler {
    store: MappingStore,
    mirror_dir: PathBuf,
}

impl Reconciler {
    pub fn new(paths: &MirrorPaths) -> Self {
        Self {
            store: MappingStore::new(&paths.mapping_file),
            mirror_dir: paths.mirror_dir.clone(),
        }
    }

    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        let Some(mut table) = self.store.load_existing().await? else {
            debug!("No mapping file at {:?}, skipping reconcile", self.store.path());
            return Ok(ReconcileReport::default());
        };

        let present = list_mirror_names(&self.mirror_dir).await?;
        let removed = prune_stale(&mut table, &present);

        if !removed.is_empty() {
            self.store.save(&table).await?;
            for entry in &removed {
                info!(
                    "Dropped mapping {} -> {} (mirrored file is gone)",
                    entry.original_path, entry.mirrored_name
                );
            }
        }

        Ok(ReconcileReport {
            removed,
            remaining: table.len(),
        })
    }
}

/// Removes every row whose mirrored name is not in `present`.
pub fn prune_stale(table: &mut MappingTable, present: &HashSet<String>) -> Vec<MirrorEntry> {
    table.retain_rows(|_, mirrored_name| present.contains(mirrored_name))
}

/// Names of all entries directly inside `dir`.
pub async fn list_mirror_names(dir: &Path) -> Result<HashSet<String>> {
    let read_dir = fs::read_dir(dir)
        .await
        .map_err(|e| MirrorError::io("list", dir, e))?;
    let mut entries = ReadDirStream::new(read_dir);

    let mut names = HashSet::new();
    while let Some(entry) = entries.next().await {
        let entry = entry.map_err(|e| MirrorError::io("list", dir, e))?;
        names.insert(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}
