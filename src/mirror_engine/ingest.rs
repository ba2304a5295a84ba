use chrono::{Local, NaiveDateTime};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{info, warn};

use super::copy::copy_file;
use super::mapping_store::MappingStore;
use super::naming::{mirror_file_name, with_attempt};
use super::types::{CopyOptions, IngestResult, MappingTable};
use crate::config::MirrorPaths;
use crate::error::{MirrorError, Result};

const MAX_NAME_ATTEMPTS: u32 = 100;

/// Source of "now" for mirror file names.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

pub fn local_clock() -> Clock {
    Arc::new(|| Local::now().naive_local())
}

/// Copies external files into the mirror folder and records where they came from.
#[derive(Clone)]
pub struct IngestionService {
    store: MappingStore,
    mirror_dir: PathBuf,
    options: CopyOptions,
    clock: Clock,
}

impl IngestionService {
    pub fn with_clock(paths: &MirrorPaths, options: CopyOptions, clock: Clock) -> Self {
        Self {
            store: MappingStore::new(&paths.mapping_file),
            mirror_dir: paths.mirror_dir.clone(),
            options,
            clock,
        }
    }

    /// Mirrors `external_path` unless it is already tracked.
    ///
    /// The copy lands before the row is persisted. A reconcile pass running in
    /// between then never sees a row without its file. If persisting the row
    /// fails the fresh copy is removed again.
    pub async fn ingest(&self, external_path: &Path) -> Result<IngestResult> {
        let external_path = std::path::absolute(external_path)
            .map_err(|e| MirrorError::io("resolve", external_path, e))?;
        let key = external_path
            .to_str()
            .ok_or_else(|| {
                MirrorError::InvalidPath(format!("{external_path:?} is not valid UTF-8"))
            })?
            .to_string();

        let mut table = self.store.load().await?;
        if let Some(existing) = table.get(&key) {
            info!("{} is already mirrored as {}", key, existing);
            return Ok(IngestResult::AlreadyTracked(existing.to_string()));
        }

        let base_name = mirror_file_name(&external_path, (self.clock)());
        let (mirrored_name, target) = self.claim_name(&table, &base_name).await?;
        let bytes = match copy_file(&external_path, &target, &self.options).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.discard(&target).await;
                return Err(e);
            }
        };

        table.insert(key.clone(), mirrored_name.clone());
        if let Err(e) = self.store.save(&table).await {
            self.discard(&target).await;
            return Err(e);
        }

        info!("Mirrored {} -> {} ({} bytes)", key, mirrored_name, bytes);
        Ok(IngestResult::Ingested(mirrored_name))
    }

    /// Reserves a mirrored name that no row uses and no file occupies.
    ///
    /// The reservation is an empty file created with `create_new`, so a name
    /// taken by a concurrent ingest moves on to the next attempt.
    async fn claim_name(&self, table: &MappingTable, base_name: &str) -> Result<(String, PathBuf)> {
        fs::create_dir_all(&self.mirror_dir)
            .await
            .map_err(|e| MirrorError::io("create directory", &self.mirror_dir, e))?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = with_attempt(base_name, attempt);
            if table.find_original(&name).is_some() {
                continue;
            }
            let target = self.mirror_dir.join(&name);
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&target)
                .await
            {
                Ok(_) => return Ok((name, target)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(MirrorError::io("create", &target, e)),
            }
        }

        Err(MirrorError::InvalidPath(format!(
            "no free mirrored name for {base_name} after {MAX_NAME_ATTEMPTS} attempts"
        )))
    }

    async fn discard(&self, target: &Path) {
        if let Err(e) = fs::remove_file(target).await {
            warn!("Could not remove unrecorded copy {:?}: {}", target, e);
        }
    }
}
