use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{info, warn};

use super::export::ExportService;
use super::ingest::{local_clock, Clock, IngestionService};
use super::mapping_store::MappingStore;
use super::reconciler::Reconciler;
use super::types::{ExportOutcome, IngestResult, MirrorEntry, ReconcileReport, VisibilityState};
use crate::config::{MirrorConfig, MirrorPaths};
use crate::error::{MirrorError, Result};
use crate::host::{DestinationChooser, HostWorkspace};
use crate::visibility::VisibilityMarker;

/// All engine components wired to one set of resolved paths.
pub struct MirrorEngine {
    paths: MirrorPaths,
    store: MappingStore,
    reconciler: Reconciler,
    ingestion: IngestionService,
    export: ExportService,
    visibility: VisibilityMarker,
}

impl MirrorEngine {
    pub fn new(config: &MirrorConfig, workspace: Arc<dyn HostWorkspace>) -> Self {
        Self::with_clock(config, workspace, local_clock())
    }

    pub fn with_clock(
        config: &MirrorConfig,
        workspace: Arc<dyn HostWorkspace>,
        clock: Clock,
    ) -> Self {
        let paths = config.resolve_paths();
        Self {
            store: MappingStore::new(&paths.mapping_file),
            reconciler: Reconciler::new(&paths),
            ingestion: IngestionService::with_clock(&paths, config.copy.clone(), clock),
            export: ExportService::new(&paths, config.copy.clone()),
            visibility: VisibilityMarker::new(&paths, workspace),
            paths,
        }
    }

    pub fn paths(&self) -> &MirrorPaths {
        &self.paths
    }

    /// First-run setup: mirror folder, empty mapping file and stylesheet, then
    /// one visibility pass.
    pub async fn bootstrap(&self) -> Result<VisibilityState> {
        fs::create_dir_all(&self.paths.mirror_dir)
            .await
            .map_err(|e| MirrorError::io("create directory", &self.paths.mirror_dir, e))?;
        if self.store.ensure_exists().await? {
            info!("Created empty mapping file at {:?}", self.store.path());
        }
        self.visibility.ensure_stylesheet_exists().await?;
        self.visibility.refresh().await
    }

    pub async fn ingest(&self, external_path: &Path) -> Result<IngestResult> {
        let result = self.ingestion.ingest(external_path).await?;
        if matches!(result, IngestResult::Ingested(_)) {
            if let Err(e) = self.visibility.refresh().await {
                warn!("Failed to refresh folder visibility: {}", e);
            }
        }
        Ok(result)
    }

    pub async fn export_and_remove(
        &self,
        mirrored_path: &Path,
        chooser: &dyn DestinationChooser,
    ) -> Result<ExportOutcome> {
        self.export.export_and_remove(mirrored_path, chooser).await
    }

    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        self.reconciler.reconcile().await
    }

    pub async fn refresh_visibility(&self) -> Result<VisibilityState> {
        self.visibility.refresh().await
    }

    pub async fn visibility(&self) -> Result<VisibilityState> {
        self.visibility.compute().await
    }

    /// Folder change handling: visibility first, then reconcile. Failures are
    /// logged and left for the next pass.
    pub async fn handle_folder_change(&self) {
        if let Err(e) = self.visibility.refresh().await {
            warn!("Failed to refresh folder visibility: {}", e);
        }
        if let Err(e) = self.reconciler.reconcile().await {
            warn!("Reconcile after folder change failed: {}", e);
        }
    }

    pub async fn entries(&self) -> Result<Vec<MirrorEntry>> {
        Ok(self.store.load().await?.entries().collect())
    }
}
