pub mod config;
pub mod error;
pub mod error_codes;
pub mod host;
pub mod input_validation;
pub mod logging;
pub mod mirror_engine;
pub mod path_validation;
pub mod visibility;
pub mod watcher;


use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use config::MirrorConfig;
use error::{MirrorError, Result};
use host::{DestinationChooser, HostWorkspace, Notifier};
use input_validation::EligibilityFilter;
use mirror_engine::{ExportOutcome, IngestResult, MirrorEngine};
use watcher::{MirrorObserver, ObserverOptions};

pub const NOTICE_SAVED_AND_REMOVED: &str = "File saved and removed";
pub const NOTICE_ORIGINAL_NOT_FOUND: &str = "Original file path not found";

/// What happened to each path handed over by the drop target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DropSummary {
    pub ingested: Vec<String>,
    pub already_tracked: Vec<String>,
    /// Paths that did not match the eligibility patterns.
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

/// The plugin as the host sees it: load/unload plus the two user actions.
///
/// Every failure inside an action ends up as a notice; nothing escapes to the
/// host.
pub struct MirrorApp {
    config: MirrorConfig,
    engine: Arc<MirrorEngine>,
    notifier: Arc<dyn Notifier>,
    filter: EligibilityFilter,
    observer: Option<MirrorObserver>,
}

impl MirrorApp {
    pub fn new(
        config: MirrorConfig,
        workspace: Arc<dyn HostWorkspace>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let engine = Arc::new(MirrorEngine::new(&config, workspace));
        Self::with_engine(config, engine, notifier)
    }

    pub fn with_engine(
        config: MirrorConfig,
        engine: Arc<MirrorEngine>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        config.validate()?;
        let filter = EligibilityFilter::new(&config.eligible_patterns)
            .map_err(|e| MirrorError::Config(e.to_string()))?;

        Ok(Self {
            config,
            engine,
            notifier,
            filter,
            observer: None,
        })
    }

    pub fn engine(&self) -> &Arc<MirrorEngine> {
        &self.engine
    }

    pub fn is_watching(&self) -> bool {
        self.observer.as_ref().is_some_and(MirrorObserver::is_running)
    }

    /// Bootstraps the on-disk layout and starts watching the mirror folder.
    pub async fn load(&mut self) -> Result<()> {
        let state = self.engine.bootstrap().await?;
        info!(
            "Mirror folder {:?} ready, visibility {:?}",
            self.engine.paths().mirror_dir,
            state
        );

        let observer = MirrorObserver::start(
            &self.engine.paths().mirror_dir,
            self.engine.clone(),
            ObserverOptions {
                interval: self.config.reconcile_interval(),
                debounce: self.config.debounce(),
            },
        )?;
        self.observer = Some(observer);
        Ok(())
    }

    pub async fn unload(&mut self) {
        if let Some(observer) = self.observer.take() {
            observer.stop().await;
            info!("Stopped watching {:?}", self.engine.paths().mirror_dir);
        }
    }

    /// Host layout changed; the folder tree may have been re-rendered.
    pub async fn on_layout_change(&self) {
        if let Err(e) = self.engine.refresh_visibility().await {
            warn!("Failed to refresh folder visibility: {}", e);
        }
    }

    /// "External File Command": ingest every eligible dropped file, in order.
    pub async fn handle_files_drop(&self, paths: &[PathBuf]) -> DropSummary {
        let mut summary = DropSummary::default();

        for path in paths {
            if !self.filter.is_eligible(path) {
                summary.skipped.push(path.clone());
                continue;
            }
            match self.handle_file_drop(path).await {
                Ok(IngestResult::Ingested(name)) => summary.ingested.push(name),
                Ok(IngestResult::AlreadyTracked(name)) => summary.already_tracked.push(name),
                Err(e) => summary.failed.push((path.clone(), e.to_string())),
            }
        }

        summary
    }

    async fn handle_file_drop(&self, path: &Path) -> Result<IngestResult> {
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let result = match path_validation::verify_regular_file(path) {
            Ok(()) => self.engine.ingest(path).await,
            Err(msg) => Err(MirrorError::InvalidPath(msg)),
        };

        match &result {
            Ok(IngestResult::AlreadyTracked(_)) => {
                self.notifier.notify(&format!("{display_name} already added"));
            }
            Ok(IngestResult::Ingested(_)) => {}
            Err(e) => {
                warn!("Failed to add {:?} [{}]: {}", path, e.code(), e);
                self.notifier
                    .notify(&format!("Error adding {display_name}: {e}"));
            }
        }
        result
    }

    /// Whether "Save As" should be offered for the file the host shows at
    /// `vault_relative`.
    pub fn save_as_available(&self, vault_relative: &str) -> bool {
        path_validation::save_as_available(vault_relative, &self.engine.paths().folder_id)
    }

    /// "Save As": export the mirrored file at `vault_relative` and delete it.
    ///
    /// Returns `None` when the action failed; the user has already been told why.
    pub async fn handle_save_as(
        &self,
        vault_relative: &str,
        chooser: &dyn DestinationChooser,
    ) -> Option<ExportOutcome> {
        let result = match path_validation::validate_path(vault_relative) {
            Ok(()) if !self.save_as_available(vault_relative) => Err(MirrorError::InvalidPath(
                format!(
                    "{vault_relative} is not a markdown file inside {}/",
                    self.engine.paths().folder_id
                ),
            )),
            Ok(()) => {
                let mirrored_path = self.engine.paths().vault_root.join(vault_relative);
                self.engine.export_and_remove(&mirrored_path, chooser).await
            }
            Err(msg) => Err(MirrorError::InvalidPath(msg)),
        };

        match result {
            Ok(ExportOutcome::Cancelled) => Some(ExportOutcome::Cancelled),
            Ok(outcome) => {
                self.notifier.notify(NOTICE_SAVED_AND_REMOVED);
                Some(outcome)
            }
            Err(MirrorError::NotTracked { mirrored_name }) => {
                warn!("No mapping row for {}", mirrored_name);
                self.notifier.notify(NOTICE_ORIGINAL_NOT_FOUND);
                None
            }
            Err(e) => {
                warn!("Save as failed for {} [{}]: {}", vault_relative, e.code(), e);
                self.notifier.notify(&format!("Error saving file: {e}"));
                None
            }
        }
    }
}
