use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use super::copy::{copy_file, verify_copy};
use super::mapping_store::MappingStore;
use super::naming::bare_name;
use super::types::{CopyOptions, ExportOutcome};
use crate::config::MirrorPaths;
use crate::error::{MirrorError, Result};
use crate::host::{DestinationChooser, SaveDialogOptions};

/// "Save as and remove": writes a mirrored file out to a chosen location and
/// deletes the mirrored copy.
///
/// The mapping row is left alone. The reconciler drops it once it sees the
/// mirrored file is gone.
#[derive(Debug, Clone)]
pub struct ExportService {
    store: MappingStore,
    mirror_dir: PathBuf,
    options: CopyOptions,
}

impl ExportService {
    pub fn new(paths: &MirrorPaths, options: CopyOptions) -> Self {
        Self {
            store: MappingStore::new(&paths.mapping_file),
            mirror_dir: paths.mirror_dir.clone(),
            options,
        }
    }

    /// Original path recorded for the mirrored file at `mirrored_path`.
    pub async fn lookup_original(&self, mirrored_path: &Path) -> Result<(String, String)> {
        let mirrored_name = bare_name(mirrored_path).ok_or_else(|| {
            MirrorError::InvalidPath(format!("{mirrored_path:?} has no file name"))
        })?;

        let not_tracked = || MirrorError::NotTracked {
            mirrored_name: mirrored_name.clone(),
        };
        let table = self.store.load_existing().await?.ok_or_else(not_tracked)?;
        let original = table
            .find_original(&mirrored_name)
            .ok_or_else(not_tracked)?
            .to_string();

        Ok((original, mirrored_name))
    }

    pub async fn export_and_remove(
        &self,
        mirrored_path: &Path,
        chooser: &dyn DestinationChooser,
    ) -> Result<ExportOutcome> {
        let (original_path, mirrored_name) = self.lookup_original(mirrored_path).await?;

        let choice = chooser
            .show_save_dialog(SaveDialogOptions::markdown(&original_path))
            .await
            .map_err(|e| MirrorError::Chooser(e.to_string()))?;
        let Some(destination) = choice.destination() else {
            debug!("Save dialog for {} was dismissed", mirrored_name);
            return Ok(ExportOutcome::Cancelled);
        };

        let source = self.mirror_dir.join(&mirrored_name);
        if same_file(&source, &destination).await {
            return Err(MirrorError::InvalidPath(format!(
                "{destination:?} is the mirrored copy itself"
            )));
        }

        let bytes_copied = copy_file(&source, &destination, &self.options).await?;
        if self.options.verify_after_copy {
            verify_copy(&source, &destination).await?;
        }

        fs::remove_file(&source)
            .await
            .map_err(|e| MirrorError::io("delete", &source, e))?;

        info!(
            "Saved {} to {:?} and removed the mirrored copy",
            mirrored_name, destination
        );
        Ok(ExportOutcome::Exported {
            original_path,
            destination,
            bytes_copied,
        })
    }
}

async fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a).await, fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MirrorConfig;
    use crate::host::{CancelChooser, FixedDestination, SaveDialogResult};
    use crate::mirror_engine::reconciler::Reconciler;
    use crate::mirror_engine::types::MappingTable;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    const ORIGINAL: &str = "/home/u/notes/report.md";
    const MIRRORED: &str = "report-EXTFILE-20240301101530.md";

    async fn setup() -> (TempDir, MirrorPaths, ExportService) {
        let dir = TempDir::new().unwrap();
        let paths = MirrorConfig::for_vault(dir.path().join("vault")).resolve_paths();
        std::fs::create_dir_all(&paths.mirror_dir).unwrap();
        std::fs::write(paths.mirrored_file(MIRRORED), "# edited in vault\n").unwrap();

        let mut table = MappingTable::new();
        table.insert(ORIGINAL, MIRRORED);
        MappingStore::new(&paths.mapping_file).save(&table).await.unwrap();

        let service = ExportService::new(&paths, CopyOptions::default());
        (dir, paths, service)
    }

    /// Records what it was asked, then answers with a fixed destination.
    struct RecordingChooser {
        seen: Mutex<Vec<SaveDialogOptions>>,
        answer: PathBuf,
    }

    #[async_trait]
    impl DestinationChooser for RecordingChooser {
        async fn show_save_dialog(
            &self,
            options: SaveDialogOptions,
        ) -> anyhow::Result<SaveDialogResult> {
            self.seen.lock().unwrap().push(options);
            Ok(SaveDialogResult::chosen(self.answer.clone()))
        }
    }

    struct BrokenChooser;

    #[async_trait]
    impl DestinationChooser for BrokenChooser {
        async fn show_save_dialog(
            &self,
            _options: SaveDialogOptions,
        ) -> anyhow::Result<SaveDialogResult> {
            anyhow::bail!("dialog backend unavailable")
        }
    }

    #[tokio::test]
    async fn test_export_copies_then_removes() -> Result<()> {
        let (dir, paths, service) = setup().await;
        let destination = dir.path().join("out/report.md");
        let chooser = RecordingChooser {
            seen: Mutex::new(Vec::new()),
            answer: destination.clone(),
        };

        let outcome = service
            .export_and_remove(&paths.mirrored_file(MIRRORED), &chooser)
            .await?;

        assert_eq!(
            outcome,
            ExportOutcome::Exported {
                original_path: ORIGINAL.to_string(),
                destination: destination.clone(),
                bytes_copied: 18,
            }
        );
        assert_eq!(std::fs::read(&destination).unwrap(), b"# edited in vault\n");
        assert!(!paths.mirrored_file(MIRRORED).exists());

        let seen = chooser.seen.lock().unwrap();
        assert_eq!(seen[0].default_path, PathBuf::from(ORIGINAL));
        assert_eq!(seen[0].allowed_extensions, vec!["md".to_string()]);

        // The row outlives the file until the next reconcile pass.
        let store = MappingStore::new(&paths.mapping_file);
        assert!(store.load().await?.contains(ORIGINAL));
        Reconciler::new(&paths).reconcile().await?;
        assert!(!store.load().await?.contains(ORIGINAL));
        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_export_changes_nothing() -> Result<()> {
        let (_dir, paths, service) = setup().await;
        let before = std::fs::read_to_string(&paths.mapping_file).unwrap();

        let outcome = service
            .export_and_remove(&paths.mirrored_file(MIRRORED), &CancelChooser)
            .await?;

        assert_eq!(outcome, ExportOutcome::Cancelled);
        assert!(paths.mirrored_file(MIRRORED).exists());
        assert_eq!(std::fs::read_to_string(&paths.mapping_file).unwrap(), before);
        Ok(())
    }

    #[tokio::test]
    async fn test_untracked_file_is_rejected() {
        let (dir, paths, service) = setup().await;
        std::fs::write(paths.mirrored_file("stray.md"), "x").unwrap();

        let err = service
            .export_and_remove(
                &paths.mirrored_file("stray.md"),
                &FixedDestination(dir.path().join("out.md")),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, MirrorError::NotTracked { .. }));
        assert!(paths.mirrored_file("stray.md").exists());
        assert!(!dir.path().join("out.md").exists());
    }

    #[tokio::test]
    async fn test_missing_mapping_file_is_not_tracked() {
        let (dir, paths, service) = setup().await;
        std::fs::remove_file(&paths.mapping_file).unwrap();

        let err = service
            .export_and_remove(
                &paths.mirrored_file(MIRRORED),
                &FixedDestination(dir.path().join("out.md")),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, MirrorError::NotTracked { .. }));
    }

    #[tokio::test]
    async fn test_chooser_failure_is_reported() {
        let (_dir, paths, service) = setup().await;

        let err = service
            .export_and_remove(&paths.mirrored_file(MIRRORED), &BrokenChooser)
            .await
            .unwrap_err();

        assert!(matches!(err, MirrorError::Chooser(ref m) if m.contains("unavailable")));
        assert!(paths.mirrored_file(MIRRORED).exists());
    }

    #[tokio::test]
    async fn test_refuses_to_overwrite_mirror_with_itself() {
        let (_dir, paths, service) = setup().await;

        let err = service
            .export_and_remove(
                &paths.mirrored_file(MIRRORED),
                &FixedDestination(paths.mirrored_file(MIRRORED)),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, MirrorError::InvalidPath(_)));
        assert!(paths.mirrored_file(MIRRORED).exists());
    }
}
