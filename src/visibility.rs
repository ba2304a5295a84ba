//! Folder visibility marker.
//!
//! The host shows the mirror folder faded while it has content and hides it
//! entirely when it is empty. The state is materialized as a small stylesheet
//! that is rewritten on every recompute.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

use crate::config::MirrorPaths;
use crate::error::{MirrorError, Result};
use crate::host::HostWorkspace;
use crate::mirror_engine::reconciler::list_mirror_names;
use crate::mirror_engine::VisibilityState;

const DIMMED_OPACITY: &str = "0.35";

/// Stylesheet content for `state`, keyed by the folder's vault-relative id.
pub fn stylesheet_for(state: VisibilityState, folder_id: &str) -> String {
    match state {
        VisibilityState::Hidden => format!(
            "\n.nav-folder-title[data-path=\"{folder_id}\"] {{ display: none; }}\n"
        ),
        VisibilityState::Dimmed => format!(
            "\n.nav-folder-title[data-path=\"{folder_id}\"] {{ opacity: {DIMMED_OPACITY}; }}\n\
             .nav-file-title[data-path^=\"{folder_id}/\"] {{ opacity: {DIMMED_OPACITY}; }}\n"
        ),
    }
}

pub struct VisibilityMarker {
    mirror_dir: PathBuf,
    stylesheet: PathBuf,
    folder_id: String,
    workspace: Arc<dyn HostWorkspace>,
}

impl VisibilityMarker {
    pub fn new(paths: &MirrorPaths, workspace: Arc<dyn HostWorkspace>) -> Self {
        Self {
            mirror_dir: paths.mirror_dir.clone(),
            stylesheet: paths.stylesheet.clone(),
            folder_id: paths.folder_id.clone(),
            workspace,
        }
    }

    /// Hidden iff the mirror folder has no entries. A missing folder counts as empty.
    pub async fn compute(&self) -> Result<VisibilityState> {
        match list_mirror_names(&self.mirror_dir).await {
            Ok(names) => Ok(VisibilityState::from_entry_count(names.len())),
            Err(e) if e.is_not_found() => Ok(VisibilityState::Hidden),
            Err(e) => Err(e),
        }
    }

    /// Recomputes the state, rewrites the stylesheet and notifies the host.
    pub async fn refresh(&self) -> Result<VisibilityState> {
        let state = self.compute().await?;
        self.write_stylesheet(&stylesheet_for(state, &self.folder_id))
            .await?;
        self.workspace.trigger_style_change();
        debug!("Mirror folder visibility is now {:?}", state);
        Ok(state)
    }

    /// Creates an empty stylesheet if none exists yet.
    pub async fn ensure_stylesheet_exists(&self) -> Result<()> {
        if fs::try_exists(&self.stylesheet).await.unwrap_or(false) {
            return Ok(());
        }
        self.write_stylesheet("").await
    }

    async fn write_stylesheet(&self, content: &str) -> Result<()> {
        if let Some(parent) = self.stylesheet.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| MirrorError::io("create directory", parent, e))?;
        }
        fs::write(&self.stylesheet, content)
            .await
            .map_err(|e| MirrorError::io("write stylesheet", &self.stylesheet, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MirrorConfig;
    use crate::host::HeadlessWorkspace;
    use tempfile::TempDir;

    fn setup() -> (TempDir, MirrorPaths, Arc<HeadlessWorkspace>, VisibilityMarker) {
        let dir = TempDir::new().unwrap();
        let paths = MirrorConfig::for_vault(dir.path()).resolve_paths();
        let workspace = Arc::new(HeadlessWorkspace::default());
        let marker = VisibilityMarker::new(&paths, workspace.clone());
        (dir, paths, workspace, marker)
    }

    #[test]
    fn test_stylesheet_content() {
        let hidden = stylesheet_for(VisibilityState::Hidden, "ExternalFile");
        assert!(hidden.contains(".nav-folder-title[data-path=\"ExternalFile\"] { display: none; }"));
        assert!(!hidden.contains("opacity"));

        let dimmed = stylesheet_for(VisibilityState::Dimmed, "ExternalFile");
        assert!(dimmed.contains(".nav-folder-title[data-path=\"ExternalFile\"] { opacity: 0.35; }"));
        assert!(dimmed.contains(".nav-file-title[data-path^=\"ExternalFile/\"] { opacity: 0.35; }"));
        assert!(!dimmed.contains("display: none"));
    }

    #[tokio::test]
    async fn test_refresh_tracks_folder_contents() -> Result<()> {
        let (_dir, paths, workspace, marker) = setup();
        std::fs::create_dir_all(&paths.mirror_dir).unwrap();

        assert_eq!(marker.refresh().await?, VisibilityState::Hidden);
        assert!(std::fs::read_to_string(&paths.stylesheet)
            .unwrap()
            .contains("display: none"));

        std::fs::write(paths.mirrored_file("a-EXTFILE-20240301101530.md"), "a").unwrap();
        assert_eq!(marker.refresh().await?, VisibilityState::Dimmed);
        assert!(std::fs::read_to_string(&paths.stylesheet)
            .unwrap()
            .contains("opacity"));

        std::fs::remove_file(paths.mirrored_file("a-EXTFILE-20240301101530.md")).unwrap();
        assert_eq!(marker.refresh().await?, VisibilityState::Hidden);

        assert_eq!(workspace.style_changes(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_folder_is_hidden() -> Result<()> {
        let (_dir, _paths, _workspace, marker) = setup();
        assert_eq!(marker.compute().await?, VisibilityState::Hidden);
        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_stylesheet_keeps_existing_content() -> Result<()> {
        let (_dir, paths, _workspace, marker) = setup();

        marker.ensure_stylesheet_exists().await?;
        assert_eq!(std::fs::read_to_string(&paths.stylesheet).unwrap(), "");

        std::fs::write(&paths.stylesheet, "custom").unwrap();
        marker.ensure_stylesheet_exists().await?;
        assert_eq!(std::fs::read_to_string(&paths.stylesheet).unwrap(), "custom");
        Ok(())
    }
}
