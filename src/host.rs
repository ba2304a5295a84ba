//! Seams to the host application.
//!
//! The engine never talks to a UI directly. It is handed a destination
//! chooser, a notifier and a workspace handle, so headless callers and tests
//! can supply scripted versions.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveDialogOptions {
    pub default_path: PathBuf,
    pub filter_name: String,
    pub allowed_extensions: Vec<String>,
}

impl SaveDialogOptions {
    pub fn markdown(default_path: impl Into<PathBuf>) -> Self {
        Self {
            default_path: default_path.into(),
            filter_name: "Markdown Files".to_string(),
            allowed_extensions: vec!["md".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveDialogResult {
    pub canceled: bool,
    pub chosen_path: Option<PathBuf>,
}

impl SaveDialogResult {
    pub fn chosen(path: impl Into<PathBuf>) -> Self {
        Self {
            canceled: false,
            chosen_path: Some(path.into()),
        }
    }

    pub fn canceled() -> Self {
        Self {
            canceled: true,
            chosen_path: None,
        }
    }

    /// The destination, unless the dialog was dismissed.
    pub fn destination(self) -> Option<PathBuf> {
        if self.canceled {
            None
        } else {
            self.chosen_path
        }
    }
}

/// Interactive "save as" dialog. May wait on the user indefinitely.
#[async_trait]
pub trait DestinationChooser: Send + Sync {
    async fn show_save_dialog(&self, options: SaveDialogOptions)
        -> anyhow::Result<SaveDialogResult>;
}

/// Transient, fire-and-forget user notice.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

pub trait HostWorkspace: Send + Sync {
    /// Tell the host that a stylesheet it loads was rewritten.
    fn trigger_style_change(&self);
}

/// Always picks the same destination.
#[derive(Debug, Clone)]
pub struct FixedDestination(pub PathBuf);

#[async_trait]
impl DestinationChooser for FixedDestination {
    async fn show_save_dialog(
        &self,
        _options: SaveDialogOptions,
    ) -> anyhow::Result<SaveDialogResult> {
        Ok(SaveDialogResult::chosen(self.0.clone()))
    }
}

/// Accepts the suggested default path as-is.
#[derive(Debug, Clone, Default)]
pub struct AcceptDefault;

#[async_trait]
impl DestinationChooser for AcceptDefault {
    async fn show_save_dialog(&self, options: SaveDialogOptions) -> anyhow::Result<SaveDialogResult> {
        Ok(SaveDialogResult::chosen(options.default_path))
    }
}

/// Dismisses every dialog.
#[derive(Debug, Clone, Default)]
pub struct CancelChooser;

#[async_trait]
impl DestinationChooser for CancelChooser {
    async fn show_save_dialog(
        &self,
        _options: SaveDialogOptions,
    ) -> anyhow::Result<SaveDialogResult> {
        Ok(SaveDialogResult::canceled())
    }
}

/// Workspace handle that only counts style-change notifications.
#[derive(Debug, Default)]
pub struct HeadlessWorkspace {
    style_changes: AtomicUsize,
}

impl HeadlessWorkspace {
    pub fn style_changes(&self) -> usize {
        self.style_changes.load(Ordering::SeqCst)
    }
}

impl HostWorkspace for HeadlessWorkspace {
    fn trigger_style_change(&self) {
        self.style_changes.fetch_add(1, Ordering::SeqCst);
    }
}
