use async_trait::async_trait;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use extfile_mirror_lib::config::MirrorConfig;
use extfile_mirror_lib::host::{
    AcceptDefault, DestinationChooser, FixedDestination, HeadlessWorkspace, SaveDialogOptions,
    SaveDialogResult,
};
use extfile_mirror_lib::input_validation::validate_path_argument;
use extfile_mirror_lib::logging::{init_tracing, LogManager, DEFAULT_MAX_LOG_LINES};
use extfile_mirror_lib::mirror_engine::{ExportOutcome, VisibilityState};
use extfile_mirror_lib::MirrorApp;

#[derive(Parser)]
#[command(name = "extfile-cli")]
#[command(about = "Mirror external markdown files into a vault folder", long_about = None)]
struct Cli {
    /// Vault root (defaults to the config file's value, then the current directory)
    #[arg(short, long, global = true)]
    vault: Option<PathBuf>,

    /// YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Copy external files into the mirror folder
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Save a mirrored file elsewhere and remove it from the mirror folder
    SaveAs {
        /// Mirrored file: bare name, vault-relative path or absolute path
        mirrored: PathBuf,

        #[arg(short, long, conflicts_with = "to_original")]
        dest: Option<PathBuf>,

        /// Write back to the recorded original location without asking
        #[arg(long)]
        to_original: bool,
    },
    /// Drop mapping rows whose mirrored file is gone
    Reconcile,
    /// Show the mapping table and folder visibility
    Status,
    /// Keep the mapping in sync until Ctrl-C
    Watch,
}

/// Terminal prompt standing in for a save dialog.
struct PromptChooser;

#[async_trait]
impl DestinationChooser for PromptChooser {
    async fn show_save_dialog(
        &self,
        options: SaveDialogOptions,
    ) -> anyhow::Result<SaveDialogResult> {
        tokio::task::spawn_blocking(move || {
            let default = options.default_path.to_string_lossy().into_owned();
            let chosen: String = dialoguer::Input::new()
                .with_prompt(format!(
                    "Save as ({})",
                    options.allowed_extensions.join(", ")
                ))
                .with_initial_text(default)
                .interact_text()?;

            let confirmed = dialoguer::Confirm::new()
                .with_prompt(format!("Save to {chosen} and remove the mirrored copy?"))
                .default(true)
                .interact()?;

            Ok(if confirmed && !chosen.trim().is_empty() {
                SaveDialogResult::chosen(chosen.trim())
            } else {
                SaveDialogResult::canceled()
            })
        })
        .await?
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<MirrorConfig> {
    let mut config = match &cli.config {
        Some(path) => MirrorConfig::load(path)?,
        None => MirrorConfig::default(),
    };
    if let Some(vault) = &cli.vault {
        config.vault_root = vault.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Turns whatever the user typed into the vault-relative form the app expects.
fn vault_relative(input: &Path, vault_root: &Path, folder_id: &str) -> String {
    if let Ok(rel) = input.strip_prefix(vault_root) {
        return rel.to_string_lossy().replace('\\', "/");
    }
    if input.components().count() == 1 {
        return format!("{folder_id}/{}", input.to_string_lossy());
    }
    input.to_string_lossy().replace('\\', "/")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info")?;
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let notices = Arc::new(
        LogManager::new(DEFAULT_MAX_LOG_LINES).with_listener(|entry| {
            println!("🔔 {}", entry.message);
        }),
    );
    let workspace = Arc::new(HeadlessWorkspace::default());
    let mut app = MirrorApp::new(config, workspace, notices)?;
    let engine = app.engine().clone();

    match cli.command {
        Command::Ingest { files } => {
            for file in &files {
                validate_path_argument(&file.to_string_lossy())?;
            }
            engine.bootstrap().await?;

            let pb = ProgressBar::new(files.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                    .progress_chars("#>-"),
            );

            let mut ingested = 0;
            let mut already = 0;
            let mut skipped = 0;
            let mut failed = 0;
            for file in &files {
                pb.set_message(file.display().to_string());
                let summary = app.handle_files_drop(std::slice::from_ref(file)).await;
                ingested += summary.ingested.len();
                already += summary.already_tracked.len();
                skipped += summary.skipped.len();
                failed += summary.failed.len();
                pb.inc(1);
            }
            pb.finish_with_message("done");

            println!();
            println!("📊 Results:");
            println!("   Mirrored: {ingested}");
            println!("   Already tracked: {already}");
            println!("   Skipped (not eligible): {skipped}");
            if failed > 0 {
                println!("   Failed: {failed}");
                std::process::exit(1);
            }
        }
        Command::SaveAs {
            mirrored,
            dest,
            to_original,
        } => {
            let paths = engine.paths();
            let relative = vault_relative(&mirrored, &paths.vault_root, &paths.folder_id);

            let chooser: Box<dyn DestinationChooser> = match (dest, to_original) {
                (Some(dest), _) => Box::new(FixedDestination(dest)),
                (None, true) => Box::new(AcceptDefault),
                (None, false) => Box::new(PromptChooser),
            };

            match app.handle_save_as(&relative, chooser.as_ref()).await {
                Some(ExportOutcome::Exported {
                    original_path,
                    destination,
                    bytes_copied,
                }) => {
                    println!("✅ {relative} -> {} ({bytes_copied} bytes)", destination.display());
                    println!("   Originally from {original_path}");
                }
                Some(ExportOutcome::Cancelled) => println!("Cancelled, nothing changed."),
                None => std::process::exit(1),
            }
        }
        Command::Reconcile => {
            let report = engine.reconcile().await?;
            if report.changed() {
                for entry in &report.removed {
                    println!("❌ {} -> {}", entry.original_path, entry.mirrored_name);
                }
            } else {
                println!("✅ Mapping is in sync!");
            }
            println!("   Rows remaining: {}", report.remaining);
        }
        Command::Status => {
            let entries = engine.entries().await?;
            println!("📁 Mirror folder: {}", engine.paths().mirror_dir.display());
            println!("📝 Mapping file: {}", engine.paths().mapping_file.display());
            println!();
            if entries.is_empty() {
                println!("   (no tracked files)");
            }
            for entry in &entries {
                let present = engine.paths().mirrored_file(&entry.mirrored_name).exists();
                println!(
                    "   {} {:<45} <- {}",
                    if present { "✔" } else { "✘" },
                    entry.mirrored_name,
                    entry.original_path
                );
            }
            println!();
            let state = engine.visibility().await?;
            println!(
                "👁  Visibility: {}",
                match state {
                    VisibilityState::Hidden => "hidden",
                    VisibilityState::Dimmed => "dimmed",
                }
            );
        }
        Command::Watch => {
            app.load().await?;
            println!("👀 Watching {} (Ctrl-C to stop)", engine.paths().mirror_dir.display());
            tokio::signal::ctrl_c().await?;
            app.unload().await;
            println!("Stopped.");
        }
    }

    Ok(())
}
