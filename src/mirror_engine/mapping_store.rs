use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::types::MappingTable;
use crate::error::{MirrorError, Result};

/// Durable home of the mapping table: a single pretty-printed JSON object.
///
/// Every caller re-reads the whole table, mutates it and writes it back in
/// full. There is no cache and no lock; the last writer wins.
#[derive(Debug, Clone)]
pub struct MappingStore {
    path: PathBuf,
}

impl MappingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Loads the table, treating a missing file as an empty table.
    pub async fn load(&self) -> Result<MappingTable> {
        Ok(self.load_existing().await?.unwrap_or_default())
    }

    /// Loads the table, or `None` when the backing file does not exist.
    pub async fn load_existing(&self) -> Result<Option<MappingTable>> {
        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(MirrorError::io("read mapping file", &self.path, e)),
        };

        // A zero-length file is what an interrupted first-run bootstrap leaves behind.
        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(Some(MappingTable::new()));
        }

        serde_json::from_slice(&content)
            .map(Some)
            .map_err(|source| MirrorError::MalformedMapping {
                path: self.path.clone(),
                source,
            })
    }

    /// Replaces the backing file with `table`.
    ///
    /// The new content goes to a temp file in the same directory first and is
    /// renamed over the old file, so readers see either the old or the new
    /// table, never a truncated one.
    pub async fn save(&self, table: &MappingTable) -> Result<()> {
        let content = to_pretty_json(table)
            .map_err(|e| MirrorError::io("serialize mapping for", &self.path, e.into()))?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomic(&path, &content))
            .await
            .map_err(|e| {
                MirrorError::io("write mapping file", &self.path, std::io::Error::other(e))
            })??;

        debug!("Saved mapping table with {} row(s) to {:?}", table.len(), self.path);
        Ok(())
    }

    /// Creates the backing file with an empty table if it is missing.
    /// Returns true when a new file was written.
    pub async fn ensure_exists(&self) -> Result<bool> {
        if self.exists().await {
            return Ok(false);
        }
        self.save(&MappingTable::new()).await?;
        Ok(true)
    }
}

fn to_pretty_json(table: &MappingTable) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    table.serialize(&mut serializer)?;
    Ok(buf)
}

fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| MirrorError::io("create directory", dir, e))?;

    let mut temp = tempfile::Builder::new()
        .prefix(".mapping-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| MirrorError::io("create temp file in", dir, e))?;
    temp.write_all(content)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| MirrorError::io("write temp file for", path, e))?;
    temp.persist(path)
        .map_err(|e| MirrorError::io("replace mapping file", path, e.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_loads_empty() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let store = MappingStore::new(dir.path().join("data.json"));

        assert!(store.load_existing().await?.is_none());
        assert!(store.load().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_save_writes_four_space_pretty_json() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let store = MappingStore::new(dir.path().join("data.json"));

        let mut table = MappingTable::new();
        table.insert("/home/u/notes/report.md", "report-EXTFILE-20240301101530.md");
        store.save(&table).await?;

        let written = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            written,
            "{\n    \"/home/u/notes/report.md\": \"report-EXTFILE-20240301101530.md\"\n}"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_round_trip_preserves_unicode_and_order() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let store = MappingStore::new(dir.path().join("data.json"));

        let mut table = MappingTable::new();
        table.insert("/home/유저/메모/회의.md", "회의-EXTFILE-20240301101530.md");
        table.insert("/home/u/Документы/план.md", "план-EXTFILE-20240301101531.md");
        table.insert("/a/b.md", "b-EXTFILE-20240301101532.md");
        store.save(&table).await?;

        let written = std::fs::read_to_string(store.path()).unwrap();
        assert!(written.contains("/home/유저/메모/회의.md"));

        assert_eq!(store.load().await?, table);
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "{\"/a.md\": ").unwrap();

        let err = MappingStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, MirrorError::MalformedMapping { .. }));
    }

    #[tokio::test]
    async fn test_blank_file_loads_empty() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "").unwrap();

        assert_eq!(MappingStore::new(&path).load_existing().await?, Some(MappingTable::new()));
        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_exists_creates_parents_once() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let store = MappingStore::new(dir.path().join(".obsidian/plugins/external-file/data.json"));

        assert!(store.ensure_exists().await?);
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "{}");

        let mut table = MappingTable::new();
        table.insert("/a.md", "a-EXTFILE-20240301101530.md");
        store.save(&table).await?;

        assert!(!store.ensure_exists().await?);
        assert_eq!(store.load().await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_files() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let store = MappingStore::new(dir.path().join("data.json"));

        for i in 0..5 {
            let mut table = store.load().await?;
            table.insert(format!("/n{i}.md"), format!("n{i}-EXTFILE-20240301101530.md"));
            store.save(&table).await?;
        }

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["data.json".to_string()]);
        assert_eq!(store.load().await?.len(), 5);
        Ok(())
    }
}
