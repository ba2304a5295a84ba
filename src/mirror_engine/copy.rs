use std::hash::Hasher;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncReadExt;

use super::types::CopyOptions;
use crate::error::{MirrorError, Result};

/// Copies `source` to `target` byte for byte, overwriting `target`.
pub async fn copy_file(source: &Path, target: &Path, options: &CopyOptions) -> Result<u64> {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| MirrorError::io("create directory", parent, e))?;
    }

    let bytes = fs::copy(source, target)
        .await
        .map_err(|e| MirrorError::io("copy", source, e))?;

    if options.preserve_permissions || options.preserve_times {
        let meta = fs::metadata(source)
            .await
            .map_err(|e| MirrorError::io("stat", source, e))?;

        if options.preserve_permissions {
            fs::set_permissions(target, meta.permissions())
                .await
                .map_err(|e| MirrorError::io("set permissions on", target, e))?;
        }

        if options.preserve_times {
            let modified = meta
                .modified()
                .map_err(|e| MirrorError::io("read mtime of", source, e))?;
            filetime::set_file_mtime(target, filetime::FileTime::from_system_time(modified))
                .map_err(|e| MirrorError::io("set mtime on", target, e))?;
        }
    }

    Ok(bytes)
}

pub async fn calculate_checksum(path: &Path) -> Result<String> {
    use twox_hash::XxHash64;

    let mut file = fs::File::open(path)
        .await
        .map_err(|e| MirrorError::io("open", path, e))?;
    let mut hasher = XxHash64::with_seed(0);
    let mut buffer = [0u8; 8192];

    loop {
        let n = file
            .read(&mut buffer)
            .await
            .map_err(|e| MirrorError::io("read", path, e))?;
        if n == 0 {
            break;
        }
        hasher.write(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finish()))
}

/// Fails with `VerificationFailed` unless both files hash the same.
pub async fn verify_copy(source: &Path, target: &Path) -> Result<()> {
    let source_hash = calculate_checksum(source).await?;
    let target_hash = calculate_checksum(target).await?;

    if source_hash != target_hash {
        return Err(MirrorError::VerificationFailed {
            source_path: source.to_path_buf(),
            target: target.to_path_buf(),
        });
    }
    Ok(())
}
