use std::path::Path;

/// Maximum allowed path length for security
const MAX_PATH_LENGTH: usize = 4096;

/// Validate that a path is safe and doesn't contain suspicious patterns
pub fn validate_path(path: &str) -> Result<(), String> {
    if path.len() > MAX_PATH_LENGTH {
        return Err(format!("Path too long (max {MAX_PATH_LENGTH} bytes)"));
    }

    if path.bytes().any(|b| b == 0) {
        return Err("Path contains null bytes".to_string());
    }

    let path_str = Path::new(path).to_string_lossy();
    if path_str.contains("../") || path_str.contains("..\\") {
        return Err("Path traversal detected (../)".to_string());
    }

    Ok(())
}

/// Whether the "Save As" action applies to a file the host shows at
/// `vault_relative` (forward-slash separated, relative to the vault root).
pub fn save_as_available(vault_relative: &str, folder_id: &str) -> bool {
    vault_relative
        .strip_prefix(folder_id)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|name| !name.contains('/'))
        .and_then(|name| name.strip_suffix(".md"))
        .is_some_and(|stem| !stem.is_empty())
}

/// Ingestion callers must hand over regular files only
pub fn verify_regular_file(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Err(format!("Path does not exist: {}", path.display()));
    }
    if !path.is_file() {
        return Err(format!("Not a regular file: {}", path.display()));
    }
    Ok(())
}
