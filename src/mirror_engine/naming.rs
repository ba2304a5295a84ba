use chrono::NaiveDateTime;
use std::path::Path;

pub const MIRROR_MARKER: &str = "EXTFILE";
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// `<stem>-EXTFILE-<YYYYMMDDHHMMSS>.md` for an external file ingested at `at`.
pub fn mirror_file_name(external_path: &Path, at: NaiveDateTime) -> String {
    let stem = external_path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    format!("{stem}-{MIRROR_MARKER}-{}.md", at.format(TIMESTAMP_FORMAT))
}

/// `name` with `-<attempt>` inserted before the extension. Attempt 0 is `name`
/// itself.
pub fn with_attempt(name: &str, attempt: u32) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    match name.strip_suffix(".md") {
        Some(base) => format!("{base}-{attempt}.md"),
        None => format!("{name}-{attempt}"),
    }
}

/// Bare file name of a mirrored file, with any directory part dropped.
pub fn bare_name(mirrored_path: &Path) -> Option<String> {
    mirrored_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}
