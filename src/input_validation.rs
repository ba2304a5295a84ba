//! Validation of user-supplied inputs
//!
//! Covers the eligibility glob patterns from the config file and raw path
//! arguments coming from the CLI or a drop target.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

const MAX_PATTERNS: usize = 100;
const MAX_PATTERN_LENGTH: usize = 255;

/// Validate eligibility patterns
///
/// Ensures patterns are safe, properly formatted, and within reasonable limits.
pub fn validate_eligible_patterns(patterns: &[String]) -> Result<()> {
    if patterns.len() > MAX_PATTERNS {
        bail!(
            "Too many eligibility patterns: {} (max: {})",
            patterns.len(),
            MAX_PATTERNS
        );
    }

    for pattern in patterns {
        let trimmed = pattern.trim();

        if trimmed.is_empty() {
            continue;
        }

        let length = trimmed.chars().count();
        if length > MAX_PATTERN_LENGTH {
            bail!(
                "Pattern too long: '{}' ({} chars, max: {})",
                trimmed.chars().take(20).collect::<String>(),
                length,
                MAX_PATTERN_LENGTH
            );
        }

        if trimmed.contains("..") {
            bail!("Pattern contains path traversal: '{}'", trimmed);
        }

        if trimmed.contains('\0') || trimmed.contains('\n') || trimmed.contains('\r') {
            bail!("Pattern contains control characters");
        }

        Glob::new(trimmed)
            .map_err(|e| anyhow::anyhow!("Invalid glob pattern '{}': {}", trimmed, e))?;
    }

    Ok(())
}

/// Validate raw path arguments
pub fn validate_path_argument(path: &str) -> Result<()> {
    if path.len() > 4096 {
        bail!("Path too long: {} bytes (max: 4096)", path.len());
    }

    if path.contains('\0') {
        bail!("Path contains null byte");
    }

    if path.contains('\n') || path.contains('\r') {
        bail!("Path contains line breaks");
    }

    Ok(())
}

/// Decides which dropped files may be handed to ingestion.
///
/// Patterns match against the file name only, so `*.md` accepts
/// `/any/dir/note.md`.
#[derive(Debug, Clone)]
pub struct EligibilityFilter {
    set: GlobSet,
}

impl EligibilityFilter {
    pub fn new(patterns: &[String]) -> Result<Self> {
        validate_eligible_patterns(patterns)?;

        let mut builder = GlobSetBuilder::new();
        for pattern in patterns.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
            builder.add(Glob::new(pattern)?);
        }

        Ok(Self {
            set: builder.build()?,
        })
    }

    pub fn is_eligible(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| self.set.is_match(Path::new(name)))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_eligible_patterns_valid() {
        let patterns = vec!["*.md".to_string(), "*.markdown".to_string(), "notes-*".to_string()];
        assert!(validate_eligible_patterns(&patterns).is_ok());
    }

    #[test]
    fn test_validate_eligible_patterns_too_many() {
        let patterns: Vec<String> = (0..101).map(|i| format!("pattern_{}", i)).collect();
        assert!(validate_eligible_patterns(&patterns).is_err());
    }

    #[test]
    fn test_validate_eligible_patterns_traversal() {
        let patterns = vec!["../../*.md".to_string()];
        let result = validate_eligible_patterns(&patterns);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("path traversal"));
    }

    #[test]
    fn test_validate_eligible_patterns_too_long_multibyte() {
        let patterns = vec![format!("가{}", "나".repeat(300))];
        let err = validate_eligible_patterns(&patterns).unwrap_err().to_string();
        assert!(err.contains("Pattern too long"));
        assert!(err.contains(&format!("가{}", "나".repeat(19))));
        assert!(err.contains("301 chars"));

        // 101자 한글 패턴은 길이 제한 안쪽
        let patterns = vec![format!("가{}.md", "나".repeat(100))];
        assert!(validate_eligible_patterns(&patterns).is_ok());
    }

    #[test]
    fn test_validate_eligible_patterns_empty() {
        let patterns = vec!["".to_string(), "  ".to_string()];
        assert!(validate_eligible_patterns(&patterns).is_ok());
    }

    #[test]
    fn test_validate_path_argument() {
        assert!(validate_path_argument("/home/u/notes/report.md").is_ok());
        assert!(validate_path_argument("/home/u/노트/회의.md").is_ok());
        assert!(validate_path_argument("/path\0with\0null").is_err());
        assert!(validate_path_argument("/path\nbreak").is_err());
        assert!(validate_path_argument(&"/".repeat(5000)).is_err());
    }

    #[test]
    fn test_eligibility_filter_matches_file_name() {
        let filter = EligibilityFilter::new(&["*.md".to_string()]).unwrap();

        assert!(filter.is_eligible(Path::new("/home/u/notes/report.md")));
        assert!(filter.is_eligible(Path::new("relative.md")));
        assert!(!filter.is_eligible(Path::new("/home/u/notes/report.txt")));
        assert!(!filter.is_eligible(Path::new("/")));
    }
}
