//! Ignore patterns for file discovery.
//!
//! Build outputs, dependencies and generated code are never scanned. On top
//! of the defaults, `.aegisignore` and `.gitignore` at the scan root are
//! honored, gitignore syntax for both.

use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};

/// Project-level ignore file read from the scan root.
pub const AEGIS_IGNORE_FILE: &str = ".aegisignore";

/// Directories that are always skipped.
pub const DEFAULT_IGNORE_DIRS: &[&str] = &[
    // Package managers
    "node_modules",
    ".pnpm",
    ".yarn",
    ".npm",
    "bower_components",
    "jspm_packages",
    // Python
    "__pycache__",
    ".venv",
    "venv",
    "virtualenv",
    ".virtualenv",
    "site-packages",
    ".eggs",
    "*.egg-info",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    // Version control
    ".git",
    ".svn",
    ".hg",
    // IDE/Editor
    ".idea",
    ".vscode",
    // Build outputs
    "dist",
    "build",
    "out",
    "_build",
    ".build",
    // Coverage
    "coverage",
    ".nyc_output",
    "htmlcov",
    "__snapshots__",
    // Framework caches
    ".cache",
    ".parcel-cache",
    ".next",
    ".nuxt",
    ".turbo",
    ".vercel",
    ".serverless",
];

/// Files that are generated or bundled and never worth analyzing.
pub const DEFAULT_IGNORE_FILES: &[&str] = &[
    "*.min.js",
    "*.bundle.js",
    "*.chunk.js",
    "*.map",
    "*.d.ts",
    "*.pyc",
    "*.pyo",
    "*.generated.*",
];

/// Compiled ignore matcher rooted at the scan root.
pub struct IgnorePatterns {
    gitignore: Gitignore,
}

impl IgnorePatterns {
    /// Defaults, then `extra_patterns`, then `.aegisignore` and `.gitignore`
    /// found at `root`. Later patterns win, so a project file can re-include
    /// a default with `!pattern`.
    pub fn new(root: &Path, extra_patterns: &[String]) -> Self {
        let mut builder = GitignoreBuilder::new(root);

        for pattern in DEFAULT_IGNORE_DIRS.iter().chain(DEFAULT_IGNORE_FILES) {
            if let Err(e) = builder.add_line(None, pattern) {
                tracing::warn!(pattern, error = %e, "invalid built-in ignore pattern");
            }
        }

        for pattern in extra_patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                tracing::warn!(pattern = %pattern, error = %e, "ignoring invalid ignore pattern");
            }
        }

        for name in [AEGIS_IGNORE_FILE, ".gitignore"] {
            let file = root.join(name);
            if file.is_file() {
                if let Some(e) = builder.add(&file) {
                    tracing::warn!(file = %file.display(), error = %e, "partially invalid ignore file");
                }
            }
        }

        let gitignore = builder.build().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to compile ignore patterns, scanning everything");
            Gitignore::empty()
        });
        Self { gitignore }
    }

    /// Whether `path` (relative to the root) or one of its parents is ignored.
    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        self.gitignore
            .matched_path_or_any_parents(path, is_dir)
            .is_ignore()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_ignore_dependency_dirs() {
        let patterns = IgnorePatterns::new(&PathBuf::from("/project"), &[]);
        assert!(patterns.is_ignored(Path::new("node_modules"), true));
        assert!(patterns.is_ignored(Path::new("src/node_modules"), true));
        assert!(patterns.is_ignored(Path::new("__pycache__"), true));
    }

    #[test]
    fn test_ignore_generated_files() {
        let patterns = IgnorePatterns::new(&PathBuf::from("/project"), &[]);
        assert!(patterns.is_ignored(Path::new("public/app.min.js"), false));
        assert!(patterns.is_ignored(Path::new("types/index.d.ts"), false));
    }

    #[test]
    fn test_allow_source_files() {
        let patterns = IgnorePatterns::new(&PathBuf::from("/project"), &[]);
        assert!(!patterns.is_ignored(Path::new("src/server.ts"), false));
        assert!(!patterns.is_ignored(Path::new("app/views.py"), false));
    }

    #[test]
    fn test_project_ignore_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(AEGIS_IGNORE_FILE), "fixtures/\n").unwrap();
        let patterns = IgnorePatterns::new(dir.path(), &[]);
        assert!(patterns.is_ignored(Path::new("fixtures"), true));
        assert!(!patterns.is_ignored(Path::new("src"), true));
    }
}
