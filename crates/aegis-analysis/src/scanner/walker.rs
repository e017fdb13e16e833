//! File discovery.
//!
//! The walk is single-threaded for a stable order; parsing and analysis are
//! parallelized downstream by the pipeline.

use std::fs;
use std::path::{Path, PathBuf};

use super::ignores::IgnorePatterns;
use crate::tree::Language;

/// A file the analyzer knows how to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path on disk.
    pub path: PathBuf,
    /// Path relative to the scan root, `/`-separated. Used as the unit id.
    pub relative: String,
    pub language: Language,
}

/// Discovery statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub dirs_ignored: usize,
    pub files_ignored: usize,
    pub unsupported: usize,
    pub unreadable_dirs: usize,
}

/// Walks a scan root and returns supported source files.
pub struct Scanner {
    root: PathBuf,
    ignores: IgnorePatterns,
}

impl Scanner {
    pub fn new(root: impl Into<PathBuf>, extra_ignores: &[String]) -> Self {
        let root = root.into();
        let ignore_root = if root.is_file() {
            root.parent().map(Path::to_path_buf).unwrap_or_default()
        } else {
            root.clone()
        };
        let ignores = IgnorePatterns::new(&ignore_root, extra_ignores);
        Self { root, ignores }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Collect every supported, non-ignored file below the root, sorted by
    /// relative path. A root that is itself a file is returned as-is when
    /// its language is supported, even if an ignore pattern matches it.
    pub fn discover(&self) -> (Vec<SourceFile>, WalkStats) {
        let mut stats = WalkStats::default();
        let mut files = Vec::new();

        if self.root.is_file() {
            let relative = self
                .root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            match detect_language(&self.root) {
                Some(language) => files.push(SourceFile {
                    path: self.root.clone(),
                    relative,
                    language,
                }),
                None => stats.unsupported += 1,
            }
            return (files, stats);
        }

        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "cannot read directory");
                    stats.unreadable_dirs += 1;
                    continue;
                }
            };

            for entry in entries.flatten() {
                let path = entry.path();
                let relative = path.strip_prefix(&self.root).unwrap_or(&path);
                let Ok(file_type) = entry.file_type() else {
                    continue;
                };

                if file_type.is_dir() {
                    if self.ignores.is_ignored(relative, true) {
                        stats.dirs_ignored += 1;
                    } else {
                        pending.push(path);
                    }
                } else if file_type.is_file() {
                    if self.ignores.is_ignored(relative, false) {
                        stats.files_ignored += 1;
                        continue;
                    }
                    match detect_language(&path) {
                        Some(language) => files.push(SourceFile {
                            relative: to_unit_path(relative),
                            path,
                            language,
                        }),
                        None => stats.unsupported += 1,
                    }
                }
            }
        }

        files.sort_by(|a, b| a.relative.cmp(&b.relative));
        tracing::debug!(
            root = %self.root.display(),
            files = files.len(),
            dirs_ignored = stats.dirs_ignored,
            files_ignored = stats.files_ignored,
            "discovery complete"
        );
        (files, stats)
    }
}

/// Language of a path by extension, case-insensitively.
pub fn detect_language(path: &Path) -> Option<Language> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    Language::from_extension(Some(&ext))
}

/// `/`-separated form of a relative path.
pub fn to_unit_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x = 1\n").unwrap();
    }

    #[test]
    fn test_discovers_supported_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/b.ts");
        touch(dir.path(), "src/a.js");
        touch(dir.path(), "app/views.py");
        touch(dir.path(), "README.md");
        touch(dir.path(), "node_modules/lib/index.js");

        let (files, stats) = Scanner::new(dir.path(), &[]).discover();
        let rels: Vec<_> = files.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(rels, vec!["app/views.py", "src/a.js", "src/b.ts"]);
        assert_eq!(files[0].language, Language::Python);
        assert_eq!(stats.unsupported, 1);
        assert_eq!(stats.dirs_ignored, 1);
    }

    #[test]
    fn test_extra_ignores() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/app.js");
        touch(dir.path(), "scripts/seed.js");
        let (files, _) = Scanner::new(dir.path(), &["scripts/".to_string()]).discover();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative, "src/app.js");
    }

    #[test]
    fn test_single_file_root() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "server.mjs");
        let (files, _) = Scanner::new(dir.path().join("server.mjs"), &[]).discover();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative, "server.mjs");
        assert_eq!(files[0].language, Language::JavaScript);
    }

    #[test]
    fn test_detect_language_case_insensitive() {
        assert_eq!(detect_language(Path::new("A.PY")), Some(Language::Python));
        assert_eq!(detect_language(Path::new("x.tsx")), Some(Language::TypeScript));
        assert_eq!(detect_language(Path::new("Makefile")), None);
    }
}
