//! Where source units come from.
//!
//! Listing is cheap and happens before any file is read; loading reads and
//! parses one unit on a worker thread.

use std::fs;
use std::path::PathBuf;

use aegis_core::errors::{ParseError, PipelineError, ScanError};

use crate::parsers;
use crate::scanner::{Scanner, SourceFile};
use crate::tree::{Language, SourceUnit};

/// A unit that can be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Unit id, `/`-separated path relative to the scan root.
    pub id: String,
    pub language: Language,
}

/// Supplies source units to the pipeline.
pub trait SourceProvider: Sync {
    /// Every unit this provider can load, in a stable order.
    fn list(&self) -> Vec<SourceEntry>;

    /// Read and parse one unit. Units larger than `max_file_size` bytes are
    /// refused with `ScanError::MaxFileSizeExceeded`.
    fn load(&self, entry: &SourceEntry, max_file_size: u64) -> Result<SourceUnit, PipelineError>;
}

/// Files discovered on disk below a root.
pub struct FsProvider {
    files: Vec<SourceFile>,
}

impl FsProvider {
    /// Walk `root` now; later `list` calls return the same snapshot.
    pub fn new(root: impl Into<PathBuf>, extra_ignores: &[String]) -> Self {
        let scanner = Scanner::new(root, extra_ignores);
        let (files, _) = scanner.discover();
        Self { files }
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    fn file(&self, id: &str) -> Option<&SourceFile> {
        self.files
            .binary_search_by(|f| f.relative.as_str().cmp(id))
            .ok()
            .map(|i| &self.files[i])
    }
}

impl SourceProvider for FsProvider {
    fn list(&self) -> Vec<SourceEntry> {
        self.files
            .iter()
            .map(|f| SourceEntry {
                id: f.relative.clone(),
                language: f.language,
            })
            .collect()
    }

    fn load(&self, entry: &SourceEntry, max_file_size: u64) -> Result<SourceUnit, PipelineError> {
        let path = self
            .file(&entry.id)
            .map_or_else(|| PathBuf::from(&entry.id), |f| f.path.clone());
        let io_error = |source| ScanError::IoError {
            path: path.clone(),
            source,
        };

        let size = fs::metadata(&path).map_err(io_error)?.len();
        if size > max_file_size {
            return Err(ScanError::MaxFileSizeExceeded {
                path: path.clone(),
                size,
                max: max_file_size,
            }
            .into());
        }
        let bytes = fs::read(&path).map_err(io_error)?;
        Ok(parsers::parse_bytes(&entry.id, entry.language, &bytes)?)
    }
}

/// In-memory content for one unit.
#[derive(Debug, Clone)]
pub enum MemorySource {
    /// Source text, parsed on load.
    Text(String),
    /// A tree produced elsewhere, e.g. deserialized from JSON.
    Unit(SourceUnit),
}

/// Units held in memory. Used by tests, benches and embedders that bring
/// their own parser.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    entries: Vec<(SourceEntry, MemorySource)>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, id: &str, language: Language, text: &str) -> Self {
        self.push(id, language, MemorySource::Text(text.to_string()));
        self
    }

    pub fn with_unit(mut self, unit: SourceUnit) -> Self {
        let (id, language) = (unit.path.clone(), unit.language);
        self.push(&id, language, MemorySource::Unit(unit));
        self
    }

    fn push(&mut self, id: &str, language: Language, source: MemorySource) {
        let entry = SourceEntry {
            id: id.to_string(),
            language,
        };
        self.entries.push((entry, source));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SourceProvider for MemoryProvider {
    fn list(&self) -> Vec<SourceEntry> {
        self.entries.iter().map(|(e, _)| e.clone()).collect()
    }

    fn load(&self, entry: &SourceEntry, max_file_size: u64) -> Result<SourceUnit, PipelineError> {
        let source = self
            .entries
            .iter()
            .find(|(e, _)| e.id == entry.id)
            .map(|(_, s)| s)
            .ok_or_else(|| ScanError::IoError {
                path: PathBuf::from(&entry.id),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "unit not in memory"),
            })?;
        match source {
            MemorySource::Text(text) => {
                let size = text.len() as u64;
                if size > max_file_size {
                    return Err(ScanError::MaxFileSizeExceeded {
                        path: PathBuf::from(&entry.id),
                        size,
                        max: max_file_size,
                    }
                    .into());
                }
                Ok(parsers::parse_source(&entry.id, entry.language, text)?)
            }
            MemorySource::Unit(unit) => {
                unit.tree.check().map_err(|message| ParseError::InvalidTree {
                    path: PathBuf::from(&entry.id),
                    message,
                })?;
                Ok(unit.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_provider_loads_and_limits_size() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("small.js"), "fetch('https://x.io');\n").unwrap();
        fs::write(dir.path().join("big.js"), "x".repeat(200)).unwrap();

        let provider = FsProvider::new(dir.path(), &[]);
        let entries = provider.list();
        let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["big.js", "small.js"]);

        let unit = provider.load(&entries[1], 100).unwrap();
        assert_eq!(unit.path, "small.js");

        let err = provider.load(&entries[0], 100).unwrap_err();
        assert!(matches!(err, PipelineError::Scan(ScanError::MaxFileSizeExceeded { size: 200, .. })));
    }

    #[test]
    fn test_memory_provider_text_and_unit() {
        let prebuilt = crate::tree::TreeBuilder::new().unit("pre.js", Language::JavaScript, vec![]);
        let provider = MemoryProvider::new()
            .with_source("a.py", Language::Python, "x = 1\n")
            .with_unit(prebuilt.clone());
        let entries = provider.list();
        assert_eq!(entries.len(), 2);
        assert_eq!(provider.load(&entries[1], 10).unwrap(), prebuilt);
        assert!(provider.load(&entries[0], 2).is_err());
    }

    #[test]
    fn test_memory_provider_rejects_malformed_unit() {
        let mut b = crate::tree::TreeBuilder::new();
        let dangling = b.node(crate::tree::NodeKind::Call, None, vec![crate::tree::NodeId(42)]);
        let unit = b.unit("bad.js", Language::JavaScript, vec![dangling]);
        let provider = MemoryProvider::new().with_unit(unit);
        let err = provider.load(&provider.list()[0], 1024).unwrap_err();
        assert!(matches!(err, PipelineError::Parse(ParseError::InvalidTree { .. })), "{err}");
    }
}
