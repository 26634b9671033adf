use log::debug;
use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{EngineResult, MergeError};

/// A raw archive as supplied by the user: a display name plus its bytes
#[derive(Debug, Clone)]
pub struct ArchiveSource {
    pub name: String,
    pub bytes: Arc<[u8]>,
}

/// One entry of an archive's central directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub path: String,
    pub is_dir: bool,
    pub size: u64,
}

impl ArchiveSource {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        ArchiveSource {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read an archive from disk, named after its file name
    pub fn from_file<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let bytes = fs::read(path).map_err(|source| MergeError::Io {
            archive: name.clone(),
            source,
        })?;

        Ok(ArchiveSource::new(name, bytes))
    }

    /// Open the container for random-access reads
    pub fn open(&self) -> EngineResult<ZipArchive<Cursor<&[u8]>>> {
        ZipArchive::new(Cursor::new(&self.bytes[..])).map_err(|source| self.decode_error(source))
    }

    /// List every entry in central-directory order
    pub fn list_entries(&self) -> EngineResult<Vec<RawEntry>> {
        let mut zip = self.open()?;
        let mut entries = Vec::with_capacity(zip.len());

        for i in 0..zip.len() {
            let file = zip
                .by_index_raw(i)
                .map_err(|source| self.decode_error(source))?;
            entries.push(RawEntry {
                path: file.name().to_string(),
                is_dir: file.is_dir(),
                size: file.size(),
            });
        }

        Ok(entries)
    }

    /// Read one entry fully into memory
    pub fn read_entry(
        &self,
        zip: &mut ZipArchive<Cursor<&[u8]>>,
        path: &str,
    ) -> EngineResult<Vec<u8>> {
        let mut file = zip
            .by_name(path)
            .map_err(|source| self.decode_error(source))?;
        let declared = file.size();
        self.drain(&mut file, declared)
    }

    /// Read the entry at a central-directory index fully into memory
    pub fn read_entry_at(
        &self,
        zip: &mut ZipArchive<Cursor<&[u8]>>,
        index: usize,
    ) -> EngineResult<Vec<u8>> {
        let mut file = zip
            .by_index(index)
            .map_err(|source| self.decode_error(source))?;
        let declared = file.size();
        self.drain(&mut file, declared)
    }

    fn drain(&self, file: &mut impl Read, declared_size: u64) -> EngineResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(initial_capacity(declared_size));
        file.read_to_end(&mut buf).map_err(|source| MergeError::Io {
            archive: self.name.clone(),
            source,
        })?;
        Ok(buf)
    }

    fn decode_error(&self, source: zip::result::ZipError) -> MergeError {
        MergeError::Decode {
            archive: self.name.clone(),
            source,
        }
    }
}

/// Upper bound on buffer space reserved from an entry's declared size
const MAX_PREALLOC: u64 = 1 << 20;

/// Buffer capacity to reserve for an entry; the declared size is untrusted.
pub(crate) fn initial_capacity(declared_size: u64) -> usize {
    declared_size.min(MAX_PREALLOC) as usize
}

/// Raw archive access for the stages that run after inspection, keyed by the
/// identifier each inspection was given.
#[derive(Debug, Default, Clone)]
pub struct ArchiveStore {
    sources: HashMap<String, ArchiveSource>,
}

impl ArchiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, identifier: impl Into<String>, source: ArchiveSource) {
        self.sources.insert(identifier.into(), source);
    }

    /// Look up the raw archive behind an inspection
    pub fn get(&self, identifier: &str, display_name: &str) -> EngineResult<&ArchiveSource> {
        self.sources
            .get(identifier)
            .ok_or_else(|| MergeError::MissingSource {
                archive: display_name.to_string(),
            })
    }
}

/// Builds a fresh deflated ZIP container in memory
pub struct ZipBuilder {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
}

impl Default for ZipBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ZipBuilder {
    pub fn new() -> Self {
        ZipBuilder {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    /// Add a file entry
    pub fn add_file(&mut self, path: &str, contents: &[u8]) -> EngineResult<()> {
        self.writer
            .start_file(path, self.options)
            .map_err(|source| MergeError::Package { source })?;
        self.writer
            .write_all(contents)
            .map_err(|e| MergeError::Package { source: e.into() })
    }

    /// Add an explicit directory entry
    pub fn add_directory(&mut self, path: &str) -> EngineResult<()> {
        self.writer
            .add_directory(path, self.options)
            .map_err(|source| MergeError::Package { source })
    }

    /// Finish the central directory and return the container bytes
    pub fn finish(self) -> EngineResult<Vec<u8>> {
        let cursor = self
            .writer
            .finish()
            .map_err(|source| MergeError::Package { source })?;
        Ok(cursor.into_inner())
    }
}

/// Expand user-supplied paths into archive files: files are taken as-is,
/// directories are walked for `*.zip` files in sorted order.
pub fn collect_archive_paths(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    for input in inputs {
        if !input.is_dir() {
            paths.push(input.clone());
            continue;
        }

        let mut found: Vec<PathBuf> = WalkDir::new(input)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| {
                p.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
            })
            .collect();
        found.sort();

        debug!("Found {} archive(s) under {}", found.len(), input.display());
        paths.extend(found);
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_zip() -> Vec<u8> {
        let mut builder = ZipBuilder::new();
        builder.add_directory("export/").unwrap();
        builder.add_file("export/result.json", b"{}").unwrap();
        builder.add_file("export/photos/a.jpg", b"jpeg").unwrap();
        builder.finish().unwrap()
    }

    #[test]
    fn test_list_entries_in_order() {
        let source = ArchiveSource::new("sample.zip", sample_zip());
        let entries = source.list_entries().unwrap();

        let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["export/", "export/result.json", "export/photos/a.jpg"]
        );
        assert!(entries[0].is_dir);
        assert_eq!(entries[2].size, 4);
    }

    #[test]
    fn test_read_entry() {
        let source = ArchiveSource::new("sample.zip", sample_zip());
        let mut zip = source.open().unwrap();
        let bytes = source.read_entry(&mut zip, "export/photos/a.jpg").unwrap();
        assert_eq!(bytes, b"jpeg");
    }

    #[test]
    fn test_read_entry_at_index() {
        let source = ArchiveSource::new("sample.zip", sample_zip());
        let mut zip = source.open().unwrap();
        assert_eq!(source.read_entry_at(&mut zip, 1).unwrap(), b"{}");
        assert_eq!(source.read_entry_at(&mut zip, 2).unwrap(), b"jpeg");
        assert!(source.read_entry_at(&mut zip, 3).is_err());
    }

    #[test]
    fn test_declared_size_does_not_drive_allocation() {
        assert_eq!(initial_capacity(4), 4);
        assert_eq!(initial_capacity(u64::from(u32::MAX)), MAX_PREALLOC as usize);
        assert_eq!(initial_capacity(u64::MAX), MAX_PREALLOC as usize);
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let source = ArchiveSource::new("garbage.zip", b"not a zip at all".to_vec());
        let err = source.list_entries().unwrap_err();
        assert!(matches!(err, MergeError::Decode { ref archive, .. } if archive == "garbage.zip"));
    }

    #[test]
    fn test_store_reports_missing_source() {
        let store = ArchiveStore::new();
        let err = store.get("nope", "gone.zip").unwrap_err();
        assert!(matches!(err, MergeError::MissingSource { ref archive } if archive == "gone.zip"));
    }

    #[test]
    fn test_collect_archive_paths_walks_directories() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("nested");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp.path().join("b.zip"), b"").unwrap();
        fs::write(nested.join("a.ZIP"), b"").unwrap();
        fs::write(temp.path().join("notes.txt"), b"").unwrap();

        let explicit = temp.path().join("notes.txt");
        let paths = collect_archive_paths(&[temp.path().to_path_buf(), explicit.clone()]);

        assert_eq!(
            paths,
            vec![temp.path().join("b.zip"), nested.join("a.ZIP"), explicit]
        );
    }
}
