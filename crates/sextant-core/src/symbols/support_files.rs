//! Support file registries and symlink-aware path resolution.
//!
//! Every compile unit carries an indexed list of the source files its line
//! table refers to. Line entries store indexes into this list, so file
//! queries first resolve a `FileSpec` to one or more indexes and then search
//! the line table by index.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::types::FileSpec;

/// Symlink-resolution hints for support file matching.
///
/// Build systems frequently compile through symlinked trees, so the path in
/// the debug info and the path the user asks about may name the same file
/// through different spellings. Each prefix marks a subtree under which
/// support files may be canonicalized before comparison. Canonicalization
/// hits the filesystem, so results are cached.
pub struct RealpathPrefixes
{
    prefixes: Vec<PathBuf>,
    cache: RwLock<HashMap<PathBuf, Option<PathBuf>>>,
}

impl RealpathPrefixes
{
    /// Create hints from a set of path prefixes.
    #[must_use]
    pub fn new(prefixes: Vec<PathBuf>) -> Self
    {
        Self {
            prefixes,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Canonicalize `spec` if it falls under one of the prefixes.
    ///
    /// Returns `None` when the spec is outside every prefix or the path
    /// cannot be resolved (missing file, dangling link).
    pub fn resolve(&self, spec: &FileSpec) -> Option<FileSpec>
    {
        let path = spec.as_path();
        if !self.prefixes.iter().any(|prefix| path.starts_with(prefix)) {
            return None;
        }
        if let Some(cached) = self.cache.read().unwrap().get(&path) {
            return cached.as_deref().map(FileSpec::from_path);
        }
        let resolved = fs::canonicalize(&path).ok();
        let result = resolved.as_deref().map(FileSpec::from_path);
        self.cache.write().unwrap().insert(path, resolved);
        result
    }
}

/// The indexed, deduplicated list of source files one compile unit refers to.
///
/// Index stability matters: line entries identify their file by index, so
/// files are only ever appended.
#[derive(Debug, Clone, Default)]
pub struct SupportFileList
{
    files: Vec<FileSpec>,
}

impl SupportFileList
{
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Wrap an existing file vector.
    #[must_use]
    pub fn from_files(files: Vec<FileSpec>) -> Self
    {
        Self { files }
    }

    /// Number of files.
    pub fn len(&self) -> usize
    {
        self.files.len()
    }

    /// Whether the list holds no files.
    pub fn is_empty(&self) -> bool
    {
        self.files.is_empty()
    }

    /// File at `idx`, if in bounds.
    pub fn get(&self, idx: usize) -> Option<&FileSpec>
    {
        self.files.get(idx)
    }

    /// All files in index order.
    pub fn files(&self) -> &[FileSpec]
    {
        &self.files
    }

    /// Append unconditionally, returning the new index.
    pub fn append(&mut self, file: FileSpec) -> usize
    {
        self.files.push(file);
        self.files.len() - 1
    }

    /// Append unless an equal file is already present; returns the index of
    /// the surviving entry either way.
    pub fn append_if_unique(&mut self, file: FileSpec) -> usize
    {
        if let Some(idx) = self.files.iter().position(|existing| *existing == file) {
            return idx;
        }
        self.append(file)
    }

    /// Find the next file compatible with `spec`, scanning from `start_idx`.
    ///
    /// A query without a directory matches on basename; a fully qualified
    /// query compares directories too. When `realpath_prefixes` is given,
    /// entries that fail the direct comparison are canonicalized through the
    /// prefixes and compared once more, catching symlinked build trees.
    ///
    /// Restart the scan just past a hit to enumerate every compatible index:
    /// a basename query can legitimately match several files.
    pub fn find_compatible_index(&self, start_idx: usize, spec: &FileSpec, realpath_prefixes: Option<&RealpathPrefixes>) -> Option<usize>
    {
        let full = spec.directory().is_some();
        for (idx, file) in self.files.iter().enumerate().skip(start_idx) {
            if FileSpec::equal(file, spec, full) {
                return Some(idx);
            }
            if let Some(prefixes) = realpath_prefixes {
                if let Some(resolved) = prefixes.resolve(file) {
                    if FileSpec::equal(&resolved, spec, full) {
                        return Some(idx);
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_append_if_unique_deduplicates()
    {
        let mut files = SupportFileList::new();
        let first = files.append_if_unique(FileSpec::from_path("/src/a.c"));
        let second = files.append_if_unique(FileSpec::from_path("/src/b.c"));
        let again = files.append_if_unique(FileSpec::from_path("/src/a.c"));
        assert_eq!(first, 0);
        assert_eq!(second, 1);
        assert_eq!(again, 0);
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_find_compatible_index_enumerates_basename_matches()
    {
        let files = SupportFileList::from_files(vec![
            FileSpec::from_path("/src/a.c"),
            FileSpec::from_path("/src/util/a.c"),
            FileSpec::from_path("/src/b.c"),
        ]);
        let query = FileSpec::from_path("a.c");
        let first = files.find_compatible_index(0, &query, None).unwrap();
        assert_eq!(first, 0);
        let second = files.find_compatible_index(first + 1, &query, None).unwrap();
        assert_eq!(second, 1);
        assert!(files.find_compatible_index(second + 1, &query, None).is_none());
    }

    #[test]
    fn test_find_compatible_index_with_directory_is_strict()
    {
        let files = SupportFileList::from_files(vec![FileSpec::from_path("/src/a.c"), FileSpec::from_path("/other/a.c")]);
        let query = FileSpec::from_path("/other/a.c");
        assert_eq!(files.find_compatible_index(0, &query, None), Some(1));
        assert!(files.find_compatible_index(2, &query, None).is_none());
    }

    #[test]
    fn test_realpath_prefix_misses_are_harmless()
    {
        // Canonicalization of a nonexistent path fails; the entry simply
        // doesn't match through the realpath route.
        let files = SupportFileList::from_files(vec![FileSpec::from_path("/nonexistent-prefix/src/a.c")]);
        let prefixes = RealpathPrefixes::new(vec![PathBuf::from("/nonexistent-prefix")]);
        let query = FileSpec::from_path("/elsewhere/a.c");
        assert!(files.find_compatible_index(0, &query, Some(&prefixes)).is_none());
        // Cached negative result takes the same path.
        assert!(files.find_compatible_index(0, &query, Some(&prefixes)).is_none());
    }
}
