//! Source file path type with debugger-style matching.

use std::fmt;
use std::path::{Path, PathBuf};

/// A source file reference split into directory and basename.
///
/// Debug info frequently records the same file under different spellings:
/// with and without a directory, through symlinked build trees, or relative
/// to a moved source checkout. Splitting the path lets lookups compare the
/// parts independently — a query without a directory matches on basename
/// alone, while a fully qualified query compares both halves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FileSpec
{
    directory: Option<String>,
    filename: String,
}

impl FileSpec
{
    /// Construct from explicit parts. An empty directory is normalized to `None`.
    pub fn new(directory: Option<String>, filename: impl Into<String>) -> Self
    {
        Self {
            directory: directory.filter(|d| !d.is_empty()),
            filename: filename.into(),
        }
    }

    /// Split a path into directory and basename.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use sextant_core::types::FileSpec;
    ///
    /// let spec = FileSpec::from_path("/usr/src/main.c");
    /// assert_eq!(spec.directory(), Some("/usr/src"));
    /// assert_eq!(spec.filename(), "main.c");
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Self
    {
        let path = path.as_ref();
        let filename = path.file_name().map_or_else(String::new, |name| name.to_string_lossy().into_owned());
        let directory = path
            .parent()
            .map(|dir| dir.to_string_lossy().into_owned())
            .filter(|dir| !dir.is_empty());
        Self {
            directory,
            filename,
        }
    }

    /// Directory portion, if one was recorded.
    pub fn directory(&self) -> Option<&str>
    {
        self.directory.as_deref()
    }

    /// Basename portion.
    pub fn filename(&self) -> &str
    {
        &self.filename
    }

    /// Whether both parts are empty.
    pub fn is_empty(&self) -> bool
    {
        self.directory.is_none() && self.filename.is_empty()
    }

    /// Rejoin the parts into a path for filesystem access.
    pub fn as_path(&self) -> PathBuf
    {
        match &self.directory {
            Some(directory) => Path::new(directory).join(&self.filename),
            None => PathBuf::from(&self.filename),
        }
    }

    /// Compare two file specs with debugger equality rules.
    ///
    /// With `full` set both halves must match. Without it, a missing
    /// directory on either side relaxes the comparison to basenames; when
    /// both sides carry directories they still must match in full.
    pub fn equal(lhs: &FileSpec, rhs: &FileSpec, full: bool) -> bool
    {
        if !full && (lhs.directory.is_none() || rhs.directory.is_none()) {
            return lhs.filename == rhs.filename;
        }
        lhs == rhs
    }

    /// Whether `file` satisfies the query `pattern`.
    ///
    /// A pattern with a directory demands full equality; a pattern with only
    /// a basename matches any directory; an empty pattern matches everything.
    pub fn matches(pattern: &FileSpec, file: &FileSpec) -> bool
    {
        if pattern.directory.is_some() {
            return pattern == file;
        }
        if !pattern.filename.is_empty() {
            return pattern.filename == file.filename;
        }
        true
    }
}

impl From<&str> for FileSpec
{
    fn from(path: &str) -> Self
    {
        FileSpec::from_path(path)
    }
}

impl fmt::Display for FileSpec
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match &self.directory {
            Some(directory) if directory.ends_with('/') => write!(f, "{directory}{}", self.filename),
            Some(directory) => write!(f, "{directory}/{}", self.filename),
            None => write!(f, "{}", self.filename),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_from_path_splits_directory_and_name()
    {
        let spec = FileSpec::from_path("/usr/src/lib/main.c");
        assert_eq!(spec.directory(), Some("/usr/src/lib"));
        assert_eq!(spec.filename(), "main.c");

        let bare = FileSpec::from_path("main.c");
        assert_eq!(bare.directory(), None);
        assert_eq!(bare.filename(), "main.c");

        let root = FileSpec::from_path("/main.c");
        assert_eq!(root.directory(), Some("/"));
        assert_eq!(root.filename(), "main.c");
    }

    #[test]
    fn test_equal_relaxes_to_basename_when_directory_missing()
    {
        let full = FileSpec::from_path("/usr/src/main.c");
        let bare = FileSpec::from_path("main.c");
        let other_dir = FileSpec::from_path("/opt/src/main.c");

        assert!(FileSpec::equal(&full, &bare, false));
        assert!(!FileSpec::equal(&full, &bare, true));
        // Both sides carry directories, so they must agree even without `full`.
        assert!(!FileSpec::equal(&full, &other_dir, false));
        assert!(FileSpec::equal(&full, &full.clone(), true));
    }

    #[test]
    fn test_match_pattern_rules()
    {
        let file = FileSpec::from_path("/usr/src/main.c");

        assert!(FileSpec::matches(&FileSpec::from_path("main.c"), &file));
        assert!(FileSpec::matches(&FileSpec::from_path("/usr/src/main.c"), &file));
        assert!(!FileSpec::matches(&FileSpec::from_path("/opt/main.c"), &file));
        assert!(!FileSpec::matches(&FileSpec::from_path("other.c"), &file));
        // Empty patterns match everything.
        assert!(FileSpec::matches(&FileSpec::default(), &file));
    }

    #[test]
    fn test_display_joins_parts()
    {
        assert_eq!(FileSpec::from_path("/usr/src/main.c").to_string(), "/usr/src/main.c");
        assert_eq!(FileSpec::from_path("/main.c").to_string(), "/main.c");
        assert_eq!(FileSpec::from_path("main.c").to_string(), "main.c");
    }
}
