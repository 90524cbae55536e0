//! Source location queries and declaration records.

use std::fmt;

use crate::types::FileSpec;

/// A source position recorded in debug info, such as an inlined call site.
///
/// A column of `0` means the producer recorded no column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declaration
{
    file: FileSpec,
    line: u32,
    column: u16,
}

impl Declaration
{
    /// Construct a declaration. Line `0` and column `0` mean "not recorded".
    pub fn new(file: FileSpec, line: u32, column: u16) -> Self
    {
        Self {
            file,
            line,
            column,
        }
    }

    /// File the declaration points into.
    pub fn file(&self) -> &FileSpec
    {
        &self.file
    }

    /// Line number, `0` if not recorded.
    pub fn line(&self) -> u32
    {
        self.line
    }

    /// Column number, `0` if not recorded.
    pub fn column(&self) -> u16
    {
        self.column
    }

    /// Compare file and line, ignoring columns.
    ///
    /// `full` forces directory comparison on the file halves; without it a
    /// side missing its directory compares by basename.
    pub fn file_and_line_equal(&self, other: &Declaration, full: bool) -> bool
    {
        self.line == other.line && FileSpec::equal(&self.file, &other.file, full)
    }
}

impl fmt::Display for Declaration
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}:{}", self.file, self.line)?;
        if self.column != 0 {
            write!(f, ":{}", self.column)?;
        }
        Ok(())
    }
}

/// A source location query: which file, optionally which line and column,
/// and how strictly to match.
///
/// - No line means the query addresses the whole compile unit.
/// - No column means any column satisfies the query.
/// - `check_inlines` extends the search into files that only appear in the
///   unit through inlining.
/// - `exact_match` rejects nearest-line fallback: the entry must sit on
///   exactly the requested line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocationSpec
{
    file_spec: FileSpec,
    line: Option<u32>,
    column: Option<u16>,
    check_inlines: bool,
    exact_match: bool,
}

impl SourceLocationSpec
{
    /// Construct a query.
    pub fn new(file_spec: FileSpec, line: Option<u32>, column: Option<u16>, check_inlines: bool, exact_match: bool) -> Self
    {
        Self {
            file_spec,
            line,
            column,
            check_inlines,
            exact_match,
        }
    }

    /// File being searched for.
    pub fn file_spec(&self) -> &FileSpec
    {
        &self.file_spec
    }

    /// Requested line, if the query is line-scoped.
    pub fn line(&self) -> Option<u32>
    {
        self.line
    }

    /// Requested column, if any.
    pub fn column(&self) -> Option<u16>
    {
        self.column
    }

    /// Whether inlined occurrences of the file should be searched.
    pub fn check_inlines(&self) -> bool
    {
        self.check_inlines
    }

    /// Whether nearest-line fallback is disabled.
    pub fn exact_match(&self) -> bool
    {
        self.exact_match
    }
}

impl fmt::Display for SourceLocationSpec
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.file_spec)?;
        if let Some(line) = self.line {
            write!(f, ":{line}")?;
        }
        if let Some(column) = self.column {
            write!(f, ":{column}")?;
        }
        Ok(())
    }
}
