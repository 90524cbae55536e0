//! Source language classification.

use std::fmt;

/// Programming language a compile unit or symbol was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language
{
    /// Rust (detected via `DW_AT_language` or mangling patterns).
    Rust,
    /// C++ (any standard revision, or Itanium mangling without Rust extensions).
    Cpp,
    /// C (any standard revision) or unmangled global.
    C,
    /// Unknown or mixed language.
    Unknown,
}

impl fmt::Display for Language
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            Language::Rust => "rust",
            Language::Cpp => "c++",
            Language::C => "c",
            Language::Unknown => "unknown",
        };
        write!(f, "{label}")
    }
}
