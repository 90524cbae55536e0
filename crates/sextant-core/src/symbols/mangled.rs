//! Mangled symbol names and demangling.
//!
//! Compilers "mangle" symbol names to encode type information and namespaces.
//! This module pairs a raw linkage name with its demangled form and a
//! language guess derived from the mangling pattern:
//!
//! - **Rust**: v0 mangling (`_R...`) or legacy (`_ZN...`), demangled via
//!   `rustc_demangle`
//! - **C++**: Itanium ABI mangling (`_Z...`)
//! - **C**: Typically unmangled (global symbols)

use std::fmt;

use rustc_demangle::try_demangle;

use crate::types::Language;

/// A function or symbol name with demangling metadata.
///
/// Carries both spellings so lookups can match on the raw linkage name while
/// presentation code shows the demangled one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mangled
{
    raw: String,
    demangled: Option<String>,
}

impl Mangled
{
    /// Construct from a raw linkage name, demangling it if possible.
    ///
    /// ## Parameters
    ///
    /// - `raw`: The raw (possibly mangled) symbol name from the binary
    ///
    /// ## Example
    ///
    /// ```rust
    /// use sextant_core::symbols::Mangled;
    ///
    /// let name = Mangled::from_raw("main".to_string());
    /// assert_eq!(name.display_name(), "main");
    /// ```
    #[must_use]
    pub fn from_raw(raw: String) -> Self
    {
        let demangled = try_demangle(&raw).ok().map(|d| d.to_string());
        Self { raw, demangled }
    }

    /// Raw (mangled) name emitted in the object file.
    pub fn raw(&self) -> &str
    {
        &self.raw
    }

    /// Demangled human-friendly name if available.
    pub fn demangled(&self) -> Option<&str>
    {
        self.demangled.as_deref()
    }

    /// Preferred presentation (demangled fallback to raw).
    pub fn display_name(&self) -> &str
    {
        self.demangled.as_deref().unwrap_or(&self.raw)
    }

    /// Guess the source language from the mangling pattern.
    ///
    /// Rust symbols start with `_R` or `_ZN` (or contain `::` once
    /// demangled); C++ symbols use bare Itanium `_Z` mangling; anything else
    /// is reported as unknown rather than assumed to be C.
    pub fn guess_language(&self) -> Language
    {
        if self.raw.starts_with("_R") || self.raw.starts_with("_ZN") || self.raw.contains("::") {
            Language::Rust
        } else if self.raw.starts_with("_Z") {
            Language::Cpp
        } else {
            Language::Unknown
        }
    }
}

impl From<&str> for Mangled
{
    fn from(raw: &str) -> Self
    {
        Mangled::from_raw(raw.to_string())
    }
}

impl fmt::Display for Mangled
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.display_name())
    }
}
