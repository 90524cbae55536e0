//! # Error Types
//!
//! General error handling for the symbol layer.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! Note that *lookup misses are not errors*: a query that finds nothing
//! produces an empty result list or `None`. The variants here cover the
//! fallible edges — opening binaries, decoding object containers, and
//! walking malformed DWARF.

use thiserror::Error;

/// Main error type for symbol-layer operations
///
/// This enum represents all the ways loading and decoding debug info can
/// fail. Each variant corresponds to a specific stage of getting from a path
/// on disk to a queryable module.
#[derive(Error, Debug)]
pub enum SextantError
{
    /// The object container could not be parsed
    ///
    /// This happens when:
    /// - The file is not an ELF/Mach-O/PE image at all
    /// - The image is truncated or corrupt
    /// - The architecture or container flavor is unsupported by the reader
    #[error("Failed to parse object file {path}: {message}")]
    ObjectParse
    {
        /// Path of the image that failed to parse
        path: String,
        /// Parser-reported reason
        message: String,
    },

    /// DWARF data inside the image could not be decoded
    ///
    /// The `context` names the structure being read when decoding stopped
    /// (a section, a unit header, an abbreviation table). Malformed debug
    /// info in *one* structure is reported through this error only when the
    /// whole load cannot continue; localized damage degrades to missing
    /// facets instead.
    #[error("{context}: {message}")]
    Dwarf
    {
        /// What was being decoded
        context: String,
        /// Decoder-reported reason
        message: String,
    },

    /// Invalid argument passed to a symbol-layer function
    ///
    /// Examples:
    /// - A compile-unit id that does not exist in the module
    /// - An empty path
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error (for file operations, etc.)
    ///
    /// Used for errors when reading image files from disk.
    /// This is a standard Rust `std::io::Error` converted to our error type.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, SextantError>`
///
/// ```rust
/// use sextant_core::error::SextantResult;
/// fn foo() -> SextantResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type SextantResult<T> = std::result::Result<T, SextantError>;
