//! # sextant-core
//!
//! Debug-info object model and source-location resolution for Sextant.
//!
//! This crate owns the symbol layer of the debugger, including:
//! - Modules and their compile units
//! - Lazily parsed per-unit facets (line tables, functions, support files,
//!   variables, macro tables, imported modules)
//! - Address and file/line queries resolving into symbol contexts
//! - A DWARF-backed [`symbols::SymbolProvider`] built on `gimli` and `object`
//!
//! ## Lazy parsing
//!
//! A [`symbols::CompileUnit`] starts as little more than an id and a primary
//! source file. Each facet is materialized on first access by asking the
//! module's provider exactly once; the attempted/present distinction lets a
//! unit remember that a facet was searched for and is genuinely absent.

pub mod dwarf;
pub mod error;
pub mod symbols;
pub mod types;

// Re-export commonly used types
pub use error::{SextantError, SextantResult};
pub use symbols::{CompileUnit, CompileUnitId, Module, ResolveScope, SymbolContext, SymbolContextList};
pub use types::{Address, AddressRange, FileSpec, SourceLocationSpec};
