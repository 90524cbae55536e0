//! # Symbol Provider Trait
//!
//! The interface between the compile-unit model and whatever format the
//! debug info actually lives in.
//!
//! The model is format-agnostic: a [`CompileUnit`](crate::symbols::CompileUnit)
//! knows *that* it has a line table, not *where* it comes from. Each provider
//! implementation (DWARF here; PDB or a test double elsewhere) knows how to
//! produce the facets on demand. Lazy getters on the unit call into the
//! provider exactly once per facet; the provider pushes results back through
//! the unit's setters or the explicit out-parameters.
//!
//! ## Idempotence
//!
//! Parse calls must be safe to repeat. `parse_functions` in particular is
//! invoked by every address lookup and every predicate search; a provider
//! that has already materialized a unit's functions answers again from its
//! own records (or re-registers the same ids, which the registry treats as
//! overwrites).

use std::collections::HashSet;
use std::path::PathBuf;

use crate::symbols::compile_unit::{CompileUnit, SourceModule};
use crate::symbols::module::Module;
use crate::symbols::support_files::SupportFileList;
use crate::types::Language;

/// Produces the lazily parsed facets of compile units.
///
/// Implementations are shared behind `Arc` and may be called from any thread
/// holding a unit's lock, so they must be `Send + Sync` and keep their own
/// interior state locked.
pub trait SymbolProvider: Send + Sync
{
    /// Determine the unit's source language, or `None` if undeterminable.
    fn parse_language(&self, unit: &mut CompileUnit) -> Option<Language>;

    /// Determine whether the unit was compiled with optimization.
    fn parse_is_optimized(&self, unit: &mut CompileUnit) -> bool;

    /// Materialize every function of the unit into its registry via
    /// [`CompileUnit::add_function`].
    fn parse_functions(&self, unit: &mut CompileUnit);

    /// Build the unit's line table and install it via
    /// [`CompileUnit::set_line_table`]. Leaving the unit untouched records
    /// the attempt with no table.
    fn parse_line_table(&self, unit: &mut CompileUnit);

    /// Parse preprocessor macro data and install it via
    /// [`CompileUnit::set_debug_macros`]. Providers without macro data do
    /// nothing.
    fn parse_debug_macros(&self, unit: &mut CompileUnit);

    /// Fill `files` with the unit's support files, index-aligned with the
    /// file indexes the line table uses.
    fn parse_support_files(&self, unit: &mut CompileUnit, files: &mut SupportFileList);

    /// Parse unit-scope variables and install them via
    /// [`CompileUnit::set_variables`].
    fn parse_variables(&self, unit: &mut CompileUnit);

    /// Fill `imported` with the unit's imported-module records.
    fn parse_imported_modules(&self, unit: &mut CompileUnit, imported: &mut Vec<SourceModule>);

    /// Commit to loading full debug info for the unit's module.
    ///
    /// On-demand providers defer expensive parsing until a query proves the
    /// module relevant (a file gate match does exactly that). The default
    /// implementation does nothing.
    fn set_load_debug_info_enabled(&self) {}

    /// Visit modules this unit pulls in from elsewhere (split debug info,
    /// importable module files).
    ///
    /// `visited` guards against revisiting shared dependencies; `visit`
    /// returns `true` to stop early. Returns whether the walk was stopped.
    /// The default implementation has no external modules.
    fn for_each_external_module(
        &self,
        unit: &mut CompileUnit,
        visited: &mut HashSet<PathBuf>,
        visit: &mut dyn FnMut(&Module) -> bool,
    ) -> bool
    {
        let _ = (unit, visited, visit);
        false
    }
}
