//! # Compile Units
//!
//! One translation unit of a compiled binary, as described by its debug
//! info: a primary source file, a line table, support files, functions with
//! their lexical blocks, unit-scope variables, macro data, and imported
//! modules.
//!
//! ## Lazy population
//!
//! Parsing debug info is expensive and most units are never queried, so
//! every facet is populated on first use through the module's
//! [`SymbolProvider`]. Each facet pairs its value with an *attempted* flag:
//! "never asked" is different from "asked and the provider had nothing",
//! and a failed parse is never retried. Setters re-arm a facet by assigning
//! `None`, which clears the flag.
//!
//! The function registry is the exception: providers register functions
//! incrementally as they discover them, so it has no attempted flag and is
//! never wholesale-replaced. Operations that need the complete set (address
//! lookup, predicate search) force a full parse first; providers make the
//! repeat calls cheap.
//!
//! ## Queries
//!
//! [`CompileUnit::resolve_symbol_context`] answers "where is file F, line L
//! (column C)?" including positions that only exist in this unit as inlined
//! call sites. [`CompileUnit::find_line_entry`] is the single-row helper
//! under it. Getters take `&mut self` (lazy population mutates); the owning
//! [`Module`] serializes shared access with one lock per unit.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Weak};

use smallvec::SmallVec;

use crate::symbols::context::{ResolveScope, SymbolContext, SymbolContextList};
use crate::symbols::debug_macros::DebugMacros;
use crate::symbols::function::{Block, BlockId, Function, FunctionId};
use crate::symbols::line_table::{LineEntry, LineTable};
use crate::symbols::module::Module;
use crate::symbols::provider::SymbolProvider;
use crate::symbols::support_files::{RealpathPrefixes, SupportFileList};
use crate::symbols::variable::VariableList;
use crate::types::{Address, Declaration, FileSpec, Language, SourceLocationSpec};

/// Unique identifier for a compile unit within its module.
///
/// Assigned by the symbol provider; for DWARF this is the unit's
/// `.debug_info` offset, which is stable across parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompileUnitId(u64);

impl CompileUnitId
{
    /// Create a new identifier from a raw value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self
    {
        Self(value)
    }

    /// Get the raw numeric representation (useful for logging / errors).
    #[must_use]
    pub const fn raw(self) -> u64
    {
        self.0
    }
}

/// A module imported by a compile unit (`use`, `@import`, clang module).
#[derive(Debug, Clone, Default)]
pub struct SourceModule
{
    /// Module path as written in source, components joined with `.`.
    pub name: String,
    /// Where the import appears, if recorded.
    pub declaration: Option<Declaration>,
    /// Search path hint for locating the module's own debug info.
    pub search_path: Option<FileSpec>,
}

/// A lazily parsed facet: the value (if any) plus whether a parse was ever
/// attempted. Keeps "absent because nobody asked" distinct from "absent
/// because the provider had nothing".
#[derive(Debug, Default)]
struct LazilyParsed<T>
{
    value: Option<T>,
    attempted: bool,
}

impl<T> LazilyParsed<T>
{
    fn preset(value: Option<T>) -> Self
    {
        Self {
            attempted: value.is_some(),
            value,
        }
    }

    fn value(&self) -> Option<&T>
    {
        self.value.as_ref()
    }

    fn attempted(&self) -> bool
    {
        self.attempted
    }

    fn needs_parse(&self) -> bool
    {
        self.value.is_none() && !self.attempted
    }

    fn mark_attempted(&mut self)
    {
        self.attempted = true;
    }

    /// Stash a parse result without touching the attempted flag.
    fn store(&mut self, value: T)
    {
        self.value = Some(value);
    }

    /// Setter semantics: a value marks the facet attempted, `None` re-arms it.
    fn assign(&mut self, value: Option<T>)
    {
        self.attempted = value.is_some();
        self.value = value;
    }

    fn value_or_default(&mut self) -> &T
    where
        T: Default,
    {
        self.value.get_or_insert_with(T::default)
    }
}

/// One translation unit of a binary's debug info.
///
/// Owned by exactly one [`Module`]; holds a back-reference to it for
/// provider access and diagnostics. See the module docs for the lazy
/// population rules.
#[derive(Debug)]
pub struct CompileUnit
{
    module: Weak<Module>,
    id: CompileUnitId,
    primary_file: FileSpec,
    language: LazilyParsed<Language>,
    is_optimized: LazilyParsed<bool>,
    line_table: LazilyParsed<LineTable>,
    support_files: LazilyParsed<SupportFileList>,
    debug_macros: LazilyParsed<Arc<DebugMacros>>,
    variables: LazilyParsed<Arc<VariableList>>,
    imported_modules: LazilyParsed<Vec<SourceModule>>,
    functions_by_id: BTreeMap<FunctionId, Arc<Function>>,
}

impl CompileUnit
{
    /// Create a compile unit owned by `module`.
    ///
    /// ## Parameters
    ///
    /// - `module`: The owning image; the unit keeps only a weak reference
    /// - `id`: Provider-assigned stable id
    /// - `primary_file`: The unit's main source file
    /// - `language`: Pass `Some` when already known to pre-populate the
    ///   facet; `None` defers to the provider
    /// - `is_optimized`: Same contract as `language`
    #[must_use]
    pub fn new(module: &Arc<Module>, id: CompileUnitId, primary_file: FileSpec, language: Option<Language>, is_optimized: Option<bool>) -> Self
    {
        Self {
            module: Arc::downgrade(module),
            id,
            primary_file,
            language: LazilyParsed::preset(language),
            is_optimized: LazilyParsed::preset(is_optimized),
            line_table: LazilyParsed::default(),
            support_files: LazilyParsed::default(),
            debug_macros: LazilyParsed::default(),
            variables: LazilyParsed::default(),
            imported_modules: LazilyParsed::default(),
            functions_by_id: BTreeMap::new(),
        }
    }

    /// Stable identifier assigned by the symbol provider.
    pub fn id(&self) -> CompileUnitId
    {
        self.id
    }

    /// The unit's main source file.
    pub fn primary_file(&self) -> &FileSpec
    {
        &self.primary_file
    }

    /// The owning module, if it is still alive.
    pub fn module(&self) -> Option<Arc<Module>>
    {
        self.module.upgrade()
    }

    fn symbol_provider(&self) -> Option<Arc<dyn SymbolProvider>>
    {
        self.module.upgrade().and_then(|module| module.symbol_provider())
    }

    /// Source language, resolving it through the provider on first call.
    /// Returns [`Language::Unknown`] when the provider can't tell either.
    pub fn language(&mut self) -> Language
    {
        if self.language.needs_parse() {
            self.language.mark_attempted();
            if let Some(provider) = self.symbol_provider() {
                if let Some(language) = provider.parse_language(self) {
                    self.language.store(language);
                }
            }
        }
        self.language.value().copied().unwrap_or(Language::Unknown)
    }

    /// Whether the unit was compiled with optimization, asking the provider
    /// on first call. Unanswerable means `false`.
    pub fn is_optimized(&mut self) -> bool
    {
        if self.is_optimized.needs_parse() {
            self.is_optimized.mark_attempted();
            let optimized = self.symbol_provider().is_some_and(|provider| provider.parse_is_optimized(self));
            self.is_optimized.store(optimized);
        }
        self.is_optimized.value().copied().unwrap_or(false)
    }

    /// The unit's line table, parsing it on first call.
    pub fn line_table(&mut self) -> Option<&LineTable>
    {
        if self.line_table.needs_parse() {
            self.line_table.mark_attempted();
            if let Some(provider) = self.symbol_provider() {
                provider.parse_line_table(self);
            }
        }
        self.line_table.value()
    }

    /// The line table only if it is already resident; never parses.
    pub fn line_table_if_parsed(&self) -> Option<&LineTable>
    {
        self.line_table.value()
    }

    /// Install (or clear) the line table. Clearing re-arms lazy parsing.
    pub fn set_line_table(&mut self, line_table: Option<LineTable>)
    {
        self.line_table.assign(line_table);
    }

    /// The unit's macro data, parsing it on first call.
    pub fn debug_macros(&mut self) -> Option<Arc<DebugMacros>>
    {
        if self.debug_macros.needs_parse() {
            self.debug_macros.mark_attempted();
            if let Some(provider) = self.symbol_provider() {
                provider.parse_debug_macros(self);
            }
        }
        self.debug_macros.value().cloned()
    }

    /// Install (or clear) macro data. Clearing re-arms lazy parsing.
    pub fn set_debug_macros(&mut self, debug_macros: Option<Arc<DebugMacros>>)
    {
        self.debug_macros.assign(debug_macros);
    }

    /// Unit-scope variables, parsing them on first call.
    pub fn variables(&mut self) -> Option<Arc<VariableList>>
    {
        if self.variables.needs_parse() {
            self.variables.mark_attempted();
            if let Some(provider) = self.symbol_provider() {
                provider.parse_variables(self);
            }
        }
        self.variables.value().cloned()
    }

    /// Unit-scope variables only if already resident; never parses.
    pub fn variables_if_parsed(&self) -> Option<Arc<VariableList>>
    {
        self.variables.value().cloned()
    }

    /// Install (or clear) the variable list. Clearing re-arms lazy parsing.
    pub fn set_variables(&mut self, variables: Option<Arc<VariableList>>)
    {
        self.variables.assign(variables);
    }

    /// The support file registry, parsing it on first call.
    ///
    /// An empty registry counts as absent, so a unit constructed with no
    /// files still gets one provider callback.
    pub fn support_files(&mut self) -> &SupportFileList
    {
        let absent = self.support_files.value().map_or(true, SupportFileList::is_empty);
        if absent && !self.support_files.attempted() {
            self.support_files.mark_attempted();
            if let Some(provider) = self.symbol_provider() {
                let mut files = SupportFileList::new();
                provider.parse_support_files(self, &mut files);
                self.support_files.store(files);
            }
        }
        self.support_files.value_or_default()
    }

    /// Install support files eagerly (used when the provider already has
    /// them at unit creation). Does not mark the facet attempted: emptiness
    /// keeps controlling whether a lazy parse still happens.
    pub fn set_support_files(&mut self, files: SupportFileList)
    {
        self.support_files.store(files);
    }

    /// Modules this unit imports, parsing them on first call.
    pub fn imported_modules(&mut self) -> &[SourceModule]
    {
        let absent = self.imported_modules.value().map_or(true, Vec::is_empty);
        if absent && !self.imported_modules.attempted() {
            self.imported_modules.mark_attempted();
            if let Some(provider) = self.symbol_provider() {
                let mut imported = Vec::new();
                provider.parse_imported_modules(self, &mut imported);
                self.imported_modules.store(imported);
            }
        }
        match self.imported_modules.value() {
            Some(modules) => modules,
            None => &[],
        }
    }

    /// Register a function. A function with the same id replaces the old one.
    pub fn add_function(&mut self, function: Arc<Function>)
    {
        self.functions_by_id.insert(function.id(), function);
    }

    /// Function with the given id, if registered.
    pub fn find_function_by_id(&self, id: FunctionId) -> Option<Arc<Function>>
    {
        self.functions_by_id.get(&id).cloned()
    }

    /// Number of currently registered functions. Reflects only what has
    /// been parsed so far.
    pub fn num_functions(&self) -> usize
    {
        self.functions_by_id.len()
    }

    /// Visit registered functions in ascending id order; `visit` returns
    /// `true` to stop. Does not trigger parsing.
    pub fn for_each_function(&self, mut visit: impl FnMut(&Arc<Function>) -> bool)
    {
        for function in self.functions_by_id.values() {
            if visit(function) {
                return;
            }
        }
    }

    /// First function satisfying `predicate`, in ascending id order.
    ///
    /// The registry fills incrementally, so this forces a full function
    /// parse before searching; without a provider there is nothing reliable
    /// to search and the answer is `None`.
    pub fn find_function(&mut self, mut predicate: impl FnMut(&Arc<Function>) -> bool) -> Option<Arc<Function>>
    {
        let provider = self.symbol_provider()?;
        provider.parse_functions(self);
        self.functions_by_id.values().find(|function| predicate(function)).cloned()
    }

    /// Visit modules this unit pulls in from elsewhere (split debug info,
    /// importable module files). Delegates to the provider; `visited` guards
    /// against revisiting shared dependencies. Returns whether `visit`
    /// stopped the walk.
    pub fn for_each_external_module(&mut self, visited: &mut HashSet<PathBuf>, visit: &mut dyn FnMut(&Module) -> bool) -> bool
    {
        if let Some(provider) = self.symbol_provider() {
            return provider.for_each_external_module(self, visited, visit);
        }
        false
    }

    /// Every support-file index compatible with `file`.
    fn find_file_indexes(&mut self, file: &FileSpec, realpath_prefixes: Option<&RealpathPrefixes>) -> SmallVec<[u32; 1]>
    {
        let mut result = SmallVec::new();
        let files = self.support_files();
        let mut idx = 0;
        while let Some(found) = files.find_compatible_index(idx, file, realpath_prefixes) {
            result.push(u32::try_from(found).unwrap_or(u32::MAX));
            idx = found + 1;
        }
        result
    }

    /// File spec for a line entry's file index. Only meaningful for indexes
    /// produced by this unit's own support files.
    fn file_spec_for_index(&self, file_index: u32) -> Option<FileSpec>
    {
        self.support_files.value().and_then(|files| files.get(file_index as usize)).cloned()
    }

    /// The function whose range contains `address`, forcing a full function
    /// parse first.
    fn function_containing(&mut self, address: Address) -> Option<Arc<Function>>
    {
        if let Some(provider) = self.symbol_provider() {
            provider.parse_functions(self);
        }
        self.functions_by_id.values().find(|function| function.range().contains(address)).cloned()
    }

    /// Resolve `address` against this unit alone, filling `context` per the
    /// scope mask. Returns whether this unit claims the address (some
    /// registered function's range contains it).
    pub(crate) fn resolve_address_within(&mut self, address: Address, scope: ResolveScope, context: &mut SymbolContext) -> bool
    {
        let Some(function) = self.function_containing(address) else {
            return false;
        };
        context.module = self.module.upgrade();
        context.compile_unit = Some(self.id);
        if scope.contains(ResolveScope::FUNCTION) || scope.contains(ResolveScope::BLOCK) {
            context.function = Some(function.clone());
        }
        if scope.contains(ResolveScope::BLOCK) {
            context.block = function.block_containing_address(address);
        }
        if scope.contains(ResolveScope::LINE_ENTRY) {
            context.line_entry = self.line_table().and_then(|table| table.entry_for_address(address)).map(|(_, entry)| *entry);
        }
        if scope.contains(ResolveScope::SYMBOL) {
            if let Some(module) = &context.module {
                context.symbol = module.symbol_table().and_then(|table| table.symbol_for_address(address)).cloned();
            }
        }
        true
    }

    /// Resolve an address from this unit's own line table back to a full
    /// context: this unit first, then the module's other units.
    fn resolve_entry_address(&mut self, address: Address, scope: ResolveScope, context: &mut SymbolContext)
    {
        if self.resolve_address_within(address, scope, context) {
            return;
        }
        if let Some(module) = self.module.upgrade() {
            module.resolve_address_excluding_unit(address, scope, self.id, context);
        }
    }

    /// Find line-table rows for `line`, searching from `start_idx`.
    ///
    /// The search is restricted to `file_spec` (the unit's primary file when
    /// `None`) and never considers inlined occurrences. `exact` disables the
    /// nearest-following-line fallback. Restart just past a hit to enumerate
    /// every matching row.
    pub fn find_line_entry(&mut self, start_idx: usize, line: u32, file_spec: Option<&FileSpec>, exact: bool) -> Option<(usize, LineEntry)>
    {
        let file_spec = file_spec.cloned().unwrap_or_else(|| self.primary_file.clone());
        let file_indexes = self.find_file_indexes(&file_spec, None);
        if file_indexes.is_empty() {
            return None;
        }

        let location = SourceLocationSpec::new(file_spec, Some(line), None, false, exact);
        self.line_table()?;
        self.line_table
            .value()
            .and_then(|table| table.find_line_entry_index_by_file_index(start_idx, &file_indexes, &location))
    }

    /// Resolve a source location against this unit, appending every answer
    /// to `results`.
    ///
    /// The resolution pipeline:
    ///
    /// 1. File gate: a query file that matches neither the primary file nor
    ///    (when `check_inlines` is set) potentially inlined files produces
    ///    nothing.
    /// 2. A query without a line answers with a bare unit context (primary
    ///    file matches only).
    /// 3. The query file is resolved to support-file indexes; matching any
    ///    commits the provider to loading full debug info for this module.
    /// 4. The line table is searched for the first row at-or-after the
    ///    requested position.
    /// 5. If the row found is *not* on the requested position and inlined
    ///    occurrences were requested, the block tree of the function
    ///    containing that row is scanned for an inlined call site equal to
    ///    the query; a hit resolves at the *calling* block's start address
    ///    with the call site's line and column patched into the line entry.
    ///    Call-site hits supersede the line-table rows entirely.
    /// 6. Otherwise each matching row is resolved back through its address
    ///    into a full context. A row that resolves into a different unit
    ///    (overlapping ranges after link-time optimization) degrades
    ///    silently to a unit+line-entry context; a row that resolves
    ///    nowhere degrades the same way after reporting one diagnostic
    ///    through the module.
    ///
    /// ## Parameters
    ///
    /// - `location`: What to look for and how strictly
    /// - `scope`: Which context facets the caller wants filled
    /// - `results`: Append-only accumulator, shared across units
    /// - `realpath_prefixes`: Optional symlink-resolution hints for the
    ///   support file comparison
    pub fn resolve_symbol_context(
        &mut self,
        location: &SourceLocationSpec,
        scope: ResolveScope,
        results: &mut SymbolContextList,
        realpath_prefixes: Option<&RealpathPrefixes>,
    )
    {
        let file_spec = location.file_spec().clone();
        let requested_column = location.column().unwrap_or(0);
        let check_inlines = location.check_inlines();

        let file_spec_matches_unit = FileSpec::matches(&file_spec, &self.primary_file);
        if !file_spec_matches_unit && !check_inlines {
            return;
        }

        let mut unit_context = SymbolContext::new();
        unit_context.module = self.module.upgrade();
        unit_context.compile_unit = Some(self.id);

        let Some(requested_line) = location.line() else {
            // Whole-unit query: only a primary-file match answers it, and
            // inline searches have nothing to add without a line.
            if file_spec_matches_unit && !check_inlines {
                results.push(unit_context);
            }
            return;
        };

        let file_indexes = self.find_file_indexes(&file_spec, realpath_prefixes);
        if file_indexes.is_empty() {
            return;
        }

        // A matching source file makes this unit worth full debug info.
        if let Some(provider) = self.symbol_provider() {
            provider.set_load_debug_info_enabled();
        }

        if self.line_table().is_none() {
            if file_spec_matches_unit && !check_inlines {
                results.push(unit_context);
            }
            return;
        }

        let first_match = self
            .line_table
            .value()
            .and_then(|table| table.find_line_entry_index_by_file_index(0, &file_indexes, location));

        // The requested position may exist in this unit only as an inlined
        // call site, which contributes no line-table row of its own. If the
        // row we found is off the requested position, look for a call site
        // before settling for it. A function inlined somewhere contributes
        // at least one non-call-site row to the table, so the search stays
        // within the function containing the row we found; functions whose
        // only trace is a call-site row are missed.
        if let Some((_, entry)) = first_match {
            let off_position = entry.line != requested_line || (requested_column != 0 && entry.column != requested_column);
            if off_position && scope.contains(ResolveScope::LINE_ENTRY) && check_inlines {
                let old_len = results.len();
                let sought = Declaration::new(file_spec.clone(), requested_line, requested_column);
                if let Some(function) = self.function_containing(entry.range.base()) {
                    self.examine_blocks_for_call_site(&function, BlockId::ROOT, &sought, location, scope, results);
                }
                // An exact call-site hit beats inexact line-table rows.
                if results.len() > old_len {
                    return;
                }
            }
        }

        let Some((mut line_idx, mut entry)) = first_match else {
            return;
        };

        // Every further row must repeat the *found* position exactly; the
        // found column only binds when the query asked for one.
        let found_file = self.file_spec_for_index(entry.file_index).unwrap_or(file_spec);
        let found_column = location.column().map(|_| entry.column);
        let found_location = SourceLocationSpec::new(found_file, Some(entry.line), found_column, false, true);

        loop {
            let mut bare = unit_context.clone();
            bare.line_entry = Some(entry);

            if scope == ResolveScope::LINE_ENTRY {
                results.push(bare);
            } else {
                let mut resolved = SymbolContext::new();
                self.resolve_entry_address(entry.range.base(), scope, &mut resolved);
                if resolved.compile_unit == Some(self.id) {
                    results.push(resolved);
                } else {
                    // Overlapping address ranges after link-time optimization
                    // legitimately resolve into another unit; keep the line
                    // info we have. Resolving *nowhere* means the debug info
                    // is damaged, which deserves one visible report.
                    if resolved.compile_unit.is_none() {
                        if let Some(module) = self.module.upgrade() {
                            module.report_error(format!(
                                "unable to resolve a line table file address {} back to a compile unit; debug info is probably damaged",
                                entry.range.base()
                            ));
                        }
                    }
                    results.push(bare);
                }
            }

            match self
                .line_table
                .value()
                .and_then(|table| table.find_line_entry_index_by_file_index(line_idx + 1, &file_indexes, &found_location))
            {
                Some((next_idx, next_entry)) => {
                    line_idx = next_idx;
                    entry = next_entry;
                }
                None => break,
            }
        }
    }

    /// Depth-first call-site scan under `block_id`, appending a context for
    /// every inlined block whose call site equals `sought`.
    fn examine_blocks_for_call_site(
        &mut self,
        function: &Arc<Function>,
        block_id: BlockId,
        sought: &Declaration,
        location: &SourceLocationSpec,
        scope: ResolveScope,
        results: &mut SymbolContextList,
    )
    {
        let Some(block) = function.block(block_id) else {
            return;
        };
        for &child_id in block.children() {
            let Some(child) = function.block(child_id) else {
                continue;
            };
            if let Some(inline_info) = child.inline_info() {
                // The recorded call site normally has a column; the query
                // may not. An absent query column is a wildcard.
                let found_decl = inline_info.call_site();
                let sought_column = sought.column();
                if found_decl.file_and_line_equal(sought, false) && (sought_column == 0 || sought_column == found_decl.column()) {
                    // The call site belongs to the block that inlined the
                    // call, not to the inlined body itself.
                    let parent_start = child.parent().and_then(|parent_id| function.block(parent_id)).and_then(Block::start_address);
                    if let Some(parent_start) = parent_start {
                        let mut resolved = SymbolContext::new();
                        self.resolve_entry_address(parent_start, scope, &mut resolved);

                        let mut call_site_line = resolved.line_entry.unwrap_or_default();
                        call_site_line.line = found_decl.line();
                        call_site_line.column = found_decl.column();

                        let mut matches_spec = true;
                        if location.exact_match() {
                            // A file index is only meaningful within the unit
                            // that produced it.
                            let resolved_file = resolved
                                .line_entry
                                .filter(|_| resolved.compile_unit == Some(self.id))
                                .and_then(|resolved_entry| self.file_spec_for_index(resolved_entry.file_index));
                            matches_spec = resolved_file.is_some_and(|file| *location.file_spec() == file)
                                && location.line() == Some(call_site_line.line)
                                && location.column() == Some(call_site_line.column);
                        }

                        if matches_spec {
                            if let Some(range) = child.range_at(0) {
                                call_site_line.range = range;
                                let mut call_site_context = resolved;
                                call_site_context.line_entry = Some(call_site_line);
                                results.push(call_site_context);
                            }
                        }
                    }
                }
            }
            self.examine_blocks_for_call_site(function, child_id, sought, location, scope, results);
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_lazily_parsed_lifecycle()
    {
        let mut cell: LazilyParsed<u32> = LazilyParsed::default();
        assert!(cell.needs_parse());
        cell.mark_attempted();
        assert!(!cell.needs_parse());
        assert_eq!(cell.value(), None);

        cell.store(7);
        assert_eq!(cell.value(), Some(&7));
    }

    #[test]
    fn test_assign_none_re_arms_parsing()
    {
        let mut cell: LazilyParsed<u32> = LazilyParsed::preset(Some(7));
        assert!(!cell.needs_parse());
        cell.assign(None);
        assert!(cell.needs_parse());
        cell.assign(Some(9));
        assert!(!cell.needs_parse());
        assert!(cell.attempted());
    }

    #[test]
    fn test_preset_without_value_stays_unattempted()
    {
        let cell: LazilyParsed<u32> = LazilyParsed::preset(None);
        assert!(cell.needs_parse());
        assert!(!cell.attempted());
    }
}
