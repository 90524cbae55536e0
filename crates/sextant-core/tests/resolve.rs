//! Tests for source-location and address resolution

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sextant_core::symbols::{
    BlockId, CompileUnit, CompileUnitId, Function, FunctionId, InlineFunctionInfo, LineEntry, LineTable, Mangled, Module,
    ResolveScope, SourceModule, SupportFileList, Symbol, SymbolContext, SymbolContextList, SymbolProvider, SymbolTable,
};
use sextant_core::types::{Address, AddressRange, Declaration, FileSpec, Language, SourceLocationSpec};

const MAIN_UNIT: CompileUnitId = CompileUnitId::from_raw(0x10);
const SIBLING_UNIT: CompileUnitId = CompileUnitId::from_raw(0x20);

struct UnitFixture
{
    support_files: Vec<FileSpec>,
    entries: Vec<LineEntry>,
    functions: Vec<Function>,
}

/// A provider serving canned per-unit debug info, with a flag recording
/// whether some query committed the module to full debug info.
struct FixtureProvider
{
    units: HashMap<CompileUnitId, UnitFixture>,
    load_debug_info: AtomicBool,
}

impl SymbolProvider for FixtureProvider
{
    fn parse_language(&self, _unit: &mut CompileUnit) -> Option<Language>
    {
        Some(Language::C)
    }

    fn parse_is_optimized(&self, _unit: &mut CompileUnit) -> bool
    {
        false
    }

    fn parse_functions(&self, unit: &mut CompileUnit)
    {
        if let Some(fixture) = self.units.get(&unit.id()) {
            for function in &fixture.functions {
                unit.add_function(Arc::new(function.clone()));
            }
        }
    }

    fn parse_line_table(&self, unit: &mut CompileUnit)
    {
        if let Some(fixture) = self.units.get(&unit.id()) {
            if !fixture.entries.is_empty() {
                unit.set_line_table(Some(LineTable::from_entries(fixture.entries.clone())));
            }
        }
    }

    fn parse_debug_macros(&self, _unit: &mut CompileUnit) {}

    fn parse_support_files(&self, unit: &mut CompileUnit, files: &mut SupportFileList)
    {
        if let Some(fixture) = self.units.get(&unit.id()) {
            for file in &fixture.support_files {
                files.append(file.clone());
            }
        }
    }

    fn parse_variables(&self, _unit: &mut CompileUnit) {}

    fn parse_imported_modules(&self, _unit: &mut CompileUnit, _imported: &mut Vec<SourceModule>) {}

    fn set_load_debug_info_enabled(&self)
    {
        self.load_debug_info.store(true, Ordering::SeqCst);
    }
}

fn range(base: u64, size: u64) -> AddressRange
{
    AddressRange::new(Address::new(base), size)
}

fn entry(base: u64, file_index: u32, line: u32, column: u16) -> LineEntry
{
    LineEntry::new(range(base, 0x10), file_index, line, column)
}

fn build_module(units: Vec<(CompileUnitId, &str, UnitFixture)>) -> (Arc<Module>, Arc<FixtureProvider>)
{
    let module = Module::new(FileSpec::from_path("/bin/app"));
    let mut fixtures = HashMap::new();
    let mut primaries = Vec::new();
    for (id, primary, fixture) in units {
        fixtures.insert(id, fixture);
        primaries.push((id, primary.to_string()));
    }
    let provider = Arc::new(FixtureProvider {
        units: fixtures,
        load_debug_info: AtomicBool::new(false),
    });
    module.set_symbol_provider(provider.clone());
    for (id, primary) in primaries {
        let unit = CompileUnit::new(&module, id, FileSpec::from_path(&primary), Some(Language::C), Some(false));
        module.add_compile_unit(unit);
    }
    (module, provider)
}

/// One unit for `/src/main.c` whose function `main` carries a lexical scope
/// with an inlined call to `helper` at main.c:20:7. Line 20 itself has no
/// line-table row, so it is findable only through the call site.
fn inline_module() -> (Arc<Module>, Arc<FixtureProvider>, BlockId, BlockId)
{
    let mut function = Function::new(FunctionId::from_raw(1), Mangled::from("main"), range(0x1000, 0x50));
    let scope = function.add_block(BlockId::ROOT, vec![range(0x1010, 0x30)], None);
    let call_site = Declaration::new(FileSpec::from_path("/src/main.c"), 20, 7);
    let inlined = function.add_block(
        scope,
        vec![range(0x1020, 0x10)],
        Some(InlineFunctionInfo::new(Mangled::from("helper"), call_site)),
    );

    let fixture = UnitFixture {
        support_files: vec![FileSpec::from_path("/src/main.c"), FileSpec::from_path("/src/inline.h")],
        entries: vec![
            entry(0x1000, 0, 10, 0),
            entry(0x1010, 0, 12, 0),
            entry(0x1020, 0, 12, 0),
            entry(0x1030, 1, 5, 0),
            entry(0x1040, 0, 30, 0),
        ],
        functions: vec![function],
    };
    let (module, provider) = build_module(vec![(MAIN_UNIT, "/src/main.c", fixture)]);
    module.set_symbol_table(SymbolTable::from_symbols(vec![Symbol::new(Mangled::from("main"), range(0x1000, 0x50))]));
    (module, provider, scope, inlined)
}

fn location(file: &str, line: Option<u32>, column: Option<u16>, check_inlines: bool, exact: bool) -> SourceLocationSpec
{
    SourceLocationSpec::new(FileSpec::from_path(file), line, column, check_inlines, exact)
}

fn resolve(module: &Module, query: &SourceLocationSpec, scope: ResolveScope) -> SymbolContextList
{
    let mut results = SymbolContextList::new();
    module.resolve_symbol_contexts_for_location(query, scope, &mut results, None);
    results
}

#[test]
fn test_mismatched_file_without_inlines_is_ignored()
{
    let (module, _provider, _scope, _inlined) = inline_module();
    let query = location("/src/other.c", Some(10), None, false, false);
    assert!(resolve(&module, &query, ResolveScope::EVERYTHING).is_empty());
}

#[test]
fn test_line_less_query_yields_a_bare_unit_context()
{
    let (module, _provider, _scope, _inlined) = inline_module();

    let query = location("/src/main.c", None, None, false, false);
    let results = resolve(&module, &query, ResolveScope::EVERYTHING);
    assert_eq!(results.len(), 1);
    let context = results.get(0).unwrap();
    assert_eq!(context.compile_unit, Some(MAIN_UNIT));
    assert!(context.line_entry.is_none());
    assert!(context.function.is_none());

    // With inline checking the whole-unit shortcut does not apply.
    let query = location("/src/main.c", None, None, true, false);
    assert!(resolve(&module, &query, ResolveScope::EVERYTHING).is_empty());
}

#[test]
fn test_file_absent_from_the_unit_yields_nothing()
{
    let (module, _provider, _scope, _inlined) = inline_module();
    // check_inlines passes the primary-file gate, but no support file matches.
    let query = location("/src/missing.c", Some(10), None, true, false);
    assert!(resolve(&module, &query, ResolveScope::EVERYTHING).is_empty());
}

#[test]
fn test_rows_on_the_requested_line_become_full_contexts()
{
    let (module, _provider, scope, inlined) = inline_module();
    let query = location("/src/main.c", Some(12), None, false, false);
    let results = resolve(&module, &query, ResolveScope::EVERYTHING);

    // Line 12 has two rows; both come back, resolved through their addresses.
    assert_eq!(results.len(), 2);
    let first = results.get(0).unwrap();
    assert_eq!(first.compile_unit, Some(MAIN_UNIT));
    assert_eq!(first.function.as_ref().unwrap().display_name(), "main");
    assert_eq!(first.block, Some(scope));
    assert_eq!(first.line_entry.unwrap().range.base(), Address::new(0x1010));
    assert_eq!(first.symbol.as_ref().unwrap().name().raw(), "main");

    let second = results.get(1).unwrap();
    assert_eq!(second.block, Some(inlined));
    assert_eq!(second.line_entry.unwrap().range.base(), Address::new(0x1020));
}

#[test]
fn test_line_entry_scope_keeps_contexts_bare()
{
    let (module, _provider, _scope, _inlined) = inline_module();
    let query = location("/src/main.c", Some(12), None, false, false);
    let results = resolve(&module, &query, ResolveScope::LINE_ENTRY);

    assert_eq!(results.len(), 2);
    for context in &results {
        assert_eq!(context.compile_unit, Some(MAIN_UNIT));
        assert_eq!(context.line_entry.unwrap().line, 12);
        assert!(context.function.is_none());
        assert!(context.block.is_none());
        assert!(context.symbol.is_none());
    }
}

#[test]
fn test_inexact_query_slides_to_the_next_line()
{
    let (module, _provider, _scope, _inlined) = inline_module();
    let query = location("/src/main.c", Some(11), None, false, false);
    let results = resolve(&module, &query, ResolveScope::LINE_ENTRY);

    assert_eq!(results.len(), 2);
    for context in &results {
        assert_eq!(context.line_entry.unwrap().line, 12);
    }
}

#[test]
fn test_exact_query_misses_quietly()
{
    let (module, _provider, _scope, _inlined) = inline_module();
    let query = location("/src/main.c", Some(11), None, false, true);
    assert!(resolve(&module, &query, ResolveScope::EVERYTHING).is_empty());
}

#[test]
fn test_call_site_query_resolves_at_the_calling_block()
{
    let (module, _provider, scope, _inlined) = inline_module();
    let query = location("/src/main.c", Some(20), None, true, false);
    let results = resolve(&module, &query, ResolveScope::EVERYTHING);

    // The call site supersedes the line-30 row the table search slid to.
    assert_eq!(results.len(), 1);
    let context = results.get(0).unwrap();
    let line_entry = context.line_entry.unwrap();
    assert_eq!(line_entry.line, 20);
    assert_eq!(line_entry.column, 7);
    // The entry's range is the inlined body, not the calling block.
    assert_eq!(line_entry.range.base(), Address::new(0x1020));
    assert_eq!(line_entry.range.size(), 0x10);
    assert_eq!(context.compile_unit, Some(MAIN_UNIT));
    assert_eq!(context.function.as_ref().unwrap().display_name(), "main");
    assert_eq!(context.block, Some(scope));
}

#[test]
fn test_call_site_column_must_agree_when_given()
{
    let (module, _provider, _scope, _inlined) = inline_module();

    let matching = location("/src/main.c", Some(20), Some(7), true, false);
    let results = resolve(&module, &matching, ResolveScope::EVERYTHING);
    assert_eq!(results.len(), 1);
    assert_eq!(results.get(0).unwrap().line_entry.unwrap().column, 7);

    // No call site at column 9; the query falls through to the next row.
    let mismatching = location("/src/main.c", Some(20), Some(9), true, false);
    let results = resolve(&module, &mismatching, ResolveScope::EVERYTHING);
    assert_eq!(results.len(), 1);
    assert_eq!(results.get(0).unwrap().line_entry.unwrap().line, 30);
}

#[test]
fn test_call_site_search_requires_check_inlines()
{
    let (module, _provider, _scope, _inlined) = inline_module();
    let query = location("/src/main.c", Some(20), None, false, false);
    let results = resolve(&module, &query, ResolveScope::EVERYTHING);

    assert_eq!(results.len(), 1);
    assert_eq!(results.get(0).unwrap().line_entry.unwrap().line, 30);
}

#[test]
fn test_requested_column_binds_the_forward_scan()
{
    let fixture = UnitFixture {
        support_files: vec![FileSpec::from_path("/src/cols.c")],
        entries: vec![entry(0x100, 0, 20, 5), entry(0x110, 0, 20, 9), entry(0x120, 0, 20, 5)],
        functions: Vec::new(),
    };
    let (module, _provider) = build_module(vec![(MAIN_UNIT, "/src/cols.c", fixture)]);

    let with_column = location("/src/cols.c", Some(20), Some(5), false, false);
    let results = resolve(&module, &with_column, ResolveScope::LINE_ENTRY);
    assert_eq!(results.len(), 2);
    for context in &results {
        assert_eq!(context.line_entry.unwrap().column, 5);
    }

    let without_column = location("/src/cols.c", Some(20), None, false, false);
    let results = resolve(&module, &without_column, ResolveScope::LINE_ENTRY);
    assert_eq!(results.len(), 3);
}

#[test]
fn test_overlapping_unit_row_degrades_to_a_bare_context()
{
    // Unit A owns the line-table row, but the row's address lands in a
    // function that belongs to unit B, as happens with LTO-outlined code.
    let lto = UnitFixture {
        support_files: vec![FileSpec::from_path("/src/lto.c")],
        entries: vec![entry(0x5000, 0, 42, 0)],
        functions: Vec::new(),
    };
    let sibling = UnitFixture {
        support_files: vec![FileSpec::from_path("/src/other.c")],
        entries: Vec::new(),
        functions: vec![Function::new(FunctionId::from_raw(9), Mangled::from("outlined"), range(0x5000, 0x10))],
    };
    let (module, _provider) = build_module(vec![(MAIN_UNIT, "/src/lto.c", lto), (SIBLING_UNIT, "/src/other.c", sibling)]);

    let query = location("/src/lto.c", Some(42), None, false, false);
    let results = resolve(&module, &query, ResolveScope::EVERYTHING);

    assert_eq!(results.len(), 1);
    let context = results.get(0).unwrap();
    assert_eq!(context.compile_unit, Some(MAIN_UNIT));
    assert_eq!(context.line_entry.unwrap().line, 42);
    assert!(context.function.is_none());
    // Resolving into a different unit is legitimate, not reportable damage.
    assert!(module.reported_errors().is_empty());
}

#[test]
fn test_unresolvable_row_reports_debug_info_damage()
{
    let fixture = UnitFixture {
        support_files: vec![FileSpec::from_path("/src/damaged.c")],
        entries: vec![entry(0x6000, 0, 7, 0)],
        functions: Vec::new(),
    };
    let (module, _provider) = build_module(vec![(MAIN_UNIT, "/src/damaged.c", fixture)]);

    let query = location("/src/damaged.c", Some(7), None, false, false);
    let results = resolve(&module, &query, ResolveScope::EVERYTHING);

    // The answer degrades to unit + line entry instead of disappearing.
    assert_eq!(results.len(), 1);
    let context = results.get(0).unwrap();
    assert_eq!(context.compile_unit, Some(MAIN_UNIT));
    assert_eq!(context.line_entry.unwrap().line, 7);
    assert!(context.function.is_none());

    let errors = module.reported_errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("unable to resolve a line table file address"));
}

#[test]
fn test_matching_file_commits_to_full_debug_info()
{
    let (module, provider, _scope, _inlined) = inline_module();
    assert!(!provider.load_debug_info.load(Ordering::SeqCst));

    let query = location("/src/main.c", Some(10), None, false, false);
    resolve(&module, &query, ResolveScope::LINE_ENTRY);
    assert!(provider.load_debug_info.load(Ordering::SeqCst));

    // A query that matches no support file never commits.
    let (module, provider, _scope, _inlined) = inline_module();
    let query = location("/src/missing.c", Some(10), None, true, false);
    resolve(&module, &query, ResolveScope::LINE_ENTRY);
    assert!(!provider.load_debug_info.load(Ordering::SeqCst));
}

#[test]
fn test_missing_line_table_still_answers_for_the_primary_file()
{
    let fixture = UnitFixture {
        support_files: vec![FileSpec::from_path("/src/main.c")],
        entries: Vec::new(),
        functions: Vec::new(),
    };
    let (module, _provider) = build_module(vec![(MAIN_UNIT, "/src/main.c", fixture)]);

    let query = location("/src/main.c", Some(10), None, false, false);
    let results = resolve(&module, &query, ResolveScope::EVERYTHING);
    assert_eq!(results.len(), 1);
    let context = results.get(0).unwrap();
    assert_eq!(context.compile_unit, Some(MAIN_UNIT));
    assert!(context.line_entry.is_none());

    // The inline-only form of the same query has nothing to say.
    let query = location("/src/main.c", Some(10), None, true, false);
    assert!(resolve(&module, &query, ResolveScope::EVERYTHING).is_empty());
}

#[test]
fn test_basename_query_fans_out_across_units()
{
    let first = UnitFixture {
        support_files: Vec::new(),
        entries: Vec::new(),
        functions: Vec::new(),
    };
    let second = UnitFixture {
        support_files: Vec::new(),
        entries: Vec::new(),
        functions: Vec::new(),
    };
    let (module, _provider) = build_module(vec![(MAIN_UNIT, "/src/main.c", first), (SIBLING_UNIT, "/lib/main.c", second)]);

    let query = location("main.c", None, None, false, false);
    let results = resolve(&module, &query, ResolveScope::EVERYTHING);

    assert_eq!(results.len(), 2);
    assert_eq!(results.get(0).unwrap().compile_unit, Some(MAIN_UNIT));
    assert_eq!(results.get(1).unwrap().compile_unit, Some(SIBLING_UNIT));
}

#[test]
fn test_address_resolution_finds_the_deepest_block()
{
    let (module, _provider, _scope, inlined) = inline_module();

    let mut context = SymbolContext::new();
    assert!(module.resolve_symbol_context_for_address(Address::new(0x1025), ResolveScope::EVERYTHING, &mut context));
    assert_eq!(context.compile_unit, Some(MAIN_UNIT));
    assert_eq!(context.function.as_ref().unwrap().display_name(), "main");
    assert_eq!(context.block, Some(inlined));
    assert_eq!(context.line_entry.unwrap().line, 12);
    assert_eq!(context.symbol.as_ref().unwrap().name().raw(), "main");

    let mut missing = SymbolContext::new();
    assert!(!module.resolve_symbol_context_for_address(Address::new(0x9000), ResolveScope::EVERYTHING, &mut missing));
    assert!(missing.compile_unit.is_none());
}

#[cfg(unix)]
#[test]
fn test_realpath_prefixes_match_symlinked_support_files()
{
    use std::fs;

    use sextant_core::symbols::RealpathPrefixes;

    // Debug info records the symlinked spelling; the query uses the real one.
    let base = fs::canonicalize(std::env::temp_dir())
        .unwrap()
        .join(format!("sextant-realpath-{}", std::process::id()));
    fs::create_dir_all(&base).unwrap();
    let real = base.join("real.c");
    fs::write(&real, "int x;\n").unwrap();
    let link = base.join("link.c");
    let _ = fs::remove_file(&link);
    std::os::unix::fs::symlink("real.c", &link).unwrap();

    let fixture = UnitFixture {
        support_files: vec![FileSpec::from_path(&link)],
        entries: vec![entry(0x1000, 0, 3, 0)],
        functions: Vec::new(),
    };
    let primary = real.to_string_lossy().into_owned();
    let (module, _provider) = build_module(vec![(MAIN_UNIT, primary.as_str(), fixture)]);

    let query = SourceLocationSpec::new(FileSpec::from_path(&real), Some(3), None, false, false);

    let mut results = SymbolContextList::new();
    module.resolve_symbol_contexts_for_location(&query, ResolveScope::LINE_ENTRY, &mut results, None);
    assert!(results.is_empty());

    let prefixes = RealpathPrefixes::new(vec![base.clone()]);
    let mut results = SymbolContextList::new();
    module.resolve_symbol_contexts_for_location(&query, ResolveScope::LINE_ENTRY, &mut results, Some(&prefixes));
    assert_eq!(results.len(), 1);
    assert_eq!(results.get(0).unwrap().line_entry.unwrap().line, 3);

    let _ = fs::remove_dir_all(&base);
}
