//! # DWARF Symbol Provider
//!
//! Loads ELF / Mach-O images with [`object`], keeps their DWARF sections
//! resident as shared byte slices, and implements [`SymbolProvider`] on top
//! of [`gimli`]. [`load_module`] is the entry point: it registers one
//! [`CompileUnit`] per compilation unit up front (ids are `.debug_info`
//! offsets) and leaves every facet to be parsed on demand.

mod functions;
mod line;
mod macros;

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use gimli::{constants, AttributeValue, Dwarf, EndianArcSlice, Reader, RunTimeEndian, SectionId, Unit};
use object::{Object, ObjectSection, ObjectSymbol, SymbolKind};
use tracing::{info, warn};

use crate::error::{SextantError, SextantResult};
use crate::symbols::{
    CompileUnit, CompileUnitId, Mangled, Module, SourceModule, SupportFileList, Symbol, SymbolProvider, SymbolTable, VariableList,
};
use crate::types::{Address, AddressRange, FileSpec, Language};

type OwnedReader = EndianArcSlice<RunTimeEndian>;
type OwnedDwarf = Dwarf<OwnedReader>;

/// Load an image from disk into a queryable [`Module`].
///
/// Parses the object container, snapshots the DWARF sections, builds the
/// object-file symbol table, and registers one compile unit per compilation
/// unit found in `.debug_info`. Facet parsing (line tables, functions,
/// variables, macros) stays lazy.
///
/// ## Example
///
/// ```no_run
/// use sextant_core::dwarf::load_module;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let module = load_module("/usr/bin/true")?;
/// println!("{} compile units", module.num_compile_units());
/// # Ok(())
/// # }
/// ```
pub fn load_module<P: AsRef<Path>>(path: P) -> SextantResult<Arc<Module>>
{
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let data = Arc::<[u8]>::from(bytes);
    let file = object::File::parse(&*data).map_err(|err| SextantError::ObjectParse {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;

    let provider = DwarfProvider::from_object(path, &file)?;
    let descriptors = provider.unit_descriptors();

    let module = Module::new(FileSpec::from_path(path));
    module.set_symbol_table(build_symbol_table(&file));
    module.set_symbol_provider(Arc::new(provider));

    for descriptor in descriptors {
        let unit = CompileUnit::new(&module, descriptor.id, descriptor.primary_file, descriptor.language, None);
        module.add_compile_unit(unit);
    }

    info!("Loaded {} compile units from {}", module.num_compile_units(), path.display());
    Ok(module)
}

/// [`SymbolProvider`] backed by the DWARF sections of one image.
///
/// All gimli state is parsed once at construction (unit headers and
/// abbreviations); per-facet work happens in the `parse_*` calls. The
/// provider is shared behind `Arc` and called under compile-unit locks, so
/// its own mutable state is interior and lock-protected.
pub struct DwarfProvider
{
    path: PathBuf,
    endian: RunTimeEndian,
    debug_sections: HashMap<&'static str, Arc<[u8]>>,
    dwarf: OwnedDwarf,
    units: Vec<Unit<OwnedReader>>,
    unit_index_by_id: HashMap<CompileUnitId, usize>,
    parsed_functions: Mutex<HashSet<CompileUnitId>>,
    load_all_debug_info: AtomicBool,
}

struct UnitDescriptor
{
    id: CompileUnitId,
    primary_file: FileSpec,
    language: Option<Language>,
}

impl DwarfProvider
{
    fn from_object(path: &Path, file: &object::File<'_>) -> SextantResult<Self>
    {
        let endian = if file.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };

        let mut debug_sections = HashMap::new();
        for (canonical, aliases) in DWARF_SECTIONS {
            let data = load_section_bytes(file, aliases)?;
            debug_sections.insert(*canonical, data);
        }

        let dwarf = Dwarf::load(|section| Ok::<_, gimli::Error>(section_reader(&debug_sections, endian, section)))
            .map_err(|err| map_dwarf_error("loading DWARF sections", err))?;

        let mut units = Vec::new();
        let mut headers = dwarf.units();
        while let Some(header) = headers
            .next()
            .map_err(|err| map_dwarf_error("reading .debug_info unit header", err))?
        {
            units.push(
                dwarf
                    .unit(header)
                    .map_err(|err| map_dwarf_error("parsing compilation unit", err))?,
            );
        }

        let unit_index_by_id = units
            .iter()
            .enumerate()
            .filter_map(|(idx, unit)| unit_id(unit).map(|id| (id, idx)))
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            endian,
            debug_sections,
            dwarf,
            units,
            unit_index_by_id,
            parsed_functions: Mutex::new(HashSet::new()),
            load_all_debug_info: AtomicBool::new(false),
        })
    }

    /// Whether a query has committed this image to full debug info.
    pub fn load_debug_info_enabled(&self) -> bool
    {
        self.load_all_debug_info.load(Ordering::Relaxed)
    }

    fn gimli_unit(&self, id: CompileUnitId) -> Option<&Unit<OwnedReader>>
    {
        self.unit_index_by_id.get(&id).map(|idx| &self.units[*idx])
    }

    fn unit_descriptors(&self) -> Vec<UnitDescriptor>
    {
        self.units
            .iter()
            .filter_map(|unit| {
                let id = unit_id(unit)?;
                Some(UnitDescriptor {
                    id,
                    primary_file: self.unit_primary_file(unit),
                    language: self.unit_language(unit),
                })
            })
            .collect()
    }

    /// The unit's primary source file: `DW_AT_name`, made absolute against
    /// `DW_AT_comp_dir` when relative.
    fn unit_primary_file(&self, unit: &Unit<OwnedReader>) -> FileSpec
    {
        let name = unit
            .name
            .as_ref()
            .and_then(|reader| reader.to_string_lossy().ok())
            .map_or_else(String::new, Cow::into_owned);
        let name = PathBuf::from(name);
        if name.is_absolute() {
            return FileSpec::from_path(&name);
        }
        let comp_dir = self.unit_comp_dir(unit).map(PathBuf::from).unwrap_or_default();
        FileSpec::from_path(&comp_dir.join(name))
    }

    fn unit_comp_dir(&self, unit: &Unit<OwnedReader>) -> Option<String>
    {
        unit.comp_dir
            .as_ref()
            .and_then(|reader| reader.to_string_lossy().ok())
            .map(Cow::into_owned)
    }

    fn unit_root_attr(&self, unit: &Unit<OwnedReader>, name: constants::DwAt) -> Option<AttributeValue<OwnedReader>>
    {
        let mut cursor = unit.entries();
        let (_, root) = cursor.next_dfs().ok()??;
        root.attr_value(name).ok()?
    }

    fn unit_language(&self, unit: &Unit<OwnedReader>) -> Option<Language>
    {
        match self.unit_root_attr(unit, constants::DW_AT_language)? {
            AttributeValue::Language(language) => language_from_dwarf(language),
            _ => None,
        }
    }

    /// `DW_AT_APPLE_optimized` is authoritative where present; otherwise the
    /// producer string is scanned for an optimization level.
    fn unit_is_optimized(&self, unit: &Unit<OwnedReader>) -> bool
    {
        if let Some(AttributeValue::Flag(optimized)) = self.unit_root_attr(unit, constants::DW_AT_APPLE_optimized) {
            return optimized;
        }
        let Some(producer) = self.unit_root_attr(unit, constants::DW_AT_producer) else {
            return false;
        };
        let Ok(producer) = self.attr_to_string(unit, producer) else {
            return false;
        };
        ["-O1", "-O2", "-O3", "-Os", "-Oz", "-Ofast", "opt-level=1", "opt-level=2", "opt-level=3", "opt-level=s", "opt-level=z"]
            .iter()
            .any(|flag| producer.contains(flag))
    }

    fn attr_to_string(&self, unit: &Unit<OwnedReader>, value: AttributeValue<OwnedReader>) -> SextantResult<String>
    {
        let reader = self
            .dwarf
            .attr_string(unit, value)
            .map_err(|err| map_dwarf_error("resolving DWARF string", err))?;
        let owned = match reader.to_string() {
            Ok(cow) => cow.into_owned(),
            Err(_) => reader
                .to_string_lossy()
                .map_err(|err| map_dwarf_error("decoding DWARF string", err))?
                .into_owned(),
        };
        Ok(owned)
    }
}

impl SymbolProvider for DwarfProvider
{
    fn parse_language(&self, unit: &mut CompileUnit) -> Option<Language>
    {
        self.gimli_unit(unit.id()).and_then(|gimli_unit| self.unit_language(gimli_unit))
    }

    fn parse_is_optimized(&self, unit: &mut CompileUnit) -> bool
    {
        self.gimli_unit(unit.id())
            .map_or(false, |gimli_unit| self.unit_is_optimized(gimli_unit))
    }

    fn parse_functions(&self, unit: &mut CompileUnit)
    {
        // Forced by every address lookup and predicate search; only the
        // first call per unit walks the DIE tree.
        if !self.parsed_functions.lock().unwrap().insert(unit.id()) {
            return;
        }
        if let Err(err) = self.build_functions(unit) {
            warn!("Failed to parse functions for unit {:#x} in {}: {err}", unit.id().raw(), self.path.display());
        }
    }

    fn parse_line_table(&self, unit: &mut CompileUnit)
    {
        match self.build_line_table(unit.id()) {
            Ok(Some(table)) => unit.set_line_table(Some(table)),
            Ok(None) => {}
            Err(err) => {
                warn!("Failed to parse line table for unit {:#x} in {}: {err}", unit.id().raw(), self.path.display());
            }
        }
    }

    fn parse_debug_macros(&self, unit: &mut CompileUnit)
    {
        match self.build_debug_macros(unit.id()) {
            Ok(Some(macros)) => unit.set_debug_macros(Some(Arc::new(macros))),
            Ok(None) => {}
            Err(err) => {
                warn!("Failed to parse macro data for unit {:#x} in {}: {err}", unit.id().raw(), self.path.display());
            }
        }
    }

    fn parse_support_files(&self, unit: &mut CompileUnit, files: &mut SupportFileList)
    {
        if let Err(err) = self.build_support_files(unit.id(), files) {
            warn!("Failed to parse support files for unit {:#x} in {}: {err}", unit.id().raw(), self.path.display());
        }
    }

    fn parse_variables(&self, unit: &mut CompileUnit)
    {
        match self.build_unit_variables(unit.id()) {
            Ok(variables) => unit.set_variables(Some(Arc::new(VariableList::from_variables(variables)))),
            Err(err) => {
                warn!("Failed to parse variables for unit {:#x} in {}: {err}", unit.id().raw(), self.path.display());
            }
        }
    }

    fn parse_imported_modules(&self, unit: &mut CompileUnit, imported: &mut Vec<SourceModule>)
    {
        if let Err(err) = self.build_imported_modules(unit.id(), imported) {
            warn!("Failed to parse imported modules for unit {:#x} in {}: {err}", unit.id().raw(), self.path.display());
        }
    }

    fn set_load_debug_info_enabled(&self)
    {
        self.load_all_debug_info.store(true, Ordering::Relaxed);
    }
}

fn unit_id(unit: &Unit<OwnedReader>) -> Option<CompileUnitId>
{
    unit.header
        .offset()
        .as_debug_info_offset()
        .map(|offset| CompileUnitId::from_raw(offset.0 as u64))
}

/// Text symbols from the object's symbol table, independent of DWARF.
fn build_symbol_table(file: &object::File<'_>) -> SymbolTable
{
    let mut symbols = Vec::new();
    for symbol in file.symbols() {
        if symbol.kind() != SymbolKind::Text || symbol.size() == 0 {
            continue;
        }
        let Ok(name) = symbol.name() else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        symbols.push(Symbol::new(
            Mangled::from_raw(name.to_string()),
            AddressRange::new(Address::new(symbol.address()), symbol.size()),
        ));
    }
    SymbolTable::from_symbols(symbols)
}

const DWARF_SECTIONS: &[(&str, &[&str])] = &[
    (".debug_abbrev", &[".debug_abbrev", "__debug_abbrev"]),
    (".debug_addr", &[".debug_addr", "__debug_addr"]),
    (".debug_aranges", &[".debug_aranges", "__debug_aranges"]),
    (".debug_cu_index", &[".debug_cu_index"]),
    (".debug_info", &[".debug_info", "__debug_info"]),
    (".debug_line", &[".debug_line", "__debug_line"]),
    (".debug_line_str", &[".debug_line_str", "__debug_line_str"]),
    (".debug_loc", &[".debug_loc", "__debug_loc"]),
    (".debug_loclists", &[".debug_loclists", "__debug_loclists"]),
    (".debug_macro", &[".debug_macro", "__debug_macro"]),
    (".debug_ranges", &[".debug_ranges", "__debug_ranges"]),
    (".debug_rnglists", &[".debug_rnglists", "__debug_rnglists"]),
    (".debug_str", &[".debug_str", "__debug_str"]),
    (".debug_str_offsets", &[".debug_str_offsets", "__debug_str_offsets"]),
    (".debug_str_sup", &[".debug_str_sup"]),
    (".debug_sup", &[".debug_sup"]),
    (".debug_tu_index", &[".debug_tu_index"]),
    (".debug_types", &[".debug_types", "__debug_types"]),
];

fn section_reader(sections: &HashMap<&'static str, Arc<[u8]>>, endian: RunTimeEndian, id: SectionId) -> OwnedReader
{
    let key = match id {
        SectionId::DebugAbbrev => ".debug_abbrev",
        SectionId::DebugAddr => ".debug_addr",
        SectionId::DebugAranges => ".debug_aranges",
        SectionId::DebugCuIndex => ".debug_cu_index",
        SectionId::DebugInfo => ".debug_info",
        SectionId::DebugLine => ".debug_line",
        SectionId::DebugLineStr => ".debug_line_str",
        SectionId::DebugLoc => ".debug_loc",
        SectionId::DebugLocLists => ".debug_loclists",
        SectionId::DebugMacro => ".debug_macro",
        SectionId::DebugRanges => ".debug_ranges",
        SectionId::DebugRngLists => ".debug_rnglists",
        SectionId::DebugStr => ".debug_str",
        SectionId::DebugStrOffsets => ".debug_str_offsets",
        SectionId::DebugTuIndex => ".debug_tu_index",
        SectionId::DebugTypes => ".debug_types",
        _ => "",
    };

    let data = sections.get(key).cloned().unwrap_or_else(|| Arc::<[u8]>::from(Vec::new()));
    EndianArcSlice::new(data, endian)
}

fn load_section_bytes<'data>(file: &object::File<'data>, names: &[&str]) -> SextantResult<Arc<[u8]>>
{
    for name in names {
        if let Some(section) = file.section_by_name(name) {
            let data = section.uncompressed_data().map_err(|err| SextantError::Dwarf {
                context: format!("reading section {name}"),
                message: err.to_string(),
            })?;
            return Ok(match data {
                Cow::Borrowed(bytes) => Arc::<[u8]>::from(bytes.to_vec()),
                Cow::Owned(vec) => vec.into(),
            });
        }
    }

    Ok(Arc::<[u8]>::from(Vec::new()))
}

fn language_from_dwarf(language: constants::DwLang) -> Option<Language>
{
    match language {
        constants::DW_LANG_Rust => Some(Language::Rust),
        constants::DW_LANG_C_plus_plus
        | constants::DW_LANG_C_plus_plus_03
        | constants::DW_LANG_C_plus_plus_11
        | constants::DW_LANG_C_plus_plus_14
        | constants::DW_LANG_C_plus_plus_17
        | constants::DW_LANG_C_plus_plus_20 => Some(Language::Cpp),
        constants::DW_LANG_C | constants::DW_LANG_C89 | constants::DW_LANG_C99 | constants::DW_LANG_C11 | constants::DW_LANG_C17 => {
            Some(Language::C)
        }
        _ => None,
    }
}

fn map_dwarf_error(context: &str, err: gimli::Error) -> SextantError
{
    SextantError::Dwarf {
        context: context.to_string(),
        message: err.to_string(),
    }
}
