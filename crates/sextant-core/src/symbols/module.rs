//! The owning image: one loaded binary and its compile units.
//!
//! A `Module` owns every [`CompileUnit`] parsed out of one binary, the
//! symbol provider that feeds them, and the object-file symbol table. It is
//! also the diagnostic channel: resolution keeps going when debug info is
//! damaged, and the damage reports land here where callers (and tests) can
//! read them back.
//!
//! ## Locking
//!
//! Compile units have no internal synchronization; the module holds each one
//! behind its own `Mutex`, which is the serialization unit. Resolution
//! against one unit may briefly lock *sibling* units (resolving a line
//! address back to a context searches the whole module), so callers running
//! concurrent queries against the same module should serialize at the module
//! level. A unit never re-locks itself: in-unit work happens through the
//! `&mut` it already has.

use std::fmt;
use std::sync::{Arc, Mutex};

use once_cell::sync::OnceCell;
use tracing::error;

use crate::symbols::compile_unit::{CompileUnit, CompileUnitId};
use crate::symbols::context::{ResolveScope, SymbolContext, SymbolContextList};
use crate::symbols::provider::SymbolProvider;
use crate::symbols::support_files::RealpathPrefixes;
use crate::symbols::symtab::SymbolTable;
use crate::types::{Address, FileSpec, SourceLocationSpec};

/// A compile unit slot: the id is mirrored outside the lock so id lookups
/// and sibling searches never have to lock units they will skip.
struct UnitSlot
{
    id: CompileUnitId,
    unit: Arc<Mutex<CompileUnit>>,
}

/// One loaded binary image and everything parsed out of it.
pub struct Module
{
    file: FileSpec,
    symbol_provider: OnceCell<Arc<dyn SymbolProvider>>,
    symbol_table: OnceCell<SymbolTable>,
    compile_units: Mutex<Vec<UnitSlot>>,
    diagnostics: Mutex<Vec<String>>,
}

impl Module
{
    /// Create an empty module for the image at `file`.
    #[must_use]
    pub fn new(file: FileSpec) -> Arc<Self>
    {
        Arc::new(Self {
            file,
            symbol_provider: OnceCell::new(),
            symbol_table: OnceCell::new(),
            compile_units: Mutex::new(Vec::new()),
            diagnostics: Mutex::new(Vec::new()),
        })
    }

    /// Path of the image this module was loaded from.
    pub fn file(&self) -> &FileSpec
    {
        &self.file
    }

    /// Install the symbol provider. Later calls are ignored; the provider
    /// for an image never changes once loading begins.
    pub fn set_symbol_provider(&self, provider: Arc<dyn SymbolProvider>)
    {
        let _ = self.symbol_provider.set(provider);
    }

    /// The installed symbol provider, if any.
    pub fn symbol_provider(&self) -> Option<Arc<dyn SymbolProvider>>
    {
        self.symbol_provider.get().cloned()
    }

    /// Install the object-file symbol table. Later calls are ignored.
    pub fn set_symbol_table(&self, symbol_table: SymbolTable)
    {
        let _ = self.symbol_table.set(symbol_table);
    }

    /// The object-file symbol table, if one was loaded.
    pub fn symbol_table(&self) -> Option<&SymbolTable>
    {
        self.symbol_table.get()
    }

    /// Register a compile unit and return its shared handle.
    pub fn add_compile_unit(&self, unit: CompileUnit) -> Arc<Mutex<CompileUnit>>
    {
        let id = unit.id();
        let unit = Arc::new(Mutex::new(unit));
        self.compile_units.lock().unwrap().push(UnitSlot {
            id,
            unit: unit.clone(),
        });
        unit
    }

    /// Number of registered compile units.
    pub fn num_compile_units(&self) -> usize
    {
        self.compile_units.lock().unwrap().len()
    }

    /// Compile unit at `idx` in registration order.
    pub fn compile_unit_at_index(&self, idx: usize) -> Option<Arc<Mutex<CompileUnit>>>
    {
        self.compile_units.lock().unwrap().get(idx).map(|slot| slot.unit.clone())
    }

    /// Compile unit with the given id.
    pub fn compile_unit_by_id(&self, id: CompileUnitId) -> Option<Arc<Mutex<CompileUnit>>>
    {
        let units = self.compile_units.lock().unwrap();
        units.iter().find(|slot| slot.id == id).map(|slot| slot.unit.clone())
    }

    /// Snapshot of every compile unit in registration order.
    pub fn compile_units(&self) -> Vec<Arc<Mutex<CompileUnit>>>
    {
        self.compile_units.lock().unwrap().iter().map(|slot| slot.unit.clone()).collect()
    }

    /// Resolve a source location against every compile unit in the module,
    /// appending all results to `results`.
    ///
    /// The caller must not hold any of this module's unit locks.
    pub fn resolve_symbol_contexts_for_location(
        &self,
        location: &SourceLocationSpec,
        scope: ResolveScope,
        results: &mut SymbolContextList,
        realpath_prefixes: Option<&RealpathPrefixes>,
    )
    {
        for unit in self.compile_units() {
            unit.lock().unwrap().resolve_symbol_context(location, scope, results, realpath_prefixes);
        }
    }

    /// Resolve a file address to a symbol context, searching every compile
    /// unit. Returns whether some unit claimed the address.
    ///
    /// The caller must not hold any of this module's unit locks.
    pub fn resolve_symbol_context_for_address(&self, address: Address, scope: ResolveScope, context: &mut SymbolContext) -> bool
    {
        self.resolve_address_in_units(address, scope, None, context)
    }

    /// Address resolution restricted to units other than `excluded`, for a
    /// unit that is searching its siblings while holding its own lock.
    pub(crate) fn resolve_address_excluding_unit(
        &self,
        address: Address,
        scope: ResolveScope,
        excluded: CompileUnitId,
        context: &mut SymbolContext,
    ) -> bool
    {
        self.resolve_address_in_units(address, scope, Some(excluded), context)
    }

    fn resolve_address_in_units(
        &self,
        address: Address,
        scope: ResolveScope,
        excluded: Option<CompileUnitId>,
        context: &mut SymbolContext,
    ) -> bool
    {
        let slots: Vec<(CompileUnitId, Arc<Mutex<CompileUnit>>)> = {
            let units = self.compile_units.lock().unwrap();
            units.iter().map(|slot| (slot.id, slot.unit.clone())).collect()
        };
        for (id, unit) in slots {
            if excluded == Some(id) {
                continue;
            }
            if unit.lock().unwrap().resolve_address_within(address, scope, context) {
                return true;
            }
        }
        false
    }

    /// Report a non-fatal problem with this module's debug info.
    ///
    /// The message is logged and retained; [`Module::reported_errors`]
    /// returns everything reported so far. Resolution code calls this
    /// instead of failing when it can degrade.
    pub fn report_error(&self, message: impl Into<String>)
    {
        let message = message.into();
        error!("{}: {}", self.file, message);
        self.diagnostics.lock().unwrap().push(message);
    }

    /// Every diagnostic reported against this module, oldest first.
    pub fn reported_errors(&self) -> Vec<String>
    {
        self.diagnostics.lock().unwrap().clone()
    }
}

impl fmt::Debug for Module
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Module")
            .field("file", &self.file)
            .field("num_compile_units", &self.num_compile_units())
            .field("has_symbol_provider", &self.symbol_provider.get().is_some())
            .finish()
    }
}
