//! # Symbols
//!
//! The debug-info object model: modules own compile units, compile units own
//! lazily parsed facets (line tables, support files, functions, variables,
//! macros, imports), and source-location queries resolve through them into
//! [`SymbolContext`] answers.
//!
//! Everything here is format-agnostic. Debug-format knowledge lives behind
//! the [`SymbolProvider`] trait; the DWARF implementation is in
//! [`crate::dwarf`].

pub mod compile_unit;
pub mod context;
pub mod debug_macros;
pub mod function;
pub mod line_table;
pub mod mangled;
pub mod module;
pub mod provider;
pub mod support_files;
pub mod symtab;
pub mod variable;

// Re-export all public types
pub use compile_unit::{CompileUnit, CompileUnitId, SourceModule};
pub use context::{ResolveScope, SymbolContext, SymbolContextList};
pub use debug_macros::{DebugMacros, MacroEntry};
pub use function::{Block, BlockId, Function, FunctionId, InlineFunctionInfo};
pub use line_table::{LineEntry, LineTable};
pub use mangled::Mangled;
pub use module::Module;
pub use provider::SymbolProvider;
pub use support_files::{RealpathPrefixes, SupportFileList};
pub use symtab::{Symbol, SymbolTable};
pub use variable::{Variable, VariableList};
