//! Symbol contexts: what an address or source query resolved to.

use std::ops::{BitOr, BitOrAssign};
use std::sync::Arc;

use crate::symbols::compile_unit::CompileUnitId;
use crate::symbols::function::{BlockId, Function};
use crate::symbols::line_table::LineEntry;
use crate::symbols::module::Module;
use crate::symbols::symtab::Symbol;

/// Bitmask of the facets a resolution query wants filled in.
///
/// Resolvers may fill more than asked when the extra facets fall out of the
/// lookup anyway, but they never fill less than they can.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ResolveScope(u32);

impl ResolveScope
{
    /// Nothing requested.
    pub const NONE: Self = Self(0);
    /// The owning module.
    pub const MODULE: Self = Self(1);
    /// The compile unit containing the result.
    pub const COMPILE_UNIT: Self = Self(1 << 1);
    /// The function containing the result.
    pub const FUNCTION: Self = Self(1 << 2);
    /// The deepest lexical block containing the result.
    pub const BLOCK: Self = Self(1 << 3);
    /// The line table entry for the result.
    pub const LINE_ENTRY: Self = Self(1 << 4);
    /// The object-file symbol containing the result.
    pub const SYMBOL: Self = Self(1 << 5);
    /// Every facet.
    pub const EVERYTHING: Self = Self((1 << 6) - 1);

    /// Whether every bit of `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool
    {
        self.0 & other.0 == other.0
    }

    /// Whether no bits are set.
    #[must_use]
    pub const fn is_empty(self) -> bool
    {
        self.0 == 0
    }
}

impl BitOr for ResolveScope
{
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output
    {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ResolveScope
{
    fn bitor_assign(&mut self, rhs: Self)
    {
        self.0 |= rhs.0;
    }
}

/// The result of resolving an address or source location.
///
/// Every facet is optional: a bare unit-only context is a legitimate answer
/// (a whole-unit file match, or graceful degradation when an address won't
/// resolve back cleanly). Compile units are referenced by id; go back
/// through [`Module::compile_unit_by_id`] for further queries against the
/// unit itself.
#[derive(Debug, Clone, Default)]
pub struct SymbolContext
{
    /// Module the result lives in.
    pub module: Option<Arc<Module>>,
    /// Compile unit the result lives in.
    pub compile_unit: Option<CompileUnitId>,
    /// Function containing the result.
    pub function: Option<Arc<Function>>,
    /// Deepest block containing the result (interpreted within `function`).
    pub block: Option<BlockId>,
    /// Line table row for the result.
    pub line_entry: Option<LineEntry>,
    /// Object-file symbol containing the result.
    pub symbol: Option<Symbol>,
}

impl SymbolContext
{
    /// A context with nothing resolved.
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }
}

/// Ordered accumulator for resolution results.
///
/// Resolvers only append; a caller fanning one query out across many units
/// passes the same list to each and reads the combined results.
#[derive(Debug, Clone, Default)]
pub struct SymbolContextList
{
    contexts: Vec<SymbolContext>,
}

impl SymbolContextList
{
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Append a context.
    pub fn push(&mut self, context: SymbolContext)
    {
        self.contexts.push(context);
    }

    /// Number of accumulated contexts.
    pub fn len(&self) -> usize
    {
        self.contexts.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool
    {
        self.contexts.is_empty()
    }

    /// Context at `idx`, if in bounds.
    pub fn get(&self, idx: usize) -> Option<&SymbolContext>
    {
        self.contexts.get(idx)
    }

    /// Iterate the accumulated contexts in append order.
    pub fn iter(&self) -> std::slice::Iter<'_, SymbolContext>
    {
        self.contexts.iter()
    }
}

impl<'a> IntoIterator for &'a SymbolContextList
{
    type Item = &'a SymbolContext;
    type IntoIter = std::slice::Iter<'a, SymbolContext>;

    fn into_iter(self) -> Self::IntoIter
    {
        self.contexts.iter()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_scope_bit_operations()
    {
        let scope = ResolveScope::COMPILE_UNIT | ResolveScope::LINE_ENTRY;
        assert!(scope.contains(ResolveScope::LINE_ENTRY));
        assert!(scope.contains(ResolveScope::COMPILE_UNIT | ResolveScope::LINE_ENTRY));
        assert!(!scope.contains(ResolveScope::FUNCTION));
        assert!(ResolveScope::EVERYTHING.contains(scope));
        assert!(ResolveScope::NONE.is_empty());
        // Asking for nothing is contained in anything.
        assert!(scope.contains(ResolveScope::NONE));
    }
}
