//! Object-file symbol tables.

use crate::symbols::Mangled;
use crate::types::{Address, AddressRange};

/// One object-file symbol: a named machine code range.
///
/// Symbols come from the object's symbol table, not from debug info, so they
/// exist even for stripped-of-DWARF images and serve as the coarsest
/// resolution layer.
#[derive(Debug, Clone)]
pub struct Symbol
{
    name: Mangled,
    range: AddressRange,
}

impl Symbol
{
    /// Construct a symbol covering `range`.
    pub fn new(name: Mangled, range: AddressRange) -> Self
    {
        Self { name, range }
    }

    /// Symbol name with demangling metadata.
    pub fn name(&self) -> &Mangled
    {
        &self.name
    }

    /// Machine code covered by the symbol.
    pub fn range(&self) -> AddressRange
    {
        self.range
    }
}

/// Address-sorted symbol collection with containment lookup.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable
{
    symbols: Vec<Symbol>,
}

impl SymbolTable
{
    /// Build a table from unsorted symbols.
    #[must_use]
    pub fn from_symbols(mut symbols: Vec<Symbol>) -> Self
    {
        symbols.sort_by_key(|symbol| symbol.range().base());
        Self { symbols }
    }

    /// Number of symbols.
    pub fn len(&self) -> usize
    {
        self.symbols.len()
    }

    /// Whether the table holds no symbols.
    pub fn is_empty(&self) -> bool
    {
        self.symbols.is_empty()
    }

    /// All symbols in address order.
    pub fn symbols(&self) -> &[Symbol]
    {
        &self.symbols
    }

    /// Find the symbol whose range contains `address`.
    pub fn symbol_for_address(&self, address: Address) -> Option<&Symbol>
    {
        let after = self.symbols.partition_point(|symbol| symbol.range().base() <= address);
        if after == 0 {
            return None;
        }
        let candidate = &self.symbols[after - 1];
        if candidate.range().contains(address) {
            Some(candidate)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_symbol_for_address()
    {
        let table = SymbolTable::from_symbols(vec![
            Symbol::new(Mangled::from("b"), AddressRange::new(Address::new(0x2000), 0x10)),
            Symbol::new(Mangled::from("a"), AddressRange::new(Address::new(0x1000), 0x10)),
        ]);
        assert_eq!(table.symbol_for_address(Address::new(0x1008)).unwrap().name().raw(), "a");
        assert_eq!(table.symbol_for_address(Address::new(0x2000)).unwrap().name().raw(), "b");
        assert!(table.symbol_for_address(Address::new(0x1800)).is_none());
    }
}
