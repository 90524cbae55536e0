//! Functions and their lexical block trees.
//!
//! A function owns a small arena of blocks. Block 0 is the function's own
//! block (never inlined); children are lexical scopes and inlined call
//! sites. Blocks reference each other by id, so the tree needs no interior
//! pointers and traversal is plain recursion.

use crate::symbols::Mangled;
use crate::types::{Address, AddressRange, Declaration};

/// Unique identifier for a function within its compile unit.
///
/// Assigned by the symbol provider; for DWARF this is the subprogram DIE's
/// section offset, which is stable across parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(u64);

impl FunctionId
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

/// Identifier of a block inside one function's block arena.
///
/// Only valid for the function that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(u32);

impl BlockId
{
    /// The function's own top-level block.
    pub const ROOT: Self = BlockId(0);

    /// Get the raw numeric representation (useful for logging / errors).
    #[must_use]
    pub const fn raw(self) -> u32
    {
        self.0
    }

    fn index(self) -> usize
    {
        self.0 as usize
    }
}

/// Metadata attached to a block that represents an inlined function body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineFunctionInfo
{
    name: Mangled,
    call_site: Declaration,
}

impl InlineFunctionInfo
{
    /// Construct inline metadata from the inlined function's name and the
    /// source position of the call that was inlined away.
    pub fn new(name: Mangled, call_site: Declaration) -> Self
    {
        Self { name, call_site }
    }

    /// Name of the function that was inlined here.
    pub fn name(&self) -> &Mangled
    {
        &self.name
    }

    /// Source position of the call site in the *caller*.
    pub fn call_site(&self) -> &Declaration
    {
        &self.call_site
    }
}

/// One node of a function's lexical block tree.
#[derive(Debug, Clone)]
pub struct Block
{
    parent: Option<BlockId>,
    children: Vec<BlockId>,
    ranges: Vec<AddressRange>,
    inline_info: Option<InlineFunctionInfo>,
}

impl Block
{
    /// Parent block id; `None` only for the root block.
    pub fn parent(&self) -> Option<BlockId>
    {
        self.parent
    }

    /// Child block ids in declaration order.
    pub fn children(&self) -> &[BlockId]
    {
        &self.children
    }

    /// Address ranges the block covers. Blocks discarded by the optimizer
    /// may legitimately cover nothing.
    pub fn ranges(&self) -> &[AddressRange]
    {
        &self.ranges
    }

    /// Range at `idx`, if present.
    pub fn range_at(&self, idx: usize) -> Option<AddressRange>
    {
        self.ranges.get(idx).copied()
    }

    /// Lowest base address among the block's ranges.
    pub fn start_address(&self) -> Option<Address>
    {
        self.ranges.iter().map(|range| range.base()).min()
    }

    /// Whether any of the block's ranges contains `address`.
    pub fn contains_address(&self, address: Address) -> bool
    {
        self.ranges.iter().any(|range| range.contains(address))
    }

    /// Inline metadata, present when this block is an inlined function body.
    pub fn inline_info(&self) -> Option<&InlineFunctionInfo>
    {
        self.inline_info.as_ref()
    }
}

/// A concrete function: entry in a compile unit's function registry.
///
/// Immutable once built; providers construct the whole block tree before
/// registering the function, and the registry shares it behind `Arc`.
#[derive(Debug, Clone)]
pub struct Function
{
    id: FunctionId,
    mangled: Mangled,
    range: AddressRange,
    blocks: Vec<Block>,
}

impl Function
{
    /// Create a function whose root block covers `range`.
    #[must_use]
    pub fn new(id: FunctionId, mangled: Mangled, range: AddressRange) -> Self
    {
        let root = Block {
            parent: None,
            children: Vec::new(),
            ranges: vec![range],
            inline_info: None,
        };
        Self {
            id,
            mangled,
            range,
            blocks: vec![root],
        }
    }

    /// Stable identifier assigned by the symbol provider.
    pub fn id(&self) -> FunctionId
    {
        self.id
    }

    /// Linkage name with demangling metadata.
    pub fn mangled(&self) -> &Mangled
    {
        &self.mangled
    }

    /// Preferred human-readable name.
    pub fn display_name(&self) -> &str
    {
        self.mangled.display_name()
    }

    /// Overall machine code range of the function.
    pub fn range(&self) -> AddressRange
    {
        self.range
    }

    /// The function's own top-level block.
    pub fn root_block(&self) -> &Block
    {
        &self.blocks[BlockId::ROOT.index()]
    }

    /// Block lookup by id. Ids from a different function find arbitrary
    /// blocks or nothing; don't mix them.
    pub fn block(&self, id: BlockId) -> Option<&Block>
    {
        self.blocks.get(id.index())
    }

    /// Append a block under `parent`, returning the new block's id.
    ///
    /// `parent` must be an id previously returned by this function
    /// (or [`BlockId::ROOT`]).
    pub fn add_block(&mut self, parent: BlockId, ranges: Vec<AddressRange>, inline_info: Option<InlineFunctionInfo>) -> BlockId
    {
        let id = BlockId(u32::try_from(self.blocks.len()).unwrap_or(u32::MAX));
        self.blocks.push(Block {
            parent: Some(parent),
            children: Vec::new(),
            ranges,
            inline_info,
        });
        self.blocks[parent.index()].children.push(id);
        id
    }

    /// Deepest block containing `address`, or `None` when the address is
    /// outside the function.
    pub fn block_containing_address(&self, address: Address) -> Option<BlockId>
    {
        if !self.range.contains(address) {
            return None;
        }
        let mut current = BlockId::ROOT;
        loop {
            let next = self.blocks[current.index()]
                .children
                .iter()
                .copied()
                .find(|child| self.blocks[child.index()].contains_address(address));
            match next {
                Some(child) => current = child,
                None => return Some(current),
            }
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn range(base: u64, size: u64) -> AddressRange
    {
        AddressRange::new(Address::new(base), size)
    }

    #[test]
    fn test_block_tree_wiring()
    {
        let mut function = Function::new(FunctionId::from_raw(1), Mangled::from("outer"), range(0x1000, 0x100));
        let scope = function.add_block(BlockId::ROOT, vec![range(0x1010, 0x40)], None);
        let inlined = function.add_block(
            scope,
            vec![range(0x1020, 0x10)],
            Some(InlineFunctionInfo::new(Mangled::from("inner"), Declaration::default())),
        );

        assert_eq!(function.root_block().children(), &[scope]);
        assert_eq!(function.block(scope).unwrap().parent(), Some(BlockId::ROOT));
        assert_eq!(function.block(inlined).unwrap().parent(), Some(scope));
        assert!(function.block(inlined).unwrap().inline_info().is_some());
    }

    #[test]
    fn test_deepest_block_for_address()
    {
        let mut function = Function::new(FunctionId::from_raw(1), Mangled::from("outer"), range(0x1000, 0x100));
        let scope = function.add_block(BlockId::ROOT, vec![range(0x1010, 0x40)], None);
        let inlined = function.add_block(scope, vec![range(0x1020, 0x10)], None);

        assert_eq!(function.block_containing_address(Address::new(0x1005)), Some(BlockId::ROOT));
        assert_eq!(function.block_containing_address(Address::new(0x1012)), Some(scope));
        assert_eq!(function.block_containing_address(Address::new(0x1025)), Some(inlined));
        assert_eq!(function.block_containing_address(Address::new(0x2000)), None);
    }

    #[test]
    fn test_start_address_is_lowest_range_base()
    {
        let mut function = Function::new(FunctionId::from_raw(1), Mangled::from("f"), range(0x1000, 0x100));
        let split = function.add_block(BlockId::ROOT, vec![range(0x1040, 0x8), range(0x1010, 0x8)], None);
        assert_eq!(function.block(split).unwrap().start_address(), Some(Address::new(0x1010)));
        // A block the optimizer emptied has no start address.
        let empty = function.add_block(BlockId::ROOT, Vec::new(), None);
        assert_eq!(function.block(empty).unwrap().start_address(), None);
    }
}
