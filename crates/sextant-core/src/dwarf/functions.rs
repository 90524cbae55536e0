//! Function, block, variable and import extraction from the DIE tree.
//!
//! One depth-first walk per unit builds the whole function registry:
//! `DW_TAG_subprogram` opens a function, `DW_TAG_lexical_block` and
//! `DW_TAG_inlined_subroutine` become blocks under it, and depth bookkeeping
//! decides parenthood. Function and block ids are `.debug_info` offsets, so
//! re-parsing re-registers identical ids.

use std::sync::Arc;

use gimli::{constants, AttributeValue, DebuggingInformationEntry, Unit};

use super::{map_dwarf_error, DwarfProvider, OwnedReader};
use crate::error::SextantResult;
use crate::symbols::{
    BlockId, CompileUnit, CompileUnitId, Function, FunctionId, InlineFunctionInfo, Mangled, SourceModule, Variable,
};
use crate::types::{Address, AddressRange, Declaration, FileSpec};

const MAX_REF_DEPTH: usize = 16;

struct FunctionBuilder
{
    depth: isize,
    function: Function,
    open_blocks: Vec<(isize, BlockId)>,
}

impl DwarfProvider
{
    pub(super) fn build_functions(&self, unit_model: &mut CompileUnit) -> SextantResult<()>
    {
        let Some(unit) = self.gimli_unit(unit_model.id()) else {
            return Ok(());
        };

        let mut cursor = unit.entries();
        let mut depth: isize = 0;
        let mut skip_below: Option<isize> = None;
        let mut current: Option<FunctionBuilder> = None;

        while let Some((delta, entry)) = cursor
            .next_dfs()
            .map_err(|err| map_dwarf_error("walking debug info entries", err))?
        {
            depth += delta;

            if let Some(limit) = skip_below {
                if depth > limit {
                    continue;
                }
                skip_below = None;
            }

            if current.as_ref().map_or(false, |builder| depth <= builder.depth) {
                if let Some(builder) = current.take() {
                    unit_model.add_function(Arc::new(builder.function));
                }
            }

            match entry.tag() {
                constants::DW_TAG_subprogram => {
                    if current.is_some() {
                        // A function DIE nested inside another function body;
                        // its subtree is not part of the enclosing block tree.
                        skip_below = Some(depth);
                        continue;
                    }
                    // Declarations and abstract inline instances carry no code.
                    let ranges = self.die_ranges_vec(unit, entry)?;
                    if ranges.is_empty() {
                        continue;
                    }
                    let Some(id) = entry
                        .offset()
                        .to_debug_info_offset(&unit.header)
                        .map(|offset| FunctionId::from_raw(offset.0 as u64))
                    else {
                        continue;
                    };
                    let name = Mangled::from_raw(self.resolve_entry_name(unit, entry, 0)?.unwrap_or_default());
                    let function = Function::new(id, name, envelope(&ranges));
                    current = Some(FunctionBuilder {
                        depth,
                        function,
                        open_blocks: vec![(depth, BlockId::ROOT)],
                    });
                }
                constants::DW_TAG_lexical_block | constants::DW_TAG_inlined_subroutine => {
                    let is_inlined = entry.tag() == constants::DW_TAG_inlined_subroutine;
                    if let Some(builder) = current.as_mut() {
                        while builder.open_blocks.last().map_or(false, |(block_depth, _)| *block_depth >= depth) {
                            builder.open_blocks.pop();
                        }
                        let parent = builder.open_blocks.last().map_or(BlockId::ROOT, |(_, id)| *id);
                        let ranges = self.die_ranges_vec(unit, entry)?;
                        let inline_info = if is_inlined { Some(self.inline_info(unit, entry)?) } else { None };
                        let block_id = builder.function.add_block(parent, ranges, inline_info);
                        builder.open_blocks.push((depth, block_id));
                    }
                }
                _ => {}
            }
        }

        if let Some(builder) = current.take() {
            unit_model.add_function(Arc::new(builder.function));
        }
        Ok(())
    }

    pub(super) fn build_unit_variables(&self, id: CompileUnitId) -> SextantResult<Vec<Arc<Variable>>>
    {
        let Some(unit) = self.gimli_unit(id) else {
            return Ok(Vec::new());
        };

        let mut variables = Vec::new();
        let mut tree = unit
            .entries_tree(None)
            .map_err(|err| map_dwarf_error("building unit DIE tree", err))?;
        let root = tree.root().map_err(|err| map_dwarf_error("navigating unit root", err))?;
        let mut children = root.children();
        while let Some(child) = children
            .next()
            .map_err(|err| map_dwarf_error("iterating unit children", err))?
        {
            let entry = child.entry().clone();
            if entry.tag() != constants::DW_TAG_variable {
                continue;
            }
            let Some(name) = self.entry_plain_name(unit, &entry)? else {
                continue;
            };
            let type_name = if let Some(attr) = entry
                .attr(constants::DW_AT_type)
                .map_err(|err| map_dwarf_error("reading variable type", err))?
            {
                self.resolve_type_name(unit, attr.value(), 0)?
            } else {
                None
            };
            let declaration = self.entry_declaration(unit, &entry)?;
            variables.push(Arc::new(Variable {
                name,
                type_name,
                declaration,
            }));
        }
        Ok(variables)
    }

    pub(super) fn build_imported_modules(&self, id: CompileUnitId, imported: &mut Vec<SourceModule>) -> SextantResult<()>
    {
        let Some(unit) = self.gimli_unit(id) else {
            return Ok(());
        };

        let mut tree = unit
            .entries_tree(None)
            .map_err(|err| map_dwarf_error("building unit DIE tree", err))?;
        let root = tree.root().map_err(|err| map_dwarf_error("navigating unit root", err))?;
        let mut children = root.children();
        while let Some(child) = children
            .next()
            .map_err(|err| map_dwarf_error("iterating unit children", err))?
        {
            let entry = child.entry().clone();
            if !matches!(
                entry.tag(),
                constants::DW_TAG_imported_module | constants::DW_TAG_imported_declaration
            ) {
                continue;
            }
            let Some(attr) = entry
                .attr(constants::DW_AT_import)
                .map_err(|err| map_dwarf_error("reading DW_AT_import", err))?
            else {
                continue;
            };
            let AttributeValue::UnitRef(offset) = attr.value() else {
                continue;
            };
            let target = unit.entry(offset).map_err(|err| map_dwarf_error("resolving import target", err))?;
            if target.tag() != constants::DW_TAG_module {
                continue;
            }
            let Some(name) = self.entry_plain_name(unit, &target)? else {
                continue;
            };
            let declaration = self.entry_declaration(unit, &entry)?;
            let search_path = if let Some(attr) = target
                .attr(constants::DW_AT_LLVM_include_path)
                .map_err(|err| map_dwarf_error("reading module include path", err))?
            {
                Some(FileSpec::from_path(self.attr_to_string(unit, attr.value())?))
            } else {
                None
            };
            imported.push(SourceModule {
                name,
                declaration,
                search_path,
            });
        }
        Ok(())
    }

    fn die_ranges_vec(&self, unit: &Unit<OwnedReader>, entry: &DebuggingInformationEntry<'_, '_, OwnedReader>) -> SextantResult<Vec<AddressRange>>
    {
        let mut result = Vec::new();
        let mut ranges = self
            .dwarf
            .die_ranges(unit, entry)
            .map_err(|err| map_dwarf_error("reading DIE address ranges", err))?;
        while let Some(range) = ranges
            .next()
            .map_err(|err| map_dwarf_error("iterating DIE address ranges", err))?
        {
            if range.end > range.begin {
                result.push(AddressRange::new(Address::new(range.begin), range.end - range.begin));
            }
        }
        Ok(result)
    }

    /// Function identity: `DW_AT_linkage_name` wins over `DW_AT_name`;
    /// concrete inline instances and definitions reach their identity
    /// through `DW_AT_abstract_origin` / `DW_AT_specification`.
    fn resolve_entry_name(
        &self,
        unit: &Unit<OwnedReader>,
        entry: &DebuggingInformationEntry<'_, '_, OwnedReader>,
        depth: usize,
    ) -> SextantResult<Option<String>>
    {
        if depth >= MAX_REF_DEPTH {
            return Ok(None);
        }
        if let Some(attr) = entry
            .attr(constants::DW_AT_linkage_name)
            .map_err(|err| map_dwarf_error("reading DW_AT_linkage_name", err))?
        {
            return self.attr_to_string(unit, attr.value()).map(Some);
        }
        if let Some(attr) = entry
            .attr(constants::DW_AT_name)
            .map_err(|err| map_dwarf_error("reading DW_AT_name", err))?
        {
            return self.attr_to_string(unit, attr.value()).map(Some);
        }
        for referral in [constants::DW_AT_abstract_origin, constants::DW_AT_specification] {
            let Some(attr) = entry.attr(referral).map_err(|err| map_dwarf_error("reading DIE reference", err))? else {
                continue;
            };
            if let AttributeValue::UnitRef(offset) = attr.value() {
                let target = unit.entry(offset).map_err(|err| map_dwarf_error("resolving DIE reference", err))?;
                if let Some(name) = self.resolve_entry_name(unit, &target, depth + 1)? {
                    return Ok(Some(name));
                }
            }
        }
        Ok(None)
    }

    fn entry_plain_name(
        &self,
        unit: &Unit<OwnedReader>,
        entry: &DebuggingInformationEntry<'_, '_, OwnedReader>,
    ) -> SextantResult<Option<String>>
    {
        if let Some(attr) = entry
            .attr(constants::DW_AT_name)
            .map_err(|err| map_dwarf_error("reading DW_AT_name", err))?
        {
            return self.attr_to_string(unit, attr.value()).map(Some);
        }
        Ok(None)
    }

    /// Rendered name of a referenced type, looking through anonymous
    /// wrappers (pointers, const, typedef chains) to the first named DIE.
    fn resolve_type_name(&self, unit: &Unit<OwnedReader>, value: AttributeValue<OwnedReader>, depth: usize) -> SextantResult<Option<String>>
    {
        if depth >= MAX_REF_DEPTH {
            return Ok(None);
        }
        let AttributeValue::UnitRef(offset) = value else {
            return Ok(None);
        };
        let die = unit.entry(offset).map_err(|err| map_dwarf_error("resolving type reference", err))?;
        if let Some(attr) = die
            .attr(constants::DW_AT_name)
            .map_err(|err| map_dwarf_error("reading type name", err))?
        {
            return self.attr_to_string(unit, attr.value()).map(Some);
        }
        if let Some(attr) = die
            .attr(constants::DW_AT_type)
            .map_err(|err| map_dwarf_error("reading nested type", err))?
        {
            return self.resolve_type_name(unit, attr.value(), depth + 1);
        }
        Ok(None)
    }

    fn inline_info(&self, unit: &Unit<OwnedReader>, entry: &DebuggingInformationEntry<'_, '_, OwnedReader>) -> SextantResult<InlineFunctionInfo>
    {
        let name = Mangled::from_raw(self.resolve_entry_name(unit, entry, 0)?.unwrap_or_default());
        let file = self
            .entry_file_index(entry, constants::DW_AT_call_file)?
            .and_then(|index| self.line_table_file_spec(unit, index))
            .unwrap_or_default();
        let line = self
            .entry_udata(entry, constants::DW_AT_call_line)?
            .map_or(0, |line| u32::try_from(line).unwrap_or(u32::MAX));
        let column = self
            .entry_udata(entry, constants::DW_AT_call_column)?
            .map_or(0, |column| u16::try_from(column).unwrap_or(u16::MAX));
        Ok(InlineFunctionInfo::new(name, Declaration::new(file, line, column)))
    }

    fn entry_declaration(
        &self,
        unit: &Unit<OwnedReader>,
        entry: &DebuggingInformationEntry<'_, '_, OwnedReader>,
    ) -> SextantResult<Option<Declaration>>
    {
        let Some(file_index) = self.entry_file_index(entry, constants::DW_AT_decl_file)? else {
            return Ok(None);
        };
        let Some(file) = self.line_table_file_spec(unit, file_index) else {
            return Ok(None);
        };
        let line = self
            .entry_udata(entry, constants::DW_AT_decl_line)?
            .map_or(0, |line| u32::try_from(line).unwrap_or(u32::MAX));
        let column = self
            .entry_udata(entry, constants::DW_AT_decl_column)?
            .map_or(0, |column| u16::try_from(column).unwrap_or(u16::MAX));
        Ok(Some(Declaration::new(file, line, column)))
    }

    fn entry_udata(&self, entry: &DebuggingInformationEntry<'_, '_, OwnedReader>, name: constants::DwAt) -> SextantResult<Option<u64>>
    {
        let attr = entry.attr(name).map_err(|err| map_dwarf_error("reading DIE attribute", err))?;
        Ok(attr.and_then(|attr| attr.udata_value()))
    }

    fn entry_file_index(&self, entry: &DebuggingInformationEntry<'_, '_, OwnedReader>, name: constants::DwAt) -> SextantResult<Option<u64>>
    {
        let attr = entry.attr(name).map_err(|err| map_dwarf_error("reading DIE attribute", err))?;
        Ok(attr.and_then(|attr| match attr.value() {
            AttributeValue::FileIndex(index) => Some(index),
            other => other.udata_value(),
        }))
    }
}

fn envelope(ranges: &[AddressRange]) -> AddressRange
{
    let base = ranges.iter().map(|range| range.base()).min().unwrap_or(Address::ZERO);
    let end = ranges.iter().map(|range| range.end().value()).max().unwrap_or(0);
    AddressRange::new(base, end.saturating_sub(base.value()))
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_envelope_spans_all_ranges()
    {
        let ranges = [
            AddressRange::new(Address::new(0x2000), 0x10),
            AddressRange::new(Address::new(0x1000), 0x20),
        ];
        let spanned = envelope(&ranges);
        assert_eq!(spanned.base(), Address::new(0x1000));
        assert_eq!(spanned.end(), Address::new(0x2010));
    }
}
