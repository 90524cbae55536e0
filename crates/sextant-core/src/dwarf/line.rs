//! Line number program decoding: line tables and support files.
//!
//! Rows are materialized into address ranges as the program executes: each
//! row covers the bytes up to the next row's address, and an end-of-sequence
//! row closes the range without contributing an entry of its own.

use std::path::PathBuf;

use gimli::{ColumnType, FileEntry, LineProgramHeader, Unit};

use super::{map_dwarf_error, DwarfProvider, OwnedReader};
use crate::error::SextantResult;
use crate::symbols::{CompileUnitId, LineEntry, LineTable, SupportFileList};
use crate::types::{Address, AddressRange, FileSpec};

struct PendingRow
{
    address: u64,
    file_index: u32,
    line: u32,
    column: u16,
    is_stmt: bool,
    prologue_end: bool,
}

impl DwarfProvider
{
    pub(super) fn build_line_table(&self, id: CompileUnitId) -> SextantResult<Option<LineTable>>
    {
        let Some(unit) = self.gimli_unit(id) else {
            return Ok(None);
        };
        let Some(program) = unit.line_program.clone() else {
            return Ok(None);
        };

        let mut entries = Vec::new();
        let mut pending: Option<PendingRow> = None;
        let mut rows = program.rows();
        while let Some((_, row)) = rows
            .next_row()
            .map_err(|err| map_dwarf_error("stepping line number program", err))?
        {
            let address = row.address();
            if let Some(prev) = pending.take() {
                // Zero-sized rows carry no machine code; drop them.
                let size = address.saturating_sub(prev.address);
                if size > 0 {
                    let mut entry =
                        LineEntry::new(AddressRange::new(Address::new(prev.address), size), prev.file_index, prev.line, prev.column);
                    entry.is_start_of_statement = prev.is_stmt;
                    entry.is_prologue_end = prev.prologue_end;
                    entries.push(entry);
                }
            }
            if !row.end_sequence() {
                pending = Some(PendingRow {
                    address,
                    file_index: u32::try_from(row.file_index()).unwrap_or(u32::MAX),
                    line: row.line().map_or(0, |line| u32::try_from(line.get()).unwrap_or(u32::MAX)),
                    column: match row.column() {
                        ColumnType::LeftEdge => 0,
                        ColumnType::Column(column) => u16::try_from(column.get()).unwrap_or(u16::MAX),
                    },
                    is_stmt: row.is_stmt(),
                    prologue_end: row.prologue_end(),
                });
            }
        }

        if entries.is_empty() {
            return Ok(None);
        }
        Ok(Some(LineTable::from_entries(entries)))
    }

    /// Fill `files` so that its indexes coincide with the raw file indexes
    /// the unit's line table uses.
    pub(super) fn build_support_files(&self, id: CompileUnitId, files: &mut SupportFileList) -> SextantResult<()>
    {
        let Some(unit) = self.gimli_unit(id) else {
            return Ok(());
        };
        let Some(program) = unit.line_program.as_ref() else {
            return Ok(());
        };
        let header = program.header();
        if header.encoding().version < 5 {
            // Pre-v5 tables number files from 1; index 0 is the unit itself.
            files.append(self.unit_primary_file(unit));
        }
        for file in header.file_names() {
            files.append(self.file_entry_spec(unit, header, file));
        }
        Ok(())
    }

    /// File spec for a raw line-table file index, bypassing the compile
    /// unit's support file facet (used while that facet may not exist yet).
    pub(super) fn line_table_file_spec(&self, unit: &Unit<OwnedReader>, index: u64) -> Option<FileSpec>
    {
        let program = unit.line_program.as_ref()?;
        let header = program.header();
        if header.encoding().version < 5 && index == 0 {
            return Some(self.unit_primary_file(unit));
        }
        header.file(index).map(|file| self.file_entry_spec(unit, header, file))
    }

    /// A file table entry as an absolute-as-possible [`FileSpec`]: the raw
    /// name, prefixed by its directory entry and the compilation directory
    /// until one of them is absolute.
    fn file_entry_spec(&self, unit: &Unit<OwnedReader>, header: &LineProgramHeader<OwnedReader>, file: &FileEntry<OwnedReader>) -> FileSpec
    {
        let name = PathBuf::from(self.attr_to_string(unit, file.path_name()).unwrap_or_default());
        if name.is_absolute() {
            return FileSpec::from_path(&name);
        }
        let mut base = self.unit_comp_dir(unit).map(PathBuf::from).unwrap_or_default();
        if let Some(directory) = file.directory(header) {
            if let Ok(directory) = self.attr_to_string(unit, directory) {
                let directory = PathBuf::from(directory);
                base = if directory.is_absolute() { directory } else { base.join(directory) };
            }
        }
        FileSpec::from_path(&base.join(name))
    }
}
