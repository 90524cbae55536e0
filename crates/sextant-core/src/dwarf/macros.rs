//! `.debug_macro` parsing.
//!
//! gimli hands back the raw section bytes, so the opcode stream is walked
//! here directly: a small header, then `DW_MACRO_*` records until a zero
//! opcode. The DWARF 4 GNU extension uses the same layout and opcode
//! numbering, so version 4 units parse through the same path. Imports
//! recurse into shared macro tables with a visited set breaking cycles.

use std::collections::HashSet;
use std::sync::Arc;

use gimli::{constants, AttributeValue, DebugStrOffset, DebugStrOffsetsBase, DebugStrOffsetsIndex, EndianArcSlice, Format, Reader};
use tracing::debug;

use super::{map_dwarf_error, DwarfProvider, OwnedReader};
use crate::error::{SextantError, SextantResult};
use crate::symbols::{CompileUnitId, DebugMacros, MacroEntry};

impl DwarfProvider
{
    pub(super) fn build_debug_macros(&self, id: CompileUnitId) -> SextantResult<Option<DebugMacros>>
    {
        let Some(unit) = self.gimli_unit(id) else {
            return Ok(None);
        };
        let offset = match self
            .unit_root_attr(unit, constants::DW_AT_macros)
            .or_else(|| self.unit_root_attr(unit, constants::DW_AT_GNU_macros))
        {
            Some(AttributeValue::DebugMacroRef(offset)) => offset.0,
            Some(AttributeValue::SecOffset(offset)) => offset,
            _ => return Ok(None),
        };

        let mut visited = HashSet::new();
        let entries = self.read_macro_entries(unit.header.format(), unit.str_offsets_base, offset, &mut visited)?;
        Ok(Some(DebugMacros::from_entries(entries)))
    }

    fn read_macro_entries(
        &self,
        unit_format: Format,
        str_offsets_base: DebugStrOffsetsBase<usize>,
        offset: usize,
        visited: &mut HashSet<usize>,
    ) -> SextantResult<Vec<MacroEntry>>
    {
        // Shared tables may import each other; a revisit adds nothing.
        if !visited.insert(offset) {
            return Ok(Vec::new());
        }

        let Some(bytes) = self.debug_sections.get(".debug_macro") else {
            return Ok(Vec::new());
        };
        if bytes.is_empty() {
            return Ok(Vec::new());
        }

        let mut reader = EndianArcSlice::new(bytes.clone(), self.endian);
        reader
            .skip(offset)
            .map_err(|err| map_dwarf_error("seeking macro unit", err))?;

        let version = reader
            .read_u16()
            .map_err(|err| map_dwarf_error("reading macro unit version", err))?;
        if version != 4 && version != 5 {
            return Err(SextantError::Dwarf {
                context: "reading macro unit header".to_string(),
                message: format!("unsupported macro unit version {version}"),
            });
        }
        let flags = reader
            .read_u8()
            .map_err(|err| map_dwarf_error("reading macro unit flags", err))?;
        let format = if flags & 0x01 != 0 { Format::Dwarf64 } else { Format::Dwarf32 };
        if flags & 0x02 != 0 {
            reader
                .read_offset(format)
                .map_err(|err| map_dwarf_error("reading macro line table offset", err))?;
        }
        if flags & 0x04 != 0 {
            // A vendor opcode table redefines operand encodings, making the
            // rest of the stream unreadable without interpreting it.
            return Err(SextantError::Dwarf {
                context: "reading macro unit header".to_string(),
                message: "vendor extension opcode table is not supported".to_string(),
            });
        }

        let mut entries = Vec::new();
        while !reader.is_empty() {
            let opcode = reader
                .read_u8()
                .map_err(|err| map_dwarf_error("reading macro opcode", err))?;
            if opcode == 0 {
                break;
            }
            match constants::DwMacro(opcode) {
                op @ (constants::DW_MACRO_define | constants::DW_MACRO_undef) => {
                    self.read_macro_line(&mut reader)?;
                    let text = read_null_string(&mut reader)?;
                    entries.push(macro_text_entry(op == constants::DW_MACRO_define, text));
                }
                op @ (constants::DW_MACRO_define_strp | constants::DW_MACRO_undef_strp) => {
                    self.read_macro_line(&mut reader)?;
                    let str_offset = reader
                        .read_offset(format)
                        .map_err(|err| map_dwarf_error("reading macro string offset", err))?;
                    let text = self.debug_str_text(DebugStrOffset(str_offset))?;
                    entries.push(macro_text_entry(op == constants::DW_MACRO_define_strp, text));
                }
                op @ (constants::DW_MACRO_define_strx | constants::DW_MACRO_undef_strx) => {
                    self.read_macro_line(&mut reader)?;
                    let index = reader
                        .read_uleb128()
                        .map_err(|err| map_dwarf_error("reading macro string index", err))?;
                    let str_offset = self
                        .dwarf
                        .debug_str_offsets
                        .get_str_offset(unit_format, str_offsets_base, DebugStrOffsetsIndex(index as usize))
                        .map_err(|err| map_dwarf_error("resolving macro string index", err))?;
                    let text = self.debug_str_text(str_offset)?;
                    entries.push(macro_text_entry(op == constants::DW_MACRO_define_strx, text));
                }
                constants::DW_MACRO_start_file => {
                    let line = self.read_macro_line(&mut reader)?;
                    let file_index = reader
                        .read_uleb128()
                        .map_err(|err| map_dwarf_error("reading macro file index", err))?;
                    entries.push(MacroEntry::StartFile {
                        file_index: u32::try_from(file_index).unwrap_or(u32::MAX),
                        line,
                    });
                }
                constants::DW_MACRO_end_file => {
                    entries.push(MacroEntry::EndFile);
                }
                constants::DW_MACRO_import => {
                    let target = reader
                        .read_offset(format)
                        .map_err(|err| map_dwarf_error("reading macro import offset", err))?;
                    let nested = self.read_macro_entries(unit_format, str_offsets_base, target, visited)?;
                    entries.push(MacroEntry::Include(Arc::new(DebugMacros::from_entries(nested))));
                }
                other => {
                    // Operand layout of unhandled opcodes is unknown, so the
                    // stream cannot be advanced past them.
                    debug!("Stopping macro parse at unhandled opcode {other} in {}", self.path.display());
                    break;
                }
            }
        }
        Ok(entries)
    }

    fn read_macro_line(&self, reader: &mut OwnedReader) -> SextantResult<u32>
    {
        let line = reader
            .read_uleb128()
            .map_err(|err| map_dwarf_error("reading macro source line", err))?;
        Ok(u32::try_from(line).unwrap_or(u32::MAX))
    }

    fn debug_str_text(&self, offset: DebugStrOffset<usize>) -> SextantResult<String>
    {
        let reader = self
            .dwarf
            .string(offset)
            .map_err(|err| map_dwarf_error("resolving macro string", err))?;
        let text = reader
            .to_string_lossy()
            .map_err(|err| map_dwarf_error("decoding macro string", err))?
            .into_owned();
        Ok(text)
    }
}

fn macro_text_entry(is_define: bool, text: String) -> MacroEntry
{
    if is_define {
        MacroEntry::Define { text }
    } else {
        MacroEntry::Undefine { text }
    }
}

fn read_null_string(reader: &mut OwnedReader) -> SextantResult<String>
{
    let length = reader.find(0).map_err(|err| map_dwarf_error("reading macro string", err))?;
    let bytes = reader.split(length).map_err(|err| map_dwarf_error("reading macro string", err))?;
    reader.skip(1).map_err(|err| map_dwarf_error("skipping macro string terminator", err))?;
    let text = bytes
        .to_string_lossy()
        .map_err(|err| map_dwarf_error("decoding macro string", err))?
        .into_owned();
    Ok(text)
}

#[cfg(test)]
mod tests
{
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex;

    use gimli::{Dwarf, RunTimeEndian};

    use super::super::section_reader;
    use super::*;

    fn provider_with_sections(macro_bytes: Vec<u8>, str_bytes: Vec<u8>) -> DwarfProvider
    {
        let mut debug_sections: HashMap<&'static str, Arc<[u8]>> = HashMap::new();
        debug_sections.insert(".debug_macro", Arc::from(macro_bytes));
        debug_sections.insert(".debug_str", Arc::from(str_bytes));
        let endian = RunTimeEndian::Little;
        let dwarf = Dwarf::load(|section| Ok::<_, gimli::Error>(section_reader(&debug_sections, endian, section)))
            .expect("loading in-memory sections");
        DwarfProvider {
            path: PathBuf::from("in-memory"),
            endian,
            debug_sections,
            dwarf,
            units: Vec::new(),
            unit_index_by_id: HashMap::new(),
            parsed_functions: Mutex::new(HashSet::new()),
            load_all_debug_info: AtomicBool::new(false),
        }
    }

    fn parse(provider: &DwarfProvider, offset: usize) -> Vec<MacroEntry>
    {
        provider
            .read_macro_entries(Format::Dwarf32, DebugStrOffsetsBase(0), offset, &mut HashSet::new())
            .expect("parsing macro unit")
    }

    #[test]
    fn test_read_null_string()
    {
        let bytes = Arc::<[u8]>::from(b"NDEBUG 1\0FOO".to_vec());
        let mut reader = EndianArcSlice::new(bytes, RunTimeEndian::Little);
        assert_eq!(read_null_string(&mut reader).unwrap(), "NDEBUG 1");
        // No terminator left in the stream.
        assert!(read_null_string(&mut reader).is_err());
    }

    #[test]
    fn test_parse_inline_define_and_undef()
    {
        let mut bytes = vec![0x05, 0x00, 0x00];
        bytes.push(0x01); // DW_MACRO_define
        bytes.push(0x01); // line
        bytes.extend_from_slice(b"FOO 1\0");
        bytes.push(0x03); // DW_MACRO_start_file
        bytes.push(0x02); // line
        bytes.push(0x01); // file index
        bytes.push(0x02); // DW_MACRO_undef
        bytes.push(0x03); // line
        bytes.extend_from_slice(b"FOO\0");
        bytes.push(0x04); // DW_MACRO_end_file
        bytes.push(0x00);

        let provider = provider_with_sections(bytes, Vec::new());
        let entries = parse(&provider, 0);
        assert_eq!(entries.len(), 4);
        assert!(matches!(&entries[0], MacroEntry::Define { text } if text == "FOO 1"));
        assert!(matches!(entries[1], MacroEntry::StartFile { file_index: 1, line: 2 }));
        assert!(matches!(&entries[2], MacroEntry::Undefine { text } if text == "FOO"));
        assert!(matches!(entries[3], MacroEntry::EndFile));
    }

    #[test]
    fn test_parse_strp_define()
    {
        let mut bytes = vec![0x05, 0x00, 0x00];
        bytes.push(0x05); // DW_MACRO_define_strp
        bytes.push(0x01); // line
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.push(0x00);

        let provider = provider_with_sections(bytes, b"BAR 2\0".to_vec());
        let entries = parse(&provider, 0);
        assert_eq!(entries.len(), 1);
        assert!(matches!(&entries[0], MacroEntry::Define { text } if text == "BAR 2"));
    }

    #[test]
    fn test_parse_import_and_cycle_guard()
    {
        // Unit at offset 0 imports the shared table at offset 9, which
        // imports offset 0 right back.
        let mut bytes = vec![0x05, 0x00, 0x00];
        bytes.push(0x07); // DW_MACRO_import
        bytes.extend_from_slice(&9u32.to_le_bytes());
        bytes.push(0x00);
        assert_eq!(bytes.len(), 9);
        bytes.extend_from_slice(&[0x05, 0x00, 0x00]);
        bytes.push(0x07); // DW_MACRO_import
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.push(0x01); // DW_MACRO_define
        bytes.push(0x04); // line
        bytes.extend_from_slice(b"SHARED 3\0");
        bytes.push(0x00);

        let provider = provider_with_sections(bytes, Vec::new());
        let entries = parse(&provider, 0);
        assert_eq!(entries.len(), 1);
        let MacroEntry::Include(shared) = &entries[0] else {
            panic!("expected an include entry");
        };
        // The back-import resolves to an empty table instead of recursing.
        assert_eq!(shared.len(), 2);
        assert!(matches!(&shared.entries()[0], MacroEntry::Include(nested) if nested.is_empty()));
        assert!(matches!(&shared.entries()[1], MacroEntry::Define { text } if text == "SHARED 3"));
    }

    #[test]
    fn test_unsupported_version_is_an_error()
    {
        let bytes = vec![0x03, 0x00, 0x00, 0x00];
        let provider = provider_with_sections(bytes, Vec::new());
        let result = provider.read_macro_entries(Format::Dwarf32, DebugStrOffsetsBase(0), 0, &mut HashSet::new());
        assert!(result.is_err());
    }
}
