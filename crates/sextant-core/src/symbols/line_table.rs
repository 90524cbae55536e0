//! Line tables: address-ordered source line mappings.
//!
//! A line table maps machine code to source positions. Each entry carries a
//! *materialized* address range (producers emit rows plus end-of-sequence
//! markers; the range between consecutive rows is computed when the table is
//! built, so no terminal rows appear here).

use crate::types::{Address, AddressRange, SourceLocationSpec};

/// One row of a line table: an address range attributed to a source position.
///
/// `line` 0 means the code has no attributable source line; `column` 0 means
/// the producer recorded no column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineEntry
{
    /// Machine code covered by this entry.
    pub range: AddressRange,
    /// Index into the owning compile unit's support files.
    pub file_index: u32,
    /// Source line, 1-based.
    pub line: u32,
    /// Source column, 1-based, 0 when unrecorded.
    pub column: u16,
    /// Entry is a recommended statement boundary.
    pub is_start_of_statement: bool,
    /// Entry is the first instruction past the function prologue.
    pub is_prologue_end: bool,
}

impl LineEntry
{
    /// Construct an entry with the flags cleared.
    pub fn new(range: AddressRange, file_index: u32, line: u32, column: u16) -> Self
    {
        Self {
            range,
            file_index,
            line,
            column,
            is_start_of_statement: false,
            is_prologue_end: false,
        }
    }
}

/// An address-ordered collection of [`LineEntry`] rows for one compile unit.
#[derive(Debug, Clone, Default)]
pub struct LineTable
{
    entries: Vec<LineEntry>,
}

impl LineTable
{
    /// Build a table from unsorted entries. Sorting is stable, so rows
    /// sharing a base address keep their produced order.
    #[must_use]
    pub fn from_entries(mut entries: Vec<LineEntry>) -> Self
    {
        entries.sort_by_key(|entry| entry.range.base());
        Self { entries }
    }

    /// Number of rows.
    pub fn len(&self) -> usize
    {
        self.entries.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }

    /// Row at `idx`, if in bounds.
    pub fn entry_at(&self, idx: usize) -> Option<&LineEntry>
    {
        self.entries.get(idx)
    }

    /// All rows in address order.
    pub fn entries(&self) -> &[LineEntry]
    {
        &self.entries
    }

    /// Find the row whose range contains `address`.
    pub fn entry_for_address(&self, address: Address) -> Option<(usize, &LineEntry)>
    {
        let after = self.entries.partition_point(|entry| entry.range.base() <= address);
        if after == 0 {
            return None;
        }
        let idx = after - 1;
        let entry = &self.entries[idx];
        if entry.range.contains(address) {
            Some((idx, entry))
        } else {
            None
        }
    }

    /// Find the first row at-or-after a source position, scanning from `start_idx`.
    ///
    /// Only rows whose file index appears in `file_indexes` are considered.
    /// A row on exactly the requested line wins immediately (when the query
    /// carries a column, the row's column must also agree). Otherwise, unless
    /// the query demands an exact match, the row with the smallest line
    /// strictly greater than the target is returned; ties keep the earliest
    /// row.
    ///
    /// Restarting the scan with `start_idx` just past a previous hit
    /// enumerates every matching row in address order.
    ///
    /// ## Returns
    ///
    /// The matching row's index and a copy of the row, or `None`.
    pub fn find_line_entry_index_by_file_index(
        &self,
        start_idx: usize,
        file_indexes: &[u32],
        location: &SourceLocationSpec,
    ) -> Option<(usize, LineEntry)>
    {
        let target_line = location.line().unwrap_or(0);
        let column = location.column();
        let exact = location.exact_match();
        let mut best: Option<usize> = None;

        for (idx, entry) in self.entries.iter().enumerate().skip(start_idx) {
            if !file_indexes.contains(&entry.file_index) {
                continue;
            }
            if entry.line < target_line {
                continue;
            }
            if entry.line == target_line {
                // An exact line hit always wins, but a requested column must
                // agree with the row before it counts as a hit.
                if column.is_some_and(|column| entry.column != column) {
                    continue;
                }
                return Some((idx, *entry));
            }
            if !exact {
                match best {
                    Some(current) if self.entries[current].line <= entry.line => {}
                    _ => best = Some(idx),
                }
            }
        }

        best.map(|idx| (idx, self.entries[idx]))
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn entry(base: u64, size: u64, file_index: u32, line: u32, column: u16) -> LineEntry
    {
        LineEntry::new(AddressRange::new(Address::new(base), size), file_index, line, column)
    }

    fn spec(line: Option<u32>, column: Option<u16>, exact: bool) -> SourceLocationSpec
    {
        SourceLocationSpec::new(crate::types::FileSpec::from_path("main.c"), line, column, false, exact)
    }

    fn sample_table() -> LineTable
    {
        LineTable::from_entries(vec![
            entry(0x1000, 0x10, 0, 10, 0),
            entry(0x1010, 0x10, 0, 12, 0),
            entry(0x1020, 0x10, 1, 13, 0),
            entry(0x1030, 0x10, 0, 20, 5),
            entry(0x1040, 0x10, 0, 20, 9),
        ])
    }

    #[test]
    fn test_exact_line_hit_wins()
    {
        let table = sample_table();
        let (idx, hit) = table.find_line_entry_index_by_file_index(0, &[0], &spec(Some(12), None, false)).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(hit.line, 12);
    }

    #[test]
    fn test_nearest_greater_line_when_inexact()
    {
        let table = sample_table();
        // Line 11 does not exist; the closest following line in file 0 is 12.
        let (_, hit) = table.find_line_entry_index_by_file_index(0, &[0], &spec(Some(11), None, false)).unwrap();
        assert_eq!(hit.line, 12);
    }

    #[test]
    fn test_exact_mode_rejects_nearest()
    {
        let table = sample_table();
        assert!(table.find_line_entry_index_by_file_index(0, &[0], &spec(Some(11), None, true)).is_none());
    }

    #[test]
    fn test_file_index_restriction()
    {
        let table = sample_table();
        let (_, hit) = table.find_line_entry_index_by_file_index(0, &[1], &spec(Some(1), None, false)).unwrap();
        assert_eq!(hit.line, 13);
        assert_eq!(hit.file_index, 1);
    }

    #[test]
    fn test_start_index_resumes_scan()
    {
        let table = sample_table();
        let (first, _) = table.find_line_entry_index_by_file_index(0, &[0], &spec(Some(10), None, false)).unwrap();
        // Resuming past the first hit finds no other row on line 10.
        assert!(table.find_line_entry_index_by_file_index(first + 1, &[0], &spec(Some(10), None, true)).is_none());
    }

    #[test]
    fn test_column_gates_exact_line_hits()
    {
        let table = sample_table();
        let (idx, hit) = table.find_line_entry_index_by_file_index(0, &[0], &spec(Some(20), Some(9), false)).unwrap();
        assert_eq!(idx, 4);
        assert_eq!(hit.column, 9);
        // No column means any column: the first line-20 row wins.
        let (idx, _) = table.find_line_entry_index_by_file_index(0, &[0], &spec(Some(20), None, false)).unwrap();
        assert_eq!(idx, 3);
    }

    #[test]
    fn test_entry_for_address()
    {
        let table = sample_table();
        let (idx, hit) = table.entry_for_address(Address::new(0x1015)).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(hit.line, 12);
        assert!(table.entry_for_address(Address::new(0xfff)).is_none());
        assert!(table.entry_for_address(Address::new(0x1050)).is_none());
    }

    #[test]
    fn test_from_entries_sorts_by_address()
    {
        let table = LineTable::from_entries(vec![entry(0x2000, 0x10, 0, 2, 0), entry(0x1000, 0x10, 0, 1, 0)]);
        assert_eq!(table.entry_at(0).unwrap().line, 1);
        assert_eq!(table.entry_at(1).unwrap().line, 2);
    }
}
