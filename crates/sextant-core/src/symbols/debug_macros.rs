//! Preprocessor macro information from debug info.

use std::sync::Arc;

/// One macro event in source order.
#[derive(Debug, Clone)]
pub enum MacroEntry
{
    /// `#define NAME [VALUE]`.
    Define
    {
        /// Macro name, including any parameter list and replacement text.
        text: String,
    },
    /// `#undef NAME`.
    Undefine
    {
        /// Macro name being removed.
        text: String,
    },
    /// Macro state enters an included file.
    StartFile
    {
        /// Index into the compile unit's support files.
        file_index: u32,
        /// Line of the `#include` in the including file.
        line: u32,
    },
    /// Macro state leaves the current file.
    EndFile,
    /// Reference to a macro table shared with other compile units.
    ///
    /// Producers factor common headers' macros into one table; every unit
    /// including the header points at the same parsed copy.
    Include(Arc<DebugMacros>),
}

/// The macro events of one compile unit (or one shared macro file).
///
/// Shared behind `Arc` so compile units including the same macro file reuse
/// a single parsed table.
#[derive(Debug, Clone, Default)]
pub struct DebugMacros
{
    entries: Vec<MacroEntry>,
}

impl DebugMacros
{
    /// Wrap a vector of macro events.
    #[must_use]
    pub fn from_entries(entries: Vec<MacroEntry>) -> Self
    {
        Self { entries }
    }

    /// Number of events.
    pub fn len(&self) -> usize
    {
        self.entries.len()
    }

    /// Whether the table holds no events.
    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }

    /// Events in source order.
    pub fn entries(&self) -> &[MacroEntry]
    {
        &self.entries
    }
}
