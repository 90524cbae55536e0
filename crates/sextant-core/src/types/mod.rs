//! # Types
//!
//! Foundation value types used throughout the symbol layer.
//!
//! These types carry no debug-format knowledge of their own: addresses are
//! plain file addresses, file specs are split paths with matching rules, and
//! location specs describe what a caller is searching for without saying how
//! the search runs.

pub mod address;
pub mod file_spec;
pub mod language;
pub mod source_location;

// Re-export all public types
pub use address::{Address, AddressRange};
pub use file_spec::FileSpec;
pub use language::Language;
pub use source_location::{Declaration, SourceLocationSpec};
