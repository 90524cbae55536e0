//! Compile-unit scope variables.

use std::sync::Arc;

use crate::types::Declaration;

/// A global or file-static variable declared at compile unit scope.
#[derive(Debug, Clone)]
pub struct Variable
{
    /// Name as written in the source.
    pub name: String,
    /// Rendered type name, if the provider recovered one.
    pub type_name: Option<String>,
    /// Where the variable was declared, if recorded.
    pub declaration: Option<Declaration>,
}

impl Variable
{
    /// Helper to build a variable when only a name is known.
    pub fn from_name(name: impl Into<String>) -> Self
    {
        Self {
            name: name.into(),
            type_name: None,
            declaration: None,
        }
    }
}

/// The unit-scope variables of one compile unit.
///
/// Shared behind `Arc`: symbol contexts and scope machinery hold references
/// without copying the list.
#[derive(Debug, Clone, Default)]
pub struct VariableList
{
    variables: Vec<Arc<Variable>>,
}

impl VariableList
{
    /// Wrap a vector of variables.
    #[must_use]
    pub fn from_variables(variables: Vec<Arc<Variable>>) -> Self
    {
        Self { variables }
    }

    /// Number of variables.
    pub fn len(&self) -> usize
    {
        self.variables.len()
    }

    /// Whether the list holds no variables.
    pub fn is_empty(&self) -> bool
    {
        self.variables.is_empty()
    }

    /// Variables in declaration order.
    pub fn variables(&self) -> &[Arc<Variable>]
    {
        &self.variables
    }

    /// First variable with the given source name.
    pub fn find_by_name(&self, name: &str) -> Option<&Arc<Variable>>
    {
        self.variables.iter().find(|variable| variable.name == name)
    }
}
