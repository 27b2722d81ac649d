//! Per-operation contexts handed to dialects.

use crate::options::EffectiveOptions;
use crate::strategy::{AssociationStorageStrategy, AssociationTypeContext};
use std::sync::Arc;

/// Context of a tuple operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TupleContext {
    options: EffectiveOptions,
    selectable_columns: Vec<String>,
}

impl TupleContext {
    /// Creates a context with the entity's effective options.
    #[must_use]
    pub fn new(options: EffectiveOptions) -> Self {
        Self {
            options,
            selectable_columns: Vec::new(),
        }
    }

    /// Restricts the columns a read needs to return. Empty means all.
    #[must_use]
    pub fn with_selectable_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.selectable_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the effective options.
    #[must_use]
    pub fn options(&self) -> &EffectiveOptions {
        &self.options
    }

    /// Returns the selectable columns.
    #[must_use]
    pub fn selectable_columns(&self) -> &[String] {
        &self.selectable_columns
    }

    /// Whether a read should return `column`.
    #[must_use]
    pub fn is_selectable(&self, column: &str) -> bool {
        self.selectable_columns.is_empty() || self.selectable_columns.iter().any(|c| c == column)
    }
}

/// Context of an association operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationContext {
    type_context: Arc<AssociationTypeContext>,
}

impl AssociationContext {
    /// Wraps the resolved association type context.
    #[must_use]
    pub fn new(type_context: Arc<AssociationTypeContext>) -> Self {
        Self { type_context }
    }

    /// Returns the association type context.
    #[must_use]
    pub fn type_context(&self) -> &AssociationTypeContext {
        &self.type_context
    }

    /// Returns the resolved strategy.
    #[must_use]
    pub fn strategy(&self) -> AssociationStorageStrategy {
        self.type_context.strategy()
    }

    /// Returns the effective options.
    #[must_use]
    pub fn options(&self) -> &EffectiveOptions {
        self.type_context.options()
    }
}
