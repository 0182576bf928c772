//! Error types for source model construction
//!
//! Evaluation itself never errors; an expression that cannot be folded
//! simply yields no value. Errors only arise while a driver populates the
//! [`SourceModel`](crate::model::SourceModel) inconsistently.

use thiserror::Error;

use crate::ast::DeclId;

/// Errors raised while building or mutating a source model
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// A declaration id that was never minted by this model
    #[error("unknown declaration id {0:?}")]
    UnknownDeclaration(DeclId),

    /// Compiler-computed constant values are a field-only concept; locals
    /// and parameters get their values from initializers and assignments
    #[error("declaration '{name}' is not a field and cannot carry a computed constant value")]
    NotAField { name: String },
}
