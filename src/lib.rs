//! jfold - constant-expression evaluation for Java-like ASTs
//!
//! A folding engine for static analysis tools: given a resolved AST view
//! of Java-like source code, it computes compile-time values for
//! expressions where possible, with JVM arithmetic semantics (wrapping
//! integer math, `>>>`, binary numeric promotion, Java string rendering).
//! Evaluation is speculative and side-effect-free; an expression that
//! cannot be folded simply yields no value.
//!
//! # Example
//!
//! ```
//! use jfold::{AstBuilder, BinaryOperator, SourceModel, Value};
//!
//! let model = SourceModel::new();
//! let mut b = AstBuilder::new();
//!
//! let one = b.int(1);
//! let two = b.int(2);
//! let sum = b.binary(BinaryOperator::Add, one, two);
//!
//! assert_eq!(jfold::evaluate(&model, &sum), Some(Value::Int(3)));
//! ```
//!
//! References to variables and fields resolve through a [`SourceModel`];
//! local variables additionally get a backward dataflow walk over the
//! enclosing body so that straight-line reassignments fold while
//! conditional ones do not.

pub mod arrays;
pub mod assignment;
pub mod ast;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod ops;
pub mod value;

// Re-export commonly used types
pub use assignment::{find_last_assignment, find_last_value, AssignedValue};
pub use ast::{
    AstBuilder, BinaryOperator, Block, DeclId, Expression, NodeId, PrimitiveType, SourceSpan,
    Statement, SwitchArm, TypeRef, UnaryOperator,
};
pub use error::ModelError;
pub use evaluator::{is_array_literal, ConstantEvaluator, EvalOptions};
pub use model::{Body, DeclKind, Declaration, SourceModel};
pub use value::{ArrayValue, ElementKind, Value, LARGEST_LITERAL_ARRAY};

/// Fold an expression with strict defaults
pub fn evaluate(model: &SourceModel, expr: &Expression) -> Option<Value> {
    ConstantEvaluator::new(model).evaluate(expr)
}

/// Fold an expression under the given options
pub fn evaluate_with_options(
    model: &SourceModel,
    expr: &Expression,
    options: EvalOptions,
) -> Option<Value> {
    ConstantEvaluator::with_options(model, options).evaluate(expr)
}

/// Fold an expression and return the result only if it is a string
pub fn evaluate_string(model: &SourceModel, expr: &Expression) -> Option<String> {
    ConstantEvaluator::new(model).evaluate_string(expr)
}

/// jfold version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
