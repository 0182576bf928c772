//! Constant-expression evaluation
//!
//! The evaluator folds an expression to a compile-time value when it can
//! and yields nothing when it cannot. Failure is always soft: analyses call
//! it speculatively over arbitrary code, so an unevaluable expression is an
//! everyday outcome, never an error. Evaluation is a read-only recursive
//! descent over the AST; variable references consult the source model and
//! the backward assignment dataflow in [`crate::assignment`].

use tracing::trace;

use crate::arrays::{self, ArrayIdiom, ARRAY_CONSTRUCTORS};
use crate::assignment::{find_last_value, AssignedValue};
use crate::ast::{
    BinaryOperator, Block, DeclId, Expression, NodeId, PrimitiveType, Statement, TypeRef,
};
use crate::model::{DeclKind, Declaration, SourceModel};
use crate::ops;
use crate::value::{ArrayValue, ElementKind, Value};

/// Evaluation policy, fixed for the lifetime of an evaluator.
///
/// Options are plain data so that concurrent analyses can each carry their
/// own evaluator without shared state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalOptions {
    /// Tolerate unknown operands: a binary operation with one unevaluable
    /// side folds to the known side, and string templates drop fragments
    /// that do not fold. Off by default; the degraded results are meant for
    /// human-readable diagnostics, not correctness-sensitive checks.
    pub allow_unknown: bool,
    /// Fold arbitrary field initializers, not just `static final` fields
    pub allow_field_initializers: bool,
}

impl EvalOptions {
    pub fn allow_unknown(mut self, allow: bool) -> Self {
        self.allow_unknown = allow;
        self
    }

    pub fn allow_field_initializers(mut self, allow: bool) -> Self {
        self.allow_field_initializers = allow;
        self
    }
}

/// Folds expressions against a resolved [`SourceModel`]
pub struct ConstantEvaluator<'m> {
    model: &'m SourceModel,
    options: EvalOptions,
}

impl<'m> ConstantEvaluator<'m> {
    /// An evaluator with strict defaults
    pub fn new(model: &'m SourceModel) -> Self {
        Self::with_options(model, EvalOptions::default())
    }

    pub fn with_options(model: &'m SourceModel, options: EvalOptions) -> Self {
        Self { model, options }
    }

    pub fn options(&self) -> EvalOptions {
        self.options
    }

    /// Fold an expression to a constant, or nothing if it does not fold
    pub fn evaluate(&self, expr: &Expression) -> Option<Value> {
        match expr {
            Expression::Literal { value, .. } => Some(value.clone()),

            Expression::UnaryOp { op, operand, .. } => {
                let operand = self.evaluate(operand)?;
                ops::apply_unary(*op, &operand)
            }

            Expression::BinaryOp { op, left, right, .. } => {
                let left = self.evaluate(left);
                let right = self.evaluate(right);
                self.fold_binary(*op, left, right)
            }

            Expression::Polyadic { op, operands, .. } => {
                let mut iter = operands.iter();
                let mut acc = self.evaluate(iter.next()?);
                for operand in iter {
                    acc = self.fold_binary(*op, acc, self.evaluate(operand));
                }
                acc
            }

            Expression::StringTemplate { parts, .. } => self.evaluate_template(parts),

            Expression::Conditional {
                condition,
                then_expr,
                else_expr,
                ..
            } => match self.evaluate(condition)? {
                // only the taken branch is ever visited
                Value::Bool(true) => self.evaluate(then_expr),
                Value::Bool(false) => else_expr.as_deref().and_then(|e| self.evaluate(e)),
                _ => None,
            },

            Expression::Paren { expr, .. } => self.evaluate(expr),

            Expression::Cast { operand, target, .. } => {
                let operand = self.evaluate(operand)?;
                cast_value(operand, target)
            }

            Expression::VarRef { decl, .. } => {
                let declaration = self.model.declaration(*decl)?;
                if declaration.is_field() {
                    self.evaluate_field_ref(declaration, expr)
                } else {
                    self.evaluate_local_ref(declaration, expr)
                }
            }

            Expression::MemberAccess { object, field, .. } => {
                if field != "length" && field != "size" {
                    return None;
                }
                let object = self.evaluate(object)?;
                let size = object.array_size()?;
                Some(Value::Int(size as i32))
            }

            Expression::NewArray {
                element,
                length,
                dimensions,
                ..
            } => {
                let length = self.evaluate(length)?.as_i32()?;
                if length < 0 {
                    return None;
                }
                Some(arrays::fresh_array(*element, length as usize, *dimensions))
            }

            Expression::ArrayInitializer { element, elements, .. } => {
                // the cap check comes before any element folds, so the
                // element count also bounds evaluation cost
                if elements.len() >= arrays::MAX_INITIALIZER_ELEMENTS {
                    return Some(Value::Array(ArrayValue::Reference {
                        kind: *element,
                        length: elements.len(),
                        dimensions: 1,
                    }));
                }
                let evaluated: Vec<_> = elements.iter().map(|e| self.evaluate(e)).collect();
                arrays::array_from_initializer(*element, evaluated, self.options.allow_unknown)
            }

            Expression::Call { name, args, .. } => {
                match ARRAY_CONSTRUCTORS.get(name.as_str())? {
                    ArrayIdiom::Initializer(declared) => {
                        if args.len() >= arrays::MAX_INITIALIZER_ELEMENTS {
                            return Some(Value::Array(ArrayValue::Reference {
                                kind: declared.unwrap_or(ElementKind::Object),
                                length: args.len(),
                                dimensions: 1,
                            }));
                        }
                        let evaluated: Vec<_> = args.iter().map(|e| self.evaluate(e)).collect();
                        let kind = declared.unwrap_or_else(|| arrays::infer_kind(&evaluated));
                        arrays::array_from_initializer(kind, evaluated, self.options.allow_unknown)
                    }
                    ArrayIdiom::Sized(kind) => {
                        if args.len() != 1 {
                            return None;
                        }
                        let length = self.evaluate(&args[0])?.as_i32()?;
                        if length < 0 {
                            return None;
                        }
                        Some(arrays::fresh_array(*kind, length as usize, 1))
                    }
                }
            }

            Expression::Index { array, index, .. } => {
                let index = self.evaluate(index)?.as_i32()?;
                if index < 0 {
                    return None;
                }
                match self.evaluate(array)? {
                    Value::Array(ArrayValue::Materialized { elements, .. }) => {
                        elements.get(index as usize).cloned()
                    }
                    _ => None,
                }
            }
        }
    }

    /// Fold an expression and return it only if it is a string
    pub fn evaluate_string(&self, expr: &Expression) -> Option<String> {
        match self.evaluate(expr)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    fn fold_binary(
        &self,
        op: BinaryOperator,
        left: Option<Value>,
        right: Option<Value>,
    ) -> Option<Value> {
        match (left, right) {
            (Some(left), Some(right)) => ops::apply_binary(op, &left, &right),
            // with allow_unknown a lone known operand passes through,
            // which keeps partial string concatenations readable
            (Some(known), None) | (None, Some(known)) if self.options.allow_unknown => {
                trace!(?op, "unknown operand, passing known side through");
                Some(known)
            }
            _ => None,
        }
    }

    fn evaluate_template(&self, parts: &[Expression]) -> Option<Value> {
        match parts {
            // an empty template is the empty string
            [] => Some(Value::String(String::new())),
            // a single part is returned as-is, string or not
            [part] => self.evaluate(part),
            _ => {
                let mut out = String::new();
                for part in parts {
                    match self.evaluate(part) {
                        Some(value) => out.push_str(&value.to_string()),
                        None if self.options.allow_unknown => continue,
                        None => return None,
                    }
                }
                Some(Value::String(out))
            }
        }
    }

    fn evaluate_field_ref(&self, decl: &Declaration, usage: &Expression) -> Option<Value> {
        // a compiler-computed constant wins outright
        if let Some(value) = &decl.constant_value {
            return Some(value.clone());
        }

        let immutable = matches!(
            decl.kind,
            DeclKind::Field {
                is_static: true,
                is_final: true,
            }
        );
        if !immutable && !self.options.allow_field_initializers {
            return None;
        }
        let initializer = decl.initializer.as_ref()?;
        if self.surrounded_by_variable_check(usage, decl.id) {
            return None;
        }
        self.evaluate(initializer)
    }

    fn evaluate_local_ref(&self, decl: &Declaration, usage: &Expression) -> Option<Value> {
        match find_last_value(self.model, decl.id, usage, self) {
            Some(AssignedValue::Known(value)) => {
                if self.surrounded_by_variable_check(usage, decl.id) {
                    return None;
                }
                Some(value)
            }
            // reassigned on some path: the initializer must not be trusted
            Some(AssignedValue::AssignedButUnknown) => None,
            None => {
                let initializer = decl.initializer.as_ref()?;
                if self.surrounded_by_variable_check(usage, decl.id) {
                    return None;
                }
                self.evaluate(initializer)
            }
        }
    }

    /// Heuristic guard against folding across validation idioms: a
    /// reference inside the body of a conditional that tests the same
    /// variable (`if (x > MAX) { use(x); }`) does not fold. References
    /// inside the tested condition itself are exempt. This trades recall
    /// for precision and is deliberately isolated so it can be tuned.
    fn surrounded_by_variable_check(&self, usage: &Expression, variable: DeclId) -> bool {
        let Some(body) = self.model.enclosing_body(usage.id()) else {
            return false;
        };
        let Some(guards) = self.guards_in_block(&body.block, usage.id()) else {
            return false;
        };
        let suppressed = guards
            .iter()
            .any(|g| !g.in_condition && g.condition.references(variable));
        if suppressed {
            trace!(?variable, "reference guarded by a check on the same variable");
        }
        suppressed
    }

    fn guards_in_block(
        &self,
        block: &'m Block,
        target: NodeId,
    ) -> Option<Vec<Guard<'m>>> {
        block
            .statements
            .iter()
            .find_map(|stmt| self.guards_in_stmt(stmt, target))
    }

    fn guards_in_stmt(
        &self,
        stmt: &'m Statement,
        target: NodeId,
    ) -> Option<Vec<Guard<'m>>> {
        match stmt {
            Statement::Declaration { decl, .. } => {
                let init = self.model.declaration(*decl)?.initializer.as_ref()?;
                guards_in_expr(init, target)
            }
            Statement::Assignment { value, .. } => guards_in_expr(value, target),
            Statement::Expression { expr, .. } => guards_in_expr(expr, target),
            Statement::If {
                condition,
                then_block,
                else_block,
                ..
            } => {
                if let Some(mut guards) = guards_in_expr(condition, target) {
                    guards.push(Guard {
                        condition,
                        in_condition: true,
                    });
                    return Some(guards);
                }
                let from_branch = self.guards_in_block(then_block, target).or_else(|| {
                    else_block
                        .as_ref()
                        .and_then(|b| self.guards_in_block(b, target))
                })?;
                let mut guards = from_branch;
                guards.push(Guard {
                    condition,
                    in_condition: false,
                });
                Some(guards)
            }
            // loops and switches are not counted as guards
            Statement::While { condition, body, .. } => guards_in_expr(condition, target)
                .or_else(|| self.guards_in_block(body, target)),
            Statement::For { condition, body, .. } => condition
                .as_ref()
                .and_then(|c| guards_in_expr(c, target))
                .or_else(|| self.guards_in_block(body, target)),
            Statement::Switch { scrutinee, arms, .. } => {
                guards_in_expr(scrutinee, target).or_else(|| {
                    arms.iter().find_map(|arm| {
                        arm.labels
                            .iter()
                            .find_map(|l| guards_in_expr(l, target))
                            .or_else(|| self.guards_in_block(&arm.body, target))
                    })
                })
            }
            Statement::Block { block, .. } => self.guards_in_block(block, target),
            Statement::Return { value, .. } => {
                value.as_ref().and_then(|v| guards_in_expr(v, target))
            }
        }
    }
}

struct Guard<'m> {
    condition: &'m Expression,
    in_condition: bool,
}

fn guards_in_expr<'m>(expr: &'m Expression, target: NodeId) -> Option<Vec<Guard<'m>>> {
    if expr.id() == target {
        return Some(Vec::new());
    }
    if let Expression::Conditional {
        condition,
        then_expr,
        else_expr,
        ..
    } = expr
    {
        if let Some(mut guards) = guards_in_expr(condition, target) {
            guards.push(Guard {
                condition,
                in_condition: true,
            });
            return Some(guards);
        }
        let from_branch = guards_in_expr(then_expr, target).or_else(|| {
            else_expr
                .as_deref()
                .and_then(|e| guards_in_expr(e, target))
        })?;
        let mut guards = from_branch;
        guards.push(Guard {
            condition,
            in_condition: false,
        });
        return Some(guards);
    }
    expr.children()
        .into_iter()
        .find_map(|child| guards_in_expr(child, target))
}

/// Whether an expression syntactically constructs an array, without
/// evaluating it
pub fn is_array_literal(expr: &Expression) -> bool {
    match expr {
        Expression::NewArray { .. } | Expression::ArrayInitializer { .. } => true,
        Expression::Paren { expr, .. } => is_array_literal(expr),
        Expression::Call { name, .. } => ARRAY_CONSTRUCTORS.contains_key(name.as_str()),
        _ => false,
    }
}

/// Numeric cast conversions; non-numeric operands pass through unchanged
fn cast_value(value: Value, target: &TypeRef) -> Option<Value> {
    let TypeRef::Primitive(target) = target else {
        return Some(value);
    };
    if !value.is_number() {
        return Some(value);
    }
    let cast = match target {
        PrimitiveType::Int => Value::Int(match value {
            // float-to-int conversion saturates at the type bounds
            Value::Float(f) => f as i32,
            Value::Double(f) => f as i32,
            _ => value.as_i64()? as i32,
        }),
        PrimitiveType::Long => Value::Long(match value {
            Value::Float(f) => f as i64,
            Value::Double(f) => f as i64,
            _ => value.as_i64()?,
        }),
        PrimitiveType::Short => Value::Short(value.as_i32()? as i16),
        PrimitiveType::Byte => Value::Byte(value.as_i32()? as i8),
        PrimitiveType::Char => Value::Char(value.as_i32()? as u16),
        PrimitiveType::Float => Value::Float(value.as_f32()?),
        PrimitiveType::Double => Value::Double(value.as_f64()?),
        // no numeric-to-boolean conversion exists
        PrimitiveType::Boolean => return None,
    };
    Some(cast)
}
