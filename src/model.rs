//! Resolved source model: declarations and function bodies
//!
//! The model is the evaluator's stand-in for a resolved program: every
//! variable reference in the AST points at a [`Declaration`] registered
//! here, and function bodies are registered so the dataflow pass can find
//! the statements surrounding a reference. Initializers live on the
//! declaration, not in the statement stream.

use serde::{Deserialize, Serialize};

use crate::ast::{Block, DeclId, Expression, NodeId, Statement, TypeRef};
use crate::error::ModelError;
use crate::value::Value;

/// What sort of declaration this is; the evaluator treats fields and
/// locals differently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclKind {
    /// A local variable
    Local,
    /// A function parameter; participates in dataflow at nesting level zero
    Parameter,
    /// A field; folded through its compiler constant or its initializer
    Field { is_static: bool, is_final: bool },
}

/// A resolved declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub id: DeclId,
    pub name: String,
    pub kind: DeclKind,
    pub ty: Option<TypeRef>,
    /// The declared initializer expression, if any
    pub initializer: Option<Expression>,
    /// A compiler-computed constant (the `static final` fast path);
    /// fields only
    pub constant_value: Option<Value>,
}

impl Declaration {
    pub fn is_field(&self) -> bool {
        matches!(self.kind, DeclKind::Field { .. })
    }

    pub fn is_final_field(&self) -> bool {
        matches!(self.kind, DeclKind::Field { is_final: true, .. })
    }
}

/// A function (or initializer) body registered with the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub name: String,
    pub params: Vec<DeclId>,
    pub block: Block,
}

/// The resolved program the evaluator reads from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceModel {
    declarations: Vec<Declaration>,
    bodies: Vec<Body>,
}

impl SourceModel {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a declaration and return its id
    pub fn declare(&mut self, name: &str, kind: DeclKind, ty: Option<TypeRef>) -> DeclId {
        let id = DeclId(self.declarations.len() as u32);
        self.declarations.push(Declaration {
            id,
            name: name.to_string(),
            kind,
            ty,
            initializer: None,
            constant_value: None,
        });
        id
    }

    /// Look up a declaration by id
    pub fn declaration(&self, id: DeclId) -> Option<&Declaration> {
        self.declarations.get(id.0 as usize)
    }

    /// Attach (or replace) the initializer of a declaration
    pub fn set_initializer(&mut self, id: DeclId, initializer: Expression) -> Result<(), ModelError> {
        let decl = self
            .declarations
            .get_mut(id.0 as usize)
            .ok_or(ModelError::UnknownDeclaration(id))?;
        decl.initializer = Some(initializer);
        Ok(())
    }

    /// Record a compiler-computed constant for a field declaration
    pub fn set_constant_value(&mut self, id: DeclId, value: Value) -> Result<(), ModelError> {
        let decl = self
            .declarations
            .get_mut(id.0 as usize)
            .ok_or(ModelError::UnknownDeclaration(id))?;
        if !decl.is_field() {
            return Err(ModelError::NotAField {
                name: decl.name.clone(),
            });
        }
        decl.constant_value = Some(value);
        Ok(())
    }

    /// Register a function body
    pub fn add_body(&mut self, name: &str, params: Vec<DeclId>, block: Block) {
        self.bodies.push(Body {
            name: name.to_string(),
            params,
            block,
        });
    }

    /// All registered bodies
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// The body whose statement tree contains the given node
    pub fn enclosing_body(&self, node: NodeId) -> Option<&Body> {
        self.bodies
            .iter()
            .find(|body| self.block_contains(&body.block, node))
    }

    /// Whether `target` occurs anywhere in the given block, descending into
    /// declaration initializers stored on the model
    pub fn block_contains(&self, block: &Block, target: NodeId) -> bool {
        block
            .statements
            .iter()
            .any(|stmt| self.statement_contains(stmt, target))
    }

    fn statement_contains(&self, stmt: &Statement, target: NodeId) -> bool {
        if stmt.id() == target {
            return true;
        }
        match stmt {
            Statement::Declaration { decl, .. } => self
                .declaration(*decl)
                .and_then(|d| d.initializer.as_ref())
                .is_some_and(|init| init.contains(target)),
            Statement::Assignment { value, .. } => value.contains(target),
            Statement::Expression { expr, .. } => expr.contains(target),
            Statement::If {
                condition,
                then_block,
                else_block,
                ..
            } => {
                condition.contains(target)
                    || self.block_contains(then_block, target)
                    || else_block
                        .as_ref()
                        .is_some_and(|b| self.block_contains(b, target))
            }
            Statement::While { condition, body, .. } => {
                condition.contains(target) || self.block_contains(body, target)
            }
            Statement::For { condition, body, .. } => {
                condition.as_ref().is_some_and(|c| c.contains(target))
                    || self.block_contains(body, target)
            }
            Statement::Switch { scrutinee, arms, .. } => {
                scrutinee.contains(target)
                    || arms.iter().any(|arm| {
                        arm.labels.iter().any(|l| l.contains(target))
                            || self.block_contains(&arm.body, target)
                    })
            }
            Statement::Block { block, .. } => self.block_contains(block, target),
            Statement::Return { value, .. } => {
                value.as_ref().is_some_and(|v| v.contains(target))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstBuilder;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_constant_values_are_field_only() {
        let mut model = SourceModel::new();
        let field = model.declare(
            "LIMIT",
            DeclKind::Field {
                is_static: true,
                is_final: true,
            },
            None,
        );
        let local = model.declare("x", DeclKind::Local, None);

        assert_eq!(model.set_constant_value(field, Value::Int(100)), Ok(()));
        assert_eq!(
            model.set_constant_value(local, Value::Int(1)),
            Err(ModelError::NotAField { name: "x".into() })
        );
        assert_eq!(
            model.declaration(field).unwrap().constant_value,
            Some(Value::Int(100))
        );
    }

    #[test]
    fn test_unknown_declaration() {
        let mut model = SourceModel::new();
        let bogus = DeclId(42);
        assert_eq!(
            model.set_initializer(bogus, AstBuilder::new().int(1)),
            Err(ModelError::UnknownDeclaration(bogus))
        );
    }

    #[test]
    fn test_enclosing_body_descends_into_initializers() {
        let mut model = SourceModel::new();
        let mut b = AstBuilder::new();

        let x = model.declare("x", DeclKind::Local, None);
        let init = b.int(5);
        let init_id = init.id();
        model.set_initializer(x, init).unwrap();

        let usage = b.var_ref(x);
        let usage_id = usage.id();
        let decl_stmt = b.declare_stmt(x);
        let ret = b.ret(Some(usage));
        model.add_body("test", vec![], Block::new(vec![decl_stmt, ret]));

        assert_eq!(model.enclosing_body(usage_id).map(|b| b.name.as_str()), Some("test"));
        assert_eq!(model.enclosing_body(init_id).map(|b| b.name.as_str()), Some("test"));
        assert_eq!(model.enclosing_body(NodeId(9999)), None);
    }

    #[test]
    fn test_block_contains_nested_statements() {
        let mut model = SourceModel::new();
        let mut b = AstBuilder::new();
        let x = model.declare("x", DeclKind::Local, None);

        let inner_value = b.int(10);
        let inner_id = inner_value.id();
        let assign = b.assign(x, inner_value);
        let cond = b.boolean(true);
        let if_stmt = b.if_stmt(cond, Block::new(vec![assign]), None);
        let block = Block::new(vec![if_stmt]);

        assert!(model.block_contains(&block, inner_id));
        assert!(!model.block_contains(&block, NodeId(9999)));
    }
}
