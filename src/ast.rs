//! Abstract syntax tree the evaluator walks
//!
//! This is the minimal "AST view" a lint driver adapts its concrete parse
//! trees onto: literals, operator applications, references, casts, calls,
//! array constructions, and just enough statement structure (blocks,
//! conditionals, loops, assignments) for the backward assignment dataflow
//! pass. Name/type resolution is assumed to have happened already: variable
//! references carry the [`DeclId`] of the declaration they denote.

use serde::{Deserialize, Serialize};

use crate::value::{ElementKind, Value};

/// Identity of a single AST node. Ids must be unique within one
/// [`SourceModel`](crate::model::SourceModel); use one [`AstBuilder`] per
/// model to guarantee that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Identity of a resolved declaration (local, parameter or field)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeclId(pub u32);

/// Source location information (always available)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
    pub length: usize,
}

/// Primitive types, for casts and array elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

/// A type reference, as written at a cast or declaration site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeRef {
    Primitive(PrimitiveType),
    /// A class type by qualified name; casts to class types pass values
    /// through unchanged
    Class(String),
    /// An array type: element type plus dimension count
    Array(PrimitiveType, usize),
}

/// Unary (prefix) operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    Not,        // !
    Plus,       // +
    Minus,      // -
    BitwiseNot, // ~
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    // Arithmetic
    Add,      // +
    Subtract, // -
    Multiply, // *
    Divide,   // /
    Modulo,   // %

    // Comparison
    Equal,              // ==
    NotEqual,           // !=
    LessThan,           // <
    LessThanOrEqual,    // <=
    GreaterThan,        // >
    GreaterThanOrEqual, // >=

    // Logical
    And, // &&
    Or,  // ||

    // Bitwise
    BitwiseAnd,         // &
    BitwiseOr,          // |
    BitwiseXor,         // ^
    ShiftLeft,          // <<
    ShiftRight,         // >>
    UnsignedShiftRight, // >>>
}

/// Expression (produces a value)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Literal value
    Literal {
        value: Value,
        id: NodeId,
        span: Option<SourceSpan>,
    },

    /// Unary operation: `!a`, `-a`, `~a`, `+a`
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
        id: NodeId,
        span: Option<SourceSpan>,
    },

    /// Binary operation: `a + b`, `a == b`, etc.
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
        id: NodeId,
        span: Option<SourceSpan>,
    },

    /// Polyadic operation: `a + b + c`; folded left to right
    Polyadic {
        op: BinaryOperator,
        operands: Vec<Expression>,
        id: NodeId,
        span: Option<SourceSpan>,
    },

    /// A string template / interpolation: `"a${x}b"`. Zero parts is legal
    /// and denotes the empty string.
    StringTemplate {
        parts: Vec<Expression>,
        id: NodeId,
        span: Option<SourceSpan>,
    },

    /// Conditional: `condition ? then_expr : else_expr`
    Conditional {
        condition: Box<Expression>,
        then_expr: Box<Expression>,
        else_expr: Option<Box<Expression>>,
        id: NodeId,
        span: Option<SourceSpan>,
    },

    /// Parenthesized expression: `(expr)`
    Paren {
        expr: Box<Expression>,
        id: NodeId,
        span: Option<SourceSpan>,
    },

    /// Type cast: `(int) expr`
    Cast {
        operand: Box<Expression>,
        target: TypeRef,
        id: NodeId,
        span: Option<SourceSpan>,
    },

    /// Reference to a resolved variable, parameter or field
    VarRef {
        decl: DeclId,
        id: NodeId,
        span: Option<SourceSpan>,
    },

    /// Member access on a receiver expression: `array.length`, `list.size`
    MemberAccess {
        object: Box<Expression>,
        field: String,
        id: NodeId,
        span: Option<SourceSpan>,
    },

    /// Sized array construction with no element data: `new int[n]`
    NewArray {
        element: ElementKind,
        length: Box<Expression>,
        dimensions: usize,
        id: NodeId,
        span: Option<SourceSpan>,
    },

    /// Array construction from an initializer list: `new int[] {1, 2, 3}`
    ArrayInitializer {
        element: ElementKind,
        elements: Vec<Expression>,
        id: NodeId,
        span: Option<SourceSpan>,
    },

    /// Call expression: `name(args)`. Only the array-construction idioms
    /// (`arrayOf`, `intArrayOf` .., `IntArray(n)`, `arrayOfNulls(n)`) are
    /// ever folded; other calls are opaque.
    Call {
        name: String,
        args: Vec<Expression>,
        id: NodeId,
        span: Option<SourceSpan>,
    },

    /// Array index access: `array[index]`
    Index {
        array: Box<Expression>,
        index: Box<Expression>,
        id: NodeId,
        span: Option<SourceSpan>,
    },
}

impl Expression {
    /// Get the id of this expression
    pub fn id(&self) -> NodeId {
        match self {
            Expression::Literal { id, .. } => *id,
            Expression::UnaryOp { id, .. } => *id,
            Expression::BinaryOp { id, .. } => *id,
            Expression::Polyadic { id, .. } => *id,
            Expression::StringTemplate { id, .. } => *id,
            Expression::Conditional { id, .. } => *id,
            Expression::Paren { id, .. } => *id,
            Expression::Cast { id, .. } => *id,
            Expression::VarRef { id, .. } => *id,
            Expression::MemberAccess { id, .. } => *id,
            Expression::NewArray { id, .. } => *id,
            Expression::ArrayInitializer { id, .. } => *id,
            Expression::Call { id, .. } => *id,
            Expression::Index { id, .. } => *id,
        }
    }

    /// Get the span of this expression, if available
    pub fn span(&self) -> Option<&SourceSpan> {
        match self {
            Expression::Literal { span, .. } => span.as_ref(),
            Expression::UnaryOp { span, .. } => span.as_ref(),
            Expression::BinaryOp { span, .. } => span.as_ref(),
            Expression::Polyadic { span, .. } => span.as_ref(),
            Expression::StringTemplate { span, .. } => span.as_ref(),
            Expression::Conditional { span, .. } => span.as_ref(),
            Expression::Paren { span, .. } => span.as_ref(),
            Expression::Cast { span, .. } => span.as_ref(),
            Expression::VarRef { span, .. } => span.as_ref(),
            Expression::MemberAccess { span, .. } => span.as_ref(),
            Expression::NewArray { span, .. } => span.as_ref(),
            Expression::ArrayInitializer { span, .. } => span.as_ref(),
            Expression::Call { span, .. } => span.as_ref(),
            Expression::Index { span, .. } => span.as_ref(),
        }
    }

    /// Direct sub-expressions, in source order
    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::Literal { .. } | Expression::VarRef { .. } => Vec::new(),
            Expression::UnaryOp { operand, .. } => vec![operand],
            Expression::BinaryOp { left, right, .. } => vec![left, right],
            Expression::Polyadic { operands, .. } => operands.iter().collect(),
            Expression::StringTemplate { parts, .. } => parts.iter().collect(),
            Expression::Conditional {
                condition,
                then_expr,
                else_expr,
                ..
            } => {
                let mut children: Vec<&Expression> = vec![condition, then_expr];
                if let Some(else_expr) = else_expr {
                    children.push(else_expr);
                }
                children
            }
            Expression::Paren { expr, .. } => vec![expr],
            Expression::Cast { operand, .. } => vec![operand],
            Expression::MemberAccess { object, .. } => vec![object],
            Expression::NewArray { length, .. } => vec![length],
            Expression::ArrayInitializer { elements, .. } => elements.iter().collect(),
            Expression::Call { args, .. } => args.iter().collect(),
            Expression::Index { array, index, .. } => vec![array, index],
        }
    }

    /// Whether `target` is this node or any node in its subtree
    pub fn contains(&self, target: NodeId) -> bool {
        self.id() == target || self.children().iter().any(|child| child.contains(target))
    }

    /// Whether the given declaration is referenced anywhere in this subtree
    pub fn references(&self, decl: DeclId) -> bool {
        match self {
            Expression::VarRef { decl: d, .. } => *d == decl,
            _ => self.children().iter().any(|child| child.references(decl)),
        }
    }
}

/// A statement inside a function body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// Local variable declaration; the initializer, if any, lives on the
    /// [`Declaration`](crate::model::Declaration) in the model
    Declaration {
        decl: DeclId,
        id: NodeId,
        span: Option<SourceSpan>,
    },

    /// Assignment to a resolved variable: `x = value`
    Assignment {
        target: DeclId,
        value: Expression,
        id: NodeId,
        span: Option<SourceSpan>,
    },

    /// Expression statement (for side effects)
    Expression {
        expr: Expression,
        id: NodeId,
        span: Option<SourceSpan>,
    },

    /// If statement with optional else
    If {
        condition: Expression,
        then_block: Block,
        else_block: Option<Block>,
        id: NodeId,
        span: Option<SourceSpan>,
    },

    /// While (or do-while) loop
    While {
        condition: Expression,
        body: Block,
        id: NodeId,
        span: Option<SourceSpan>,
    },

    /// For / for-each loop; only the condition matters to the dataflow pass
    For {
        condition: Option<Expression>,
        body: Block,
        id: NodeId,
        span: Option<SourceSpan>,
    },

    /// Switch statement
    Switch {
        scrutinee: Expression,
        arms: Vec<SwitchArm>,
        id: NodeId,
        span: Option<SourceSpan>,
    },

    /// A nested plain block (does not affect dataflow nesting levels)
    Block {
        block: Block,
        id: NodeId,
        span: Option<SourceSpan>,
    },

    /// Return statement
    Return {
        value: Option<Expression>,
        id: NodeId,
        span: Option<SourceSpan>,
    },
}

impl Statement {
    /// Get the id of this statement
    pub fn id(&self) -> NodeId {
        match self {
            Statement::Declaration { id, .. } => *id,
            Statement::Assignment { id, .. } => *id,
            Statement::Expression { id, .. } => *id,
            Statement::If { id, .. } => *id,
            Statement::While { id, .. } => *id,
            Statement::For { id, .. } => *id,
            Statement::Switch { id, .. } => *id,
            Statement::Block { id, .. } => *id,
            Statement::Return { id, .. } => *id,
        }
    }

    /// Get the span of this statement, if available
    pub fn span(&self) -> Option<&SourceSpan> {
        match self {
            Statement::Declaration { span, .. } => span.as_ref(),
            Statement::Assignment { span, .. } => span.as_ref(),
            Statement::Expression { span, .. } => span.as_ref(),
            Statement::If { span, .. } => span.as_ref(),
            Statement::While { span, .. } => span.as_ref(),
            Statement::For { span, .. } => span.as_ref(),
            Statement::Switch { span, .. } => span.as_ref(),
            Statement::Block { span, .. } => span.as_ref(),
            Statement::Return { span, .. } => span.as_ref(),
        }
    }
}

/// One arm of a switch statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchArm {
    pub labels: Vec<Expression>,
    pub body: Block,
}

/// A statement block
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Block {
    pub statements: Vec<Statement>,
}

impl Block {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }
}

/// Builds AST nodes with fresh, unique node ids.
///
/// Drivers adapting a concrete parse tree construct one builder per
/// [`SourceModel`](crate::model::SourceModel); node ids are the identities
/// the enclosing-body query and the dataflow pass work with.
#[derive(Debug, Default)]
pub struct AstBuilder {
    next_id: u32,
}

impl AstBuilder {
    /// Create a new builder starting at node id 0
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// A literal with the given value
    pub fn literal(&mut self, value: Value) -> Expression {
        Expression::Literal {
            value,
            id: self.fresh(),
            span: None,
        }
    }

    pub fn int(&mut self, v: i32) -> Expression {
        self.literal(Value::Int(v))
    }

    pub fn long(&mut self, v: i64) -> Expression {
        self.literal(Value::Long(v))
    }

    pub fn double(&mut self, v: f64) -> Expression {
        self.literal(Value::Double(v))
    }

    pub fn float(&mut self, v: f32) -> Expression {
        self.literal(Value::Float(v))
    }

    pub fn boolean(&mut self, v: bool) -> Expression {
        self.literal(Value::Bool(v))
    }

    pub fn string(&mut self, v: &str) -> Expression {
        self.literal(Value::String(v.to_string()))
    }

    pub fn char_lit(&mut self, v: char) -> Expression {
        self.literal(Value::Char(v as u16))
    }

    pub fn null(&mut self) -> Expression {
        self.literal(Value::Null)
    }

    pub fn unary(&mut self, op: UnaryOperator, operand: Expression) -> Expression {
        Expression::UnaryOp {
            op,
            operand: Box::new(operand),
            id: self.fresh(),
            span: None,
        }
    }

    pub fn binary(
        &mut self,
        op: BinaryOperator,
        left: Expression,
        right: Expression,
    ) -> Expression {
        Expression::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
            id: self.fresh(),
            span: None,
        }
    }

    pub fn polyadic(&mut self, op: BinaryOperator, operands: Vec<Expression>) -> Expression {
        Expression::Polyadic {
            op,
            operands,
            id: self.fresh(),
            span: None,
        }
    }

    pub fn template(&mut self, parts: Vec<Expression>) -> Expression {
        Expression::StringTemplate {
            parts,
            id: self.fresh(),
            span: None,
        }
    }

    pub fn conditional(
        &mut self,
        condition: Expression,
        then_expr: Expression,
        else_expr: Option<Expression>,
    ) -> Expression {
        Expression::Conditional {
            condition: Box::new(condition),
            then_expr: Box::new(then_expr),
            else_expr: else_expr.map(Box::new),
            id: self.fresh(),
            span: None,
        }
    }

    pub fn paren(&mut self, expr: Expression) -> Expression {
        Expression::Paren {
            expr: Box::new(expr),
            id: self.fresh(),
            span: None,
        }
    }

    pub fn cast(&mut self, operand: Expression, target: TypeRef) -> Expression {
        Expression::Cast {
            operand: Box::new(operand),
            target,
            id: self.fresh(),
            span: None,
        }
    }

    pub fn var_ref(&mut self, decl: DeclId) -> Expression {
        Expression::VarRef {
            decl,
            id: self.fresh(),
            span: None,
        }
    }

    pub fn member(&mut self, object: Expression, field: &str) -> Expression {
        Expression::MemberAccess {
            object: Box::new(object),
            field: field.to_string(),
            id: self.fresh(),
            span: None,
        }
    }

    pub fn new_array(
        &mut self,
        element: ElementKind,
        length: Expression,
        dimensions: usize,
    ) -> Expression {
        Expression::NewArray {
            element,
            length: Box::new(length),
            dimensions,
            id: self.fresh(),
            span: None,
        }
    }

    pub fn array_initializer(
        &mut self,
        element: ElementKind,
        elements: Vec<Expression>,
    ) -> Expression {
        Expression::ArrayInitializer {
            element,
            elements,
            id: self.fresh(),
            span: None,
        }
    }

    pub fn call(&mut self, name: &str, args: Vec<Expression>) -> Expression {
        Expression::Call {
            name: name.to_string(),
            args,
            id: self.fresh(),
            span: None,
        }
    }

    pub fn index(&mut self, array: Expression, index: Expression) -> Expression {
        Expression::Index {
            array: Box::new(array),
            index: Box::new(index),
            id: self.fresh(),
            span: None,
        }
    }

    pub fn declare_stmt(&mut self, decl: DeclId) -> Statement {
        Statement::Declaration {
            decl,
            id: self.fresh(),
            span: None,
        }
    }

    pub fn assign(&mut self, target: DeclId, value: Expression) -> Statement {
        Statement::Assignment {
            target,
            value,
            id: self.fresh(),
            span: None,
        }
    }

    pub fn expr_stmt(&mut self, expr: Expression) -> Statement {
        Statement::Expression {
            expr,
            id: self.fresh(),
            span: None,
        }
    }

    pub fn if_stmt(
        &mut self,
        condition: Expression,
        then_block: Block,
        else_block: Option<Block>,
    ) -> Statement {
        Statement::If {
            condition,
            then_block,
            else_block,
            id: self.fresh(),
            span: None,
        }
    }

    pub fn while_stmt(&mut self, condition: Expression, body: Block) -> Statement {
        Statement::While {
            condition,
            body,
            id: self.fresh(),
            span: None,
        }
    }

    pub fn for_stmt(&mut self, condition: Option<Expression>, body: Block) -> Statement {
        Statement::For {
            condition,
            body,
            id: self.fresh(),
            span: None,
        }
    }

    pub fn switch_stmt(&mut self, scrutinee: Expression, arms: Vec<SwitchArm>) -> Statement {
        Statement::Switch {
            scrutinee,
            arms,
            id: self.fresh(),
            span: None,
        }
    }

    pub fn block_stmt(&mut self, block: Block) -> Statement {
        Statement::Block {
            block,
            id: self.fresh(),
            span: None,
        }
    }

    pub fn ret(&mut self, value: Option<Expression>) -> Statement {
        Statement::Return {
            value,
            id: self.fresh(),
            span: None,
        }
    }
}
