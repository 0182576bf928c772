//! Backward assignment dataflow for local variables
//!
//! When the evaluator meets a reference to a local or parameter, it walks
//! the enclosing body forward up to the reference, tracking the last
//! assignment to that variable. Nesting depth matters: an assignment more
//! deeply nested than the declaration (inside an `if`, a loop or a switch
//! arm) only happens on some paths, so it poisons the tracked value rather
//! than updating it. Once poisoned, the variable stays unknown for the rest
//! of the walk; an unconditional assignment after a conditional one does
//! not resurrect it.

use tracing::trace;

use crate::ast::{Block, DeclId, Expression, NodeId, Statement};
use crate::evaluator::ConstantEvaluator;
use crate::model::SourceModel;
use crate::value::Value;

/// Outcome of the dataflow walk for one variable reference
#[derive(Debug, Clone, PartialEq)]
pub enum AssignedValue {
    /// The last assignment before the reference was unconditional and its
    /// right-hand side folded to this value
    Known(Value),
    /// The variable was assigned before the reference, but the value could
    /// not be determined (conditional assignment, or an unevaluable
    /// right-hand side). Callers must not fall back to the initializer.
    AssignedButUnknown,
}

/// Fold the value a variable holds at a reference site.
///
/// Returns `None` when no assignment to the variable precedes the
/// reference; the caller may then fall back to the declaration initializer.
pub fn find_last_value<'m>(
    model: &'m SourceModel,
    variable: DeclId,
    usage: &Expression,
    evaluator: &ConstantEvaluator<'m>,
) -> Option<AssignedValue> {
    let body = model.enclosing_body(usage.id())?;
    let mut finder = LastAssignmentFinder::new(model, variable, usage.id(), Some(evaluator));
    finder.visit_block(&body.block);

    match (finder.current_value, finder.last_assignment.is_some()) {
        (Some(value), _) => Some(AssignedValue::Known(value)),
        (None, true) => Some(AssignedValue::AssignedButUnknown),
        (None, false) => None,
    }
}

/// The right-hand side of the last assignment to `variable` before `usage`,
/// without evaluating it. Used by drivers that want the defining expression
/// rather than its value.
///
/// This is a raw syntactic query: every assignment before the reference
/// counts, conditional or not, and with no assignment at all the
/// declaration initializer is returned. Only [`find_last_value`] applies
/// the nesting-level confidence rules.
pub fn find_last_assignment<'m>(
    model: &'m SourceModel,
    variable: DeclId,
    usage: &Expression,
) -> Option<&'m Expression> {
    let mut last = model
        .declaration(variable)
        .and_then(|d| d.initializer.as_ref());
    if let Some(body) = model.enclosing_body(usage.id()) {
        let mut finder = LastAssignmentFinder::new(model, variable, usage.id(), None);
        finder.visit_block(&body.block);
        if let Some(assigned) = finder.raw_assignment {
            last = Some(assigned);
        }
    }
    last
}

struct LastAssignmentFinder<'m, 'e> {
    model: &'m SourceModel,
    variable: DeclId,
    end_at: NodeId,
    evaluator: Option<&'e ConstantEvaluator<'m>>,
    /// Statement nesting depth; if/loop/switch bodies add a level, plain
    /// blocks do not
    current_level: i32,
    /// Depth at which the variable was declared; `None` for parameters,
    /// which count as level zero
    variable_level: Option<i32>,
    done: bool,
    poisoned: bool,
    current_value: Option<Value>,
    last_assignment: Option<&'m Expression>,
    /// Every assignment seen so far, untouched by the poison flag; backs
    /// the raw [`find_last_assignment`] query
    raw_assignment: Option<&'m Expression>,
}

impl<'m, 'e> LastAssignmentFinder<'m, 'e> {
    fn new(
        model: &'m SourceModel,
        variable: DeclId,
        end_at: NodeId,
        evaluator: Option<&'e ConstantEvaluator<'m>>,
    ) -> Self {
        Self {
            model,
            variable,
            end_at,
            evaluator,
            current_level: 0,
            variable_level: None,
            done: false,
            poisoned: false,
            current_value: None,
            last_assignment: None,
            raw_assignment: None,
        }
    }

    fn visit_block(&mut self, block: &'m Block) {
        for stmt in &block.statements {
            if self.done {
                return;
            }
            self.visit_statement(stmt);
        }
    }

    fn visit_nested(&mut self, block: &'m Block) {
        self.current_level += 1;
        self.visit_block(block);
        self.current_level -= 1;
    }

    fn visit_statement(&mut self, stmt: &'m Statement) {
        match stmt {
            Statement::Declaration { decl, .. } => {
                if *decl == self.variable {
                    self.variable_level = Some(self.current_level);
                }
                if let Some(init) = self
                    .model
                    .declaration(*decl)
                    .and_then(|d| d.initializer.as_ref())
                {
                    if init.contains(self.end_at) {
                        self.done = true;
                    }
                }
            }
            Statement::Assignment { target, value, .. } => {
                // A reference inside the right-hand side sees the state
                // before this assignment takes effect
                if value.contains(self.end_at) {
                    self.done = true;
                    return;
                }
                if *target == self.variable {
                    self.raw_assignment = Some(value);
                    self.record(value);
                }
            }
            Statement::Expression { expr, .. } => {
                if expr.contains(self.end_at) {
                    self.done = true;
                }
            }
            Statement::If {
                condition,
                then_block,
                else_block,
                ..
            } => {
                if condition.contains(self.end_at) {
                    self.done = true;
                    return;
                }
                self.visit_nested(then_block);
                if self.done {
                    return;
                }
                if let Some(else_block) = else_block {
                    self.visit_nested(else_block);
                }
            }
            Statement::While { condition, body, .. } => {
                if condition.contains(self.end_at) {
                    self.done = true;
                    return;
                }
                self.visit_nested(body);
            }
            Statement::For { condition, body, .. } => {
                if condition.as_ref().is_some_and(|c| c.contains(self.end_at)) {
                    self.done = true;
                    return;
                }
                self.visit_nested(body);
            }
            Statement::Switch { scrutinee, arms, .. } => {
                if scrutinee.contains(self.end_at) {
                    self.done = true;
                    return;
                }
                for arm in arms {
                    if arm.labels.iter().any(|l| l.contains(self.end_at)) {
                        self.done = true;
                        return;
                    }
                    self.visit_nested(&arm.body);
                    if self.done {
                        return;
                    }
                }
            }
            Statement::Block { block, .. } => self.visit_block(block),
            Statement::Return { value, .. } => {
                if value.as_ref().is_some_and(|v| v.contains(self.end_at)) {
                    self.done = true;
                }
            }
        }
    }

    fn record(&mut self, value: &'m Expression) {
        if self.poisoned {
            return;
        }
        self.last_assignment = Some(value);

        let declared_at = self.variable_level.unwrap_or(0);
        if self.current_level > declared_at {
            trace!(
                level = self.current_level,
                declared_at,
                "conditional assignment, value no longer tracked"
            );
            self.current_value = None;
            self.poisoned = true;
            return;
        }
        self.current_value = self.evaluator.and_then(|e| e.evaluate(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AstBuilder, BinaryOperator};
    use crate::evaluator::EvalOptions;
    use crate::model::DeclKind;
    use pretty_assertions::assert_eq;

    fn known(v: Value) -> Option<AssignedValue> {
        Some(AssignedValue::Known(v))
    }

    #[test]
    fn test_straight_line_assignment() {
        // int x; x = 5; return x;
        let mut model = SourceModel::new();
        let mut b = AstBuilder::new();
        let x = model.declare("x", DeclKind::Local, None);

        let decl = b.declare_stmt(x);
        let five = b.int(5);
        let assign = b.assign(x, five);
        let usage = b.var_ref(x);
        let ret = b.ret(Some(usage.clone()));
        model.add_body("f", vec![], Block::new(vec![decl, assign, ret]));

        let evaluator = ConstantEvaluator::new(&model);
        assert_eq!(
            find_last_value(&model, x, &usage, &evaluator),
            known(Value::Int(5))
        );
    }

    #[test]
    fn test_reassignment_shadows_earlier_value() {
        // x = 1; x = 2; return x;
        let mut model = SourceModel::new();
        let mut b = AstBuilder::new();
        let x = model.declare("x", DeclKind::Local, None);

        let decl = b.declare_stmt(x);
        let one = b.int(1);
        let first = b.assign(x, one);
        let two = b.int(2);
        let second = b.assign(x, two);
        let usage = b.var_ref(x);
        let ret = b.ret(Some(usage.clone()));
        model.add_body("f", vec![], Block::new(vec![decl, first, second, ret]));

        let evaluator = ConstantEvaluator::new(&model);
        assert_eq!(
            find_last_value(&model, x, &usage, &evaluator),
            known(Value::Int(2))
        );
    }

    #[test]
    fn test_conditional_assignment_poisons_the_value() {
        // int x; x = 5; if (cond) { x = 10; } return x;
        let mut model = SourceModel::new();
        let mut b = AstBuilder::new();
        let x = model.declare("x", DeclKind::Local, None);
        let cond = model.declare("cond", DeclKind::Parameter, None);

        let decl = b.declare_stmt(x);
        let five = b.int(5);
        let initial = b.assign(x, five);
        let ten = b.int(10);
        let inner = b.assign(x, ten);
        let cond_ref = b.var_ref(cond);
        let if_stmt = b.if_stmt(cond_ref, Block::new(vec![inner]), None);
        let usage = b.var_ref(x);
        let ret = b.ret(Some(usage.clone()));
        model.add_body("f", vec![cond], Block::new(vec![decl, initial, if_stmt, ret]));

        let evaluator = ConstantEvaluator::new(&model);
        assert_eq!(
            find_last_value(&model, x, &usage, &evaluator),
            Some(AssignedValue::AssignedButUnknown)
        );
    }

    #[test]
    fn test_poisoned_value_stays_poisoned() {
        // if (cond) { x = 1; } x = 2; return x;
        // The walk stops trusting x at the conditional assignment.
        let mut model = SourceModel::new();
        let mut b = AstBuilder::new();
        let x = model.declare("x", DeclKind::Local, None);
        let cond = model.declare("cond", DeclKind::Parameter, None);

        let decl = b.declare_stmt(x);
        let one = b.int(1);
        let inner = b.assign(x, one);
        let cond_ref = b.var_ref(cond);
        let if_stmt = b.if_stmt(cond_ref, Block::new(vec![inner]), None);
        let two = b.int(2);
        let later = b.assign(x, two);
        let usage = b.var_ref(x);
        let ret = b.ret(Some(usage.clone()));
        model.add_body("f", vec![cond], Block::new(vec![decl, if_stmt, later, ret]));

        let evaluator = ConstantEvaluator::new(&model);
        assert_eq!(
            find_last_value(&model, x, &usage, &evaluator),
            Some(AssignedValue::AssignedButUnknown)
        );
    }

    #[test]
    fn test_usage_inside_rhs_sees_prior_value() {
        // x = 1; x = x + 1;  -- the x in the RHS still reads 1
        let mut model = SourceModel::new();
        let mut b = AstBuilder::new();
        let x = model.declare("x", DeclKind::Local, None);

        let decl = b.declare_stmt(x);
        let one = b.int(1);
        let first = b.assign(x, one);
        let usage = b.var_ref(x);
        let one_again = b.int(1);
        let rhs = b.binary(BinaryOperator::Add, usage.clone(), one_again);
        let second = b.assign(x, rhs);
        model.add_body("f", vec![], Block::new(vec![decl, first, second]));

        let evaluator = ConstantEvaluator::new(&model);
        assert_eq!(
            find_last_value(&model, x, &usage, &evaluator),
            known(Value::Int(1))
        );
    }

    #[test]
    fn test_no_assignment_before_usage() {
        // int x = 5; return x;  -- finder reports nothing, initializer is
        // the caller's fallback
        let mut model = SourceModel::new();
        let mut b = AstBuilder::new();
        let x = model.declare("x", DeclKind::Local, None);
        let init = b.int(5);
        model.set_initializer(x, init).unwrap();

        let decl = b.declare_stmt(x);
        let usage = b.var_ref(x);
        let ret = b.ret(Some(usage.clone()));
        model.add_body("f", vec![], Block::new(vec![decl, ret]));

        let evaluator = ConstantEvaluator::new(&model);
        assert_eq!(find_last_value(&model, x, &usage, &evaluator), None);
    }

    #[test]
    fn test_assignment_at_declaration_level_inside_same_branch() {
        // if (cond) { int x; x = 7; use(x); }  -- declaration and
        // assignment share a level, so the value is known
        let mut model = SourceModel::new();
        let mut b = AstBuilder::new();
        let x = model.declare("x", DeclKind::Local, None);
        let cond = model.declare("cond", DeclKind::Parameter, None);

        let decl = b.declare_stmt(x);
        let seven = b.int(7);
        let assign = b.assign(x, seven);
        let usage = b.var_ref(x);
        let use_stmt = b.expr_stmt(usage.clone());
        let cond_ref = b.var_ref(cond);
        let if_stmt = b.if_stmt(cond_ref, Block::new(vec![decl, assign, use_stmt]), None);
        model.add_body("f", vec![cond], Block::new(vec![if_stmt]));

        let evaluator = ConstantEvaluator::new(&model);
        assert_eq!(
            find_last_value(&model, x, &usage, &evaluator),
            known(Value::Int(7))
        );
    }

    #[test]
    fn test_find_last_assignment_returns_expression() {
        let mut model = SourceModel::new();
        let mut b = AstBuilder::new();
        let x = model.declare("x", DeclKind::Local, None);

        let decl = b.declare_stmt(x);
        let one = b.int(1);
        let two = b.int(2);
        let rhs = b.binary(BinaryOperator::Add, one, two);
        let rhs_id = rhs.id();
        let assign = b.assign(x, rhs);
        let usage = b.var_ref(x);
        let ret = b.ret(Some(usage.clone()));
        model.add_body("f", vec![], Block::new(vec![decl, assign, ret]));

        let found = find_last_assignment(&model, x, &usage);
        assert_eq!(found.map(|e| e.id()), Some(rhs_id));
    }

    #[test]
    fn test_find_last_assignment_tracks_past_conditional_reassignment() {
        // if (cond) { x = 1; } x = 2; use(x)
        // The raw query reports x = 2; the folded value stays unknowable.
        let mut model = SourceModel::new();
        let mut b = AstBuilder::new();
        let x = model.declare("x", DeclKind::Local, None);
        let cond = model.declare("cond", DeclKind::Parameter, None);

        let decl = b.declare_stmt(x);
        let one = b.int(1);
        let inner = b.assign(x, one);
        let cond_ref = b.var_ref(cond);
        let if_stmt = b.if_stmt(cond_ref, Block::new(vec![inner]), None);
        let two = b.int(2);
        let two_id = two.id();
        let later = b.assign(x, two);
        let usage = b.var_ref(x);
        let use_stmt = b.expr_stmt(usage.clone());
        model.add_body(
            "f",
            vec![cond],
            Block::new(vec![decl, if_stmt, later, use_stmt]),
        );

        let found = find_last_assignment(&model, x, &usage);
        assert_eq!(found.map(|e| e.id()), Some(two_id));

        let evaluator = ConstantEvaluator::new(&model);
        assert_eq!(
            find_last_value(&model, x, &usage, &evaluator),
            Some(AssignedValue::AssignedButUnknown)
        );
    }

    #[test]
    fn test_find_last_assignment_falls_back_to_initializer() {
        // int x = 5; use(x)  -- no assignment, the initializer is the
        // defining expression
        let mut model = SourceModel::new();
        let mut b = AstBuilder::new();
        let x = model.declare("x", DeclKind::Local, None);
        let init = b.int(5);
        let init_id = init.id();
        model.set_initializer(x, init).unwrap();

        let decl = b.declare_stmt(x);
        let usage = b.var_ref(x);
        let use_stmt = b.expr_stmt(usage.clone());
        model.add_body("f", vec![], Block::new(vec![decl, use_stmt]));

        let found = find_last_assignment(&model, x, &usage);
        assert_eq!(found.map(|e| e.id()), Some(init_id));
    }

    #[test]
    fn test_options_do_not_change_dataflow() {
        // allow_unknown affects folding of operations, not the walk
        let mut model = SourceModel::new();
        let mut b = AstBuilder::new();
        let x = model.declare("x", DeclKind::Local, None);
        let cond = model.declare("cond", DeclKind::Parameter, None);

        let decl = b.declare_stmt(x);
        let ten = b.int(10);
        let inner = b.assign(x, ten);
        let cond_ref = b.var_ref(cond);
        let if_stmt = b.if_stmt(cond_ref, Block::new(vec![inner]), None);
        let usage = b.var_ref(x);
        let ret = b.ret(Some(usage.clone()));
        model.add_body("f", vec![cond], Block::new(vec![decl, if_stmt, ret]));

        let relaxed =
            ConstantEvaluator::with_options(&model, EvalOptions::default().allow_unknown(true));
        assert_eq!(
            find_last_value(&model, x, &usage, &relaxed),
            Some(AssignedValue::AssignedButUnknown)
        );
    }
}
