//! Marks self calls in tail position so the emitter can turn them into jumps.
//!
//! Runs on normalized programs, where a function body is a flat list of
//! statements and the value of the body is its last statement. A call in tail
//! position is reached from there through the last statement of `do` blocks,
//! both branches of `if` and both operands of `and`/`or`.

use crate::frontend::{
    ast::{Application, Function, Node, NodeKind, Program},
    intern::InternedSymbol,
};

pub fn tco(mut program: Program) -> Program {
    for node in &mut program.body {
        visit(node);
    }

    program
}

/// Finds every function below `node`, including `node` itself
fn visit(node: &mut Node) {
    match &mut node.kind {
        NodeKind::FunctionDeclaration(function) | NodeKind::Lambda(function) => {
            let name = function.name;

            mark_function(function, name);
        }
        NodeKind::VariableDeclaration(declaration) | NodeKind::ConstantDeclaration(declaration) => {
            let bound = declaration.target.as_identifier();

            match &mut declaration.init.kind {
                // A lambda bound to a name calls itself through that name
                NodeKind::Lambda(function) if function.name.is_none() => {
                    mark_function(function, bound)
                }
                _ => visit(&mut declaration.init),
            }
        }
        NodeKind::Call(call) => {
            visit(&mut call.callee);
            call.args.iter_mut().for_each(visit);
        }
        NodeKind::Set { value, .. } => visit(value),
        NodeKind::Vector(elements) => elements.iter_mut().for_each(visit),
        NodeKind::Record(properties) => properties
            .iter_mut()
            .for_each(|property| visit(&mut property.value)),
        NodeKind::Member { object, .. } => visit(object),
        NodeKind::As { expression, .. } => visit(expression),
        NodeKind::Do(body) => body.iter_mut().for_each(visit),
        NodeKind::If {
            test,
            then,
            otherwise,
        } => {
            visit(test);
            visit(then);
            visit(otherwise);
        }
        NodeKind::Cond(clauses) => {
            for clause in clauses {
                visit(&mut clause.test);
                visit(&mut clause.body);
            }
        }
        NodeKind::When { test, body } => {
            visit(test);
            body.iter_mut().for_each(visit);
        }
        NodeKind::For { iterable, body, .. } => {
            visit(iterable);
            body.iter_mut().for_each(visit);
        }
        NodeKind::Binary { left, right, .. } | NodeKind::Logical { left, right, .. } => {
            visit(left);
            visit(right);
        }
        NodeKind::Unary { operand, .. } => visit(operand),
        NodeKind::Number { .. }
        | NodeKind::String(_)
        | NodeKind::Boolean(_)
        | NodeKind::Keyword(_)
        | NodeKind::Nil
        | NodeKind::Symbol(_)
        | NodeKind::TypeAlias { .. }
        | NodeKind::Import { .. } => {}
    }
}

fn mark_function(function: &mut Function, name: Option<InternedSymbol>) {
    function.body.iter_mut().for_each(visit);

    let Some(name) = name else {
        return;
    };

    // A parameter or local with the function's name hides it from the body
    let shadowed = function
        .params
        .iter()
        .any(|param| param.target.bound_names().contains(&name))
        || binds(&function.body, name);

    let simple_params = function
        .params
        .iter()
        .all(|param| param.target.as_identifier().is_some());

    if shadowed || !simple_params {
        return;
    }

    let fixed = function.fixed_params().len();
    let variadic = function.rest_param().is_some();

    if let Some(last) = function.body.last_mut() {
        if mark_tail(last, name, fixed, variadic) {
            log::debug!("`{name}` is tail recursive");
            function.is_tail_recursive = true;
        }
    }
}

/// Whether a statement of `body` declares `name`
fn binds(body: &[Node], name: InternedSymbol) -> bool {
    body.iter().any(|node| match &node.kind {
        NodeKind::VariableDeclaration(declaration)
        | NodeKind::ConstantDeclaration(declaration) => {
            declaration.target.bound_names().contains(&name)
        }
        NodeKind::FunctionDeclaration(function) => function.name == Some(name),
        _ => false,
    })
}

/// Marks qualifying self calls reachable in tail position from `node`
fn mark_tail(node: &mut Node, name: InternedSymbol, fixed: usize, variadic: bool) -> bool {
    match &mut node.kind {
        NodeKind::Call(call) => {
            let is_self = call.callee.as_symbol() == Some(name);
            let arity_matches = match variadic {
                true => call.args.len() >= fixed,
                false => call.args.len() == fixed,
            };

            if is_self && arity_matches && call.application == Application::Full {
                call.is_tail_rec = true;
            }

            call.is_tail_rec
        }
        NodeKind::Do(body) if !binds(body, name) => body
            .last_mut()
            .is_some_and(|last| mark_tail(last, name, fixed, variadic)),
        NodeKind::If {
            then, otherwise, ..
        } => {
            // Both branches are marked, even when the first one qualifies
            let then = mark_tail(then, name, fixed, variadic);
            let otherwise = mark_tail(otherwise, name, fixed, variadic);

            then || otherwise
        }
        NodeKind::Logical { left, right, .. } => {
            let left = mark_tail(left, name, fixed, variadic);
            let right = mark_tail(right, name, fixed, variadic);

            left || right
        }
        _ => false,
    }
}
