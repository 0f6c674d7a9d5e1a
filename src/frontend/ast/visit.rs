//! Trait definition for an AST visitor which walks the tree in DFS order

use super::{Function, Node, NodeKind, Param, Pattern, PatternKind, Program, TypeExpr, TypeExprKind};

pub trait Visitor<'ast>: Sized {
    fn visit_node(&mut self, node: &'ast Node) {
        walk_node(self, node)
    }

    fn visit_function(&mut self, function: &'ast Function) {
        walk_function(self, function)
    }

    fn visit_param(&mut self, param: &'ast Param) {
        walk_param(self, param)
    }

    fn visit_pattern(&mut self, pattern: &'ast Pattern) {
        walk_pattern(self, pattern)
    }

    fn visit_type_expr(&mut self, type_expr: &'ast TypeExpr) {
        walk_type_expr(self, type_expr)
    }
}

pub fn walk_program<'a>(visitor: &mut impl Visitor<'a>, program: &'a Program) {
    for node in &program.body {
        visitor.visit_node(node);
    }
}

pub fn walk_node<'a>(visitor: &mut impl Visitor<'a>, node: &'a Node) {
    match &node.kind {
        NodeKind::Number { .. }
        | NodeKind::String(_)
        | NodeKind::Boolean(_)
        | NodeKind::Keyword(_)
        | NodeKind::Nil
        | NodeKind::Symbol(_)
        | NodeKind::Import { .. } => {}
        NodeKind::Call(call) => {
            visitor.visit_node(&call.callee);

            for arg in &call.args {
                visitor.visit_node(arg);
            }
        }
        NodeKind::VariableDeclaration(declaration)
        | NodeKind::ConstantDeclaration(declaration) => {
            visitor.visit_pattern(&declaration.target);

            if let Some(annotation) = &declaration.annotation {
                visitor.visit_type_expr(annotation);
            }

            visitor.visit_node(&declaration.init);
        }
        NodeKind::Set { value, .. } => visitor.visit_node(value),
        NodeKind::TypeAlias { annotation, .. } => visitor.visit_type_expr(annotation),
        NodeKind::Vector(elements) | NodeKind::Do(elements) => {
            for element in elements {
                visitor.visit_node(element);
            }
        }
        NodeKind::Record(properties) => {
            for property in properties {
                visitor.visit_node(&property.value);
            }
        }
        NodeKind::Member { object, .. } => visitor.visit_node(object),
        NodeKind::FunctionDeclaration(function) | NodeKind::Lambda(function) => {
            visitor.visit_function(function)
        }
        NodeKind::As {
            annotation,
            expression,
        } => {
            visitor.visit_type_expr(annotation);
            visitor.visit_node(expression);
        }
        NodeKind::If {
            test,
            then,
            otherwise,
        } => {
            visitor.visit_node(test);
            visitor.visit_node(then);
            visitor.visit_node(otherwise);
        }
        NodeKind::Cond(clauses) => {
            for clause in clauses {
                visitor.visit_node(&clause.test);
                visitor.visit_node(&clause.body);
            }
        }
        NodeKind::When { test, body } => {
            visitor.visit_node(test);

            for node in body {
                visitor.visit_node(node);
            }
        }
        NodeKind::For {
            target,
            iterable,
            body,
        } => {
            visitor.visit_pattern(target);
            visitor.visit_node(iterable);

            for node in body {
                visitor.visit_node(node);
            }
        }
        NodeKind::Binary { left, right, .. } | NodeKind::Logical { left, right, .. } => {
            visitor.visit_node(left);
            visitor.visit_node(right);
        }
        NodeKind::Unary { operand, .. } => visitor.visit_node(operand),
    }
}

pub fn walk_function<'a>(visitor: &mut impl Visitor<'a>, function: &'a Function) {
    for param in &function.params {
        visitor.visit_param(param);
    }

    if let Some(annotation) = &function.return_annotation {
        visitor.visit_type_expr(annotation);
    }

    for node in &function.body {
        visitor.visit_node(node);
    }
}

pub fn walk_param<'a>(visitor: &mut impl Visitor<'a>, param: &'a Param) {
    visitor.visit_pattern(&param.target);

    if let Some(annotation) = &param.annotation {
        visitor.visit_type_expr(annotation);
    }
}

pub fn walk_pattern<'a>(visitor: &mut impl Visitor<'a>, pattern: &'a Pattern) {
    match &pattern.kind {
        PatternKind::Identifier(_) => {}
        PatternKind::Vector { elements, .. } => {
            for element in elements {
                visitor.visit_pattern(element);
            }
        }
        PatternKind::Record { properties, .. } => {
            for property in properties {
                visitor.visit_pattern(&property.pattern);
            }
        }
    }
}

pub fn walk_type_expr<'a>(visitor: &mut impl Visitor<'a>, type_expr: &'a TypeExpr) {
    match &type_expr.kind {
        TypeExprKind::Named(_) | TypeExprKind::Literal(_) => {}
        TypeExprKind::List(element) | TypeExprKind::Vector(element) | TypeExprKind::Not(element) => {
            visitor.visit_type_expr(element)
        }
        TypeExprKind::Tuple(members)
        | TypeExprKind::Union(members)
        | TypeExprKind::Intersection(members) => {
            for member in members {
                visitor.visit_type_expr(member);
            }
        }
        TypeExprKind::Object(properties) => {
            for property in properties {
                visitor.visit_type_expr(&property.ty);
            }
        }
        TypeExprKind::Function { params, rest, ret } => {
            for param in params {
                visitor.visit_type_expr(param);
            }

            if let Some(rest) = rest {
                visitor.visit_type_expr(rest);
            }

            visitor.visit_type_expr(ret);
        }
    }
}
