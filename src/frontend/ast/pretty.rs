//! Renders the AST back into Sprig surface syntax (one form per line for
//! programs). Rewritten trees print the same way, which keeps ANF output
//! readable.

use core::fmt::{Display, Formatter, Result};

use itertools::Itertools;

use super::{
    Function, Node, NodeKind, Param, Pattern, PatternKind, Program, TypeExpr, TypeExprKind,
};

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        for node in &self.body {
            writeln!(f, "{node}")?;
        }

        Ok(())
    }
}

fn body(nodes: &[Node]) -> String {
    nodes.iter().map(|node| format!(" {node}")).join("")
}

impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match &self.kind {
            NodeKind::Number { text, .. } => f.write_str(text),
            NodeKind::String(value) => write!(f, "{value:?}"),
            NodeKind::Boolean(value) => write!(f, "{value}"),
            NodeKind::Keyword(name) | NodeKind::Symbol(name) => write!(f, "{name}"),
            NodeKind::Nil => f.write_str("nil"),
            NodeKind::Call(call) => {
                write!(f, "({}{})", call.callee, body(&call.args))
            }
            NodeKind::VariableDeclaration(declaration)
            | NodeKind::ConstantDeclaration(declaration) => {
                let head = match self.kind {
                    NodeKind::VariableDeclaration(_) => "let",
                    _ => "const",
                };

                write!(f, "({head} {}", declaration.target)?;

                if let Some(annotation) = &declaration.annotation {
                    write!(f, " : {annotation}")?;
                }

                write!(f, " {})", declaration.init)
            }
            NodeKind::Set { name, value } => write!(f, "(set! {name} {value})"),
            NodeKind::TypeAlias { name, annotation } => write!(f, "(type {name} {annotation})"),
            NodeKind::Import { name, alias } => write!(f, "(import {name} :as {alias})"),
            NodeKind::Vector(elements) => write!(f, "[{}]", elements.iter().join(" ")),
            NodeKind::Record(properties) => write!(
                f,
                "{{{}}}",
                properties
                    .iter()
                    .map(|property| format!(":{} {}", property.key, property.value))
                    .join(" ")
            ),
            NodeKind::Member { object, property } => write!(f, "{object}.{property}"),
            NodeKind::FunctionDeclaration(function) => {
                let name = function.name.map(|name| name.value()).unwrap_or_default();

                write!(f, "(defn {name} {function})")
            }
            NodeKind::Lambda(function) => match function.name {
                Some(name) => write!(f, "(fn {name} {function})"),
                None => write!(f, "(fn {function})"),
            },
            NodeKind::As {
                annotation,
                expression,
            } => write!(f, "(as {annotation} {expression})"),
            NodeKind::Do(nodes) => write!(f, "(do{})", body(nodes)),
            NodeKind::If {
                test,
                then,
                otherwise,
            } => write!(f, "(if {test} {then} {otherwise})"),
            NodeKind::Cond(clauses) => write!(
                f,
                "(cond {})",
                clauses
                    .iter()
                    .map(|clause| format!("{} {}", clause.test, clause.body))
                    .join(" ")
            ),
            NodeKind::When { test, body: nodes } => write!(f, "(when {test}{})", body(nodes)),
            NodeKind::For {
                target,
                iterable,
                body: nodes,
            } => write!(f, "(for [{target} {iterable}]{})", body(nodes)),
            NodeKind::Binary {
                operator,
                left,
                right,
            } => write!(f, "({operator} {left} {right})"),
            NodeKind::Logical {
                operator,
                left,
                right,
            } => write!(f, "({operator} {left} {right})"),
            NodeKind::Unary { operator, operand } => write!(f, "({operator} {operand})"),
        }
    }
}

/// Parameter vector, return annotation and body
impl Display for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "[{}]", self.params.iter().join(" "))?;

        if let Some(annotation) = &self.return_annotation {
            write!(f, " : {annotation}")?;
        }

        f.write_str(&body(&self.body))
    }
}

impl Display for Param {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if self.is_rest {
            f.write_str("& ")?;
        }

        write!(f, "{}", self.target)?;

        if let Some(annotation) = &self.annotation {
            write!(f, " : {annotation}")?;
        }

        Ok(())
    }
}

impl Display for Pattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match &self.kind {
            PatternKind::Identifier(name) => write!(f, "{name}"),
            PatternKind::Vector { elements, rest } => {
                let rest = rest.map(|rest| format!(" & {rest}")).unwrap_or_default();

                write!(f, "[{}{rest}]", elements.iter().join(" "))
            }
            PatternKind::Record { properties, rest } => {
                let rest = rest.map(|rest| format!(" & {rest}")).unwrap_or_default();
                let properties = properties
                    .iter()
                    .map(|property| match property.pattern.as_identifier() {
                        Some(name) if name == property.key => format!("{name}"),
                        _ => format!(":{} {}", property.key, property.pattern),
                    })
                    .join(" ");

                write!(f, "{{{properties}{rest}}}")
            }
        }
    }
}

impl Display for TypeExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match &self.kind {
            TypeExprKind::Named(name) => write!(f, "{name}"),
            TypeExprKind::List(element) => write!(f, "(list {element})"),
            TypeExprKind::Vector(element) => write!(f, "(vector {element})"),
            TypeExprKind::Tuple(members) => write!(f, "(tuple {})", members.iter().join(" ")),
            TypeExprKind::Object(properties) => write!(
                f,
                "{{{}}}",
                properties
                    .iter()
                    .map(|property| {
                        let optional = if property.optional { "?" } else { "" };

                        format!(":{}{optional} {}", property.key, property.ty)
                    })
                    .join(" ")
            ),
            TypeExprKind::Function { params, rest, ret } => {
                let rest = rest
                    .as_ref()
                    .map(|rest| format!(" & {rest}"))
                    .unwrap_or_default();

                write!(f, "(fn [{}{rest}] {ret})", params.iter().join(" "))
            }
            TypeExprKind::Union(members) => write!(f, "(or {})", members.iter().join(" ")),
            TypeExprKind::Intersection(members) => {
                write!(f, "(and {})", members.iter().join(" "))
            }
            TypeExprKind::Not(inner) => write!(f, "(not {inner})"),
            TypeExprKind::Literal(value) => write!(f, "{value}"),
        }
    }
}
