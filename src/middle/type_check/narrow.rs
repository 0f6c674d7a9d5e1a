use hashbrown::HashMap;
use itertools::Itertools;
use once_cell::sync::Lazy;

use super::{
    algebra::{exclude, falsy_part, narrow_type, truthy_part},
    env::{BindingKind, BindingState, Path, TypeEnvironment},
    infer::{path_of, property_type_or_any, static_truthiness},
    subtype::literal_of,
    CheckResult, TypeChecker,
};
use crate::{
    frontend::{
        ast::{BinaryOperator, LogicalOperator, Node, NodeKind, UnaryOperator},
        intern::InternedSymbol,
    },
    middle::ty::Type,
};

/// Builtin predicates and the type a passing argument must have
static PREDICATES: Lazy<HashMap<&'static str, fn() -> Type>> = Lazy::new(|| {
    let mut predicates: HashMap<&'static str, fn() -> Type> = HashMap::new();

    predicates.insert("number?", Type::number);
    predicates.insert("string?", Type::string);
    predicates.insert("boolean?", Type::boolean);
    predicates.insert("keyword?", Type::keyword);
    predicates.insert("nil?", Type::nil);
    predicates.insert("vector?", || Type::vector(Type::any()));
    predicates.insert("list?", || Type::list(Type::any()));

    predicates
});

/// Type named by a `typeof` tag
fn type_of_tag(tag: &str) -> Option<Type> {
    match tag {
        "number" => Some(Type::number()),
        "string" => Some(Type::string()),
        "boolean" => Some(Type::boolean()),
        "symbol" => Some(Type::keyword()),
        _ => None,
    }
}

impl<'ctx> TypeChecker<'ctx> {
    /// Returns a child of `env` in which `test` is known to have evaluated
    /// truthy (or falsy when `assume` is false)
    pub(super) fn narrow(
        &self,
        test: &Node,
        env: &TypeEnvironment,
        assume: bool,
    ) -> CheckResult<TypeEnvironment> {
        let scope = env.child();

        self.narrow_into(test, &scope, assume);

        Ok(scope)
    }

    fn narrow_into(&self, test: &Node, scope: &TypeEnvironment, assume: bool) {
        match &test.kind {
            NodeKind::Unary {
                operator: UnaryOperator::Not,
                operand,
            } => self.narrow_into(operand, scope, !assume),
            NodeKind::Logical {
                operator,
                left,
                right,
            } => {
                let left_truthiness = static_truthiness(left, &type_of(left));

                match (operator, assume) {
                    // Both sides passed
                    (LogicalOperator::And, true) => {
                        self.narrow_into(left, scope, true);
                        self.narrow_into(right, scope, true);
                    }
                    // Both sides failed
                    (LogicalOperator::Or, false) => {
                        self.narrow_into(left, scope, false);
                        self.narrow_into(right, scope, false);
                    }
                    // Only the right side decided
                    (LogicalOperator::And, false) if left_truthiness == Some(true) => {
                        self.narrow_into(right, scope, false);
                    }
                    (LogicalOperator::Or, true) if left_truthiness == Some(false) => {
                        self.narrow_into(right, scope, true);
                    }
                    _ => {}
                }
            }
            NodeKind::Binary {
                operator: operator @ (BinaryOperator::Equal | BinaryOperator::NotEqual),
                left,
                right,
            } => {
                let assume = match operator {
                    BinaryOperator::NotEqual => !assume,
                    _ => assume,
                };

                self.narrow_equality(left, right, scope, assume);
                self.narrow_equality(right, left, scope, assume);
            }
            NodeKind::Call(call) => {
                let [arg] = call.args.as_slice() else {
                    return self.narrow_truthiness(test, scope, assume);
                };

                let Some(callee) = call.callee.as_symbol() else {
                    return self.narrow_truthiness(test, scope, assume);
                };

                let is_builtin = matches!(
                    scope.lookup_binding(callee),
                    Some((binding, _)) if binding.kind == BindingKind::Builtin
                );

                match (PREDICATES.get(callee.value()), path_of(arg)) {
                    (Some(fact), Some(path)) if is_builtin => {
                        self.refine(path, &fact(), scope, assume)
                    }
                    _ => self.narrow_truthiness(test, scope, assume),
                }
            }
            _ => self.narrow_truthiness(test, scope, assume),
        }
    }

    fn narrow_truthiness(&self, test: &Node, scope: &TypeEnvironment, assume: bool) {
        let Some(path) = path_of(test) else {
            return;
        };

        let current = self.current_type(&path, scope);
        let narrowed = if assume {
            truthy_part(&current)
        } else {
            falsy_part(&current)
        };

        self.record(path, narrowed, scope);
    }

    /// Narrows `subject` from a comparison against `other`
    fn narrow_equality(
        &self,
        subject: &Node,
        other: &Node,
        scope: &TypeEnvironment,
        assume: bool,
    ) {
        // (== (typeof x) "number")
        if let (
            NodeKind::Unary {
                operator: UnaryOperator::Typeof,
                operand,
            },
            NodeKind::String(tag),
        ) = (&subject.kind, &other.kind)
        {
            if let (Some(fact), Some(path)) = (type_of_tag(tag), path_of(operand)) {
                self.refine(path, &fact, scope, assume);
            }

            return;
        }

        let Some(path) = path_of(subject) else {
            return;
        };

        let fact = match (&other.kind, other.literal_value()) {
            (NodeKind::Nil, _) => Type::nil(),
            (_, Some(value)) => Type::singleton(value),
            _ => match literal_of(&type_of(other)) {
                Some(value) => Type::singleton(value),
                // Equal to something wider tells us nothing when it fails
                None if assume => type_of(other),
                None => return,
            },
        };

        self.refine(path, &fact, scope, assume);
    }

    fn refine(&self, path: Path, fact: &Type, scope: &TypeEnvironment, assume: bool) {
        let current = self.current_type(&path, scope);
        let narrowed = if assume {
            narrow_type(&current, fact)
        } else {
            exclude(&current, fact)
        };

        self.record(path, narrowed, scope);
    }

    fn record(&self, path: Path, narrowed: Type, scope: &TypeEnvironment) {
        if narrowed.is_never() {
            log::debug!(
                "`{}` can't have any value here, the branch is dead code",
                path.iter().join(".")
            );
        }

        scope.narrow(path, narrowed);
    }

    /// What is currently known about a path, without reporting anything
    fn current_type(&self, path: &[InternedSymbol], scope: &TypeEnvironment) -> Type {
        if let Some(narrowed) = scope.lookup_path(path) {
            return narrowed;
        }

        match path {
            [] => Type::any(),
            [name] => match scope.lookup_binding(*name) {
                Some((binding, _)) => match binding.state {
                    BindingState::Resolved(ty) => ty,
                    BindingState::Unresolved => binding.provisional.unwrap_or_else(Type::any),
                    BindingState::WidenedToAny => Type::any(),
                },
                None => Type::any(),
            },
            [parent @ .., property] => {
                property_type_or_any(&self.current_type(parent, scope), *property)
            }
        }
    }
}

fn type_of(node: &Node) -> Type {
    node.ty.clone().unwrap_or_else(Type::any)
}
