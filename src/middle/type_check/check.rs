use super::{
    env::TypeEnvironment,
    subtype::is_subtype,
    CheckFailure, CheckResult, TypeChecker,
};
use crate::{
    error::type_error,
    frontend::ast::{Node, NodeKind},
    middle::ty::{FunctionType, Type, TypeKind},
};

impl<'ctx> TypeChecker<'ctx> {
    /// Checks a node against an expected type, pushing the expectation into
    /// literals, collections and lambdas where that's more precise than
    /// inferring first
    pub(super) fn check(
        &mut self,
        node: &mut Node,
        expected: &Type,
        env: &TypeEnvironment,
    ) -> CheckResult<Type> {
        let unaliased = expected.unalias();

        if unaliased.is_any() || unaliased.is_undefined() {
            return self.infer(node, env);
        }

        let id = node.id;

        match (&mut node.kind, &*unaliased) {
            (
                NodeKind::Record(_) | NodeKind::Vector(_) | NodeKind::Lambda(_),
                TypeKind::Union(arms),
            ) => {
                let arms = arms.clone();

                for arm in arms.iter() {
                    match self.with_force_strict(|checker| checker.check(node, arm, env)) {
                        Ok(_) => {
                            node.ty = Some(expected.clone());
                            return Ok(expected.clone());
                        }
                        Err(CheckFailure::Error(error)) => {
                            log::trace!("union arm {arm} rejected: {}", error.plain_message());
                        }
                        Err(deferred) => return Err(deferred),
                    }
                }

                let actual = self.infer(node, env)?;

                self.mismatch(node, expected, &actual, env)
            }
            (NodeKind::Record(properties), TypeKind::Object(expected_properties)) => {
                for property in properties.iter_mut() {
                    match expected_properties
                        .iter()
                        .find(|expected| expected.name == property.key)
                    {
                        Some(expected) => {
                            self.check(&mut property.value, &expected.ty, env)?;
                        }
                        None => {
                            self.infer(&mut property.value, env)?;
                        }
                    }
                }

                for required in expected_properties.iter().filter(|property| !property.optional) {
                    if !properties.iter().any(|property| property.key == required.name) {
                        let location = node.location.clone();

                        self.tolerate(
                            env,
                            type_error!(
                                location,
                                "Missing property `{}` required by {expected}",
                                required.name
                            ),
                            expected.clone(),
                        )?;
                    }
                }

                node.ty = Some(expected.clone());

                Ok(expected.clone())
            }
            (NodeKind::Vector(elements), TypeKind::Vector(element) | TypeKind::List(element)) => {
                let element = element.clone();

                for item in elements.iter_mut() {
                    self.check(item, &element, env)?;
                }

                node.ty = Some(expected.clone());

                Ok(expected.clone())
            }
            (NodeKind::Vector(elements), TypeKind::Tuple(members)) => {
                if elements.len() != members.len() {
                    let actual = self.infer(node, env)?;

                    return self.mismatch(node, expected, &actual, env);
                }

                let members = members.clone();

                for (item, member) in elements.iter_mut().zip(members.iter()) {
                    self.check(item, member, env)?;
                }

                node.ty = Some(expected.clone());

                Ok(expected.clone())
            }
            (NodeKind::Lambda(function), TypeKind::Function(signature)) => {
                let signature = signature.clone();

                let fixed = function.fixed_params().len();

                if !accepts_arity(fixed, function.rest_param().is_some(), &signature) {
                    let actual = self.infer(node, env)?;

                    return self.mismatch(node, expected, &actual, env);
                }

                let actual = self.infer_function(id, function, env, Some(&signature), true)?;

                node.ty = Some(actual.clone());

                if is_subtype(&actual, expected) {
                    Ok(actual)
                } else {
                    self.mismatch(node, expected, &actual, env)
                }
            }
            (
                NodeKind::If {
                    test,
                    then,
                    otherwise,
                },
                _,
            ) => {
                self.infer(test, env)?;

                let then_env = self.narrow(test, env, true)?;
                let else_env = self.narrow(test, env, false)?;

                self.check(then, expected, &then_env)?;
                self.check(otherwise, expected, &else_env)?;

                node.ty = Some(expected.clone());

                Ok(expected.clone())
            }
            (NodeKind::Do(body), _) if !body.is_empty() => {
                let scope = env.child();

                self.hoist_functions(body, &scope);

                let last = body.len() - 1;

                for (index, item) in body.iter_mut().enumerate() {
                    if index == last {
                        self.check(item, expected, &scope)?;
                    } else {
                        self.infer(item, &scope)?;
                    }
                }

                node.ty = Some(expected.clone());

                Ok(expected.clone())
            }
            _ => {
                let actual = self.infer(node, env)?;

                if is_subtype(&actual, expected) {
                    return Ok(actual);
                }

                // Literals also inhabit their singleton types
                if let Some(value) = node.literal_value() {
                    let singleton = Type::singleton(value);

                    if is_subtype(&singleton, expected) {
                        node.ty = Some(singleton.clone());
                        return Ok(singleton);
                    }
                }

                self.mismatch(node, expected, &actual, env)
            }
        }
    }

    fn mismatch(
        &self,
        node: &Node,
        expected: &Type,
        actual: &Type,
        env: &TypeEnvironment,
    ) -> CheckResult<Type> {
        log::trace!(
            "mismatch at {}: {} against {}",
            node.location,
            actual.plain(),
            expected.plain()
        );

        self.tolerate(
            env,
            type_error!(
                node.location.clone(),
                "Expected {expected} but found {actual}"
            ),
            actual.clone(),
        )
    }
}

/// Whether a lambda with this many parameters can stand in for `signature`
fn accepts_arity(fixed: usize, variadic: bool, signature: &FunctionType) -> bool {
    let wanted = signature.fixed_params().len();

    match (variadic, signature.variadic) {
        (false, false) => fixed == wanted,
        (true, true) => fixed == wanted,
        (true, false) => fixed <= wanted,
        (false, true) => false,
    }
}
