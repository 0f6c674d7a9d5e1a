use super::{
    algebra::{falsy_part, truthy_part, union, widen_literal},
    annotation::{resolve_annotation, resolve_rest},
    env::{Binding, BindingKind, TypeEnvironment},
    subtype::is_subtype,
    CheckResult, Pass, TypeChecker,
};
use crate::{
    error::{reference_error, type_error},
    frontend::{
        ast::{
            Application, Call, CondClause, Declaration, Function, LiteralValue,
            LogicalOperator, Node, NodeId, NodeKind, Pattern, PatternKind, UnaryOperator,
        },
        intern::InternedSymbol,
        SourceLocation,
    },
    middle::ty::{FunctionType, ObjectProperty, Type, TypeKind},
};

/// The symbol path of a plain symbol or a member chain rooted at one
pub(super) fn path_of(node: &Node) -> Option<Vec<InternedSymbol>> {
    match &node.kind {
        NodeKind::Symbol(name) => Some(vec![*name]),
        NodeKind::Member { object, property } => {
            let mut path = path_of(object)?;

            path.push(*property);
            Some(path)
        }
        _ => None,
    }
}

/// Whether a test is statically known to pass or fail
pub(super) fn static_truthiness(node: &Node, ty: &Type) -> Option<bool> {
    match &node.kind {
        NodeKind::Boolean(value) => Some(*value),
        NodeKind::Nil => Some(false),
        NodeKind::Number { .. } | NodeKind::String(_) | NodeKind::Keyword(_) => Some(true),
        _ if ty.is_truthy() => Some(true),
        _ if ty.is_falsy() => Some(false),
        _ => None,
    }
}

/// Property type for narrowing purposes, never fails
pub(super) fn property_type_or_any(ty: &Type, key: InternedSymbol) -> Type {
    match &*ty.unalias() {
        TypeKind::Object(properties) | TypeKind::Module { exports: properties, .. } => properties
            .iter()
            .find(|property| property.name == key)
            .map(|property| optional_property_type(property))
            .unwrap_or_else(Type::any),
        TypeKind::Union(members) => {
            union(members.iter().map(|member| property_type_or_any(member, key)))
        }
        TypeKind::Never => Type::never(),
        _ => Type::any(),
    }
}

fn optional_property_type(property: &ObjectProperty) -> Type {
    if property.optional {
        union([property.ty.clone(), Type::nil()])
    } else {
        property.ty.clone()
    }
}

impl<'ctx> TypeChecker<'ctx> {
    /// Computes a node's type bottom-up and records it on the node
    pub(super) fn infer(&mut self, node: &mut Node, env: &TypeEnvironment) -> CheckResult<Type> {
        let ty = self.infer_kind(node, env)?;

        node.ty = Some(ty.clone());

        Ok(ty)
    }

    fn infer_kind(&mut self, node: &mut Node, env: &TypeEnvironment) -> CheckResult<Type> {
        let location = node.location.clone();
        let path = path_of(node);
        let id = node.id;

        match &mut node.kind {
            NodeKind::Number { .. } => Ok(Type::number()),
            NodeKind::String(_) => Ok(Type::string()),
            NodeKind::Boolean(_) => Ok(Type::boolean()),
            NodeKind::Keyword(_) => Ok(Type::keyword()),
            NodeKind::Nil => Ok(Type::nil()),
            NodeKind::Symbol(name) => self.lookup_symbol(*name, &location, env),
            NodeKind::Call(call) => self.infer_call(call, &location, env),
            NodeKind::VariableDeclaration(declaration) => {
                self.infer_declaration(declaration, BindingKind::Variable, env)?;
                Ok(Type::nil())
            }
            NodeKind::ConstantDeclaration(declaration) => {
                self.infer_declaration(declaration, BindingKind::Constant, env)?;
                Ok(Type::nil())
            }
            NodeKind::Set { name, value } => self.infer_set(*name, value, &location, env),
            NodeKind::TypeAlias { name, annotation } => {
                env.enable_checking();

                let ty = resolve_annotation(annotation, env)?;

                env.define_type(*name, ty);
                Ok(Type::nil())
            }
            NodeKind::Import { name, alias } => {
                let ty = self
                    .modules
                    .get(name.as_str())
                    .cloned()
                    .unwrap_or_else(|| Type::module(name, []));

                env.define(*alias, Binding::resolved(BindingKind::Import, ty));
                Ok(Type::nil())
            }
            NodeKind::Vector(elements) => {
                let types = elements
                    .iter_mut()
                    .map(|element| Ok(widen_literal(&self.infer(element, env)?)))
                    .collect::<CheckResult<Vec<_>>>()?;

                Ok(Type::vector(union(types)))
            }
            NodeKind::Record(properties) => {
                let properties = properties
                    .iter_mut()
                    .map(|property| {
                        let ty = widen_literal(&self.infer(&mut property.value, env)?);

                        Ok(ObjectProperty::new(property.key, ty))
                    })
                    .collect::<CheckResult<Vec<_>>>()?;

                Ok(Type::object(properties))
            }
            NodeKind::Member { object, property } => {
                if let Some(narrowed) = path.as_deref().and_then(|path| env.lookup_path(path)) {
                    // The object still needs a type for the typed tree
                    self.infer(object, env)?;

                    return Ok(narrowed);
                }

                let object_type = self.infer(object, env)?;

                self.property_type(&object_type, *property, &location, env)
            }
            NodeKind::FunctionDeclaration(function) => {
                let ty = self.infer_function(id, function, env, None, false)?;

                if let Some(name) = function.name {
                    env.define(name, Binding::resolved(BindingKind::Function, ty.clone()));
                }

                Ok(ty)
            }
            NodeKind::Lambda(function) => self.infer_function(id, function, env, None, true),
            NodeKind::As {
                annotation,
                expression,
            } => {
                env.enable_checking();

                let ty = resolve_annotation(annotation, env)?;

                self.check(expression, &ty, env)?;
                Ok(ty)
            }
            NodeKind::Do(body) => self.infer_block(body, &env.child()),
            NodeKind::If {
                test,
                then,
                otherwise,
            } => self.infer_if(test, then, otherwise, env),
            NodeKind::Cond(clauses) => self.infer_cond(clauses, env),
            NodeKind::When { test, body } => {
                let test_type = self.infer(test, env)?;
                let scope = self.narrow(test, env, true)?.child();

                match static_truthiness(test, &test_type) {
                    Some(false) => {
                        self.with_suppressed(|checker| checker.infer_block(body, &scope))?;
                        Ok(Type::nil())
                    }
                    Some(true) => self.infer_block(body, &scope),
                    None => Ok(union([self.infer_block(body, &scope)?, Type::nil()])),
                }
            }
            NodeKind::For {
                target,
                iterable,
                body,
            } => {
                let iterable_type = self.infer(iterable, env)?;
                let element = self.element_type(&iterable_type, &iterable.location, env)?;
                let scope = env.child();

                self.bind_pattern(target, &element, BindingKind::Constant, None, &scope)?;
                self.infer_block(body, &scope)?;

                Ok(Type::nil())
            }
            NodeKind::Binary {
                operator,
                left,
                right,
            } => {
                let operator = *operator;
                let left_type = self.infer(left, env)?;
                let right_type = self.infer(right, env)?;

                if !operator.is_equality() {
                    for (operand, ty) in [(&**left, &left_type), (&**right, &right_type)] {
                        if !is_subtype(ty, &Type::number()) && !is_subtype(ty, &Type::string()) {
                            self.tolerate(
                                env,
                                type_error!(
                                    operand.location.clone(),
                                    "Cannot compare {ty} with `{operator}`, expected {} or {}",
                                    Type::number(),
                                    Type::string()
                                ),
                                Type::boolean(),
                            )?;
                        }
                    }
                }

                Ok(Type::boolean())
            }
            NodeKind::Logical {
                operator,
                left,
                right,
            } => self.infer_logical(*operator, left, right, env),
            NodeKind::Unary { operator, operand } => {
                let operand_type = self.infer(operand, env)?;

                Ok(match operator {
                    UnaryOperator::Not => match static_truthiness(operand, &operand_type) {
                        Some(truthy) => Type::singleton(LiteralValue::Boolean(!truthy)),
                        None => Type::boolean(),
                    },
                    UnaryOperator::Typeof => Type::string(),
                })
            }
        }
    }

    pub(super) fn lookup_symbol(
        &self,
        name: InternedSymbol,
        location: &SourceLocation,
        env: &TypeEnvironment,
    ) -> CheckResult<Type> {
        if let Some(narrowed) = env.lookup_path(&[name]) {
            return Ok(narrowed);
        }

        match env.lookup_binding(name) {
            Some((binding, _)) => self.binding_type(name, &binding),
            None => Err(reference_error!(location.clone(), "`{name}` is not defined").into()),
        }
    }

    pub(super) fn property_type(
        &self,
        object_type: &Type,
        key: InternedSymbol,
        location: &SourceLocation,
        env: &TypeEnvironment,
    ) -> CheckResult<Type> {
        let unaliased = object_type.unalias();

        match &*unaliased {
            TypeKind::Any | TypeKind::Undefined | TypeKind::Never => {
                Ok(property_type_or_any(object_type, key))
            }
            // Modules whose exports aren't known are opaque
            TypeKind::Module { exports, .. } if exports.is_empty() => Ok(Type::any()),
            TypeKind::Object(properties) | TypeKind::Module { exports: properties, .. } => {
                match properties.iter().find(|property| property.name == key) {
                    Some(property) => Ok(optional_property_type(property)),
                    None => self.tolerate(
                        env,
                        type_error!(
                            location.clone(),
                            "Property `{key}` does not exist on {object_type}"
                        ),
                        Type::any(),
                    ),
                }
            }
            TypeKind::Union(members) => {
                let types = members
                    .iter()
                    .map(|member| self.property_type(member, key, location, env))
                    .collect::<CheckResult<Vec<_>>>()?;

                Ok(union(types))
            }
            _ => self.tolerate(
                env,
                type_error!(
                    location.clone(),
                    "Cannot read property `{key}` of {object_type}"
                ),
                Type::any(),
            ),
        }
    }

    fn element_type(
        &self,
        iterable: &Type,
        location: &SourceLocation,
        env: &TypeEnvironment,
    ) -> CheckResult<Type> {
        match &*iterable.unalias() {
            TypeKind::Tuple(members) => Ok(union(members.iter().cloned())),
            TypeKind::Never => Ok(Type::never()),
            _ => match iterable.element_type() {
                Some(element) => Ok(element),
                None => self.tolerate(
                    env,
                    type_error!(location.clone(), "{iterable} is not iterable"),
                    Type::any(),
                ),
            },
        }
    }

    /// Infers each form in a fresh scope, defining nested functions up front
    /// so they can call each other
    pub(super) fn infer_block(
        &mut self,
        body: &mut [Node],
        scope: &TypeEnvironment,
    ) -> CheckResult<Type> {
        self.hoist_functions(body, scope);

        let mut last = Type::nil();

        for node in body.iter_mut() {
            last = self.infer(node, scope)?;
        }

        Ok(last)
    }

    pub(super) fn hoist_functions(&self, body: &[Node], scope: &TypeEnvironment) {
        for node in body {
            if let NodeKind::FunctionDeclaration(function) = &node.kind {
                if let Some(name) = function.name {
                    let provisional = self.provisional_signature(function, scope);

                    scope.define(
                        name,
                        Binding::unresolved(BindingKind::Function, Some(provisional)),
                    );
                }
            }
        }
    }

    fn infer_declaration(
        &mut self,
        declaration: &mut Declaration,
        kind: BindingKind,
        env: &TypeEnvironment,
    ) -> CheckResult<()> {
        let declared = match &declaration.annotation {
            Some(annotation) => {
                env.enable_checking();
                Some(resolve_annotation(annotation, env)?)
            }
            None => None,
        };

        // A lambda bound to a name may refer to itself through that name
        if let (Some(name), NodeKind::Lambda(function)) =
            (declaration.target.as_identifier(), &declaration.init.kind)
        {
            if !env.has_local(name) && !self.is_preregistered(name, env) {
                let provisional = self.provisional_signature(function, env);

                env.define(name, Binding::unresolved(kind, Some(provisional)));
            }
        }

        let ty = match &declared {
            Some(declared) => {
                self.check(&mut declaration.init, declared, env)?;
                declared.clone()
            }
            None => {
                let inferred = self.infer(&mut declaration.init, env)?;

                match (kind, declaration.init.literal_value()) {
                    (BindingKind::Constant, Some(value)) => Type::singleton(value),
                    (BindingKind::Constant, None) => inferred,
                    _ => widen_literal(&inferred),
                }
            }
        };

        self.bind_pattern(&declaration.target, &ty, kind, declared, env)
    }

    /// Top-level names registered by the first pass, still waiting for a type
    fn is_preregistered(&self, name: InternedSymbol, env: &TypeEnvironment) -> bool {
        env.is_root() && env.lookup_binding(name).is_some()
    }

    pub(super) fn bind_pattern(
        &mut self,
        pattern: &Pattern,
        ty: &Type,
        kind: BindingKind,
        declared: Option<Type>,
        env: &TypeEnvironment,
    ) -> CheckResult<()> {
        match &pattern.kind {
            PatternKind::Identifier(name) => {
                env.define(*name, Binding::resolved(kind, ty.clone()).declared(declared));
            }
            PatternKind::Vector { elements, rest } => {
                for (index, element) in elements.iter().enumerate() {
                    let element_type = match ty.element_type_at(index) {
                        Some(element_type) => element_type,
                        None => self.tolerate(
                            env,
                            type_error!(
                                pattern.location.clone(),
                                "Cannot destructure {ty} as a vector"
                            ),
                            Type::any(),
                        )?,
                    };

                    self.bind_pattern(element, &element_type, kind, None, env)?;
                }

                if let Some(rest) = rest {
                    let rest_type = ty
                        .rest_type_from(elements.len())
                        .unwrap_or_else(|| Type::vector(Type::any()));

                    env.define(*rest, Binding::resolved(kind, rest_type));
                }
            }
            PatternKind::Record { properties, rest } => {
                for property in properties {
                    let property_type =
                        self.property_type(ty, property.key, &property.pattern.location, env)?;

                    self.bind_pattern(&property.pattern, &property_type, kind, None, env)?;
                }

                if let Some(rest) = rest {
                    let keys = properties
                        .iter()
                        .map(|property| property.key)
                        .collect::<Vec<_>>();

                    env.define(*rest, Binding::resolved(kind, ty.record_without(&keys)));
                }
            }
        }

        Ok(())
    }

    fn infer_set(
        &mut self,
        name: InternedSymbol,
        value: &mut Node,
        location: &SourceLocation,
        env: &TypeEnvironment,
    ) -> CheckResult<Type> {
        let Some((binding, _)) = env.lookup_binding(name) else {
            return Err(reference_error!(location.clone(), "`{name}` is not defined").into());
        };

        if !binding.kind.is_assignable() {
            return Err(type_error!(location.clone(), "Cannot assign to constant `{name}`").into());
        }

        let target = match &binding.declared {
            Some(declared) => declared.clone(),
            None => widen_literal(&self.binding_type(name, &binding)?),
        };

        if target.unalias().is_any() {
            self.infer(value, env)?;
        } else {
            self.check(value, &target, env)?;
        }

        // Forget whatever was learned about the old value
        env.narrow(vec![name], target);

        Ok(Type::nil())
    }

    /// Parameter types, from annotations first and then from the type the
    /// function is being checked against
    fn param_types(
        &self,
        function: &Function,
        env: &TypeEnvironment,
        expected: Option<&FunctionType>,
    ) -> CheckResult<Vec<Type>> {
        function
            .params
            .iter()
            .enumerate()
            .map(|(index, param)| {
                let contextual = expected.and_then(|expected| match param.is_rest {
                    false => expected.fixed_params().get(index).cloned(),
                    true if expected.variadic => expected.params.last().cloned(),
                    true => Some(Type::vector(union(
                        expected.params.iter().skip(index).cloned(),
                    ))),
                });

                let ty = match (&param.annotation, contextual) {
                    (Some(annotation), contextual) => {
                        let ty = if param.is_rest {
                            resolve_rest(annotation, env)?
                        } else {
                            resolve_annotation(annotation, env)?
                        };

                        if let Some(contextual) = contextual {
                            if !is_subtype(&contextual, &ty) {
                                self.tolerate(
                                    env,
                                    type_error!(
                                        param.location.clone(),
                                        "Parameter of type {ty} can't accept {contextual}"
                                    ),
                                    ty.clone(),
                                )?;
                            }
                        }

                        ty
                    }
                    (None, Some(contextual)) => contextual,
                    (None, None) if param.is_rest => Type::vector(Type::any()),
                    (None, None) => Type::any(),
                };

                Ok(ty)
            })
            .collect()
    }

    pub(super) fn infer_function(
        &mut self,
        id: NodeId,
        function: &mut Function,
        env: &TypeEnvironment,
        expected: Option<&FunctionType>,
        is_lambda: bool,
    ) -> CheckResult<Type> {
        let annotated = function.is_annotated();
        let params = self.param_types(function, env, expected)?;
        let variadic = function.rest_param().is_some();

        let declared_return = match &function.return_annotation {
            Some(annotation) => Some(resolve_annotation(annotation, env)?),
            None => None,
        };

        let reusable = self
            .function_scopes
            .get(&id)
            .filter(|_| self.pass == Pass::Check && env.is_root() && expected.is_none())
            .cloned();

        let param_scope = match reusable {
            Some(scope) => {
                scope.set_checking(env.is_checking());
                scope
            }
            None => {
                let scope = env.child();

                for (param, ty) in function.params.iter().zip(&params) {
                    self.bind_pattern(&param.target, ty, BindingKind::Parameter, None, &scope)?;
                }

                if self.pass == Pass::Collect && env.is_root() {
                    self.function_scopes.insert(id, scope.clone());
                }

                scope
            }
        };

        if annotated {
            param_scope.enable_checking();
        }

        // Self references see the parameters and an undefined return type
        // until the body has been inferred
        if let Some(name) = function.name {
            let visible_outside = !is_lambda && env.lookup_binding(name).is_some();

            if !visible_outside && !param_scope.has_local(name) {
                let provisional = Type::function(
                    params.clone(),
                    declared_return.clone().unwrap_or_else(Type::undefined),
                    variadic,
                );

                param_scope.define(
                    name,
                    Binding::unresolved(BindingKind::Function, Some(provisional)),
                );
            }
        }

        let body_scope = param_scope.child();
        let wanted_return = declared_return
            .clone()
            .or_else(|| expected.map(|expected| expected.ret.clone()))
            .filter(|ret| !ret.unalias().is_any());

        self.hoist_functions(&function.body, &body_scope);

        let mut body_type = Type::nil();
        let last = function.body.len().saturating_sub(1);

        for (index, node) in function.body.iter_mut().enumerate() {
            body_type = match (&wanted_return, index == last) {
                (Some(wanted), true) => self.check(node, wanted, &body_scope)?,
                _ => self.infer(node, &body_scope)?,
            };
        }

        let ret = declared_return.unwrap_or_else(|| widen_literal(&body_type));

        Ok(Type::function(params, ret, variadic))
    }

    fn infer_call(
        &mut self,
        call: &mut Call,
        location: &SourceLocation,
        env: &TypeEnvironment,
    ) -> CheckResult<Type> {
        let callee_type = self.infer(&mut call.callee, env)?;

        let function = match &*callee_type.unalias() {
            TypeKind::Function(function) => function.clone(),
            TypeKind::Intersection(members) => {
                match members.iter().find_map(|member| member.as_function()) {
                    Some(function) => function,
                    None => return self.infer_uncallable(call, &callee_type, location, env),
                }
            }
            TypeKind::Any | TypeKind::Undefined => {
                for arg in &mut call.args {
                    self.infer(arg, env)?;
                }

                return Ok(Type::any());
            }
            _ => return self.infer_uncallable(call, &callee_type, location, env),
        };

        let fixed = function.fixed_params();
        let argc = call.args.len();

        if function.variadic && argc >= fixed.len() {
            let rest = function.rest_element().unwrap_or_else(Type::any);

            for (index, arg) in call.args.iter_mut().enumerate() {
                let param = fixed.get(index).cloned().unwrap_or_else(|| rest.clone());

                self.check(arg, &param, env)?;
            }

            call.application = Application::Full;

            return Ok(function.ret.clone());
        }

        if argc < fixed.len() {
            for (arg, param) in call.args.iter_mut().zip(fixed) {
                self.check(arg, param, env)?;
            }

            call.application = Application::Partial {
                remaining: fixed.len() - argc,
            };

            let remaining = function.params[argc..].iter().cloned().collect::<Vec<_>>();

            return Ok(Type::function(
                remaining,
                function.ret.clone(),
                function.variadic,
            ));
        }

        if argc == fixed.len() {
            for (arg, param) in call.args.iter_mut().zip(fixed) {
                self.check(arg, param, env)?;
            }

            call.application = Application::Full;

            return Ok(function.ret.clone());
        }

        Err(type_error!(
            location.clone(),
            "Too many arguments: expected {}, found {argc}",
            fixed.len()
        )
        .into())
    }

    fn infer_uncallable(
        &mut self,
        call: &mut Call,
        callee_type: &Type,
        location: &SourceLocation,
        env: &TypeEnvironment,
    ) -> CheckResult<Type> {
        for arg in &mut call.args {
            self.infer(arg, env)?;
        }

        self.tolerate(
            env,
            type_error!(location.clone(), "{callee_type} is not callable"),
            Type::any(),
        )
    }

    fn infer_if(
        &mut self,
        test: &mut Node,
        then: &mut Node,
        otherwise: &mut Node,
        env: &TypeEnvironment,
    ) -> CheckResult<Type> {
        let test_type = self.infer(test, env)?;
        let then_env = self.narrow(test, env, true)?;
        let else_env = self.narrow(test, env, false)?;

        match static_truthiness(test, &test_type) {
            Some(true) => {
                let ty = self.infer(then, &then_env)?;

                self.with_suppressed(|checker| checker.infer(otherwise, &else_env))?;
                Ok(ty)
            }
            Some(false) => {
                self.with_suppressed(|checker| checker.infer(then, &then_env))?;
                self.infer(otherwise, &else_env)
            }
            None => Ok(union([
                self.infer(then, &then_env)?,
                self.infer(otherwise, &else_env)?,
            ])),
        }
    }

    fn infer_cond(
        &mut self,
        clauses: &mut [CondClause],
        env: &TypeEnvironment,
    ) -> CheckResult<Type> {
        let mut current = env.clone();
        let mut types = Vec::new();
        let mut exhaustive = false;

        for clause in clauses.iter_mut() {
            if exhaustive {
                self.with_suppressed(|checker| {
                    checker.infer(&mut clause.test, &current)?;
                    checker.infer(&mut clause.body, &current)
                })?;
                continue;
            }

            let test_type = self.infer(&mut clause.test, &current)?;
            let body_env = self.narrow(&clause.test, &current, true)?;

            match static_truthiness(&clause.test, &test_type) {
                Some(false) => {
                    self.with_suppressed(|checker| checker.infer(&mut clause.body, &body_env))?;
                }
                Some(true) => {
                    types.push(self.infer(&mut clause.body, &body_env)?);
                    exhaustive = true;
                }
                None => types.push(self.infer(&mut clause.body, &body_env)?),
            }

            current = self.narrow(&clause.test, &current, false)?;
        }

        if !exhaustive {
            types.push(Type::nil());
        }

        Ok(union(types))
    }

    fn infer_logical(
        &mut self,
        operator: LogicalOperator,
        left: &mut Node,
        right: &mut Node,
        env: &TypeEnvironment,
    ) -> CheckResult<Type> {
        let left_type = self.infer(left, env)?;
        let right_env = self.narrow(left, env, operator == LogicalOperator::And)?;
        let truthiness = static_truthiness(left, &left_type);

        // The right operand is only evaluated when the left one doesn't decide
        let short_circuits = match operator {
            LogicalOperator::And => truthiness == Some(false),
            LogicalOperator::Or => truthiness == Some(true),
        };

        if short_circuits {
            self.with_suppressed(|checker| checker.infer(right, &right_env))?;

            return Ok(left_type);
        }

        let right_type = self.infer(right, &right_env)?;

        if truthiness.is_some() {
            return Ok(right_type);
        }

        let kept = match operator {
            LogicalOperator::And => falsy_part(&left_type),
            LogicalOperator::Or => truthy_part(&left_type),
        };

        Ok(union([kept, right_type]))
    }
}
