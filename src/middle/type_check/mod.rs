//! Sprig Type Checker
//!
//! Checking is done in two passes over the whole program:
//!
//!   1) every top-level name is registered as unresolved, then the top-level
//!      forms are inferred in a retry loop. A form that reads a binding which
//!      has no type yet is deferred and retried once something else made
//!      progress. Whatever can't be resolved is widened to `any`.
//!   2) with the root environment fully populated, the program is walked again
//!      in order and this walk produces the typed AST.
//!
//! Checking is gradual: a scope only reports failed checks once an annotation
//! has been seen in it (or in a parent scope before it was created). Until
//! then a mismatch is logged and the inferred type is kept. Unbound names and
//! wrong argument counts are always reported.

use std::collections::VecDeque;

use hashbrown::HashMap;

use self::env::{Binding, BindingKind, BindingState, TypeEnvironment};
use crate::{
    context::CompilationContext,
    error::{internal_error, CompileError, CompileResult},
    frontend::{
        ast::{Function, Node, NodeId, NodeKind, Program, TypeExpr},
        intern::InternedSymbol,
    },
    middle::ty::Type,
};

pub mod algebra;
pub mod annotation;
mod check;
pub mod env;
mod infer;
mod narrow;
pub mod subtype;

/// Bound on the pass one retry loop. Every round either resolves a form or
/// widens the remaining names, so this is only reached on a bug.
const MAX_COLLECT_ROUNDS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Collect,
    Check,
}

#[derive(Debug)]
enum CheckFailure {
    /// A form read a top-level name which has no type yet (pass one only)
    Deferred(InternedSymbol),
    Error(CompileError),
}

impl From<CompileError> for CheckFailure {
    fn from(error: CompileError) -> Self {
        Self::Error(error)
    }
}

type CheckResult<T> = Result<T, CheckFailure>;

/// Checks the program against the context's root environment and returns it
/// with every node's `ty` filled in
pub fn typecheck(program: Program, ctx: &mut CompilationContext) -> CompileResult<Program> {
    let mut checker = TypeChecker {
        root: ctx.environment.clone(),
        modules: &ctx.modules,
        pass: Pass::Collect,
        function_scopes: HashMap::new(),
        force_strict: 0,
        suppressed: 0,
        strict: ctx.options.strict,
    };

    checker.collect(&program)?;
    checker.check_program(program)
}

struct TypeChecker<'ctx> {
    root: TypeEnvironment,
    /// Export types of modules known ahead of time, by module name
    modules: &'ctx HashMap<String, Type>,
    pass: Pass,
    /// Parameter scopes of top-level functions, built in pass one
    function_scopes: HashMap<NodeId, TypeEnvironment>,
    /// Non-zero while trying the arms of a union, where failures must surface
    force_strict: usize,
    /// Non-zero inside statically dead branches
    suppressed: usize,
    strict: bool,
}

impl<'ctx> TypeChecker<'ctx> {
    fn collect(&mut self, program: &Program) -> CompileResult<()> {
        self.pass = Pass::Collect;
        self.root.set_checking(self.strict);

        let mut body = program.body.clone();

        self.preregister_aliases(&body);

        for node in &body {
            self.preregister(node);
        }

        let root = self.root.clone();
        let mut pending = (0..body.len()).collect::<VecDeque<_>>();

        for round in 0..MAX_COLLECT_ROUNDS {
            let mut deferred = VecDeque::new();
            let mut progressed = false;

            while let Some(index) = pending.pop_front() {
                match self.infer(&mut body[index], &root) {
                    Ok(_) => progressed = true,
                    Err(CheckFailure::Deferred(name)) => {
                        log::trace!("round {round}: deferring top-level form waiting on `{name}`");
                        deferred.push_back(index);
                    }
                    Err(CheckFailure::Error(error)) => return Err(error),
                }
            }

            if deferred.is_empty() {
                return Ok(());
            }

            if !progressed {
                self.root.widen_unresolved();
            }

            pending = deferred;
        }

        Err(internal_error!(
            "top-level forms were still deferred after {MAX_COLLECT_ROUNDS} rounds"
        ))
    }

    fn check_program(&mut self, mut program: Program) -> CompileResult<Program> {
        self.pass = Pass::Check;
        self.root.widen_unresolved();
        self.root.widen_undefined();
        self.root.set_checking(self.strict);

        let root = self.root.clone();

        for node in &mut program.body {
            match self.infer(node, &root) {
                Ok(_) => {}
                Err(CheckFailure::Error(error)) => return Err(error),
                Err(CheckFailure::Deferred(name)) => {
                    return Err(internal_error!(
                        "`{name}` was deferred while checking, after every name was resolved"
                    ))
                }
            }
        }

        log::debug!("type checked {} top-level forms", program.body.len());

        Ok(program)
    }

    /// Defines top-level type aliases ahead of everything else, repeating
    /// while aliases that refer to later aliases keep resolving. Whatever is
    /// left fails again, with its error, when the form itself is inferred.
    fn preregister_aliases(&mut self, body: &[Node]) {
        let mut pending = body
            .iter()
            .filter_map(|node| match &node.kind {
                NodeKind::TypeAlias { name, annotation } => Some((*name, annotation)),
                _ => None,
            })
            .collect::<Vec<_>>();

        while !pending.is_empty() {
            let before = pending.len();

            pending.retain(|(name, annotation)| {
                match annotation::resolve_annotation(annotation, &self.root) {
                    Ok(ty) => {
                        self.root.define_type(*name, ty);
                        false
                    }
                    Err(_) => true,
                }
            });

            if pending.len() == before {
                log::trace!("{} type alias(es) left to their own forms", pending.len());
                break;
            }
        }
    }

    /// Makes top-level names visible to forms that come before them
    fn preregister(&mut self, node: &Node) {
        match &node.kind {
            NodeKind::FunctionDeclaration(function) => {
                if let Some(name) = function.name {
                    let provisional = self.provisional_signature(function, &self.root);

                    self.root.define(
                        name,
                        Binding::unresolved(BindingKind::Function, Some(provisional)),
                    );
                }
            }
            NodeKind::VariableDeclaration(declaration)
            | NodeKind::ConstantDeclaration(declaration) => {
                let kind = match node.kind {
                    NodeKind::VariableDeclaration(_) => BindingKind::Variable,
                    _ => BindingKind::Constant,
                };

                let provisional = match &declaration.init.kind {
                    NodeKind::Lambda(function) => {
                        Some(self.provisional_signature(function, &self.root))
                    }
                    _ => None,
                };

                for name in declaration.target.bound_names() {
                    self.root
                        .define(name, Binding::unresolved(kind, provisional.clone()));
                }
            }
            _ => {}
        }
    }

    /// A function's type from its annotations alone, with an `Undefined`
    /// return when none is written
    fn provisional_signature(&self, function: &Function, env: &TypeEnvironment) -> Type {
        let resolve = |annotation: &TypeExpr| {
            annotation::resolve_annotation(annotation, env).unwrap_or_else(|_| Type::any())
        };

        let params = function
            .params
            .iter()
            .map(|param| match &param.annotation {
                Some(annotation) => resolve(annotation),
                None if param.is_rest => Type::vector(Type::any()),
                None => Type::any(),
            })
            .collect::<Vec<_>>();

        let ret = function
            .return_annotation
            .as_ref()
            .map(&resolve)
            .unwrap_or_else(Type::undefined);

        Type::function(params, ret, function.rest_param().is_some())
    }

    fn is_strict(&self, env: &TypeEnvironment) -> bool {
        self.force_strict > 0 || (self.suppressed == 0 && env.is_checking())
    }

    /// Reports a failed check when checking is on, otherwise logs it and
    /// carries on with `fallback`
    fn tolerate(
        &self,
        env: &TypeEnvironment,
        error: CompileError,
        fallback: Type,
    ) -> CheckResult<Type> {
        if self.is_strict(env) {
            return Err(error.into());
        }

        log::debug!("tolerating unchecked {}", error.plain_message());

        Ok(fallback)
    }

    fn with_suppressed<T>(&mut self, f: impl FnOnce(&mut Self) -> CheckResult<T>) -> CheckResult<T> {
        self.suppressed += 1;
        let result = f(self);
        self.suppressed -= 1;

        result
    }

    fn with_force_strict<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> CheckResult<T>,
    ) -> CheckResult<T> {
        self.force_strict += 1;
        let result = f(self);
        self.force_strict -= 1;

        result
    }

    fn binding_type(&self, name: InternedSymbol, binding: &Binding) -> CheckResult<Type> {
        match &binding.state {
            BindingState::Resolved(ty) => Ok(ty.clone()),
            BindingState::WidenedToAny => Ok(Type::any()),
            BindingState::Unresolved => match (&binding.provisional, self.pass) {
                (Some(provisional), _) => Ok(provisional.clone()),
                (None, Pass::Collect) => Err(CheckFailure::Deferred(name)),
                (None, Pass::Check) => Ok(Type::any()),
            },
        }
    }
}
