use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use hashbrown::HashMap;

use crate::{frontend::intern::InternedSymbol, middle::ty::Type};

/// Resolution state of a binding across the two checking passes
#[derive(Debug, Clone, PartialEq)]
pub enum BindingState {
    /// Pre-registered top-level name whose type hasn't been computed yet
    Unresolved,
    Resolved(Type),
    /// Could not be resolved in the first pass, treated as `any` from then on
    WidenedToAny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Variable,
    Constant,
    Function,
    Parameter,
    Import,
    Builtin,
}

impl BindingKind {
    pub fn is_assignable(&self) -> bool {
        matches!(self, BindingKind::Variable | BindingKind::Parameter)
    }
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub state: BindingState,
    pub kind: BindingKind,
    /// Annotated type, which assignments are checked against
    pub declared: Option<Type>,
    /// Stand-in used while a function's own type is still being inferred
    pub provisional: Option<Type>,
}

impl Binding {
    pub fn resolved(kind: BindingKind, ty: Type) -> Self {
        Self {
            state: BindingState::Resolved(ty),
            kind,
            declared: None,
            provisional: None,
        }
    }

    pub fn unresolved(kind: BindingKind, provisional: Option<Type>) -> Self {
        Self {
            state: BindingState::Unresolved,
            kind,
            declared: None,
            provisional,
        }
    }

    pub fn declared(mut self, declared: Option<Type>) -> Self {
        self.declared = declared;
        self
    }
}

/// A member chain rooted at a symbol, e.g. `point.x` is `[point, x]`
pub type Path = Vec<InternedSymbol>;

/// One scope in a chain of scopes. Cloning is cheap and shares the scope.
#[derive(Debug, Clone)]
pub struct TypeEnvironment(Rc<Scope>);

#[derive(Debug)]
struct Scope {
    parent: Option<TypeEnvironment>,
    values: RefCell<HashMap<InternedSymbol, Binding>>,
    types: RefCell<HashMap<InternedSymbol, Type>>,
    /// Types learned from conditionals, which shadow the declared ones
    paths: RefCell<HashMap<Path, Type>>,
    checking: Cell<bool>,
}

impl TypeEnvironment {
    pub fn root(checking: bool) -> Self {
        Self(Rc::new(Scope {
            parent: None,
            values: Default::default(),
            types: Default::default(),
            paths: Default::default(),
            checking: Cell::new(checking),
        }))
    }

    /// Child scopes start with their parent's checking flag
    pub fn child(&self) -> Self {
        Self(Rc::new(Scope {
            parent: Some(self.clone()),
            values: Default::default(),
            types: Default::default(),
            paths: Default::default(),
            checking: Cell::new(self.is_checking()),
        }))
    }

    pub fn is_root(&self) -> bool {
        self.0.parent.is_none()
    }

    /// Whether this scope itself binds `name`, resolved or not
    pub fn has_local(&self, name: InternedSymbol) -> bool {
        self.0.values.borrow().contains_key(&name)
    }

    pub fn is_checking(&self) -> bool {
        self.0.checking.get()
    }

    /// Called whenever an annotation shows up in this scope
    pub fn enable_checking(&self) {
        if !self.is_checking() {
            log::trace!("type checking switched on");
        }

        self.0.checking.set(true);
    }

    pub fn set_checking(&self, checking: bool) {
        self.0.checking.set(checking);
    }

    pub fn define(&self, name: InternedSymbol, binding: Binding) {
        self.0.values.borrow_mut().insert(name, binding);
    }

    pub fn define_type(&self, name: InternedSymbol, ty: Type) {
        self.0.types.borrow_mut().insert(name, ty);
    }

    pub fn narrow(&self, path: Path, ty: Type) {
        self.0.paths.borrow_mut().insert(path, ty);
    }

    /// Finds the nearest binding along with the scope holding it
    pub fn lookup_binding(&self, name: InternedSymbol) -> Option<(Binding, TypeEnvironment)> {
        let mut scope = Some(self);

        while let Some(env) = scope {
            if let Some(binding) = env.0.values.borrow().get(&name) {
                return Some((binding.clone(), env.clone()));
            }

            scope = env.0.parent.as_ref();
        }

        None
    }

    /// Nearest narrowed type for a path, unless a declaration of the root
    /// symbol in a closer scope hides it
    pub fn lookup_path(&self, path: &[InternedSymbol]) -> Option<Type> {
        let root = *path.first()?;
        let mut scope = Some(self);

        while let Some(env) = scope {
            if let Some(ty) = env.0.paths.borrow().get(path) {
                return Some(ty.clone());
            }

            if env.0.values.borrow().contains_key(&root) {
                return None;
            }

            scope = env.0.parent.as_ref();
        }

        None
    }

    pub fn lookup_type(&self, name: InternedSymbol) -> Option<Type> {
        let mut scope = Some(self);

        while let Some(env) = scope {
            if let Some(ty) = env.0.types.borrow().get(&name) {
                return Some(ty.clone());
            }

            scope = env.0.parent.as_ref();
        }

        None
    }

    /// Replaces a forward reference placeholder in the scope that owns it. This
    /// is the only write that may target an ancestor scope.
    pub fn upgrade(&self, name: InternedSymbol, ty: Type) {
        if let Some((_, owner)) = self.lookup_binding(name) {
            if let Some(binding) = owner.0.values.borrow_mut().get_mut(&name) {
                binding.state = BindingState::Resolved(ty);
                binding.provisional = None;
            }
        }
    }

    /// Names in this scope still waiting for a type
    pub fn unresolved(&self) -> Vec<InternedSymbol> {
        self.0
            .values
            .borrow()
            .iter()
            .filter(|(_, binding)| binding.state == BindingState::Unresolved)
            .map(|(name, _)| *name)
            .collect()
    }

    /// Every unresolved binding in this scope becomes `any`
    pub fn widen_unresolved(&self) {
        for (name, binding) in self.0.values.borrow_mut().iter_mut() {
            if binding.state == BindingState::Unresolved {
                log::debug!("widening unresolved binding `{name}` to any");

                binding.state = BindingState::WidenedToAny;
                binding.provisional = None;
            }
        }
    }

    /// Replaces `Undefined` placeholders left in resolved types by `any`
    pub fn widen_undefined(&self) {
        for binding in self.0.values.borrow_mut().values_mut() {
            if let BindingState::Resolved(ty) = &binding.state {
                if ty.contains_undefined() {
                    binding.state = BindingState::Resolved(ty.widen_undefined());
                }
            }
        }
    }

    /// Reads a binding's type from this scope only
    pub fn local_type(&self, name: InternedSymbol) -> Option<Type> {
        match &self.0.values.borrow().get(&name)?.state {
            BindingState::Resolved(ty) => Some(ty.clone()),
            BindingState::WidenedToAny => Some(Type::any()),
            BindingState::Unresolved => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_lookups_ignore_parents() {
        let root = TypeEnvironment::root(false);
        let name = InternedSymbol::new("local-name");

        root.define(name, Binding::unresolved(BindingKind::Variable, None));

        let child = root.child();

        assert!(root.is_root());
        assert!(!child.is_root());
        assert!(root.has_local(name));
        assert!(!child.has_local(name));
        assert!(root.local_type(name).is_none());
    }

    #[test]
    fn children_inherit_but_never_write_back_the_checking_flag() {
        let root = TypeEnvironment::root(false);
        let child = root.child();

        child.enable_checking();

        assert!(child.is_checking());
        assert!(!root.is_checking());
        assert!(!root.child().child().is_checking());
    }

    #[test]
    fn declarations_hide_outer_narrowing() {
        let x = InternedSymbol::new("x");
        let root = TypeEnvironment::root(false);

        root.define(x, Binding::resolved(BindingKind::Variable, Type::any()));

        let narrowed = root.child();
        narrowed.narrow(vec![x], Type::number());

        assert_eq!(narrowed.lookup_path(&[x]), Some(Type::number()));

        let inner = narrowed.child();
        inner.define(x, Binding::resolved(BindingKind::Variable, Type::string()));

        assert_eq!(inner.lookup_path(&[x]), None);
    }

    #[test]
    fn upgrade_resolves_in_the_owning_scope() {
        let f = InternedSymbol::new("f");
        let root = TypeEnvironment::root(false);

        root.define(f, Binding::unresolved(BindingKind::Function, None));
        root.child().upgrade(f, Type::number());

        assert_eq!(root.local_type(f), Some(Type::number()));

        root.define(InternedSymbol::new("g"), Binding::unresolved(BindingKind::Constant, None));
        root.widen_unresolved();

        assert!(root.unresolved().is_empty());
    }
}
