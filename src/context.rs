use hashbrown::HashMap;

use crate::{
    backend::{emit::RUNTIME_BINDING, namespace::Namespace},
    error::CompileResult,
    frontend::{ast::NodeId, intern::InternedSymbol, parser::parse_type_signature},
    index::Index,
    middle::{
        ty::Type,
        type_check::{
            annotation::resolve_annotation,
            env::{Binding, BindingKind, TypeEnvironment},
        },
    },
    prelude::{BUILTINS, INTRINSICS},
};

pub const DEFAULT_RUNTIME_MODULE: &str = "sprig/runtime";

#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Run the type checker. Without it nodes carry no types and truthiness
    /// is always tested through the runtime.
    pub typecheck: bool,
    pub tco: bool,
    /// Start the root scope with checking switched on
    pub strict: bool,
    /// Module specifier the emitted code imports the runtime from
    pub runtime: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            typecheck: true,
            tco: true,
            strict: false,
            runtime: DEFAULT_RUNTIME_MODULE.to_owned(),
        }
    }
}

/// Everything one compilation shares between its stages
#[derive(Debug)]
pub struct CompilationContext {
    pub options: CompileOptions,
    pub namespace: Namespace,
    pub environment: TypeEnvironment,
    /// Export types of modules the program may import, by module name
    pub modules: HashMap<String, Type>,
    next_node_id: NodeId,
    next_fresh: usize,
}

impl CompilationContext {
    /// Creates a context seeded with the builtin bindings
    pub fn new(options: CompileOptions) -> CompileResult<Self> {
        let mut ctx = Self {
            environment: TypeEnvironment::root(options.strict),
            options,
            namespace: Namespace::new(),
            modules: HashMap::new(),
            next_node_id: NodeId::new(0),
            next_fresh: 0,
        };

        ctx.seed_prelude()?;

        Ok(ctx)
    }

    fn seed_prelude(&mut self) -> CompileResult<()> {
        for builtin in BUILTINS.iter() {
            let annotation = parse_type_signature(builtin.signature, "<prelude>", self)?;
            let ty = resolve_annotation(&annotation, &self.environment)?;

            self.environment.define(
                InternedSymbol::new(builtin.name),
                Binding::resolved(BindingKind::Builtin, ty),
            );
            self.namespace
                .define(builtin.name, &format!("{RUNTIME_BINDING}.{}", builtin.export));
        }

        for (name, export) in INTRINSICS {
            self.namespace
                .define(name, &format!("{RUNTIME_BINDING}.{export}"));
        }

        log::trace!("seeded {} builtins", BUILTINS.len());

        Ok(())
    }

    /// Makes a module's export types known to `import`
    pub fn register_module(&mut self, name: impl Into<String>, exports: Type) {
        self.modules.insert(name.into(), exports);
    }

    pub fn next_node_id(&mut self) -> NodeId {
        let id = self.next_node_id;

        self.next_node_id.increment_by(1);

        id
    }

    /// A name no source identifier can collide with
    pub fn fresh_symbol(&mut self) -> InternedSymbol {
        self.next_fresh += 1;

        InternedSymbol::new(&format!("#t{}", self.next_fresh))
    }
}
