//! Sprig Language Compiler
//!
//! Compiles Sprig, a small Lisp, to JavaScript modules:
//!
//! ```text
//! tokenize -> read -> parse -> typecheck -> anf -> tco -> emit
//! ```
//!
//! Every stage takes the previous stage's output and a shared
//! [`CompilationContext`] and fails fast with a [`CompileError`].

use crate::{
    backend::emit::{emit, js_string, RUNTIME_BINDING},
    context::{CompilationContext, CompileOptions},
    error::CompileResult,
    frontend::{ast::Program, lexer::tokenize, parser::parse, reader::read},
    middle::{anf::anf, tco::tco, type_check::typecheck},
};

pub mod backend;
pub mod context;
pub mod error;
pub mod frontend;
mod index;
pub mod middle;
pub mod prelude;

pub use error::{CompileError, ErrorKind};

/// Source text to untyped AST
pub fn parse_source(
    source: &str,
    file: &str,
    ctx: &mut CompilationContext,
) -> CompileResult<Program> {
    let tokens = tokenize(source, file)?;
    let forms = read(&tokens)?;

    parse(&forms, ctx)
}

/// Runs the type checker unless it's been switched off
pub fn check(program: Program, ctx: &mut CompilationContext) -> CompileResult<Program> {
    if !ctx.options.typecheck {
        log::debug!("skipping type checking");
        return Ok(program);
    }

    typecheck(program, ctx)
}

/// Brings a (typed) program into the shape the emitter expects
pub fn normalize(program: Program, ctx: &mut CompilationContext) -> CompileResult<Program> {
    let program = anf(program, ctx)?;

    Ok(match ctx.options.tco {
        true => tco(program),
        false => program,
    })
}

/// Compiles one source file to the body of a JavaScript module
pub fn compile(source: &str, file: &str, ctx: &mut CompilationContext) -> CompileResult<String> {
    let program = parse_source(source, file, ctx)?;
    let program = check(program, ctx)?;
    let program = normalize(program, ctx)?;

    emit(&program, &mut ctx.namespace)
}

/// The import every emitted module starts with
pub fn module_header(options: &CompileOptions) -> String {
    format!(
        "import * as {RUNTIME_BINDING} from {};\n",
        js_string(&options.runtime)
    )
}
