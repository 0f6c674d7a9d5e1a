//! Types are checked here and the typed AST is rewritten into the shape the
//! emitter expects: A-normal form with tail self calls marked.

pub mod anf;
pub mod tco;
pub mod ty;
pub mod type_check;
