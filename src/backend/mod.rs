//! The backend turns normalized programs into JavaScript modules. Source
//! names go through the namespace so every reference to a binding is spelled
//! the same way in the output.

pub mod emit;
pub mod namespace;
