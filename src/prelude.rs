//! The builtin surface every program starts with. Each entry names a Sprig
//! binding, its type and the runtime export implementing it.

use once_cell::sync::Lazy;

pub struct Builtin {
    pub name: &'static str,
    pub signature: &'static str,
    pub export: &'static str,
}

const fn builtin(name: &'static str, signature: &'static str, export: &'static str) -> Builtin {
    Builtin {
        name,
        signature,
        export,
    }
}

pub static BUILTINS: Lazy<Vec<Builtin>> = Lazy::new(|| {
    vec![
        builtin("+", "(fn [& (vector number)] number)", "add"),
        builtin("-", "(fn [number & (vector number)] number)", "subtract"),
        builtin("*", "(fn [& (vector number)] number)", "multiply"),
        builtin("/", "(fn [number & (vector number)] number)", "divide"),
        builtin("mod", "(fn [number number] number)", "mod"),
        builtin("=", "(fn [any any] boolean)", "equals"),
        builtin("not=", "(fn [any any] boolean)", "notEquals"),
        builtin("print", "(fn [& (vector any)] nil)", "print"),
        builtin("println", "(fn [& (vector any)] nil)", "println"),
        builtin("str", "(fn [& (vector any)] string)", "str"),
        builtin("list", "(fn [& (vector any)] (list any))", "list"),
        builtin("cons", "(fn [any (or (list any) nil)] (list any))", "cons"),
        builtin("first", "(fn [any] any)", "first"),
        builtin("rest", "(fn [any] any)", "rest"),
        builtin("count", "(fn [any] number)", "count"),
        builtin("empty?", "(fn [any] boolean)", "isEmpty"),
        builtin("map", "(fn [(fn [any] any) any] (vector any))", "map"),
        builtin("filter", "(fn [(fn [any] any) any] (vector any))", "filter"),
        builtin("reduce", "(fn [(fn [any any] any) any any] any)", "reduce"),
        builtin("range", "(fn [number & (vector number)] (vector number))", "range"),
        builtin("slice", "(fn [any number & (vector number)] any)", "slice"),
        builtin("get", "(fn [any any] any)", "get"),
        builtin("number?", "(fn [any] boolean)", "isNumber"),
        builtin("string?", "(fn [any] boolean)", "isString"),
        builtin("boolean?", "(fn [any] boolean)", "isBoolean"),
        builtin("keyword?", "(fn [any] boolean)", "isKeyword"),
        builtin("nil?", "(fn [any] boolean)", "isNil"),
        builtin("vector?", "(fn [any] boolean)", "isVector"),
        builtin("list?", "(fn [any] boolean)", "isList"),
    ]
});

/// Runtime helpers only the compiler refers to, named so no source
/// identifier can reach them
pub const INTRINSICS: &[(&str, &str)] = &[
    ("#get", "get"),
    ("#slice", "slice"),
    ("#omit", "omit"),
];
