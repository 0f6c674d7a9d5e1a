use std::io::Cursor;

use hashbrown::HashMap;
use murmur3::murmur3_32;
use once_cell::sync::Lazy;

use crate::frontend::intern::InternedSymbol;

const SEED: u32 = 0x5b21_7c03;

/// Prefix of names the compiler makes up. Source identifiers can't contain it.
pub const GENERATED_PREFIX: char = '#';

static RESERVED: Lazy<hashbrown::HashSet<&'static str>> = Lazy::new(|| {
    [
        "arguments", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
        "default", "delete", "do", "else", "enum", "eval", "export", "extends", "false",
        "finally", "for", "function", "if", "implements", "import", "in", "Infinity",
        "instanceof", "interface", "let", "NaN", "new", "null", "package", "private",
        "protected", "public", "return", "static", "super", "switch", "Symbol", "this", "throw",
        "true", "try", "typeof", "undefined", "var", "void", "while", "with", "yield",
    ]
    .into_iter()
    .collect()
});

/// Maps source identifiers onto collision free JavaScript identifiers.
///
/// Plain identifiers that are already valid (and not reserved) are kept as
/// they are. Anything else is spelled out with ASCII words and suffixed with
/// `$` and a murmur3 hash of the original name, so `empty?` becomes
/// `empty_p$1a2b3c4d`. Names are mangled once at registration and the same
/// name always maps to the same output. Explicit definitions (used for the
/// runtime surface) take priority over mangling.
#[derive(Debug)]
pub struct Namespace {
    mangled: HashMap<InternedSymbol, String>,
    defined: HashMap<InternedSymbol, String>,
    /// Output name to the source name which claimed it
    claimed: HashMap<String, InternedSymbol>,
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

impl Namespace {
    pub fn new() -> Self {
        Self {
            mangled: HashMap::new(),
            defined: HashMap::new(),
            claimed: HashMap::new(),
        }
    }

    /// Mangles `name` if that hasn't happened yet and returns the result
    pub fn register(&mut self, name: InternedSymbol) -> &str {
        if !self.mangled.contains_key(&name) {
            let output = mangle(name.value());

            if let Some(previous) = self.claimed.insert(output.clone(), name) {
                if previous != name {
                    log::warn!("`{previous}` and `{name}` both mangle to `{output}`");
                }
            }

            self.mangled.insert(name, output);
        }

        &self.mangled[&name]
    }

    /// Pins the output name of `name`, e.g. to a runtime export
    pub fn define(&mut self, name: &str, output: &str) {
        self.defined
            .insert(InternedSymbol::new(name), output.to_owned());
    }

    /// Output name for a reference to `name`
    pub fn resolve(&mut self, name: InternedSymbol) -> String {
        match self.defined.get(&name) {
            Some(output) => output.clone(),
            None => self.register(name).to_owned(),
        }
    }

    /// Output name for a binding the program itself declares, which hides any
    /// definition of the same name
    pub fn resolve_local(&mut self, name: InternedSymbol) -> String {
        self.register(name).to_owned()
    }
}

/// Whether `name` can be used as a JavaScript identifier as is
fn is_plain(name: &str) -> bool {
    let mut chars = name.chars();

    let starts_well = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');

    starts_well
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !RESERVED.contains(name)
}

fn spell(c: char) -> Option<&'static str> {
    Some(match c {
        '+' => "plus",
        '-' => "_",
        '*' => "star",
        '/' => "slash",
        '\\' => "bslash",
        '<' => "lt",
        '>' => "gt",
        '=' => "eq",
        '%' => "percent",
        '|' => "bar",
        '&' => "amp",
        '?' => "_p",
        '!' => "_bang",
        ':' => "colon",
        '.' => "dot",
        '$' => "dollar",
        _ => return None,
    })
}

pub fn mangle(name: &str) -> String {
    if let Some(generated) = name.strip_prefix(GENERATED_PREFIX) {
        return format!("${generated}");
    }

    if is_plain(name) {
        return name.to_owned();
    }

    let mut output = String::with_capacity(name.len() + 9);

    for c in name.chars() {
        match spell(c) {
            Some(word) => output.push_str(word),
            None if c.is_ascii_alphanumeric() || c == '_' => output.push(c),
            None => output.push_str(&format!("u{:x}", c as u32)),
        }
    }

    if output.starts_with(|c: char| c.is_ascii_digit()) || output.is_empty() {
        output.insert(0, '_');
    }

    // Reading from memory can't fail
    let hash = murmur3_32(&mut Cursor::new(name.as_bytes()), SEED).unwrap_or_default();

    output.push_str(&format!("${hash:08x}"));
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_identifiers_are_kept() {
        assert_eq!(mangle("factorial"), "factorial");
        assert_eq!(mangle("snake_case2"), "snake_case2");
    }

    #[test]
    fn punctuation_is_spelled_out_and_hashed() {
        let mangled = mangle("empty?");

        assert!(mangled.starts_with("empty_p$"));
        assert_eq!(mangled.len(), "empty_p$".len() + 8);
        assert_eq!(mangled, mangle("empty?"));
        assert_ne!(mangle("a-b"), mangle("a_b"));
    }

    #[test]
    fn reserved_words_are_mangled() {
        assert!(mangle("class").starts_with("class$"));
        assert!(mangle("Symbol").starts_with("Symbol$"));
    }

    #[test]
    fn generated_names_use_the_dollar_prefix() {
        assert_eq!(mangle("#t12"), "$t12");
    }

    #[test]
    fn definitions_win_over_mangling_but_not_for_locals() {
        let mut namespace = Namespace::new();
        let plus = InternedSymbol::new("+");

        namespace.register(plus);
        namespace.define("+", "m");

        assert_eq!(namespace.resolve(plus), "m");
        assert!(namespace.resolve_local(plus).starts_with("plus$"));
    }
}
