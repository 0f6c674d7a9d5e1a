//! Structural subtyping. `Any` (and the `Undefined` placeholder) are
//! compatible in both directions, everything else is checked structurally.

use crate::{
    frontend::ast::LiteralValue,
    middle::ty::{FunctionType, ObjectProperty, Type, TypeKind},
};

pub fn is_subtype(a: &Type, b: &Type) -> bool {
    if a == b {
        return true;
    }

    let (a, b) = (a.unalias(), b.unalias());

    match (&*a, &*b) {
        (TypeKind::Any | TypeKind::Undefined, _) | (_, TypeKind::Any | TypeKind::Undefined) => true,
        (TypeKind::Never, _) | (_, TypeKind::Unknown) => true,
        (TypeKind::Unknown, _) => false,

        // Unions on the left are universal, so they're split first
        (TypeKind::Union(members), _) => members.iter().all(|member| is_subtype(member, &b)),
        (_, TypeKind::Union(members)) => members.iter().any(|member| is_subtype(&a, member)),

        (_, TypeKind::Intersection(members)) => members.iter().all(|member| is_subtype(&a, member)),
        (TypeKind::Intersection(members), _) => members.iter().any(|member| is_subtype(member, &b)),

        (TypeKind::Not(x), TypeKind::Not(y)) => is_subtype(y, x),
        (TypeKind::Not(_), _) => false,
        (_, TypeKind::Not(excluded)) => is_disjoint(&a, excluded),

        (TypeKind::Singleton(x), TypeKind::Singleton(y)) => x == y,
        (TypeKind::Singleton(value), _) => is_subtype(&value.base_type(), &b),

        (TypeKind::List(x), TypeKind::List(y)) | (TypeKind::Vector(x), TypeKind::Vector(y)) => {
            is_subtype(x, y)
        }
        (TypeKind::Tuple(members), TypeKind::Vector(element)) => {
            members.iter().all(|member| is_subtype(member, element))
        }
        (TypeKind::Tuple(xs), TypeKind::Tuple(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys.iter()).all(|(x, y)| is_subtype(x, y))
        }

        (TypeKind::Object(actual), TypeKind::Object(expected))
        | (TypeKind::Module { exports: actual, .. }, TypeKind::Object(expected)) => {
            is_object_subtype(actual, expected)
        }
        (TypeKind::Module { name: x, .. }, TypeKind::Module { name: y, .. }) => x == y,

        (TypeKind::Function(f), TypeKind::Function(g)) => is_function_subtype(f, g),

        (x, y) => core::mem::discriminant(x) == core::mem::discriminant(y) && is_primitive(x),
    }
}

fn is_primitive(kind: &TypeKind) -> bool {
    matches!(
        kind,
        TypeKind::Number | TypeKind::String | TypeKind::Boolean | TypeKind::Keyword | TypeKind::Nil
    )
}

/// Width subtyping: every property the target requires must be present with a
/// compatible type, extra properties are ignored
fn is_object_subtype(actual: &[ObjectProperty], expected: &[ObjectProperty]) -> bool {
    expected.iter().all(|wanted| {
        match actual.iter().find(|property| property.name == wanted.name) {
            Some(found) if found.optional && !wanted.optional => false,
            Some(found) => is_subtype(&found.ty, &wanted.ty),
            None => wanted.optional,
        }
    })
}

/// Contravariant in parameters, covariant in the return type
fn is_function_subtype(f: &FunctionType, g: &FunctionType) -> bool {
    f.variadic == g.variadic
        && f.params.len() == g.params.len()
        && f.params.iter().zip(g.params.iter()).all(|(x, y)| is_subtype(y, x))
        && is_subtype(&f.ret, &g.ret)
}

/// Whether two types provably share no values
pub fn is_disjoint(a: &Type, b: &Type) -> bool {
    let (a, b) = (a.unalias(), b.unalias());

    match (&*a, &*b) {
        (TypeKind::Never, _) | (_, TypeKind::Never) => true,
        (TypeKind::Any | TypeKind::Undefined | TypeKind::Unknown, _)
        | (_, TypeKind::Any | TypeKind::Undefined | TypeKind::Unknown) => false,

        (TypeKind::Union(members), _) => members.iter().all(|member| is_disjoint(member, &b)),
        (_, TypeKind::Union(members)) => members.iter().all(|member| is_disjoint(&a, member)),
        (TypeKind::Intersection(members), _) => members.iter().any(|member| is_disjoint(member, &b)),
        (_, TypeKind::Intersection(members)) => members.iter().any(|member| is_disjoint(&a, member)),

        (TypeKind::Not(excluded), other) | (other, TypeKind::Not(excluded)) => {
            is_subtype(&Type::new(other.clone()), excluded)
        }

        (TypeKind::Singleton(x), TypeKind::Singleton(y)) => x != y,
        (TypeKind::Singleton(value), other) | (other, TypeKind::Singleton(value)) => {
            is_disjoint(&value.base_type(), &Type::new(other.clone()))
        }

        (TypeKind::Vector(_) | TypeKind::Tuple(_), TypeKind::Vector(_) | TypeKind::Tuple(_)) => {
            false
        }
        (TypeKind::Object(_) | TypeKind::Module { .. }, TypeKind::Object(_) | TypeKind::Module { .. }) => {
            false
        }

        (x, y) => core::mem::discriminant(x) != core::mem::discriminant(y),
    }
}

/// `(== a b)` can only hold when both sides might be the same literal
pub fn literal_of(ty: &Type) -> Option<LiteralValue> {
    match &*ty.unalias() {
        TypeKind::Singleton(value) => Some(value.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::intern::InternedSymbol;

    fn samples() -> Vec<Type> {
        vec![
            Type::any(),
            Type::number(),
            Type::string(),
            Type::nil(),
            Type::never(),
            Type::unknown(),
            Type::vector(Type::number()),
            Type::tuple([Type::number(), Type::string()]),
            Type::object([ObjectProperty::new(InternedSymbol::new("x"), Type::number())]),
            Type::function([Type::number()], Type::string(), false),
            Type::singleton(LiteralValue::Number(3.0)),
            Type::not(Type::nil()),
        ]
    }

    #[test]
    fn subtyping_is_reflexive() {
        for ty in samples() {
            assert!(is_subtype(&ty, &ty), "{} should be a subtype of itself", ty.plain());
        }
    }

    #[test]
    fn any_absorbs_in_both_positions() {
        for ty in samples() {
            assert!(is_subtype(&ty, &Type::any()));
            assert!(is_subtype(&Type::any(), &ty));
        }
    }

    #[test]
    fn functions_are_contravariant_in_parameters() {
        let singleton = Type::singleton(LiteralValue::Number(1.0));
        let wide = Type::function([Type::number()], singleton.clone(), false);
        let narrow = Type::function([singleton], Type::number(), false);

        assert!(is_subtype(&wide, &narrow));
        assert!(!is_subtype(&narrow, &wide));
    }

    #[test]
    fn objects_use_width_subtyping() {
        let x = InternedSymbol::new("x");
        let y = InternedSymbol::new("y");
        let point = Type::object([
            ObjectProperty::new(x, Type::number()),
            ObjectProperty::new(y, Type::number()),
        ]);
        let has_x = Type::object([ObjectProperty::new(x, Type::number())]);

        assert!(is_subtype(&point, &has_x));
        assert!(!is_subtype(&has_x, &point));
    }

    #[test]
    fn not_nil_excludes_nil() {
        assert!(is_subtype(&Type::number(), &Type::not(Type::nil())));
        assert!(!is_subtype(&Type::nil(), &Type::not(Type::nil())));
    }
}
