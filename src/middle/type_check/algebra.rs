//! Normal forms for unions and intersections, plus the set operations the
//! narrowing rules are built from.
//!
//! A union is flat (no nested unions) and minimal (no member is a subtype of
//! another). When two members are mutual subtypes, as with `any` and anything
//! else, the earliest one is kept.

use super::subtype::{is_disjoint, is_subtype};
use crate::{
    frontend::ast::LiteralValue,
    middle::ty::{Type, TypeKind},
};

fn flatten_into(ty: Type, members: &mut Vec<Type>, union: bool) {
    match (&*ty, union) {
        (TypeKind::Union(inner), true) | (TypeKind::Intersection(inner), false) => {
            for member in inner.iter() {
                flatten_into(member.clone(), members, union);
            }
        }
        _ => members.push(ty),
    }
}

pub fn union(types: impl IntoIterator<Item = Type>) -> Type {
    let mut flattened = Vec::new();

    for ty in types {
        flatten_into(ty, &mut flattened, true);
    }

    let has_defined = flattened.iter().any(|ty| !ty.is_undefined());
    let mut members: Vec<Type> = Vec::new();

    for candidate in flattened {
        if candidate.is_never() || (has_defined && candidate.is_undefined()) {
            continue;
        }

        if members.iter().any(|kept| is_subtype(&candidate, kept)) {
            continue;
        }

        // The candidate replaces the first member it subsumes, in place
        match members.iter().position(|kept| is_subtype(kept, &candidate)) {
            Some(position) => {
                members[position] = candidate.clone();
                let mut index = position + 1;

                while index < members.len() {
                    if is_subtype(&members[index], &candidate) {
                        members.remove(index);
                    } else {
                        index += 1;
                    }
                }
            }
            None => members.push(candidate),
        }
    }

    collapse_booleans(&mut members);

    match members.len() {
        0 => Type::never(),
        1 => members.remove(0),
        _ => Type::new(TypeKind::Union(members.into())),
    }
}

/// `(or true false)` is just `boolean`
fn collapse_booleans(members: &mut Vec<Type>) {
    let is_bool = |member: &Type, value: bool| {
        matches!(&**member, TypeKind::Singleton(LiteralValue::Boolean(b)) if *b == value)
    };

    let Some(true_position) = members.iter().position(|member| is_bool(member, true)) else {
        return;
    };

    if let Some(false_position) = members.iter().position(|member| is_bool(member, false)) {
        let first = true_position.min(false_position);
        let second = true_position.max(false_position);

        members.remove(second);
        members[first] = Type::boolean();
    }
}

pub fn intersection(types: impl IntoIterator<Item = Type>) -> Type {
    let mut flattened = Vec::new();

    for ty in types {
        flatten_into(ty, &mut flattened, false);
    }

    // Distribute over the first union member
    if let Some(position) = flattened
        .iter()
        .position(|ty| matches!(&*ty.unalias(), TypeKind::Union(_)))
    {
        let union_type = flattened.remove(position).unalias();

        if let TypeKind::Union(arms) = &*union_type {
            return union(arms.iter().map(|arm| {
                let mut members = flattened.clone();

                members.push(arm.clone());
                intersection(members)
            }));
        }
    }

    let mut members: Vec<Type> = Vec::new();

    for candidate in flattened {
        let unaliased = candidate.unalias();

        match &*unaliased {
            TypeKind::Any | TypeKind::Unknown | TypeKind::Undefined => continue,
            TypeKind::Never => return Type::never(),
            _ => {}
        }

        if members.iter().any(|kept| is_disjoint(kept, &candidate)) {
            return Type::never();
        }

        if members.iter().any(|kept| is_subtype(kept, &candidate)) {
            continue;
        }

        members.retain(|kept| !is_subtype(&candidate, kept));
        members.push(candidate);
    }

    // A negation next to a concrete type is folded into it
    if let Some(position) = members.iter().position(|member| matches!(&**member, TypeKind::Not(_))) {
        if members.len() == 2 {
            let negation = members.remove(position);

            if let TypeKind::Not(excluded) = &*negation {
                return exclude(&members[0], excluded);
            }
        }
    }

    match members.len() {
        0 => Type::unknown(),
        1 => members.remove(0),
        _ => Type::new(TypeKind::Intersection(members.into())),
    }
}

/// Refines `current` with a newly learned fact about the same value
pub fn narrow_type(current: &Type, fact: &Type) -> Type {
    if current.unalias().is_any() || current.is_undefined() {
        return fact.clone();
    }

    intersection([current.clone(), fact.clone()])
}

/// Removes the values of `removed` from `current`
pub fn exclude(current: &Type, removed: &Type) -> Type {
    let unaliased = current.unalias();

    match &*unaliased {
        TypeKind::Any | TypeKind::Undefined => current.clone(),
        TypeKind::Union(members) => union(members.iter().map(|member| exclude(member, removed))),
        TypeKind::Boolean => match &*removed.unalias() {
            TypeKind::Singleton(LiteralValue::Boolean(value)) => {
                Type::singleton(LiteralValue::Boolean(!value))
            }
            TypeKind::Boolean => Type::never(),
            _ => current.clone(),
        },
        _ if is_subtype(current, removed) => Type::never(),
        _ => current.clone(),
    }
}

fn members_of(ty: &Type) -> Vec<Type> {
    match &*ty.unalias() {
        TypeKind::Union(members) => members.to_vec(),
        _ => vec![ty.clone()],
    }
}

/// The part of a type that can pass a truthiness test
pub fn truthy_part(ty: &Type) -> Type {
    union(members_of(ty).into_iter().map(|member| {
        match &*member.unalias() {
            TypeKind::Nil | TypeKind::Singleton(LiteralValue::Boolean(false)) => Type::never(),
            TypeKind::Boolean => Type::singleton(LiteralValue::Boolean(true)),
            _ => member.clone(),
        }
    }))
}

/// The part of a type that can fail a truthiness test
pub fn falsy_part(ty: &Type) -> Type {
    union(members_of(ty).into_iter().map(|member| {
        let unaliased = member.unalias();

        match &*unaliased {
            TypeKind::Boolean => Type::singleton(LiteralValue::Boolean(false)),
            TypeKind::Any | TypeKind::Undefined | TypeKind::Unknown | TypeKind::List(_) => {
                member.clone()
            }
            _ if unaliased.is_falsy() => member.clone(),
            _ if unaliased.is_truthy() => Type::never(),
            _ => member.clone(),
        }
    }))
}

/// Literal types are forgotten when a value is stored somewhere mutable
pub fn widen_literal(ty: &Type) -> Type {
    match &**ty {
        TypeKind::Singleton(value) => value.base_type(),
        TypeKind::Union(members) => union(members.iter().map(widen_literal)),
        _ => ty.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::intern::InternedSymbol;

    fn keyword(name: &str) -> Type {
        Type::singleton(LiteralValue::Keyword(InternedSymbol::new(name)))
    }

    #[test]
    fn union_is_flat_and_idempotent() {
        let (a, b, c) = (Type::number(), Type::string(), keyword(":k"));

        let nested = union([union([a.clone(), b.clone()]), c.clone()]);
        let flat = union([a, b, c]);

        assert_eq!(nested, flat);
        assert_eq!(flat.plain(), "(or number string :k)");
    }

    #[test]
    fn union_drops_subsumed_members() {
        let ty = union([keyword(":a"), Type::keyword(), keyword(":b")]);

        assert_eq!(ty.plain(), "keyword");
    }

    #[test]
    fn union_keeps_the_earliest_of_mutual_subtypes() {
        assert_eq!(union([Type::number(), Type::any()]).plain(), "number");
        assert_eq!(union([Type::any(), Type::number()]).plain(), "any");
    }

    #[test]
    fn undefined_only_survives_alone() {
        assert_eq!(union([Type::undefined(), Type::number()]).plain(), "number");
        assert_eq!(union([Type::undefined()]).plain(), "undefined");
    }

    #[test]
    fn disjoint_intersection_is_never() {
        assert!(intersection([Type::number(), Type::string()]).is_never());
    }

    #[test]
    fn excluding_a_boolean_literal_leaves_the_other() {
        let ty = exclude(&Type::boolean(), &Type::singleton(LiteralValue::Boolean(true)));

        assert_eq!(ty.plain(), "false");
    }

    #[test]
    fn narrowing_a_union_to_a_member() {
        let maybe = union([Type::number(), Type::nil()]);

        assert_eq!(narrow_type(&maybe, &Type::not(Type::nil())).plain(), "number");
        assert_eq!(truthy_part(&maybe).plain(), "number");
        assert_eq!(falsy_part(&maybe).plain(), "nil");
    }
}
