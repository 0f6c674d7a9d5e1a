use super::{
    algebra::{intersection, union},
    env::TypeEnvironment,
};
use crate::{
    error::{reference_error, type_error, CompileResult},
    frontend::ast::{TypeExpr, TypeExprKind},
    middle::ty::{ObjectProperty, Type, TypeKind},
};

/// Turns a written type into a [`Type`], looking aliases up in `env`
pub fn resolve_annotation(annotation: &TypeExpr, env: &TypeEnvironment) -> CompileResult<Type> {
    let resolve_all = |members: &[TypeExpr]| {
        members
            .iter()
            .map(|member| resolve_annotation(member, env))
            .collect::<CompileResult<Vec<_>>>()
    };

    let ty = match &annotation.kind {
        TypeExprKind::Named(name) => match name.value() {
            "any" => Type::any(),
            "number" => Type::number(),
            "string" => Type::string(),
            "boolean" => Type::boolean(),
            "keyword" => Type::keyword(),
            "nil" => Type::nil(),
            "never" => Type::never(),
            "unknown" => Type::unknown(),
            _ => match env.lookup_type(*name) {
                Some(base) => Type::alias(*name, base),
                None => {
                    return Err(reference_error!(
                        annotation.location.clone(),
                        "Unknown type `{name}`"
                    ))
                }
            },
        },
        TypeExprKind::List(element) => Type::list(resolve_annotation(element, env)?),
        TypeExprKind::Vector(element) => Type::vector(resolve_annotation(element, env)?),
        TypeExprKind::Tuple(members) => Type::tuple(resolve_all(members)?),
        TypeExprKind::Object(properties) => Type::object(
            properties
                .iter()
                .map(|property| {
                    Ok(ObjectProperty {
                        name: property.key,
                        ty: resolve_annotation(&property.ty, env)?,
                        optional: property.optional,
                    })
                })
                .collect::<CompileResult<Vec<_>>>()?,
        ),
        TypeExprKind::Function { params, rest, ret } => {
            let mut resolved = resolve_all(params)?;

            if let Some(rest) = rest {
                resolved.push(resolve_rest(rest, env)?);
            }

            Type::function(resolved, resolve_annotation(ret, env)?, rest.is_some())
        }
        TypeExprKind::Union(members) => union(resolve_all(members)?),
        TypeExprKind::Intersection(members) => intersection(resolve_all(members)?),
        TypeExprKind::Not(inner) => Type::not(resolve_annotation(inner, env)?),
        TypeExprKind::Literal(value) => Type::singleton(value.clone()),
    };

    Ok(ty)
}

/// Rest parameters always collect into a vector
pub fn resolve_rest(annotation: &TypeExpr, env: &TypeEnvironment) -> CompileResult<Type> {
    let ty = resolve_annotation(annotation, env)?;

    match &*ty.unalias() {
        TypeKind::Vector(_) | TypeKind::Any => Ok(ty),
        _ => Err(type_error!(
            annotation.location.clone(),
            "Rest parameters must have a vector type, found {ty}"
        )),
    }
}
