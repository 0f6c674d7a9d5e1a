use std::rc::Rc;

use colored::Colorize;
use itertools::Itertools;

use crate::frontend::{ast::LiteralValue, intern::InternedSymbol};

#[doc(hidden)]
mod private {
    #[doc(hidden)]
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct PrivateZst;
}

/// Thin shared pointer to a type kind. Use the constructor functions below, and
/// [`crate::middle::type_check::algebra`] for unions and intersections so they
/// stay in normal form.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Type(Rc<TypeKind>, private::PrivateZst);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// The gradual escape hatch, compatible in both directions
    Any,
    Number,
    String,
    Boolean,
    Keyword,
    Nil,
    /// Bottom, the type of statically dead code
    Never,
    /// Top, everything is assignable to it but it can't be used directly
    Unknown,
    /// Placeholder for a return type which isn't known yet
    Undefined,
    Alias {
        name: InternedSymbol,
        base: Type,
    },
    List(Type),
    Vector(Type),
    Tuple(Rc<[Type]>),
    Object(Rc<[ObjectProperty]>),
    Function(FunctionType),
    /// Exactly one literal value
    Singleton(LiteralValue),
    /// Flattened and minimized, see `algebra::union`
    Union(Rc<[Type]>),
    Intersection(Rc<[Type]>),
    Not(Type),
    Module {
        name: Rc<str>,
        exports: Rc<[ObjectProperty]>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectProperty {
    pub name: InternedSymbol,
    pub ty: Type,
    pub optional: bool,
}

impl ObjectProperty {
    pub fn new(name: InternedSymbol, ty: Type) -> Self {
        Self {
            name,
            ty,
            optional: false,
        }
    }
}

/// When `variadic` is set, the last parameter is the rest vector type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub params: Rc<[Type]>,
    pub ret: Type,
    pub variadic: bool,
}

impl FunctionType {
    pub fn fixed_params(&self) -> &[Type] {
        if self.variadic {
            &self.params[..self.params.len().saturating_sub(1)]
        } else {
            &self.params
        }
    }

    /// Element type accepted by the rest parameter
    pub fn rest_element(&self) -> Option<Type> {
        if !self.variadic {
            return None;
        }

        self.params
            .last()
            .map(|rest| rest.element_type().unwrap_or_else(Type::any))
    }
}

impl core::fmt::Debug for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Type").field(&self.0).finish()
    }
}

impl core::ops::Deref for Type {
    type Target = TypeKind;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl Type {
    pub fn new(kind: TypeKind) -> Self {
        Self(Rc::new(kind), private::PrivateZst)
    }

    pub fn any() -> Self {
        Self::new(TypeKind::Any)
    }

    pub fn number() -> Self {
        Self::new(TypeKind::Number)
    }

    pub fn string() -> Self {
        Self::new(TypeKind::String)
    }

    pub fn boolean() -> Self {
        Self::new(TypeKind::Boolean)
    }

    pub fn keyword() -> Self {
        Self::new(TypeKind::Keyword)
    }

    pub fn nil() -> Self {
        Self::new(TypeKind::Nil)
    }

    pub fn never() -> Self {
        Self::new(TypeKind::Never)
    }

    pub fn unknown() -> Self {
        Self::new(TypeKind::Unknown)
    }

    pub fn undefined() -> Self {
        Self::new(TypeKind::Undefined)
    }

    pub fn list(element: Type) -> Self {
        Self::new(TypeKind::List(element))
    }

    pub fn vector(element: Type) -> Self {
        Self::new(TypeKind::Vector(element))
    }

    pub fn tuple(members: impl IntoIterator<Item = Type>) -> Self {
        Self::new(TypeKind::Tuple(members.into_iter().collect()))
    }

    pub fn object(properties: impl IntoIterator<Item = ObjectProperty>) -> Self {
        Self::new(TypeKind::Object(properties.into_iter().collect()))
    }

    pub fn function(params: impl IntoIterator<Item = Type>, ret: Type, variadic: bool) -> Self {
        Self::new(TypeKind::Function(FunctionType {
            params: params.into_iter().collect(),
            ret,
            variadic,
        }))
    }

    pub fn singleton(value: LiteralValue) -> Self {
        Self::new(TypeKind::Singleton(value))
    }

    pub fn not(inner: Type) -> Self {
        Self::new(TypeKind::Not(inner))
    }

    pub fn alias(name: InternedSymbol, base: Type) -> Self {
        Self::new(TypeKind::Alias { name, base })
    }

    pub fn module(name: &str, exports: impl IntoIterator<Item = ObjectProperty>) -> Self {
        Self::new(TypeKind::Module {
            name: Rc::from(name),
            exports: exports.into_iter().collect(),
        })
    }

    /// Follows aliases down to the first non-alias type
    pub fn unalias(&self) -> Type {
        match &**self {
            TypeKind::Alias { base, .. } => base.unalias(),
            _ => self.clone(),
        }
    }

    pub fn as_function(&self) -> Option<FunctionType> {
        match &*self.unalias() {
            TypeKind::Function(function) => Some(function.clone()),
            _ => None,
        }
    }

    /// Element type of a homogeneous sequence
    pub fn element_type(&self) -> Option<Type> {
        match &*self.unalias() {
            TypeKind::List(element) | TypeKind::Vector(element) => Some(element.clone()),
            TypeKind::Any | TypeKind::Undefined => Some(Type::any()),
            _ => None,
        }
    }

    /// Type of the element at a fixed position of a sequence. Out of bounds
    /// tuple positions read as nil.
    pub fn element_type_at(&self, index: usize) -> Option<Type> {
        match &*self.unalias() {
            TypeKind::Tuple(members) => Some(members.get(index).cloned().unwrap_or_else(Type::nil)),
            _ => self.element_type(),
        }
    }

    /// Type of the remainder of a sequence after skipping `index` elements
    pub fn rest_type_from(&self, index: usize) -> Option<Type> {
        match &*self.unalias() {
            TypeKind::Tuple(members) => {
                Some(Type::tuple(members.iter().skip(index).cloned()))
            }
            TypeKind::List(_) | TypeKind::Vector(_) => Some(self.clone()),
            TypeKind::Any | TypeKind::Undefined => Some(Type::vector(Type::any())),
            _ => None,
        }
    }

    /// The object type with some properties removed (record rest patterns)
    pub fn record_without(&self, keys: &[InternedSymbol]) -> Type {
        match &*self.unalias() {
            TypeKind::Object(properties) => Type::object(
                properties
                    .iter()
                    .filter(|property| !keys.contains(&property.name))
                    .cloned(),
            ),
            _ => Type::any(),
        }
    }

    pub fn contains_undefined(&self) -> bool {
        match &**self {
            TypeKind::Undefined => true,
            TypeKind::Alias { base, .. } => base.contains_undefined(),
            TypeKind::List(inner) | TypeKind::Vector(inner) | TypeKind::Not(inner) => {
                inner.contains_undefined()
            }
            TypeKind::Tuple(members)
            | TypeKind::Union(members)
            | TypeKind::Intersection(members) => members.iter().any(Type::contains_undefined),
            TypeKind::Object(properties) | TypeKind::Module { exports: properties, .. } => {
                properties.iter().any(|property| property.ty.contains_undefined())
            }
            TypeKind::Function(function) => {
                function.ret.contains_undefined()
                    || function.params.iter().any(Type::contains_undefined)
            }
            _ => false,
        }
    }

    /// Replaces every `Undefined` placeholder with `Any`
    pub fn widen_undefined(&self) -> Type {
        if !self.contains_undefined() {
            return self.clone();
        }

        let map_properties = |properties: &[ObjectProperty]| {
            properties
                .iter()
                .map(|property| ObjectProperty {
                    ty: property.ty.widen_undefined(),
                    ..property.clone()
                })
                .collect::<Vec<_>>()
        };

        match &**self {
            TypeKind::Undefined => Type::any(),
            TypeKind::Alias { name, base } => Type::alias(*name, base.widen_undefined()),
            TypeKind::List(inner) => Type::list(inner.widen_undefined()),
            TypeKind::Vector(inner) => Type::vector(inner.widen_undefined()),
            TypeKind::Not(inner) => Type::not(inner.widen_undefined()),
            TypeKind::Tuple(members) => Type::tuple(members.iter().map(Type::widen_undefined)),
            TypeKind::Union(members) => {
                Type::new(TypeKind::Union(members.iter().map(Type::widen_undefined).collect()))
            }
            TypeKind::Intersection(members) => Type::new(TypeKind::Intersection(
                members.iter().map(Type::widen_undefined).collect(),
            )),
            TypeKind::Object(properties) => Type::object(map_properties(properties)),
            TypeKind::Module { name, exports } => Type::module(name, map_properties(exports)),
            TypeKind::Function(function) => Type::function(
                function.params.iter().map(Type::widen_undefined),
                function.ret.widen_undefined(),
                function.variadic,
            ),
            _ => self.clone(),
        }
    }

    /// The type for the contents of a plain (non-colored) type description
    pub fn plain(&self) -> String {
        (**self).to_string()
    }
}

impl TypeKind {
    pub fn is_any(&self) -> bool {
        matches!(self, TypeKind::Any)
    }

    pub fn is_never(&self) -> bool {
        matches!(self, TypeKind::Never)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, TypeKind::Undefined)
    }

    pub fn is_boolean(&self) -> bool {
        match self {
            TypeKind::Boolean | TypeKind::Singleton(LiteralValue::Boolean(_)) => true,
            TypeKind::Alias { base, .. } => base.is_boolean(),
            TypeKind::Union(members) => members.iter().all(|member| member.is_boolean()),
            _ => false,
        }
    }

    /// Values of this type are never `nil` or `false`
    pub fn is_truthy(&self) -> bool {
        match self {
            TypeKind::Number
            | TypeKind::String
            | TypeKind::Keyword
            | TypeKind::Vector(_)
            | TypeKind::Tuple(_)
            | TypeKind::Object(_)
            | TypeKind::Function(_)
            | TypeKind::Module { .. } => true,
            TypeKind::Singleton(value) => !matches!(value, LiteralValue::Boolean(false)),
            TypeKind::Alias { base, .. } => base.is_truthy(),
            TypeKind::Union(members) => members.iter().all(|member| member.is_truthy()),
            TypeKind::Intersection(members) => members.iter().any(|member| member.is_truthy()),
            _ => false,
        }
    }

    /// Values of this type are always `nil` or `false`
    pub fn is_falsy(&self) -> bool {
        match self {
            TypeKind::Nil | TypeKind::Singleton(LiteralValue::Boolean(false)) => true,
            TypeKind::Alias { base, .. } => base.is_falsy(),
            TypeKind::Union(members) => members.iter().all(|member| member.is_falsy()),
            TypeKind::Intersection(members) => members.iter().any(|member| member.is_falsy()),
            _ => false,
        }
    }
}

impl LiteralValue {
    pub fn base_type(&self) -> Type {
        match self {
            LiteralValue::Number(_) => Type::number(),
            LiteralValue::String(_) => Type::string(),
            LiteralValue::Boolean(_) => Type::boolean(),
            LiteralValue::Keyword(_) => Type::keyword(),
        }
    }
}

impl core::fmt::Display for TypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let properties = |properties: &[ObjectProperty]| {
            properties
                .iter()
                .map(|property| {
                    let optional = if property.optional { "?" } else { "" };

                    format!(":{}{optional} {}", property.name, *property.ty)
                })
                .join(" ")
        };

        match self {
            Self::Any => write!(f, "any"),
            Self::Number => write!(f, "number"),
            Self::String => write!(f, "string"),
            Self::Boolean => write!(f, "boolean"),
            Self::Keyword => write!(f, "keyword"),
            Self::Nil => write!(f, "nil"),
            Self::Never => write!(f, "never"),
            Self::Unknown => write!(f, "unknown"),
            Self::Undefined => write!(f, "undefined"),
            Self::Alias { name, .. } => write!(f, "{name}"),
            Self::List(element) => write!(f, "(list {})", **element),
            Self::Vector(element) => write!(f, "(vector {})", **element),
            Self::Tuple(members) => {
                write!(f, "(tuple {})", members.iter().map(|ty| ty.plain()).join(" "))
            }
            Self::Object(props) => write!(f, "{{{}}}", properties(props)),
            Self::Function(function) => {
                let fixed = function.fixed_params().iter().map(|ty| ty.plain());
                let rest = function
                    .variadic
                    .then(|| function.params.last())
                    .flatten()
                    .map(|rest| format!("& {}", **rest));

                write!(
                    f,
                    "(fn [{}] {})",
                    fixed.chain(rest).join(" "),
                    *function.ret
                )
            }
            Self::Singleton(value) => write!(f, "{value}"),
            Self::Union(members) => {
                write!(f, "(or {})", members.iter().map(|ty| ty.plain()).join(" "))
            }
            Self::Intersection(members) => {
                write!(f, "(and {})", members.iter().map(|ty| ty.plain()).join(" "))
            }
            Self::Not(inner) => write!(f, "(not {})", **inner),
            Self::Module { name, .. } => write!(f, "(module {name})"),
        }
    }
}

impl core::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.colored().yellow())
    }
}

impl From<Type> for colored::ColoredString {
    fn from(s: Type) -> Self {
        (*s).to_string().into()
    }
}

impl Type {
    pub fn colored(&self) -> colored::ColoredString {
        self.clone().into()
    }
}
