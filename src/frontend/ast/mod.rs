use std::hash::{Hash, Hasher};

use super::{intern::InternedSymbol, SourceLocation};
use crate::{index::simple_index, middle::ty::Type};

pub mod pretty;
pub mod visit;

simple_index! {
    /// Unique (per compilation) identity of a node, used to key side tables
    pub struct NodeId;
}

#[derive(Debug, Clone)]
pub struct Program {
    /// Location of the first top-level form, or the start of the file
    pub location: SourceLocation,
    pub body: Vec<Node>,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub location: SourceLocation,
    /// Filled in by the type checker
    pub ty: Option<Type>,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(id: NodeId, location: SourceLocation, kind: NodeKind) -> Self {
        Self {
            id,
            location,
            ty: None,
            kind,
        }
    }

    pub fn with_type(mut self, ty: Option<Type>) -> Self {
        self.ty = ty;
        self
    }

    /// Literals, symbols, lambdas and member chains rooted at an atomic value
    /// can appear in any operand position without being named first
    pub fn is_atomic(&self) -> bool {
        match &self.kind {
            NodeKind::Number { .. }
            | NodeKind::String(_)
            | NodeKind::Boolean(_)
            | NodeKind::Keyword(_)
            | NodeKind::Nil
            | NodeKind::Symbol(_)
            | NodeKind::Lambda(_) => true,
            NodeKind::Member { object, .. } => object.is_atomic(),
            _ => false,
        }
    }

    pub fn as_symbol(&self) -> Option<InternedSymbol> {
        match &self.kind {
            NodeKind::Symbol(symbol) => Some(*symbol),
            _ => None,
        }
    }

    pub fn as_call(&self) -> Option<&Call> {
        match &self.kind {
            NodeKind::Call(call) => Some(call),
            _ => None,
        }
    }

    pub fn literal_value(&self) -> Option<LiteralValue> {
        Some(match &self.kind {
            NodeKind::Number { value, .. } => LiteralValue::Number(*value),
            NodeKind::String(value) => LiteralValue::String(value.clone()),
            NodeKind::Boolean(value) => LiteralValue::Boolean(*value),
            NodeKind::Keyword(value) => LiteralValue::Keyword(*value),
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    /* Literals */
    Number { text: String, value: f64 },
    String(String),
    Boolean(bool),
    /// Keyword name, including the leading colon
    Keyword(InternedSymbol),
    Nil,

    Symbol(InternedSymbol),
    Call(Call),

    /* Bindings */
    VariableDeclaration(Declaration),
    ConstantDeclaration(Declaration),
    Set {
        name: InternedSymbol,
        value: Box<Node>,
    },
    TypeAlias {
        name: InternedSymbol,
        annotation: TypeExpr,
    },
    Import {
        name: String,
        alias: InternedSymbol,
    },

    /* Aggregates */
    Vector(Vec<Node>),
    Record(Vec<Property>),
    Member {
        object: Box<Node>,
        property: InternedSymbol,
    },

    /* Functions */
    FunctionDeclaration(Function),
    Lambda(Function),

    As {
        annotation: TypeExpr,
        expression: Box<Node>,
    },

    /* Control flow */
    Do(Vec<Node>),
    If {
        test: Box<Node>,
        then: Box<Node>,
        otherwise: Box<Node>,
    },
    Cond(Vec<CondClause>),
    When {
        test: Box<Node>,
        body: Vec<Node>,
    },
    For {
        target: Pattern,
        iterable: Box<Node>,
        body: Vec<Node>,
    },

    /* Operators */
    Binary {
        operator: BinaryOperator,
        left: Box<Node>,
        right: Box<Node>,
    },
    Logical {
        operator: LogicalOperator,
        left: Box<Node>,
        right: Box<Node>,
    },
    Unary {
        operator: UnaryOperator,
        operand: Box<Node>,
    },
}

#[derive(Debug, Clone)]
pub struct Call {
    pub callee: Box<Node>,
    pub args: Vec<Node>,
    pub application: Application,
    /// Set on self calls in tail position of the enclosing function
    pub is_tail_rec: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Application {
    #[default]
    Full,
    /// Fewer arguments than fixed parameters; the call evaluates to a closure
    /// over the remaining ones
    Partial { remaining: usize },
}

#[derive(Debug, Clone)]
pub struct Declaration {
    pub target: Pattern,
    pub annotation: Option<TypeExpr>,
    pub init: Box<Node>,
}

#[derive(Debug, Clone)]
pub struct Property {
    pub location: SourceLocation,
    /// Property name without the leading colon
    pub key: InternedSymbol,
    pub value: Node,
}

#[derive(Debug, Clone)]
pub struct CondClause {
    pub test: Node,
    pub body: Node,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: Option<InternedSymbol>,
    pub params: Vec<Param>,
    pub return_annotation: Option<TypeExpr>,
    pub body: Vec<Node>,
    pub is_tail_recursive: bool,
}

impl Function {
    pub fn rest_param(&self) -> Option<&Param> {
        self.params.last().filter(|param| param.is_rest)
    }

    pub fn fixed_params(&self) -> &[Param] {
        match self.rest_param() {
            Some(_) => &self.params[..self.params.len() - 1],
            None => &self.params,
        }
    }

    pub fn is_annotated(&self) -> bool {
        self.return_annotation.is_some() || self.params.iter().any(|p| p.annotation.is_some())
    }
}

#[derive(Debug, Clone)]
pub struct Param {
    pub location: SourceLocation,
    pub target: Pattern,
    pub annotation: Option<TypeExpr>,
    pub is_rest: bool,
}

#[derive(Debug, Clone)]
pub struct Pattern {
    pub location: SourceLocation,
    pub kind: PatternKind,
}

#[derive(Debug, Clone)]
pub enum PatternKind {
    Identifier(InternedSymbol),
    Vector {
        elements: Vec<Pattern>,
        rest: Option<InternedSymbol>,
    },
    Record {
        properties: Vec<PropertyPattern>,
        rest: Option<InternedSymbol>,
    },
}

impl Pattern {
    pub fn as_identifier(&self) -> Option<InternedSymbol> {
        match self.kind {
            PatternKind::Identifier(name) => Some(name),
            _ => None,
        }
    }

    /// Every name this pattern binds, in source order
    pub fn bound_names(&self) -> Vec<InternedSymbol> {
        let mut names = Vec::new();

        self.collect_names(&mut names);

        names
    }

    fn collect_names(&self, names: &mut Vec<InternedSymbol>) {
        match &self.kind {
            PatternKind::Identifier(name) => names.push(*name),
            PatternKind::Vector { elements, rest } => {
                elements.iter().for_each(|element| element.collect_names(names));
                names.extend(rest);
            }
            PatternKind::Record { properties, rest } => {
                properties
                    .iter()
                    .for_each(|property| property.pattern.collect_names(names));
                names.extend(rest);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct PropertyPattern {
    pub key: InternedSymbol,
    pub pattern: Pattern,
}

#[derive(Debug, Clone)]
pub struct TypeExpr {
    pub location: SourceLocation,
    pub kind: TypeExprKind,
}

#[derive(Debug, Clone)]
pub enum TypeExprKind {
    /// Primitive type name or alias
    Named(InternedSymbol),
    List(Box<TypeExpr>),
    Vector(Box<TypeExpr>),
    Tuple(Vec<TypeExpr>),
    Object(Vec<PropertyTypeExpr>),
    Function {
        params: Vec<TypeExpr>,
        rest: Option<Box<TypeExpr>>,
        ret: Box<TypeExpr>,
    },
    Union(Vec<TypeExpr>),
    Intersection(Vec<TypeExpr>),
    Not(Box<TypeExpr>),
    Literal(LiteralValue),
}

#[derive(Debug, Clone)]
pub struct PropertyTypeExpr {
    pub key: InternedSymbol,
    pub optional: bool,
    pub ty: TypeExpr,
}

/// The value of a literal, pinned by singleton types
#[derive(Debug, Clone)]
pub enum LiteralValue {
    Number(f64),
    String(String),
    Boolean(bool),
    Keyword(InternedSymbol),
}

impl PartialEq for LiteralValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.to_bits() == b.to_bits(),
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Keyword(a), Self::Keyword(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for LiteralValue {}

impl Hash for LiteralValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);

        match self {
            Self::Number(value) => value.to_bits().hash(state),
            Self::String(value) => value.hash(state),
            Self::Boolean(value) => value.hash(state),
            Self::Keyword(value) => value.hash(state),
        }
    }
}

impl core::fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "{value:?}"),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Keyword(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
pub enum BinaryOperator {
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "<")]
    LessThan,
    #[strum(serialize = ">")]
    GreaterThan,
    #[strum(serialize = "<=")]
    LessThanOrEqualTo,
    #[strum(serialize = ">=")]
    GreaterThanOrEqualTo,
}

impl BinaryOperator {
    pub fn is_equality(&self) -> bool {
        matches!(self, Self::Equal | Self::NotEqual)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum LogicalOperator {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum UnaryOperator {
    Not,
    Typeof,
}

/// List heads with dedicated syntax (operators are parsed separately)
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SpecialForm {
    Let,
    Const,
    #[strum(serialize = "set!")]
    Set,
    Do,
    If,
    Cond,
    When,
    Fn,
    Defn,
    Type,
    As,
    For,
    Import,
}
