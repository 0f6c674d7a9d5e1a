//! A-normal form. After this pass every operand position (call callee and
//! arguments, operator operands, aggregate members, member objects) holds an
//! atomic node, a literal, symbol, lambda or member chain. Compound operands
//! are bound to fresh constants emitted just before the statement using them.
//!
//! Conditional positions are never hoisted above their test: the prefix of a
//! branch or of the right operand of `and`/`or` stays inside a `do` block in
//! that position. `cond` and `when` are lowered to `if`, and destructuring
//! declarations become one declaration per bound name.

use crate::{
    context::CompilationContext,
    error::CompileResult,
    frontend::{
        ast::{
            Call, Declaration, Function, Node, NodeKind, Param, Pattern, PatternKind, Program,
        },
        intern::InternedSymbol,
        SourceLocation,
    },
    middle::ty::Type,
};

pub fn anf(program: Program, ctx: &mut CompilationContext) -> CompileResult<Program> {
    let mut normalizer = Normalizer { ctx };
    let body = normalizer.block(program.body)?;

    log::trace!("normalized program into {} top-level statements", body.len());

    Ok(Program {
        location: program.location,
        body,
    })
}

/// Statements that must run first, followed by the node producing the value
#[derive(Debug)]
struct Flattened {
    prefix: Vec<Node>,
    tail: Node,
}

impl Flattened {
    fn new(prefix: Vec<Node>, tail: Node) -> Self {
        Self { prefix, tail }
    }
}

/// Which kind of declaration a destructured pattern turns into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binder {
    Variable,
    Constant,
}

struct Normalizer<'ctx> {
    ctx: &'ctx mut CompilationContext,
}

impl<'ctx> Normalizer<'ctx> {
    fn node(&mut self, location: &SourceLocation, kind: NodeKind, ty: Option<Type>) -> Node {
        Node::new(self.ctx.next_node_id(), location.clone(), kind).with_type(ty)
    }

    /// Type for statements, only present in typed programs
    fn statement_type(reference: &Node) -> Option<Type> {
        reference.ty.as_ref().map(|_| Type::nil())
    }

    fn declaration(
        &mut self,
        binder: Binder,
        location: &SourceLocation,
        name: InternedSymbol,
        init: Node,
    ) -> Node {
        let declaration = Declaration {
            target: Pattern {
                location: location.clone(),
                kind: PatternKind::Identifier(name),
            },
            annotation: None,
            init: Box::new(init),
        };

        let ty = Self::statement_type(&declaration.init);
        let kind = match binder {
            Binder::Variable => NodeKind::VariableDeclaration(declaration),
            Binder::Constant => NodeKind::ConstantDeclaration(declaration),
        };

        self.node(location, kind, ty)
    }

    /// Binds `value` to a fresh constant and returns a reference to it
    fn bind_fresh(&mut self, value: Node, prefix: &mut Vec<Node>) -> Node {
        let name = self.ctx.fresh_symbol();
        let location = value.location.clone();
        let ty = value.ty.clone();

        let declaration = self.declaration(Binder::Constant, &location, name, value);
        prefix.push(declaration);

        self.node(&location, NodeKind::Symbol(name), ty)
    }

    fn block(&mut self, body: Vec<Node>) -> CompileResult<Vec<Node>> {
        let mut statements = Vec::with_capacity(body.len());

        for node in body {
            let Flattened { prefix, tail } = self.flatten(node)?;

            statements.extend(prefix);
            statements.push(tail);
        }

        Ok(statements)
    }

    /// Normalizes a node whose value must be atomic
    fn atomize(&mut self, node: Node) -> CompileResult<Flattened> {
        let Flattened { mut prefix, tail } = self.flatten(node)?;

        let tail = if tail.is_atomic() {
            tail
        } else {
            self.bind_fresh(tail, &mut prefix)
        };

        Ok(Flattened::new(prefix, tail))
    }

    /// Atomizes `node`, moving its prefix into `prefix`
    fn operand(&mut self, node: Node, prefix: &mut Vec<Node>) -> CompileResult<Node> {
        let flattened = self.atomize(node)?;

        prefix.extend(flattened.prefix);

        Ok(flattened.tail)
    }

    /// Normalizes a node evaluated conditionally, keeping its prefix in place
    fn nested(&mut self, node: Node) -> CompileResult<Node> {
        let Flattened { mut prefix, tail } = self.flatten(node)?;

        if prefix.is_empty() {
            return Ok(tail);
        }

        let location = tail.location.clone();
        let ty = tail.ty.clone();

        prefix.push(tail);

        Ok(self.node(&location, NodeKind::Do(prefix), ty))
    }

    fn flatten(&mut self, node: Node) -> CompileResult<Flattened> {
        let Node {
            id,
            location,
            ty,
            kind,
        } = node;

        let rebuild = |kind| Node {
            id,
            location: location.clone(),
            ty: ty.clone(),
            kind,
        };

        let mut prefix = Vec::new();

        let kind = match kind {
            NodeKind::Number { .. }
            | NodeKind::String(_)
            | NodeKind::Boolean(_)
            | NodeKind::Keyword(_)
            | NodeKind::Nil
            | NodeKind::Symbol(_)
            | NodeKind::TypeAlias { .. }
            | NodeKind::Import { .. } => kind,
            NodeKind::Call(call) => {
                let callee = self.operand(*call.callee, &mut prefix)?;
                let args = call
                    .args
                    .into_iter()
                    .map(|arg| self.operand(arg, &mut prefix))
                    .collect::<CompileResult<Vec<_>>>()?;

                NodeKind::Call(Call {
                    callee: Box::new(callee),
                    args,
                    ..call
                })
            }
            NodeKind::VariableDeclaration(declaration) => {
                return self.flatten_declaration(
                    Binder::Variable,
                    declaration,
                    rebuild,
                    NodeKind::VariableDeclaration,
                );
            }
            NodeKind::ConstantDeclaration(declaration) => {
                return self.flatten_declaration(
                    Binder::Constant,
                    declaration,
                    rebuild,
                    NodeKind::ConstantDeclaration,
                );
            }
            NodeKind::Set { name, value } => {
                let value = self.flatten(*value)?;

                prefix = value.prefix;

                NodeKind::Set {
                    name,
                    value: Box::new(value.tail),
                }
            }
            NodeKind::Vector(elements) => NodeKind::Vector(
                elements
                    .into_iter()
                    .map(|element| self.operand(element, &mut prefix))
                    .collect::<CompileResult<Vec<_>>>()?,
            ),
            NodeKind::Record(properties) => {
                let mut normalized = Vec::with_capacity(properties.len());

                for mut property in properties {
                    property.value = self.operand(property.value, &mut prefix)?;
                    normalized.push(property);
                }

                NodeKind::Record(normalized)
            }
            NodeKind::Member { object, property } => NodeKind::Member {
                object: Box::new(self.operand(*object, &mut prefix)?),
                property,
            },
            NodeKind::FunctionDeclaration(function) => {
                NodeKind::FunctionDeclaration(self.function(function)?)
            }
            NodeKind::Lambda(function) => NodeKind::Lambda(self.function(function)?),
            NodeKind::As { expression, .. } => {
                let Flattened { prefix, mut tail } = self.flatten(*expression)?;

                // The ascribed type is what the rest of the program saw
                if ty.is_some() {
                    tail.ty = ty.clone();
                }

                return Ok(Flattened::new(prefix, tail));
            }
            NodeKind::Do(body) => NodeKind::Do(self.block(body)?),
            NodeKind::If {
                test,
                then,
                otherwise,
            } => {
                let test = self.test(*test, &mut prefix)?;

                NodeKind::If {
                    test: Box::new(test),
                    then: Box::new(self.nested(*then)?),
                    otherwise: Box::new(self.nested(*otherwise)?),
                }
            }
            NodeKind::Cond(clauses) => {
                let nil_type = ty.as_ref().map(|_| Type::nil());
                let mut lowered = self.node(&location, NodeKind::Nil, nil_type);

                for clause in clauses.into_iter().rev() {
                    lowered = self.node(
                        &clause.test.location.clone(),
                        NodeKind::If {
                            test: Box::new(clause.test),
                            then: Box::new(clause.body),
                            otherwise: Box::new(lowered),
                        },
                        ty.clone(),
                    );
                }

                return self.flatten(lowered);
            }
            NodeKind::When { test, body } => {
                let body_location = body
                    .first()
                    .map(|node| node.location.clone())
                    .unwrap_or_else(|| location.clone());
                let body_type = body.last().and_then(|node| node.ty.clone());

                let then = self.node(&body_location, NodeKind::Do(body), body_type);
                let nil_type = ty.as_ref().map(|_| Type::nil());
                let otherwise = self.node(&location, NodeKind::Nil, nil_type);

                return self.flatten(rebuild(NodeKind::If {
                    test,
                    then: Box::new(then),
                    otherwise: Box::new(otherwise),
                }));
            }
            NodeKind::For {
                target,
                iterable,
                body,
            } => {
                let iterable = self.operand(*iterable, &mut prefix)?;
                let (target, mut statements) = self.simple_target(target, Binder::Constant)?;

                statements.extend(self.block(body)?);

                NodeKind::For {
                    target,
                    iterable: Box::new(iterable),
                    body: statements,
                }
            }
            NodeKind::Binary {
                operator,
                left,
                right,
            } => NodeKind::Binary {
                operator,
                left: Box::new(self.operand(*left, &mut prefix)?),
                right: Box::new(self.operand(*right, &mut prefix)?),
            },
            NodeKind::Logical {
                operator,
                left,
                right,
            } => NodeKind::Logical {
                operator,
                left: Box::new(self.operand(*left, &mut prefix)?),
                right: Box::new(self.nested(*right)?),
            },
            NodeKind::Unary { operator, operand } => NodeKind::Unary {
                operator,
                operand: Box::new(self.operand(*operand, &mut prefix)?),
            },
        };

        Ok(Flattened::new(prefix, rebuild(kind)))
    }

    /// An `if` test may stay a single operation over atomic operands
    fn test(&mut self, test: Node, prefix: &mut Vec<Node>) -> CompileResult<Node> {
        let flattened = self.flatten(test)?;

        prefix.extend(flattened.prefix);

        let simple = flattened.tail.is_atomic()
            || matches!(
                flattened.tail.kind,
                NodeKind::Call(_) | NodeKind::Binary { .. } | NodeKind::Unary { .. }
            );

        Ok(if simple {
            flattened.tail
        } else {
            self.bind_fresh(flattened.tail, prefix)
        })
    }

    fn flatten_declaration(
        &mut self,
        binder: Binder,
        declaration: Declaration,
        rebuild: impl FnOnce(NodeKind) -> Node,
        wrap: fn(Declaration) -> NodeKind,
    ) -> CompileResult<Flattened> {
        if declaration.target.as_identifier().is_some() {
            let Flattened { prefix, tail } = self.flatten(*declaration.init)?;

            return Ok(Flattened::new(
                prefix,
                rebuild(wrap(Declaration {
                    init: Box::new(tail),
                    ..declaration
                })),
            ));
        }

        let Flattened { mut prefix, tail } = self.atomize(*declaration.init)?;
        let mut statements = Vec::new();

        self.destructure(binder, &declaration.target, tail, &mut statements)?;
        prefix.extend(statements);

        // A pattern binding nothing still evaluated its value
        let tail = match prefix.pop() {
            Some(tail) => tail,
            None => {
                let location = declaration.target.location.clone();

                self.node(&location, NodeKind::Nil, None)
            }
        };

        Ok(Flattened::new(prefix, tail))
    }

    /// Declares every name bound by `pattern` from the atomic `value`
    fn destructure(
        &mut self,
        binder: Binder,
        pattern: &Pattern,
        value: Node,
        statements: &mut Vec<Node>,
    ) -> CompileResult<()> {
        let location = pattern.location.clone();

        match &pattern.kind {
            PatternKind::Identifier(name) => {
                let declaration = self.declaration(binder, &location, *name, value);

                statements.push(declaration);
            }
            PatternKind::Vector { elements, rest } => {
                let source = self.named(value, statements);

                for (index, element) in elements.iter().enumerate() {
                    let element_type =
                        source.ty.as_ref().and_then(|ty| ty.element_type_at(index));
                    let position = self.number(&element.location, index);
                    let item = self.intrinsic_call(
                        "#get",
                        &element.location,
                        vec![source.clone(), position],
                        element_type,
                    );

                    self.destructure_item(binder, element, item, statements)?;
                }

                if let Some(rest) = rest {
                    let rest_type = source
                        .ty
                        .as_ref()
                        .and_then(|ty| ty.rest_type_from(elements.len()));
                    let start = self.number(&location, elements.len());
                    let remaining = self.intrinsic_call(
                        "#slice",
                        &location,
                        vec![source.clone(), start],
                        rest_type,
                    );

                    let declaration = self.declaration(binder, &location, *rest, remaining);
                    statements.push(declaration);
                }
            }
            PatternKind::Record { properties, rest } => {
                let source = self.named(value, statements);

                for property in properties {
                    let item = self.node(
                        &property.pattern.location,
                        NodeKind::Member {
                            object: Box::new(source.clone()),
                            property: property.key,
                        },
                        None,
                    );

                    self.destructure_item(binder, &property.pattern, item, statements)?;
                }

                if let Some(rest) = rest {
                    let keys = properties
                        .iter()
                        .map(|property| {
                            self.node(
                                &location,
                                NodeKind::String(property.key.value().to_owned()),
                                None,
                            )
                        })
                        .collect::<Vec<_>>();

                    let keys = self.node(&location, NodeKind::Vector(keys), None);
                    let rest_type = source.ty.as_ref().map(|ty| {
                        ty.record_without(
                            &properties
                                .iter()
                                .map(|property| property.key)
                                .collect::<Vec<_>>(),
                        )
                    });

                    let remaining = self.intrinsic_call(
                        "#omit",
                        &location,
                        vec![source.clone(), keys],
                        rest_type,
                    );
                    let declaration = self.declaration(binder, &location, *rest, remaining);

                    statements.push(declaration);
                }
            }
        }

        Ok(())
    }

    /// Nested patterns read their part into a fresh constant first
    fn destructure_item(
        &mut self,
        binder: Binder,
        pattern: &Pattern,
        item: Node,
        statements: &mut Vec<Node>,
    ) -> CompileResult<()> {
        match pattern.kind {
            PatternKind::Identifier(_) => self.destructure(binder, pattern, item, statements),
            _ => {
                let source = self.bind_fresh(item, statements);

                self.destructure(binder, pattern, source, statements)
            }
        }
    }

    /// Makes sure `value` can be read more than once
    fn named(&mut self, value: Node, statements: &mut Vec<Node>) -> Node {
        match value.kind {
            NodeKind::Symbol(_) => value,
            _ => self.bind_fresh(value, statements),
        }
    }

    fn number(&mut self, location: &SourceLocation, value: usize) -> Node {
        self.node(
            location,
            NodeKind::Number {
                text: value.to_string(),
                value: value as f64,
            },
            Some(Type::number()),
        )
    }

    fn intrinsic_call(
        &mut self,
        name: &str,
        location: &SourceLocation,
        args: Vec<Node>,
        ty: Option<Type>,
    ) -> Node {
        let callee = self.node(location, NodeKind::Symbol(InternedSymbol::new(name)), None);

        self.node(
            location,
            NodeKind::Call(Call {
                callee: Box::new(callee),
                args,
                application: Default::default(),
                is_tail_rec: false,
            }),
            ty,
        )
    }

    /// Replaces a destructuring binder with a fresh name, returning the
    /// declarations that unpack it
    fn simple_target(
        &mut self,
        target: Pattern,
        binder: Binder,
    ) -> CompileResult<(Pattern, Vec<Node>)> {
        if target.as_identifier().is_some() {
            return Ok((target, Vec::new()));
        }

        let name = self.ctx.fresh_symbol();
        let source = self.node(&target.location, NodeKind::Symbol(name), None);
        let mut statements = Vec::new();

        self.destructure(binder, &target, source, &mut statements)?;

        Ok((
            Pattern {
                location: target.location,
                kind: PatternKind::Identifier(name),
            },
            statements,
        ))
    }

    fn function(&mut self, function: Function) -> CompileResult<Function> {
        let mut unpacking = Vec::new();
        let mut params = Vec::with_capacity(function.params.len());

        for param in function.params {
            let (target, statements) = self.simple_target(param.target, Binder::Variable)?;

            unpacking.extend(statements);
            params.push(Param { target, ..param });
        }

        unpacking.extend(self.block(function.body)?);

        Ok(Function {
            params,
            body: unpacking,
            ..function
        })
    }
}
