use std::str::FromStr;

use hashbrown::HashSet;

use super::{
    ast::{
        BinaryOperator, Call, CondClause, Declaration, Function, LogicalOperator,
        Node, NodeKind, Param, Pattern, PatternKind, Program, Property, PropertyPattern,
        PropertyTypeExpr, SpecialForm, TypeExpr, TypeExprKind, UnaryOperator,
    },
    intern::InternedSymbol,
    lexer::{tokenize, Token, TokenKind},
    reader::{read, Delimiter, List, SExpr},
    SourceLocation,
};
use crate::{
    context::CompilationContext,
    error::{syntax_error, CompileResult},
};

/// Builds the AST for every top-level form, registering each identifier with
/// the context's namespace along the way
pub fn parse(forms: &[SExpr], ctx: &mut CompilationContext) -> CompileResult<Program> {
    let mut parser = Parser { ctx, nesting: 0 };

    let body = forms
        .iter()
        .map(|form| parser.parse_form(form))
        .collect::<CompileResult<Vec<_>>>()?;

    ensure_unique(block_declarations(&body))?;

    let location = body
        .first()
        .map(|node| node.location.clone())
        .unwrap_or_else(|| SourceLocation::start_of("<synthetic>".into()));

    log::trace!("parsed {} top-level nodes", body.len());

    Ok(Program { location, body })
}

/// Parses a standalone type annotation such as `(fn [number number] number)`
pub fn parse_type_signature(
    source: &str,
    file: &str,
    ctx: &mut CompilationContext,
) -> CompileResult<TypeExpr> {
    let tokens = tokenize(source, file)?;
    let forms = read(&tokens)?;

    let [form] = forms.as_slice() else {
        return Err(syntax_error!(
            SourceLocation::start_of(file.into()),
            "Expected exactly one type, found {} forms",
            forms.len()
        ));
    };

    Parser { ctx, nesting: 0 }.parse_type(form)
}

struct Parser<'ctx> {
    ctx: &'ctx mut CompilationContext,
    /// How many forms enclose the one being parsed, top-level forms are at 1
    nesting: usize,
}

/// Names a statement declares in the block it appears in
fn declared_names(node: &Node) -> Vec<InternedSymbol> {
    match &node.kind {
        NodeKind::VariableDeclaration(declaration)
        | NodeKind::ConstantDeclaration(declaration) => declaration.target.bound_names(),
        NodeKind::FunctionDeclaration(function) => function.name.into_iter().collect(),
        NodeKind::Import { alias, .. } => vec![*alias],
        _ => Vec::new(),
    }
}

fn block_declarations(body: &[Node]) -> impl Iterator<Item = (InternedSymbol, &SourceLocation)> {
    body.iter().flat_map(|node| {
        declared_names(node)
            .into_iter()
            .map(move |name| (name, &node.location))
    })
}

fn pattern_declarations(pattern: &Pattern) -> impl Iterator<Item = (InternedSymbol, &SourceLocation)> {
    pattern
        .bound_names()
        .into_iter()
        .map(move |name| (name, &pattern.location))
}

/// A block can declare each name once, since the generated module declares
/// them with `let`/`const` in one JavaScript block
fn ensure_unique<'a>(
    declarations: impl IntoIterator<Item = (InternedSymbol, &'a SourceLocation)>,
) -> CompileResult<()> {
    let mut seen = HashSet::new();

    for (name, location) in declarations {
        if !seen.insert(name) {
            return Err(syntax_error!(
                location.clone(),
                "`{name}` is already declared in this scope"
            ));
        }
    }

    Ok(())
}

/// Parses the contents of a string token (including its quotes)
pub fn unescape(text: &str) -> String {
    let inner = text
        .strip_prefix('"')
        .and_then(|text| text.strip_suffix('"'))
        .unwrap_or(text);

    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            value.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => value.push('\n'),
            Some('t') => value.push('\t'),
            Some('r') => value.push('\r'),
            Some(other) => value.push(other),
            None => {}
        }
    }

    value
}

impl<'ctx> Parser<'ctx> {
    fn node(&mut self, location: &SourceLocation, kind: NodeKind) -> Node {
        Node::new(self.ctx.next_node_id(), location.clone(), kind)
    }

    fn symbol(&mut self, name: &str) -> InternedSymbol {
        let symbol = InternedSymbol::new(name);

        self.ctx.namespace.register(symbol);

        symbol
    }

    fn parse_form(&mut self, form: &SExpr) -> CompileResult<Node> {
        self.nesting += 1;

        let node = match form {
            SExpr::Atom(token) => self.parse_atom(token),
            SExpr::List(list) => self.parse_list(list),
        };

        self.nesting -= 1;
        node
    }

    fn parse_body(&mut self, forms: &[&SExpr]) -> CompileResult<Vec<Node>> {
        forms.iter().map(|form| self.parse_form(form)).collect()
    }

    /// Parses the statements of a block
    fn parse_block(&mut self, forms: &[&SExpr]) -> CompileResult<Vec<Node>> {
        let body = self.parse_body(forms)?;

        ensure_unique(block_declarations(&body))?;

        Ok(body)
    }

    fn parse_atom(&mut self, token: &Token) -> CompileResult<Node> {
        let kind = match token.kind {
            TokenKind::Number => {
                let value = token.text.parse::<f64>().map_err(|_| {
                    syntax_error!(
                        token.location.clone(),
                        "Invalid numeric literal `{}`",
                        token.text
                    )
                })?;

                NodeKind::Number {
                    text: token.text.clone(),
                    value,
                }
            }
            TokenKind::String => NodeKind::String(unescape(&token.text)),
            TokenKind::Boolean => NodeKind::Boolean(token.text == "true"),
            TokenKind::Keyword => NodeKind::Keyword(InternedSymbol::new(&token.text)),
            TokenKind::Nil => NodeKind::Nil,
            TokenKind::Symbol => return self.parse_symbol(token),
            kind => {
                return Err(syntax_error!(
                    token.location.clone(),
                    "Unexpected {kind} `{}` where an expression was expected",
                    token.text
                ))
            }
        };

        Ok(self.node(&token.location, kind))
    }

    /// Plain symbols, or `a.b.c` member chains rooted at a symbol
    fn parse_symbol(&mut self, token: &Token) -> CompileResult<Node> {
        let mut segments = token.text.split('.');
        let root = segments.next().unwrap_or_default();

        if root.is_empty() {
            return Err(syntax_error!(
                token.location.clone(),
                "Member access `{}` needs an object",
                token.text
            ));
        }

        let root = self.symbol(root);
        let mut node = self.node(&token.location, NodeKind::Symbol(root));

        for segment in segments {
            if segment.is_empty() {
                return Err(syntax_error!(
                    token.location.clone(),
                    "Empty property name in member access `{}`",
                    token.text
                ));
            }

            let property = InternedSymbol::new(segment);

            node = self.node(
                &token.location,
                NodeKind::Member {
                    object: Box::new(node),
                    property,
                },
            );
        }

        Ok(node)
    }

    fn parse_list(&mut self, list: &List) -> CompileResult<Node> {
        if let Some(tail) = list.improper_tail() {
            return Err(syntax_error!(
                tail.location().clone(),
                "Dotted pairs are not valid in expressions"
            ));
        }

        let items = list.iter().collect::<Vec<_>>();

        match list.delimiter {
            Delimiter::Bracket => {
                let elements = self.parse_body(&items)?;

                Ok(self.node(&list.location, NodeKind::Vector(elements)))
            }
            Delimiter::Brace => self.parse_record(list, &items),
            Delimiter::Paren => self.parse_paren_form(list, &items),
        }
    }

    fn parse_record(&mut self, list: &List, items: &[&SExpr]) -> CompileResult<Node> {
        if items.len() % 2 != 0 {
            return Err(syntax_error!(
                list.location.clone(),
                "Expected `{{:key value ...}}` record literal, found an odd number of forms"
            ));
        }

        let mut properties = Vec::with_capacity(items.len() / 2);

        for pair in items.chunks(2) {
            let key = self.expect_keyword(pair[0], "record literal")?;
            let value = self.parse_form(pair[1])?;

            properties.push(Property {
                location: pair[0].location().clone(),
                key,
                value,
            });
        }

        Ok(self.node(&list.location, NodeKind::Record(properties)))
    }

    fn parse_paren_form(&mut self, list: &List, items: &[&SExpr]) -> CompileResult<Node> {
        let (head, operands) = match items.split_first() {
            Some((head, operands)) => (*head, operands),
            None => return Ok(self.node(&list.location, NodeKind::Nil)),
        };

        if let Some(token) = head.as_atom().filter(|token| token.is(TokenKind::Symbol)) {
            let name = token.text.as_str();

            if let Ok(form) = SpecialForm::from_str(name) {
                return self.parse_special_form(form, list, operands);
            }

            if let Ok(operator) = BinaryOperator::from_str(name) {
                let [left, right] = self.expect_operands::<2>(list, operands, name)?;
                let kind = NodeKind::Binary {
                    operator,
                    left: Box::new(self.parse_form(left)?),
                    right: Box::new(self.parse_form(right)?),
                };

                return Ok(self.node(&list.location, kind));
            }

            if let Ok(operator) = LogicalOperator::from_str(name) {
                return self.parse_logical(list, operator, operands);
            }

            if let Ok(operator) = UnaryOperator::from_str(name) {
                let [operand] = self.expect_operands::<1>(list, operands, name)?;
                let kind = NodeKind::Unary {
                    operator,
                    operand: Box::new(self.parse_form(operand)?),
                };

                return Ok(self.node(&list.location, kind));
            }
        }

        let callee = self.parse_form(head)?;
        let args = self.parse_body(operands)?;

        Ok(self.node(
            &list.location,
            NodeKind::Call(Call {
                callee: Box::new(callee),
                args,
                application: Default::default(),
                is_tail_rec: false,
            }),
        ))
    }

    fn expect_operands<'a, const N: usize>(
        &self,
        list: &List,
        operands: &[&'a SExpr],
        construct: &str,
    ) -> CompileResult<[&'a SExpr; N]> {
        <[&SExpr; N]>::try_from(operands).map_err(|_| {
            syntax_error!(
                list.location.clone(),
                "Expected {N} operand(s) for `{construct}`, found {}",
                operands.len()
            )
        })
    }

    fn expect_symbol(&mut self, form: &SExpr, construct: &str) -> CompileResult<InternedSymbol> {
        match form.as_atom() {
            Some(token) if token.is(TokenKind::Symbol) && !token.text.contains('.') => {
                Ok(self.symbol(&token.text))
            }
            _ => Err(syntax_error!(
                form.location().clone(),
                "Expected a name in {construct}, found {}",
                form.describe()
            )),
        }
    }

    /// Keyword name with the leading colon stripped
    fn expect_keyword(&mut self, form: &SExpr, construct: &str) -> CompileResult<InternedSymbol> {
        match form.as_atom() {
            Some(token) if token.is(TokenKind::Keyword) => {
                Ok(InternedSymbol::new(&token.text[1..]))
            }
            _ => Err(syntax_error!(
                form.location().clone(),
                "Expected a `:key` in {construct}, found {}",
                form.describe()
            )),
        }
    }

    fn parse_logical(
        &mut self,
        list: &List,
        operator: LogicalOperator,
        operands: &[&SExpr],
    ) -> CompileResult<Node> {
        if operands.len() < 2 {
            return Err(syntax_error!(
                list.location.clone(),
                "Expected at least 2 operands for `{operator}`, found {}",
                operands.len()
            ));
        }

        let mut operands = operands.iter();
        let mut node = match operands.next() {
            Some(first) => self.parse_form(first)?,
            None => return Ok(self.node(&list.location, NodeKind::Nil)),
        };

        for operand in operands {
            let right = self.parse_form(operand)?;

            node = self.node(
                &list.location,
                NodeKind::Logical {
                    operator,
                    left: Box::new(node),
                    right: Box::new(right),
                },
            );
        }

        Ok(node)
    }

    fn parse_special_form(
        &mut self,
        form: SpecialForm,
        list: &List,
        operands: &[&SExpr],
    ) -> CompileResult<Node> {
        let location = &list.location;

        let kind = match form {
            SpecialForm::Let | SpecialForm::Const => {
                let declaration = self.parse_declaration(list, form, operands)?;

                if form == SpecialForm::Let {
                    NodeKind::VariableDeclaration(declaration)
                } else {
                    NodeKind::ConstantDeclaration(declaration)
                }
            }
            SpecialForm::Set => {
                let [name, value] = self.expect_operands::<2>(list, operands, "set!")?;

                NodeKind::Set {
                    name: self.expect_symbol(name, "`(set! name value)`")?,
                    value: Box::new(self.parse_form(value)?),
                }
            }
            SpecialForm::Do => NodeKind::Do(self.parse_block(operands)?),
            SpecialForm::If => {
                let [test, then, otherwise] = self.expect_operands::<3>(list, operands, "if")?;

                NodeKind::If {
                    test: Box::new(self.parse_form(test)?),
                    then: Box::new(self.parse_form(then)?),
                    otherwise: Box::new(self.parse_form(otherwise)?),
                }
            }
            SpecialForm::Cond => {
                if operands.is_empty() || operands.len() % 2 != 0 {
                    return Err(syntax_error!(
                        location.clone(),
                        "Expected `(cond test expr ...)` with test/expression pairs, found {} operand(s)",
                        operands.len()
                    ));
                }

                let clauses = operands
                    .chunks(2)
                    .map(|pair| {
                        Ok(CondClause {
                            test: self.parse_form(pair[0])?,
                            body: self.parse_form(pair[1])?,
                        })
                    })
                    .collect::<CompileResult<Vec<_>>>()?;

                NodeKind::Cond(clauses)
            }
            SpecialForm::When => {
                let Some((test, body)) = operands.split_first() else {
                    return Err(syntax_error!(
                        location.clone(),
                        "Expected `(when test body...)`, found no test"
                    ));
                };

                NodeKind::When {
                    test: Box::new(self.parse_form(test)?),
                    body: self.parse_block(body)?,
                }
            }
            SpecialForm::Fn => {
                let named = operands
                    .first()
                    .is_some_and(|first| first.is_atom_kind(TokenKind::Symbol));

                let (name, rest) = if named {
                    (
                        Some(self.expect_symbol(operands[0], "`(fn name [params] body...)`")?),
                        &operands[1..],
                    )
                } else {
                    (None, operands)
                };

                NodeKind::Lambda(self.parse_function(list, name, rest, "fn")?)
            }
            SpecialForm::Defn => {
                let Some((name, rest)) = operands.split_first() else {
                    return Err(syntax_error!(
                        location.clone(),
                        "Expected `(defn name [params] body...)`, found no name"
                    ));
                };

                let name = self.expect_symbol(name, "`(defn name [params] body...)`")?;

                NodeKind::FunctionDeclaration(self.parse_function(list, Some(name), rest, "defn")?)
            }
            SpecialForm::Type => {
                let [name, annotation] = self.expect_operands::<2>(list, operands, "type")?;

                NodeKind::TypeAlias {
                    name: self.expect_symbol(name, "`(type Name T)`")?,
                    annotation: self.parse_type(annotation)?,
                }
            }
            SpecialForm::As => {
                let [annotation, expression] = self.expect_operands::<2>(list, operands, "as")?;

                NodeKind::As {
                    annotation: self.parse_type(annotation)?,
                    expression: Box::new(self.parse_form(expression)?),
                }
            }
            SpecialForm::For => {
                let binding = operands
                    .first()
                    .and_then(|first| first.as_list())
                    .filter(|binding| binding.delimiter == Delimiter::Bracket && binding.len() == 2);

                let Some(binding) = binding else {
                    return Err(syntax_error!(
                        location.clone(),
                        "Expected `(for [target iterable] body...)`"
                    ));
                };

                let mut binding = binding.iter();
                let (Some(target), Some(iterable)) = (binding.next(), binding.next()) else {
                    return Err(syntax_error!(
                        location.clone(),
                        "Expected `(for [target iterable] body...)`"
                    ));
                };

                let target = self.parse_pattern(target)?;
                let iterable = Box::new(self.parse_form(iterable)?);
                let body = self.parse_body(&operands[1..])?;

                // Destructured targets are declared inside the loop body
                ensure_unique(pattern_declarations(&target).chain(block_declarations(&body)))?;

                NodeKind::For {
                    target,
                    iterable,
                    body,
                }
            }
            SpecialForm::Import => self.parse_import(list, operands)?,
        };

        Ok(self.node(location, kind))
    }

    fn parse_declaration(
        &mut self,
        list: &List,
        form: SpecialForm,
        operands: &[&SExpr],
    ) -> CompileResult<Declaration> {
        let (target, annotation, init) = match operands {
            [target, init] => (target, None, init),
            [target, colon, annotation, init] if colon.is_atom_kind(TokenKind::Colon) => {
                (target, Some(self.parse_type(annotation)?), init)
            }
            _ => {
                return Err(syntax_error!(
                    list.location.clone(),
                    "Expected `({form} target [: type] value)`, found {} operand(s)",
                    operands.len()
                ))
            }
        };

        Ok(Declaration {
            target: self.parse_pattern(target)?,
            annotation,
            init: Box::new(self.parse_form(init)?),
        })
    }

    fn parse_import(&mut self, list: &List, operands: &[&SExpr]) -> CompileResult<NodeKind> {
        let usage = "`(import name [:as alias])`";

        if self.nesting > 1 {
            return Err(syntax_error!(
                list.location.clone(),
                "{usage} is only allowed at the top level"
            ));
        }

        let (name, alias) = match operands {
            [name] => (name, None),
            [name, as_keyword, alias]
                if as_keyword
                    .as_atom()
                    .is_some_and(|token| token.is(TokenKind::Keyword) && token.text == ":as") =>
            {
                (name, Some(self.expect_symbol(alias, usage)?))
            }
            _ => {
                return Err(syntax_error!(
                    list.location.clone(),
                    "Expected {usage}, found {} operand(s)",
                    operands.len()
                ))
            }
        };

        let name = match name.as_atom() {
            Some(token) if token.is(TokenKind::Symbol) => token.text.clone(),
            Some(token) if token.is(TokenKind::String) => unescape(&token.text),
            _ => {
                return Err(syntax_error!(
                    name.location().clone(),
                    "Expected a module name in {usage}, found {}",
                    name.describe()
                ))
            }
        };

        let alias = match alias {
            Some(alias) => alias,
            None => {
                let last_segment = name.rsplit('/').next().unwrap_or(&name).to_owned();

                self.symbol(&last_segment)
            }
        };

        Ok(NodeKind::Import { name, alias })
    }

    fn parse_function(
        &mut self,
        list: &List,
        name: Option<InternedSymbol>,
        operands: &[&SExpr],
        construct: &str,
    ) -> CompileResult<Function> {
        let usage = match construct {
            "defn" => "`(defn name [params] [: type] body...)`",
            _ => "`(fn [name] [params] [: type] body...)`",
        };

        let Some((params, rest)) = operands.split_first() else {
            return Err(syntax_error!(
                list.location.clone(),
                "Expected {usage}, found no parameter list"
            ));
        };

        let params = match params.as_list() {
            Some(params) if params.delimiter == Delimiter::Bracket => self.parse_params(params)?,
            _ => {
                return Err(syntax_error!(
                    params.location().clone(),
                    "Expected a `[params]` vector in {usage}, found {}",
                    params.describe()
                ))
            }
        };

        let (return_annotation, body) = match rest {
            [colon, annotation, body @ ..] if colon.is_atom_kind(TokenKind::Colon) => {
                (Some(self.parse_type(annotation)?), body)
            }
            body => (None, body),
        };

        if body.is_empty() {
            return Err(syntax_error!(
                list.location.clone(),
                "Expected at least one body form in {usage}"
            ));
        }

        let body = self.parse_body(body)?;

        // Parameters share the body's scope
        ensure_unique(
            params
                .iter()
                .flat_map(|param| pattern_declarations(&param.target))
                .chain(block_declarations(&body)),
        )?;

        Ok(Function {
            name,
            params,
            return_annotation,
            body,
            is_tail_recursive: false,
        })
    }

    fn parse_params(&mut self, list: &List) -> CompileResult<Vec<Param>> {
        let items = list.iter().collect::<Vec<_>>();
        let mut params = Vec::new();
        let mut index = 0;

        while index < items.len() {
            let is_rest = items[index].is_symbol("&");

            if is_rest {
                index += 1;
            }

            let Some(target) = items.get(index) else {
                return Err(syntax_error!(
                    list.location.clone(),
                    "Expected a rest parameter after `&`"
                ));
            };

            let target = self.parse_pattern(target)?;
            let location = target.location.clone();

            index += 1;

            let annotation = if items
                .get(index)
                .is_some_and(|item| item.is_atom_kind(TokenKind::Colon))
            {
                let Some(annotation) = items.get(index + 1) else {
                    return Err(syntax_error!(
                        items[index].location().clone(),
                        "Expected a type after `:` in parameter list"
                    ));
                };

                index += 2;
                Some(self.parse_type(annotation)?)
            } else {
                None
            };

            if is_rest && index < items.len() {
                return Err(syntax_error!(
                    location,
                    "The rest parameter must be the last parameter"
                ));
            }

            params.push(Param {
                location,
                target,
                annotation,
                is_rest,
            });
        }

        Ok(params)
    }

    fn parse_pattern(&mut self, form: &SExpr) -> CompileResult<Pattern> {
        let location = form.location().clone();

        let kind = match form {
            SExpr::Atom(_) => PatternKind::Identifier(self.expect_symbol(form, "a binding pattern")?),
            SExpr::List(list) if list.delimiter == Delimiter::Bracket => {
                let (elements, rest) = self.split_rest(list)?;
                let elements = elements
                    .into_iter()
                    .map(|element| self.parse_pattern(element))
                    .collect::<CompileResult<Vec<_>>>()?;

                PatternKind::Vector { elements, rest }
            }
            SExpr::List(list) if list.delimiter == Delimiter::Brace => {
                let (members, rest) = self.split_rest(list)?;
                let mut properties = Vec::new();
                let mut members = members.into_iter();

                while let Some(member) = members.next() {
                    if member.is_atom_kind(TokenKind::Keyword) {
                        let key = self.expect_keyword(member, "a record pattern")?;
                        let Some(pattern) = members.next() else {
                            return Err(syntax_error!(
                                member.location().clone(),
                                "Expected a pattern after `{}` in record pattern",
                                key
                            ));
                        };

                        properties.push(PropertyPattern {
                            key,
                            pattern: self.parse_pattern(pattern)?,
                        });
                    } else {
                        let name = self.expect_symbol(member, "a record pattern")?;

                        properties.push(PropertyPattern {
                            key: name,
                            pattern: Pattern {
                                location: member.location().clone(),
                                kind: PatternKind::Identifier(name),
                            },
                        });
                    }
                }

                PatternKind::Record { properties, rest }
            }
            _ => {
                return Err(syntax_error!(
                    location,
                    "Expected a symbol, `[vector]` or `{{record}}` pattern, found {}",
                    form.describe()
                ))
            }
        };

        Ok(Pattern { location, kind })
    }

    /// Splits off a trailing `& name` from a destructuring pattern
    fn split_rest<'a>(
        &mut self,
        list: &'a List,
    ) -> CompileResult<(Vec<&'a SExpr>, Option<InternedSymbol>)> {
        let mut members = list.iter().collect::<Vec<_>>();

        let Some(position) = members.iter().position(|member| member.is_symbol("&")) else {
            return Ok((members, None));
        };

        if position + 2 != members.len() {
            return Err(syntax_error!(
                members[position].location().clone(),
                "Expected exactly one name after `&`, as the last member of the pattern"
            ));
        }

        let rest = self.expect_symbol(members[position + 1], "a rest pattern")?;

        members.truncate(position);

        Ok((members, Some(rest)))
    }

    fn parse_type(&mut self, form: &SExpr) -> CompileResult<TypeExpr> {
        let location = form.location().clone();

        let kind = match form {
            SExpr::Atom(token) => match token.kind {
                TokenKind::Symbol if !token.text.contains('.') => {
                    TypeExprKind::Named(InternedSymbol::new(&token.text))
                }
                TokenKind::Nil => TypeExprKind::Named(InternedSymbol::new("nil")),
                TokenKind::Number | TokenKind::String | TokenKind::Boolean | TokenKind::Keyword => {
                    let literal = self.parse_atom(token)?;

                    match literal.literal_value() {
                        Some(value) => TypeExprKind::Literal(value),
                        None => TypeExprKind::Named(InternedSymbol::new("any")),
                    }
                }
                _ => {
                    return Err(syntax_error!(
                        location,
                        "Expected a type, found `{}`",
                        token.text
                    ))
                }
            },
            SExpr::List(list) if list.delimiter == Delimiter::Brace => {
                let items = list.iter().collect::<Vec<_>>();

                if items.len() % 2 != 0 {
                    return Err(syntax_error!(
                        location,
                        "Expected `{{:key type ...}}` object type, found an odd number of forms"
                    ));
                }

                let properties = items
                    .chunks(2)
                    .map(|pair| {
                        let key = self.expect_keyword(pair[0], "an object type")?;
                        let (key, optional) = match key.value().strip_suffix('?') {
                            Some(stripped) => (InternedSymbol::new(stripped), true),
                            None => (key, false),
                        };

                        Ok(PropertyTypeExpr {
                            key,
                            optional,
                            ty: self.parse_type(pair[1])?,
                        })
                    })
                    .collect::<CompileResult<Vec<_>>>()?;

                TypeExprKind::Object(properties)
            }
            SExpr::List(list) if list.delimiter == Delimiter::Paren => {
                self.parse_type_constructor(list)?
            }
            SExpr::List(_) => {
                return Err(syntax_error!(
                    location,
                    "Expected a type, found {}",
                    form.describe()
                ))
            }
        };

        Ok(TypeExpr { location, kind })
    }

    fn parse_type_constructor(&mut self, list: &List) -> CompileResult<TypeExprKind> {
        let items = list.iter().collect::<Vec<_>>();
        let Some((head, operands)) = items.split_first() else {
            return Err(syntax_error!(list.location.clone(), "Expected a type, found `()`"));
        };

        let constructor = head
            .as_atom()
            .filter(|token| token.is(TokenKind::Symbol))
            .map(|token| token.text.as_str())
            .unwrap_or_default();

        let kind = match constructor {
            "list" | "vector" | "not" => {
                let [element] = self.expect_operands::<1>(list, operands, constructor)?;
                let element = Box::new(self.parse_type(element)?);

                match constructor {
                    "list" => TypeExprKind::List(element),
                    "vector" => TypeExprKind::Vector(element),
                    _ => TypeExprKind::Not(element),
                }
            }
            "tuple" | "or" | "and" => {
                let members = operands
                    .iter()
                    .map(|operand| self.parse_type(operand))
                    .collect::<CompileResult<Vec<_>>>()?;

                if members.is_empty() && constructor != "tuple" {
                    return Err(syntax_error!(
                        list.location.clone(),
                        "Expected at least one member type in `({constructor} ...)`"
                    ));
                }

                match constructor {
                    "tuple" => TypeExprKind::Tuple(members),
                    "or" => TypeExprKind::Union(members),
                    _ => TypeExprKind::Intersection(members),
                }
            }
            "fn" => {
                let [params, ret] = self.expect_operands::<2>(list, operands, "fn")?;
                let params = match params.as_list() {
                    Some(params) if params.delimiter == Delimiter::Bracket => params,
                    _ => {
                        return Err(syntax_error!(
                            params.location().clone(),
                            "Expected `(fn [types...] return)` function type"
                        ))
                    }
                };

                let (fixed, rest) = self.split_rest_types(params)?;

                TypeExprKind::Function {
                    params: fixed,
                    rest,
                    ret: Box::new(self.parse_type(ret)?),
                }
            }
            _ => {
                return Err(syntax_error!(
                    head.location().clone(),
                    "Unknown type constructor {}",
                    head.describe()
                ))
            }
        };

        Ok(kind)
    }

    fn split_rest_types(
        &mut self,
        list: &List,
    ) -> CompileResult<(Vec<TypeExpr>, Option<Box<TypeExpr>>)> {
        let items = list.iter().collect::<Vec<_>>();
        let (fixed, rest) = match items.iter().position(|item| item.is_symbol("&")) {
            Some(position) if position + 2 == items.len() => {
                (&items[..position], Some(items[position + 1]))
            }
            Some(position) => {
                return Err(syntax_error!(
                    items[position].location().clone(),
                    "Expected exactly one rest type after `&`, as the last parameter type"
                ))
            }
            None => (&items[..], None),
        };

        let fixed = fixed
            .iter()
            .map(|item| self.parse_type(item))
            .collect::<CompileResult<Vec<_>>>()?;

        let rest = match rest {
            Some(rest) => Some(Box::new(self.parse_type(rest)?)),
            None => None,
        };

        Ok((fixed, rest))
    }
}
