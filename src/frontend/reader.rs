//! Assembles the token stream into S-expressions built from cons cells.

use crate::{
    error::{syntax_error, CompileError, CompileResult},
    frontend::{
        lexer::{Token, TokenKind},
        SourceLocation,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub enum SExpr {
    Atom(Token),
    List(List),
}

impl SExpr {
    pub fn location(&self) -> &SourceLocation {
        match self {
            SExpr::Atom(token) => &token.location,
            SExpr::List(list) => &list.location,
        }
    }

    pub fn as_atom(&self) -> Option<&Token> {
        match self {
            SExpr::Atom(token) => Some(token),
            SExpr::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            SExpr::List(list) => Some(list),
            SExpr::Atom(_) => None,
        }
    }

    pub fn is_atom_kind(&self, kind: TokenKind) -> bool {
        self.as_atom().is_some_and(|token| token.is(kind))
    }

    pub fn is_symbol(&self, name: &str) -> bool {
        self.as_atom().is_some_and(|token| token.is_symbol(name))
    }

    /// Short human readable description, used in error messages
    pub fn describe(&self) -> String {
        match self {
            SExpr::Atom(token) => format!("`{}`", token.text),
            SExpr::List(list) => format!("{} list", list.delimiter),
        }
    }
}

impl core::fmt::Display for SExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SExpr::Atom(token) => write!(f, "{}", token.text),
            SExpr::List(list) => {
                let (open, close) = match list.delimiter {
                    Delimiter::Paren => ('(', ')'),
                    Delimiter::Bracket => ('[', ']'),
                    Delimiter::Brace => ('{', '}'),
                };

                write!(f, "{open}")?;

                for (index, item) in list.iter().enumerate() {
                    if index > 0 {
                        write!(f, " ")?;
                    }

                    write!(f, "{item}")?;
                }

                if let Some(tail) = list.improper_tail() {
                    write!(f, " . {tail}")?;
                }

                write!(f, "{close}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Delimiter {
    Paren,
    Bracket,
    Brace,
}

impl Delimiter {
    fn closing(self) -> TokenKind {
        match self {
            Delimiter::Paren => TokenKind::RParen,
            Delimiter::Bracket => TokenKind::RBracket,
            Delimiter::Brace => TokenKind::RBrace,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct List {
    pub delimiter: Delimiter,
    pub location: SourceLocation,
    pub cells: Cdr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cons {
    pub car: SExpr,
    pub cdr: Cdr,
}

/// The tail of a cons cell. A proper list ends in `Nil`, an improper one in
/// `Dotted`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cdr {
    #[default]
    Nil,
    Pair(Box<Cons>),
    Dotted(Box<SExpr>),
}

impl List {
    pub fn new(delimiter: Delimiter, location: SourceLocation) -> Self {
        Self {
            delimiter,
            location,
            cells: Cdr::Nil,
        }
    }

    /// Walks to the end of the spine and attaches a new cell there
    pub fn append(&mut self, value: SExpr) {
        let mut cursor = &mut self.cells;

        while let Cdr::Pair(cell) = cursor {
            cursor = &mut cell.cdr;
        }

        *cursor = Cdr::Pair(Box::new(Cons {
            car: value,
            cdr: Cdr::Nil,
        }));
    }

    /// Terminates the list with a non-list value, making it improper
    pub fn set_tail(&mut self, value: SExpr) {
        let mut cursor = &mut self.cells;

        while let Cdr::Pair(cell) = cursor {
            cursor = &mut cell.cdr;
        }

        *cursor = Cdr::Dotted(Box::new(value));
    }

    pub fn iter(&self) -> ListIter<'_> {
        ListIter {
            cursor: &self.cells,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.cells, Cdr::Nil)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn head(&self) -> Option<&SExpr> {
        self.iter().next()
    }

    pub fn improper_tail(&self) -> Option<&SExpr> {
        let mut cursor = &self.cells;

        loop {
            match cursor {
                Cdr::Nil => return None,
                Cdr::Pair(cell) => cursor = &cell.cdr,
                Cdr::Dotted(tail) => return Some(tail),
            }
        }
    }

    pub fn is_proper(&self) -> bool {
        self.improper_tail().is_none()
    }
}

pub struct ListIter<'a> {
    cursor: &'a Cdr,
}

impl<'a> Iterator for ListIter<'a> {
    type Item = &'a SExpr;

    fn next(&mut self) -> Option<Self::Item> {
        match self.cursor {
            Cdr::Pair(cell) => {
                self.cursor = &cell.cdr;
                Some(&cell.car)
            }
            Cdr::Nil | Cdr::Dotted(_) => None,
        }
    }
}

impl<'a> IntoIterator for &'a List {
    type Item = &'a SExpr;
    type IntoIter = ListIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Reads every top-level form in order
pub fn read(tokens: &[Token]) -> CompileResult<Vec<SExpr>> {
    let mut reader = Reader { tokens, position: 0 };
    let mut forms = Vec::new();

    while !reader.peek_is(TokenKind::Eof) {
        forms.push(reader.read_form()?);
    }

    log::trace!("read {} top-level forms", forms.len());

    Ok(forms)
}

struct Reader<'tokens> {
    tokens: &'tokens [Token],
    position: usize,
}

impl<'tokens> Reader<'tokens> {
    fn peek(&self) -> Option<&'tokens Token> {
        self.tokens.get(self.position)
    }

    /// A missing token is treated as the end of the stream
    fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek().map_or(kind == TokenKind::Eof, |token| token.is(kind))
    }

    fn next(&mut self) -> Option<&'tokens Token> {
        let token = self.tokens.get(self.position)?;

        self.position += 1;

        Some(token)
    }

    fn end_location(&self) -> SourceLocation {
        match self.tokens.last() {
            Some(token) => token.location.clone(),
            None => SourceLocation::start_of("<unknown>".into()),
        }
    }

    fn read_form(&mut self) -> CompileResult<SExpr> {
        let Some(token) = self.next() else {
            return Err(syntax_error!(
                self.end_location(),
                "Expected a form, found end of input"
            ));
        };

        let delimiter = match token.kind {
            TokenKind::LParen => Delimiter::Paren,
            TokenKind::LBracket => Delimiter::Bracket,
            TokenKind::LBrace => Delimiter::Brace,
            TokenKind::Eof => {
                return Err(syntax_error!(
                    token.location.clone(),
                    "Expected a form, found end of input"
                ))
            }
            kind if kind.is_closing() || kind == TokenKind::Dot => {
                return Err(syntax_error!(
                    token.location.clone(),
                    "Expected a form, found {kind} `{}`",
                    token.text
                ))
            }
            _ => return Ok(SExpr::Atom(token.clone())),
        };

        self.read_list(delimiter, token)
    }

    fn read_list(&mut self, delimiter: Delimiter, opening: &Token) -> CompileResult<SExpr> {
        let mut list = List::new(delimiter, opening.location.clone());
        let closing = delimiter.closing();

        loop {
            let Some(token) = self.peek() else {
                return Err(unterminated(opening, closing));
            };

            match token.kind {
                kind if kind == closing => {
                    self.position += 1;
                    break;
                }
                TokenKind::Eof => return Err(unterminated(opening, closing)),
                kind if kind.is_closing() => {
                    return Err(syntax_error!(
                        token.location.clone(),
                        "Expected {closing}, found {kind}"
                    ))
                }
                TokenKind::Dot => {
                    if list.is_empty() {
                        return Err(syntax_error!(
                            token.location.clone(),
                            "Expected a form before `.` in dotted pair"
                        ));
                    }

                    self.position += 1;

                    let tail = self.read_form()?;

                    list.set_tail(tail);

                    let found = self.next();

                    if !found.is_some_and(|token| token.is(closing)) {
                        let location = found
                            .map(|token| token.location.clone())
                            .unwrap_or_else(|| self.end_location());

                        return Err(syntax_error!(
                            location,
                            "Expected {closing} after the tail of a dotted pair, found {}",
                            found.map_or(TokenKind::Eof, |token| token.kind)
                        ));
                    }

                    break;
                }
                _ => {
                    let form = self.read_form()?;

                    list.append(form);
                }
            }
        }

        if delimiter == Delimiter::Paren && list.is_empty() {
            return Ok(SExpr::Atom(Token::new(
                TokenKind::Nil,
                "()",
                opening.location.clone(),
            )));
        }

        Ok(SExpr::List(list))
    }
}

fn unterminated(opening: &Token, closing: TokenKind) -> CompileError {
    syntax_error!(
        opening.location.clone(),
        "Expected {closing} to close this list, found end of input"
    )
}
