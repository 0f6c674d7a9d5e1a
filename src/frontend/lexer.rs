use std::{collections::BTreeMap, rc::Rc, str::Chars};

use itertools::{peek_nth, PeekNth};
use once_cell::sync::Lazy;

use crate::{
    error::{syntax_error, CompileResult},
    frontend::SourceLocation,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// The raw slice of source text (strings keep their quotes)
    pub text: String,
    pub location: SourceLocation,
    /// Whitespace and comments preceding this token
    pub trivia: Vec<Trivia>,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            kind,
            text: text.into(),
            location,
            trivia: Vec::new(),
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub fn is_symbol(&self, name: &str) -> bool {
        self.kind == TokenKind::Symbol && self.text == name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum TokenKind {
    /* Literals */
    Number,  // 3.14
    String,  // "hello"
    Boolean, // true
    Keyword, // :hello
    Nil,     // nil

    /* Words */
    Symbol, // map

    /* Delimiters */
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]
    LBrace,   // {
    RBrace,   // }

    /* Other */
    Colon, // :
    Dot,   // .
    Eof,
}

impl TokenKind {
    pub fn is_closing(&self) -> bool {
        matches!(self, Self::RParen | Self::RBracket | Self::RBrace)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trivia {
    Whitespace(String),
    Comment(String),
}

/// Table of single char tokens
static SINGLE_TOKENS: Lazy<BTreeMap<char, TokenKind>> = Lazy::new(|| {
    BTreeMap::from([
        ('(', TokenKind::LParen),
        (')', TokenKind::RParen),
        ('[', TokenKind::LBracket),
        (']', TokenKind::RBracket),
        ('{', TokenKind::LBrace),
        ('}', TokenKind::RBrace),
        ('.', TokenKind::Dot),
    ])
});

const SYMBOL_PUNCTUATION: &str = "=<>%|?/\\*_$!+-&";

pub fn is_symbol_start(c: char) -> bool {
    c.is_alphabetic() || SYMBOL_PUNCTUATION.contains(c)
}

pub fn is_symbol_char(c: char) -> bool {
    is_symbol_start(c) || c.is_ascii_digit() || c == ':' || c == '.'
}

/// Converts source text into tokens, terminated by an [`TokenKind::Eof`] token
pub fn tokenize(source: &str, file: &str) -> CompileResult<Vec<Token>> {
    let mut lexer = Lexer::new(source, file);
    let mut tokens = Vec::new();

    loop {
        let token = lexer.next_token()?;
        let is_eof = token.is(TokenKind::Eof);

        tokens.push(token);

        if is_eof {
            break;
        }
    }

    log::trace!("tokenized {file} into {} tokens", tokens.len());

    Ok(tokens)
}

#[derive(Debug)]
pub struct Lexer<'source> {
    source: &'source str,
    file: Rc<str>,
    chars: PeekNth<Chars<'source>>,
    position: usize,
    line: usize,
    column: usize,
    trivia: Vec<Trivia>,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str, file: &str) -> Self {
        Self {
            source,
            file: Rc::from(file),
            chars: peek_nth(source.chars()),
            position: 0,
            line: 1,
            column: 1,
            trivia: Vec::new(),
        }
    }

    fn location(&self) -> SourceLocation {
        SourceLocation::new(self.position, self.line, self.column, self.file.clone())
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;

        self.position += c.len_utf8();

        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(c)
    }

    fn advance_while(&mut self, predicate: impl Fn(char) -> bool) {
        while self.chars.peek().is_some_and(|c| predicate(*c)) {
            self.advance();
        }
    }

    fn collect_whitespace(&mut self) {
        let start = self.position;

        self.advance_while(char::is_whitespace);

        self.trivia
            .push(Trivia::Whitespace(self.source[start..self.position].to_owned()));
    }

    fn collect_comment(&mut self) {
        let start = self.position;

        self.advance_while(|c| c != '\n');

        self.trivia
            .push(Trivia::Comment(self.source[start..self.position].to_owned()));
    }

    fn finish(&mut self, kind: TokenKind, start: SourceLocation) -> Token {
        Token {
            kind,
            text: self.source[start.offset..self.position].to_owned(),
            location: start,
            trivia: std::mem::take(&mut self.trivia),
        }
    }

    fn read_string(&mut self) -> CompileResult<Token> {
        let start = self.location();

        // Opening quote
        self.advance();

        while let Some(c) = self.advance() {
            match c {
                '"' => return Ok(self.finish(TokenKind::String, start)),
                '\\' => {
                    let escape_location = self.location();

                    match self.advance() {
                        Some('"' | '\\' | 'n' | 't' | 'r') => {}
                        Some(other) => {
                            return Err(syntax_error!(
                                escape_location,
                                "Unknown escape sequence `\\{other}` in string literal"
                            ))
                        }
                        None => break,
                    }
                }
                _ => {}
            }
        }

        Err(syntax_error!(
            start,
            "Reached end of file while reading string literal"
        ))
    }

    fn read_number(&mut self) -> CompileResult<Token> {
        let start = self.location();

        if self.chars.peek().is_some_and(|c| *c == '+' || *c == '-') {
            self.advance();
        }

        self.advance_while(|c| c.is_ascii_digit());

        if self.chars.peek() == Some(&'.') {
            if !self.chars.peek_nth(1).is_some_and(char::is_ascii_digit) {
                return Err(syntax_error!(
                    self.location(),
                    "Expected digits after `.` in numeric literal"
                ));
            }

            self.advance();
            self.advance_while(|c| c.is_ascii_digit());

            if self.chars.peek() == Some(&'.') {
                return Err(syntax_error!(
                    self.location(),
                    "Unexpected second `.` in numeric literal `{}`",
                    &self.source[start.offset..self.position]
                ));
            }
        }

        if let Some(c) = self.chars.peek().copied() {
            if is_symbol_char(c) {
                return Err(syntax_error!(
                    self.location(),
                    "Unexpected character `{c}` in numeric literal"
                ));
            }
        }

        Ok(self.finish(TokenKind::Number, start))
    }

    // Symbol, boolean or nil
    fn read_word(&mut self) -> Token {
        let start = self.location();

        self.advance_while(is_symbol_char);

        let kind = match &self.source[start.offset..self.position] {
            "true" | "false" => TokenKind::Boolean,
            "nil" => TokenKind::Nil,
            _ => TokenKind::Symbol,
        };

        self.finish(kind, start)
    }

    // Keyword literal, or a bare colon
    fn read_colon(&mut self) -> Token {
        let start = self.location();

        self.advance();

        if self.chars.peek().is_some_and(|c| is_symbol_char(*c)) {
            self.advance_while(is_symbol_char);
            self.finish(TokenKind::Keyword, start)
        } else {
            self.finish(TokenKind::Colon, start)
        }
    }

    fn read_single(&mut self, kind: TokenKind) -> Token {
        let start = self.location();

        self.advance();
        self.finish(kind, start)
    }

    pub fn next_token(&mut self) -> CompileResult<Token> {
        while let Some(c) = self.chars.peek().copied() {
            let token = match c {
                c if c.is_whitespace() => {
                    self.collect_whitespace();
                    continue;
                }
                ';' => {
                    self.collect_comment();
                    continue;
                }

                '"' => self.read_string()?,
                ':' => self.read_colon(),

                // Signed numbers only when the sign is glued to a digit
                '+' | '-' if self.chars.peek_nth(1).is_some_and(char::is_ascii_digit) => {
                    self.read_number()?
                }
                n if n.is_ascii_digit() => self.read_number()?,

                c if is_symbol_start(c) => self.read_word(),

                c if SINGLE_TOKENS.contains_key(&c) => self.read_single(SINGLE_TOKENS[&c]),

                c => {
                    return Err(syntax_error!(
                        self.location(),
                        "Unexpected character `{c}` in source"
                    ))
                }
            };

            return Ok(token);
        }

        let location = self.location();

        Ok(self.finish(TokenKind::Eof, location))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source, "test.sprig")
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn signs_only_bind_to_digits() {
        assert_eq!(
            kinds("(- -1 +2)"),
            vec![
                TokenKind::LParen,
                TokenKind::Symbol,
                TokenKind::Number,
                TokenKind::Number,
                TokenKind::RParen,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn comments_become_trivia_of_the_next_token() {
        let tokens = tokenize("; leading\nx", "test.sprig").unwrap();

        assert_eq!(tokens[0].kind, TokenKind::Symbol);
        assert_eq!(
            tokens[0].trivia,
            vec![
                Trivia::Comment("; leading".to_owned()),
                Trivia::Whitespace("\n".to_owned())
            ]
        );
        assert_eq!(tokens[0].location.line, 2);
    }

    #[test]
    fn bare_colon_is_not_a_keyword() {
        assert_eq!(
            kinds("x : number"),
            vec![
                TokenKind::Symbol,
                TokenKind::Colon,
                TokenKind::Symbol,
                TokenKind::Eof
            ]
        );
    }
}
