use sprigc::{
    ErrorKind,
    frontend::lexer::{TokenKind, Trivia, tokenize},
};

fn lex(source: &str) -> Vec<sprigc::frontend::lexer::Token> {
    tokenize(source, "test.sprig").expect("lexing failed")
}

#[test]
fn lex_numbers_verbatim() {
    for source in ["0", "15", "3.14", "-7", "+2", "-0.5", "1000.0001"] {
        let tokens = lex(source);

        assert_eq!(tokens.len(), 2, "`{source}`");
        assert!(tokens[0].is(TokenKind::Number));
        assert_eq!(tokens[0].text, source);
        assert!(tokens[1].is(TokenKind::Eof));
    }
}

#[test]
fn lex_second_dot_in_number_fails() {
    let error = tokenize("3.13.14", "test.sprig").unwrap_err();

    assert!(error.is(ErrorKind::Syntax));
}

#[test]
fn lex_dot_without_digits_fails() {
    assert!(tokenize("1.", "test.sprig").is_err());
    assert!(tokenize("12abc", "test.sprig").is_err());
}

#[test]
fn lex_literals() {
    let tokens = lex(r#""hi" true false nil :hello"#);

    assert!(tokens[0].is(TokenKind::String));
    assert_eq!(tokens[0].text, r#""hi""#);
    assert!(tokens[1].is(TokenKind::Boolean));
    assert!(tokens[2].is(TokenKind::Boolean));
    assert!(tokens[3].is(TokenKind::Nil));
    assert!(tokens[4].is(TokenKind::Keyword));
    assert_eq!(tokens[4].text, ":hello");
}

#[test]
fn lex_strings_with_escapes_and_newlines() {
    let tokens = lex("\"a \\\"quoted\\\" word\nnext line\"");

    assert_eq!(tokens.len(), 2);
    assert!(tokens[0].is(TokenKind::String));
}

#[test]
fn lex_unterminated_string_fails() {
    let error = tokenize("\"never closed", "test.sprig").unwrap_err();

    assert!(error.is(ErrorKind::Syntax));
    assert!(error.plain_message().contains("end of file"));
}

#[test]
fn lex_symbols_with_punctuation() {
    let tokens = lex("empty? set! -> a.b.c <= not=");

    assert!(tokens[..6].iter().all(|token| token.is(TokenKind::Symbol)));
    assert_eq!(tokens[0].text, "empty?");
    assert_eq!(tokens[3].text, "a.b.c");
}

#[test]
fn lex_delimiters() {
    let kinds = lex("([{ . }])")
        .into_iter()
        .map(|token| token.kind)
        .collect::<Vec<_>>();

    assert_eq!(
        kinds,
        vec![
            TokenKind::LParen,
            TokenKind::LBracket,
            TokenKind::LBrace,
            TokenKind::Dot,
            TokenKind::RBrace,
            TokenKind::RBracket,
            TokenKind::RParen,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn lex_tracks_lines_and_columns() {
    let tokens = lex("(a\n  b)");

    assert_eq!(tokens[2].text, "b");
    assert_eq!(tokens[2].location.line, 2);
    assert_eq!(tokens[2].location.column, 3);
}

#[test]
fn lex_trailing_trivia_lands_on_eof() {
    let tokens = lex("x ; done");

    assert!(tokens[1].is(TokenKind::Eof));
    assert!(matches!(&tokens[1].trivia[..], [Trivia::Whitespace(_), Trivia::Comment(c)] if c == "; done"));
}

#[test]
fn lex_unknown_character_fails() {
    assert!(tokenize("(a @ b)", "test.sprig").is_err());
}
