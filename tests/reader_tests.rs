use sprigc::{
    ErrorKind,
    frontend::{
        lexer::{TokenKind, tokenize},
        reader::{Delimiter, SExpr, read},
    },
};

fn read_str(source: &str) -> Vec<SExpr> {
    let tokens = tokenize(source, "test.sprig").expect("lexing failed");

    read(&tokens).expect("reading failed")
}

#[test]
fn read_atoms_match_their_tokens() {
    for source in ["15", "3.14", "\"text\"", "true", "nil", ":hello", "name"] {
        let tokens = tokenize(source, "test.sprig").unwrap();
        let forms = read(&tokens).unwrap();

        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].as_atom(), Some(&tokens[0]));
    }
}

#[test]
fn read_keyword() {
    let forms = read_str(":hello");
    let token = forms[0].as_atom().unwrap();

    assert!(token.is(TokenKind::Keyword));
    assert_eq!(token.text, ":hello");
}

#[test]
fn read_empty_parens_as_nil() {
    let forms = read_str("()");

    assert!(forms[0].is_atom_kind(TokenKind::Nil));
}

#[test]
fn read_empty_vector_and_record_as_lists() {
    let forms = read_str("[] {}");

    assert!(matches!(&forms[0], SExpr::List(list) if list.delimiter == Delimiter::Bracket && list.is_empty()));
    assert!(matches!(&forms[1], SExpr::List(list) if list.delimiter == Delimiter::Brace && list.is_empty()));
}

#[test]
fn read_list_preserves_order() {
    let forms = read_str("(+ 1 2)");
    let list = forms[0].as_list().unwrap();
    let items = list
        .iter()
        .map(|item| {
            let token = item.as_atom().unwrap();
            (token.kind, token.text.as_str())
        })
        .collect::<Vec<_>>();

    assert_eq!(
        items,
        vec![
            (TokenKind::Symbol, "+"),
            (TokenKind::Number, "1"),
            (TokenKind::Number, "2"),
        ]
    );
    assert!(list.is_proper());
}

#[test]
fn read_top_level_forms_in_order() {
    let forms = read_str("a (b) [c]");

    assert_eq!(forms.len(), 3);
    assert!(forms[0].is_symbol("a"));
    assert!(matches!(&forms[1], SExpr::List(list) if list.delimiter == Delimiter::Paren));
    assert!(matches!(&forms[2], SExpr::List(list) if list.delimiter == Delimiter::Bracket));
}

#[test]
fn read_dotted_pair() {
    let forms = read_str("(a . b)");
    let list = forms[0].as_list().unwrap();

    assert_eq!(list.len(), 1);
    assert!(!list.is_proper());
    assert!(list.improper_tail().unwrap().is_symbol("b"));
    assert_eq!(forms[0].to_string(), "(a . b)");
}

#[test]
fn read_nested_lists_display() {
    let forms = read_str("(let [x 1] {:a [x]})");

    assert_eq!(forms[0].to_string(), "(let [x 1] {:a [x]})");
}

#[test]
fn read_unterminated_list_fails() {
    let tokens = tokenize("(a (b)", "test.sprig").unwrap();
    let error = read(&tokens).unwrap_err();

    assert!(error.is(ErrorKind::Syntax));
}

#[test]
fn read_mismatched_delimiter_fails() {
    let tokens = tokenize("(a]", "test.sprig").unwrap();

    assert!(read(&tokens).is_err());
}

#[test]
fn read_stray_closing_fails() {
    let tokens = tokenize(")", "test.sprig").unwrap();

    assert!(read(&tokens).is_err());
}

#[test]
fn read_dot_without_head_fails() {
    let tokens = tokenize("(. a)", "test.sprig").unwrap();

    assert!(read(&tokens).is_err());
}
