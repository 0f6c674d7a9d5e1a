use sprigc::{
    ErrorKind, parse_source,
    context::{CompilationContext, CompileOptions},
    frontend::{
        ast::{
            Application, BinaryOperator, LogicalOperator, Node, NodeKind, PatternKind, Program,
            UnaryOperator,
        },
        imports::collect_requires,
    },
};
use std::path::Path;

fn context() -> CompilationContext {
    CompilationContext::new(CompileOptions::default()).expect("prelude failed to load")
}

fn parse(source: &str) -> Program {
    parse_source(source, "test.sprig", &mut context()).expect("parsing failed")
}

fn parse_one(source: &str) -> Node {
    let mut program = parse(source);

    assert_eq!(program.body.len(), 1);
    program.body.remove(0)
}

fn syntax_error(source: &str) {
    let error = parse_source(source, "test.sprig", &mut context()).unwrap_err();

    assert!(error.is(ErrorKind::Syntax), "`{source}` gave {error}");
}

#[test]
fn parse_literals() {
    assert!(matches!(parse_one("15").kind, NodeKind::Number { ref text, value } if text == "15" && value == 15.0));
    assert!(matches!(parse_one("\"a\\nb\"").kind, NodeKind::String(ref value) if value == "a\nb"));
    assert!(matches!(parse_one("false").kind, NodeKind::Boolean(false)));
    assert!(matches!(parse_one(":hello").kind, NodeKind::Keyword(name) if name.value() == ":hello"));
    assert!(matches!(parse_one("nil").kind, NodeKind::Nil));
    assert!(matches!(parse_one("()").kind, NodeKind::Nil));
}

#[test]
fn parse_call_falls_back_for_unknown_heads() {
    let node = parse_one("(+ 1 2)");
    let NodeKind::Call(call) = node.kind else {
        panic!("expected a call");
    };

    assert_eq!(call.callee.as_symbol().map(|s| s.value()), Some("+"));
    assert_eq!(call.args.len(), 2);
    assert_eq!(call.application, Application::Full);
    assert!(!call.is_tail_rec);
}

#[test]
fn parse_operators() {
    assert!(matches!(
        parse_one("(<= a b)").kind,
        NodeKind::Binary { operator: BinaryOperator::LessThanOrEqualTo, .. }
    ));
    assert!(matches!(
        parse_one("(not a)").kind,
        NodeKind::Unary { operator: UnaryOperator::Not, .. }
    ));
    assert!(matches!(
        parse_one("(typeof a)").kind,
        NodeKind::Unary { operator: UnaryOperator::Typeof, .. }
    ));
    // `not=` is an ordinary builtin
    assert!(matches!(parse_one("(not= a b)").kind, NodeKind::Call(_)));
}

#[test]
fn parse_logical_nests_to_the_left() {
    let node = parse_one("(and a b c)");
    let NodeKind::Logical { operator, left, right } = node.kind else {
        panic!("expected a logical expression");
    };

    assert_eq!(operator, LogicalOperator::And);
    assert!(matches!(left.kind, NodeKind::Logical { .. }));
    assert_eq!(right.as_symbol().map(|s| s.value()), Some("c"));
}

#[test]
fn parse_declarations() {
    let node = parse_one("(const x : number 1)");
    let NodeKind::ConstantDeclaration(declaration) = node.kind else {
        panic!("expected a constant declaration");
    };

    assert_eq!(declaration.target.as_identifier().map(|s| s.value()), Some("x"));
    assert!(declaration.annotation.is_some());

    assert!(matches!(parse_one("(let y 2)").kind, NodeKind::VariableDeclaration(_)));
    assert!(matches!(parse_one("(set! y 3)").kind, NodeKind::Set { .. }));
}

#[test]
fn parse_destructuring_patterns() {
    let node = parse_one("(let [a {x :y py & others} & rest] value)");
    let NodeKind::VariableDeclaration(declaration) = node.kind else {
        panic!("expected a variable declaration");
    };

    let PatternKind::Vector { elements, rest } = &declaration.target.kind else {
        panic!("expected a vector pattern");
    };

    assert_eq!(elements.len(), 2);
    assert_eq!(rest.map(|s| s.value()), Some("rest"));
    assert!(matches!(&elements[1].kind, PatternKind::Record { properties, rest: Some(_) } if properties.len() == 2));

    let names = declaration
        .target
        .bound_names()
        .iter()
        .map(|name| name.value())
        .collect::<Vec<_>>();

    assert_eq!(names, vec!["a", "x", "py", "others", "rest"]);
}

#[test]
fn parse_functions() {
    let node = parse_one("(defn add [a : number & more : (vector number)] : number (+ a 1))");
    let NodeKind::FunctionDeclaration(function) = node.kind else {
        panic!("expected a function declaration");
    };

    assert_eq!(function.name.map(|s| s.value()), Some("add"));
    assert_eq!(function.fixed_params().len(), 1);
    assert!(function.rest_param().is_some());
    assert!(function.return_annotation.is_some());
    assert!(function.is_annotated());

    let node = parse_one("(fn loop [n] (loop n))");
    assert!(matches!(node.kind, NodeKind::Lambda(ref function) if function.name.map(|s| s.value()) == Some("loop")));

    let node = parse_one("(fn [n] n)");
    assert!(matches!(node.kind, NodeKind::Lambda(ref function) if function.name.is_none()));
}

#[test]
fn parse_control_flow() {
    assert!(matches!(parse_one("(if a 1 2)").kind, NodeKind::If { .. }));
    assert!(matches!(parse_one("(cond a 1 b 2)").kind, NodeKind::Cond(ref clauses) if clauses.len() == 2));
    assert!(matches!(parse_one("(when a 1 2)").kind, NodeKind::When { ref body, .. } if body.len() == 2));
    assert!(matches!(parse_one("(do 1 2 3)").kind, NodeKind::Do(ref body) if body.len() == 3));
    assert!(matches!(parse_one("(for [x xs] (print x))").kind, NodeKind::For { .. }));
}

#[test]
fn parse_aggregates_and_members() {
    assert!(matches!(parse_one("[1 2 3]").kind, NodeKind::Vector(ref elements) if elements.len() == 3));
    assert!(matches!(parse_one("[]").kind, NodeKind::Vector(ref elements) if elements.is_empty()));
    assert!(matches!(parse_one("{}").kind, NodeKind::Record(ref properties) if properties.is_empty()));

    let node = parse_one("{:name \"sprig\" :age 2}");
    let NodeKind::Record(properties) = node.kind else {
        panic!("expected a record");
    };

    assert_eq!(properties[0].key.value(), "name");
    assert_eq!(properties[1].key.value(), "age");

    let node = parse_one("a.b.c");
    let NodeKind::Member { object, property } = node.kind else {
        panic!("expected a member expression");
    };

    assert_eq!(property.value(), "c");
    assert!(matches!(object.kind, NodeKind::Member { .. }));
}

#[test]
fn parse_types_and_imports() {
    assert!(matches!(parse_one("(type Point {:x number :y? number})").kind, NodeKind::TypeAlias { .. }));
    assert!(matches!(parse_one("(as number x)").kind, NodeKind::As { .. }));

    let node = parse_one("(import lib/math)");
    assert!(matches!(node.kind, NodeKind::Import { ref name, alias } if name == "lib/math" && alias.value() == "math"));

    let node = parse_one("(import lib/math :as m)");
    assert!(matches!(node.kind, NodeKind::Import { alias, .. } if alias.value() == "m"));
}

#[test]
fn parse_program_location() {
    let program = parse("\n\n  (print 1)");

    assert_eq!(program.location.line, 3);
    assert_eq!(program.location.column, 3);

    let empty = parse("");
    assert!(empty.body.is_empty());
}

#[test]
fn parse_shape_errors() {
    syntax_error("(if a 1)");
    syntax_error("(cond a)");
    syntax_error("(let x)");
    syntax_error("(defn [x] x)");
    syntax_error("(fn [x])");
    syntax_error("(fn [& rest other] rest)");
    syntax_error("(let [a & rest more] value)");
    syntax_error("{:a}");
    syntax_error("{a 1}");
    syntax_error("(a . b)");
    syntax_error("(and a)");
    syntax_error("(for x xs)");
}

#[test]
fn imports_belong_at_the_top_level() {
    syntax_error("(do (import lib/math))");
    syntax_error("(defn f [] (import util) 1)");
    assert!(matches!(parse_one("(import util)").kind, NodeKind::Import { .. }));
}

#[test]
fn names_are_declared_once_per_block() {
    syntax_error("(defn f [] (let x 1) (let x 2) x)");
    syntax_error("(const a 1) (defn a [] 2)");
    syntax_error("(defn f [x] (const x 1) x)");
    syntax_error("(fn [[a b] a] b)");
    syntax_error("(for [[k v] pairs] (let k 1))");
    syntax_error("(import m) (const m 1)");

    // Nested blocks and branches have scopes of their own
    parse("(let x 1) (do (let x 2) x) (if x (let x 3) nil)");
    parse("(defn f [x] (fn [x] x))");
}

#[test]
fn collect_requires_resolves_next_to_the_importer() {
    let program = parse("(import util) (import lib/math :as m) (m.sqrt 4)");
    let requires = collect_requires(&program, Path::new("src/app/main.sprig"));

    assert_eq!(requires.len(), 2);
    assert_eq!(requires[0].name, "util");
    assert_eq!(requires[0].location, Path::new("src/app/util.sprig"));
    assert_eq!(requires[1].alias.value(), "m");
    assert_eq!(requires[1].location, Path::new("src/app/lib/math.sprig"));
}

#[test]
fn programs_print_back_as_source() {
    let source = "(defn f [x : number & more] (if (== x 1) :one {:a [x]}))\n(const {a :b renamed} value)\n";

    assert_eq!(parse(source).to_string(), source);
}
