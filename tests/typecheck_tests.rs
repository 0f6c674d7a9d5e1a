use indoc::indoc;
use sprigc::{
    CompileError, ErrorKind, check,
    context::{CompilationContext, CompileOptions},
    frontend::{
        ast::{Application, NodeKind, Program},
        intern::InternedSymbol,
    },
    middle::{
        ty::{ObjectProperty, Type},
        type_check::{algebra::union, subtype::is_subtype},
    },
    parse_source,
};

fn typecheck_with(source: &str, options: CompileOptions) -> Result<Program, CompileError> {
    let mut ctx = CompilationContext::new(options).expect("prelude failed to load");
    let program = parse_source(source, "test.sprig", &mut ctx).expect("parsing failed");

    check(program, &mut ctx)
}

fn typecheck(source: &str) -> Result<Program, CompileError> {
    typecheck_with(source, CompileOptions::default())
}

/// Type of the last top-level form
fn type_of_last(source: &str) -> String {
    let program = typecheck(source).expect("type checking failed");
    let last = program.body.last().expect("empty program");

    last.ty.as_ref().expect("untyped node").plain()
}

fn sample_types() -> Vec<Type> {
    vec![
        Type::any(),
        Type::number(),
        Type::string(),
        Type::nil(),
        Type::never(),
        Type::vector(Type::number()),
        Type::list(Type::string()),
        Type::tuple([Type::number(), Type::string()]),
        Type::function([Type::number()], Type::boolean(), false),
        Type::object([ObjectProperty::new(InternedSymbol::new("x"), Type::number())]),
        union([Type::number(), Type::string()]),
    ]
}

#[test]
fn subtype_is_reflexive() {
    for ty in sample_types() {
        assert!(is_subtype(&ty, &ty), "{}", ty.plain());
    }
}

#[test]
fn any_absorbs_in_both_directions() {
    for ty in sample_types() {
        assert!(is_subtype(&ty, &Type::any()), "{}", ty.plain());
        assert!(is_subtype(&Type::any(), &ty), "{}", ty.plain());
    }
}

#[test]
fn union_normal_form_is_idempotent() {
    let types = sample_types();

    for a in &types {
        for b in &types {
            for c in &types {
                let nested = union([union([a.clone(), b.clone()]), c.clone()]);
                let flat = union([a.clone(), b.clone(), c.clone()]);

                assert_eq!(nested, flat);
            }
        }
    }
}

#[test]
fn width_subtyping_ignores_extra_properties() {
    let point = Type::object([
        ObjectProperty::new(InternedSymbol::new("x"), Type::number()),
        ObjectProperty::new(InternedSymbol::new("y"), Type::number()),
    ]);
    let labelled = Type::object([
        ObjectProperty::new(InternedSymbol::new("x"), Type::number()),
        ObjectProperty::new(InternedSymbol::new("y"), Type::number()),
        ObjectProperty::new(InternedSymbol::new("label"), Type::string()),
    ]);

    assert!(is_subtype(&labelled, &point));
    assert!(!is_subtype(&point, &labelled));
}

#[test]
fn literals_widen_unless_bound_to_constants() {
    assert_eq!(type_of_last("(const x 1) x"), "1");
    assert_eq!(type_of_last("(let y 1) y"), "number");
    assert_eq!(type_of_last("\"text\""), "string");
}

#[test]
fn variadic_application_is_full() {
    assert_eq!(type_of_last("(+ 1 2 3 4)"), "number");
    assert_eq!(type_of_last("(+)"), "number");
}

#[test]
fn fewer_arguments_make_a_partial_application() {
    let source = indoc! {"
        (defn add [a : number b : number] : number (+ a b))
        (add 1)
    "};

    let program = typecheck(source).unwrap();
    let last = program.body.last().unwrap();

    assert_eq!(last.ty.as_ref().unwrap().plain(), "(fn [number] number)");
    assert!(matches!(
        &last.kind,
        NodeKind::Call(call) if call.application == Application::Partial { remaining: 1 }
    ));
}

#[test]
fn too_many_arguments_fail() {
    let error = typecheck("(defn id [a] a) (id 1 2)").unwrap_err();

    assert!(error.is(ErrorKind::Type));
    assert!(error.plain_message().contains("Too many arguments"));
}

#[test]
fn unbound_names_fail() {
    let error = typecheck("(print missing)").unwrap_err();

    assert!(error.is(ErrorKind::Reference));
    assert!(error.plain_message().contains("missing"));
}

#[test]
fn unannotated_code_is_gradual() {
    assert!(typecheck("(+ \"a\" 1)").is_ok());

    let strict = CompileOptions {
        strict: true,
        ..Default::default()
    };

    assert!(typecheck_with("(+ \"a\" 1)", strict).unwrap_err().is(ErrorKind::Type));
}

#[test]
fn annotations_switch_checking_on() {
    let error = typecheck("(const n : number \"five\")").unwrap_err();

    assert!(error.is(ErrorKind::Type));
    assert!(error.plain_message().contains("Expected number but found"));
}

#[test]
fn top_level_functions_can_refer_forward() {
    let source = indoc! {"
        (defn even? [n] (if (== n 0) true (odd? (- n 1))))
        (defn odd? [n] (if (== n 0) false (even? (- n 1))))
        (even? 10)
    "};

    assert!(typecheck(source).is_ok());
}

#[test]
fn predicates_narrow_branches() {
    let source = indoc! {"
        (defn describe [x : (or number string)] : string
          (if (number? x) (str x \"!\") x))
    "};

    assert!(typecheck(source).is_ok());

    let unnarrowed = indoc! {"
        (defn describe [x : (or number string)] : string
          x)
    "};

    assert!(typecheck(unnarrowed).unwrap_err().is(ErrorKind::Type));
}

#[test]
fn impossible_branches_are_allowed() {
    let source = indoc! {"
        (defn f [x : number] : number
          (if (string? x) 1 x))
    "};

    assert!(typecheck(source).is_ok());
}

#[test]
fn records_check_against_object_types() {
    let source = indoc! {"
        (type Point {:x number :y number})
        (const p : Point {:x 1 :y 2 :z 3})
    "};

    assert!(typecheck(source).is_ok());

    let missing = indoc! {"
        (type Point {:x number :y number})
        (const q : Point {:x 1})
    "};

    let error = typecheck(missing).unwrap_err();
    assert!(error.is(ErrorKind::Type));
    assert!(error.plain_message().contains("Missing property `y`"));

    assert!(typecheck("(const r : {:x number :y? number} {:x 1})").is_ok());
}

#[test]
fn type_aliases_can_be_used_before_they_are_declared() {
    let source = indoc! {"
        (defn norm [p : Point] : number (+ p.x p.y))
        (type Point {:x Coordinate :y Coordinate})
        (type Coordinate number)
        (norm {:x 1 :y 2})
    "};

    assert!(typecheck(source).is_ok());

    let mismatch = indoc! {"
        (defn norm [p : Point] : number p.x)
        (type Point {:x number})
        (norm {:x \"a\"})
    "};

    assert!(typecheck(mismatch).unwrap_err().is(ErrorKind::Type));
}

#[test]
fn vectors_check_against_tuples() {
    assert!(typecheck("(const t : (tuple number string) [1 \"a\"])").is_ok());

    let element = typecheck("(const t : (tuple number string) [1 2])").unwrap_err();
    assert!(element.is(ErrorKind::Type));
    assert!(element.plain_message().contains("Expected string but found"), "{element}");

    let arity = typecheck("(const t : (tuple number string) [1])").unwrap_err();
    assert!(arity.is(ErrorKind::Type));
}

#[test]
fn lambdas_check_against_function_types() {
    assert!(typecheck("(const inc : (fn [number] number) (fn [x] (+ x 1)))").is_ok());

    // Parameters may be wider than the signature asks for, never narrower
    assert!(typecheck("(const show : (fn [number] any) (fn [x : (or number string)] x))").is_ok());

    let narrower = typecheck("(const f : (fn [number] number) (fn [x : string] 1))").unwrap_err();
    assert!(narrower.is(ErrorKind::Type));
    assert!(
        narrower.plain_message().contains("Parameter of type string can't accept number"),
        "{narrower}"
    );

    let arity = typecheck("(const g : (fn [number] number) (fn [a b] a))").unwrap_err();
    assert!(arity.is(ErrorKind::Type));
}

#[test]
fn unions_accept_any_member() {
    assert!(typecheck("(const v : (or number string) \"a\")").is_ok());
    assert!(typecheck("(const w : (or number string) :kw)").is_err());
}

#[test]
fn constants_cannot_be_reassigned() {
    let error = typecheck("(const c 1) (set! c 2)").unwrap_err();

    assert!(error.is(ErrorKind::Type));
}

#[test]
fn unknown_type_names_fail() {
    let error = typecheck("(const n : Missing 1)").unwrap_err();

    assert!(error.is(ErrorKind::Reference));
}

#[test]
fn disabled_checker_leaves_nodes_untyped() {
    let options = CompileOptions {
        typecheck: false,
        ..Default::default()
    };

    let program = typecheck_with("(print missing)", options).unwrap();

    assert!(program.body[0].ty.is_none());
}
