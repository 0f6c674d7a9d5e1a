use indoc::indoc;
use sprigc::{
    ErrorKind, compile,
    context::{CompilationContext, CompileOptions},
    module_header,
};

fn context() -> CompilationContext {
    CompilationContext::new(CompileOptions::default()).expect("prelude failed to load")
}

fn compile_str(source: &str) -> String {
    compile(source, "test.sprig", &mut context()).expect("compilation failed")
}

#[test]
fn numbers_are_emitted_verbatim() {
    assert_eq!(compile_str("15"), "15;\n");
    assert_eq!(compile_str("3.14"), "3.14;\n");
    assert_eq!(compile_str("-2.5"), "-2.5;\n");
}

#[test]
fn keywords_are_interned_symbols() {
    assert_eq!(compile_str(":hello"), "Symbol.for(\":hello\");\n");
}

#[test]
fn nil_is_null() {
    assert_eq!(compile_str("nil"), "null;\n");
    assert_eq!(compile_str("()"), "null;\n");
}

#[test]
fn malformed_numbers_fail_to_compile() {
    let error = compile("3.13.14", "test.sprig", &mut context()).unwrap_err();

    assert!(error.is(ErrorKind::Syntax));
    assert_eq!(error.location.as_ref().map(|l| l.column), Some(5));
}

#[test]
fn namespace_definitions_pick_the_callee_name() {
    let mut ctx = context();

    ctx.namespace.define("+", "m");

    assert_eq!(compile("(+ 1 2)", "test.sprig", &mut ctx).unwrap(), "m(1, 2);\n");
}

#[test]
fn builtins_come_from_the_runtime() {
    assert_eq!(compile_str("(+ 1 2)"), "$rt.add(1, 2);\n");
    assert_eq!(compile_str("(count \"abc\")"), "$rt.count(\"abc\");\n");
}

#[test]
fn module_header_imports_the_runtime() {
    let options = CompileOptions::default();

    assert_eq!(module_header(&options), "import * as $rt from \"sprig/runtime\";\n");
}

#[test]
fn identifiers_are_mangled() {
    let output = compile_str("(const empty-list? [])");

    assert!(output.starts_with("const empty_list_p$"), "{output}");
    assert_eq!(compile_str("(const class 1)").matches("class$").count(), 1);
}

#[test]
fn locals_shadow_builtins() {
    let output = compile_str("(defn pick [first] first)");

    assert_eq!(
        output,
        indoc! {"
            function pick(first) {
                return first;
            }
        "}
    );
}

#[test]
fn nested_calls_are_hoisted() {
    assert_eq!(
        compile_str("(print (* 2 3) 4)"),
        indoc! {"
            const $t1 = $rt.multiply(2, 3);
            $rt.print($t1, 4);
        "}
    );
}

#[test]
fn conditional_values_are_assigned() {
    assert_eq!(
        compile_str("(let y (if true 1 2))"),
        indoc! {"
            let y;
            if (true) {
                y = 1;
            } else {
                y = 2;
            }
        "}
    );
}

#[test]
fn tail_recursion_becomes_a_loop() {
    assert_eq!(
        compile_str("(defn countdown [n] (if (== n 0) :done (countdown (- n 1))))"),
        indoc! {"
            function countdown(n$) {
                $tco: while (true) {
                    let n = n$;
                    if ($rt.equals(n, 0)) {
                        return Symbol.for(\":done\");
                    } else {
                        const $t1 = $rt.subtract(n, 1);
                        [n$] = [$t1];
                        continue $tco;
                    }
                }
            }
        "}
    );
}

#[test]
fn plain_recursion_stays_a_call() {
    let options = CompileOptions {
        tco: false,
        ..Default::default()
    };
    let mut ctx = CompilationContext::new(options).unwrap();
    let output = compile("(defn f [x] (f x))", "test.sprig", &mut ctx).unwrap();

    assert!(output.contains("return f(x);"));
    assert!(!output.contains("continue"));
}

#[test]
fn lambdas_are_arrow_functions() {
    assert_eq!(
        compile_str("(const inc (fn [x] (+ x 1)))"),
        indoc! {"
            const inc = (x) => {
                return $rt.add(x, 1);
            };
        "}
    );
}

#[test]
fn partial_application_binds_the_supplied_arguments() {
    let output = compile_str("(defn add [a b] (+ a b)) (const inc (add 1))");

    assert!(output.ends_with("const inc = add.bind(null, 1);\n"), "{output}");

    // Arguments are read when the partial application runs, not when it's called
    let output = compile_str("(defn add [a b] (+ a b)) (let x 1) (const g (add x)) (set! x 5) (g 1)");

    assert!(output.contains("const g = add.bind(null, x);\nx = 5;\ng(1);\n"), "{output}");
}

#[test]
fn loop_iterations_get_their_own_bindings() {
    let output = compile_str(
        "(defn build [n acc] (if (== n 0) acc (build (- n 1) (cons (fn [] n) acc))))",
    );

    // Closures capture `n` of their own iteration, the loop only writes the carriers
    assert!(output.starts_with("function build(n$, acc$) {\n"), "{output}");
    assert!(output.contains("        let n = n$, acc = acc$;\n"), "{output}");
    assert!(output.contains("const $t2 = $rt.cons(() => {\n"), "{output}");
    assert!(output.contains("[n$, acc$] = [$t1, $t2];\n"), "{output}");
    assert!(!output.contains("[n, acc] ="), "{output}");
}

#[test]
fn discarded_conditionals_skip_the_implicit_else() {
    assert_eq!(
        compile_str("(let x true) (when x)"),
        indoc! {"
            let x = true;
            if (x) {
            }
        "}
    );
}

#[test]
fn records_and_members() {
    assert_eq!(compile_str("{:name \"x\"}"), "({ name: \"x\" });\n");
    assert_eq!(
        compile_str("(const p {:x 1}) p.x"),
        "const p = { x: 1 };\np.x;\n"
    );
}

#[test]
fn truthiness_goes_through_the_runtime() {
    assert_eq!(
        compile_str("(const a 1) (const b 2) (and a b)"),
        "const a = 1;\nconst b = 2;\n($rt.truthy(a) ? b : a);\n"
    );
    assert_eq!(compile_str("(not true)"), "!true;\n");
}

#[test]
fn loops_iterate_with_for_of() {
    assert_eq!(
        compile_str("(for [x [1 2]] (print x))"),
        indoc! {"
            const $t1 = [1, 2];
            for (const x of $t1) {
                $rt.print(x);
            }
        "}
    );
}

#[test]
fn destructuring_uses_runtime_helpers() {
    assert_eq!(
        compile_str("(const [a b & rest] [1 2 3])"),
        indoc! {"
            const $t1 = [1, 2, 3];
            const a = $rt.get($t1, 0);
            const b = $rt.get($t1, 1);
            const rest = $rt.slice($t1, 2);
        "}
    );
}

#[test]
fn imports_become_namespace_imports() {
    assert_eq!(
        compile_str("(import lib/math :as m)"),
        "import * as m from \"lib/math\";\n"
    );
}

#[test]
fn type_only_forms_emit_nothing() {
    assert_eq!(compile_str("(type Id number)"), "");
    assert_eq!(compile_str("(as number 1)"), "1;\n");
}

#[test]
fn type_errors_stop_compilation() {
    let error = compile("(const n : number \"x\")", "test.sprig", &mut context()).unwrap_err();

    assert!(error.is(ErrorKind::Type));
}
