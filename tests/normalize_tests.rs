//! ANF and tail call marking, run over type checked programs

use sprigc::{
    check,
    context::{CompilationContext, CompileOptions},
    frontend::ast::{
        Function, Node, NodeKind, Program,
        visit::{Visitor, walk_node, walk_program},
    },
    normalize, parse_source,
};

fn normalized(source: &str) -> Program {
    let mut ctx = CompilationContext::new(CompileOptions::default()).unwrap();
    let program = parse_source(source, "test.sprig", &mut ctx).expect("parsing failed");
    let program = check(program, &mut ctx).expect("type checking failed");

    normalize(program, &mut ctx).expect("normalizing failed")
}

/// Call positions holding anything other than an atomic node
#[derive(Default)]
struct NestedCalls {
    count: usize,
}

impl<'ast> Visitor<'ast> for NestedCalls {
    fn visit_node(&mut self, node: &'ast Node) {
        if let NodeKind::Call(call) = &node.kind {
            let operands = std::iter::once(&*call.callee).chain(&call.args);

            self.count += operands.filter(|operand| !operand.is_atomic()).count();
        }

        walk_node(self, node)
    }
}

/// Tail calls marked anywhere in the program
#[derive(Default)]
struct TailCalls {
    count: usize,
}

impl<'ast> Visitor<'ast> for TailCalls {
    fn visit_node(&mut self, node: &'ast Node) {
        if node.as_call().is_some_and(|call| call.is_tail_rec) {
            self.count += 1;
        }

        walk_node(self, node)
    }
}

fn tail_calls(program: &Program) -> usize {
    let mut visitor = TailCalls::default();
    walk_program(&mut visitor, program);
    visitor.count
}

fn function<'a>(program: &'a Program, name: &str) -> &'a Function {
    program
        .body
        .iter()
        .find_map(|node| match &node.kind {
            NodeKind::FunctionDeclaration(function)
                if function.name.is_some_and(|n| n.value() == name) =>
            {
                Some(function)
            }
            _ => None,
        })
        .expect("function not found")
}

#[test]
fn anf_leaves_no_nested_calls() {
    let program = normalized(
        "(const xs [1 2 3])
         (print (+ 1 (* 2 3)) (str (first xs)) [(count xs) (rest xs)])
         (defn f [a] (if (> (count a) 0) (f (rest a)) (str (first a) (count a))))",
    );

    let mut visitor = NestedCalls::default();
    walk_program(&mut visitor, &program);

    assert_eq!(visitor.count, 0);
}

#[test]
fn anf_hoists_operands_in_evaluation_order() {
    let program = normalized("(print (+ 1 2) (* 3 4))");

    assert_eq!(program.body.len(), 3);
    assert!(matches!(&program.body[0].kind, NodeKind::ConstantDeclaration(d) if d.init.as_call().is_some()));
    assert!(matches!(&program.body[1].kind, NodeKind::ConstantDeclaration(_)));

    let NodeKind::Call(call) = &program.body[2].kind else {
        panic!("expected the print call last");
    };

    assert!(call.args.iter().all(|arg| arg.as_symbol().is_some()));
}

#[test]
fn anf_keeps_branch_work_inside_branches() {
    let program = normalized("(const x 1) (if (== x 1) (print (+ x 1)) nil)");

    assert_eq!(program.body.len(), 2);

    let NodeKind::If { then, .. } = &program.body[1].kind else {
        panic!("expected an if statement");
    };

    assert!(matches!(&then.kind, NodeKind::Do(body) if body.len() == 2));
}

#[test]
fn anf_lowers_cond_and_when() {
    let program = normalized("(let x 2) (cond (== x 1) :one (== x 2) :two) (when true (print x))");

    let NodeKind::If { otherwise, .. } = &program.body[1].kind else {
        panic!("cond should become an if");
    };
    let NodeKind::If { otherwise, .. } = &otherwise.kind else {
        panic!("the second clause should be a nested if");
    };

    assert!(matches!(otherwise.kind, NodeKind::Nil));

    assert!(matches!(
        &program.body[2].kind,
        NodeKind::If { then, otherwise, .. }
            if matches!(then.kind, NodeKind::Do(_)) && matches!(otherwise.kind, NodeKind::Nil)
    ));
}

#[test]
fn anf_splits_destructuring() {
    let program = normalized("(const [a b & rest] [1 2 3])");
    let names = program
        .body
        .iter()
        .filter_map(|node| match &node.kind {
            NodeKind::ConstantDeclaration(declaration) => declaration.target.as_identifier(),
            _ => None,
        })
        .map(|name| name.value())
        .collect::<Vec<_>>();

    assert_eq!(names, vec!["#t1", "a", "b", "rest"]);
}

#[test]
fn tco_marks_direct_self_call() {
    let program = normalized("(defn f [x] (f x))");

    assert!(function(&program, "f").is_tail_recursive);
    assert_eq!(tail_calls(&program), 1);
}

#[test]
fn tco_marks_calls_through_if_and_do() {
    let program = normalized("(defn countdown [n] (if (== n 0) :done (countdown (- n 1))))");

    assert!(function(&program, "countdown").is_tail_recursive);
    assert_eq!(tail_calls(&program), 1);
}

#[test]
fn tco_marks_logical_operands() {
    let program = normalized("(defn all [xs] (or (empty? xs) (and (first xs) (all (rest xs)))))");

    assert!(function(&program, "all").is_tail_recursive);
}

#[test]
fn tco_ignores_calls_to_other_functions() {
    let program = normalized("(defn g [x] x) (defn f [x] (g x))");

    assert!(!function(&program, "f").is_tail_recursive);
    assert_eq!(tail_calls(&program), 0);
}

#[test]
fn tco_ignores_calls_outside_tail_position() {
    let program = normalized("(defn f [n] (+ 1 (f n)))");

    assert!(!function(&program, "f").is_tail_recursive);
    assert_eq!(tail_calls(&program), 0);
}

#[test]
fn tco_respects_shadowing_parameters() {
    let program = normalized("(defn f [f] (f 1))");

    assert!(!function(&program, "f").is_tail_recursive);
}

#[test]
fn tco_respects_shadowing_locals() {
    let program = normalized("(defn g [x] x) (defn f [x] (const f g) (f x))");

    assert!(!function(&program, "f").is_tail_recursive);
    assert_eq!(tail_calls(&program), 0);

    // Only the branch that rebinds the name loses the jump
    let program = normalized("(defn g [x] x) (defn f [x] (if x (do (const f g) (f x)) (f x)))");

    assert!(function(&program, "f").is_tail_recursive);
    assert_eq!(tail_calls(&program), 1);
}

#[test]
fn tco_uses_the_name_a_lambda_is_bound_to() {
    let program = normalized("(const spin (fn [n] (if (> n 0) (spin (- n 1)) n)))");

    let NodeKind::ConstantDeclaration(declaration) = &program.body[0].kind else {
        panic!("expected a constant declaration");
    };

    assert!(matches!(&declaration.init.kind, NodeKind::Lambda(function) if function.is_tail_recursive));
}

#[test]
fn tco_can_be_switched_off() {
    let options = CompileOptions {
        tco: false,
        ..Default::default()
    };
    let mut ctx = CompilationContext::new(options).unwrap();
    let program = parse_source("(defn f [x] (f x))", "test.sprig", &mut ctx).unwrap();
    let program = check(program, &mut ctx).unwrap();
    let program = normalize(program, &mut ctx).unwrap();

    assert_eq!(tail_calls(&program), 0);
}
