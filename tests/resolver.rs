//! Static-analysis checks, driven through a full session so suppression of
//! execution is observable.

use std::cell::RefCell;
use std::rc::Rc;

use tryp::interpreter::Interpreter;
use tryp::parser::MemoryLoader;
use tryp::session::Session;

struct Harness {
    session: Session,
    out: Rc<RefCell<Vec<u8>>>,
}

fn harness() -> Harness {
    let out = Rc::new(RefCell::new(Vec::new()));
    let interpreter = Interpreter::with_output(out.clone());
    Harness {
        session: Session::with_parts(interpreter, Box::new(MemoryLoader::new())),
        out,
    }
}

impl Harness {
    fn run(&mut self, source: &str) {
        self.session.run(source, "test");
    }

    fn output(&self) -> String {
        String::from_utf8(self.out.borrow().clone()).expect("output should be UTF-8")
    }

    fn static_errors(&self) -> usize {
        self.session.static_errors()
    }
}

#[test]
fn reading_a_local_in_its_own_initializer() {
    let mut h = harness();
    h.run("var a = 1;\n{\n  var a = a;\n  println(a);\n}");
    assert_eq!(h.static_errors(), 1);
}

#[test]
fn return_outside_a_procedure() {
    let mut h = harness();
    h.run("return 1;");
    assert_eq!(h.static_errors(), 1);
}

#[test]
fn return_inside_a_procedure_is_fine() {
    let mut h = harness();
    h.run("proc f() { return 1; }\nprintln(f());");
    assert_eq!(h.static_errors(), 0);
    assert_eq!(h.output(), "1\n");
}

#[test]
fn this_outside_a_class() {
    let mut h = harness();
    h.run("this;");
    assert_eq!(h.static_errors(), 1);

    let mut h = harness();
    h.run("proc f() { return this; }\nf();");
    assert_eq!(h.static_errors(), 1);
}

#[test]
fn super_outside_a_class() {
    let mut h = harness();
    h.run("super.x;");
    assert_eq!(h.static_errors(), 1);
}

#[test]
fn super_in_a_class_without_a_superclass() {
    let mut h = harness();
    h.run("class A { m() { return super.m(); } }");
    assert_eq!(h.static_errors(), 1);
}

#[test]
fn a_class_cannot_inherit_from_itself() {
    let mut h = harness();
    h.run("class A extends A {}");
    assert_eq!(h.static_errors(), 1);
}

#[test]
fn duplicate_declaration_in_one_scope() {
    let mut h = harness();
    h.run("{\n  var a = 1;\n  var a = 2;\n  println(a);\n}");
    assert_eq!(h.static_errors(), 1);
}

#[test]
fn shadowing_across_scopes_is_fine() {
    let mut h = harness();
    h.run("{\n  var a = 1;\n  {\n    var a = 2;\n    println(a);\n  }\n  println(a);\n}");
    assert_eq!(h.static_errors(), 0);
    assert_eq!(h.output(), "2\n1\n");
}

#[test]
fn unused_local_variable() {
    let mut h = harness();
    h.run("{\n  var unused = 1;\n}");
    assert_eq!(h.static_errors(), 1);
}

#[test]
fn unused_parameter() {
    let mut h = harness();
    h.run("proc f(x) { return 1; }\nf(2);");
    assert_eq!(h.static_errors(), 1);
}

#[test]
fn a_bare_write_is_not_a_use() {
    let mut h = harness();
    h.run("{\n  var a = 1;\n  a <- 2;\n}");
    assert_eq!(h.static_errors(), 1);
}

#[test]
fn globals_are_exempt_from_the_unused_check() {
    let mut h = harness();
    h.run("var never_read = 1;");
    assert_eq!(h.static_errors(), 0);
}

#[test]
fn static_errors_suppress_execution() {
    let mut h = harness();
    h.run("println(\"side effect\");\nreturn 1;");
    assert_eq!(h.static_errors(), 1);
    assert_eq!(h.output(), "");
}

#[test]
fn later_runs_are_not_poisoned_by_earlier_errors() {
    let mut h = harness();
    h.run("return 1;");
    assert_eq!(h.static_errors(), 1);

    h.run("println(\"ok\");");
    assert_eq!(h.static_errors(), 1);
    assert_eq!(h.output(), "ok\n");
}
