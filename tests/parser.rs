use tryp::ast::{Expr, LiteralValue, Stmt, INIT_METHOD};
use tryp::diag::Reporter;
use tryp::lexer::Lexer;
use tryp::parser::{MemoryLoader, ParseCtx, Parser, SourceLoader};
use tryp::printer::AstPrinter;
use tryp::token::{Location, Operator, TokenKind};

/// Parse `source` against `loader`, returning the statements and the number
/// of diagnostics reported.
fn parse_with(loader: &dyn SourceLoader, source: &str) -> (Vec<Stmt>, usize) {
    let mut reporter = Reporter::new();
    let mut next_id = 0;
    let tokens = Lexer::new(source, Location::start("main"))
        .tokenize()
        .expect("test source should lex");

    let statements = {
        let mut ctx = ParseCtx::new(&mut reporter, loader, &mut next_id, "main");
        Parser::new(&mut ctx, tokens).parse()
    };
    (statements, reporter.static_errors())
}

fn parse(source: &str) -> (Vec<Stmt>, usize) {
    parse_with(&MemoryLoader::new(), source)
}

/// The single expression of a one-statement program.
fn parse_expr(source: &str) -> Expr {
    let (stmts, errors) = parse(source);
    assert_eq!(errors, 0, "unexpected parse errors");
    assert_eq!(stmts.len(), 1);
    match stmts.into_iter().next() {
        Some(Stmt::Expression(expr)) => expr,
        other => panic!("expected expression statement, got {other:?}"),
    }
}

#[test]
fn include_splices_statements_in_place() {
    let mut loader = MemoryLoader::new();
    loader.add("lib.tryp", "var x = 1;");

    let (stmts, errors) = parse_with(&loader, "include \"lib.tryp\";\nvar y = 2;");
    assert_eq!(errors, 0);
    assert_eq!(stmts.len(), 2);
    assert!(matches!(&stmts[0], Stmt::Var { name, .. } if name.text == "x"));
    assert!(matches!(&stmts[1], Stmt::Var { name, .. } if name.text == "y"));
}

#[test]
fn nested_includes() {
    let mut loader = MemoryLoader::new();
    loader.add("a.tryp", "include \"b.tryp\";\nvar a = 1;");
    loader.add("b.tryp", "var b = 2;");

    let (stmts, errors) = parse_with(&loader, "include \"a.tryp\";");
    assert_eq!(errors, 0);
    assert_eq!(stmts.len(), 2);
    assert!(matches!(&stmts[0], Stmt::Var { name, .. } if name.text == "b"));
}

#[test]
fn duplicate_include_is_an_error() {
    let mut loader = MemoryLoader::new();
    loader.add("lib.tryp", "var x = 1;");

    let (stmts, errors) = parse_with(&loader, "include \"lib.tryp\";\ninclude \"lib.tryp\";");
    assert_eq!(errors, 1);
    // The first include still contributed its statements.
    assert_eq!(stmts.len(), 1);
}

#[test]
fn a_file_including_itself_is_an_error() {
    let mut loader = MemoryLoader::new();
    let source = "var x = 1;\ninclude \"main\";";
    loader.add("main", source);

    let (stmts, errors) = parse_with(&loader, source);
    assert_eq!(errors, 1);
    // The include is rejected without splicing a second copy of the file.
    assert_eq!(stmts.len(), 1);
    assert!(matches!(&stmts[0], Stmt::Var { name, .. } if name.text == "x"));
}

#[test]
fn missing_include_is_an_error() {
    let (_, errors) = parse("include \"nope.tryp\";");
    assert_eq!(errors, 1);
}

#[test]
fn recovery_continues_at_the_next_statement() {
    let (stmts, errors) = parse("var = 1;\nvar ok = 2;");
    assert_eq!(errors, 1);
    assert_eq!(stmts.len(), 1);
    assert!(matches!(&stmts[0], Stmt::Var { name, .. } if name.text == "ok"));
}

#[test]
fn one_pass_reports_every_error() {
    let (stmts, errors) = parse("var = 1;\nvar = 2;\nvar z = 3;");
    assert_eq!(errors, 2);
    assert_eq!(stmts.len(), 1);
    assert!(matches!(&stmts[0], Stmt::Var { name, .. } if name.text == "z"));
}

#[test]
fn invalid_assignment_targets() {
    let (_, errors) = parse("1 <- 2;");
    assert_eq!(errors, 1);

    let (_, errors) = parse("(a) <- 3;");
    assert_eq!(errors, 1);

    let (_, errors) = parse("a + b <- 3;");
    assert_eq!(errors, 1);
}

#[test]
fn compound_assignment_desugars_to_plain_assignment() {
    let expr = parse_expr("x += 2;");
    let Expr::Assign { name, value, .. } = expr else {
        panic!("expected assignment");
    };
    assert_eq!(name.text, "x");

    let Expr::Binary { left, operator, right } = *value else {
        panic!("expected desugared binary rhs");
    };
    assert_eq!(operator.kind, TokenKind::Operator(Operator::Plus));
    assert!(matches!(*left, Expr::Variable { ref name, .. } if name.text == "x"));
    assert!(matches!(
        *right,
        Expr::Literal(LiteralValue::Number(n)) if n == 2.0
    ));
}

#[test]
fn compound_assignment_on_a_property_becomes_set() {
    let expr = parse_expr("o.n *= 3;");
    let Expr::Set { name, value, .. } = expr else {
        panic!("expected property set");
    };
    assert_eq!(name.text, "n");
    assert!(matches!(*value, Expr::Binary { .. }));
}

#[test]
fn assignment_is_right_associative() {
    let expr = parse_expr("a <- b <- 1;");
    let Expr::Assign { name, value, .. } = expr else {
        panic!("expected assignment");
    };
    assert_eq!(name.text, "a");
    assert!(matches!(*value, Expr::Assign { ref name, .. } if name.text == "b"));
}

#[test]
fn ternary_expression() {
    let expr = parse_expr("a ? b : c;");
    let Expr::Ternary { condition, .. } = expr else {
        panic!("expected ternary");
    };
    assert!(matches!(*condition, Expr::Variable { ref name, .. } if name.text == "a"));
}

#[test]
fn comma_builds_a_compound_expression() {
    let expr = parse_expr("1, 2, 3;");
    let Expr::Compound(exprs) = expr else {
        panic!("expected compound");
    };
    assert_eq!(exprs.len(), 3);
}

#[test]
fn commas_in_argument_lists_separate_arguments() {
    let expr = parse_expr("f(1, 2);");
    let Expr::Call { args, .. } = expr else {
        panic!("expected call");
    };
    assert_eq!(args.len(), 2);
    assert!(!matches!(args[0], Expr::Compound(_)));
}

#[test]
fn for_desugars_to_while() {
    let (stmts, errors) = parse("for (var i = 0; i < 3; i += 1) { i; }");
    assert_eq!(errors, 0);
    assert_eq!(stmts.len(), 1);

    let Stmt::Block(parts) = &stmts[0] else {
        panic!("expected wrapping block");
    };
    assert!(matches!(&parts[0], Stmt::Var { name, .. } if name.text == "i"));
    let Stmt::While { body, .. } = &parts[1] else {
        panic!("expected while");
    };
    // Loop body runs the written body, then the update.
    let Stmt::Block(loop_body) = body.as_ref() else {
        panic!("expected loop body block");
    };
    assert_eq!(loop_body.len(), 2);
}

#[test]
fn for_without_condition_loops_on_true() {
    let (stmts, errors) = parse("for (;;) { 1; }");
    assert_eq!(errors, 0);
    let Stmt::While { condition, .. } = &stmts[0] else {
        panic!("expected bare while");
    };
    assert!(matches!(condition, Expr::Literal(LiteralValue::True)));
}

#[test]
fn constructor_is_renamed_at_parse_time() {
    let (stmts, errors) = parse("class Point { Point(x, y) { this.x <- x, this.y <- y; } }");
    assert_eq!(errors, 0);
    let Stmt::Class { methods, .. } = &stmts[0] else {
        panic!("expected class");
    };
    assert_eq!(methods[0].name.text, INIT_METHOD);
    assert!(methods[0].is_initializer());
}

#[test]
fn static_methods_are_flagged() {
    let (stmts, errors) = parse("class M { static id(x) { return x; } plain() { return 1; } }");
    assert_eq!(errors, 0);
    let Stmt::Class { methods, .. } = &stmts[0] else {
        panic!("expected class");
    };
    assert!(methods[0].is_static);
    assert!(!methods[1].is_static);
}

#[test]
fn lambda_expression() {
    let (stmts, errors) = parse("var f = \\ (a, b) -> { return a + b; };");
    assert_eq!(errors, 0);
    let Stmt::Var { initializer, .. } = &stmts[0] else {
        panic!("expected var");
    };
    let Some(Expr::Lambda(decl)) = initializer else {
        panic!("expected lambda initializer");
    };
    assert_eq!(decl.params.len(), 2);
    assert!(!decl.is_static);
}

#[test]
fn super_requires_a_method_name() {
    let (_, errors) = parse("class B extends A { m() { return super; } }");
    assert!(errors >= 1);
}

#[test]
fn printer_renders_prefix_form() {
    let (stmts, errors) = parse("var x = 1 + 2 * 3;");
    assert_eq!(errors, 0);
    let rendered = AstPrinter::new().print(&stmts);
    assert_eq!(rendered, "(var x (+ 1 (* 2 3)))\n");
}

#[test]
fn printer_renders_assignment_and_calls() {
    let (stmts, errors) = parse("x <- f(1, y);");
    assert_eq!(errors, 0);
    let rendered = AstPrinter::new().print(&stmts);
    assert_eq!(rendered, "(expr (<- x (call f 1 y)))\n");
}
