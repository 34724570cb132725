use tryp::lexer::Lexer;
use tryp::token::{Location, Operator, Token, TokenKind};

fn lex(source: &str) -> Vec<Token> {
    Lexer::new(source, Location::start("test"))
        .tokenize()
        .expect("source should lex cleanly")
}

fn kinds(source: &str) -> Vec<TokenKind> {
    lex(source).into_iter().map(|t| t.kind).collect()
}

fn lex_err(source: &str) -> String {
    Lexer::new(source, Location::start("test"))
        .tokenize()
        .expect_err("source should fail to lex")
        .to_string()
}

#[test]
fn arrow_is_not_less_minus() {
    assert_eq!(
        kinds("a <- b < -c"),
        vec![
            TokenKind::Identifier,
            TokenKind::Operator(Operator::LeftArrow),
            TokenKind::Identifier,
            TokenKind::Operator(Operator::Less),
            TokenKind::Operator(Operator::Minus),
            TokenKind::Identifier,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn compound_operators_win_over_singles() {
    assert_eq!(
        kinds("x += 1; y >= 2"),
        vec![
            TokenKind::Identifier,
            TokenKind::Operator(Operator::PlusEqual),
            TokenKind::Number(1.0),
            TokenKind::Operator(Operator::Semicolon),
            TokenKind::Identifier,
            TokenKind::Operator(Operator::GreaterEqual),
            TokenKind::Number(2.0),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn lambda_tokens() {
    assert_eq!(
        kinds("\\ (a) -> {}"),
        vec![
            TokenKind::Operator(Operator::Backslash),
            TokenKind::Operator(Operator::OpenParen),
            TokenKind::Identifier,
            TokenKind::Operator(Operator::CloseParen),
            TokenKind::Operator(Operator::RightArrow),
            TokenKind::Operator(Operator::OpenCurly),
            TokenKind::Operator(Operator::CloseCurly),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn underscores_in_numbers_are_stripped() {
    let tokens = lex("1_000_000");
    assert_eq!(tokens[0].kind, TokenKind::Number(1_000_000.0));
    // Raw lexeme keeps the underscores.
    assert_eq!(tokens[0].text, "1_000_000");
}

#[test]
fn fractional_numbers() {
    assert_eq!(kinds("3.25")[0], TokenKind::Number(3.25));
    assert_eq!(kinds("0.5")[0], TokenKind::Number(0.5));
}

#[test]
fn malformed_number_is_an_error() {
    let msg = lex_err("1.2.3");
    assert!(msg.contains("Invalid number"), "got: {msg}");
    assert!(msg.contains("1.2.3"), "got: {msg}");
}

#[test]
fn bang_is_an_identifier_character() {
    let tokens = lex("empty!");
    assert_eq!(tokens[0].kind, TokenKind::Identifier);
    assert_eq!(tokens[0].text, "empty!");

    // At token start `!` is still the operator.
    assert_eq!(
        kinds("!empty"),
        vec![
            TokenKind::Operator(Operator::Bang),
            TokenKind::Identifier,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn digits_do_not_continue_identifiers() {
    let tokens = lex("x1");
    assert_eq!(tokens[0].kind, TokenKind::Identifier);
    assert_eq!(tokens[0].text, "x");
    assert_eq!(tokens[1].kind, TokenKind::Number(1.0));
}

#[test]
fn keywords_are_classified() {
    for source in [
        "class", "else", "extends", "false", "for", "if", "include", "nil", "proc", "return",
        "static", "super", "this", "true", "var", "while",
    ] {
        assert!(
            matches!(kinds(source)[0], TokenKind::Keyword(_)),
            "`{source}` should be a keyword"
        );
    }
    assert_eq!(kinds("classes")[0], TokenKind::Identifier);
}

#[test]
fn string_escapes() {
    let tokens = lex(r#""a\nb\t\"c\\""#);
    assert_eq!(tokens[0].kind, TokenKind::Str("a\nb\t\"c\\".to_string()));
}

#[test]
fn string_may_span_lines() {
    let tokens = lex("\"two\nlines\"");
    assert_eq!(tokens[0].kind, TokenKind::Str("two\nlines".to_string()));
}

#[test]
fn unknown_escape_is_an_error() {
    let msg = lex_err(r#""bad \q escape""#);
    assert!(msg.contains("Invalid escape sequence"), "got: {msg}");
}

#[test]
fn unclosed_string_is_an_error() {
    let msg = lex_err("\"never ends");
    assert!(msg.contains("Unclosed string literal"), "got: {msg}");
}

#[test]
fn unterminated_block_comment_is_an_error() {
    let msg = lex_err("var x = 1; /* no end");
    assert!(msg.contains("Unterminated block comment"), "got: {msg}");
}

#[test]
fn comments_are_skipped() {
    assert_eq!(
        kinds("1 // rest of line\n2 /* span\nlines */ 3"),
        vec![
            TokenKind::Number(1.0),
            TokenKind::Number(2.0),
            TokenKind::Number(3.0),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn locations_track_lines_and_columns() {
    let tokens = lex("ab\n  cd");
    assert_eq!((tokens[0].loc.line, tokens[0].loc.col), (1, 1));
    assert_eq!((tokens[1].loc.line, tokens[1].loc.col), (2, 3));
    assert_eq!(tokens[0].loc.to_string(), "test:1:1");
}

#[test]
fn line_comment_does_not_lose_the_newline() {
    let tokens = lex("a // comment\nb");
    assert_eq!((tokens[1].loc.line, tokens[1].loc.col), (2, 1));
}

#[test]
fn block_comment_counts_newlines() {
    let tokens = lex("/* one\ntwo\nthree */ x");
    assert_eq!(tokens[0].loc.line, 3);
}

#[test]
fn exactly_one_eof() {
    let tokens = lex("");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::Eof);

    let eofs = lex("1 + 2")
        .iter()
        .filter(|t| t.kind == TokenKind::Eof)
        .count();
    assert_eq!(eofs, 1);
}

#[test]
fn stray_character_is_an_error() {
    let msg = lex_err("var x = #;");
    assert!(msg.contains("Unexpected character"), "got: {msg}");
    assert!(msg.contains("ERROR"), "got: {msg}");
}
