use serde::Serialize;
use std::fmt;
use std::rc::Rc;

/// A position in a source file: display name, 1-based line and column.
///
/// The lexer mutates its own cursor `Location` while scanning; every token
/// receives a *copy* taken at the token's first character, so later cursor
/// movement never retroactively alters an emitted token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    /// File path, or a sentinel such as `<stdin>`.
    pub file: Rc<str>,

    /// 1-based line number.
    pub line: u32,

    /// 1-based column number.
    pub col: u32,
}

impl Location {
    /// Location of the first character of a source named `file`.
    pub fn start(file: &str) -> Self {
        Self {
            file: Rc::from(file),
            line: 1,
            col: 1,
        }
    }

    /// Advance past one character.
    #[inline]
    pub fn advance(&mut self, ch: char) {
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

/// Every operator Tryp recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operator {
    /// `<-` (assignment)
    LeftArrow,
    /// `->` (lambda body introducer)
    RightArrow,
    GreaterEqual,
    LessEqual,
    EqualEqual,
    BangEqual,
    AndAnd,
    OrOr,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,
    Greater,
    Less,
    /// `=` (only legal in `var` initializers)
    Equal,
    Bang,
    Minus,
    Plus,
    Slash,
    Star,
    Percent,
    OpenCurly,
    CloseCurly,
    OpenParen,
    CloseParen,
    Semicolon,
    Comma,
    /// `\` (lambda introducer)
    Backslash,
    Dot,
    Question,
    Colon,
}

/// Fixed operator table. Must stay in decreasing order of text length so the
/// lexer's first `starts_with` hit is the longest match (`>=` before `>`,
/// `<-` before `<`).
pub const OPERATORS: &[(&str, Operator)] = &[
    ("<-", Operator::LeftArrow),
    ("->", Operator::RightArrow),
    (">=", Operator::GreaterEqual),
    ("<=", Operator::LessEqual),
    ("==", Operator::EqualEqual),
    ("!=", Operator::BangEqual),
    ("&&", Operator::AndAnd),
    ("||", Operator::OrOr),
    ("+=", Operator::PlusEqual),
    ("-=", Operator::MinusEqual),
    ("*=", Operator::StarEqual),
    ("/=", Operator::SlashEqual),
    ("%=", Operator::PercentEqual),
    (">", Operator::Greater),
    ("<", Operator::Less),
    ("=", Operator::Equal),
    ("!", Operator::Bang),
    ("-", Operator::Minus),
    ("+", Operator::Plus),
    ("/", Operator::Slash),
    ("*", Operator::Star),
    ("%", Operator::Percent),
    ("{", Operator::OpenCurly),
    ("}", Operator::CloseCurly),
    ("(", Operator::OpenParen),
    (")", Operator::CloseParen),
    (";", Operator::Semicolon),
    (",", Operator::Comma),
    ("\\", Operator::Backslash),
    (".", Operator::Dot),
    ("?", Operator::Question),
    (":", Operator::Colon),
];

impl Operator {
    /// Source text of this operator.
    pub fn text(self) -> &'static str {
        OPERATORS
            .iter()
            .find(|(_, op)| *op == self)
            .map(|(text, _)| *text)
            .unwrap_or("")
    }

    /// For compound-assignment operators, the plain operator they desugar
    /// to (`+=` -> `+`), otherwise `None`.
    pub fn compound_base(self) -> Option<Operator> {
        match self {
            Operator::PlusEqual => Some(Operator::Plus),
            Operator::MinusEqual => Some(Operator::Minus),
            Operator::StarEqual => Some(Operator::Star),
            Operator::SlashEqual => Some(Operator::Slash),
            Operator::PercentEqual => Some(Operator::Percent),
            _ => None,
        }
    }
}

/// Every reserved word in Tryp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Keyword {
    Class,
    Else,
    Extends,
    False,
    For,
    If,
    Include,
    Nil,
    Proc,
    Return,
    Static,
    Super,
    This,
    True,
    Var,
    While,
}

/// The kind of a scanned token, with the literal payload where one exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TokenKind {
    /// A user-defined name.
    Identifier,

    /// A reserved word, resolved through the keyword table.
    Keyword(Keyword),

    /// An operator, resolved through the operator table.
    Operator(Operator),

    /// A numeric literal (underscores already stripped).
    Number(f64),

    /// A string literal; the payload is the unescaped contents, while the
    /// token's `text` keeps the raw lexeme including quotes.
    Str(String),

    /// End-of-input marker; exactly one per token stream.
    Eof,
}

/// A scanned token: kind, exact source text, and the location of its first
/// character.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub loc: Location,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, loc: Location) -> Self {
        Self {
            kind,
            text: text.into(),
            loc,
        }
    }

    /// Human-readable name of this token's kind, used in "expected X but
    /// found Y" diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            TokenKind::Identifier => "identifier",
            TokenKind::Keyword(_) => "keyword",
            TokenKind::Operator(_) => "operator",
            TokenKind::Number(_) => "number",
            TokenKind::Str(_) => "string literal",
            TokenKind::Eof => "end of input",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} `{}`", self.loc, self.kind_name(), self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_table_is_longest_first() {
        let mut prev = usize::MAX;
        for (text, _) in OPERATORS {
            assert!(
                text.len() <= prev,
                "operator `{text}` breaks the longest-first ordering"
            );
            prev = text.len();
        }
    }

    #[test]
    fn location_display() {
        let loc = Location {
            file: Rc::from("hello.tryp"),
            line: 3,
            col: 14,
        };
        assert_eq!(loc.to_string(), "hello.tryp:3:14");
    }
}
