//! One-pass lexer for Tryp source text.
//!
//! [`Lexer::new`] takes the source and the starting [`Location`] (so included
//! files report diagnostics under their own name) and [`Lexer::tokenize`]
//! produces the full token vector, terminated by exactly one `Eof` token.
//!
//! Classification order per token:
//!
//! 1. skip whitespace, `//` line comments (fast-forwarded with `memchr`) and
//!    `/* ... */` block comments (newlines counted);
//! 2. operator text matched against [`OPERATORS`], which is ordered
//!    longest-first so `>=` wins over `>` and `<-` over `<`;
//! 3. a leading digit starts a number literal: a run of digits, `.` and `_`,
//!    with `_` stripped before the `f64` parse;
//! 4. `"` starts a string literal with escapes `\n \t \" \\`, allowed to
//!    span lines;
//! 5. anything else consumes a maximal run of identifier characters
//!    (`[A-Za-z_!]`) and is a keyword iff it appears in the `phf` keyword
//!    table, else an identifier.
//!
//! The lexer has no recovery: the first fatal condition (unterminated
//! string or block comment, bad escape, malformed number, stray character)
//! is returned as a `TrypError::Lex` and the caller decides what to do.

use log::{debug, info};
use memchr::memchr;
use phf::phf_map;

use crate::error::{Result, TrypError};
use crate::token::{Keyword, Location, Token, TokenKind, OPERATORS};

/// Compile-time perfect hash of the reserved words.
static KEYWORDS: phf::Map<&'static str, Keyword> = phf_map! {
    "class"   => Keyword::Class,
    "else"    => Keyword::Else,
    "extends" => Keyword::Extends,
    "false"   => Keyword::False,
    "for"     => Keyword::For,
    "if"      => Keyword::If,
    "include" => Keyword::Include,
    "nil"     => Keyword::Nil,
    "proc"    => Keyword::Proc,
    "return"  => Keyword::Return,
    "static"  => Keyword::Static,
    "super"   => Keyword::Super,
    "this"    => Keyword::This,
    "true"    => Keyword::True,
    "var"     => Keyword::Var,
    "while"   => Keyword::While,
};

/// Identifier characters. Note `!` is legal inside identifiers (`empty!`),
/// while digits are not: `x1` lexes as `x` followed by `1`.
#[inline]
fn is_identifier_char(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '!'
}

pub struct Lexer<'src> {
    source: &'src str,
    pos: usize, // byte offset into `source`
    loc: Location,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str, start: Location) -> Self {
        info!("Lexer created over {} bytes ({})", source.len(), start.file);

        Self {
            source,
            pos: 0,
            loc: start,
        }
    }

    /// Scan the whole input. Fails on the first lexical error.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        while let Some(token) = self.next_token()? {
            debug!("scanned {token}");
            tokens.push(token);
        }

        tokens.push(Token::new(TokenKind::Eof, "", self.loc.clone()));
        Ok(tokens)
    }

    // ───────────────────────── primitive helpers ────────────────────────

    #[inline]
    fn rest(&self) -> &'src str {
        &self.source[self.pos..]
    }

    #[inline]
    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Consume one character, keeping the cursor location in sync.
    #[inline]
    fn bump(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.pos += ch.len_utf8();
        self.loc.advance(ch);
        Some(ch)
    }

    // ───────────────────────────── core lexing ──────────────────────────

    fn next_token(&mut self) -> Result<Option<Token>> {
        loop {
            self.skip_whitespace();

            let rest = self.rest();
            if rest.is_empty() {
                return Ok(None);
            }
            if rest.starts_with("//") {
                self.skip_line_comment();
                continue;
            }
            if rest.starts_with("/*") {
                self.skip_block_comment()?;
                continue;
            }
            break;
        }

        // Token location is fixed at its first character, before the cursor
        // moves on.
        let start = self.loc.clone();
        let rest = self.rest();

        // Operators first, longest match first (table ordering). A word
        // can *contain* `!` but one at token start is always the operator.
        for (text, op) in OPERATORS {
            if rest.starts_with(text) {
                for _ in 0..text.len() {
                    self.bump();
                }
                return Ok(Some(Token::new(TokenKind::Operator(*op), *text, start)));
            }
        }

        match self.peek_char() {
            Some(ch) if ch.is_ascii_digit() => self.lex_number(start).map(Some),
            Some('"') => self.lex_string(start).map(Some),
            Some(ch) if is_identifier_char(ch) => Ok(Some(self.lex_word(start))),
            Some(ch) => Err(TrypError::lex(
                &start,
                format!("Unexpected character `{ch}`"),
            )),
            None => unreachable!("guarded by the emptiness check above"),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek_char(), Some(ch) if ch.is_whitespace()) {
            self.bump();
        }
    }

    /// Fast-forward past `// ...`, leaving the terminating newline for
    /// `skip_whitespace` to account for.
    fn skip_line_comment(&mut self) {
        let rest = self.rest();
        match memchr(b'\n', rest.as_bytes()) {
            Some(idx) => {
                self.loc.col += rest[..idx].chars().count() as u32;
                self.pos += idx;
            }
            None => {
                self.loc.col += rest.chars().count() as u32;
                self.pos = self.source.len();
            }
        }
    }

    /// Skip `/* ... */`, counting embedded newlines. Unterminated comments
    /// are a lex error at the opening delimiter.
    fn skip_block_comment(&mut self) -> Result<()> {
        let start = self.loc.clone();
        self.bump();
        self.bump();

        loop {
            if self.rest().starts_with("*/") {
                self.bump();
                self.bump();
                return Ok(());
            }
            if self.bump().is_none() {
                return Err(TrypError::lex(&start, "Unterminated block comment"));
            }
        }
    }

    /// Number literal: digits, dots and `_`. Underscores are stripped, not
    /// validated for placement; anything the `f64` parser rejects after
    /// stripping (e.g. `1.2.3`) is a lex error naming the raw lexeme.
    fn lex_number(&mut self, start: Location) -> Result<Token> {
        let begin = self.pos;
        while matches!(self.peek_char(), Some(c) if c.is_ascii_digit() || c == '.' || c == '_') {
            self.bump();
        }

        let text = &self.source[begin..self.pos];
        let digits: String = text.chars().filter(|&c| c != '_').collect();
        let value: f64 = digits
            .parse()
            .map_err(|_| TrypError::lex(&start, format!("Invalid number: `{text}`")))?;

        Ok(Token::new(TokenKind::Number(value), text, start))
    }

    fn lex_string(&mut self, start: Location) -> Result<Token> {
        let begin = self.pos;
        self.bump(); // opening quote

        let mut value = String::new();
        loop {
            let esc_loc = self.loc.clone();
            let Some(ch) = self.bump() else {
                return Err(TrypError::lex(&start, "Unclosed string literal"));
            };

            match ch {
                '"' => break,
                '\\' => {
                    let Some(esc) = self.bump() else {
                        return Err(TrypError::lex(&start, "Unclosed string literal"));
                    };
                    value.push(match esc {
                        'n' => '\n',
                        't' => '\t',
                        '"' => '"',
                        '\\' => '\\',
                        other => {
                            return Err(TrypError::lex(
                                &esc_loc,
                                format!("Invalid escape sequence `\\{other}`"),
                            ))
                        }
                    });
                }
                other => value.push(other),
            }
        }

        let text = &self.source[begin..self.pos];
        Ok(Token::new(TokenKind::Str(value), text, start))
    }

    fn lex_word(&mut self, start: Location) -> Token {
        let begin = self.pos;
        while matches!(self.peek_char(), Some(c) if is_identifier_char(c)) {
            self.bump();
        }

        let text = &self.source[begin..self.pos];
        match KEYWORDS.get(text) {
            Some(kw) => Token::new(TokenKind::Keyword(*kw), text, start),
            None => Token::new(TokenKind::Identifier, text, start),
        }
    }
}
