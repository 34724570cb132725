//! A session ties the pipeline together: lex, parse, resolve, interpret.
//!
//! The session is the unit of state that survives between `run` calls: one
//! interpreter (globals, resolved locals), one reporter (error counts), one
//! node id counter. A script run uses a session for a single call; the REPL
//! reuses one across inputs so definitions persist.
//!
//! Each phase gates the next on the *static* error count: if lexing,
//! parsing or resolving added diagnostics, the program never executes.
//! Runtime errors abort only the current `run`.

use log::info;

use crate::interpreter::Interpreter;
use crate::lexer::Lexer;
use crate::parser::{FsLoader, ParseCtx, Parser, SourceLoader};
use crate::resolver::Resolver;
use crate::token::Location;
use crate::value::Value;
use crate::diag::Reporter;

pub struct Session {
    interpreter: Interpreter,
    reporter: Reporter,
    loader: Box<dyn SourceLoader>,
    next_expr_id: u32,
}

impl Session {
    pub fn new() -> Self {
        Self::with_parts(Interpreter::new(), Box::new(FsLoader))
    }

    /// A session with a custom interpreter (e.g. captured output) and
    /// include loader. Tests build their harness through this.
    pub fn with_parts(interpreter: Interpreter, loader: Box<dyn SourceLoader>) -> Self {
        Self {
            interpreter,
            reporter: Reporter::new(),
            loader,
            next_expr_id: 0,
        }
    }

    /// Run one source text under the display name `name` (a path, or a
    /// sentinel like `<stdin>`). Diagnostics print as they occur; the
    /// return value is the final top-level expression's value when the run
    /// executed cleanly, for the REPL to echo.
    pub fn run(&mut self, source: &str, name: &str) -> Option<Value> {
        info!("running `{name}`");
        let static_before = self.reporter.static_errors();

        let tokens = match Lexer::new(source, Location::start(name)).tokenize() {
            Ok(tokens) => tokens,
            Err(e) => {
                self.reporter.report(&e);
                return None;
            }
        };

        let statements = {
            let mut ctx = ParseCtx::new(
                &mut self.reporter,
                self.loader.as_ref(),
                &mut self.next_expr_id,
                name,
            );
            Parser::new(&mut ctx, tokens).parse()
        };
        if self.reporter.static_errors() > static_before {
            return None;
        }

        Resolver::new(&mut self.interpreter, &mut self.reporter).resolve(&statements);
        if self.reporter.static_errors() > static_before {
            return None;
        }

        match self.interpreter.interpret(&statements) {
            Ok(last) => last,
            Err(e) => {
                self.reporter.report(&e);
                None
            }
        }
    }

    pub fn had_error(&self) -> bool {
        self.reporter.had_error()
    }

    pub fn static_errors(&self) -> usize {
        self.reporter.static_errors()
    }

    pub fn runtime_errors(&self) -> usize {
        self.reporter.runtime_errors()
    }

    /// Read a global from the interpreter; the observation seam for tests.
    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.interpreter.get_global(name)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
