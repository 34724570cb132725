//! Diagnostics collector shared by every phase of the pipeline.
//!
//! Each phase reports through a [`Reporter`] borrowed from the session: the
//! diagnostic is printed to stderr the moment it is created (so a run with
//! several syntax errors shows all of them, in order) and counted. Static
//! errors (lex/parse/resolve) and runtime errors are counted separately
//! because they drive different exit codes and different suppression rules.

use log::debug;

use crate::error::TrypError;
use crate::token::{Location, Token};

/// Collects and immediately prints diagnostics; owns the "had error" state
/// for a session.
#[derive(Debug, Default)]
pub struct Reporter {
    static_errors: usize,
    runtime_errors: usize,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any error of any taxonomy so far.
    pub fn had_error(&self) -> bool {
        self.static_errors + self.runtime_errors > 0
    }

    pub fn static_errors(&self) -> usize {
        self.static_errors
    }

    pub fn runtime_errors(&self) -> usize {
        self.runtime_errors
    }

    /// Print `err` and count it under the appropriate taxonomy.
    pub fn report(&mut self, err: &TrypError) {
        debug!("reporting diagnostic: {err}");

        eprintln!("{err}");

        if err.is_static() {
            self.static_errors += 1;
        } else {
            self.runtime_errors += 1;
        }
    }

    /// Report a parse error and hand it back for the caller to raise into
    /// the `sync()` recovery path.
    pub fn parse_error(&mut self, loc: &Location, msg: impl Into<String>) -> TrypError {
        let err = TrypError::parse(loc, msg);
        self.report(&err);
        err
    }

    /// Report a parse error of the "Expected X but found Y" shape.
    pub fn expected_but_found(&mut self, expected: &str, found: &Token) -> TrypError {
        self.parse_error(
            &found.loc,
            format!(
                "Expected {expected} but found {}: `{}`",
                found.kind_name(),
                found.text
            ),
        )
    }

    /// Report a resolver error. The resolver never aborts its pass, so
    /// nothing is handed back.
    pub fn resolve_error(&mut self, loc: &Location, msg: impl Into<String>) {
        let err = TrypError::resolve(loc, msg);
        self.report(&err);
    }
}
