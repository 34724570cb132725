//! Centralised error hierarchy for the Tryp interpreter.
//!
//! All subsystems (lexer, parser, resolver, runtime, CLI) convert their
//! failure modes into one of the variants defined here, giving a uniform
//! `Result<T>` alias throughout the crate and ergonomic inter-operation with
//! `anyhow` in the driver.
//!
//! The `Display` impls are the crate's stable diagnostic contract:
//! `<name>:<line>:<col>: <SEVERITY>: <message>`. Printing is the
//! [`crate::diag::Reporter`]'s job; this module never writes anywhere.

use std::io;
use thiserror::Error;

use crate::token::Location;

/// Canonical error type used throughout the interpreter.
///
/// The three static taxonomies (lex, parse, resolve) and the runtime one are
/// deliberately separate variants: a runtime error never masquerades as a
/// syntax error and vice versa.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrypError {
    /// Lexical error: malformed literal, bad escape, stray input.
    #[error("{loc}: ERROR: {message}")]
    Lex { loc: Location, message: String },

    /// Syntactic (parser) error.
    #[error("{loc}: ERROR: {message}")]
    Parse { loc: Location, message: String },

    /// Static-analysis failure from the resolver pass.
    #[error("{loc}: ERROR: {message}")]
    Resolve { loc: Location, message: String },

    /// Runtime evaluation error.
    #[error("{loc}: RUNTIME ERROR: {message}")]
    Runtime { loc: Location, message: String },

    /// Wrapper around `std::io::Error`; enables `?` on native I/O.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl TrypError {
    /// Helper constructor for the **lexer**.
    pub fn lex<S: Into<String>>(loc: &Location, msg: S) -> Self {
        TrypError::Lex {
            loc: loc.clone(),
            message: msg.into(),
        }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(loc: &Location, msg: S) -> Self {
        TrypError::Parse {
            loc: loc.clone(),
            message: msg.into(),
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(loc: &Location, msg: S) -> Self {
        TrypError::Resolve {
            loc: loc.clone(),
            message: msg.into(),
        }
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime<S: Into<String>>(loc: &Location, msg: S) -> Self {
        TrypError::Runtime {
            loc: loc.clone(),
            message: msg.into(),
        }
    }

    /// True for the statically detected taxonomies (lex/parse/resolve).
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            TrypError::Lex { .. } | TrypError::Parse { .. } | TrypError::Resolve { .. }
        )
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, TrypError>;
