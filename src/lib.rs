pub mod ast;
pub mod diag;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod native;
pub mod parser;
pub mod printer;
pub mod resolver;
pub mod session;
pub mod token;
pub mod value;
