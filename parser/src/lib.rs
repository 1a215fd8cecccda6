//! Mino language front end: syntax tree and parser

pub mod custom_error;
pub mod mino_ast;
pub mod mino_parser;

// Re-export diagnostics from the diagnostics crate
pub use diagnostics::*;

pub use diagnostics::mino::MinoDiagnostics;

pub use mino_ast::*;
pub use mino_parser::{parse_mino_file, ParseError, PResult};
