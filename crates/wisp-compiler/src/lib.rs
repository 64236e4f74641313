//! Single-pass Pratt-parsing compiler: turns Wisp source text directly
//! into a `wisp_core::Chunk`, with no intermediate AST.
//!
//! # Modules
//!
//! - `scanner`: lazy one-token-lookahead tokenizer
//! - `compiler`: the Pratt parser and bytecode emitter

pub mod compiler;
pub mod scanner;

pub use compiler::{CompileError, compile};
pub use scanner::{Scanner, Token, TokenKind};
