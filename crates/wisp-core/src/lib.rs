//! Wisp Core: the runtime data model shared by the compiler and the VM.
//!
//! This crate is deliberately small and has no knowledge of parsing or
//! dispatch. It provides the four building blocks the rest of the
//! interpreter is built from:
//!
//! - `value`: the dynamically-typed `Value` enum (bool, none, number, object
//!   reference) and value equality.
//! - `object`: heap-allocated objects, currently only interned strings.
//! - `table`: an open-addressed hash table with tombstone deletion, used
//!   both for string interning and for global variables.
//! - `intern`: the string intern pool shared by the compiler and the VM.
//! - `chunk`: the bytecode container (instructions, line map, constant
//!   pool) plus the `OpCode` enum.
//!
//! # Modules
//!
//! - `value`: `Value`, `values_equal`, `is_falsey`, `format_number`
//! - `object`: `Obj`, `ObjString`, `ObjRef`, `fnv1a`
//! - `table`: `Table`
//! - `intern`: `Interner`
//! - `chunk`: `Chunk`, `OpCode`, `MAX_CONSTANTS`

pub mod chunk;
pub mod intern;
pub mod object;
pub mod table;
pub mod value;

pub use chunk::{Chunk, MAX_CONSTANTS, OpCode};
pub use intern::Interner;
pub use object::{Obj, ObjRef, ObjString, fnv1a};
pub use table::Table;
pub use value::{Value, format_number, is_falsey, values_equal};
