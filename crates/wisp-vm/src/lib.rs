//! The stack-based bytecode VM: compiles and executes Wisp source text.
//!
//! # Modules
//!
//! - `vm`: the dispatch loop, operand stack, globals table, and intern pool
//! - `config`: runtime-tunable knobs (`VmConfig`)

pub mod config;
pub mod vm;

pub use config::VmConfig;
pub use vm::{InterpretError, Vm};
