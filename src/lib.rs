//! v4front - single-pass Forth-style compiler front-end for the V4 VM.
//!
//! Translates whitespace-separated source text into a flat little-endian
//! bytecode stream plus a dictionary of compiled words. No execution, no
//! optimization; errors come back as values with source positions.

pub mod compile;
pub mod composites;
pub mod container;
pub mod dict;
pub mod disasm;
pub mod emitter;
pub mod errors;
pub mod lexer;
pub mod opcodes;

pub use compile::{
    compile, compile_named, compile_with_context, compile_with_options, CompileOptions,
    CompiledProgram, Context,
};
pub use dict::{WordEntry, WordKind, DATA_SPACE_BASE};
pub use errors::{error_message, CompileError, ErrorKind};
pub use opcodes::{ImmKind, Op};
