//! Interpreter for Popcorn, a stack-based postfix scripting language.
//!
//! Source is split into statement lines, each parsed into a nested token
//! sequence and evaluated on its own stack machine against a shared
//! function registry.

pub mod classifier;
pub mod diagnostics;
pub mod lexer;
pub mod machine;
pub mod parser;
pub mod registry;
pub mod repl;
pub mod runtime;
pub mod stack;
pub mod stdlib;
pub mod token;

pub use classifier::classify;
pub use diagnostics::{Diagnostic, DiagnosticKind, PopcornError, SourceSpan};
pub use parser::{parse_line, parse_program, Program};
pub use registry::{FunctionEntry, FunctionRegistry, Output};
pub use repl::Repl;
pub use runtime::{ErrorPolicy, ExecutionConfig, Interpreter, RunReport};
pub use stack::{Operand, Stack};
pub use token::Token;
