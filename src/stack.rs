use std::fmt;

use crate::{
    diagnostics::{Diagnostic, DiagnosticKind, PopcornError, Result},
    token::Token,
};

/// What a pop yields: a resolved value, or the empty-stack sentinel when
/// the stack had nothing left.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(Token),
    EmptyStack,
}

impl Operand {
    pub fn is_empty_stack(&self) -> bool {
        matches!(self, Operand::EmptyStack)
    }

    /// Unwraps the value, reporting underflow on behalf of `function`.
    pub fn into_token(self, function: &str) -> Result<Token> {
        match self {
            Operand::Value(token) => Ok(token),
            Operand::EmptyStack => Err(PopcornError::from(Diagnostic::new(
                DiagnosticKind::StackUnderflow,
                format!("`{function}` popped from an empty stack"),
            ))),
        }
    }
}

impl From<Token> for Operand {
    fn from(token: Token) -> Self {
        Operand::Value(token)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Value(token) => write!(f, "{token}"),
            Operand::EmptyStack => write!(f, "<empty stack>"),
        }
    }
}

/// Value stack of a single line evaluation.
#[derive(Debug, Default)]
pub struct Stack {
    values: Vec<Token>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a resolved value. The empty-stack sentinel and unresolved
    /// references are rejected.
    pub fn push(&mut self, operand: Operand) -> Result<()> {
        match operand {
            Operand::Value(token) if token.is_data() => {
                self.values.push(token);
                Ok(())
            }
            Operand::Value(token) => Err(PopcornError::from(Diagnostic::new(
                DiagnosticKind::InvalidPush,
                format!("cannot push unresolved {} `{token}`", token.type_name()),
            ))),
            Operand::EmptyStack => Err(PopcornError::from(Diagnostic::new(
                DiagnosticKind::InvalidPush,
                "cannot push the empty-stack sentinel",
            ))),
        }
    }

    pub fn pop(&mut self) -> Operand {
        match self.values.pop() {
            Some(token) => Operand::Value(token),
            None => Operand::EmptyStack,
        }
    }

    /// Pops `count` operands, most recent first.
    pub fn pop_many(&mut self, count: usize) -> Vec<Operand> {
        (0..count).map(|_| self.pop()).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bottom-to-top view of the stack.
    pub fn values(&self) -> &[Token] {
        &self.values
    }
}
