use std::collections::VecDeque;

use crate::{
    diagnostics::{Diagnostic, DiagnosticKind, PopcornError, Result},
    registry::{CallContext, Output},
    stack::{Operand, Stack},
    token::Token,
};

/// Evaluates one statement line.
///
/// Tokens are taken from the front of the work stream. Data goes onto the
/// stack; a function call pops its arity and its output is spliced back at
/// the front of the work stream, where it is scanned again. That second
/// scan is what lets user functions and blocks expand into further calls.
pub struct Machine {
    stack: Stack,
    work: VecDeque<Token>,
    step_limit: Option<usize>,
    steps: usize,
}

impl Machine {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            stack: Stack::new(),
            work: tokens.into(),
            step_limit: None,
            steps: 0,
        }
    }

    /// Caps the number of tokens this machine may process.
    pub fn with_step_limit(mut self, limit: Option<usize>) -> Self {
        self.step_limit = limit;
        self
    }

    #[tracing::instrument(level = "debug", skip_all)]
    pub fn run(&mut self, ctx: &mut CallContext<'_>) -> Result<()> {
        while let Some(token) = self.work.pop_front() {
            self.count_step()?;
            tracing::trace!(%token, depth = self.stack.len(), "step");
            match token {
                Token::FunctionRef(name) => {
                    let output = self.call(&name, ctx)?;
                    self.splice(output);
                }
                Token::VariableRef(index) => {
                    return Err(PopcornError::from(Diagnostic::new(
                        DiagnosticKind::UnresolvedReference,
                        format!("unresolved reference `${index}` reached the evaluator"),
                    )));
                }
                value => self.stack.push(Operand::Value(value))?,
            }
        }
        Ok(())
    }

    fn count_step(&mut self) -> Result<()> {
        self.steps += 1;
        match self.step_limit {
            Some(limit) if self.steps > limit => Err(PopcornError::from(
                Diagnostic::new(
                    DiagnosticKind::StepLimit,
                    format!("step limit of {limit} exceeded"),
                )
                .with_note("the line may expand a user function without end"),
            )),
            _ => Ok(()),
        }
    }

    fn call(&mut self, name: &str, ctx: &mut CallContext<'_>) -> Result<Output> {
        let entry = ctx.registry.lookup(name).cloned().ok_or_else(|| {
            PopcornError::from(Diagnostic::new(
                DiagnosticKind::UnknownFunction,
                format!("unknown function `{name}`"),
            ))
        })?;
        let args = self.stack.pop_many(entry.arity);
        tracing::trace!(function = name, arity = entry.arity, "call");
        entry.invoke(ctx, args)
    }

    fn splice(&mut self, output: Output) {
        match output {
            Output::Nothing => {}
            Output::One(token) => self.work.push_front(token),
            Output::Many(tokens) => {
                for token in tokens.into_iter().rev() {
                    self.work.push_front(token);
                }
            }
        }
    }

    pub fn into_stack(self) -> Stack {
        self.stack
    }
}
