use std::io::{self, BufRead, Write};

use crate::{
    diagnostics::{PopcornError, Result},
    machine::Machine,
    parser::{self, Program},
    registry::{CallContext, FunctionRegistry},
    stack::Stack,
    token::Token,
};

/// What the driver does after a statement line fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Report the failure and run the next line.
    #[default]
    Continue,
    /// Stop the program at the first failing line.
    Halt,
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionConfig {
    pub error_policy: ErrorPolicy,
    /// Upper bound on tokens processed per line; `None` is unbounded.
    pub step_limit: Option<usize>,
}

#[derive(Debug)]
pub struct LineFailure {
    pub line: usize,
    pub error: PopcornError,
}

/// Outcome of running a whole program.
#[derive(Debug, Default)]
pub struct RunReport {
    pub lines_run: usize,
    pub failures: Vec<LineFailure>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Program driver: owns the function registry and the host streams, and
/// runs every statement line on a fresh stack machine.
pub struct Interpreter {
    registry: FunctionRegistry,
    config: ExecutionConfig,
    output: Box<dyn Write>,
    input: Box<dyn BufRead>,
    errors: Box<dyn Write>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(ExecutionConfig::default())
    }

    pub fn with_config(config: ExecutionConfig) -> Self {
        Self {
            registry: FunctionRegistry::with_builtins(),
            config,
            output: Box::new(io::stdout()),
            input: Box::new(io::BufReader::new(io::stdin())),
            errors: Box::new(io::stderr()),
        }
    }

    /// Replaces the streams used by `print`, `read` and failure reports.
    pub fn with_io(
        mut self,
        output: Box<dyn Write>,
        input: Box<dyn BufRead>,
        errors: Box<dyn Write>,
    ) -> Self {
        self.output = output;
        self.input = input;
        self.errors = errors;
        self
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.registry
    }

    /// Parses and runs `source`. A parse error aborts before any line runs;
    /// runtime failures are collected in the report.
    pub fn eval_source(&mut self, source: &str) -> Result<RunReport> {
        let program = parser::parse_program(source)?;
        Ok(self.run_program(&program))
    }

    #[tracing::instrument(level = "debug", skip_all, fields(lines = program.lines.len()))]
    pub fn run_program(&mut self, program: &Program) -> RunReport {
        let mut report = RunReport::default();
        for line in &program.lines {
            report.lines_run += 1;
            tracing::debug!(line = line.number, tokens = line.tokens.len(), "run line");
            if let Err(error) = self.eval_line(line.tokens.clone()) {
                tracing::warn!(line = line.number, %error, "line failed");
                // The report still carries the failure if the sink is gone.
                let _ = writeln!(self.errors, "line {}: {error}", line.number);
                report.failures.push(LineFailure {
                    line: line.number,
                    error,
                });
                if self.config.error_policy == ErrorPolicy::Halt {
                    break;
                }
            }
        }
        let _ = self.output.flush();
        report
    }

    /// Runs one statement line on a fresh machine and returns what was left
    /// on its stack.
    pub fn eval_line(&mut self, tokens: Vec<Token>) -> Result<Stack> {
        let mut machine = Machine::new(tokens).with_step_limit(self.config.step_limit);
        let mut ctx = CallContext {
            registry: &mut self.registry,
            output: &mut *self.output,
            input: &mut *self.input,
        };
        machine.run(&mut ctx)?;
        Ok(machine.into_stack())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
