use rustyline::{error::ReadlineError, DefaultEditor};

use crate::{
    diagnostics::{PopcornError, Result},
    parser,
    runtime::Interpreter,
};

/// Interactive session. Functions defined with `def` persist across
/// entered lines; each line still runs on its own stack.
pub struct Repl {
    interpreter: Interpreter,
}

impl Repl {
    pub fn new(interpreter: Interpreter) -> Self {
        Self { interpreter }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut editor = DefaultEditor::new().map_err(|err| {
            PopcornError::from(std::io::Error::new(std::io::ErrorKind::Other, err))
        })?;
        loop {
            match editor.readline("pc> ") {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed == ":quit" || trimmed == ":exit" {
                        break;
                    }
                    if trimmed == ":functions" {
                        let names: Vec<&str> = self.interpreter.registry().names().collect();
                        println!("{}", names.join(" "));
                        continue;
                    }
                    if trimmed.is_empty() {
                        continue;
                    }
                    editor.add_history_entry(trimmed).ok();
                    self.eval(trimmed);
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => {
                    return Err(PopcornError::from(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        err,
                    )));
                }
            }
        }
        Ok(())
    }

    fn eval(&mut self, source: &str) {
        let program = match parser::parse_program(source) {
            Ok(program) => program,
            Err(diag) => {
                eprintln!("{:?}: {}", diag.kind, diag.message);
                return;
            }
        };
        for line in program.lines {
            match self.interpreter.eval_line(line.tokens) {
                Ok(stack) if stack.is_empty() => {}
                Ok(stack) => {
                    let rendered: Vec<String> =
                        stack.values().iter().map(ToString::to_string).collect();
                    println!("[{}]", rendered.join(" "));
                }
                Err(PopcornError::Diagnostic(diag)) => {
                    eprintln!("{:?}: {}", diag.kind, diag.message);
                }
                Err(other) => eprintln!("error: {other}"),
            }
        }
    }
}
