use crate::{
    diagnostics::Diagnostic,
    lexer::Lexer,
    token::Token,
};

/// Truncates a source line at its first occurrence.
pub const COMMENT_MARKER: char = '#';

/// One statement line of a program.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// 1-based line number in the original source.
    pub number: usize,
    pub tokens: Vec<Token>,
}

/// An ordered list of independent statement lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub lines: Vec<Line>,
}

pub fn parse_line(text: &str) -> Result<Vec<Token>, Diagnostic> {
    Lexer::new(text).tokenize()
}

/// Parses a whole source text. The first malformed line aborts parsing;
/// there is no partial program.
pub fn parse_program(source: &str) -> Result<Program, Diagnostic> {
    let mut lines = Vec::new();
    for (idx, raw) in source.lines().enumerate() {
        let code = match raw.find(COMMENT_MARKER) {
            Some(pos) => &raw[..pos],
            None => raw,
        };
        let code = code.trim();
        if code.is_empty() {
            continue;
        }
        let number = idx + 1;
        let tokens =
            parse_line(code).map_err(|diag| diag.with_note(format!("on line {number}")))?;
        lines.push(Line { number, tokens });
    }
    Ok(Program { lines })
}
