use crate::{
    classifier::classify,
    diagnostics::{Diagnostic, DiagnosticKind, SourceSpan},
    token::Token,
};

/// Deepest block nesting a single line may use.
pub const MAX_BLOCK_DEPTH: usize = 256;

/// Tokenizer for a single Popcorn statement line.
///
/// Blocks are scanned by brace depth and their interior is tokenized by a
/// nested lexer, so a block arrives fully parsed but never executed.
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::str::CharIndices<'a>,
    peeked: Option<(usize, char)>,
    /// Position of `source` within the enclosing line, used for spans.
    offset: usize,
    /// Number of blocks enclosing `source`.
    nesting: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self::nested(source, 0, 0)
    }

    fn nested(source: &'a str, offset: usize, nesting: usize) -> Self {
        Self {
            source,
            chars: source.char_indices(),
            peeked: None,
            offset,
            nesting,
        }
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        self.peeked.take().or_else(|| self.chars.next())
    }

    fn peek(&mut self) -> Option<(usize, char)> {
        if self.peeked.is_none() {
            self.peeked = self.chars.next();
        }
        self.peeked
    }

    fn span(&self, start: usize, end: usize) -> SourceSpan {
        SourceSpan::new(self.offset + start, self.offset + end)
    }

    fn skip_whitespace(&mut self) {
        while let Some((_, ch)) = self.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.bump();
        }
    }

    /// Advances past the closing quote of a string whose opening quote has
    /// already been consumed. Returns the index of the closing quote.
    fn skip_string(&mut self) -> Option<usize> {
        while let Some((idx, ch)) = self.bump() {
            if ch == '"' {
                return Some(idx);
            }
        }
        None
    }

    fn block(&mut self, start: usize) -> Result<Token, Diagnostic> {
        self.bump();
        let mut depth = 1usize;
        let mut prev = '{';
        let end = loop {
            let Some((idx, ch)) = self.bump() else {
                return Err(self.missing_bracket(start));
            };
            match ch {
                '{' => {
                    depth += 1;
                    if self.nesting + depth > MAX_BLOCK_DEPTH {
                        return Err(Diagnostic::new(
                            DiagnosticKind::Parse,
                            "blocks nested too deeply",
                        )
                        .with_span(self.span(idx, idx + 1))
                        .with_note(format!("at most {MAX_BLOCK_DEPTH} levels are allowed")));
                    }
                }
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        break idx;
                    }
                }
                // Only a quote that opens a token starts a string; inside a
                // word it is an ordinary character.
                '"' if starts_token(prev) => {
                    if self.skip_string().is_none() {
                        return Err(self.missing_bracket(start));
                    }
                }
                _ => {}
            }
            prev = ch;
        };

        let interior = &self.source[start + 1..end];
        let leading = interior.len() - interior.trim_start().len();
        let inner_offset = self.offset + start + 1 + leading;
        let tokens = Lexer::nested(interior.trim(), inner_offset, self.nesting + 1).tokenize()?;
        Ok(Token::Block(tokens))
    }

    fn missing_bracket(&self, start: usize) -> Diagnostic {
        Diagnostic::new(DiagnosticKind::Parse, "missing closing bracket")
            .with_span(self.span(start, self.source.len()))
    }

    fn string_literal(&mut self, start: usize) -> Result<Token, Diagnostic> {
        self.bump();
        match self.skip_string() {
            Some(end) => match self.peek() {
                Some((next, ch)) if !ch.is_whitespace() => Err(Diagnostic::new(
                    DiagnosticKind::Parse,
                    "expected whitespace after string",
                )
                .with_span(self.span(next, next + ch.len_utf8()))),
                _ => Ok(classify(&self.source[start..=end])),
            },
            None => Err(
                Diagnostic::new(DiagnosticKind::Parse, "missing closing quote")
                    .with_span(self.span(start, self.source.len())),
            ),
        }
    }

    fn word(&mut self, start: usize) -> Token {
        let mut end = start;
        while let Some((idx, ch)) = self.peek() {
            if ch.is_whitespace() {
                break;
            }
            self.bump();
            end = idx + ch.len_utf8();
        }
        classify(&self.source[start..end])
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, Diagnostic> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let Some((start, ch)) = self.peek() else {
                break;
            };
            let token = match ch {
                '{' => self.block(start)?,
                '"' => self.string_literal(start)?,
                '}' => {
                    return Err(
                        Diagnostic::new(DiagnosticKind::Parse, "unexpected closing bracket")
                            .with_span(self.span(start, start + 1)),
                    );
                }
                _ => self.word(start),
            };
            tokens.push(token);
        }
        Ok(tokens)
    }
}

fn starts_token(prev: char) -> bool {
    prev.is_whitespace() || prev == '{' || prev == '}'
}
