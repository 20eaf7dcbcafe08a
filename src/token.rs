use std::fmt;

/// A parsed Popcorn token.
///
/// Resolved data (`Float` through `Block`) may sit on the stack. A
/// `FunctionRef` is dispatched through the registry, and a `VariableRef`
/// only ever appears inside user function bodies awaiting substitution.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Float(f64),
    Integer(i64),
    String(String),
    Bool(bool),
    Null,
    Block(Vec<Token>),
    VariableRef(usize),
    FunctionRef(String),
}

impl Token {
    pub fn string(value: impl Into<String>) -> Self {
        Token::String(value.into())
    }

    pub fn function(name: impl Into<String>) -> Self {
        Token::FunctionRef(name.into())
    }

    /// True for values that may be pushed onto the stack as-is.
    pub fn is_data(&self) -> bool {
        match self {
            Token::Float(_)
            | Token::Integer(_)
            | Token::String(_)
            | Token::Bool(_)
            | Token::Null
            | Token::Block(_) => true,
            Token::VariableRef(_) | Token::FunctionRef(_) => false,
        }
    }

    pub fn is_function_call(&self) -> bool {
        matches!(self, Token::FunctionRef(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Token::Float(_) => "Float",
            Token::Integer(_) => "Integer",
            Token::String(_) => "String",
            Token::Bool(_) => "Bool",
            Token::Null => "Null",
            Token::Block(_) => "Block",
            Token::VariableRef(_) => "VariableRef",
            Token::FunctionRef(_) => "FunctionRef",
        }
    }
}

/// Renders the token back as Popcorn source. Parsing the output yields an
/// equal token for every finite float.
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Float(n) => {
                let text = n.to_string();
                if n.is_finite() && !text.contains('.') {
                    write!(f, "{text}.0")
                } else {
                    write!(f, "{text}")
                }
            }
            Token::Integer(n) => write!(f, "{n}"),
            Token::String(s) => write!(f, "\"{s}\""),
            Token::Bool(b) => write!(f, "{b}"),
            Token::Null => write!(f, "null"),
            Token::Block(tokens) => {
                write!(f, "{{")?;
                for token in tokens {
                    write!(f, " {token}")?;
                }
                write!(f, " }}")
            }
            Token::VariableRef(index) => write!(f, "${index}"),
            Token::FunctionRef(name) => write!(f, "{name}"),
        }
    }
}
