use std::{
    io::{BufRead, Write},
    rc::Rc,
};

use indexmap::IndexMap;

use crate::{
    diagnostics::Result,
    stack::Operand,
    token::Token,
};

/// What a function call hands back to the work stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Nothing,
    One(Token),
    /// Spliced in order, so the first token is processed next.
    Many(Vec<Token>),
}

/// Host resources visible to native functions during a call.
pub struct CallContext<'a> {
    pub registry: &'a mut FunctionRegistry,
    pub output: &'a mut dyn Write,
    pub input: &'a mut dyn BufRead,
}

/// Native calling convention: arguments arrive most recent first.
pub type NativeCallback = fn(&mut CallContext<'_>, Vec<Operand>) -> Result<Output>;

#[derive(Clone)]
pub enum FunctionBody {
    Native(NativeCallback),
    /// Stored block expanded by positional substitution on each call.
    User(Rc<[Token]>),
}

#[derive(Clone)]
pub struct FunctionEntry {
    pub arity: usize,
    pub body: FunctionBody,
}

impl FunctionEntry {
    pub fn native(arity: usize, callback: NativeCallback) -> Self {
        Self {
            arity,
            body: FunctionBody::Native(callback),
        }
    }

    pub fn user(arity: usize, body: Vec<Token>) -> Self {
        Self {
            arity,
            body: FunctionBody::User(body.into()),
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self.body, FunctionBody::Native(_))
    }

    pub fn invoke(&self, ctx: &mut CallContext<'_>, args: Vec<Operand>) -> Result<Output> {
        match &self.body {
            FunctionBody::Native(callback) => callback(ctx, args),
            FunctionBody::User(body) => Ok(Output::Many(substitute(body, &args)?)),
        }
    }
}

/// Replaces every `$i` in `body`, nested blocks included, with `args[i]`.
///
/// References without a matching argument are left in place. Substituting
/// the empty-stack sentinel is an underflow error.
pub fn substitute(body: &[Token], args: &[Operand]) -> Result<Vec<Token>> {
    body.iter()
        .map(|token| match token {
            Token::VariableRef(index) => match args.get(*index) {
                Some(arg) => arg.clone().into_token(&format!("${index}")),
                None => Ok(token.clone()),
            },
            Token::Block(inner) => Ok(Token::Block(substitute(inner, args)?)),
            other => Ok(other.clone()),
        })
        .collect()
}

/// Name-keyed table of callable functions. Redefinition overwrites.
#[derive(Default)]
pub struct FunctionRegistry {
    entries: IndexMap<String, FunctionEntry>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in library.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::stdlib::install(&mut registry);
        registry
    }

    pub fn lookup(&self, name: &str) -> Option<&FunctionEntry> {
        self.entries.get(name)
    }

    pub fn define(&mut self, name: impl Into<String>, entry: FunctionEntry) {
        let name = name.into();
        tracing::debug!(%name, arity = entry.arity, native = entry.is_native(), "define function");
        self.entries.insert(name, entry);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Function names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
