use std::cmp::Ordering;

use crate::{
    diagnostics::{Diagnostic, DiagnosticKind, PopcornError, Result},
    registry::{CallContext, FunctionEntry, FunctionRegistry, NativeCallback, Output},
    stack::Operand,
    token::Token,
};

pub fn install(registry: &mut FunctionRegistry) {
    native(registry, "+", 2, math_add);
    native(registry, "-", 2, math_sub);
    native(registry, "*", 2, math_mul);
    native(registry, "/", 2, math_div);
    native(registry, "%", 2, math_rem);

    native(registry, "=", 2, cmp_eq);
    native(registry, "!=", 2, cmp_ne);
    native(registry, "<", 2, cmp_lt);
    native(registry, ">", 2, cmp_gt);
    native(registry, "<=", 2, cmp_le);
    native(registry, ">=", 2, cmp_ge);

    native(registry, "and", 2, logic_and);
    native(registry, "or", 2, logic_or);
    native(registry, "not", 1, logic_not);

    native(registry, "print", 1, io_print);
    native(registry, "read", 0, io_read);

    native(registry, "pop", 1, stack_pop);
    native(registry, "dup", 1, stack_dup);
    native(registry, "swap", 2, stack_swap);

    native(registry, "call", 1, control_call);
    native(registry, "if", 2, control_if);
    native(registry, "ifelse", 3, control_ifelse);
    native(registry, "def", 3, define);
}

fn native(registry: &mut FunctionRegistry, name: &str, arity: usize, callback: NativeCallback) {
    registry.define(name, FunctionEntry::native(arity, callback));
}

fn runtime_error(kind: DiagnosticKind, message: impl Into<String>) -> PopcornError {
    PopcornError::from(Diagnostic::new(kind, message))
}

fn type_error(name: &str, expected: &str, found: &Token) -> PopcornError {
    runtime_error(
        DiagnosticKind::Type,
        format!("`{name}` expected {expected} but found {}", found.type_name()),
    )
}

/// Resolves every operand, in pop order, rejecting the empty-stack sentinel.
fn operands(args: Vec<Operand>, name: &str) -> Result<Vec<Token>> {
    args.into_iter().map(|arg| arg.into_token(name)).collect()
}

/// The single operand of a unary built-in.
fn unary(args: Vec<Operand>, name: &str) -> Result<Token> {
    let mut values = operands(args, name)?;
    values.pop().ok_or_else(|| {
        runtime_error(
            DiagnosticKind::StackUnderflow,
            format!("`{name}` received no operand"),
        )
    })
}

/// Operands of a binary built-in in source order: `a b op` yields `(a, b)`.
fn binary(args: Vec<Operand>, name: &str) -> Result<(Token, Token)> {
    let mut values = operands(args, name)?.into_iter();
    match (values.next(), values.next()) {
        (Some(right), Some(left)) => Ok((left, right)),
        _ => Err(runtime_error(
            DiagnosticKind::StackUnderflow,
            format!("`{name}` received fewer than two operands"),
        )),
    }
}

fn expect_bool(token: &Token, name: &str) -> Result<bool> {
    match token {
        Token::Bool(b) => Ok(*b),
        other => Err(type_error(name, "Bool", other)),
    }
}

fn expect_block(token: Token, name: &str) -> Result<Vec<Token>> {
    match token {
        Token::Block(tokens) => Ok(tokens),
        other => Err(type_error(name, "Block", &other)),
    }
}

#[derive(Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(f) => f,
        }
    }
}

fn number(token: &Token) -> Option<Number> {
    match token {
        Token::Integer(n) => Some(Number::Int(*n)),
        Token::Float(f) => Some(Number::Float(*f)),
        _ => None,
    }
}

fn arithmetic(
    args: Vec<Operand>,
    name: &str,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Output> {
    let (left, right) = binary(args, name)?;
    let (a, b) = match (number(&left), number(&right)) {
        (Some(a), Some(b)) => (a, b),
        (None, _) => return Err(type_error(name, "a number", &left)),
        (_, None) => return Err(type_error(name, "a number", &right)),
    };
    let result = match (a, b) {
        (Number::Int(a), Number::Int(b)) => Token::Integer(int_op(a, b).ok_or_else(|| {
            runtime_error(
                DiagnosticKind::Arithmetic,
                format!("integer overflow in `{a} {b} {name}`"),
            )
        })?),
        (a, b) => Token::Float(float_op(a.as_f64(), b.as_f64())),
    };
    Ok(Output::One(result))
}

fn ensure_nonzero_divisor(args: &[Operand], name: &str) -> Result<()> {
    if let Some(Operand::Value(Token::Integer(0))) = args.first() {
        if let Some(Operand::Value(Token::Integer(_))) = args.get(1) {
            return Err(runtime_error(
                DiagnosticKind::Arithmetic,
                format!("`{name}` division by zero"),
            ));
        }
    }
    Ok(())
}

fn math_add(_ctx: &mut CallContext<'_>, args: Vec<Operand>) -> Result<Output> {
    if let [Operand::Value(Token::String(right)), Operand::Value(Token::String(left))] =
        args.as_slice()
    {
        return Ok(Output::One(Token::string(format!("{left}{right}"))));
    }
    arithmetic(args, "+", i64::checked_add, |a, b| a + b)
}

fn math_sub(_ctx: &mut CallContext<'_>, args: Vec<Operand>) -> Result<Output> {
    arithmetic(args, "-", i64::checked_sub, |a, b| a - b)
}

fn math_mul(_ctx: &mut CallContext<'_>, args: Vec<Operand>) -> Result<Output> {
    arithmetic(args, "*", i64::checked_mul, |a, b| a * b)
}

fn math_div(_ctx: &mut CallContext<'_>, args: Vec<Operand>) -> Result<Output> {
    ensure_nonzero_divisor(&args, "/")?;
    arithmetic(args, "/", i64::checked_div, |a, b| a / b)
}

fn math_rem(_ctx: &mut CallContext<'_>, args: Vec<Operand>) -> Result<Output> {
    ensure_nonzero_divisor(&args, "%")?;
    arithmetic(args, "%", i64::checked_rem, |a, b| a % b)
}

/// Structural equality; integers and floats compare by numeric value.
fn values_equal(left: &Token, right: &Token) -> bool {
    match (left, right) {
        (Token::Integer(a), Token::Float(b)) | (Token::Float(b), Token::Integer(a)) => {
            *a as f64 == *b
        }
        (Token::Block(a), Token::Block(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(l, r)| values_equal(l, r))
        }
        _ => left == right,
    }
}

fn compare(left: &Token, right: &Token, name: &str) -> Result<Option<Ordering>> {
    match (left, right) {
        (Token::Integer(a), Token::Integer(b)) => Ok(Some(a.cmp(b))),
        (Token::String(a), Token::String(b)) => Ok(Some(a.cmp(b))),
        _ => match (number(left), number(right)) {
            (Some(a), Some(b)) => Ok(a.as_f64().partial_cmp(&b.as_f64())),
            (None, _) => Err(type_error(name, "a number or String", left)),
            (_, None) => Err(type_error(name, "a number or String", right)),
        },
    }
}

fn ordering(args: Vec<Operand>, name: &str, accept: fn(Ordering) -> bool) -> Result<Output> {
    let (left, right) = binary(args, name)?;
    let holds = compare(&left, &right, name)?.is_some_and(accept);
    Ok(Output::One(Token::Bool(holds)))
}

fn cmp_eq(_ctx: &mut CallContext<'_>, args: Vec<Operand>) -> Result<Output> {
    let (left, right) = binary(args, "=")?;
    Ok(Output::One(Token::Bool(values_equal(&left, &right))))
}

fn cmp_ne(_ctx: &mut CallContext<'_>, args: Vec<Operand>) -> Result<Output> {
    let (left, right) = binary(args, "!=")?;
    Ok(Output::One(Token::Bool(!values_equal(&left, &right))))
}

fn cmp_lt(_ctx: &mut CallContext<'_>, args: Vec<Operand>) -> Result<Output> {
    ordering(args, "<", Ordering::is_lt)
}

fn cmp_gt(_ctx: &mut CallContext<'_>, args: Vec<Operand>) -> Result<Output> {
    ordering(args, ">", Ordering::is_gt)
}

fn cmp_le(_ctx: &mut CallContext<'_>, args: Vec<Operand>) -> Result<Output> {
    ordering(args, "<=", Ordering::is_le)
}

fn cmp_ge(_ctx: &mut CallContext<'_>, args: Vec<Operand>) -> Result<Output> {
    ordering(args, ">=", Ordering::is_ge)
}

fn logic_and(_ctx: &mut CallContext<'_>, args: Vec<Operand>) -> Result<Output> {
    let (left, right) = binary(args, "and")?;
    let value = expect_bool(&left, "and")? && expect_bool(&right, "and")?;
    Ok(Output::One(Token::Bool(value)))
}

fn logic_or(_ctx: &mut CallContext<'_>, args: Vec<Operand>) -> Result<Output> {
    let (left, right) = binary(args, "or")?;
    let value = expect_bool(&left, "or")? || expect_bool(&right, "or")?;
    Ok(Output::One(Token::Bool(value)))
}

fn logic_not(_ctx: &mut CallContext<'_>, args: Vec<Operand>) -> Result<Output> {
    let value = unary(args, "not")?;
    Ok(Output::One(Token::Bool(!expect_bool(&value, "not")?)))
}

fn io_print(ctx: &mut CallContext<'_>, args: Vec<Operand>) -> Result<Output> {
    match unary(args, "print")? {
        Token::String(text) => writeln!(ctx.output, "{text}")?,
        other => writeln!(ctx.output, "{other}")?,
    }
    Ok(Output::Nothing)
}

fn io_read(ctx: &mut CallContext<'_>, _args: Vec<Operand>) -> Result<Output> {
    let mut input = String::new();
    if ctx.input.read_line(&mut input)? == 0 {
        return Ok(Output::One(Token::Null));
    }
    if input.ends_with('\n') {
        input.pop();
        if input.ends_with('\r') {
            input.pop();
        }
    }
    Ok(Output::One(Token::string(input)))
}

/// Discards its operand. Popping an empty stack is not an error here.
fn stack_pop(_ctx: &mut CallContext<'_>, _args: Vec<Operand>) -> Result<Output> {
    Ok(Output::Nothing)
}

fn stack_dup(_ctx: &mut CallContext<'_>, args: Vec<Operand>) -> Result<Output> {
    let value = unary(args, "dup")?;
    Ok(Output::Many(vec![value.clone(), value]))
}

fn stack_swap(_ctx: &mut CallContext<'_>, args: Vec<Operand>) -> Result<Output> {
    let (left, right) = binary(args, "swap")?;
    Ok(Output::Many(vec![right, left]))
}

fn control_call(_ctx: &mut CallContext<'_>, args: Vec<Operand>) -> Result<Output> {
    let block = unary(args, "call")?;
    Ok(Output::Many(expect_block(block, "call")?))
}

fn control_if(_ctx: &mut CallContext<'_>, args: Vec<Operand>) -> Result<Output> {
    let (condition, body) = binary(args, "if")?;
    let body = expect_block(body, "if")?;
    if expect_bool(&condition, "if")? {
        Ok(Output::Many(body))
    } else {
        Ok(Output::Nothing)
    }
}

fn control_ifelse(_ctx: &mut CallContext<'_>, args: Vec<Operand>) -> Result<Output> {
    let mut values = operands(args, "ifelse")?.into_iter();
    let (Some(otherwise), Some(then), Some(condition)) =
        (values.next(), values.next(), values.next())
    else {
        return Err(runtime_error(
            DiagnosticKind::StackUnderflow,
            "`ifelse` received fewer than three operands",
        ));
    };
    let then = expect_block(then, "ifelse")?;
    let otherwise = expect_block(otherwise, "ifelse")?;
    if expect_bool(&condition, "ifelse")? {
        Ok(Output::Many(then))
    } else {
        Ok(Output::Many(otherwise))
    }
}

fn malformed(message: impl Into<String>) -> PopcornError {
    runtime_error(DiagnosticKind::MalformedDefinition, message)
}

/// `"name" arity { body } def` registers a user function.
fn define(ctx: &mut CallContext<'_>, args: Vec<Operand>) -> Result<Output> {
    let mut args = args.into_iter();
    let (Some(body), Some(arity), Some(name)) = (args.next(), args.next(), args.next()) else {
        return Err(malformed("`def` expects a name, an arity and a block"));
    };
    let body = match body {
        Operand::Value(Token::Block(tokens)) => tokens,
        other => {
            return Err(malformed(format!(
                "`def` expected a Block body but found {other}"
            )));
        }
    };
    let arity = match arity {
        Operand::Value(Token::Integer(n)) => usize::try_from(n)
            .map_err(|_| malformed(format!("`def` arity must be non-negative, found {n}")))?,
        other => {
            return Err(malformed(format!(
                "`def` expected an Integer arity but found {other}"
            )));
        }
    };
    let name = match name {
        Operand::Value(Token::String(name)) => name,
        other => {
            return Err(malformed(format!(
                "`def` expected a String name but found {other}"
            )));
        }
    };
    ctx.registry.define(name, FunctionEntry::user(arity, body));
    Ok(Output::Nothing)
}
