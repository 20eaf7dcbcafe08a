use std::{
    cell::RefCell,
    io::{self, Cursor, Write},
    rc::Rc,
};

use popcorn::{
    diagnostics::{DiagnosticKind, PopcornError, Result as PopcornResult},
    parse_line,
    registry::{substitute, CallContext},
    ErrorPolicy, ExecutionConfig, FunctionEntry, Interpreter, Operand, Output, Stack, Token,
};
use pretty_assertions::assert_eq;

/// Cloneable sink so a test can read what the interpreter wrote.
#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).expect("utf-8 output")
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct Harness {
    interpreter: Interpreter,
    output: SharedBuffer,
    errors: SharedBuffer,
}

fn harness_with(config: ExecutionConfig, input: &str) -> Harness {
    let output = SharedBuffer::default();
    let errors = SharedBuffer::default();
    let interpreter = Interpreter::with_config(config).with_io(
        Box::new(output.clone()),
        Box::new(Cursor::new(input.to_string())),
        Box::new(errors.clone()),
    );
    Harness {
        interpreter,
        output,
        errors,
    }
}

fn harness() -> Harness {
    harness_with(ExecutionConfig::default(), "")
}

fn run_line(interpreter: &mut Interpreter, source: &str) -> Result<Stack, PopcornError> {
    let tokens = parse_line(source).expect("line should parse");
    interpreter.eval_line(tokens)
}

fn stack_of(interpreter: &mut Interpreter, source: &str) -> Vec<Token> {
    run_line(interpreter, source)
        .expect("evaluation should succeed")
        .values()
        .to_vec()
}

fn error_kind(interpreter: &mut Interpreter, source: &str) -> DiagnosticKind {
    match run_line(interpreter, source) {
        Ok(stack) => panic!("expected error, stack was {:?}", stack.values()),
        Err(err) => err.kind().expect("diagnostic error"),
    }
}

fn collect_args(_ctx: &mut CallContext<'_>, args: Vec<Operand>) -> PopcornResult<Output> {
    let tokens = args
        .into_iter()
        .map(|arg| arg.into_token("collect"))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Output::One(Token::Block(tokens)))
}

fn is_empty_arg(_ctx: &mut CallContext<'_>, args: Vec<Operand>) -> PopcornResult<Output> {
    Ok(Output::One(Token::Bool(args[0].is_empty_stack())))
}

#[test]
fn subtraction_pops_most_recent_first() {
    let mut h = harness();
    assert_eq!(stack_of(&mut h.interpreter, "30 20 -"), vec![Token::Integer(10)]);

    h.interpreter
        .registry_mut()
        .define("collect", FunctionEntry::native(2, collect_args));
    assert_eq!(
        stack_of(&mut h.interpreter, "30 20 collect"),
        vec![Token::Block(vec![Token::Integer(20), Token::Integer(30)])]
    );
}

#[test]
fn literals_and_blocks_are_pushed_verbatim() {
    let mut h = harness();
    assert_eq!(
        stack_of(&mut h.interpreter, "1 2.5 \"s\" null { undefined_fn }"),
        vec![
            Token::Integer(1),
            Token::Float(2.5),
            Token::string("s"),
            Token::Null,
            Token::Block(vec![Token::function("undefined_fn")]),
        ]
    );
}

#[test]
fn user_function_expands_by_substitution() {
    let body = vec![Token::VariableRef(0), Token::VariableRef(0), Token::function("+")];
    let expanded = substitute(&body, &[Operand::Value(Token::Integer(5))]).expect("substitute");
    assert_eq!(
        expanded,
        vec![Token::Integer(5), Token::Integer(5), Token::function("+")]
    );

    let mut h = harness();
    stack_of(&mut h.interpreter, "\"double\" 1 { $0 $0 + } def");
    assert_eq!(stack_of(&mut h.interpreter, "5 double"), vec![Token::Integer(10)]);
}

#[test]
fn substitution_reaches_nested_blocks_and_binds_positionally() {
    let mut h = harness();
    stack_of(&mut h.interpreter, "\"pair\" 2 { { $1 $0 } } def");
    assert_eq!(
        stack_of(&mut h.interpreter, "1 2 pair"),
        vec![Token::Block(vec![Token::Integer(1), Token::Integer(2)])]
    );
}

#[test]
fn user_functions_compose_with_other_calls() {
    let mut h = harness();
    stack_of(&mut h.interpreter, "\"double\" 1 { $0 $0 + } def");
    stack_of(&mut h.interpreter, "\"quad\" 1 { $0 double double } def");
    assert_eq!(stack_of(&mut h.interpreter, "3 quad"), vec![Token::Integer(12)]);
}

#[test]
fn recursion_through_conditional_expansion() {
    let mut h = harness();
    stack_of(
        &mut h.interpreter,
        "\"fact\" 1 { $0 1 <= { 1 } { $0 1 - fact $0 * } ifelse } def",
    );
    assert_eq!(stack_of(&mut h.interpreter, "5 fact"), vec![Token::Integer(120)]);
}

#[test]
fn redefinition_is_last_write_wins() {
    let mut h = harness();
    stack_of(&mut h.interpreter, "\"f\" 0 { 1 } def");
    stack_of(&mut h.interpreter, "\"f\" 0 { 2 } def");
    assert_eq!(stack_of(&mut h.interpreter, "f"), vec![Token::Integer(2)]);
}

#[test]
fn pop_on_empty_stack_receives_the_sentinel() {
    let mut h = harness();
    assert_eq!(stack_of(&mut h.interpreter, "pop"), Vec::<Token>::new());

    h.interpreter
        .registry_mut()
        .define("empty?", FunctionEntry::native(1, is_empty_arg));
    assert_eq!(stack_of(&mut h.interpreter, "empty?"), vec![Token::Bool(true)]);
    assert_eq!(stack_of(&mut h.interpreter, "1 empty?"), vec![Token::Bool(false)]);
}

#[test]
fn sentinel_is_inspectable_and_cannot_be_pushed() {
    let mut stack = Stack::new();
    let popped = stack.pop();
    assert!(popped.is_empty_stack());
    assert_eq!(popped.to_string(), "<empty stack>");
    let err = stack.push(popped).expect_err("push must fail");
    assert_eq!(err.kind(), Some(DiagnosticKind::InvalidPush));
    assert!(stack.is_empty());

    let err = stack
        .push(Operand::Value(Token::function("print")))
        .expect_err("unresolved push must fail");
    assert_eq!(err.kind(), Some(DiagnosticKind::InvalidPush));
}

#[test]
fn builtins_reject_underflow_by_default() {
    let mut h = harness();
    assert_eq!(error_kind(&mut h.interpreter, "1 +"), DiagnosticKind::StackUnderflow);
    assert_eq!(error_kind(&mut h.interpreter, "print"), DiagnosticKind::StackUnderflow);
}

#[test]
fn unknown_function_is_fatal() {
    let mut h = harness();
    assert_eq!(
        error_kind(&mut h.interpreter, "1 2 frobnicate"),
        DiagnosticKind::UnknownFunction
    );
}

#[test]
fn unresolved_reference_is_fatal() {
    let mut h = harness();
    assert_eq!(
        error_kind(&mut h.interpreter, "1 $0 print"),
        DiagnosticKind::UnresolvedReference
    );
}

#[test]
fn malformed_definition_registers_nothing() {
    let mut h = harness();
    let before = h.interpreter.registry().len();
    assert_eq!(
        error_kind(&mut h.interpreter, "\"bad\" 1 2 def"),
        DiagnosticKind::MalformedDefinition
    );
    assert_eq!(
        error_kind(&mut h.interpreter, "\"bad\" -1 { 1 } def"),
        DiagnosticKind::MalformedDefinition
    );
    assert_eq!(
        error_kind(&mut h.interpreter, "7 1 { 1 } def"),
        DiagnosticKind::MalformedDefinition
    );
    assert_eq!(
        error_kind(&mut h.interpreter, "{ 1 } def"),
        DiagnosticKind::MalformedDefinition
    );
    assert!(!h.interpreter.registry().contains("bad"));
    assert_eq!(h.interpreter.registry().len(), before);
}

#[test]
fn user_function_underflow_is_reported() {
    let mut h = harness();
    stack_of(&mut h.interpreter, "\"double\" 1 { $0 $0 + } def");
    assert_eq!(
        error_kind(&mut h.interpreter, "double"),
        DiagnosticKind::StackUnderflow
    );
}

#[test]
fn arithmetic_and_comparison() {
    let mut h = harness();
    let i = &mut h.interpreter;
    assert_eq!(stack_of(i, "7 2 /"), vec![Token::Integer(3)]);
    assert_eq!(stack_of(i, "7 2 %"), vec![Token::Integer(1)]);
    assert_eq!(stack_of(i, "7.0 2 /"), vec![Token::Float(3.5)]);
    assert_eq!(stack_of(i, "1.5 2 *"), vec![Token::Float(3.0)]);
    assert_eq!(stack_of(i, "\"pop\" \"corn\" +"), vec![Token::string("popcorn")]);
    assert_eq!(stack_of(i, "2 2.0 ="), vec![Token::Bool(true)]);
    assert_eq!(stack_of(i, "{ 1 } { 1 } ="), vec![Token::Bool(true)]);
    assert_eq!(stack_of(i, "1 \"1\" !="), vec![Token::Bool(true)]);
    assert_eq!(stack_of(i, "1 2 <"), vec![Token::Bool(true)]);
    assert_eq!(stack_of(i, "2.5 2 >="), vec![Token::Bool(true)]);
    assert_eq!(stack_of(i, "\"a\" \"b\" >"), vec![Token::Bool(false)]);
    assert_eq!(stack_of(i, "true false or not"), vec![Token::Bool(false)]);
    assert_eq!(error_kind(i, "1 0 /"), DiagnosticKind::Arithmetic);
    assert_eq!(error_kind(i, "9223372036854775807 1 +"), DiagnosticKind::Arithmetic);
    assert_eq!(error_kind(i, "1 true +"), DiagnosticKind::Type);
    assert_eq!(error_kind(i, "1 { } <"), DiagnosticKind::Type);
}

#[test]
fn stack_and_control_builtins() {
    let mut h = harness();
    let i = &mut h.interpreter;
    assert_eq!(stack_of(i, "1 2 swap"), vec![Token::Integer(2), Token::Integer(1)]);
    assert_eq!(stack_of(i, "4 dup *"), vec![Token::Integer(16)]);
    assert_eq!(stack_of(i, "{ 1 2 + } call"), vec![Token::Integer(3)]);
    assert_eq!(stack_of(i, "false { 1 } if"), Vec::<Token>::new());
    assert_eq!(stack_of(i, "true { 1 } if"), vec![Token::Integer(1)]);
    assert_eq!(stack_of(i, "false { 1 } { 2 } ifelse"), vec![Token::Integer(2)]);
    assert_eq!(error_kind(i, "1 { 1 } if"), DiagnosticKind::Type);
    assert_eq!(error_kind(i, "1 call"), DiagnosticKind::Type);
}

#[test]
fn print_and_read_use_host_streams() {
    let mut h = harness_with(ExecutionConfig::default(), "first\r\nsecond\n");
    let report = h
        .interpreter
        .eval_source("\"hi there\" print\n1.0 print\n{ 1 \"a\" } print\nread print\nread read print pop\nread print")
        .expect("program parses");
    assert!(report.is_success(), "{:?}", report.failures);
    assert_eq!(
        h.output.contents(),
        "hi there\n1.0\n{ 1 \"a\" }\nfirst\nnull\nnull\n"
    );
}

#[test]
fn failing_lines_do_not_stop_the_program_by_default() {
    let mut h = harness();
    let report = h
        .interpreter
        .eval_source("1 print\nnope\n2 print\n1 0 /\n3 print")
        .expect("program parses");
    assert_eq!(report.lines_run, 5);
    let failed: Vec<usize> = report.failures.iter().map(|f| f.line).collect();
    assert_eq!(failed, vec![2, 4]);
    assert_eq!(h.output.contents(), "1\n2\n3\n");
    let errors = h.errors.contents();
    assert!(errors.contains("line 2: UnknownFunction"), "{errors}");
    assert!(errors.contains("line 4: Arithmetic"), "{errors}");
}

#[test]
fn halt_policy_stops_at_first_failure() {
    let config = ExecutionConfig {
        error_policy: ErrorPolicy::Halt,
        ..ExecutionConfig::default()
    };
    let mut h = harness_with(config, "");
    let report = h
        .interpreter
        .eval_source("1 print\nnope\n2 print")
        .expect("program parses");
    assert_eq!(report.lines_run, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(h.output.contents(), "1\n");
}

#[test]
fn parse_error_aborts_before_running_anything() {
    let mut h = harness();
    let err = h
        .interpreter
        .eval_source("1 print\n{ 2 print")
        .expect_err("parse should fail");
    assert_eq!(err.kind(), Some(DiagnosticKind::Parse));
    assert_eq!(h.output.contents(), "");
}

#[test]
fn definitions_persist_across_lines_but_stacks_do_not() {
    let mut h = harness();
    let report = h
        .interpreter
        .eval_source("\"inc\" 1 { $0 1 + } def\n41 inc print\n1 2\nprint")
        .expect("program parses");
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].line, 4);
    assert_eq!(h.output.contents(), "42\n");
}

#[test]
fn step_limit_bounds_runaway_expansion() {
    let config = ExecutionConfig {
        step_limit: Some(1_000),
        ..ExecutionConfig::default()
    };
    let mut h = harness_with(config, "");
    stack_of(&mut h.interpreter, "\"forever\" 0 { forever } def");
    assert_eq!(error_kind(&mut h.interpreter, "forever"), DiagnosticKind::StepLimit);
    assert_eq!(stack_of(&mut h.interpreter, "1 2 +"), vec![Token::Integer(3)]);
}
