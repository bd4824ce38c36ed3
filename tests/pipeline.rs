use indoc::indoc;

use minipy::bytecode::{self, Bytecode};
use minipy::interpreter::{self, ExecutionError, Outcome, Value};
use minipy::lexer::{self, LexError};
use minipy::parser::{self, ParseError};

fn run(source: &str) -> Outcome {
    let tokens = lexer::tokenize(source).expect("tokenize failed");
    let program = parser::parse(tokens).expect("parse failed");
    let compiled = bytecode::compile(&program).expect("compile failed");
    interpreter::interpret(compiled).expect("interpret failed")
}

fn run_err(source: &str) -> ExecutionError {
    let tokens = lexer::tokenize(source).expect("tokenize failed");
    let program = parser::parse(tokens).expect("parse failed");
    let compiled = bytecode::compile(&program).expect("compile failed");
    interpreter::interpret(compiled).expect_err("expected execution fault")
}

fn binding(outcome: &Outcome, name: &str) -> Value {
    *outcome
        .scope
        .get(name)
        .unwrap_or_else(|| panic!("expected '{name}' to be bound"))
}

#[test]
fn addition_leaves_its_result() {
    let outcome = run("3 + 4\n");
    assert_eq!(outcome.last_result, Some(Value::Int(7)));
    assert!(outcome.scope.is_empty());
}

#[test]
fn precedence_and_associativity_hold_end_to_end() {
    assert_eq!(run("1 + 2 * 3\n").last_result, Some(Value::Int(7)));
    assert_eq!(run("2 ** 3 ** 2\n").last_result, Some(Value::Int(512)));
    assert_eq!(run("(1 + 2) * 3\n").last_result, Some(Value::Int(9)));
    assert_eq!(run("7 % 3 + 10 / 5\n").last_result, Some(Value::Int(3)));
}

#[test]
fn chained_assignment_evaluates_once_and_binds_all_targets() {
    let outcome = run("a = b = 5\n");
    assert_eq!(binding(&outcome, "a"), Value::Int(5));
    assert_eq!(binding(&outcome, "b"), Value::Int(5));
    assert_eq!(outcome.last_result, None);
}

#[test]
fn conditional_body_runs_when_condition_is_bound() {
    let input = indoc! {"
        x = 5
        if x:
            y = 1
    "};
    let outcome = run(input);
    assert_eq!(binding(&outcome, "y"), Value::Int(1));
}

#[test]
fn conditional_on_unbound_name_faults_naming_it() {
    let input = indoc! {"
        if x:
            y = 1
    "};
    let error = run_err(input);
    assert_eq!(
        error,
        ExecutionError::UndefinedVariable {
            name: "x".to_string()
        }
    );
}

#[test]
fn explicit_false_condition_still_runs_the_body() {
    let input = indoc! {"
        if False:
            y = 1
    "};
    let outcome = run(input);
    assert_eq!(binding(&outcome, "y"), Value::Int(1));
}

#[test]
fn jump_is_taken_when_the_condition_is_absent() {
    // Only hand-built bytecode can put the absent sentinel on the stack.
    let outcome = interpreter::interpret(vec![
        Bytecode::Push(Value::None),
        Bytecode::PopJumpIfFalse(3),
        Bytecode::Push(Value::Int(1)),
        Bytecode::Save("y".to_string()),
    ])
    .expect("run failed");
    assert!(!outcome.scope.contains_key("y"));
    assert_eq!(outcome.last_result, None);
}

#[test]
fn nested_conditionals_execute_inside_out() {
    let input = indoc! {"
        x = 1
        if x:
            y = 2
            if y:
                z = 3
        w = 4
    "};
    let outcome = run(input);
    assert_eq!(binding(&outcome, "x"), Value::Int(1));
    assert_eq!(binding(&outcome, "y"), Value::Int(2));
    assert_eq!(binding(&outcome, "z"), Value::Int(3));
    assert_eq!(binding(&outcome, "w"), Value::Int(4));
}

#[test]
fn float_arithmetic_and_promotion() {
    assert_eq!(run("7 / 2\n").last_result, Some(Value::Int(3)));
    assert_eq!(run("7.0 / 2\n").last_result, Some(Value::Float(3.5)));
    assert_eq!(run("5. + .5\n").last_result, Some(Value::Float(5.5)));
    assert_eq!(run("2 ** -1.0\n").last_result, Some(Value::Float(0.5)));
}

#[test]
fn unary_chain_runs_through_the_whole_pipeline() {
    assert_eq!(run("not not True\n").last_result, Some(Value::Bool(true)));
    assert_eq!(run("--3\n").last_result, Some(Value::Int(3)));
    assert_eq!(run("-(1 + 2)\n").last_result, Some(Value::Int(-3)));
}

#[test]
fn reassignment_overwrites_the_binding() {
    let outcome = run("x = 1\nx = x + 1\nx\n");
    assert_eq!(binding(&outcome, "x"), Value::Int(2));
    assert_eq!(outcome.last_result, Some(Value::Int(2)));
}

#[test]
fn lexer_rejects_three_space_indent() {
    let error = lexer::tokenize("if x:\n   y = 1\n").expect_err("expected lex failure");
    assert_eq!(error, LexError::IndentationNotMultipleOfFour);
}

#[test]
fn parser_reports_expected_and_actual_token() {
    let tokens = lexer::tokenize("1 2\n").expect("tokenize failed");
    let error = parser::parse(tokens).expect_err("expected parse failure");
    assert_eq!(
        error,
        ParseError::UnexpectedToken {
            expected: "NEWLINE",
            found: "Token(INT, 2)".to_string(),
        }
    );
}

#[test]
fn compile_then_interpret_twice_is_idempotent() {
    let input = indoc! {"
        a = b = 2
        c = a ** b
        c + 1
    "};
    let tokens = lexer::tokenize(input).expect("tokenize failed");
    let program = parser::parse(tokens).expect("parse failed");
    let compiled = bytecode::compile(&program).expect("compile failed");

    let first = interpreter::interpret(compiled.clone()).expect("first run failed");
    let second = interpreter::interpret(compiled).expect("second run failed");
    assert_eq!(first, second);
    assert_eq!(first.last_result, Some(Value::Int(5)));
    assert_eq!(first.render_scope(), "{a: 2, b: 2, c: 4}");
}

#[test]
fn division_by_zero_faults() {
    let error = run_err("x = 1 / 0\n");
    assert!(error.to_string().contains("division by zero"));
}

#[test]
fn arithmetic_on_booleans_faults() {
    let error = run_err("True + 1\n");
    assert!(matches!(
        error,
        ExecutionError::UnsupportedBinaryOperands { .. }
    ));
}
