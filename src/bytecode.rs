use std::fmt;

use thiserror::Error;

use crate::ast::{BinOp, Body, Expression, Program, Statement, UnOp};
use crate::interpreter::Value;

/// Faults in this phase signal an AST state the grammar cannot produce; they
/// are internal invariant violations, never reachable from valid source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Can't compile Assignment without targets")]
    AssignmentWithoutTargets,
}

/// One flat stack-machine instruction: an opcode plus its single operand,
/// where the opcode needs one.
#[derive(Debug, Clone, PartialEq)]
pub enum Bytecode {
    Push(Value),
    Pop,
    Save(String),
    Load(String),
    Copy,
    UnaryOp(UnOp),
    BinaryOp(BinOp),
    PopJumpIfFalse(usize),
}

impl Bytecode {
    pub fn opcode(&self) -> &'static str {
        match self {
            Bytecode::Push(_) => "PUSH",
            Bytecode::Pop => "POP",
            Bytecode::Save(_) => "SAVE",
            Bytecode::Load(_) => "LOAD",
            Bytecode::Copy => "COPY",
            Bytecode::UnaryOp(_) => "UNARYOP",
            Bytecode::BinaryOp(_) => "BINARYOP",
            Bytecode::PopJumpIfFalse(_) => "POP_JUMP_IF_FALSE",
        }
    }
}

impl fmt::Display for Bytecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bytecode::Push(value) => write!(f, "Bytecode(PUSH, {value})"),
            Bytecode::Save(name) => write!(f, "Bytecode(SAVE, {name})"),
            Bytecode::Load(name) => write!(f, "Bytecode(LOAD, {name})"),
            Bytecode::UnaryOp(op) => write!(f, "Bytecode(UNARYOP, {op})"),
            Bytecode::BinaryOp(op) => write!(f, "Bytecode(BINARYOP, {op})"),
            Bytecode::PopJumpIfFalse(offset) => {
                write!(f, "Bytecode(POP_JUMP_IF_FALSE, {offset})")
            }
            other => write!(f, "Bytecode({})", other.opcode()),
        }
    }
}

pub fn compile(program: &Program) -> Result<Vec<Bytecode>, CompileError> {
    let mut code = Vec::new();
    for statement in &program.statements {
        code.extend(compile_statement(statement)?);
    }
    Ok(code)
}

fn compile_statement(statement: &Statement) -> Result<Vec<Bytecode>, CompileError> {
    let mut code = Vec::new();
    match statement {
        Statement::Expr(expression) => {
            code.extend(compile_expression(expression));
            code.push(Bytecode::Pop);
        }
        Statement::Assignment { targets, value } => {
            let (last, rest) = targets
                .split_last()
                .ok_or(CompileError::AssignmentWithoutTargets)?;
            // The value is computed exactly once; COPY duplicates it for
            // every target but the last.
            code.extend(compile_expression(value));
            for target in rest {
                code.push(Bytecode::Copy);
                code.push(Bytecode::Save(target.clone()));
            }
            code.push(Bytecode::Save(last.clone()));
        }
        Statement::Conditional { condition, body } => {
            let body_code = compile_body(body)?;
            code.extend(compile_expression(condition));
            // Counted from the pre-increment position, body length + 1 lands
            // exactly one instruction past the end of the body.
            code.push(Bytecode::PopJumpIfFalse(body_code.len() + 1));
            code.extend(body_code);
        }
    }
    Ok(code)
}

fn compile_body(body: &Body) -> Result<Vec<Bytecode>, CompileError> {
    let mut code = Vec::new();
    for statement in &body.statements {
        code.extend(compile_statement(statement)?);
    }
    Ok(code)
}

fn compile_expression(expression: &Expression) -> Vec<Bytecode> {
    let mut code = Vec::new();
    match expression {
        Expression::Constant(constant) => {
            code.push(Bytecode::Push(Value::from(*constant)));
        }
        Expression::Variable(name) => {
            code.push(Bytecode::Load(name.clone()));
        }
        Expression::UnaryOp { op, operand } => {
            code.extend(compile_expression(operand));
            code.push(Bytecode::UnaryOp(*op));
        }
        Expression::BinaryOp { op, left, right } => {
            code.extend(compile_expression(left));
            code.extend(compile_expression(right));
            code.push(Bytecode::BinaryOp(*op));
        }
    }
    code
}
