use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::ast::{BinOp, Constant, UnOp};
use crate::bytecode::Bytecode;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("LOAD: undefined variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("{opcode}: stack underflow")]
    StackUnderflow { opcode: &'static str },
    #[error("UNARYOP '{op}': unsupported operand type {operand}")]
    UnsupportedUnaryOperand { op: UnOp, operand: &'static str },
    #[error("BINARYOP '{op}': unsupported operand types {left} and {right}")]
    UnsupportedBinaryOperands {
        op: BinOp,
        left: &'static str,
        right: &'static str,
    },
    #[error("BINARYOP '{op}': division by zero")]
    DivisionByZero { op: BinOp },
    #[error("POP_JUMP_IF_FALSE: jump target {target} out of range")]
    InvalidJumpTarget { target: usize },
}

/// Runtime value. `None` is the absent-value sentinel: it is the only thing
/// `POP_JUMP_IF_FALSE` treats as falsy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    None,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::None => "NoneType",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value:?}"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::None => f.write_str("None"),
        }
    }
}

impl From<Constant> for Value {
    fn from(constant: Constant) -> Self {
        match constant {
            Constant::Int(value) => Value::Int(value),
            Constant::Float(value) => Value::Float(value),
            Constant::Bool(value) => Value::Bool(value),
        }
    }
}

/// Final state of one execution: every variable binding plus the value the
/// last POP recorded, if any statement produced one.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub scope: HashMap<String, Value>,
    pub last_result: Option<Value>,
}

impl Outcome {
    /// Stable scope rendering with keys in sorted order.
    pub fn render_scope(&self) -> String {
        let mut names: Vec<&String> = self.scope.keys().collect();
        names.sort();
        let entries = names
            .iter()
            .map(|name| format!("{name}: {}", self.scope[*name]))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{{{entries}}}")
    }
}

/// Stack machine over one immutable bytecode sequence. An instance owns its
/// stack, scope, and instruction pointer, and runs exactly once.
pub struct Interpreter {
    bytecode: Vec<Bytecode>,
    stack: Vec<Value>,
    scope: HashMap<String, Value>,
    ptr: usize,
    last_result: Option<Value>,
}

impl Interpreter {
    pub fn new(bytecode: Vec<Bytecode>) -> Self {
        Self {
            bytecode,
            stack: Vec::new(),
            scope: HashMap::new(),
            ptr: 0,
            last_result: None,
        }
    }

    pub fn run(mut self) -> Result<Outcome, ExecutionError> {
        while self.ptr < self.bytecode.len() {
            self.step()?;
        }
        Ok(Outcome {
            scope: self.scope,
            last_result: self.last_result,
        })
    }

    fn step(&mut self) -> Result<(), ExecutionError> {
        let instruction = self.bytecode[self.ptr].clone();
        match instruction {
            Bytecode::Push(value) => {
                self.stack.push(value);
                self.ptr += 1;
            }
            Bytecode::Pop => {
                self.last_result = Some(self.pop("POP")?);
                self.ptr += 1;
            }
            Bytecode::Copy => {
                let top = *self
                    .stack
                    .last()
                    .ok_or(ExecutionError::StackUnderflow { opcode: "COPY" })?;
                self.stack.push(top);
                self.ptr += 1;
            }
            Bytecode::Save(name) => {
                let value = self.pop("SAVE")?;
                self.scope.insert(name, value);
                self.ptr += 1;
            }
            Bytecode::Load(name) => {
                let value = *self
                    .scope
                    .get(&name)
                    .ok_or(ExecutionError::UndefinedVariable { name: name.clone() })?;
                self.stack.push(value);
                self.ptr += 1;
            }
            Bytecode::UnaryOp(op) => {
                let operand = self.pop("UNARYOP")?;
                self.stack.push(apply_unary(op, operand)?);
                self.ptr += 1;
            }
            Bytecode::BinaryOp(op) => {
                let right = self.pop("BINARYOP")?;
                let left = self.pop("BINARYOP")?;
                self.stack.push(apply_binary(op, left, right)?);
                self.ptr += 1;
            }
            Bytecode::PopJumpIfFalse(offset) => {
                let condition = self.pop("POP_JUMP_IF_FALSE")?;
                // Only the absence of a value is falsy; an explicit False is
                // not, and does not take the jump.
                if matches!(condition, Value::None) {
                    let target = self.ptr + offset;
                    if target > self.bytecode.len() {
                        return Err(ExecutionError::InvalidJumpTarget { target });
                    }
                    self.ptr = target;
                } else {
                    self.ptr += 1;
                }
            }
        }
        Ok(())
    }

    fn pop(&mut self, opcode: &'static str) -> Result<Value, ExecutionError> {
        self.stack
            .pop()
            .ok_or(ExecutionError::StackUnderflow { opcode })
    }
}

fn apply_unary(op: UnOp, operand: Value) -> Result<Value, ExecutionError> {
    let result = match (op, operand) {
        (UnOp::Pos, Value::Int(_) | Value::Float(_)) => operand,
        (UnOp::Neg, Value::Int(value)) => Value::Int(value.wrapping_neg()),
        (UnOp::Neg, Value::Float(value)) => Value::Float(-value),
        (UnOp::Not, Value::Bool(value)) => Value::Bool(!value),
        _ => {
            return Err(ExecutionError::UnsupportedUnaryOperand {
                op,
                operand: operand.type_name(),
            });
        }
    };
    Ok(result)
}

fn apply_binary(op: BinOp, left: Value, right: Value) -> Result<Value, ExecutionError> {
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => apply_int_binary(op, l, r),
        (Value::Int(l), Value::Float(r)) => Ok(apply_float_binary(op, l as f64, r)),
        (Value::Float(l), Value::Int(r)) => Ok(apply_float_binary(op, l, r as f64)),
        (Value::Float(l), Value::Float(r)) => Ok(apply_float_binary(op, l, r)),
        _ => Err(ExecutionError::UnsupportedBinaryOperands {
            op,
            left: left.type_name(),
            right: right.type_name(),
        }),
    }
}

fn apply_int_binary(op: BinOp, left: i64, right: i64) -> Result<Value, ExecutionError> {
    let result = match op {
        BinOp::Add => left.wrapping_add(right),
        BinOp::Sub => left.wrapping_sub(right),
        BinOp::Mul => left.wrapping_mul(right),
        BinOp::Div => {
            if right == 0 {
                return Err(ExecutionError::DivisionByZero { op });
            }
            left.wrapping_div(right)
        }
        BinOp::Mod => {
            if right == 0 {
                return Err(ExecutionError::DivisionByZero { op });
            }
            left.wrapping_rem(right)
        }
        BinOp::Pow => match u32::try_from(right) {
            Ok(exponent) => left.wrapping_pow(exponent),
            // A negative exponent goes through float and truncates toward
            // zero, keeping int ** int integral.
            Err(_) => (left as f64).powf(right as f64) as i64,
        },
    };
    Ok(Value::Int(result))
}

fn apply_float_binary(op: BinOp, left: f64, right: f64) -> Value {
    let result = match op {
        BinOp::Add => left + right,
        BinOp::Sub => left - right,
        BinOp::Mul => left * right,
        BinOp::Div => left / right,
        BinOp::Mod => left % right,
        BinOp::Pow => left.powf(right),
    };
    Value::Float(result)
}

pub fn interpret(bytecode: Vec<Bytecode>) -> Result<Outcome, ExecutionError> {
    Interpreter::new(bytecode).run()
}
