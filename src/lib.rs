//! A small Lisp with quoted expressions: numbers, symbols, S-Expressions
//! that reduce by application, and Q-Expressions that stay inert until
//! `eval` or `if` turns them back into code.

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod reader;
pub mod std_lib;

pub use ast::{Function, Kind, Value};
pub use error::{EvalError, ReadError};
pub use evaluator::{call, evaluate, Environment};
pub use reader::Reader;
pub use std_lib::Builtin;

/// Reads `source` as one program and reduces it in `env`.
pub fn eval_str(env: &Environment, source: &str) -> Result<Value, ReadError> {
    let program = Reader::new(source).parse_program()?;
    Ok(evaluate(env, program))
}

/// Reads every top-level expression of `source` and reduces each in turn,
/// returning all results.
pub fn eval_each(env: &Environment, source: &str) -> Result<Vec<Value>, ReadError> {
    let exprs = Reader::new(source).parse_exprs()?;
    Ok(exprs.into_iter().map(|expr| evaluate(env, expr)).collect())
}
