use thiserror::Error;

use crate::ast::Kind;

/// Failures produced while reducing an expression. These never escape the
/// evaluator as `Err`: the dispatcher turns them into `Value::Error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("Function '{func}' passed incorrect number of arguments. Got {got}, Expected {expected}.")]
    Arity {
        func: &'static str,
        got: usize,
        expected: usize,
    },

    #[error("Function '{func}' passed incorrect type for argument {index}. Got {got}, Expected {expected}.")]
    Type {
        func: &'static str,
        index: usize,
        got: Kind,
        expected: Kind,
    },

    #[error("Function '{func}' passed {{}} for argument {index}.")]
    Empty { func: &'static str, index: usize },

    #[error("Unbound Symbol '{0}'")]
    UnboundSymbol(String),

    #[error("Division By Zero!")]
    DivisionByZero,

    #[error("Integer overflow in '{0}'")]
    Overflow(&'static str),

    #[error("S-Expression starts with incorrect type. Got {0}, Expected Function.")]
    NotAFunction(Kind),

    #[error("Function '{func}' cannot define non-symbol. Got {got}, Expected Symbol.")]
    NonSymbol { func: &'static str, got: Kind },

    #[error("Function '{func}' passed {values} values for {symbols} symbols.")]
    BindingCount {
        func: &'static str,
        symbols: usize,
        values: usize,
    },

    #[error("Function passed too many arguments. Got {got}, Expected {expected}.")]
    TooManyArguments { got: usize, expected: usize },

    #[error("Function format invalid. Symbol '&' not followed by single symbol.")]
    MalformedVariadic,
}

/// A syntax error from the reader, located by line and column.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{msg} at {line}:{col}")]
pub struct ReadError {
    pub msg: String,
    pub line: usize,
    pub col: usize,
}

impl ReadError {
    pub fn new(src: &str, byte: usize, msg: impl ToString) -> Self {
        let mut line = 1;
        let mut col = 1;
        for (i, chr) in src.char_indices() {
            if i >= byte { break }
            if chr == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        ReadError {
            msg: msg.to_string(),
            line,
            col,
        }
    }
}
