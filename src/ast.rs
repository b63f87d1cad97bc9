use std::fmt::{self, Debug, Display, Formatter};

use crate::error::EvalError;
use crate::evaluator::Environment;
use crate::std_lib::Builtin;

/// The marker symbol that introduces a variadic formal: `{x & rest}`.
pub const VARIADIC: &str = "&";

/// Every runtime datum. Lists own their children outright; cloning a value
/// is always a deep copy, so two owners never share a child.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(i64),
    Error(String),
    Symbol(String),
    SExpr(Vec<Value>),
    QExpr(Vec<Value>),
    Function(Function),
}

#[derive(Clone)]
pub enum Function {
    Builtin(Builtin),
    Lambda {
        formals: Vec<String>,
        body: Vec<Value>,
        env: Environment,
    },
}

/// The tag of a [`Value`], used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Number,
    Error,
    Symbol,
    SExpr,
    QExpr,
    Function,
}

impl Value {
    pub fn symbol(name: impl ToString) -> Value {
        Value::Symbol(name.to_string())
    }

    pub fn error(msg: impl ToString) -> Value {
        Value::Error(msg.to_string())
    }

    /// The empty S-Expression, `()`.
    pub fn sexpr() -> Value {
        Value::SExpr(Vec::new())
    }

    pub fn qexpr() -> Value {
        Value::QExpr(Vec::new())
    }

    pub fn boolean(b: bool) -> Value {
        Value::Number(b as i64)
    }

    pub fn kind(&self) -> Kind {
        use Value::*;

        match self {
            Number(_)   => Kind::Number,
            Error(_)    => Kind::Error,
            Symbol(_)   => Kind::Symbol,
            SExpr(_)    => Kind::SExpr,
            QExpr(_)    => Kind::QExpr,
            Function(_) => Kind::Function,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn as_number(&self) -> Option<i64> {
        if let Self::Number(n) = self {
            Some(*n)
        } else {
            None
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        if let Self::Symbol(s) = self {
            Some(s)
        } else {
            None
        }
    }

    pub fn cells(&self) -> Option<&[Value]> {
        match self {
            Value::SExpr(cells) | Value::QExpr(cells) => Some(cells),
            _ => None,
        }
    }

    pub fn cells_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::SExpr(cells) | Value::QExpr(cells) => Some(cells),
            _ => None,
        }
    }

    pub fn into_cells(self) -> Option<Vec<Value>> {
        match self {
            Value::SExpr(cells) | Value::QExpr(cells) => Some(cells),
            _ => None,
        }
    }

    /// Number of children of a list, zero for anything else.
    pub fn len(&self) -> usize {
        self.cells().map_or(0, <[Value]>::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes the child at `i`, shifting the rest down.
    pub fn pop(&mut self, i: usize) -> Option<Value> {
        let cells = self.cells_mut()?;
        if i < cells.len() {
            Some(cells.remove(i))
        } else {
            None
        }
    }

    /// Like [`Value::pop`], but drops whatever is left of the list.
    pub fn take(mut self, i: usize) -> Option<Value> {
        self.pop(i)
    }

    /// Moves every child of `other` onto the end of `self`. Both must be
    /// lists; anything else leaves `self` untouched.
    pub fn join(mut self, other: Value) -> Value {
        if let (Some(cells), Some(more)) = (self.cells_mut(), other.into_cells()) {
            cells.extend(more);
        }
        self
    }

    /// Re-tags a Q-Expression as an S-Expression so it can be reduced.
    pub fn into_sexpr(self) -> Value {
        match self {
            Value::QExpr(cells) => Value::SExpr(cells),
            other => other,
        }
    }

    pub fn into_qexpr(self) -> Value {
        match self {
            Value::SExpr(cells) => Value::QExpr(cells),
            other => other,
        }
    }
}

impl From<EvalError> for Value {
    fn from(err: EvalError) -> Value {
        Value::Error(err.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Value {
        Value::Number(n)
    }
}

impl From<Builtin> for Value {
    fn from(builtin: Builtin) -> Value {
        Value::Function(Function::Builtin(builtin))
    }
}

// Closures compare by shape only. The captured environment is not part of
// a function's identity.
impl PartialEq for Function {
    fn eq(&self, other: &Function) -> bool {
        use Function::*;

        match (self, other) {
            (Builtin(a), Builtin(b)) => a == b,
            (
                Lambda { formals: fa, body: ba, .. },
                Lambda { formals: fb, body: bb, .. },
            ) => fa == fb && ba == bb,
            _ => false,
        }
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let name = match self {
            Kind::Number   => "Number",
            Kind::Error    => "Error",
            Kind::Symbol   => "Symbol",
            Kind::SExpr    => "S-Expression",
            Kind::QExpr    => "Q-Expression",
            Kind::Function => "Function",
        };
        f.write_str(name)
    }
}

fn fmt_cells(cells: &[Value], open: char, close: char, f: &mut Formatter) -> fmt::Result {
    write!(f, "{}", open)?;
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        Display::fmt(cell, f)?;
    }
    write!(f, "{}", close)
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        use Value::*;

        match self {
            Number(n)     => Display::fmt(n, f),
            Error(msg)    => write!(f, "Error: {}", msg),
            Symbol(s)     => Display::fmt(s, f),
            SExpr(cells)  => fmt_cells(cells, '(', ')', f),
            QExpr(cells)  => fmt_cells(cells, '{', '}', f),
            Function(fun) => Display::fmt(fun, f),
        }
    }
}

impl Debug for Function {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Function::Builtin(builtin) => write!(f, "<builtin {}>", builtin.name()),
            Function::Lambda { formals, body, .. } => {
                write!(f, "(\\ {{{}}} ", formals.join(" "))?;
                fmt_cells(body, '{', '}', f)?;
                write!(f, ")")
            }
        }
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn nums(ns: &[i64]) -> Vec<Value> {
        ns.iter().copied().map(Value::Number).collect()
    }

    #[test]
    fn pop_shifts_remaining_cells() {
        let mut list = Value::QExpr(nums(&[1, 2, 3]));
        assert_eq!(list.pop(1), Some(Value::Number(2)));
        assert_eq!(list, Value::QExpr(nums(&[1, 3])));
        assert_eq!(list.pop(5), None);
    }

    #[test]
    fn take_returns_single_cell() {
        let list = Value::SExpr(nums(&[4, 5, 6]));
        assert_eq!(list.take(2), Some(Value::Number(6)));
        assert_eq!(Value::Number(1).take(0), None);
    }

    #[test]
    fn join_appends_in_order() {
        let joined = Value::QExpr(nums(&[1])).join(Value::QExpr(nums(&[2, 3])));
        assert_eq!(joined, Value::QExpr(nums(&[1, 2, 3])));
    }

    #[test]
    fn equality_requires_matching_tags() {
        assert_ne!(Value::SExpr(nums(&[1])), Value::QExpr(nums(&[1])));
        assert_ne!(Value::symbol("x"), Value::error("x"));
        assert_ne!(Value::QExpr(nums(&[1, 2])), Value::QExpr(nums(&[1, 2, 3])));
        assert_eq!(Value::error("boom"), Value::error("boom"));
    }

    #[test]
    fn lambdas_compare_by_formals_and_body() {
        let make = |env: Environment| {
            Value::Function(Function::Lambda {
                formals: vec!["x".into()],
                body: vec![Value::symbol("x")],
                env,
            })
        };
        assert_eq!(make(Environment::new()), make(Environment::new()));
        assert_ne!(make(Environment::new()), Value::from(Builtin::List));
        assert_eq!(Value::from(Builtin::Head), Value::from(Builtin::Head));
        assert_ne!(Value::from(Builtin::Head), Value::from(Builtin::Tail));
    }

    #[test]
    fn display_uses_bracket_conventions() {
        let v = Value::SExpr(vec![
            Value::symbol("+"),
            Value::Number(-1),
            Value::QExpr(vec![Value::symbol("a"), Value::sexpr()]),
        ]);
        assert_eq!(v.to_string(), "(+ -1 {a ()})");
        assert_eq!(Value::error("oops").to_string(), "Error: oops");
        assert_eq!(Value::from(Builtin::Eval).to_string(), "<builtin eval>");

        let lambda = Value::Function(Function::Lambda {
            formals: vec!["a".into(), "b".into()],
            body: vec![Value::symbol("+"), Value::symbol("a"), Value::symbol("b")],
            env: Environment::new(),
        });
        assert_eq!(lambda.to_string(), "(\\ {a b} {+ a b})");
    }
}
