use std::collections::HashMap;

use lazy_static::lazy_static;
use tracing::debug;

use crate::ast::*;
use crate::error::EvalError;
use crate::evaluator::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrdOp {
    Gt,
    Lt,
    Ge,
    Le,
}

/// Every native procedure, chosen once when the root scope is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Arith(ArithOp),
    List,
    Head,
    Tail,
    Eval,
    Join,
    Def,
    Put,
    Undef,
    Lambda,
    Eq,
    Ne,
    Ord(OrdOp),
    If,
    Print,
}

impl Builtin {
    pub const ALL: [Builtin; 22] = [
        Builtin::Def,
        Builtin::Undef,
        Builtin::Lambda,
        Builtin::Put,
        Builtin::List,
        Builtin::Head,
        Builtin::Tail,
        Builtin::Eval,
        Builtin::Join,
        Builtin::Arith(ArithOp::Add),
        Builtin::Arith(ArithOp::Sub),
        Builtin::Arith(ArithOp::Mul),
        Builtin::Arith(ArithOp::Div),
        Builtin::Arith(ArithOp::Mod),
        Builtin::If,
        Builtin::Eq,
        Builtin::Ne,
        Builtin::Ord(OrdOp::Gt),
        Builtin::Ord(OrdOp::Lt),
        Builtin::Ord(OrdOp::Ge),
        Builtin::Ord(OrdOp::Le),
        Builtin::Print,
    ];

    pub fn name(self) -> &'static str {
        use Builtin::*;

        match self {
            Arith(ArithOp::Add) => "+",
            Arith(ArithOp::Sub) => "-",
            Arith(ArithOp::Mul) => "*",
            Arith(ArithOp::Div) => "/",
            Arith(ArithOp::Mod) => "%",
            List   => "list",
            Head   => "head",
            Tail   => "tail",
            Eval   => "eval",
            Join   => "join",
            Def    => "def",
            Put    => "=",
            Undef  => "undef",
            Lambda => "\\",
            Eq     => "==",
            Ne     => "!=",
            Ord(OrdOp::Gt) => ">",
            Ord(OrdOp::Lt) => "<",
            Ord(OrdOp::Ge) => ">=",
            Ord(OrdOp::Le) => "<=",
            If     => "if",
            Print  => "print",
        }
    }

    pub fn from_name(name: &str) -> Option<Builtin> {
        BUILTINS.get(name).copied()
    }

    /// Runs the procedure. `args` are already evaluated and owned by the
    /// callee; every precondition is checked before anything is bound.
    pub fn apply(self, env: &Environment, args: Vec<Value>) -> Result<Value, EvalError> {
        use Builtin::*;

        match self {
            Arith(op)     => arith_impl(op, args),
            List          => Ok(Value::SExpr(args).into_qexpr()),
            Head          => head_impl(args),
            Tail          => tail_impl(args),
            Eval          => eval_impl(env, args),
            Join          => join_impl(args),
            Def | Put     => var_impl(self, env, args),
            Undef         => undef_impl(env, args),
            Lambda        => lambda_impl(env, args),
            Eq            => Ok(Value::boolean(cmp_impl(self, args)?)),
            Ne            => Ok(Value::boolean(!cmp_impl(self, args)?)),
            Ord(op)       => ord_impl(op, args),
            If            => if_impl(env, args),
            Print         => print_impl(args),
        }
    }
}

lazy_static! {
    static ref BUILTINS: HashMap<&'static str, Builtin> =
        Builtin::ALL.iter().map(|b| (b.name(), *b)).collect();
}

/// Installs the whole library into `env`.
pub fn register_builtins(env: &Environment) {
    for (name, builtin) in BUILTINS.iter() {
        env.put_var(name, Value::from(*builtin));
    }
}

fn exact<const N: usize>(func: Builtin, args: Vec<Value>) -> Result<[Value; N], EvalError> {
    <[Value; N]>::try_from(args).map_err(|args| EvalError::Arity {
        func: func.name(),
        got: args.len(),
        expected: N,
    })
}

fn expect_kind(func: Builtin, index: usize, val: &Value, expected: Kind) -> Result<(), EvalError> {
    if val.kind() == expected {
        Ok(())
    } else {
        Err(EvalError::Type {
            func: func.name(),
            index,
            got: val.kind(),
            expected,
        })
    }
}

fn expect_number(func: Builtin, index: usize, val: &Value) -> Result<i64, EvalError> {
    expect_kind(func, index, val, Kind::Number)?;
    Ok(val.as_number().unwrap_or_default())
}

fn expect_non_empty(func: Builtin, index: usize, val: &Value) -> Result<(), EvalError> {
    if val.is_empty() {
        Err(EvalError::Empty { func: func.name(), index })
    } else {
        Ok(())
    }
}

/// Checks that `list` holds only symbols and returns their names.
fn symbol_names(func: Builtin, list: &Value) -> Result<Vec<String>, EvalError> {
    list.cells()
        .unwrap_or_default()
        .iter()
        .map(|cell| {
            cell.as_symbol().map(str::to_string).ok_or(EvalError::NonSymbol {
                func: func.name(),
                got: cell.kind(),
            })
        })
        .collect()
}

impl ArithOp {
    fn fold(self, lhs: i64, rhs: i64) -> Result<i64, EvalError> {
        use ArithOp::*;

        let res = match self {
            Div | Mod if rhs == 0 => return Err(EvalError::DivisionByZero),
            Add => lhs.checked_add(rhs),
            Sub => lhs.checked_sub(rhs),
            Mul => lhs.checked_mul(rhs),
            Div => lhs.checked_div(rhs),
            Mod => lhs.checked_rem(rhs),
        };
        res.ok_or(EvalError::Overflow(Builtin::Arith(self).name()))
    }
}

fn arith_impl(op: ArithOp, args: Vec<Value>) -> Result<Value, EvalError> {
    let func = Builtin::Arith(op);
    let nums = args
        .iter()
        .enumerate()
        .map(|(i, arg)| expect_number(func, i, arg))
        .collect::<Result<Vec<i64>, _>>()?;

    let (&first, rest) = nums.split_first().ok_or(EvalError::Arity {
        func: func.name(),
        got: 0,
        expected: 1,
    })?;

    if op == ArithOp::Sub && rest.is_empty() {
        return first
            .checked_neg()
            .map(Value::Number)
            .ok_or(EvalError::Overflow(func.name()));
    }

    rest.iter()
        .try_fold(first, |acc, &rhs| op.fold(acc, rhs))
        .map(Value::Number)
}

fn head_impl(args: Vec<Value>) -> Result<Value, EvalError> {
    let func = Builtin::Head;
    let [list] = exact::<1>(func, args)?;
    expect_kind(func, 0, &list, Kind::QExpr)?;
    expect_non_empty(func, 0, &list)?;

    let first = list.take(0).into_iter().collect();
    Ok(Value::QExpr(first))
}

fn tail_impl(args: Vec<Value>) -> Result<Value, EvalError> {
    let func = Builtin::Tail;
    let [mut list] = exact::<1>(func, args)?;
    expect_kind(func, 0, &list, Kind::QExpr)?;
    expect_non_empty(func, 0, &list)?;

    list.pop(0);
    Ok(list)
}

fn eval_impl(env: &Environment, args: Vec<Value>) -> Result<Value, EvalError> {
    let func = Builtin::Eval;
    let [expr] = exact::<1>(func, args)?;
    expect_kind(func, 0, &expr, Kind::QExpr)?;

    Ok(evaluate(env, expr.into_sexpr()))
}

fn join_impl(args: Vec<Value>) -> Result<Value, EvalError> {
    let func = Builtin::Join;
    for (i, arg) in args.iter().enumerate() {
        expect_kind(func, i, arg, Kind::QExpr)?;
    }

    Ok(args.into_iter().fold(Value::qexpr(), Value::join))
}

fn var_impl(func: Builtin, env: &Environment, mut args: Vec<Value>) -> Result<Value, EvalError> {
    let first = args.first().ok_or(EvalError::Arity {
        func: func.name(),
        got: 0,
        expected: 1,
    })?;
    expect_kind(func, 0, first, Kind::QExpr)?;
    let names = symbol_names(func, first)?;

    let values = args.split_off(1);
    if names.len() != values.len() {
        return Err(EvalError::BindingCount {
            func: func.name(),
            symbols: names.len(),
            values: values.len(),
        });
    }

    let global = func == Builtin::Def;
    for (name, val) in names.into_iter().zip(values) {
        debug!(name = %name, global, "binding");
        if global {
            env.def_var(name, val);
        } else {
            env.put_var(name, val);
        }
    }
    Ok(Value::sexpr())
}

fn undef_impl(env: &Environment, args: Vec<Value>) -> Result<Value, EvalError> {
    let func = Builtin::Undef;
    let [syms] = exact::<1>(func, args)?;
    expect_kind(func, 0, &syms, Kind::QExpr)?;

    for name in symbol_names(func, &syms)? {
        let existed = env.unbind_var(&name);
        debug!(name = %name, existed, "unbinding");
    }
    Ok(Value::sexpr())
}

fn lambda_impl(env: &Environment, args: Vec<Value>) -> Result<Value, EvalError> {
    let func = Builtin::Lambda;
    let [formals, body] = exact::<2>(func, args)?;
    expect_kind(func, 0, &formals, Kind::QExpr)?;
    expect_kind(func, 1, &body, Kind::QExpr)?;

    let formals = symbol_names(func, &formals)?;
    Ok(Value::Function(Function::Lambda {
        formals,
        body: body.into_cells().unwrap_or_default(),
        env: env.clone(),
    }))
}

fn cmp_impl(func: Builtin, args: Vec<Value>) -> Result<bool, EvalError> {
    let [lhs, rhs] = exact::<2>(func, args)?;
    Ok(lhs == rhs)
}

fn ord_impl(op: OrdOp, args: Vec<Value>) -> Result<Value, EvalError> {
    let func = Builtin::Ord(op);
    let [lhs, rhs] = exact::<2>(func, args)?;
    let lhs = expect_number(func, 0, &lhs)?;
    let rhs = expect_number(func, 1, &rhs)?;

    Ok(Value::boolean(match op {
        OrdOp::Gt => lhs > rhs,
        OrdOp::Lt => lhs < rhs,
        OrdOp::Ge => lhs >= rhs,
        OrdOp::Le => lhs <= rhs,
    }))
}

fn if_impl(env: &Environment, args: Vec<Value>) -> Result<Value, EvalError> {
    let func = Builtin::If;
    let [cond, then_branch, else_branch] = exact::<3>(func, args)?;
    let cond = expect_number(func, 0, &cond)?;
    expect_kind(func, 1, &then_branch, Kind::QExpr)?;
    expect_kind(func, 2, &else_branch, Kind::QExpr)?;

    let branch = if cond != 0 { then_branch } else { else_branch };
    Ok(evaluate(env, branch.into_sexpr()))
}

fn print_impl(args: Vec<Value>) -> Result<Value, EvalError> {
    let line = args
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    println!("{}", line);
    Ok(Value::sexpr())
}
