use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::ast::*;
use crate::error::EvalError;
use crate::std_lib;

struct Scope {
    vars: HashMap<String, Value>,
    parent: Option<Environment>,
}

/// A handle to one scope in the lexical chain. Cloning the handle shares
/// the scope, which is how closures keep their defining scope alive.
#[derive(Clone)]
pub struct Environment(Rc<RefCell<Scope>>);

impl Environment {
    /// An empty root scope.
    pub fn new() -> Self {
        Environment(Rc::new(RefCell::new(Scope {
            vars: HashMap::new(),
            parent: None,
        })))
    }

    /// A root scope holding every builtin procedure.
    pub fn with_builtins() -> Self {
        let env = Environment::new();
        std_lib::register_builtins(&env);
        env
    }

    pub fn child(&self) -> Self {
        Environment(Rc::new(RefCell::new(Scope {
            vars: HashMap::new(),
            parent: Some(self.clone()),
        })))
    }

    fn parent(&self) -> Option<Environment> {
        self.0.borrow().parent.clone()
    }

    pub fn root(&self) -> Environment {
        let mut env = self.clone();
        while let Some(parent) = env.parent() {
            env = parent;
        }
        env
    }

    #[cfg(test)]
    pub(crate) fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Searches this scope and then each ancestor, returning a copy.
    pub fn lookup_var(&self, name: impl AsRef<str>) -> Option<Value> {
        let scope = self.0.borrow();
        if let Some(val) = scope.vars.get(name.as_ref()) {
            return Some(val.clone());
        }
        scope.parent.as_ref()?.lookup_var(name)
    }

    pub fn get_var(&self, name: impl AsRef<str>) -> Result<Value, EvalError> {
        self.lookup_var(name.as_ref())
            .ok_or_else(|| EvalError::UnboundSymbol(name.as_ref().to_string()))
    }

    #[cfg(test)]
    pub(crate) fn is_bound_here(&self, name: impl AsRef<str>) -> bool {
        self.0.borrow().vars.contains_key(name.as_ref())
    }

    /// Binds in this scope, shadowing any ancestor binding.
    pub fn put_var(&self, name: impl ToString, val: Value) {
        self.0.borrow_mut().vars.insert(name.to_string(), val);
    }

    /// Binds in the root scope, visible from everywhere.
    pub fn def_var(&self, name: impl ToString, val: Value) {
        self.root().put_var(name, val);
    }

    /// Removes a binding from this scope only. Returns whether it existed.
    pub fn unbind_var(&self, name: impl AsRef<str>) -> bool {
        let old = self.0.borrow_mut().vars.remove(name.as_ref());
        old.is_some()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

// Bindings routinely hold closures that point back at this scope, so only
// the names are printed.
impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let scope = self.0.borrow();
        let mut names: Vec<&String> = scope.vars.keys().collect();
        names.sort();
        f.debug_struct("Environment")
            .field("vars", &names)
            .field("has_parent", &scope.parent.is_some())
            .finish()
    }
}

/// Reduces `value` to normal form.
pub fn evaluate(env: &Environment, value: Value) -> Value {
    match value {
        Value::Symbol(name) => env.get_var(&name).unwrap_or_else(Value::from),
        Value::SExpr(cells) => evaluate_sexpr(env, cells),
        value => value,
    }
}

fn evaluate_sexpr(env: &Environment, cells: Vec<Value>) -> Value {
    let mut evaluated = Vec::with_capacity(cells.len());
    for cell in cells {
        let val = evaluate(env, cell);
        if val.is_error() {
            return val;
        }
        evaluated.push(val);
    }

    if evaluated.len() <= 1 {
        return evaluated.pop().unwrap_or_else(Value::sexpr);
    }

    let args = evaluated.split_off(1);
    match evaluated.pop() {
        Some(Value::Function(fun)) => call(env, fun, args),
        Some(other) => EvalError::NotAFunction(other.kind()).into(),
        None => Value::sexpr(),
    }
}

/// Applies `fun` to already evaluated arguments. `env` is the caller's
/// scope, which builtins such as `def` and `eval` act on.
pub fn call(env: &Environment, fun: Function, args: Vec<Value>) -> Value {
    match fun {
        Function::Builtin(builtin) => {
            trace!(builtin = builtin.name(), argc = args.len(), "calling builtin");
            builtin.apply(env, args).unwrap_or_else(Value::from)
        }

        Function::Lambda { formals, body, env: captured } => {
            call_lambda(formals, body, &captured, args).unwrap_or_else(Value::from)
        }
    }
}

fn call_lambda(
    formals: Vec<String>,
    body: Vec<Value>,
    captured: &Environment,
    args: Vec<Value>,
) -> Result<Value, EvalError> {
    let given = args.len();
    let total = formals.len();

    let local = captured.child();
    let mut formals: VecDeque<String> = formals.into();
    let mut args: VecDeque<Value> = args.into();

    while let Some(arg) = args.pop_front() {
        let sym = formals.pop_front().ok_or(EvalError::TooManyArguments {
            got: given,
            expected: total,
        })?;

        if sym == VARIADIC {
            let rest = variadic_name(&mut formals)?;
            args.push_front(arg);
            local.put_var(rest, Value::QExpr(args.drain(..).collect()));
            break;
        }

        local.put_var(sym, arg);
    }

    // Nothing left for the variadic formal to collect.
    if formals.front().map(String::as_str) == Some(VARIADIC) {
        formals.pop_front();
        let rest = variadic_name(&mut formals)?;
        local.put_var(rest, Value::qexpr());
    }

    if formals.is_empty() {
        debug!(argc = given, "calling lambda");
        Ok(evaluate(&local, Value::SExpr(body)))
    } else {
        debug!(argc = given, remaining = formals.len(), "partially applied lambda");
        Ok(Value::Function(Function::Lambda {
            formals: formals.into(),
            body,
            env: local,
        }))
    }
}

/// Pops the single symbol that must follow `&` in a formal list.
fn variadic_name(formals: &mut VecDeque<String>) -> Result<String, EvalError> {
    match (formals.pop_front(), formals.is_empty()) {
        (Some(name), true) if name != VARIADIC => Ok(name),
        _ => Err(EvalError::MalformedVariadic),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::std_lib::Builtin;
    use pretty_assertions::assert_eq;

    fn sexpr(cells: Vec<Value>) -> Value {
        Value::SExpr(cells)
    }

    fn sym(name: &str) -> Value {
        Value::symbol(name)
    }

    fn lambda(env: &Environment, formals: &[&str], body: Vec<Value>) -> Function {
        Function::Lambda {
            formals: formals.iter().map(|s| s.to_string()).collect(),
            body,
            env: env.clone(),
        }
    }

    #[test]
    fn lookup_walks_to_the_root() {
        let root = Environment::new();
        root.put_var("x", Value::Number(1));
        let inner = root.child().child();
        assert_eq!(inner.lookup_var("x"), Some(Value::Number(1)));
        assert_eq!(
            inner.get_var("y"),
            Err(EvalError::UnboundSymbol("y".to_string()))
        );
    }

    #[test]
    fn put_shadows_without_touching_parent() {
        let root = Environment::new();
        root.put_var("x", Value::Number(1));
        let inner = root.child();
        inner.put_var("x", Value::Number(2));
        assert_eq!(inner.lookup_var("x"), Some(Value::Number(2)));
        assert_eq!(root.lookup_var("x"), Some(Value::Number(1)));
    }

    #[test]
    fn def_always_lands_in_the_root() {
        let root = Environment::new();
        let inner = root.child().child();
        inner.def_var("g", Value::Number(7));
        assert!(root.is_bound_here("g"));
        assert!(!inner.is_bound_here("g"));
        assert!(inner.root().ptr_eq(&root));
    }

    #[test]
    fn unbind_only_touches_own_scope() {
        let root = Environment::new();
        root.put_var("x", Value::Number(1));
        let inner = root.child();
        assert!(!inner.unbind_var("x"));
        assert_eq!(inner.lookup_var("x"), Some(Value::Number(1)));
        assert!(root.unbind_var("x"));
        assert!(!root.unbind_var("x"));
    }

    #[test]
    fn lookup_returns_an_independent_copy() {
        let env = Environment::new();
        env.put_var("l", Value::QExpr(vec![Value::Number(1)]));
        let mut copy = env.lookup_var("l").unwrap();
        copy.pop(0);
        assert_eq!(env.lookup_var("l"), Some(Value::QExpr(vec![Value::Number(1)])));
    }

    #[test]
    fn normal_forms_are_returned_unchanged() {
        let env = Environment::with_builtins();
        for v in [
            Value::Number(3),
            Value::error("x"),
            Value::QExpr(vec![sym("undefined"), Value::Number(1)]),
            Value::from(Builtin::Head),
        ] {
            assert_eq!(evaluate(&env, v.clone()), v);
        }
    }

    #[test]
    fn empty_and_singleton_sexprs() {
        let env = Environment::with_builtins();
        assert_eq!(evaluate(&env, Value::sexpr()), Value::sexpr());
        assert_eq!(evaluate(&env, sexpr(vec![Value::Number(5)])), Value::Number(5));
        assert_eq!(
            evaluate(&env, sexpr(vec![sexpr(vec![Value::Number(5)])])),
            Value::Number(5)
        );
    }

    #[test]
    fn application_requires_a_function() {
        let env = Environment::with_builtins();
        let res = evaluate(&env, sexpr(vec![Value::Number(1), Value::Number(2)]));
        assert_eq!(res, EvalError::NotAFunction(Kind::Number).into());
    }

    #[test]
    fn first_error_stops_reduction() {
        let env = Environment::with_builtins();
        let expr = sexpr(vec![
            sym("+"),
            sym("nope"),
            sexpr(vec![sym("def"), Value::QExpr(vec![sym("x")]), Value::Number(1)]),
        ]);
        assert_eq!(
            evaluate(&env, expr),
            EvalError::UnboundSymbol("nope".to_string()).into()
        );
        assert_eq!(env.lookup_var("x"), None);
    }

    #[test]
    fn closure_partial_and_full_application() {
        let env = Environment::with_builtins();
        let add = lambda(&env, &["a", "b"], vec![sym("+"), sym("a"), sym("b")]);

        let full = call(&env, add.clone(), vec![Value::Number(1), Value::Number(2)]);
        assert_eq!(full, Value::Number(3));

        let partial = match call(&env, add, vec![Value::Number(1)]) {
            Value::Function(f) => f,
            other => panic!("expected a function, got {}", other),
        };
        match &partial {
            Function::Lambda { formals, .. } => assert_eq!(formals, &vec!["b".to_string()]),
            other => panic!("expected a closure, got {}", other),
        }
        assert_eq!(call(&env, partial, vec![Value::Number(2)]), Value::Number(3));
    }

    #[test]
    fn closure_rejects_extra_arguments() {
        let env = Environment::with_builtins();
        let id = lambda(&env, &["x"], vec![sym("x")]);
        let res = call(&env, id, vec![Value::Number(1), Value::Number(2)]);
        assert_eq!(
            res,
            EvalError::TooManyArguments { got: 2, expected: 1 }.into()
        );
    }

    #[test]
    fn variadic_formal_collects_rest() {
        let env = Environment::with_builtins();
        let f = lambda(&env, &["x", "&", "xs"], vec![sym("xs")]);
        let args = vec![Value::Number(1), Value::Number(2), Value::Number(3)];
        assert_eq!(
            call(&env, f.clone(), args),
            Value::QExpr(vec![Value::Number(2), Value::Number(3)])
        );
        assert_eq!(call(&env, f, vec![Value::Number(1)]), Value::qexpr());
    }

    #[test]
    fn malformed_variadic_is_an_error() {
        let env = Environment::with_builtins();
        let f = lambda(&env, &["&", "a", "b"], vec![sym("a")]);
        assert_eq!(
            call(&env, f, vec![Value::Number(1)]),
            EvalError::MalformedVariadic.into()
        );
    }

    #[test]
    fn call_scope_is_discarded_after_return() {
        let env = Environment::with_builtins();
        let f = lambda(&env, &["x"], vec![sym("x")]);
        call(&env, f, vec![Value::Number(1)]);
        assert_eq!(env.lookup_var("x"), None);
    }
}
