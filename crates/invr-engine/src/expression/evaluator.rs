//! Tree-walking evaluator
//!
//! Semantics worth knowing when writing rules:
//! - comparing values of different types yields `false` (`!=` yields `true`);
//! - arithmetic on incompatible types raises [`EvalError::TypeMismatch`];
//! - reading a missing field raises [`EvalError::PathNotFound`], while
//!   `has(path)` answers `false` for missing or null values and never raises;
//! - `&&` and `||` short-circuit.

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::error::{EvalError, EvalResult};
use super::functions;
use super::parser;
use super::scope::Scope;
use crate::constants::{PARSE_CACHE_CAPACITY, REGEX_CACHE_CAPACITY};
use dashmap::DashMap;
use invr_domain::value::Value;
use moka::sync::Cache;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Expression evaluator with a shared parse cache
///
/// Safe to share between tasks; parsed trees are cached by source text and
/// compiled `matches()` patterns by pattern text.
#[derive(Debug)]
pub struct Evaluator {
    parsed: DashMap<String, Arc<Expr>>,
    regexes: Cache<String, Regex>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::with_regex_capacity(REGEX_CACHE_CAPACITY)
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `capacity` compiled patterns; patterns built from record
    /// data are evicted instead of accumulating
    pub fn with_regex_capacity(capacity: u64) -> Self {
        Self {
            parsed: DashMap::new(),
            regexes: Cache::new(capacity),
        }
    }

    /// Compiled patterns currently cached
    pub fn cached_regex_count(&self) -> u64 {
        self.regexes.run_pending_tasks();
        self.regexes.entry_count()
    }

    /// Parse (or fetch from cache) an expression
    pub fn parse(&self, source: &str) -> EvalResult<Arc<Expr>> {
        if let Some(expr) = self.parsed.get(source) {
            return Ok(Arc::clone(expr.value()));
        }
        let expr = Arc::new(parser::parse(source)?);
        if self.parsed.len() >= PARSE_CACHE_CAPACITY {
            self.parsed.clear();
        }
        self.parsed.insert(source.to_string(), Arc::clone(&expr));
        Ok(expr)
    }

    /// Evaluate expression text against a scope
    pub fn evaluate(&self, source: &str, scope: &Scope) -> EvalResult<Value> {
        let expr = self.parse(source)?;
        self.eval(&expr, scope)
    }

    /// Evaluate expression text that must produce a boolean
    pub fn evaluate_bool(&self, source: &str, scope: &Scope) -> EvalResult<bool> {
        match self.evaluate(source, scope)? {
            Value::Bool(b) => Ok(b),
            other => Err(EvalError::type_mismatch(format!(
                "expected a boolean result, found {}",
                other.type_name()
            ))),
        }
    }

    /// Evaluate a parsed tree
    pub fn eval(&self, expr: &Expr, scope: &Scope) -> EvalResult<Value> {
        self.eval_in(expr, &Env::new(scope))
    }

    fn eval_in(&self, expr: &Expr, env: &Env<'_>) -> EvalResult<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Ident(name) => env
                .lookup(name)
                .cloned()
                .ok_or_else(|| EvalError::path_not_found(name)),
            Expr::Select { operand, field } => {
                let selected = match self.eval_in(operand, env)? {
                    Value::Map(mut map) => map.remove(field),
                    _ => None,
                };
                selected.ok_or_else(|| {
                    EvalError::path_not_found(expr.path_text().unwrap_or_else(|| field.clone()))
                })
            }
            Expr::Index { operand, index } => {
                let base = self.eval_in(operand, env)?;
                let index = self.eval_in(index, env)?;
                index_value(base, &index)
            }
            Expr::Call {
                target,
                function,
                args,
            } => self.call(target.as_deref(), function, args, env),
            Expr::Unary { op, operand } => {
                let value = self.eval_in(operand, env)?;
                match (op, value) {
                    (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                    (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(-n)),
                    (UnaryOp::Not, other) => Err(EvalError::type_mismatch(format!(
                        "'!' expects a bool, found {}",
                        other.type_name()
                    ))),
                    (UnaryOp::Neg, other) => Err(EvalError::type_mismatch(format!(
                        "unary '-' expects a number, found {}",
                        other.type_name()
                    ))),
                }
            }
            Expr::Binary {
                op: BinaryOp::And,
                left,
                right,
            } => {
                if !self.eval_bool(left, env, "&&")? {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.eval_bool(right, env, "&&")?))
            }
            Expr::Binary {
                op: BinaryOp::Or,
                left,
                right,
            } => {
                if self.eval_bool(left, env, "||")? {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.eval_bool(right, env, "||")?))
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval_in(left, env)?;
                let right = self.eval_in(right, env)?;
                apply_binary(*op, &left, &right)
            }
            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval_bool(condition, env, "?:")? {
                    self.eval_in(then_branch, env)
                } else {
                    self.eval_in(else_branch, env)
                }
            }
            Expr::List(items) => items
                .iter()
                .map(|item| self.eval_in(item, env))
                .collect::<EvalResult<Vec<_>>>()
                .map(Value::List),
            Expr::Map(entries) => {
                let mut map = BTreeMap::new();
                for (key, value) in entries {
                    let key = match self.eval_in(key, env)? {
                        Value::String(s) => s,
                        other => {
                            return Err(EvalError::type_mismatch(format!(
                                "map keys must be strings, found {}",
                                other.type_name()
                            )));
                        }
                    };
                    map.insert(key, self.eval_in(value, env)?);
                }
                Ok(Value::Map(map))
            }
        }
    }

    fn eval_bool(&self, expr: &Expr, env: &Env<'_>, context: &str) -> EvalResult<bool> {
        match self.eval_in(expr, env)? {
            Value::Bool(b) => Ok(b),
            other => Err(EvalError::type_mismatch(format!(
                "{context} expects a bool, found {}",
                other.type_name()
            ))),
        }
    }

    fn call(
        &self,
        target: Option<&Expr>,
        function: &str,
        args: &[Expr],
        env: &Env<'_>,
    ) -> EvalResult<Value> {
        match (target, function) {
            (None, "has") => self.has(args, env),
            (Some(range), "all" | "exists" | "exists_one" | "filter" | "map") => {
                self.comprehension(range, function, args, env)
            }
            _ => {
                let mut values = Vec::with_capacity(args.len() + 1);
                if let Some(target) = target {
                    values.push(self.eval_in(target, env)?);
                }
                for arg in args {
                    values.push(self.eval_in(arg, env)?);
                }
                functions::call(function, &values, &self.regexes)
            }
        }
    }

    fn has(&self, args: &[Expr], env: &Env<'_>) -> EvalResult<Value> {
        let [path] = args else {
            return Err(EvalError::eval(format!(
                "has() takes 1 argument, got {}",
                args.len()
            )));
        };
        match self.eval_in(path, env) {
            Ok(value) => Ok(Value::Bool(!value.is_null())),
            Err(EvalError::PathNotFound { .. }) => Ok(Value::Bool(false)),
            Err(e) => Err(e),
        }
    }

    /// `range.all(x, p)`, `exists`, `exists_one`, `filter`, `map(x, [p,] f)`
    fn comprehension(
        &self,
        range: &Expr,
        function: &str,
        args: &[Expr],
        env: &Env<'_>,
    ) -> EvalResult<Value> {
        let (var, body) = match args {
            [Expr::Ident(var), body @ ..] if !body.is_empty() => (var.as_str(), body),
            _ => {
                return Err(EvalError::eval(format!(
                    "{function}() expects a variable name followed by an expression"
                )));
            }
        };
        let elements = match self.eval_in(range, env)? {
            Value::List(items) => items,
            Value::Map(map) => map.into_keys().map(Value::String).collect(),
            other => {
                return Err(EvalError::type_mismatch(format!(
                    "{function}() expects a list or map, found {}",
                    other.type_name()
                )));
            }
        };

        match (function, body) {
            ("all", [predicate]) => {
                for element in elements {
                    if !self.eval_bool(predicate, &env.bind(var, element), function)? {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            ("exists", [predicate]) => {
                for element in elements {
                    if self.eval_bool(predicate, &env.bind(var, element), function)? {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            ("exists_one", [predicate]) => {
                let mut hits = 0usize;
                for element in elements {
                    if self.eval_bool(predicate, &env.bind(var, element), function)? {
                        hits += 1;
                    }
                }
                Ok(Value::Bool(hits == 1))
            }
            ("filter", [predicate]) => {
                let mut kept = Vec::new();
                for element in elements {
                    if self.eval_bool(predicate, &env.bind(var, element.clone()), function)? {
                        kept.push(element);
                    }
                }
                Ok(Value::List(kept))
            }
            ("map", [transform]) => elements
                .into_iter()
                .map(|element| self.eval_in(transform, &env.bind(var, element)))
                .collect::<EvalResult<Vec<_>>>()
                .map(Value::List),
            ("map", [predicate, transform]) => {
                let mut mapped = Vec::new();
                for element in elements {
                    let scoped = env.bind(var, element);
                    if self.eval_bool(predicate, &scoped, function)? {
                        mapped.push(self.eval_in(transform, &scoped)?);
                    }
                }
                Ok(Value::List(mapped))
            }
            _ => Err(EvalError::eval(format!(
                "{function}() got {} expression argument(s)",
                body.len()
            ))),
        }
    }
}

/// Scope plus variables bound by comprehension macros
struct Env<'a> {
    scope: &'a Scope,
    bindings: Vec<(String, Value)>,
}

impl<'a> Env<'a> {
    fn new(scope: &'a Scope) -> Self {
        Self {
            scope,
            bindings: Vec::new(),
        }
    }

    fn lookup(&self, name: &str) -> Option<&Value> {
        self.bindings
            .iter()
            .rev()
            .find(|(bound, _)| bound == name)
            .map(|(_, value)| value)
            .or_else(|| self.scope.lookup(name))
    }

    fn bind(&self, name: &str, value: Value) -> Env<'a> {
        let mut bindings = self.bindings.clone();
        bindings.push((name.to_string(), value));
        Env {
            scope: self.scope,
            bindings,
        }
    }
}

fn index_value(base: Value, index: &Value) -> EvalResult<Value> {
    match (base, index) {
        (Value::List(mut items), Value::Number(n)) => {
            let position = if n.fract().is_zero() { n.to_usize() } else { None };
            match position {
                Some(i) if i < items.len() => Ok(items.swap_remove(i)),
                _ => Err(EvalError::path_not_found(format!("[{n}]"))),
            }
        }
        (Value::Map(mut map), Value::String(key)) => map
            .remove(key)
            .ok_or_else(|| EvalError::path_not_found(format!("[\"{key}\"]"))),
        (base, index) => Err(EvalError::type_mismatch(format!(
            "cannot index {} with {}",
            base.type_name(),
            index.type_name()
        ))),
    }
}

/// Ordering for same-typed comparable values; `None` across types
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> EvalResult<Value> {
    let result = match op {
        BinaryOp::Eq => Value::Bool(left == right),
        BinaryOp::Ne => Value::Bool(left != right),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            Value::Bool(compare(left, right).is_some_and(|ordering| match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        BinaryOp::In => Value::Bool(match right {
            Value::List(items) => items.contains(left),
            Value::Map(map) => left.as_str().is_some_and(|key| map.contains_key(key)),
            _ => false,
        }),
        BinaryOp::Add => match (left, right) {
            (Value::String(a), Value::String(b)) => Value::String(format!("{a}{b}")),
            (Value::List(a), Value::List(b)) => Value::List(a.iter().chain(b).cloned().collect()),
            _ => arithmetic(op, left, right, Decimal::checked_add)?,
        },
        BinaryOp::Sub => arithmetic(op, left, right, Decimal::checked_sub)?,
        BinaryOp::Mul => arithmetic(op, left, right, Decimal::checked_mul)?,
        BinaryOp::Div | BinaryOp::Rem => {
            if matches!(right, Value::Number(n) if n.is_zero()) {
                return Err(EvalError::DivisionByZero);
            }
            let apply: fn(Decimal, Decimal) -> Option<Decimal> = if op == BinaryOp::Div {
                Decimal::checked_div
            } else {
                Decimal::checked_rem
            };
            arithmetic(op, left, right, apply)?
        }
        BinaryOp::And | BinaryOp::Or => {
            return Err(EvalError::eval(format!(
                "'{}' must be evaluated lazily",
                op.symbol()
            )));
        }
    };
    Ok(result)
}

fn arithmetic(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    apply: fn(Decimal, Decimal) -> Option<Decimal>,
) -> EvalResult<Value> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => apply(*a, *b)
            .map(|n| Value::Number(n.normalize()))
            .ok_or_else(|| EvalError::eval(format!("numeric overflow in '{}'", op.symbol()))),
        _ => Err(EvalError::type_mismatch(format!(
            "cannot apply '{}' to {} and {}",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ))),
    }
}
