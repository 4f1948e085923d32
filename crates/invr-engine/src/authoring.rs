//! Static checks for rule authors
//!
//! Catches rules that would fail on every record: malformed expressions or
//! smart queries, unknown functions and `item` used outside a collection rule.
//!
//! Smart queries and auxiliary calls are resolved to literals before the
//! expression runs, so inside `all`/`exists`/`filter`/`map` they cannot see
//! the comprehension variable. Such arguments are reported as warnings: the
//! lookup or call always falls back to its default.

use crate::constants::{BUILTIN_FUNCTIONS, COMPREHENSIONS};
use crate::expression::{Expr, parse};
use crate::smart_query::{Operand, SmartQuery, ValueRef, find_queries};
use invr_domain::constants::ITEM_BINDING;
use invr_domain::entities::Rule;
use invr_domain::ports::FunctionHost;
use serde::Serialize;
use std::fmt;

/// How serious a finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticLevel {
    /// The rule cannot succeed as written
    Error,
    /// The rule runs but probably not as intended
    Warning,
}

/// One finding about one rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleDiagnostic {
    pub rule_id: String,
    /// Rule attribute the finding is about
    pub field: &'static str,
    pub level: DiagnosticLevel,
    pub message: String,
}

impl fmt::Display for RuleDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagnosticLevel::Error => "error",
            DiagnosticLevel::Warning => "warning",
        };
        write!(f, "{level}: [{}] {}: {}", self.rule_id, self.field, self.message)
    }
}

/// Check every rule, in order
pub fn check_rules<'a, I>(rules: I, functions: &dyn FunctionHost) -> Vec<RuleDiagnostic>
where
    I: IntoIterator<Item = &'a Rule>,
{
    rules
        .into_iter()
        .flat_map(|rule| check_rule(rule, functions))
        .collect()
}

/// Check one rule
pub fn check_rule(rule: &Rule, functions: &dyn FunctionHost) -> Vec<RuleDiagnostic> {
    let mut found = Vec::new();
    let mut report = |field: &'static str, level: DiagnosticLevel, message: String| {
        found.push(RuleDiagnostic {
            rule_id: rule.id.clone(),
            field,
            level,
            message,
        });
    };

    if let Err(e) = rule.validate() {
        report("rule", DiagnosticLevel::Error, e.to_string());
    }
    let collection = rule.target_path().is_ok_and(|p| p.is_collection());

    let mut sources = vec![("rule_expression", rule.rule_expression.as_str())];
    if let Some(gate) = rule.gate() {
        sources.push(("apply_to", gate));
    }
    for (field, source) in sources {
        let (expr, queries) = match strip_queries(source) {
            Ok(stripped) => {
                for message in &stripped.errors {
                    report(field, DiagnosticLevel::Error, message.clone());
                }
                (parse(&stripped.text), stripped.queries)
            }
            Err(e) => (Err(e), Vec::new()),
        };
        let expr = match expr {
            Ok(expr) => expr,
            Err(e) => {
                report(field, DiagnosticLevel::Error, e.to_string());
                continue;
            }
        };
        for message in unbound_arguments(&expr, &queries) {
            report(field, DiagnosticLevel::Warning, message);
        }
        expr.walk(&mut |node| match node {
            Expr::Call { function, .. }
                if !BUILTIN_FUNCTIONS.contains(&function.as_str())
                    && !functions.has_function(function) =>
            {
                report(
                    field,
                    DiagnosticLevel::Error,
                    format!("unknown function '{function}'"),
                );
            }
            Expr::Ident(name) if name == ITEM_BINDING && !collection => {
                report(
                    field,
                    DiagnosticLevel::Warning,
                    format!("'{ITEM_BINDING}' is only bound for collection paths"),
                );
            }
            _ => {}
        });
    }
    found
}

const QUERY_PLACEHOLDER: &str = "__smart_query_";

/// Expression text with its smart queries cut out
struct Stripped {
    /// Each query replaced by `__smart_query_<n>`
    text: String,
    /// Query text and the scope names its conditions read, by placeholder number
    queries: Vec<(String, Vec<String>)>,
    errors: Vec<String>,
}

/// Replace smart queries by placeholder identifiers so the rest can be parsed
fn strip_queries(source: &str) -> crate::expression::EvalResult<Stripped> {
    let located = find_queries(source)?;
    let mut stripped = Stripped {
        text: String::with_capacity(source.len()),
        queries: Vec::with_capacity(located.len()),
        errors: Vec::new(),
    };
    let mut last = 0;
    for (n, query) in located.into_iter().enumerate() {
        stripped.text.push_str(&source[last..query.span.start]);
        stripped.text.push_str(&format!("{QUERY_PLACEHOLDER}{n}"));
        last = query.span.end;
        let roots = match &query.query {
            Ok(parsed) => condition_roots(parsed),
            Err(e) => {
                stripped
                    .errors
                    .push(format!("smart query '{}': {e}", query.source));
                Vec::new()
            }
        };
        stripped.queries.push((query.source, roots));
    }
    stripped.text.push_str(&source[last..]);
    Ok(stripped)
}

/// First segment of every scope path a query condition reads
fn condition_roots(query: &SmartQuery) -> Vec<String> {
    let root = |value: &ValueRef| match value {
        ValueRef::Path(segments) => segments.first().cloned(),
        ValueRef::Word(word) => Some(word.clone()),
        ValueRef::Literal(_) | ValueRef::Variable(_) => None,
    };
    query
        .conditions
        .iter()
        .flat_map(|condition| match &condition.operand {
            Operand::Single(value) => vec![value],
            Operand::List(values) => values.iter().collect(),
            Operand::Range(low, high) => vec![low, high],
        })
        .filter_map(root)
        .collect()
}

/// Auxiliary calls and smart queries inside a comprehension that read its variable
fn unbound_arguments(expr: &Expr, queries: &[(String, Vec<String>)]) -> Vec<String> {
    let mut messages = Vec::new();
    expr.walk(&mut |node| {
        let Expr::Call {
            target: Some(_),
            function,
            args,
        } = node
        else {
            return;
        };
        if !COMPREHENSIONS.contains(&function.as_str()) {
            return;
        }
        let [Expr::Ident(var), body @ ..] = args.as_slice() else {
            return;
        };
        for part in body {
            part.walk(&mut |inner| match inner {
                Expr::Call {
                    target,
                    function,
                    args,
                } if !BUILTIN_FUNCTIONS.contains(&function.as_str())
                    && (target.as_deref().is_some_and(|t| mentions(t, var))
                        || args.iter().any(|arg| mentions(arg, var))) =>
                {
                    messages.push(format!(
                        "'{function}' runs before '{var}' is bound and returns its default"
                    ));
                }
                Expr::Ident(name) => {
                    let query = name
                        .strip_prefix(QUERY_PLACEHOLDER)
                        .and_then(|n| n.parse::<usize>().ok())
                        .and_then(|n| queries.get(n));
                    if let Some((source, roots)) = query
                        && roots.iter().any(|root| root == var)
                    {
                        messages.push(format!(
                            "smart query '{source}' runs before '{var}' is bound"
                        ));
                    }
                }
                _ => {}
            });
        }
    });
    messages
}

fn mentions(expr: &Expr, var: &str) -> bool {
    let mut found = false;
    expr.walk(&mut |node| {
        if matches!(node, Expr::Ident(name) if name == var) {
            found = true;
        }
    });
    found
}
