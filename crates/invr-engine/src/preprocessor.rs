//! Expression preprocessing
//!
//! Before evaluation, rule text is rewritten so that it only contains what the
//! evaluator understands:
//!
//! 1. every smart query is resolved and replaced by a literal of its result;
//! 2. every call to an auxiliary host function is executed and replaced by a
//!    literal of its return value, innermost call first.
//!
//! Lookups and calls that fail or time out are replaced by their declared
//! default and reported as [`FallbackNote`]s; they never fail the rule.

use crate::constants::{BUILTIN_FUNCTIONS, DEFAULT_CALL_TIMEOUT};
use crate::expression::{EvalResult, Evaluator, Scope};
use crate::scan::{at_word_boundary, find_closing, ident_at, skip_string, split_top_level};
use crate::smart_query::{Located, Resolution, SmartQueryEngine, find_queries, millis};
use invr_domain::error::Error;
use invr_domain::ports::FunctionHost;
use invr_domain::value::Value;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A lookup or call that was replaced by its default
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackNote {
    /// Source text of the smart query or call
    pub source: String,
    /// Value substituted in its place
    pub value: Value,
    pub reason: String,
}

/// Rewritten expression plus the fallbacks taken while producing it
#[derive(Debug, Clone, PartialEq)]
pub struct Rewritten {
    pub expression: String,
    pub fallbacks: Vec<FallbackNote>,
}

impl Rewritten {
    fn unchanged(expression: &str) -> Self {
        Self {
            expression: expression.to_string(),
            fallbacks: Vec::new(),
        }
    }
}

/// Host function call found in expression text
#[derive(Debug, Clone, Copy)]
struct CallSpan {
    start: usize,
    open: usize,
    close: usize,
}

/// Resolves smart queries and auxiliary calls into literals
pub struct Preprocessor {
    evaluator: Arc<Evaluator>,
    queries: SmartQueryEngine,
    functions: Arc<dyn FunctionHost>,
    call_timeout: Duration,
}

impl Preprocessor {
    pub fn new(
        evaluator: Arc<Evaluator>,
        queries: SmartQueryEngine,
        functions: Arc<dyn FunctionHost>,
    ) -> Self {
        Self {
            evaluator,
            queries,
            functions,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn queries(&self) -> &SmartQueryEngine {
        &self.queries
    }

    /// Whether `name` is served by the auxiliary host rather than the evaluator
    pub fn is_host_function(&self, name: &str) -> bool {
        !BUILTIN_FUNCTIONS.contains(&name) && self.functions.has_function(name)
    }

    /// Rewrite `expression` for evaluation in `scope`
    ///
    /// Only malformed text (an unterminated string, bracket or smart query)
    /// is an error.
    pub async fn rewrite(&self, expression: &str, scope: &Scope) -> EvalResult<Rewritten> {
        if !expression.contains("db.") && !expression.contains('(') {
            return Ok(Rewritten::unchanged(expression));
        }
        let mut fallbacks = Vec::new();
        let text = self
            .substitute_queries(expression, scope, &mut fallbacks)
            .await?;
        let text = self.substitute_calls(text, scope, &mut fallbacks).await?;
        Ok(Rewritten {
            expression: text,
            fallbacks,
        })
    }

    async fn substitute_queries(
        &self,
        expression: &str,
        scope: &Scope,
        fallbacks: &mut Vec<FallbackNote>,
    ) -> EvalResult<String> {
        let located = find_queries(expression)?;
        if located.is_empty() {
            return Ok(expression.to_string());
        }
        let mut out = String::with_capacity(expression.len());
        let mut last = 0;
        for Located {
            span,
            source,
            table,
            field,
            query,
        } in located
        {
            out.push_str(&expression[last..span.start]);
            last = span.end;
            let resolution = match query {
                Ok(query) => self.queries.execute(&query, scope).await,
                Err(e) => Resolution::Fallback {
                    value: self.queries.default_for(&table, field.as_deref()),
                    reason: e.to_string(),
                },
            };
            if let Resolution::Fallback { value, reason } = &resolution {
                fallbacks.push(FallbackNote {
                    source,
                    value: value.clone(),
                    reason: reason.clone(),
                });
            }
            out.push_str(&to_literal(resolution.value()));
        }
        out.push_str(&expression[last..]);
        Ok(out)
    }

    async fn substitute_calls(
        &self,
        mut text: String,
        scope: &Scope,
        fallbacks: &mut Vec<FallbackNote>,
    ) -> EvalResult<String> {
        loop {
            let spans = self.find_calls(&text)?;
            // innermost: no other call starts inside it
            let Some(call) = spans
                .iter()
                .find(|s| !spans.iter().any(|t| t.start > s.start && t.close < s.close))
                .copied()
            else {
                return Ok(text);
            };
            let value = self.run_call(&text, call, scope, fallbacks).await?;
            text.replace_range(call.start..=call.close, &to_literal(&value));
        }
    }

    async fn run_call(
        &self,
        text: &str,
        call: CallSpan,
        scope: &Scope,
        fallbacks: &mut Vec<FallbackNote>,
    ) -> EvalResult<Value> {
        let name = text[call.start..call.open].trim_end();
        let source = text[call.start..=call.close].to_string();
        let mut args = Vec::new();
        for arg in split_top_level(&text[call.open + 1..call.close], b',')? {
            let arg = arg.trim();
            if arg.is_empty() {
                continue;
            }
            match self.evaluator.evaluate(arg, scope) {
                Ok(value) => args.push(value),
                Err(e) => {
                    let value = self.functions.default_value(name);
                    debug!(call = %source, error = %e, "Auxiliary call argument failed");
                    fallbacks.push(FallbackNote {
                        source,
                        value: value.clone(),
                        reason: format!("argument error: {e}"),
                    });
                    return Ok(value);
                }
            }
        }

        let context = scope.context_value();
        let reason = match tokio::time::timeout(
            self.call_timeout,
            self.functions.call(name, &args, &context),
        )
        .await
        {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => e.to_string(),
            Err(_) => {
                Error::timeout(format!("call to {name}"), millis(self.call_timeout)).to_string()
            }
        };
        let value = self.functions.default_value(name);
        warn!(call = %source, reason = %reason, "Auxiliary call fell back to default");
        fallbacks.push(FallbackNote {
            source,
            value: value.clone(),
            reason,
        });
        Ok(value)
    }

    fn find_calls(&self, text: &str) -> EvalResult<Vec<CallSpan>> {
        let bytes = text.as_bytes();
        let mut spans = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'\'' || bytes[i] == b'"' {
                i = skip_string(text, i)?;
                continue;
            }
            let Some((name, end)) = ident_at(text, i).filter(|_| at_word_boundary(text, i)) else {
                i += 1;
                continue;
            };
            let open = end + (text[end..].len() - text[end..].trim_start().len());
            if bytes.get(open) == Some(&b'(')
                && !preceded_by_dot(text, i)
                && self.is_host_function(name)
            {
                spans.push(CallSpan {
                    start: i,
                    open,
                    close: find_closing(text, open)?,
                });
            }
            i = end;
        }
        Ok(spans)
    }
}

impl std::fmt::Debug for Preprocessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preprocessor")
            .field("queries", &self.queries)
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

fn preceded_by_dot(text: &str, start: usize) -> bool {
    text[..start].trim_end().ends_with('.')
}

/// Render a value as expression source text
pub fn to_literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_literal(*n),
        Value::String(s) => string_literal(s),
        Value::List(items) => {
            let items: Vec<String> = items.iter().map(to_literal).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Map(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", string_literal(k), to_literal(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

fn number_literal(n: Decimal) -> String {
    let n = n.normalize();
    if n.is_sign_negative() && !n.is_zero() {
        format!("({n})")
    } else {
        n.abs().to_string()
    }
}

fn string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
