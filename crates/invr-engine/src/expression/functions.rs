//! Builtin functions
//!
//! Every builtin can be called in function form (`size(items)`) or method
//! form (`items.size()`); method calls pass the receiver as the first argument.

use super::error::{EvalError, EvalResult};
use invr_domain::value::{Value, parse_decimal};
use moka::sync::Cache;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Dispatch a builtin call on already-evaluated arguments
pub(crate) fn call(
    name: &str,
    args: &[Value],
    regexes: &Cache<String, Regex>,
) -> EvalResult<Value> {
    match name {
        "size" => {
            let [value] = exact::<1>(name, args)?;
            let len = match value {
                Value::String(s) => s.chars().count(),
                Value::List(items) => items.len(),
                Value::Map(map) => map.len(),
                other => return Err(mismatch(name, "string, list or map", other)),
            };
            Ok(Value::from(len))
        }
        "contains" => {
            let [haystack, needle] = exact::<2>(name, args)?;
            let found = match (haystack, needle) {
                (Value::String(s), Value::String(sub)) => s.contains(sub.as_str()),
                (Value::List(items), v) => items.contains(v),
                (Value::Map(map), Value::String(key)) => map.contains_key(key),
                (other, _) => return Err(mismatch(name, "string, list or map", other)),
            };
            Ok(Value::Bool(found))
        }
        "startsWith" | "endsWith" => {
            let [text, affix] = exact::<2>(name, args)?;
            let (text, affix) = (string_arg(name, text)?, string_arg(name, affix)?);
            Ok(Value::Bool(if name == "startsWith" {
                text.starts_with(affix)
            } else {
                text.ends_with(affix)
            }))
        }
        "matches" => {
            let [text, pattern] = exact::<2>(name, args)?;
            let (text, pattern) = (string_arg(name, text)?, string_arg(name, pattern)?);
            Ok(Value::Bool(regex_for(regexes, pattern)?.is_match(text)))
        }
        "lowerAscii" | "upperAscii" | "trim" => {
            let [text] = exact::<1>(name, args)?;
            let text = string_arg(name, text)?;
            Ok(Value::String(match name {
                "lowerAscii" => text.to_ascii_lowercase(),
                "upperAscii" => text.to_ascii_uppercase(),
                _ => text.trim().to_string(),
            }))
        }
        "string" => {
            let [value] = exact::<1>(name, args)?;
            Ok(Value::String(value.to_string()))
        }
        "int" => {
            let [value] = exact::<1>(name, args)?;
            Ok(Value::from(number_arg(name, value)?.trunc()))
        }
        "double" | "decimal" => {
            let [value] = exact::<1>(name, args)?;
            Ok(Value::from(number_arg(name, value)?))
        }
        "round" => round(args),
        "abs" => {
            let [value] = exact::<1>(name, args)?;
            Ok(Value::from(number_arg(name, value)?.abs()))
        }
        "min" | "max" => extreme(name, args),
        "sum" => {
            let [list] = exact::<1>(name, args)?;
            let Value::List(items) = list else {
                return Err(mismatch(name, "list", list));
            };
            let mut total = Decimal::ZERO;
            for item in items {
                let Value::Number(n) = item else {
                    return Err(mismatch(name, "list of numbers", item));
                };
                total = total
                    .checked_add(*n)
                    .ok_or_else(|| EvalError::eval("numeric overflow in sum"))?;
            }
            Ok(Value::from(total))
        }
        _ => Err(EvalError::UnknownFunction {
            name: name.to_string(),
        }),
    }
}

fn exact<'a, const N: usize>(name: &str, args: &'a [Value]) -> EvalResult<&'a [Value; N]> {
    <&[Value; N]>::try_from(args).map_err(|_| {
        EvalError::eval(format!(
            "{name}() takes {N} argument(s), got {}",
            args.len()
        ))
    })
}

fn string_arg<'a>(name: &str, value: &'a Value) -> EvalResult<&'a str> {
    value.as_str().ok_or_else(|| mismatch(name, "string", value))
}

/// Numbers pass through; numeric strings are converted
fn number_arg(name: &str, value: &Value) -> EvalResult<Decimal> {
    match value {
        Value::Number(n) => Ok(*n),
        Value::String(s) => parse_decimal(s.trim())
            .ok_or_else(|| EvalError::eval(format!("{name}(): '{s}' is not a number"))),
        other => Err(mismatch(name, "number", other)),
    }
}

fn round(args: &[Value]) -> EvalResult<Value> {
    let (value, places) = match args {
        [value] => (value, 0),
        [value, places] => {
            let places = number_arg("round", places)?
                .to_u32()
                .filter(|p| *p <= 28)
                .ok_or_else(|| EvalError::eval("round(): places must be between 0 and 28"))?;
            (value, places)
        }
        _ => {
            return Err(EvalError::eval(format!(
                "round() takes 1 or 2 arguments, got {}",
                args.len()
            )));
        }
    };
    let n = number_arg("round", value)?;
    Ok(Value::from(
        n.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero),
    ))
}

fn extreme(name: &str, args: &[Value]) -> EvalResult<Value> {
    let values = match args {
        [Value::List(items)] => items.as_slice(),
        _ => args,
    };
    let mut best: Option<Decimal> = None;
    for value in values {
        let n = number_arg(name, value)?;
        best = Some(match best {
            Some(b) if name == "min" => b.min(n),
            Some(b) => b.max(n),
            None => n,
        });
    }
    best.map(Value::from)
        .ok_or_else(|| EvalError::eval(format!("{name}() of an empty list")))
}

fn regex_for(cache: &Cache<String, Regex>, pattern: &str) -> EvalResult<Regex> {
    if let Some(re) = cache.get(pattern) {
        return Ok(re);
    }
    let re = Regex::new(pattern)
        .map_err(|e| EvalError::eval(format!("invalid regex '{pattern}': {e}")))?;
    cache.insert(pattern.to_string(), re.clone());
    Ok(re)
}

fn mismatch(name: &str, expected: &str, found: &Value) -> EvalError {
    EvalError::type_mismatch(format!(
        "{name}() expects {expected}, found {}",
        found.type_name()
    ))
}
