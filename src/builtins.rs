//! Properties, methods and global functions available to every program.

use crate::error::Fault;
use crate::value::Value;
use log::debug;

/// What a method call produced. `mutated` holds the new receiver when the
/// method changed it; the evaluator writes it back to the receiver's place.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodResult {
    pub value: Value,
    pub mutated: Option<Value>,
}

impl MethodResult {
    fn value(value: Value) -> Self {
        Self {
            value,
            mutated: None,
        }
    }

    fn mutated(value: Value, receiver: Value) -> Self {
        Self {
            value,
            mutated: Some(receiver),
        }
    }
}

pub fn call_method(receiver: Value, method: &str, args: Vec<Value>) -> Result<MethodResult, Fault> {
    match receiver {
        Value::List(items) => list_method(items, method, args),
        Value::Str(s) => string_method(s, method, args),
        Value::Dict(entries) => dict_method(entries, method, args),
        Value::Range {
            lower,
            upper,
            closed,
        } => Ok(MethodResult::value(range_method(lower, upper, closed, method, args))),
        Value::Tuple(elements) => Ok(MethodResult::value(tuple_member(elements, method))),
        Value::Int(_) | Value::Double(_) | Value::Bool(_) if method == "description" => {
            Ok(MethodResult::value(Value::Str(receiver.to_string())))
        }
        // optional chaining: `a?.count` is `Optional(count)`, nil stays nil
        Value::Optional(Some(inner)) => {
            let result = call_method(*inner, method, args)?;
            Ok(MethodResult {
                value: if result.value.is_nil() {
                    Value::NIL
                } else {
                    Value::wrap_optional(result.value)
                },
                mutated: result.mutated.map(Value::some),
            })
        }
        Value::Optional(None) => Ok(MethodResult::value(Value::NIL)),
        other => Ok(MethodResult::value(unknown(&other, method))),
    }
}

fn unknown(receiver: &Value, method: &str) -> Value {
    debug!("{} has no member '{method}'", receiver.type_name());
    Value::NIL
}

fn arg(args: &[Value], position: usize) -> Value {
    args.get(position).cloned().unwrap_or(Value::NIL)
}

fn index_arg(args: &[Value], position: usize) -> Option<i64> {
    match args.get(position)? {
        Value::Int(i) => Some(*i),
        _ => None,
    }
}

fn count(n: usize) -> Value {
    Value::Int(n as i64)
}

fn list_method(mut items: Vec<Value>, method: &str, args: Vec<Value>) -> Result<MethodResult, Fault> {
    let value = match method {
        "count" => count(items.len()),
        "isEmpty" => Value::Bool(items.is_empty()),
        "first" => items.first().cloned().into(),
        "last" => items.last().cloned().into(),
        "contains" => {
            let wanted = arg(&args, 0).debug_text();
            Value::Bool(items.iter().any(|item| item.debug_text() == wanted))
        }
        "firstIndex" => {
            let wanted = arg(&args, 0).debug_text();
            items
                .iter()
                .position(|item| item.debug_text() == wanted)
                .map(count)
                .into()
        }
        "sorted" => {
            items.sort_by(|a, b| a.compare(b));
            Value::List(items)
        }
        "reversed" => {
            items.reverse();
            Value::List(items)
        }
        "min" => items.into_iter().min_by(|a, b| a.compare(b)).into(),
        "max" => items.into_iter().max_by(|a, b| a.compare(b)).into(),
        "joined" => {
            let separator = args.first().map(|s| s.to_string()).unwrap_or_default();
            let parts: Vec<String> = items.iter().map(|item| item.to_string()).collect();
            Value::Str(parts.join(&separator))
        }
        "indices" => Value::Range {
            lower: 0,
            upper: items.len() as i64,
            closed: false,
        },
        "append" => {
            items.push(arg(&args, 0));
            return Ok(MethodResult::mutated(Value::NIL, Value::List(items)));
        }
        "append(contentsOf:)" => {
            match arg(&args, 0).sequence() {
                Some(more) => items.extend(more),
                None => debug!("append(contentsOf:) needs a sequence"),
            }
            return Ok(MethodResult::mutated(Value::NIL, Value::List(items)));
        }
        "insert" => {
            let at = index_arg(&args, 1)
                .filter(|i| *i >= 0 && *i as u64 <= items.len() as u64)
                .ok_or(Fault::IndexOutOfRange)?;
            items.insert(at as usize, arg(&args, 0));
            return Ok(MethodResult::mutated(Value::NIL, Value::List(items)));
        }
        "remove" => {
            let at = index_arg(&args, 0)
                .filter(|i| *i >= 0 && (*i as u64) < items.len() as u64)
                .ok_or(Fault::IndexOutOfRange)?;
            let removed = items.remove(at as usize);
            return Ok(MethodResult::mutated(removed, Value::List(items)));
        }
        "removeFirst" => {
            if items.is_empty() {
                return Err(Fault::RemoveFromEmpty("first"));
            }
            let removed = items.remove(0);
            return Ok(MethodResult::mutated(removed, Value::List(items)));
        }
        "removeLast" => {
            let removed = items.pop().ok_or(Fault::RemoveFromEmpty("last"))?;
            return Ok(MethodResult::mutated(removed, Value::List(items)));
        }
        "removeAll" => return Ok(MethodResult::mutated(Value::NIL, Value::List(Vec::new()))),
        _ => unknown(&Value::List(items), method),
    };
    Ok(MethodResult::value(value))
}

fn string_method(mut s: String, method: &str, args: Vec<Value>) -> Result<MethodResult, Fault> {
    let text_arg = || arg(&args, 0).to_string();
    let value = match method {
        "count" => count(s.chars().count()),
        "isEmpty" => Value::Bool(s.is_empty()),
        "uppercased" => Value::Str(s.to_uppercase()),
        "lowercased" => Value::Str(s.to_lowercase()),
        "hasPrefix" => Value::Bool(s.starts_with(&text_arg())),
        "hasSuffix" => Value::Bool(s.ends_with(&text_arg())),
        "contains" => Value::Bool(s.contains(&text_arg())),
        "reversed" => Value::Str(s.chars().rev().collect()),
        "first" => s.chars().next().map(|c| Value::Str(c.to_string())).into(),
        "last" => s.chars().last().map(|c| Value::Str(c.to_string())).into(),
        "split" => {
            let separator = text_arg();
            let parts = if separator.is_empty() {
                s.chars().map(|c| Value::Str(c.to_string())).collect()
            } else {
                s.split(separator.as_str())
                    .filter(|part| !part.is_empty())
                    .map(|part| Value::Str(part.to_string()))
                    .collect()
            };
            Value::List(parts)
        }
        "append" => {
            s.push_str(&text_arg());
            return Ok(MethodResult::mutated(Value::NIL, Value::Str(s)));
        }
        _ => unknown(&Value::Str(s), method),
    };
    Ok(MethodResult::value(value))
}

fn dict_method(mut entries: Vec<(Value, Value)>, method: &str, args: Vec<Value>) -> Result<MethodResult, Fault> {
    let value = match method {
        "count" => count(entries.len()),
        "isEmpty" => Value::Bool(entries.is_empty()),
        "keys" => Value::List(entries.into_iter().map(|(k, _)| k).collect()),
        "values" => Value::List(entries.into_iter().map(|(_, v)| v).collect()),
        "removeValue" => {
            let removed = Value::dict_remove(&mut entries, &arg(&args, 0));
            return Ok(MethodResult::mutated(removed.into(), Value::Dict(entries)));
        }
        "updateValue" => {
            let previous = Value::dict_insert(&mut entries, arg(&args, 1), arg(&args, 0));
            return Ok(MethodResult::mutated(previous.into(), Value::Dict(entries)));
        }
        _ => unknown(&Value::Dict(entries), method),
    };
    Ok(MethodResult::value(value))
}

fn range_method(lower: i64, upper: i64, closed: bool, method: &str, args: Vec<Value>) -> Value {
    let len = Value::range_values(lower, upper, closed).count();
    match method {
        "count" => count(len),
        "isEmpty" => Value::Bool(len == 0),
        "lowerBound" => Value::Int(lower),
        "upperBound" => Value::Int(upper),
        "contains" => match arg(&args, 0) {
            Value::Int(n) => Value::Bool(n >= lower && (n < upper || (closed && n == upper))),
            _ => Value::Bool(false),
        },
        "reversed" => Value::List(
            Value::range_values(lower, upper, closed)
                .rev()
                .map(Value::Int)
                .collect(),
        ),
        _ => unknown(&Value::Range { lower, upper, closed }, method),
    }
}

/// `.0`, `.1` by position, or an element's label.
fn tuple_member(elements: Vec<(Option<String>, Value)>, member: &str) -> Value {
    let found = match member.parse::<usize>() {
        Ok(position) => elements.get(position).map(|(_, v)| v.clone()),
        Err(_) => elements
            .iter()
            .find(|(label, _)| label.as_deref() == Some(member))
            .map(|(_, v)| v.clone()),
    };
    found.unwrap_or_else(|| unknown(&Value::Tuple(elements), member))
}

/// Global functions. `None` when no built-in has that name.
pub fn call_global(name: &str, args: Vec<Value>) -> Result<Option<Value>, Fault> {
    let first = arg(&args, 0);
    let value = match name {
        "String" | "Character" => Value::Str(first.to_string()),
        "Int" => match first {
            Value::Int(n) => Value::Int(n),
            Value::Double(n) => Value::Int(n.trunc() as i64),
            Value::Str(s) => s.trim().parse::<i64>().ok().map(Value::Int).into(),
            _ => Value::NIL,
        },
        "Double" | "Float" => match first {
            Value::Int(n) => Value::Double(n as f64),
            Value::Double(n) => Value::Double(n),
            Value::Str(s) => s.trim().parse::<f64>().ok().map(Value::Double).into(),
            _ => Value::NIL,
        },
        "Bool" => match first {
            Value::Bool(b) => Value::Bool(b),
            Value::Str(s) => match s.as_str() {
                "true" => Value::some(Value::Bool(true)),
                "false" => Value::some(Value::Bool(false)),
                _ => Value::NIL,
            },
            _ => Value::NIL,
        },
        "Array" => match first {
            Value::Str(s) => Value::List(s.chars().map(|c| Value::Str(c.to_string())).collect()),
            other => Value::List(other.sequence().unwrap_or_default()),
        },
        "abs" => match first {
            Value::Int(n) => Value::Int(n.wrapping_abs()),
            Value::Double(n) => Value::Double(n.abs()),
            _ => Value::NIL,
        },
        "min" => args.into_iter().min_by(|a, b| a.compare(b)).unwrap_or(Value::NIL),
        "max" => args.into_iter().max_by(|a, b| a.compare(b)).unwrap_or(Value::NIL),
        "stride" => stride(&args, false),
        "stride(through:)" => stride(&args, true),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

/// `stride(from:to:by:)` and `stride(from:through:by:)`, materialized as a
/// list. A zero step yields nothing.
fn stride(args: &[Value], through: bool) -> Value {
    match (arg(args, 0), arg(args, 1), arg(args, 2)) {
        (Value::Int(from), Value::Int(to), Value::Int(by)) if by != 0 => {
            let mut items = Vec::new();
            let mut n = from;
            while (by > 0 && (n < to || (through && n == to))) || (by < 0 && (n > to || (through && n == to))) {
                items.push(Value::Int(n));
                match n.checked_add(by) {
                    Some(next) => n = next,
                    None => break,
                }
            }
            Value::List(items)
        }
        (from, to, by) => match (from.as_f64(), to.as_f64(), by.as_f64()) {
            (Some(from), Some(to), Some(by)) if by != 0.0 => {
                let mut items = Vec::new();
                let mut i = 0.0;
                loop {
                    let n = from + i * by;
                    let inside = if by > 0.0 { n < to || (through && n == to) } else { n > to || (through && n == to) };
                    if !inside {
                        break;
                    }
                    items.push(Value::Double(n));
                    i += 1.0;
                }
                Value::List(items)
            }
            _ => Value::List(Vec::new()),
        },
    }
}
