use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Double(f64),
    Str(String),
    Bool(bool),
    List(Vec<Value>),
    /// Entries in insertion order. Keys are identified by their rendering, so
    /// `1` and `"1"` are distinct but two equal strings are the same key.
    Dict(Vec<(Value, Value)>),
    Range {
        lower: i64,
        upper: i64,
        closed: bool,
    },
    /// Elements with their optional labels, as in `(x: 1, y: 2)`.
    Tuple(Vec<(Option<String>, Value)>),
    Optional(Option<Box<Value>>),
}

impl Value {
    pub const NIL: Value = Value::Optional(None);

    pub fn some(value: Value) -> Value {
        Value::Optional(Some(Box::new(value)))
    }

    /// Wrap in an optional unless `value` already is one.
    pub fn wrap_optional(value: Value) -> Value {
        match value {
            Value::Optional(_) => value,
            other => Value::some(other),
        }
    }

    /// `nil`, or an optional wrapping `nil` at any depth.
    pub fn is_nil(&self) -> bool {
        match self {
            Value::Optional(None) => true,
            Value::Optional(Some(inner)) => inner.is_nil(),
            _ => false,
        }
    }

    /// Only `false` and `nil` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            other => !other.is_nil(),
        }
    }

    /// Strip one layer of optional wrapping, if any.
    pub fn unwrapped(self) -> Value {
        match self {
            Value::Optional(Some(inner)) => *inner,
            other => other,
        }
    }

    /// The type name used in cast failure messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "Int",
            Value::Double(_) => "Double",
            Value::Str(_) => "String",
            Value::Bool(_) => "Bool",
            Value::List(_) => "Array",
            Value::Dict(_) => "Dictionary",
            Value::Range { closed: true, .. } => "ClosedRange<Int>",
            Value::Range { closed: false, .. } => "Range<Int>",
            Value::Tuple(_) => "Tuple",
            Value::Optional(_) => "Optional",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Double(n) => Some(*n),
            _ => None,
        }
    }

    /// Elements of a range in iteration order. Empty when the bounds are
    /// reversed.
    pub fn range_values(lower: i64, upper: i64, closed: bool) -> std::ops::Range<i64> {
        let end = if closed { upper.checked_add(1) } else { Some(upper) };
        lower..end.unwrap_or(i64::MAX)
    }

    /// The elements a `for-in` loop or `Array(...)` would produce, or `None`
    /// for values that are not sequences.
    pub fn sequence(&self) -> Option<Vec<Value>> {
        match self {
            Value::List(items) => Some(items.clone()),
            Value::Range {
                lower,
                upper,
                closed,
            } => Some(
                Value::range_values(*lower, *upper, *closed)
                    .map(Value::Int)
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Rendering used inside collections: strings are quoted there.
    pub fn debug_text(&self) -> String {
        match self {
            Value::Str(s) => format!("{s:?}"),
            other => other.to_string(),
        }
    }

    /// Ordering used by `<`, `sorted()`, `min()` and `max()`: numeric when
    /// both renderings are numbers, otherwise lexicographic on the rendering.
    pub fn compare(&self, other: &Value) -> Ordering {
        let (left, right) = (self.to_string(), other.to_string());
        match (numeric_text(&left), numeric_text(&right)) {
            (Some(l), Some(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
            _ => left.cmp(&right),
        }
    }

    pub fn dict_get<'a>(entries: &'a [(Value, Value)], key: &Value) -> Option<&'a Value> {
        let wanted = key.debug_text();
        entries
            .iter()
            .find(|(k, _)| k.debug_text() == wanted)
            .map(|(_, v)| v)
    }

    /// Insert or overwrite, keeping the original position of an existing key.
    /// Returns the previous value.
    pub fn dict_insert(entries: &mut Vec<(Value, Value)>, key: Value, value: Value) -> Option<Value> {
        let wanted = key.debug_text();
        match entries.iter_mut().find(|(k, _)| k.debug_text() == wanted) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                entries.push((key, value));
                None
            }
        }
    }

    pub fn dict_remove(entries: &mut Vec<(Value, Value)>, key: &Value) -> Option<Value> {
        let wanted = key.debug_text();
        let position = entries.iter().position(|(k, _)| k.debug_text() == wanted)?;
        Some(entries.remove(position).1)
    }
}

impl From<Option<Value>> for Value {
    fn from(value: Option<Value>) -> Self {
        value.map_or(Value::NIL, Value::wrap_optional)
    }
}

fn numeric_text(text: &str) -> Option<f64> {
    let first = text.chars().next()?;
    if !(first.is_ascii_digit() || first == '-' || first == '.') {
        return None;
    }
    text.parse().ok()
}

fn write_double(f: &mut fmt::Formatter, n: f64) -> fmt::Result {
    // Always show at least one decimal place for doubles
    if n.is_finite() && n.fract() == 0.0 {
        write!(f, "{:.1}", n)
    } else if n.is_infinite() {
        write!(f, "{}", if n > 0.0 { "inf" } else { "-inf" })
    } else {
        write!(f, "{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Double(n) => write_double(f, *n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item.debug_text())?;
                }
                write!(f, "]")
            }
            Value::Dict(entries) if entries.is_empty() => write!(f, "[:]"),
            Value::Dict(entries) => {
                write!(f, "[")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key.debug_text(), value.debug_text())?;
                }
                write!(f, "]")
            }
            Value::Range {
                lower,
                upper,
                closed,
            } => {
                let op = if *closed { "..." } else { "..<" };
                write!(f, "{}{}{}", lower, op, upper)
            }
            Value::Tuple(elements) => {
                write!(f, "(")?;
                for (i, (label, value)) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if let Some(label) = label {
                        write!(f, "{}: ", label)?;
                    }
                    write!(f, "{}", value.debug_text())?;
                }
                write!(f, ")")
            }
            Value::Optional(None) => write!(f, "nil"),
            Value::Optional(Some(inner)) => write!(f, "Optional({})", inner),
        }
    }
}
