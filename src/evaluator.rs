use crate::ast::{AssignOp, FuncDecl, Literal, Node, SwitchCase};
use crate::builtins;
use crate::config::Limits;
use crate::error::Fault;
use crate::parser::parse_source;
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;
use log::{debug, trace};
use std::collections::HashMap;

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// Tree-walking evaluator for one run. Construct a fresh one per program;
/// `execute` consumes it.
pub struct Evaluator {
    limits: Limits,
    /// Outermost frame first. Lookups search from the innermost frame out.
    scopes: Vec<HashMap<String, Value>>,
    functions: HashMap<String, FuncDecl>,
    output: String,
}

impl Evaluator {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            scopes: vec![HashMap::new()],
            functions: HashMap::new(),
            output: String::new(),
        }
    }

    /// Run `program` with `bindings` seeded into the global frame and return
    /// everything it printed. A fault ends the run and becomes the last line.
    pub fn execute(mut self, program: &Node, bindings: &HashMap<String, Value>) -> String {
        for (name, value) in bindings {
            self.define(name, value.clone());
        }

        if let Err(fault) = self.execute_statement(program) {
            debug!("run halted: {fault}");
            self.output.push_str(&fault.to_string());
            self.output.push('\n');
        }
        self.output
    }

    fn execute_statement(&mut self, stmt: &Node) -> Result<Flow, Fault> {
        ensure_sufficient_stack(|| match stmt {
            Node::Block(statements) => self.execute_block(statements),
            Node::VariableDecl { name, value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::NIL,
                };
                self.define(name, value);
                Ok(Flow::Normal)
            }
            Node::Assignment { target, op, value } => {
                self.execute_assignment(target, *op, value)?;
                Ok(Flow::Normal)
            }
            Node::Print {
                args,
                separator,
                terminator,
            } => {
                self.execute_print(args, separator.as_deref(), terminator.as_deref())?;
                Ok(Flow::Normal)
            }
            Node::If {
                condition,
                binding,
                then_block,
                else_block,
            } => {
                let value = self.evaluate(condition)?;
                match binding {
                    Some(name) if !value.is_nil() => {
                        let mut frame = HashMap::new();
                        frame.insert(name.to_lowercase(), value.unwrapped());
                        self.scopes.push(frame);
                        let result = self.execute_statement(then_block);
                        self.scopes.pop();
                        result
                    }
                    None if value.is_truthy() => self.execute_statement(then_block),
                    _ => match else_block {
                        Some(else_block) => self.execute_statement(else_block),
                        None => Ok(Flow::Normal),
                    },
                }
            }
            Node::Switch {
                subject,
                cases,
                default,
            } => self.execute_switch(subject, cases, default.as_deref()),
            Node::While { condition, body } => self.execute_while(condition, body),
            Node::ForIn {
                variable,
                sequence,
                body,
            } => self.execute_for_in(variable, sequence, body),
            Node::FuncDecl(decl) => {
                trace!("registering function '{}'", decl.name);
                self.functions.insert(decl.name.to_lowercase(), decl.clone());
                Ok(Flow::Normal)
            }
            Node::Return(value) => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::NIL,
                };
                Ok(Flow::Return(value))
            }
            Node::Break => Ok(Flow::Break),
            Node::Continue => Ok(Flow::Continue),
            expr => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }
        })
    }

    fn execute_block(&mut self, statements: &[Node]) -> Result<Flow, Fault> {
        for statement in statements {
            match self.execute_statement(statement)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn execute_print(
        &mut self,
        args: &[Node],
        separator: Option<&Node>,
        terminator: Option<&Node>,
    ) -> Result<(), Fault> {
        let separator = match separator {
            Some(expr) => self.evaluate(expr)?.to_string(),
            None => " ".to_string(),
        };
        let terminator = match terminator {
            Some(expr) => self.evaluate(expr)?.to_string(),
            None => "\n".to_string(),
        };

        let mut rendered = Vec::with_capacity(args.len());
        for arg in args {
            rendered.push(self.evaluate(arg)?.to_string());
        }
        self.output.push_str(&rendered.join(&separator));
        self.output.push_str(&terminator);
        Ok(())
    }

    fn execute_assignment(&mut self, target: &Node, op: AssignOp, value: &Node) -> Result<(), Fault> {
        let value = self.evaluate(value)?;
        let value = match op.binary_symbol() {
            None => value,
            Some(symbol) => {
                let current = self.evaluate(target)?.unwrapped();
                self.binary_op(current, symbol, value)?
            }
        };
        self.store(target, value)
    }

    /// Write `value` to a variable or to an element reached through a
    /// subscript chain rooted at one.
    fn store(&mut self, target: &Node, value: Value) -> Result<(), Fault> {
        let mut indices = Vec::new();
        let mut node = target;
        while let Node::Subscript { receiver, index, .. } = node {
            indices.push(index.as_ref());
            node = receiver.as_ref();
        }
        let Node::Variable(name) = node else {
            debug!("dropping write to a non-assignable target");
            return Ok(());
        };
        if indices.is_empty() {
            self.assign(name, value);
            return Ok(());
        }

        indices.reverse();
        let mut keys = Vec::with_capacity(indices.len());
        for index in indices {
            keys.push(self.evaluate(index)?);
        }
        let Some(mut root) = self.lookup(name) else {
            debug!("subscript assignment to undefined variable '{name}'");
            return Ok(());
        };
        store_element(&mut root, &keys, value)?;
        self.assign(name, root);
        Ok(())
    }

    fn execute_switch(
        &mut self,
        subject: &Node,
        cases: &[SwitchCase],
        default: Option<&Node>,
    ) -> Result<Flow, Fault> {
        let subject = self.evaluate(subject)?;
        let rendered = subject.to_string();

        let mut body = default;
        'cases: for case in cases {
            for pattern in &case.patterns {
                let matched = match self.evaluate(pattern)? {
                    Value::Range {
                        lower,
                        upper,
                        closed,
                    } => match &subject {
                        Value::Int(n) => *n >= lower && (*n < upper || (closed && *n == upper)),
                        _ => false,
                    },
                    pattern => pattern.to_string() == rendered,
                };
                if matched {
                    body = Some(&case.body);
                    break 'cases;
                }
            }
        }

        match body {
            Some(body) => match self.execute_statement(body)? {
                Flow::Break => Ok(Flow::Normal),
                flow => Ok(flow),
            },
            None => Ok(Flow::Normal),
        }
    }

    fn execute_while(&mut self, condition: &Node, body: &Node) -> Result<Flow, Fault> {
        let mut iterations = 0;
        while self.evaluate(condition)?.is_truthy() {
            if iterations >= self.limits.max_loop_iterations {
                debug!("while loop stopped after {iterations} iterations");
                break;
            }
            iterations += 1;
            match self.execute_statement(body)? {
                Flow::Break => break,
                Flow::Normal | Flow::Continue => {}
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn execute_for_in(&mut self, variable: &str, sequence: &Node, body: &Node) -> Result<Flow, Fault> {
        let items: Box<dyn Iterator<Item = Value>> = match self.evaluate(sequence)? {
            Value::Range {
                lower,
                upper,
                closed,
            } => Box::new(Value::range_values(lower, upper, closed).map(Value::Int)),
            Value::List(items) => Box::new(items.into_iter()),
            other => {
                debug!("for-in over a {} does nothing", other.type_name());
                return Ok(Flow::Normal);
            }
        };

        for item in items {
            if variable != "_" {
                self.define(variable, item);
            }
            match self.execute_statement(body)? {
                Flow::Break => break,
                Flow::Normal | Flow::Continue => {}
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    pub fn evaluate(&mut self, expr: &Node) -> Result<Value, Fault> {
        ensure_sufficient_stack(|| self.evaluate_inner(expr))
    }

    fn evaluate_inner(&mut self, expr: &Node) -> Result<Value, Fault> {
        match expr {
            Node::Literal(literal) => match literal {
                Literal::Bool(b) => Ok(Value::Bool(*b)),
                Literal::Int(n) => Ok(Value::Int(*n)),
                Literal::Double(n) => Ok(Value::Double(*n)),
                Literal::Str(raw) => Ok(Value::Str(self.interpolate(raw)?)),
                Literal::Nil => Ok(Value::NIL),
            },
            Node::Variable(name) => Ok(self.lookup(name).unwrap_or_else(|| {
                debug!("undefined variable '{name}' evaluates to nil");
                Value::NIL
            })),
            Node::BinaryOp { left, op, right } => match op.as_str() {
                "&&" => {
                    let result = self.evaluate(left)?.is_truthy() && self.evaluate(right)?.is_truthy();
                    Ok(Value::Bool(result))
                }
                "||" => {
                    let result = self.evaluate(left)?.is_truthy() || self.evaluate(right)?.is_truthy();
                    Ok(Value::Bool(result))
                }
                _ => {
                    let left = self.evaluate(left)?;
                    let right = self.evaluate(right)?;
                    self.binary_op(left, op, right)
                }
            },
            Node::Unary { op, operand } => {
                let operand = self.evaluate(operand)?;
                Ok(match (op.as_str(), operand) {
                    ("-", Value::Int(n)) => Value::Int(n.wrapping_neg()),
                    ("-", Value::Double(n)) => Value::Double(-n),
                    ("!", operand) => Value::Bool(!operand.is_truthy()),
                    (op, operand) => {
                        debug!("unary '{op}' is not defined for {}", operand.type_name());
                        Value::NIL
                    }
                })
            }
            Node::Call { callee, args } => {
                let args = self.evaluate_all(args)?;
                self.call(callee, args)
            }
            Node::MethodCall {
                receiver,
                method,
                args,
            } => {
                let target = self.evaluate(receiver)?;
                let args = match args {
                    Some(args) => self.evaluate_all(args)?,
                    None => Vec::new(),
                };
                let result = builtins::call_method(target, method, args)?;
                if let Some(updated) = result.mutated {
                    self.store(receiver, updated)?;
                }
                Ok(result.value)
            }
            Node::Subscript {
                receiver,
                index,
                default,
            } => {
                let receiver = self.evaluate(receiver)?;
                let index = self.evaluate(index)?;
                let value = subscript(receiver, index)?;
                match default {
                    Some(default) if value.is_nil() => self.evaluate(default),
                    Some(_) => Ok(value.unwrapped()),
                    None => Ok(value),
                }
            }
            Node::Array(elements) => Ok(Value::List(self.evaluate_all(elements)?)),
            Node::Dictionary(pairs) => {
                let mut entries = Vec::with_capacity(pairs.len());
                for (key, value) in pairs {
                    let key = self.evaluate(key)?;
                    let value = self.evaluate(value)?;
                    Value::dict_insert(&mut entries, key, value);
                }
                Ok(Value::Dict(entries))
            }
            Node::Tuple(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for (label, element) in elements {
                    values.push((label.clone(), self.evaluate(element)?));
                }
                Ok(Value::Tuple(values))
            }
            Node::ForceUnwrap(operand) => match self.evaluate(operand)? {
                value if value.is_nil() => Err(Fault::UnwrapNil),
                value => Ok(value.unwrapped()),
            },
            Node::Cast {
                value,
                target,
                forced,
            } => {
                let value = self.evaluate(value)?;
                cast(value, target, *forced)
            }
            Node::TryForce(operand) => {
                let value = self.evaluate(operand)?;
                let rendered = value.to_string();
                if rendered.starts_with("Error:") {
                    Err(Fault::TryFailed(rendered))
                } else {
                    Ok(value)
                }
            }
            statement => {
                debug!("statement used as an expression: {statement:?}");
                Ok(Value::NIL)
            }
        }
    }

    fn evaluate_all(&mut self, exprs: &[Node]) -> Result<Vec<Value>, Fault> {
        let mut values = Vec::with_capacity(exprs.len());
        for expr in exprs {
            values.push(self.evaluate(expr)?);
        }
        Ok(values)
    }

    /// User functions shadow built-ins of the same name; anything else is nil.
    fn call(&mut self, callee: &str, args: Vec<Value>) -> Result<Value, Fault> {
        if let Some(decl) = self.functions.get(&callee.to_lowercase()).cloned() {
            return self.call_function(&decl, args);
        }
        match builtins::call_global(callee, args)? {
            Some(value) => Ok(value),
            None => {
                debug!("unknown function '{callee}' evaluates to nil");
                Ok(Value::NIL)
            }
        }
    }

    fn call_function(&mut self, decl: &FuncDecl, args: Vec<Value>) -> Result<Value, Fault> {
        if self.scopes.len() >= self.limits.max_call_depth {
            return Err(Fault::StackOverflow);
        }

        let mut args = args.into_iter();
        let frame: HashMap<String, Value> = decl
            .params
            .iter()
            .map(|param| (param.to_lowercase(), args.next().unwrap_or(Value::NIL)))
            .collect();
        self.scopes.push(frame);
        let result = self.execute_statement(&decl.body);
        self.scopes.pop();

        match result? {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::NIL),
        }
    }

    fn binary_op(&mut self, left: Value, op: &str, right: Value) -> Result<Value, Fault> {
        use std::cmp::Ordering;

        if matches!(op, "/" | "%") && matches!(right.as_f64(), Some(r) if r == 0.0) {
            return Err(Fault::DivisionByZero);
        }

        let result = match op {
            "+" => match (left, right) {
                (Value::List(mut l), Value::List(r)) => {
                    l.extend(r);
                    Some(Value::List(l))
                }
                (l @ Value::Str(_), r) | (l, r @ Value::Str(_)) => {
                    Some(Value::Str(format!("{l}{r}")))
                }
                (l, r) => arithmetic(&l, &r, i64::wrapping_add, |a, b| a + b),
            },
            "-" => arithmetic(&left, &right, i64::wrapping_sub, |a, b| a - b),
            "*" => arithmetic(&left, &right, i64::wrapping_mul, |a, b| a * b),
            "/" => arithmetic(&left, &right, i64::wrapping_div, |a, b| a / b),
            "%" => arithmetic(&left, &right, i64::wrapping_rem, |a, b| a % b),
            "==" => Some(Value::Bool(left.to_string() == right.to_string())),
            "!=" => Some(Value::Bool(left.to_string() != right.to_string())),
            "<" => Some(Value::Bool(left.compare(&right) == Ordering::Less)),
            "<=" => Some(Value::Bool(left.compare(&right) != Ordering::Greater)),
            ">" => Some(Value::Bool(left.compare(&right) == Ordering::Greater)),
            ">=" => Some(Value::Bool(left.compare(&right) != Ordering::Less)),
            "..<" | "..." => match (left, right) {
                (Value::Int(lower), Value::Int(upper)) => Some(Value::Range {
                    lower,
                    upper,
                    closed: op == "...",
                }),
                _ => None,
            },
            _ => None,
        };

        Ok(result.unwrap_or_else(|| {
            debug!("operator '{op}' has no meaning for these operands");
            Value::NIL
        }))
    }

    /// Expand `\(expr)` segments and decode escapes in a string literal's raw
    /// text. Inner expressions see the current scopes.
    fn interpolate(&mut self, raw: &str) -> Result<String, Fault> {
        if !raw.contains('\\') {
            return Ok(raw.to_string());
        }

        let chars: Vec<char> = raw.chars().collect();
        let mut out = String::with_capacity(raw.len());
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c != '\\' || i + 1 >= chars.len() {
                out.push(c);
                i += 1;
                continue;
            }

            match chars[i + 1] {
                '(' => {
                    let Some(close) = closing_paren(&chars, i + 2) else {
                        out.extend(&chars[i..]);
                        break;
                    };
                    let inner: String = chars[i + 2..close].iter().collect();
                    match self.interpolated_value(&inner)? {
                        Some(value) => out.push_str(&value.to_string()),
                        None => out.extend(&chars[i..=close]),
                    }
                    i = close + 1;
                    continue;
                }
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                '0' => out.push('\0'),
                other => out.push(other),
            }
            i += 2;
        }
        Ok(out)
    }

    /// `None` when the text does not parse as a single expression.
    fn interpolated_value(&mut self, source: &str) -> Result<Option<Value>, Fault> {
        let (program, errors) = parse_source(source);
        if !errors.is_empty() {
            debug!("interpolation '{source}' kept verbatim: {} syntax errors", errors.len());
            return Ok(None);
        }
        match program {
            Node::Block(statements) if statements.len() == 1 => self.evaluate(&statements[0]).map(Some),
            _ => Ok(None),
        }
    }

    fn define(&mut self, name: &str, value: Value) {
        let name = name.to_lowercase();
        debug!("define '{name}' in frame {}", self.scopes.len().saturating_sub(1));
        if let Some(frame) = self.scopes.last_mut() {
            frame.insert(name, value);
        }
    }

    /// Update the innermost frame that has `name`, or define it in the
    /// innermost frame.
    fn assign(&mut self, name: &str, value: Value) {
        let name = name.to_lowercase();
        match self.scopes.iter_mut().rev().find(|frame| frame.contains_key(&name)) {
            Some(frame) => {
                frame.insert(name, value);
            }
            None => self.define(&name, value),
        }
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        let name = name.to_lowercase();
        self.scopes
            .iter()
            .rev()
            .find_map(|frame| frame.get(&name))
            .cloned()
    }
}

fn arithmetic(
    left: &Value,
    right: &Value,
    int_op: fn(i64, i64) -> i64,
    float_op: fn(f64, f64) -> f64,
) -> Option<Value> {
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => Some(Value::Int(int_op(*l, *r))),
        _ => Some(Value::Double(float_op(left.as_f64()?, right.as_f64()?))),
    }
}

/// Index of the `)` closing an interpolation whose body starts at `start`.
/// String literals inside the body may contain parentheses.
fn closing_paren(chars: &[char], start: usize) -> Option<usize> {
    let mut depth = 1;
    let mut i = start;
    while i < chars.len() {
        match chars[i] {
            '"' => {
                i += 1;
                while i < chars.len() && chars[i] != '"' {
                    if chars[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn list_index(index: &Value, len: usize) -> Option<usize> {
    match index {
        Value::Int(i) if *i >= 0 && (*i as u64) < len as u64 => Some(*i as usize),
        _ => None,
    }
}

pub(crate) fn subscript(receiver: Value, index: Value) -> Result<Value, Fault> {
    let index = index.unwrapped();
    match receiver {
        Value::List(mut items) => match index {
            Value::Range {
                lower,
                upper,
                closed,
            } => {
                let end = if closed { upper.saturating_add(1) } else { upper };
                if lower < 0 || end < lower || end as u64 > items.len() as u64 {
                    return Err(Fault::IndexOutOfRange);
                }
                Ok(Value::List(items.drain(lower as usize..end as usize).collect()))
            }
            index => {
                let i = list_index(&index, items.len()).ok_or(Fault::IndexOutOfRange)?;
                Ok(items.swap_remove(i))
            }
        },
        Value::Str(s) => {
            let len = s.chars().count();
            let i = list_index(&index, len).ok_or(Fault::StringIndexOutOfRange)?;
            Ok(s.chars().nth(i).map(|c| Value::Str(c.to_string())).unwrap_or(Value::NIL))
        }
        Value::Dict(entries) => Ok(Value::dict_get(&entries, &index)
            .cloned()
            .map_or(Value::NIL, Value::wrap_optional)),
        Value::Optional(Some(inner)) => subscript(*inner, index),
        Value::Optional(None) => Ok(Value::NIL),
        other => {
            debug!("cannot subscript a {}", other.type_name());
            Ok(Value::NIL)
        }
    }
}

/// Replace the element at the end of `keys` inside `container`.
fn store_element(container: &mut Value, keys: &[Value], value: Value) -> Result<(), Fault> {
    let Some((key, rest)) = keys.split_first() else {
        *container = value;
        return Ok(());
    };
    let key = key.clone().unwrapped();

    match container {
        Value::List(items) => {
            let i = list_index(&key, items.len()).ok_or(Fault::IndexOutOfRange)?;
            store_element(&mut items[i], rest, value)
        }
        Value::Dict(entries) if rest.is_empty() => {
            if value.is_nil() {
                Value::dict_remove(entries, &key);
            } else {
                Value::dict_insert(entries, key, value.unwrapped());
            }
            Ok(())
        }
        Value::Dict(entries) => {
            let wanted = key.debug_text();
            match entries.iter_mut().find(|(k, _)| k.debug_text() == wanted) {
                Some((_, slot)) => store_element(slot, rest, value),
                None => {
                    debug!("nested assignment through missing key {wanted}");
                    Ok(())
                }
            }
        }
        Value::Optional(Some(inner)) => store_element(inner, keys, value),
        other => {
            debug!("cannot assign through a subscript of a {}", other.type_name());
            Ok(())
        }
    }
}

fn cast(value: Value, target: &str, forced: bool) -> Result<Value, Fault> {
    if value.is_nil() {
        return if forced { Err(Fault::UnwrapNil) } else { Ok(Value::NIL) };
    }
    let value = value.unwrapped();
    let matches = match target {
        "Int" => matches!(value, Value::Int(_)),
        "Double" | "Float" => matches!(value, Value::Double(_)),
        "String" | "Character" => matches!(value, Value::Str(_)),
        "Bool" => matches!(value, Value::Bool(_)),
        _ => true,
    };

    match (matches, forced) {
        (true, true) => Ok(value),
        (true, false) => Ok(Value::some(value)),
        (false, true) => Err(Fault::InvalidCast {
            actual: value.type_name().to_string(),
            target: target.to_string(),
        }),
        (false, false) => Ok(Value::NIL),
    }
}
