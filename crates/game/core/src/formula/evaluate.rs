//! Tree-walking interpreter.

use std::cmp::Ordering;

use super::functions::{self, text};
use super::parser::{BinaryOp, Expr, MacroKind, UnaryOp};
use super::{FormulaError, PREDECLARED};
use crate::env::DiceRoller;
use crate::value::{Value, ValueMap};

/// Per-evaluation interpreter state.
pub(crate) struct Interpreter<'a, R: DiceRoller + ?Sized> {
    context: &'a ValueMap,
    roller: &'a mut R,
    /// Macro-bound variables, innermost last.
    locals: Vec<(String, Value)>,
    /// `(dice, result)` for every `roll()` made so far.
    pub(crate) rolls: Vec<(String, i64)>,
    steps: u64,
    limit: u64,
}

impl<'a, R: DiceRoller + ?Sized> Interpreter<'a, R> {
    pub(crate) fn new(context: &'a ValueMap, roller: &'a mut R, limit: u64) -> Self {
        Self {
            context,
            roller,
            locals: Vec::new(),
            rolls: Vec::new(),
            steps: 0,
            limit,
        }
    }

    fn tick(&mut self) -> Result<(), FormulaError> {
        self.steps += 1;
        if self.steps > self.limit {
            return Err(FormulaError::StepLimit { limit: self.limit });
        }
        Ok(())
    }

    pub(crate) fn eval(&mut self, expr: &Expr) -> Result<Value, FormulaError> {
        self.tick()?;
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Ident(name) => self.lookup(name),
            Expr::List(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Expr::Map(entries) => {
                let mut map = ValueMap::new();
                for (key, value) in entries {
                    let key = match self.eval(key)? {
                        Value::String(s) => s,
                        k @ (Value::Int(_) | Value::Bool(_)) => k.to_string(),
                        other => {
                            return Err(type_error(format!(
                                "map keys must be strings, got {}",
                                other.type_name()
                            )));
                        }
                    };
                    let value = self.eval(value)?;
                    map.insert(key, value);
                }
                Ok(Value::Map(map))
            }
            Expr::Member(target, field) => {
                let target = self.eval(target)?;
                member(target, field)
            }
            Expr::Index(target, index) => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;
                self::index(target, &index)
            }
            Expr::Call(name, args) => self.call(name, args),
            Expr::Method(target, name, args) => {
                let target = self.eval(target)?;
                let args = args
                    .iter()
                    .map(|a| self.eval(a))
                    .collect::<Result<Vec<_>, _>>()?;
                functions::call_method(name, target, args)
            }
            Expr::Macro {
                target,
                kind,
                var,
                body,
            } => self.comprehension(target, *kind, var, body),
            Expr::Unary(op, operand) => {
                let value = self.eval(operand)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!truth(&value, "!")?)),
                    UnaryOp::Neg => match value {
                        Value::Null => Ok(Value::Int(0)),
                        Value::Int(i) => {
                            i.checked_neg().map(Value::Int).ok_or(FormulaError::Overflow)
                        }
                        Value::Double(d) => Ok(Value::Double(-d)),
                        other => Err(type_error(format!("cannot negate {}", other.type_name()))),
                    },
                }
            }
            Expr::Binary(BinaryOp::And, lhs, rhs) => {
                if !truth(&self.eval(lhs)?, "&&")? {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(truth(&self.eval(rhs)?, "&&")?))
            }
            Expr::Binary(BinaryOp::Or, lhs, rhs) => {
                if truth(&self.eval(lhs)?, "||")? {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(truth(&self.eval(rhs)?, "||")?))
            }
            Expr::Binary(op, lhs, rhs) => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                binary(*op, lhs, rhs)
            }
            Expr::Conditional(cond, then, otherwise) => {
                if truth(&self.eval(cond)?, "?:")? {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<Value, FormulaError> {
        if let Some((_, value)) = self.locals.iter().rev().find(|(n, _)| n == name) {
            return Ok(value.clone());
        }
        if let Some(value) = self.context.get(name) {
            return Ok(value.clone());
        }
        if PREDECLARED.contains(&name) {
            return Ok(Value::Null);
        }
        Err(FormulaError::Undeclared {
            name: name.to_string(),
        })
    }

    fn call(&mut self, name: &str, args: &[Expr]) -> Result<Value, FormulaError> {
        match (name, args) {
            ("roll", [dice]) => {
                let dice = match self.eval(dice)? {
                    Value::String(s) => s,
                    other => {
                        return Err(type_error(format!(
                            "roll() expects dice notation, got {}",
                            other.type_name()
                        )));
                    }
                };
                let result = self.roller.roll(&dice)?;
                self.rolls.push((dice, result));
                Ok(Value::Int(result))
            }
            ("has", [Expr::Member(target, field)]) => {
                let target = self.eval(target)?;
                Ok(Value::Bool(target.as_map().is_some_and(|m| m.contains_key(field))))
            }
            ("has", [target, key]) => {
                let target = self.eval(target)?;
                let key = text(&self.eval(key)?);
                Ok(Value::Bool(target.as_map().is_some_and(|m| m.contains_key(&key))))
            }
            _ => {
                let args = args
                    .iter()
                    .map(|a| self.eval(a))
                    .collect::<Result<Vec<_>, _>>()?;
                functions::call(name, args)
            }
        }
    }

    fn comprehension(
        &mut self,
        target: &Expr,
        kind: MacroKind,
        var: &str,
        body: &Expr,
    ) -> Result<Value, FormulaError> {
        let items = match self.eval(target)? {
            Value::List(items) => items,
            Value::Map(map) => map.into_keys().map(Value::String).collect(),
            Value::Null => Vec::new(),
            other => {
                return Err(type_error(format!(
                    "cannot iterate over {}",
                    other.type_name()
                )));
            }
        };

        let mut kept = Vec::new();
        for item in items {
            self.locals.push((var.to_string(), item.clone()));
            let result = self.eval(body);
            self.locals.pop();
            let result = result?;
            match kind {
                MacroKind::Exists if truth(&result, "exists")? => return Ok(Value::Bool(true)),
                MacroKind::All if !truth(&result, "all")? => return Ok(Value::Bool(false)),
                MacroKind::Filter if truth(&result, "filter")? => kept.push(item),
                MacroKind::Map => kept.push(result),
                _ => {}
            }
        }
        Ok(match kind {
            MacroKind::Exists => Value::Bool(false),
            MacroKind::All => Value::Bool(true),
            MacroKind::Filter | MacroKind::Map => Value::List(kept),
        })
    }
}

fn type_error(message: String) -> FormulaError {
    FormulaError::Type { message }
}

/// Boolean view of a condition operand; `null` is false.
fn truth(value: &Value, op: &str) -> Result<bool, FormulaError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Null => Ok(false),
        other => Err(type_error(format!(
            "'{op}' expects bool, got {}",
            other.type_name()
        ))),
    }
}

fn member(target: Value, field: &str) -> Result<Value, FormulaError> {
    match target {
        Value::Map(mut map) => Ok(map.remove(field).unwrap_or_default()),
        Value::Null => Ok(Value::Null),
        other => Err(type_error(format!(
            "no field '{field}' on {}",
            other.type_name()
        ))),
    }
}

fn index(target: Value, index: &Value) -> Result<Value, FormulaError> {
    match (target, index) {
        (Value::Null, _) => Ok(Value::Null),
        (Value::List(items), idx) => {
            let Some(i) = idx.to_int().filter(|_| !matches!(idx, Value::String(_))) else {
                return Err(type_error(format!(
                    "list index must be int, got {}",
                    idx.type_name()
                )));
            };
            Ok(usize::try_from(i)
                .ok()
                .and_then(|i| items.into_iter().nth(i))
                .unwrap_or_default())
        }
        (Value::Map(mut map), key) => Ok(map.remove(&text(key)).unwrap_or_default()),
        (other, _) => Err(type_error(format!("cannot index {}", other.type_name()))),
    }
}

/// Loose equality: numbers compare across int/double, `null` equals any
/// falsy value.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, other) | (other, Value::Null) => !other.is_truthy(),
        (Value::Int(x), Value::Double(y)) | (Value::Double(y), Value::Int(x)) => (*x as f64) == *y,
        (Value::List(x), Value::List(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| values_equal(a, b))
        }
        (Value::Map(x), Value::Map(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| values_equal(v, w)))
        }
        (a, b) => a == b,
    }
}

fn compare(op: BinaryOp, a: &Value, b: &Value) -> Result<Ordering, FormulaError> {
    let incomparable = || {
        type_error(format!(
            "cannot compare {} {} {}",
            a.type_name(),
            op.symbol(),
            b.type_name()
        ))
    };
    match (a, b) {
        (Value::Int(_) | Value::Null, Value::Int(_) | Value::Null) => {
            Ok(a.to_int().unwrap_or(0).cmp(&b.to_int().unwrap_or(0)))
        }
        (
            Value::Int(_) | Value::Double(_) | Value::Null,
            Value::Int(_) | Value::Double(_) | Value::Null,
        ) => {
            let (x, y) = (a.to_double().unwrap_or(0.0), b.to_double().unwrap_or(0.0));
            x.partial_cmp(&y).ok_or_else(incomparable)
        }
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        (Value::String(x), Value::Null) => Ok(x.as_str().cmp("")),
        (Value::Null, Value::String(y)) => Ok("".cmp(y.as_str())),
        (Value::Bool(x), Value::Bool(y)) => Ok(x.cmp(y)),
        _ => Err(incomparable()),
    }
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, FormulaError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(values_equal(&lhs, &rhs))),
        BinaryOp::Ne => Ok(Value::Bool(!values_equal(&lhs, &rhs))),
        BinaryOp::Lt => Ok(Value::Bool(compare(op, &lhs, &rhs)?.is_lt())),
        BinaryOp::Le => Ok(Value::Bool(compare(op, &lhs, &rhs)?.is_le())),
        BinaryOp::Gt => Ok(Value::Bool(compare(op, &lhs, &rhs)?.is_gt())),
        BinaryOp::Ge => Ok(Value::Bool(compare(op, &lhs, &rhs)?.is_ge())),
        BinaryOp::In => membership(&lhs, &rhs).map(Value::Bool),
        BinaryOp::Add => add(lhs, rhs),
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => arithmetic(op, &lhs, &rhs),
        // Short-circuiting operators are handled by the interpreter.
        BinaryOp::And | BinaryOp::Or => {
            Ok(Value::Bool(match op {
                BinaryOp::And => truth(&lhs, "&&")? && truth(&rhs, "&&")?,
                _ => truth(&lhs, "||")? || truth(&rhs, "||")?,
            }))
        }
    }
}

fn membership(needle: &Value, haystack: &Value) -> Result<bool, FormulaError> {
    match haystack {
        Value::List(items) => Ok(items.iter().any(|item| values_equal(item, needle))),
        Value::Map(map) => Ok(map.contains_key(&text(needle))),
        Value::String(s) => Ok(s.contains(&text(needle))),
        Value::Null => Ok(false),
        other => Err(type_error(format!(
            "'in' needs a list, map or string, got {}",
            other.type_name()
        ))),
    }
}

fn add(lhs: Value, rhs: Value) -> Result<Value, FormulaError> {
    match (lhs, rhs) {
        (Value::List(mut x), Value::List(y)) => {
            x.extend(y);
            Ok(Value::List(x))
        }
        (Value::String(x), other) if is_scalar(&other) => Ok(Value::String(x + &text(&other))),
        (other, Value::String(y)) if is_scalar(&other) => Ok(Value::String(text(&other) + &y)),
        (lhs, rhs) => arithmetic(BinaryOp::Add, &lhs, &rhs),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::List(_) | Value::Map(_))
}

fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, FormulaError> {
    let mismatch = || {
        type_error(format!(
            "cannot apply '{}' to {} and {}",
            op.symbol(),
            lhs.type_name(),
            rhs.type_name()
        ))
    };
    let is_int = |v: &Value| matches!(v, Value::Int(_) | Value::Null);

    if is_int(lhs) && is_int(rhs) {
        let (x, y) = (lhs.to_int().unwrap_or(0), rhs.to_int().unwrap_or(0));
        let result = match op {
            BinaryOp::Add => x.checked_add(y),
            BinaryOp::Sub => x.checked_sub(y),
            BinaryOp::Mul => x.checked_mul(y),
            BinaryOp::Div if y == 0 => return Err(FormulaError::DivisionByZero),
            BinaryOp::Div => x.checked_div(y),
            BinaryOp::Rem if y == 0 => return Err(FormulaError::DivisionByZero),
            BinaryOp::Rem => x.checked_rem(y),
            _ => return Err(mismatch()),
        };
        return result.map(Value::Int).ok_or(FormulaError::Overflow);
    }

    let (Some(x), Some(y)) = (lhs.to_double(), rhs.to_double()) else {
        return Err(mismatch());
    };
    let result = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div | BinaryOp::Rem if y == 0.0 => return Err(FormulaError::DivisionByZero),
        BinaryOp::Div => x / y,
        BinaryOp::Rem => x % y,
        _ => return Err(mismatch()),
    };
    Ok(Value::Double(result))
}
