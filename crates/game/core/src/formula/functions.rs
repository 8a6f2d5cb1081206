//! Registered functions and methods.
//!
//! `roll` and `has` need interpreter state and are dispatched by the
//! evaluator; everything here is a pure function of its arguments.

use super::FormulaError;
use crate::value::Value;

const VARIADIC: usize = usize::MAX;

/// `(name, min arity, max arity)` for free functions.
const FUNCTIONS: &[(&str, usize, usize)] = &[
    ("roll", 1, 1),
    ("mod", 1, 1),
    ("size_rank", 1, 1),
    ("get_condition", 2, 2),
    ("float", 1, 1),
    ("int", 1, 1),
    ("double", 1, 1),
    ("string", 1, 1),
    ("size", 1, 1),
    ("min", 1, VARIADIC),
    ("max", 1, VARIADIC),
    ("abs", 1, 1),
    ("has", 1, 2),
    ("stat", 1, 1),
];

/// `(name, min arity, max arity)` for receiver-style calls, receiver excluded.
const METHODS: &[(&str, usize, usize)] = &[
    ("size", 0, 0),
    ("startsWith", 1, 1),
    ("endsWith", 1, 1),
    ("contains", 1, 1),
    ("lower", 0, 0),
    ("upper", 0, 0),
];

pub(crate) fn function_arity(name: &str) -> Option<(usize, usize)> {
    lookup(FUNCTIONS, name)
}

pub(crate) fn method_arity(name: &str) -> Option<(usize, usize)> {
    lookup(METHODS, name)
}

fn lookup(table: &[(&str, usize, usize)], name: &str) -> Option<(usize, usize)> {
    table
        .iter()
        .find(|(n, _, _)| *n == name)
        .map(|(_, min, max)| (*min, *max))
}

pub(crate) fn describe_arity(min: usize, max: usize) -> String {
    match (min, max) {
        (min, VARIADIC) => format!("at least {min}"),
        (min, max) if min == max => min.to_string(),
        (min, max) => format!("{min} to {max}"),
    }
}

fn type_error(message: String) -> FormulaError {
    FormulaError::Type { message }
}

/// Integer argument; `null` reads as zero.
fn int_arg(function: &str, value: &Value) -> Result<i64, FormulaError> {
    match value {
        Value::Null => Ok(0),
        Value::Int(i) => Ok(*i),
        Value::Double(d) if d.fract() == 0.0 => Ok(*d as i64),
        other => Err(type_error(format!(
            "{function}() expects an int, got {}",
            other.type_name()
        ))),
    }
}

/// Calls a pure registered function. Arity has already been checked.
pub(crate) fn call(name: &str, args: Vec<Value>) -> Result<Value, FormulaError> {
    let first = args.first().cloned().unwrap_or_default();
    match name {
        "mod" => int_arg(name, &first)?
            .checked_sub(10)
            .map(|score| Value::Int(score.div_euclid(2)))
            .ok_or(FormulaError::Overflow),
        "size_rank" => Ok(Value::Int(size_rank(first.as_str().unwrap_or("")))),
        "get_condition" => {
            let prefix = args.get(1).and_then(Value::as_str).unwrap_or("");
            let found = first
                .get("conditions")
                .and_then(Value::as_list)
                .into_iter()
                .flatten()
                .filter_map(Value::as_str)
                .find(|c| c.starts_with(prefix))
                .unwrap_or("");
            Ok(Value::String(found.to_string()))
        }
        "float" | "double" => match &first {
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::Double)
                .map_err(|_| type_error(format!("cannot convert '{s}' to double"))),
            other => other.to_double().map(Value::Double).ok_or_else(|| {
                type_error(format!("{name}() expects a number, got {}", other.type_name()))
            }),
        },
        "int" => match &first {
            Value::Null => Ok(Value::Int(0)),
            Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
            other => other.to_int().map(Value::Int).ok_or_else(|| {
                type_error(format!("cannot convert {} '{other}' to int", other.type_name()))
            }),
        },
        "string" => Ok(Value::String(text(&first))),
        "size" => size(&first),
        "abs" => match first {
            Value::Double(d) => Ok(Value::Double(d.abs())),
            other => int_arg(name, &other)?
                .checked_abs()
                .map(Value::Int)
                .ok_or(FormulaError::Overflow),
        },
        "min" | "max" => extremum(name, args),
        // Reserved for a future skill-to-ability mapping.
        "stat" => Ok(first),
        other => Err(FormulaError::UnknownFunction {
            name: other.to_string(),
        }),
    }
}

/// Calls a receiver-style method. Arity has already been checked.
pub(crate) fn call_method(
    name: &str,
    target: Value,
    args: Vec<Value>,
) -> Result<Value, FormulaError> {
    let arg = args.first().map(Value::to_string).unwrap_or_default();
    match name {
        "size" => size(&target),
        "lower" | "upper" | "startsWith" | "endsWith" => {
            let text = match &target {
                Value::String(s) => s.as_str(),
                Value::Null => "",
                other => {
                    return Err(type_error(format!(
                        "{name}() needs a string receiver, got {}",
                        other.type_name()
                    )));
                }
            };
            Ok(match name {
                "lower" => Value::String(text.to_lowercase()),
                "upper" => Value::String(text.to_uppercase()),
                "startsWith" => Value::Bool(text.starts_with(&arg)),
                _ => Value::Bool(text.ends_with(&arg)),
            })
        }
        "contains" => match &target {
            Value::String(s) => Ok(Value::Bool(s.contains(&arg))),
            Value::List(items) => Ok(Value::Bool(
                args.first().is_some_and(|needle| items.iter().any(|i| i == needle)),
            )),
            Value::Map(map) => Ok(Value::Bool(map.contains_key(&arg))),
            Value::Null => Ok(Value::Bool(false)),
            other => Err(type_error(format!(
                "contains() needs a string, list or map receiver, got {}",
                other.type_name()
            ))),
        },
        other => Err(FormulaError::UnknownFunction {
            name: other.to_string(),
        }),
    }
}

/// String rendering used by `string()` and concatenation; `null` is empty.
pub(crate) fn text(value: &Value) -> String {
    value.to_text()
}

pub(crate) fn size_rank(size: &str) -> i64 {
    match size.to_ascii_lowercase().as_str() {
        "tiny" => 1,
        "small" => 2,
        "medium" => 3,
        "large" => 4,
        "huge" => 5,
        "gargantuan" => 6,
        _ => 0,
    }
}

fn size(value: &Value) -> Result<Value, FormulaError> {
    let len = match value {
        Value::Null => 0,
        Value::String(s) => s.chars().count(),
        Value::List(items) => items.len(),
        Value::Map(map) => map.len(),
        other => {
            return Err(type_error(format!("size() of {}", other.type_name())));
        }
    };
    Ok(Value::Int(len as i64))
}

fn extremum(name: &str, args: Vec<Value>) -> Result<Value, FormulaError> {
    // `max([a, b])` and `max(a, b)` are equivalent.
    let items = if args.len() == 1 && matches!(args[0], Value::List(_)) {
        match args.into_iter().next() {
            Some(Value::List(items)) => items,
            _ => Vec::new(),
        }
    } else {
        args
    };
    if items.is_empty() {
        return Err(type_error(format!("{name}() of an empty list")));
    }
    if items.iter().all(|v| matches!(v, Value::Int(_) | Value::Null)) {
        let ints = items.iter().map(|v| v.to_int().unwrap_or(0));
        let result = if name == "min" { ints.min() } else { ints.max() };
        return Ok(Value::Int(result.unwrap_or(0)));
    }
    let mut best: Option<f64> = None;
    for item in &items {
        let x = item.to_double().ok_or_else(|| {
            type_error(format!("{name}() expects numbers, got {}", item.type_name()))
        })?;
        best = Some(match best {
            None => x,
            Some(b) if name == "min" => b.min(x),
            Some(b) => b.max(x),
        });
    }
    Ok(Value::Double(best.unwrap_or(0.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mod_floors_toward_negative_infinity() {
        assert_eq!(call("mod", vec![Value::Int(14)]).unwrap(), Value::Int(2));
        assert_eq!(call("mod", vec![Value::Int(15)]).unwrap(), Value::Int(2));
        assert_eq!(call("mod", vec![Value::Int(9)]).unwrap(), Value::Int(-1));
        assert_eq!(call("mod", vec![Value::Int(1)]).unwrap(), Value::Int(-5));
    }

    #[test]
    fn test_mod_of_extreme_score_overflows() {
        assert_eq!(
            call("mod", vec![Value::Int(i64::MIN)]),
            Err(FormulaError::Overflow)
        );
        assert_eq!(
            call("mod", vec![Value::Int(i64::MAX)]).unwrap(),
            Value::Int((i64::MAX - 10) / 2)
        );
    }

    #[test]
    fn test_size_rank() {
        assert_eq!(size_rank("Tiny"), 1);
        assert_eq!(size_rank("gargantuan"), 6);
        assert_eq!(size_rank("colossal"), 0);
    }

    #[test]
    fn test_get_condition() {
        let entity = Value::map([(
            "conditions",
            Value::List(vec!["prone".into(), "grappledby:fighter".into()]),
        )]);
        let found = call("get_condition", vec![entity.clone(), "grappledby:".into()]).unwrap();
        assert_eq!(found, Value::from("grappledby:fighter"));
        let missing = call("get_condition", vec![entity, "restrained".into()]).unwrap();
        assert_eq!(missing, Value::from(""));
    }

    #[test]
    fn test_conversions_and_extrema() {
        assert_eq!(call("float", vec![Value::Int(3)]).unwrap(), Value::Double(3.0));
        assert_eq!(call("int", vec!["42".into()]).unwrap(), Value::Int(42));
        assert_eq!(call("int", vec![Value::Double(2.9)]).unwrap(), Value::Int(2));
        assert_eq!(call("max", vec![Value::Int(3), Value::Int(7)]).unwrap(), Value::Int(7));
        assert_eq!(
            call("min", vec![Value::Int(3), Value::Double(1.5)]).unwrap(),
            Value::Double(1.5)
        );
        assert!(call("int", vec!["abc".into()]).is_err());
    }

    #[test]
    fn test_methods() {
        let name = Value::from("Grappled");
        assert_eq!(call_method("lower", name.clone(), vec![]).unwrap(), Value::from("grappled"));
        assert_eq!(
            call_method("startsWith", name, vec!["Grap".into()]).unwrap(),
            Value::Bool(true)
        );
        let list = Value::List(vec!["a".into(), "b".into()]);
        assert_eq!(call_method("size", list.clone(), vec![]).unwrap(), Value::Int(2));
        assert_eq!(call_method("contains", list, vec!["b".into()]).unwrap(), Value::Bool(true));
    }
}
