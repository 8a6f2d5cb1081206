//! Static checks run once when a formula is compiled.

use super::FormulaError;
use super::functions::{describe_arity, function_arity, method_arity};
use super::parser::Expr;

/// Verifies function names and arities across the whole tree.
///
/// Identifiers are resolved at evaluation time, since the set of context
/// keys (e.g. `is_<command>_active`) depends on the manifest.
pub(crate) fn check(expr: &Expr) -> Result<(), FormulaError> {
    match expr {
        Expr::Literal(_) | Expr::Ident(_) => Ok(()),
        Expr::List(items) => items.iter().try_for_each(check),
        Expr::Map(entries) => entries.iter().try_for_each(|(k, v)| {
            check(k)?;
            check(v)
        }),
        Expr::Member(target, _) => check(target),
        Expr::Index(target, index) => {
            check(target)?;
            check(index)
        }
        Expr::Call(name, args) => {
            let (min, max) = function_arity(name).ok_or_else(|| FormulaError::UnknownFunction {
                name: name.clone(),
            })?;
            check_arity(name, min, max, args.len())?;
            if name == "has" && args.len() == 1 && !matches!(args[0], Expr::Member(..)) {
                return Err(FormulaError::Type {
                    message: "has() with one argument needs a field selection".to_string(),
                });
            }
            args.iter().try_for_each(check)
        }
        Expr::Method(target, name, args) => {
            let (min, max) = method_arity(name).ok_or_else(|| FormulaError::UnknownFunction {
                name: name.clone(),
            })?;
            check_arity(name, min, max, args.len())?;
            check(target)?;
            args.iter().try_for_each(check)
        }
        Expr::Macro { target, body, .. } => {
            check(target)?;
            check(body)
        }
        Expr::Unary(_, operand) => check(operand),
        Expr::Binary(_, lhs, rhs) => {
            check(lhs)?;
            check(rhs)
        }
        Expr::Conditional(cond, then, otherwise) => {
            check(cond)?;
            check(then)?;
            check(otherwise)
        }
    }
}

fn check_arity(name: &str, min: usize, max: usize, found: usize) -> Result<(), FormulaError> {
    if found < min || found > max {
        return Err(FormulaError::Arity {
            name: name.to_string(),
            expected: describe_arity(min, max),
            found,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::lexer::tokenize;
    use crate::formula::parser::parse;

    fn check_str(source: &str) -> Result<(), FormulaError> {
        check(&parse(tokenize(source)?)?)
    }

    #[test]
    fn test_known_functions_pass() {
        check_str("roll('1d20') + mod(actor.stats.dex)").unwrap();
        check_str("max(1, 2, 3) > min([4, 5])").unwrap();
        check_str("has(actor.stats.dex) && has(actor.stats, 'str')").unwrap();
    }

    #[test]
    fn test_unknown_function_and_arity() {
        assert!(matches!(
            check_str("teleport(actor)"),
            Err(FormulaError::UnknownFunction { .. })
        ));
        assert!(matches!(
            check_str("mod(1, 2)"),
            Err(FormulaError::Arity { found: 2, .. })
        ));
        assert!(matches!(
            check_str("'abc'.reverse()"),
            Err(FormulaError::UnknownFunction { .. })
        ));
        assert!(check_str("has(actor)").is_err());
    }
}
