//! Formula evaluator
//!
//! Walks an AST against a [`SymbolTable`]. Unknown variables evaluate to 0
//! and are reported back to the caller; every other problem is an
//! [`EvalError`].

use super::functions::{call_function, is_function};
use super::parser::{BinaryOp, Expr, ParseError, UnaryOp};
use super::symbols::SymbolTable;
use super::tokenizer::TokenizeError;

/// Error during evaluation (or compilation) of one expression
#[derive(Debug, Clone, PartialEq)]
pub struct EvalError {
    pub message: String,
}

impl EvalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EvalError {}

impl From<TokenizeError> for EvalError {
    fn from(e: TokenizeError) -> Self {
        EvalError::new(e.to_string())
    }
}

impl From<ParseError> for EvalError {
    fn from(e: ParseError) -> Self {
        EvalError::new(e.to_string())
    }
}

/// Evaluate an expression, recording variables that had to fall back to 0
pub fn evaluate(
    expr: &Expr,
    symbols: &SymbolTable,
    missing: &mut Vec<String>,
) -> Result<f64, EvalError> {
    match expr {
        Expr::Number(n) => Ok(*n),

        Expr::Variable(name) => match symbols.get(name) {
            Some(value) => Ok(value),
            None if is_function(name) => Err(EvalError::new(format!(
                "Function '{}' used as a value",
                name
            ))),
            None => {
                if !missing.contains(name) {
                    missing.push(name.clone());
                }
                Ok(0.0)
            }
        },

        Expr::FunctionCall { name, args } => {
            let values = args
                .iter()
                .map(|arg| evaluate(arg, symbols, missing))
                .collect::<Result<Vec<f64>, EvalError>>()?;
            call_function(name, &values)
        }

        Expr::BinaryOp { op, left, right } => {
            let l = evaluate(left, symbols, missing)?;
            let r = evaluate(right, symbols, missing)?;
            evaluate_binary_op(*op, l, r)
        }

        Expr::UnaryOp { op, operand } => {
            let v = evaluate(operand, symbols, missing)?;
            Ok(match op {
                UnaryOp::Neg => -v,
                UnaryOp::Plus => v,
            })
        }
    }
}

fn evaluate_binary_op(op: BinaryOp, l: f64, r: f64) -> Result<f64, EvalError> {
    match op {
        BinaryOp::Add => Ok(l + r),
        BinaryOp::Sub => Ok(l - r),
        BinaryOp::Mul => Ok(l * r),
        BinaryOp::Div => {
            if r == 0.0 {
                Err(EvalError::new("Division by zero"))
            } else {
                Ok(l / r)
            }
        }
        BinaryOp::Pow => {
            if l == 0.0 && r < 0.0 {
                return Err(EvalError::new(
                    "0.0 cannot be raised to a negative power",
                ));
            }
            let result = l.powf(r);
            if result.is_infinite() && l.is_finite() && r.is_finite() {
                return Err(EvalError::new("Numerical result out of range"));
            }
            Ok(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::expression::parser::parse;
    use crate::core::expression::tokenizer::tokenize;

    fn eval_with(formula: &str, symbols: &SymbolTable) -> Result<(f64, Vec<String>), EvalError> {
        let expr = parse(tokenize(formula)?)?;
        let mut missing = Vec::new();
        let value = evaluate(&expr, symbols, &mut missing)?;
        Ok((value, missing))
    }

    fn eval(formula: &str) -> Result<f64, EvalError> {
        eval_with(formula, &SymbolTable::new()).map(|(v, _)| v)
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("2 + 2").unwrap(), 4.0);
        assert_eq!(eval("10 - 4 / 2").unwrap(), 8.0);
        assert_eq!(eval("(10 - 4) / 2").unwrap(), 3.0);
        assert_eq!(eval("2 ** 10").unwrap(), 1024.0);
        assert_eq!(eval("-2 ** 2").unwrap(), -4.0);
        assert_eq!(eval("2 ** -1").unwrap(), 0.5);
        assert_eq!(eval("+3").unwrap(), 3.0);
    }

    #[test]
    fn test_constants() {
        assert_eq!(eval("pi").unwrap(), std::f64::consts::PI);
        assert_eq!(eval("E").unwrap(), std::f64::consts::E);
    }

    #[test]
    fn test_functions() {
        assert_eq!(eval("max(1, 7, 3)").unwrap(), 7.0);
        assert_eq!(eval("abs(-4) + sqrt(16)").unwrap(), 8.0);
        assert_eq!(eval("round(2.5) + round(3.5)").unwrap(), 6.0);
    }

    #[test]
    fn test_division_by_zero() {
        let err = eval("1 / 0").unwrap_err();
        assert!(err.message.contains("Division by zero"));
        assert!(eval("0 ** -1").is_err());
    }

    #[test]
    fn test_overflow() {
        assert!(eval("10 ** 400").is_err());
    }

    #[test]
    fn test_missing_variable_falls_back_to_zero() {
        let mut symbols = SymbolTable::new();
        symbols.bind("premium", 100.0);
        let (value, missing) = eval_with("premium + missing_var", &symbols).unwrap();
        assert_eq!(value, 100.0);
        assert_eq!(missing, vec!["missing_var"]);
    }

    #[test]
    fn test_missing_variable_reported_once() {
        let (value, missing) = eval_with("x * 2 + x", &SymbolTable::new()).unwrap();
        assert_eq!(value, 0.0);
        assert_eq!(missing, vec!["x"]);
    }

    #[test]
    fn test_function_name_as_value_is_error() {
        assert!(eval("max + 1").is_err());
    }

    #[test]
    fn test_unknown_function_is_error() {
        assert!(eval("open(1)").is_err());
    }
}
