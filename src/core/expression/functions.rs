//! Closed function table: MAX, MIN, ABS, ROUND, SQRT, EXP, LOG, SIN, COS, TAN
//!
//! Nothing outside this table can be called from an expression.

use super::evaluator::EvalError;

/// Names callable from expressions (lower-case)
pub const FUNCTIONS: [&str; 10] = [
    "max", "min", "abs", "round", "sqrt", "exp", "log", "sin", "cos", "tan",
];

pub fn is_function(name: &str) -> bool {
    FUNCTIONS.contains(&name)
}

/// Round half to even at `digits` decimal places (negative digits round to
/// tens, hundreds, ...)
pub fn round_half_even(value: f64, digits: i32) -> f64 {
    let multiplier = 10_f64.powi(digits);
    if multiplier == 0.0 {
        return 0.0_f64.copysign(value);
    }
    let scaled = value * multiplier;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round_ties_even() / multiplier
}

fn require_args(name: &str, args: &[f64], expected: usize) -> Result<(), EvalError> {
    if args.len() != expected {
        return Err(EvalError::new(format!(
            "{}() takes exactly {} argument(s) ({} given)",
            name,
            expected,
            args.len()
        )));
    }
    Ok(())
}

fn require_args_range(name: &str, args: &[f64], min: usize, max: usize) -> Result<(), EvalError> {
    if args.len() < min || args.len() > max {
        return Err(EvalError::new(format!(
            "{}() takes {} to {} arguments ({} given)",
            name,
            min,
            max,
            args.len()
        )));
    }
    Ok(())
}

fn finite(name: &str, value: f64) -> Result<f64, EvalError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvalError::new(format!("{}(): math range error", name)))
    }
}

/// Call a function from the closed table with already evaluated arguments
pub fn call_function(name: &str, args: &[f64]) -> Result<f64, EvalError> {
    match name {
        "max" | "min" => {
            if args.len() < 2 {
                return Err(EvalError::new(format!(
                    "{}() expects at least 2 arguments ({} given)",
                    name,
                    args.len()
                )));
            }
            let pick = if name == "max" { f64::max } else { f64::min };
            Ok(args[1..].iter().fold(args[0], |acc, &v| pick(acc, v)))
        }

        "abs" => {
            require_args(name, args, 1)?;
            Ok(args[0].abs())
        }

        "round" => {
            require_args_range(name, args, 1, 2)?;
            let digits = match args.get(1) {
                Some(d) if d.fract() != 0.0 => {
                    return Err(EvalError::new("round(): ndigits must be an integer"));
                }
                Some(d) => *d as i32,
                None => 0,
            };
            Ok(round_half_even(args[0], digits))
        }

        "sqrt" => {
            require_args(name, args, 1)?;
            if args[0] < 0.0 {
                return Err(EvalError::new("sqrt(): math domain error"));
            }
            Ok(args[0].sqrt())
        }

        "exp" => {
            require_args(name, args, 1)?;
            finite(name, args[0].exp())
        }

        "log" => {
            require_args_range(name, args, 1, 2)?;
            let x = args[0];
            if x <= 0.0 {
                return Err(EvalError::new("log(): math domain error"));
            }
            match args.get(1) {
                None => Ok(x.ln()),
                Some(&base) if base <= 0.0 => Err(EvalError::new("log(): math domain error")),
                Some(&base) if base == 1.0 => Err(EvalError::new("log(): base 1 divides by zero")),
                Some(&base) => Ok(x.ln() / base.ln()),
            }
        }

        "sin" => {
            require_args(name, args, 1)?;
            Ok(args[0].sin())
        }

        "cos" => {
            require_args(name, args, 1)?;
            Ok(args[0].cos())
        }

        "tan" => {
            require_args(name, args, 1)?;
            finite(name, args[0].tan())
        }

        _ => Err(EvalError::new(format!("Unknown function: {}", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_min() {
        assert_eq!(call_function("max", &[1.0, 5.0, 3.0]).unwrap(), 5.0);
        assert_eq!(call_function("min", &[1.0, -5.0, 3.0]).unwrap(), -5.0);
        assert!(call_function("max", &[1.0]).is_err());
    }

    #[test]
    fn test_round_half_even() {
        assert_eq!(call_function("round", &[2.5]).unwrap(), 2.0);
        assert_eq!(call_function("round", &[3.5]).unwrap(), 4.0);
        assert_eq!(call_function("round", &[1.234, 2.0]).unwrap(), 1.23);
        assert_eq!(call_function("round", &[1250.0, -2.0]).unwrap(), 1200.0);
        assert!(call_function("round", &[1.0, 0.5]).is_err());
    }

    #[test]
    fn test_round_to_huge_negative_digits_is_zero() {
        assert_eq!(call_function("round", &[5.0, -400.0]).unwrap(), 0.0);
        let negative = round_half_even(-5.0, -400);
        assert_eq!(negative, 0.0);
        assert!(negative.is_sign_negative());
    }

    #[test]
    fn test_domain_errors() {
        assert!(call_function("sqrt", &[-1.0]).is_err());
        assert!(call_function("log", &[0.0]).is_err());
        assert!(call_function("log", &[10.0, 1.0]).is_err());
        assert!(call_function("exp", &[1000.0]).is_err());
    }

    #[test]
    fn test_log_with_base() {
        let v = call_function("log", &[100.0, 10.0]).unwrap();
        assert!((v - 2.0).abs() < 1e-12);
        let v = call_function("log", &[std::f64::consts::E]).unwrap();
        assert!((v - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_arity_errors() {
        assert!(call_function("abs", &[]).is_err());
        assert!(call_function("sin", &[1.0, 2.0]).is_err());
        assert!(call_function("round", &[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_unknown_function() {
        let err = call_function("eval", &[1.0]).unwrap_err();
        assert!(err.message.contains("Unknown function"));
        assert!(!is_function("eval"));
        assert!(is_function("sqrt"));
    }
}
