//! Safe arithmetic expressions
//!
//! An expression is rewritten (`^` → `**`, typographic operators → ASCII),
//! tokenized, parsed into a closed AST and evaluated against a row's
//! [`SymbolTable`]. There is no path from an expression to anything but
//! arithmetic over the table's bindings and the fixed function set.

pub mod evaluator;
pub mod functions;
pub mod parser;
pub mod symbols;
pub mod tokenizer;

use tracing::warn;

pub use evaluator::EvalError;
pub use parser::Expr;
pub use symbols::SymbolTable;

/// Textual replacements applied before tokenizing
const REWRITES: [(&str, &str); 11] = [
    ("^", "**"),
    ("√ó", "*"),
    ("√∑", "/"),
    ("×", "*"),
    ("·", "*"),
    ("⋅", "*"),
    ("∗", "*"),
    ("÷", "/"),
    ("∕", "/"),
    ("−", "-"),
    ("–", "-"),
];

/// Normalize operator spelling: `^` to `**` and non-ASCII multiplication,
/// division and minus glyphs to their ASCII operators
pub fn rewrite_operators(expression: &str) -> String {
    let mut out = expression.trim().to_string();
    for (from, to) in REWRITES {
        if out.contains(from) {
            out = out.replace(from, to);
        }
    }
    out
}

/// Successful evaluation of one expression
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub value: f64,
    /// Variables that were absent from the symbol table and read as 0
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Compiled {
    Empty,
    Ready(Expr),
    Invalid(EvalError),
}

/// An expression parsed once and evaluated many times
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpression {
    source: String,
    compiled: Compiled,
}

impl CompiledExpression {
    /// Compile an expression. Syntax errors are kept and reported on every
    /// evaluation rather than failing here.
    pub fn compile(source: &str) -> Self {
        let trimmed = source.trim();
        let compiled = if trimmed.is_empty() {
            Compiled::Empty
        } else {
            let rewritten = rewrite_operators(trimmed);
            match tokenizer::tokenize(&rewritten)
                .map_err(EvalError::from)
                .and_then(|tokens| parser::parse(tokens).map_err(EvalError::from))
            {
                Ok(expr) => Compiled::Ready(expr),
                Err(e) => Compiled::Invalid(e),
            }
        };

        Self {
            source: trimmed.to_string(),
            compiled,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.compiled, Compiled::Empty)
    }

    /// The compile error, if the expression is not valid
    pub fn error(&self) -> Option<&EvalError> {
        match &self.compiled {
            Compiled::Invalid(e) => Some(e),
            _ => None,
        }
    }

    pub fn ast(&self) -> Option<&Expr> {
        match &self.compiled {
            Compiled::Ready(expr) => Some(expr),
            _ => None,
        }
    }

    /// Variables referenced by the expression (empty when invalid)
    pub fn variables(&self) -> Vec<String> {
        self.ast().map(Expr::variables).unwrap_or_default()
    }

    /// Evaluate against a symbol table.
    ///
    /// `Ok(None)` for an empty expression; `Err` for syntax errors, invalid
    /// operations and non-finite results.
    pub fn evaluate(&self, symbols: &SymbolTable) -> Result<Option<Evaluation>, EvalError> {
        let expr = match &self.compiled {
            Compiled::Empty => return Ok(None),
            Compiled::Invalid(e) => return Err(e.clone()),
            Compiled::Ready(expr) => expr,
        };

        let mut missing = Vec::new();
        let value = evaluator::evaluate(expr, symbols, &mut missing)?;

        for name in &missing {
            warn!(
                variable = %name,
                expression = %self.source,
                "Variable not found in context, using 0"
            );
        }

        if !value.is_finite() {
            return Err(EvalError::new(format!("Result is not a finite number ({})", value)));
        }

        Ok(Some(Evaluation { value, missing }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluate_expression(
        source: &str,
        symbols: &SymbolTable,
    ) -> Result<Option<Evaluation>, EvalError> {
        CompiledExpression::compile(source).evaluate(symbols)
    }

    fn value_of(source: &str, symbols: &SymbolTable) -> f64 {
        evaluate_expression(source, symbols)
            .unwrap()
            .expect("expression should produce a value")
            .value
    }

    #[test]
    fn test_rewrite_operators() {
        assert_eq!(rewrite_operators("a ^ 2"), "a ** 2");
        assert_eq!(rewrite_operators("a × b ÷ c"), "a * b / c");
        assert_eq!(rewrite_operators("a √ó b √∑ c"), "a * b / c");
        assert_eq!(rewrite_operators(" a − b "), "a - b");
    }

    #[test]
    fn test_empty_expression_is_no_value() {
        let symbols = SymbolTable::new();
        assert_eq!(evaluate_expression("", &symbols).unwrap(), None);
        assert_eq!(evaluate_expression("   ", &symbols).unwrap(), None);
        assert!(CompiledExpression::compile(" ").is_empty());
    }

    #[test]
    fn test_constant_expression_ignores_row() {
        let mut symbols = SymbolTable::new();
        symbols.bind("premium", 999.0);
        assert_eq!(value_of("2 + 2", &symbols), 4.0);
        assert_eq!(value_of("2 + 2", &SymbolTable::new()), 4.0);
    }

    #[test]
    fn test_caret_is_power() {
        let mut symbols = SymbolTable::new();
        symbols.bind("rate", 0.1);
        let v = value_of("(1 + rate) ^ 2", &symbols);
        assert!((v - 1.21).abs() < 1e-12);
    }

    #[test]
    fn test_glyph_multiplication() {
        let mut symbols = SymbolTable::new();
        symbols.bind("base_rate", 2.0);
        symbols.bind("coverage_amount", 50.0);
        assert_eq!(value_of("base_rate × coverage_amount", &symbols), 100.0);
    }

    #[test]
    fn test_missing_variable_reported() {
        let mut symbols = SymbolTable::new();
        symbols.bind("premium", 100.0);
        let evaluation = evaluate_expression("premium + missing_var", &symbols)
            .unwrap()
            .unwrap();
        assert_eq!(evaluation.value, 100.0);
        assert_eq!(evaluation.missing, vec!["missing_var".to_string()]);
    }

    #[test]
    fn test_identifiers_are_case_insensitive() {
        let mut symbols = SymbolTable::new();
        symbols.bind("PREMIUM", 50.0);
        assert_eq!(value_of("Premium * 2", &symbols), 100.0);
    }

    #[test]
    fn test_syntax_error_is_kept_until_evaluation() {
        let compiled = CompiledExpression::compile("premium * (1 +");
        assert!(compiled.error().is_some());
        assert!(compiled.evaluate(&SymbolTable::new()).is_err());
    }

    #[test]
    fn test_code_is_not_evaluated() {
        let symbols = SymbolTable::new();
        assert!(evaluate_expression("__import__('os').system('ls')", &symbols).is_err());
        assert!(evaluate_expression("premium; 1", &symbols).is_err());
        assert!(evaluate_expression("lambda: 1", &symbols).is_err());
    }

    #[test]
    fn test_non_finite_result_is_failure() {
        let symbols = SymbolTable::new();
        assert!(evaluate_expression("exp(800) * exp(800)", &symbols).is_err());
        assert!(evaluate_expression("(-8) ** 0.5", &symbols).is_err());
    }

    #[test]
    fn test_variables_listed() {
        let compiled = CompiledExpression::compile("Premium * Term + bonus");
        assert_eq!(compiled.variables(), vec!["premium", "term", "bonus"]);
    }

    #[test]
    fn test_deeply_nested_formula_is_a_formula_error() {
        let source = format!("{}premium{}", "(".repeat(5_000), ")".repeat(5_000));
        let compiled = CompiledExpression::compile(&source);
        assert!(compiled.error().is_some());
        assert!(compiled.evaluate(&SymbolTable::new()).is_err());
    }
}
