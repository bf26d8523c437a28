//! Free-text formula → canonical expression
//!
//! Documents and LLM answers write formulas like
//! `AP = Base Rate × Coverage Amount × Risk Factor` or
//! `Surrender Value = 30% of Premium`. The canonicalizer splits off the
//! left-hand side, spells operators in ASCII, turns percentages into
//! fractions and rewrites every multi-word operand into a canonical variable
//! name (vocabulary phrase lookup first, normalization otherwise).

use regex::Regex;

use crate::core::expression::{functions::is_function, rewrite_operators, CompiledExpression};
use crate::core::normalize::normalize_name;
use crate::error::{CalcError, CalcResult};
use crate::vocabulary;

/// Result of canonicalizing one free-text formula
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalFormula {
    /// Canonical name of the left-hand side, when the text had one
    pub name: Option<String>,
    /// Expression over canonical variable names
    pub expression: String,
    /// Variables the expression reads
    pub variables: Vec<String>,
}

pub struct FormulaCanonicalizer {
    percent_pattern: Regex,
    of_pattern: Regex,
    phrase_pattern: Regex,
}

impl FormulaCanonicalizer {
    pub fn new() -> CalcResult<Self> {
        let build = |pattern: &str| {
            Regex::new(pattern).map_err(|e| CalcError::Validation(format!("Regex error: {}", e)))
        };
        Ok(Self {
            // 30% or 2.5 %
            percent_pattern: build(r"(\d+(?:\.\d+)?)\s*%")?,
            // "0.3 of premium" reads as multiplication
            of_pattern: build(r"(?i)\)\s+of\s+|(\d)\s+of\s+")?,
            // words separated by single spaces: "Coverage Amount", "risk_factor"
            phrase_pattern: build(r"[A-Za-z_][A-Za-z0-9_]*(?: +[A-Za-z_][A-Za-z0-9_]*)*")?,
        })
    }

    /// Canonicalize `Name = expression` or a bare expression
    pub fn canonicalize(&self, text: &str) -> CalcResult<CanonicalFormula> {
        let cleaned = text
            .trim()
            .trim_end_matches(['.', ';'])
            .replace(['$', '€', '£', '₹'], "");

        let (lhs, rhs) = match cleaned.rsplit_once('=') {
            Some((lhs, rhs)) => (Some(lhs.trim()), rhs.trim()),
            None => (None, cleaned.trim()),
        };

        let name = lhs
            .map(|l| self.canonical_phrase(l))
            .filter(|n| !n.is_empty());

        let expression = self.canonical_expression(rhs);
        let variables = CompiledExpression::compile(&expression).variables();

        Ok(CanonicalFormula {
            name,
            expression,
            variables,
        })
    }

    /// Rewrite the right-hand side of a formula
    pub fn canonical_expression(&self, text: &str) -> String {
        let mut result = rewrite_operators(text);

        // 30% → (30/100)
        result = self
            .percent_pattern
            .replace_all(&result, "($1/100)")
            .into_owned();

        // (30/100) of premium → (30/100) * premium
        result = self
            .of_pattern
            .replace_all(&result, |caps: &regex::Captures| match caps.get(1) {
                Some(digit) => format!("{} * ", digit.as_str()),
                None => ") * ".to_string(),
            })
            .into_owned();

        // Replace phrases in reverse so earlier match ranges stay valid
        let source = result.clone();
        let matches: Vec<_> = self.phrase_pattern.find_iter(&source).collect();
        for m in matches.iter().rev() {
            // Part of a number such as 1.5e10
            if m.start() > 0 {
                let prev = source[..m.start()].chars().next_back();
                if prev.is_some_and(|c| c.is_ascii_digit() || c == '.') {
                    continue;
                }
            }

            let phrase = m.as_str();
            let followed_by_paren = source[m.end()..].trim_start().starts_with('(');
            let lowered = phrase.to_lowercase();

            let replacement = if followed_by_paren && is_function(&lowered) {
                lowered
            } else {
                self.canonical_phrase(phrase)
            };
            result.replace_range(m.range(), &replacement);
        }

        result
    }

    /// Canonical variable name for a phrase
    pub fn canonical_phrase(&self, phrase: &str) -> String {
        if let Some(key) = vocabulary::canonical_key(phrase) {
            return key;
        }
        let collapsed = phrase.split_whitespace().collect::<Vec<_>>().join(" ");
        normalize_name(&collapsed)
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon() -> FormulaCanonicalizer {
        FormulaCanonicalizer::new().unwrap()
    }

    #[test]
    fn test_named_formula_with_phrases() {
        let f = canon()
            .canonicalize("AP = Base Rate × Coverage Amount × Risk Factor")
            .unwrap();
        assert_eq!(f.name.as_deref(), Some("ap"));
        assert_eq!(f.expression, "base_rate * coverage * risk_factor");
        assert_eq!(f.variables, vec!["base_rate", "coverage", "risk_factor"]);
    }

    #[test]
    fn test_vocabulary_phrases_map_to_canonical_names() {
        let f = canon()
            .canonicalize("Surrender Value = Sum Insured ÷ Policy Term")
            .unwrap();
        assert_eq!(f.name.as_deref(), Some("surrender_value"));
        assert_eq!(f.expression, "sum_assured / policy_term");
    }

    #[test]
    fn test_percent_of() {
        let f = canon().canonicalize("Bonus = 30% of Premium").unwrap();
        assert_eq!(f.expression, "(30/100) * premium");
    }

    #[test]
    fn test_functions_and_numbers_survive() {
        let f = canon()
            .canonicalize("max(Cash Value, 1.5e3) ^ 2")
            .unwrap();
        assert_eq!(f.name, None);
        assert_eq!(f.expression, "max(cash_value, 1.5e3) ** 2");
    }

    #[test]
    fn test_trailing_punctuation_and_currency() {
        let f = canon().canonicalize("Fee = $25 + Premium.").unwrap();
        assert_eq!(f.expression, "25 + premium");
    }

    #[test]
    fn test_canonical_expression_evaluates() {
        let expr = canon().canonical_expression("Entry Age × 2");
        let mut symbols = crate::core::expression::SymbolTable::new();
        symbols.bind("entry_age", 30.0);
        let value = CompiledExpression::compile(&expr)
            .evaluate(&symbols)
            .unwrap()
            .unwrap();
        assert_eq!(value.value, 60.0);
    }
}
