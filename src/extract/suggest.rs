//! Formula suggestion from document text
//!
//! Two local suggesters:
//! - [`PatternSuggester`] scans prose for `Premium = ...`-style sentences
//! - [`ResponseSuggester`] parses model answers written as
//!   `ACR: Full Name - Description = Formula`, one per line
//!
//! Every suggested expression goes through the [`FormulaCanonicalizer`], so
//! records come out over canonical variable names.

use std::collections::HashSet;

use regex::Regex;
use tracing::debug;

use crate::core::canonical::FormulaCanonicalizer;
use crate::core::expression::CompiledExpression;
use crate::core::normalize::normalize_name;
use crate::core::registry::FormulaRecord;
use crate::error::{CalcError, CalcResult};
use crate::vocabulary;

pub trait FormulaSuggester: Send + Sync {
    /// Suggest formula records found in `text`. A non-empty `targets` list
    /// keeps only records whose name or acronym matches a target.
    fn suggest(&self, text: &str, targets: &[String]) -> CalcResult<Vec<FormulaRecord>>;

    /// Recorded as the records' `source_method`
    fn name(&self) -> &'static str;
}

fn build_regex(pattern: &str) -> CalcResult<Regex> {
    Regex::new(pattern).map_err(|e| CalcError::Validation(format!("Regex error: {}", e)))
}

/// Does the record answer one of the requested targets?
pub fn matches_targets(record: &FormulaRecord, targets: &[String]) -> bool {
    if targets.is_empty() {
        return true;
    }
    let key = normalize_name(&record.name);
    let acronym = record.acronym.as_deref().map(normalize_name);

    targets.iter().any(|target| {
        let wanted = normalize_name(target);
        let canonical = vocabulary::canonical_key(target).unwrap_or_else(|| wanted.clone());
        key == wanted || key == canonical || acronym.as_deref() == Some(wanted.as_str())
    })
}

/// Drop duplicates (same name and expression) and records off target
fn finish(records: Vec<FormulaRecord>, targets: &[String]) -> Vec<FormulaRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert((normalize_name(&r.name), r.expression.clone())))
        .filter(|r| matches_targets(r, targets))
        .collect()
}

struct Draft<'a> {
    name: &'a str,
    acronym: &'a str,
    description: &'a str,
    expression: &'a str,
    evidence: &'a str,
}

fn draft_to_record(
    canonicalizer: &FormulaCanonicalizer,
    draft: Draft<'_>,
    method: &str,
) -> Option<FormulaRecord> {
    let name = canonicalizer.canonical_phrase(draft.name);
    let expression = canonicalizer.canonical_expression(draft.expression);
    if name.is_empty() || expression.is_empty() {
        return None;
    }

    Some(FormulaRecord {
        name,
        expression,
        acronym: Some(draft.acronym.to_string()),
        business_context: Some(draft.description.to_string()),
        formula_explanation: Some(format!("{} = {}", draft.name.trim(), draft.expression.trim())),
        evidence: vec![draft.evidence.trim().to_string()],
        source_method: Some(method.to_string()),
        ..Default::default()
    })
}

//==============================================================================
// Pattern suggester
//==============================================================================

/// Keyword, acronym, full name, description
const NAMED_PATTERNS: [(&str, &str, &str, &str); 6] = [
    ("premium", "AP", "Annual Premium", "Total yearly insurance cost"),
    ("rate", "IR", "Insurance Rate", "Cost per unit of coverage"),
    ("coverage", "CA", "Coverage Amount", "Total insured value"),
    ("deductible", "DED", "Deductible", "Amount paid before insurance coverage"),
    ("commission", "COM", "Commission", "Agent compensation amount"),
    (r"risk\s*factor", "RF", "Risk Factor", "Multiplier based on risk assessment"),
];

/// A formula sentence ends at ". " or at the end of the line, so decimals
/// such as `0.05` stay inside the expression
const SENTENCE_END: &str = r"(.+?)(?:\.\s|\.?\s*$)";

const MIN_FORMULA_LEN: usize = 6;
const MAX_FORMULA_LEN: usize = 149;

pub struct PatternSuggester {
    canonicalizer: FormulaCanonicalizer,
    named: Vec<(Regex, &'static str, &'static str, &'static str)>,
    generic: Regex,
}

impl PatternSuggester {
    pub fn new() -> CalcResult<Self> {
        let named = NAMED_PATTERNS
            .iter()
            .map(|(keyword, acronym, full_name, description)| -> CalcResult<_> {
                let regex = build_regex(&format!(r"(?im)\b{}\s*=\s*{}", keyword, SENTENCE_END))?;
                Ok((regex, *acronym, *full_name, *description))
            })
            .collect::<CalcResult<Vec<_>>>()?;

        Ok(Self {
            canonicalizer: FormulaCanonicalizer::new()?,
            named,
            generic: build_regex(&format!(
                r"(?m)^[\s\-*\d.)]*?([A-Za-z][A-Za-z ]*?)\s*=\s*{}",
                SENTENCE_END
            ))?,
        })
    }

    fn within_length(formula: &str) -> bool {
        (MIN_FORMULA_LEN..=MAX_FORMULA_LEN).contains(&formula.chars().count())
    }
}

impl FormulaSuggester for PatternSuggester {
    fn suggest(&self, text: &str, targets: &[String]) -> CalcResult<Vec<FormulaRecord>> {
        let mut records = Vec::new();

        for (regex, acronym, full_name, description) in &self.named {
            for caps in regex.captures_iter(text) {
                let (Some(whole), Some(rhs)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                let rhs = rhs.as_str().trim();
                if !Self::within_length(&format!("{} = {}", acronym, rhs)) {
                    continue;
                }
                records.extend(draft_to_record(
                    &self.canonicalizer,
                    Draft {
                        name: full_name,
                        acronym,
                        description,
                        expression: rhs,
                        evidence: whole.as_str(),
                    },
                    self.name(),
                ));
            }
        }

        for caps in self.generic.captures_iter(text) {
            let (Some(whole), Some(lhs), Some(rhs)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                continue;
            };
            let (lhs, rhs) = (lhs.as_str().trim(), rhs.as_str().trim());
            if !Self::within_length(&format!("{} = {}", lhs, rhs)) {
                continue;
            }
            records.extend(draft_to_record(
                &self.canonicalizer,
                Draft {
                    name: lhs,
                    acronym: "GF",
                    description: "Mathematical relationship",
                    expression: rhs,
                    evidence: whole.as_str(),
                },
                self.name(),
            ));
        }

        let records = finish(records, targets);
        debug!(count = records.len(), "Pattern matching found formulas");
        Ok(records)
    }

    fn name(&self) -> &'static str {
        "pattern"
    }
}

//==============================================================================
// Response suggester
//==============================================================================

pub struct ResponseSuggester {
    canonicalizer: FormulaCanonicalizer,
    structured: Regex,
    list_marker: Regex,
}

impl ResponseSuggester {
    pub fn new() -> CalcResult<Self> {
        Ok(Self {
            canonicalizer: FormulaCanonicalizer::new()?,
            // AP: Annual Premium - Total yearly cost = Base Rate × Coverage
            structured: build_regex(r"^(\w+):\s*([^-]+?)\s*-\s*([^=]+?)\s*=\s*(.+)$")?,
            // "1. " or "- " or "* "
            list_marker: build_regex(r"^\d+\.\s*|^\s*[-*]\s*")?,
        })
    }

    fn looks_arithmetic(line: &str) -> bool {
        line.contains(['=', '+', '-', '*', '/', '%', '(', ')'])
    }
}

impl FormulaSuggester for ResponseSuggester {
    fn suggest(&self, text: &str, targets: &[String]) -> CalcResult<Vec<FormulaRecord>> {
        let mut records = Vec::new();
        let mut general = 0;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.to_lowercase().contains("no formulas found") {
                continue;
            }
            let item = self.list_marker.replace(line, "");
            let item = item.trim();

            if let Some(caps) = self.structured.captures(item) {
                let field = |i: usize| caps.get(i).map_or("", |m| m.as_str().trim());
                records.extend(draft_to_record(
                    &self.canonicalizer,
                    Draft {
                        name: field(2),
                        acronym: field(1),
                        description: field(3),
                        expression: field(4),
                        evidence: line,
                    },
                    self.name(),
                ));
                continue;
            }

            if !Self::looks_arithmetic(item) || item.chars().count() <= 3 {
                continue;
            }
            let canonical = self.canonicalizer.canonicalize(item)?;
            if canonical.expression.is_empty()
                || CompiledExpression::compile(&canonical.expression).error().is_some()
            {
                continue;
            }

            let name = match canonical.name {
                Some(name) => name,
                None => {
                    general += 1;
                    format!("general_formula_{}", general)
                }
            };
            records.push(FormulaRecord {
                name,
                expression: canonical.expression,
                acronym: Some("GF".to_string()),
                business_context: Some(
                    "Mathematical relationship extracted from document".to_string(),
                ),
                formula_explanation: Some(item.to_string()),
                evidence: vec![line.to_string()],
                source_method: Some(self.name().to_string()),
                ..Default::default()
            });
        }

        let records = finish(records, targets);
        debug!(count = records.len(), "Parsed formulas from response text");
        Ok(records)
    }

    fn name(&self) -> &'static str {
        "response"
    }
}

//==============================================================================
// Fallback chain
//==============================================================================

/// Tries suggesters in order and returns the first non-empty result
pub struct FallbackSuggester {
    suggesters: Vec<Box<dyn FormulaSuggester>>,
}

impl FallbackSuggester {
    pub fn new(suggesters: Vec<Box<dyn FormulaSuggester>>) -> Self {
        Self { suggesters }
    }

    /// Structured response lines first, prose patterns second
    pub fn local() -> CalcResult<Self> {
        Ok(Self::new(vec![
            Box::new(ResponseSuggester::new()?),
            Box::new(PatternSuggester::new()?),
        ]))
    }
}

impl FormulaSuggester for FallbackSuggester {
    fn suggest(&self, text: &str, targets: &[String]) -> CalcResult<Vec<FormulaRecord>> {
        for suggester in &self.suggesters {
            let records = suggester.suggest(text, targets)?;
            if !records.is_empty() {
                return Ok(records);
            }
            debug!(suggester = suggester.name(), "No formulas found, trying next");
        }
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "fallback"
    }
}
