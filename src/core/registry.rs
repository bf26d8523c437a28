//! Formula registry
//!
//! Holds the ordered formula set used by processing runs. A run takes an
//! [`Arc`] snapshot when it starts; [`FormulaRegistry::replace`] validates a
//! complete new set and swaps it in with a single write, so a run never sees
//! a half-replaced set.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::expression::CompiledExpression;
use crate::core::normalize::normalize_name;
use crate::error::{CalcError, CalcResult};

//==============================================================================
// Records (as produced by the extraction collaborator)
//==============================================================================

/// A formula as it arrives from the extraction collaborator or a file.
///
/// Accepts both the canonical field names and the ones the document
/// extraction front-end emits (`term_description`,
/// `mathematical_relationship`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FormulaRecord {
    #[serde(alias = "term_description")]
    pub name: String,

    #[serde(alias = "mathematical_relationship", alias = "formula")]
    pub expression: String,

    /// Variant name → override expression
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variants: BTreeMap<String, String>,

    #[serde(default, alias = "id", skip_serializing_if = "Option::is_none")]
    pub acronym: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_context: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula_explanation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    /// Evidence text (reasoning steps or the source sentence)
    #[serde(default, alias = "reasoning_steps", skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables_explained: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_method: Option<String>,
}

/// Formula files hold either a bare list or `formulas: [...]`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FormulaFile {
    List(Vec<FormulaRecord>),
    Wrapped { formulas: Vec<FormulaRecord> },
}

impl FormulaFile {
    pub fn into_records(self) -> Vec<FormulaRecord> {
        match self {
            FormulaFile::List(records) => records,
            FormulaFile::Wrapped { formulas } => formulas,
        }
    }
}

/// Load formula records from a YAML or JSON file (by extension)
pub fn load_records(path: &Path) -> CalcResult<Vec<FormulaRecord>> {
    let content = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let file: FormulaFile = if is_json {
        serde_json::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };
    Ok(file.into_records())
}

/// Write formula records as YAML or JSON (by extension)
pub fn save_records(path: &Path, records: &[FormulaRecord]) -> CalcResult<()> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let content = if is_json {
        serde_json::to_string_pretty(records)?
    } else {
        serde_yaml::to_string(records)?
    };
    std::fs::write(path, content)?;
    Ok(())
}

//==============================================================================
// Validated formulas
//==============================================================================

/// Free-text metadata carried along with a formula
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct FormulaMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acronym: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub variables_explained: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_method: Option<String>,
}

/// A validated formula, expressions compiled
#[derive(Debug, Clone)]
pub struct Formula {
    name: String,
    key: String,
    expression: CompiledExpression,
    variants: BTreeMap<String, CompiledExpression>,
    pub metadata: FormulaMetadata,
}

impl Formula {
    /// Validate a record. `position` is 1-based, for messages.
    pub fn from_record(record: FormulaRecord, position: usize) -> CalcResult<Self> {
        let name = record.name.trim().to_string();
        let key = normalize_name(&name);
        if key.is_empty() {
            return Err(CalcError::Validation(format!(
                "Formula #{} has an empty name",
                position
            )));
        }

        if let Some(confidence) = record.confidence {
            if !(0.0..=1.0).contains(&confidence) {
                return Err(CalcError::Validation(format!(
                    "Formula '{}' has confidence {} outside 0..=1",
                    name, confidence
                )));
            }
        }

        let mut variants = BTreeMap::new();
        for (variant, expression) in record.variants {
            let variant = variant.trim();
            if variant.is_empty() {
                return Err(CalcError::Validation(format!(
                    "Formula '{}' has a variant override with an empty variant name",
                    name
                )));
            }
            variants.insert(variant.to_string(), CompiledExpression::compile(&expression));
        }

        Ok(Self {
            key,
            expression: CompiledExpression::compile(&record.expression),
            variants,
            metadata: FormulaMetadata {
                acronym: record.acronym,
                business_context: record.business_context,
                explanation: record.formula_explanation,
                confidence: record.confidence,
                evidence: record.evidence,
                variables_explained: record.variables_explained,
                source_method: record.source_method,
            },
            name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized name: the column it writes and the symbol later formulas read
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn expression(&self) -> &CompiledExpression {
        &self.expression
    }

    pub fn variants(&self) -> &BTreeMap<String, CompiledExpression> {
        &self.variants
    }

    /// The variant override when one exists, otherwise the default expression
    pub fn expression_for(&self, variant: Option<&str>) -> &CompiledExpression {
        variant
            .and_then(|v| self.variants.get(v))
            .unwrap_or(&self.expression)
    }

    /// Back to the serializable record form
    pub fn to_record(&self) -> FormulaRecord {
        FormulaRecord {
            name: self.name.clone(),
            expression: self.expression.source().to_string(),
            variants: self
                .variants
                .iter()
                .map(|(k, v)| (k.clone(), v.source().to_string()))
                .collect(),
            acronym: self.metadata.acronym.clone(),
            business_context: self.metadata.business_context.clone(),
            formula_explanation: self.metadata.explanation.clone(),
            confidence: self.metadata.confidence,
            evidence: self.metadata.evidence.clone(),
            variables_explained: self.metadata.variables_explained.clone(),
            source_method: self.metadata.source_method.clone(),
        }
    }
}

//==============================================================================
// Snapshots and the registry
//==============================================================================

/// One immutable, versioned formula set
#[derive(Debug, Clone)]
pub struct FormulaSet {
    pub version: u64,
    pub loaded_at: DateTime<Utc>,
    formulas: Vec<Formula>,
}

impl FormulaSet {
    /// Validate records in order; one invalid record rejects the whole set
    pub fn from_records(records: Vec<FormulaRecord>, version: u64) -> CalcResult<Self> {
        let formulas = records
            .into_iter()
            .enumerate()
            .map(|(i, record)| Formula::from_record(record, i + 1))
            .collect::<CalcResult<Vec<_>>>()?;

        Ok(Self {
            version,
            loaded_at: Utc::now(),
            formulas,
        })
    }

    pub fn empty() -> Self {
        Self {
            version: 0,
            loaded_at: Utc::now(),
            formulas: Vec::new(),
        }
    }

    /// Formulas in registration order
    pub fn formulas(&self) -> &[Formula] {
        &self.formulas
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Formula> {
        let key = normalize_name(name);
        self.formulas.iter().find(|f| f.key == key)
    }

    pub fn records(&self) -> Vec<FormulaRecord> {
        self.formulas.iter().map(Formula::to_record).collect()
    }
}

/// Process-lifetime formula store with wholesale replacement
#[derive(Debug)]
pub struct FormulaRegistry {
    current: RwLock<Arc<FormulaSet>>,
    next_version: AtomicU64,
}

impl Default for FormulaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FormulaRegistry {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(FormulaSet::empty())),
            next_version: AtomicU64::new(1),
        }
    }

    /// Registry pre-loaded with a record list
    pub fn with_records(records: Vec<FormulaRecord>) -> CalcResult<Self> {
        let registry = Self::new();
        registry.replace(records)?;
        Ok(registry)
    }

    /// The current set. Cheap; hold it for the duration of a run.
    pub fn snapshot(&self) -> Arc<FormulaSet> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Replace the whole set. Nothing changes if any record is invalid.
    ///
    /// The version is assigned under the write lock, so the current set's
    /// version never goes backwards when replacements race.
    pub fn replace(&self, records: Vec<FormulaRecord>) -> CalcResult<Arc<FormulaSet>> {
        let mut set = FormulaSet::from_records(records, 0)?;

        let set = {
            let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
            set.version = self.next_version.fetch_add(1, Ordering::SeqCst);
            let set = Arc::new(set);
            *guard = Arc::clone(&set);
            set
        };

        let version = set.version;
        info!(version, formulas = set.len(), "Formula registry replaced");
        for (i, formula) in set.formulas().iter().enumerate() {
            info!(
                position = i + 1,
                name = formula.name(),
                expression = formula.expression().source(),
                "Stored formula"
            );
        }

        Ok(set)
    }

    /// Load records from a YAML/JSON file and replace the set
    pub fn load_file(&self, path: &Path) -> CalcResult<Arc<FormulaSet>> {
        let records = load_records(path)?;
        self.replace(records)
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, expression: &str) -> FormulaRecord {
        FormulaRecord {
            name: name.to_string(),
            expression: expression.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_record_accepts_extraction_field_names() {
        let json = r#"{
            "term_description": "Total Premium",
            "mathematical_relationship": "premium * 10",
            "variants": {"Variant 2": "premium * 12"},
            "confidence": 0.9,
            "reasoning_steps": ["Found in section 4"]
        }"#;
        let rec: FormulaRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.name, "Total Premium");
        assert_eq!(rec.expression, "premium * 10");
        assert_eq!(rec.variants.get("Variant 2").unwrap(), "premium * 12");
        assert_eq!(rec.evidence, vec!["Found in section 4"]);
    }

    #[test]
    fn test_record_requires_expression_field() {
        let json = r#"{"name": "x"}"#;
        assert!(serde_json::from_str::<FormulaRecord>(json).is_err());
    }

    #[test]
    fn test_formula_file_forms() {
        let list: FormulaFile = serde_yaml::from_str("- name: a\n  expression: '1'\n").unwrap();
        assert_eq!(list.into_records().len(), 1);

        let wrapped: FormulaFile =
            serde_yaml::from_str("formulas:\n  - name: a\n    expression: '1'\n").unwrap();
        assert_eq!(wrapped.into_records().len(), 1);
    }

    #[test]
    fn test_formula_key_and_variant_selection() {
        let mut rec = record("Total Premium", "premium * 10");
        rec.variants
            .insert(" Variant 2 ".to_string(), "premium * 12".to_string());
        let formula = Formula::from_record(rec, 1).unwrap();

        assert_eq!(formula.key(), "total_premium");
        assert_eq!(formula.expression_for(Some("Variant 2")).source(), "premium * 12");
        assert_eq!(formula.expression_for(Some("Variant 1")).source(), "premium * 10");
        assert_eq!(formula.expression_for(None).source(), "premium * 10");
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = Formula::from_record(record("  ", "1"), 3).unwrap_err();
        assert!(err.to_string().contains("#3"));
    }

    #[test]
    fn test_bad_confidence_rejected() {
        let mut rec = record("a", "1");
        rec.confidence = Some(1.5);
        assert!(Formula::from_record(rec, 1).is_err());
    }

    #[test]
    fn test_empty_expression_is_allowed() {
        let formula = Formula::from_record(record("placeholder", ""), 1).unwrap();
        assert!(formula.expression().is_empty());
    }

    #[test]
    fn test_replace_is_wholesale_and_versioned() {
        let registry = FormulaRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.snapshot().version, 0);

        registry
            .replace(vec![record("a", "1"), record("b", "2")])
            .unwrap();
        let first = registry.snapshot();
        assert_eq!(first.len(), 2);

        registry.replace(vec![record("c", "3")]).unwrap();
        let second = registry.snapshot();
        assert_eq!(second.len(), 1);
        assert!(second.version > first.version);
        assert!(second.get("a").is_none());

        // an old snapshot is unaffected by the swap
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_invalid_replace_keeps_previous_set() {
        let registry = FormulaRegistry::with_records(vec![record("a", "1")]).unwrap();
        let result = registry.replace(vec![record("b", "2"), record("", "3")]);
        assert!(result.is_err());

        let current = registry.snapshot();
        assert_eq!(current.len(), 1);
        assert!(current.get("a").is_some());
    }

    #[test]
    fn test_records_round_trip() {
        let registry = FormulaRegistry::with_records(vec![record("Total Premium", "premium * 10")])
            .unwrap();
        let records = registry.snapshot().records();
        assert_eq!(records, vec![record("Total Premium", "premium * 10")]);
    }

    #[test]
    fn test_deeply_nested_expression_is_stored_as_invalid() {
        let deep = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        let registry = FormulaRegistry::new();
        let set = registry.replace(vec![record("deep", &deep)]).unwrap();
        assert!(set.formulas()[0].expression().error().is_some());
    }

    #[test]
    fn test_concurrent_replace_versions_never_go_backwards() {
        let registry = Arc::new(FormulaRegistry::new());
        let watcher_registry = Arc::clone(&registry);
        let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let watcher_stop = Arc::clone(&stop);

        let watcher = std::thread::spawn(move || {
            let mut last = 0;
            while !watcher_stop.load(Ordering::SeqCst) {
                let version = watcher_registry.snapshot().version;
                assert!(version >= last, "version went from {last} to {version}");
                last = version;
            }
        });

        let writers: Vec<_> = (0..8)
            .map(|t| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let records: Vec<FormulaRecord> = (0..(t + i) % 5 + 1)
                            .map(|n| record(&format!("f{n}"), "premium * 2"))
                            .collect();
                        registry.replace(records).unwrap();
                    }
                })
            })
            .collect();

        for writer in writers {
            writer.join().unwrap();
        }
        stop.store(true, Ordering::SeqCst);
        watcher.join().unwrap();

        assert_eq!(registry.snapshot().version, 400);
    }
}
