//! Controlled vocabulary of canonical variable names
//!
//! Each variable has a canonical name, a human description and a few phrases
//! documents use for it ("Sum Assured", "SA", ...). Phrases let free-text
//! formulas be rewritten over canonical names.

use crate::core::normalize::normalize_name;

/// A named variable in the controlled vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variable {
    pub name: &'static str,
    pub description: &'static str,
    pub aliases: &'static [&'static str],
    pub category: Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Insurance,
    Financial,
}

impl Variable {
    /// The normalized key used to match columns
    pub fn key(&self) -> String {
        normalize_name(self.name)
    }
}

const fn var(
    name: &'static str,
    description: &'static str,
    aliases: &'static [&'static str],
    category: Category,
) -> Variable {
    Variable {
        name,
        description,
        aliases,
        category,
    }
}

use Category::{Financial, Insurance};

pub static VARIABLES: &[Variable] = &[
    var("PREMIUM", "Insurance premium amount (annual/monthly/quarterly)", &["annual premium", "premium amount"], Insurance),
    var("DEDUCTIBLE", "Insurance deductible amount", &["deductible amount"], Insurance),
    var("COVERAGE", "Coverage amount or limit", &["coverage amount", "coverage limit"], Insurance),
    var("POLICY_TERM", "Total duration of the policy", &["policy term", "term"], Insurance),
    var("SUM_ASSURED", "Sum assured amount", &["sum assured", "sum insured"], Insurance),
    var("SA", "Sum Assured - guaranteed amount on maturity/death", &[], Insurance),
    var("ENTRY_AGE", "Age of the policyholder at policy inception", &["entry age", "age at entry"], Insurance),
    var("MATURITY_AGE", "Age at policy maturity", &["maturity age", "age at maturity"], Insurance),
    var("SURRENDER_VALUE", "Policy surrender value", &["surrender value"], Insurance),
    var("CASH_VALUE", "Policy cash value", &["cash value"], Insurance),
    var("DEATH_BENEFIT", "Death benefit amount", &["death benefit"], Insurance),
    var("MATURITY_BENEFIT", "Maturity benefit amount", &["maturity benefit"], Insurance),
    var("BONUS", "Bonus amount", &["bonus amount"], Insurance),
    var("LOADING", "Loading percentage", &["loading percentage"], Insurance),
    var("DISCOUNT", "Discount percentage", &["discount percentage"], Insurance),
    var("COMMISSION", "Commission amount or rate", &["commission rate", "agent commission"], Insurance),
    var("INTEREST_RATE", "Interest rate percentage", &["interest rate"], Insurance),
    var("INFLATION_RATE", "Inflation rate percentage", &["inflation rate"], Insurance),
    var("MORTALITY_RATE", "Mortality rate", &["mortality rate"], Insurance),
    var("LAPSE_RATE", "Policy lapse rate", &["lapse rate"], Insurance),
    var("PRINCIPAL", "Principal amount", &["principal amount"], Financial),
    var("INTEREST", "Interest rate or amount", &[], Financial),
    var("TIME", "Time period", &["time period"], Financial),
    var("RATE", "Rate or percentage", &[], Financial),
    var("AMOUNT", "Total amount", &["total amount"], Financial),
    var("FV", "Future value", &["future value"], Financial),
    var("PV", "Present value", &["present value"], Financial),
    var("PMT", "Payment amount", &["payment amount", "payment"], Financial),
    var("NPV", "Net present value", &["net present value"], Financial),
    var("IRR", "Internal rate of return", &["internal rate of return"], Financial),
    var("ROI", "Return on investment", &["return on investment"], Financial),
    var("TAX_RATE", "Tax rate percentage", &["tax rate"], Financial),
    var("DISCOUNT_RATE", "Discount rate", &["discount rate"], Financial),
    var("COMPOUND_FREQUENCY", "Compounding frequency", &["compounding frequency", "compound frequency"], Financial),
    var("YIELD", "Yield percentage", &["yield percentage"], Financial),
];

/// Variables a policy table is expected to provide
pub const DEFAULT_INPUT_VARIABLES: [&str; 4] = ["ENTRY_AGE", "PREMIUM", "POLICY_TERM", "SA"];

/// Variables formulas are usually asked to produce
pub const DEFAULT_OUTPUT_VARIABLES: [&str; 3] = ["SURRENDER_VALUE", "MATURITY_BENEFIT", "DEATH_BENEFIT"];

/// Look up a variable by any spelling of its name or one of its phrases
pub fn lookup(name: &str) -> Option<&'static Variable> {
    let key = normalize_name(name);
    if key.is_empty() {
        return None;
    }
    VARIABLES
        .iter()
        .find(|v| v.key() == key)
        .or_else(|| {
            VARIABLES
                .iter()
                .find(|v| v.aliases.iter().any(|a| normalize_name(a) == key))
        })
}

/// Description of a known variable
pub fn describe(name: &str) -> Option<&'static str> {
    lookup(name).map(|v| v.description)
}

/// `input` or `output` for the variables policy tables usually carry or need
pub fn role(name: &str) -> Option<&'static str> {
    let key = lookup(name)?.name;
    if DEFAULT_INPUT_VARIABLES.contains(&key) {
        Some("input")
    } else if DEFAULT_OUTPUT_VARIABLES.contains(&key) {
        Some("output")
    } else {
        None
    }
}

/// Canonical key for a phrase, if the phrase names a vocabulary variable
pub fn canonical_key(phrase: &str) -> Option<String> {
    lookup(phrase).map(Variable::key)
}

pub fn by_category(category: Category) -> impl Iterator<Item = &'static Variable> {
    VARIABLES.iter().filter(move |v| v.category == category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name_any_case() {
        assert_eq!(lookup("premium").map(|v| v.name), Some("PREMIUM"));
        assert_eq!(lookup("Sum_Assured").map(|v| v.name), Some("SUM_ASSURED"));
        assert_eq!(lookup("surrender value").map(|v| v.name), Some("SURRENDER_VALUE"));
    }

    #[test]
    fn test_lookup_by_alias() {
        assert_eq!(canonical_key("Coverage Amount"), Some("coverage".to_string()));
        assert_eq!(canonical_key("Sum Insured"), Some("sum_assured".to_string()));
        assert_eq!(canonical_key("Net Present Value"), Some("npv".to_string()));
    }

    #[test]
    fn test_unknown() {
        assert!(lookup("flux_capacitor").is_none());
        assert!(lookup("").is_none());
        assert!(describe("nothing").is_none());
    }

    #[test]
    fn test_names_are_unique_keys() {
        let mut keys: Vec<String> = VARIABLES.iter().map(Variable::key).collect();
        let total = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), total);
    }

    #[test]
    fn test_defaults_are_known() {
        for name in DEFAULT_INPUT_VARIABLES.iter().chain(DEFAULT_OUTPUT_VARIABLES.iter()) {
            assert!(lookup(name).is_some(), "{name} missing from vocabulary");
        }
    }

    #[test]
    fn test_roles() {
        assert_eq!(role("Sum Assured"), Some("input"));
        assert_eq!(role("surrender_value"), Some("output"));
        assert_eq!(role("discount rate"), None);
        assert_eq!(role("nothing"), None);
    }

    #[test]
    fn test_categories() {
        assert_eq!(by_category(Category::Insurance).count(), 20);
        assert_eq!(by_category(Category::Financial).count(), 15);
    }
}
