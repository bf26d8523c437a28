//! Discriminator code → product variant
//!
//! Each policy row carries a cover code that selects which variant override
//! of a formula applies. The lookup is exact after trimming; a code the table
//! does not know leaves the row unresolved.

use std::collections::BTreeMap;

/// Default cover code table. Codes are kept exactly as the product
/// catalogue spells them (note the `LI90` prefix on the variant 2 codes).
pub const DEFAULT_VARIANTS: [(&str, &str); 8] = [
    ("L190A01", "Variant 1"),
    ("LI90B01", "Variant 2"),
    ("LI90B02", "Variant 2"),
    ("L190C01", "Variant 3"),
    ("L190D01", "Variant 4"),
    ("L190E01", "Variant 5"),
    ("L190E02", "Variant 5"),
    ("L190F01", "Variant 6"),
];

/// Default variant table as an owned map (used by config defaults)
pub fn default_variant_map() -> BTreeMap<String, String> {
    DEFAULT_VARIANTS
        .iter()
        .map(|(code, variant)| (code.to_string(), variant.to_string()))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantResolver {
    table: BTreeMap<String, String>,
}

impl Default for VariantResolver {
    fn default() -> Self {
        Self::new(default_variant_map())
    }
}

impl VariantResolver {
    /// Build from a code → variant map. Codes and names are trimmed.
    pub fn new(table: BTreeMap<String, String>) -> Self {
        let table = table
            .into_iter()
            .map(|(code, variant)| (code.trim().to_string(), variant.trim().to_string()))
            .filter(|(code, _)| !code.is_empty())
            .collect();
        Self { table }
    }

    /// Variant for a code, `None` for blank or unknown codes
    pub fn resolve(&self, code: &str) -> Option<&str> {
        let code = code.trim();
        if code.is_empty() {
            return None;
        }
        self.table.get(code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
