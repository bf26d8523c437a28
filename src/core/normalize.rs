//! Column and variable name normalization
//!
//! Every comparison between a formula's variable names and a table's column
//! headers goes through [`normalize_name`]. Two raw strings with the same
//! normalized key are the same variable everywhere.

/// Fold a raw header or variable reference into its canonical key.
///
/// Trims, lower-cases, turns spaces into underscores, spells `%` as
/// `percent` and drops `*`.
pub fn normalize_name(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace(' ', "_")
        .replace('%', "percent")
        .replace('*', "")
}

/// Compare two raw names by their canonical keys
pub fn same_name(a: &str, b: &str) -> bool {
    normalize_name(a) == normalize_name(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize_name("Total Premium"), "total_premium");
        assert_eq!(normalize_name("  COVER_CODE "), "cover_code");
        assert_eq!(normalize_name("Loading %"), "loading_percent");
        assert_eq!(normalize_name("premium*"), "premium");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "Total Premium",
            " Sum Assured % ",
            "a*b*c",
            "ENTRY_AGE",
            "",
            "   ",
            "Rate %%",
            "\tTab Start",
            "ÜBER Prämie",
        ];
        for raw in samples {
            let once = normalize_name(raw);
            assert_eq!(normalize_name(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_same_name_folds_case_and_spaces() {
        assert!(same_name("Total Premium", "total_premium"));
        assert!(same_name("SURRENDER VALUE", "surrender_value"));
        assert!(!same_name("premium", "premiums"));
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize_name(""), "");
        assert_eq!(normalize_name("   "), "");
    }
}
