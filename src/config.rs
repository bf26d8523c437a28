//! Processing configuration
//!
//! Loaded from an optional YAML file; every field has a default so a partial
//! file (or none at all) is valid.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::variant::{default_variant_map, VariantResolver};
use crate::error::{CalcError, CalcResult};

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "POLICYCALC_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Xlsx,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Xlsx => "xlsx",
            OutputFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "xlsx" => Ok(OutputFormat::Xlsx),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(CalcError::Config(format!(
                "Unknown output format '{}' (expected xlsx or csv)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Directory output artifacts are written to
    pub output_dir: PathBuf,
    pub output_format: OutputFormat,
    /// Cap on errors and warnings listed in a summary
    pub max_reported_errors: usize,
    /// Decimal places for written values
    pub round_decimals: u32,
    /// Column holding the cover code
    pub discriminator_column: String,
    /// Cover code → variant name
    pub variants: BTreeMap<String, String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("processed_files"),
            output_format: OutputFormat::Xlsx,
            max_reported_errors: 10,
            round_decimals: 2,
            discriminator_column: "COVER_CODE".to_string(),
            variants: default_variant_map(),
        }
    }
}

impl ProcessingConfig {
    /// Load a YAML config file
    pub fn from_file(path: &Path) -> CalcResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CalcError::Config(format!("Cannot read config {}: {}", path.display(), e))
        })?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Config file if given, defaults otherwise
    pub fn load(path: Option<&Path>) -> CalcResult<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> CalcResult<()> {
        if self.discriminator_column.trim().is_empty() {
            return Err(CalcError::Config(
                "discriminator_column must not be empty".to_string(),
            ));
        }
        if self.round_decimals > 15 {
            return Err(CalcError::Config(format!(
                "round_decimals must be at most 15, got {}",
                self.round_decimals
            )));
        }
        Ok(())
    }

    pub fn variant_resolver(&self) -> VariantResolver {
        VariantResolver::new(self.variants.clone())
    }
}
