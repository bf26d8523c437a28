//! Processing summary returned to callers (CLI, HTTP)

use serde::{Deserialize, Serialize};

use crate::core::processor::RunStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingSummary {
    pub status: RunStatus,
    pub message: String,
    pub total_rows: usize,
    pub processed_rows: usize,
    pub successful_calculations: usize,
    /// First `max_reported_errors` errors
    pub errors: Vec<String>,
    pub total_errors: usize,
    pub warnings: Vec<String>,
    pub total_warnings: usize,
    pub formulas_used: usize,
    pub registry_version: u64,
    pub new_columns_created: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
}

impl ProcessingSummary {
    /// Assemble the summary of a run, capping the listed messages
    pub fn from_stats(
        stats: RunStats,
        formulas_used: usize,
        registry_version: u64,
        max_reported_errors: usize,
    ) -> Self {
        let total_errors = stats.errors.len();
        let total_warnings = stats.warnings.len();
        let status = if total_errors == 0 {
            RunStatus::Success
        } else {
            RunStatus::Warning
        };

        Self {
            status,
            message: format!(
                "Processed {} policies with {} successful calculations.",
                stats.processed_rows, stats.successful_calculations
            ),
            total_rows: stats.total_rows,
            processed_rows: stats.processed_rows,
            successful_calculations: stats.successful_calculations,
            errors: stats.errors.into_iter().take(max_reported_errors).collect(),
            total_errors,
            warnings: stats.warnings.into_iter().take(max_reported_errors).collect(),
            total_warnings,
            formulas_used,
            registry_version,
            new_columns_created: stats.new_columns,
            output_filename: None,
            output_path: None,
        }
    }

    pub fn with_output(mut self, filename: String, path: String) -> Self {
        self.output_filename = Some(filename);
        self.output_path = Some(path);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    /// Number of errors not listed in `errors`
    pub fn hidden_errors(&self) -> usize {
        self.total_errors.saturating_sub(self.errors.len())
    }
}
