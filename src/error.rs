use thiserror::Error;

pub type CalcResult<T> = Result<T, CalcError>;

#[derive(Error, Debug)]
pub enum CalcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("No content to process: {0}")]
    EmptyDocument(String),

    #[error("Error reading file: {0}")]
    Import(String),

    #[error("Error saving file: {0}")]
    Export(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Formula evaluation error: {0}")]
    Eval(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CalcError {
    /// True for failures caused by the caller's input rather than the system
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CalcError::UnsupportedFile(_)
                | CalcError::EmptyDocument(_)
                | CalcError::Import(_)
                | CalcError::Csv(_)
                | CalcError::Validation(_)
                | CalcError::Yaml(_)
                | CalcError::Json(_)
        )
    }
}
