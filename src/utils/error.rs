use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Rule table error: {message}")]
    RuleSetError { message: String },

    #[error("Malformed record field '{field}': {reason}")]
    MalformedRecord { field: String, reason: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

/// 錯誤分類，用於日誌與退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Data,
    Configuration,
    Rules,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ZipError(_) | EtlError::IoError(_) => ErrorCategory::Io,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::MalformedRecord { .. }
            | EtlError::ProcessingError { .. } => ErrorCategory::Data,
            EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::RuleSetError { .. } => ErrorCategory::Rules,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 單筆記錄的問題只會降級該筆記錄
            EtlError::MalformedRecord { .. } => ErrorSeverity::Low,
            EtlError::CsvError(_) | EtlError::SerializationError(_) => ErrorSeverity::Medium,
            EtlError::ProcessingError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::RuleSetError { .. } => ErrorSeverity::High,
            EtlError::ZipError(_) | EtlError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::IoError(_) => {
                "Check that the input file exists and the output directory is writable".to_string()
            }
            EtlError::ZipError(_) => "Disable compression or free disk space and retry".to_string(),
            EtlError::CsvError(_) => "Check record fields for unsupported characters".to_string(),
            EtlError::SerializationError(_) => {
                "Make sure the input file is valid JSON (an array of institution objects)"
                    .to_string()
            }
            EtlError::ConfigValidationError { field, .. }
            | EtlError::InvalidConfigValueError { field, .. }
            | EtlError::MissingConfigError { field } => {
                format!("Fix the '{}' setting in your configuration", field)
            }
            EtlError::RuleSetError { .. } => {
                "Check the rule table file; every group needs a known category and every pattern at least one trigger".to_string()
            }
            EtlError::MalformedRecord { field, .. } => {
                format!("Correct the '{}' field of the affected record", field)
            }
            EtlError::ProcessingError { .. } => "Re-run with --verbose for details".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Io => format!("File access failed: {}", self),
            ErrorCategory::Data => format!("Data could not be processed: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Rules => format!("Rule table problem: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
