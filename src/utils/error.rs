use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned status {status} for {endpoint}")]
    ApiStatusError { endpoint: String, status: u16 },

    #[error("Failed to decode API response: {source}")]
    DecodeError {
        #[source]
        source: serde_json::Error,
        body: String,
    },

    #[error("Endpoint {endpoint} not available after {waited_secs}s ({attempts} attempts)")]
    SensorTimeoutError {
        endpoint: String,
        waited_secs: u64,
        attempts: u32,
    },

    #[error("Missing required field: {field}")]
    MissingFieldError { field: String },

    #[error("Payload contained no user records")]
    EmptyPayloadError,

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Database error: {message}")]
    DatabaseError { message: String },

    #[error("Load error: {message}")]
    LoadError { message: String },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

/// 錯誤所屬的 ETL 階段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Fetch,
    Data,
    Load,
    Configuration,
    System,
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
            EtlError::ApiError(_)
            | EtlError::ApiStatusError { .. }
            | EtlError::DecodeError { .. }
            | EtlError::SensorTimeoutError { .. } => ErrorCategory::Fetch,
            EtlError::MissingFieldError { .. }
            | EtlError::EmptyPayloadError
            | EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. }
            | EtlError::ValidationError { .. } => ErrorCategory::Data,
            EtlError::DatabaseError { .. } | EtlError::LoadError { .. } => ErrorCategory::Load,
            EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::IoError(_) => ErrorCategory::System,
        }
    }

    /// 上游暫時性問題為 Medium（整個 run 重跑即可），資料與設定問題為 High
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EtlError::ApiError(_)
            | EtlError::ApiStatusError { .. }
            | EtlError::SensorTimeoutError { .. } => ErrorSeverity::Medium,
            EtlError::DatabaseError { .. } => ErrorSeverity::Medium,
            EtlError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::ApiError(_) | EtlError::ApiStatusError { .. } => {
                "Check that the user API is reachable and retry the run"
            }
            EtlError::SensorTimeoutError { .. } => {
                "The API did not become available in time; raise probe.timeout_seconds or retry later"
            }
            EtlError::DecodeError { .. } => {
                "The API answered with a non-JSON body; verify source.endpoint points at the JSON API"
            }
            EtlError::MissingFieldError { .. } | EtlError::EmptyPayloadError => {
                "The upstream record is incomplete; inspect the API response before re-running"
            }
            EtlError::DatabaseError { .. } => {
                "Check load.database_url and that the target table schema matches the six user columns"
            }
            EtlError::LoadError { .. } => "Inspect the staging file and the target table",
            EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => {
                "Fix the configuration file or command line flags and run again"
            }
            EtlError::IoError(_) => "Check permissions and free space for the staging directory",
            _ => "Re-run with --verbose to see the full processing log",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Fetch => format!("Could not fetch user data: {}", self),
            ErrorCategory::Data => format!("User record could not be processed: {}", self),
            ErrorCategory::Load => format!("Loading into the database failed: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
