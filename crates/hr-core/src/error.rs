use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("CliError: {0}")]
    Cli(#[from] CliError),
    #[error("ApiError: {0}")]
    Api(#[from] ApiError),
    #[error("ConfigError: {0}")]
    Config(#[from] ConfigError),
    #[error("AuthError: {0}")]
    Auth(#[from] AuthError),
    #[error("StorageError: {0}")]
    Storage(#[from] StorageError),
    #[error("ServiceError: {0}")]
    Service(#[from] ServiceError),
    #[error("UtilsError: {0}")]
    Utils(#[from] UtilsError),
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Authentication required")]
    AuthRequired { message: String, hint: String },
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

/// Errors produced at the backend client boundary.
///
/// Every transport, HTTP and realtime failure is converted into one of these
/// variants in `utils::error_helpers`; nothing above the client inspects raw
/// reqwest or websocket errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// PostgREST-style error body (`{code, message, details, hint}`).
    #[error("{message}")]
    Backend {
        status: u16,
        endpoint: String,
        code: Option<String>,
        message: String,
        details: Option<String>,
        hint: Option<String>,
    },
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64, endpoint: String },
    #[error("HTTP error: {status} {message}")]
    Http {
        status: u16,
        endpoint: String,
        message: String,
    },
    #[error("Authentication failed")]
    Unauthorized {
        status: u16,
        endpoint: String,
        server_message: String,
    },
    #[error("Network error: {message}")]
    Transport { endpoint: String, message: String },
    #[error("Failed to decode response: {message}")]
    Decode { endpoint: String, message: String },
    #[error("Realtime error on {topic}: {message}")]
    Realtime { topic: String, message: String },
}

impl ApiError {
    /// Backend error code, when the server supplied one.
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Backend { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Human readable message without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            ApiError::Backend { message, .. } => message.clone(),
            ApiError::Http { message, .. } => message.clone(),
            ApiError::Unauthorized { server_message, .. } => server_message.clone(),
            _ => self.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Backend { status, .. }
            | ApiError::Http { status, .. }
            | ApiError::Unauthorized { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("{message}")]
    AccessDenied { message: String },
    #[error("Not signed in")]
    NotSignedIn,
    #[error("Session expired or invalid")]
    SessionInvalid,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("File I/O error at {path}: {source}")]
    FileIo {
        path: String,
        source: std::io::Error,
    },
    #[error("Configuration parse error: {message}")]
    ConfigParseError { message: String },
    #[error("Configuration directory not found")]
    ConfigDirNotFound,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration field '{field}' is missing")]
    MissingField { field: String, hint: String },
    #[error("Invalid configuration value for '{field}': {value}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{resource_type} {id} not found")]
    NotFound { resource_type: String, id: String },
    #[error("Upload failed: {message}")]
    Upload { message: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UtilsError {
    #[error("Validation error: {message}")]
    Validation { message: String },
    #[error("Input processing error: {message}")]
    InputProcessing { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl ErrorSeverity {
    pub fn emoji(&self) -> &'static str {
        match self {
            ErrorSeverity::Critical => "🚨",
            ErrorSeverity::High => "❌",
            ErrorSeverity::Medium => "⚠️",
            ErrorSeverity::Low => "ℹ️",
        }
    }
}

impl AppError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AppError::Cli(_) => ErrorSeverity::Medium,
            AppError::Api(api_error) => match api_error {
                ApiError::Unauthorized { .. } => ErrorSeverity::High,
                ApiError::Timeout { .. } | ApiError::Transport { .. } => ErrorSeverity::Medium,
                ApiError::Http { status, .. } | ApiError::Backend { status, .. }
                    if *status >= 500 =>
                {
                    ErrorSeverity::High
                }
                _ => ErrorSeverity::Medium,
            },
            AppError::Config(_) => ErrorSeverity::High,
            AppError::Auth(_) => ErrorSeverity::High,
            AppError::Storage(_) => ErrorSeverity::Medium,
            AppError::Service(_) => ErrorSeverity::Medium,
            AppError::Utils(_) => ErrorSeverity::Low,
        }
    }

    /// The message a user should see, without the layer prefix.
    pub fn display_friendly(&self) -> String {
        match self {
            AppError::Api(api_error) => api_error.message(),
            AppError::Auth(auth_error) => auth_error.to_string(),
            AppError::Service(service_error) => service_error.to_string(),
            AppError::Utils(UtilsError::Validation { message }) => message.clone(),
            _ => format!("{}", self),
        }
    }

    pub fn troubleshooting_hint(&self) -> Option<String> {
        match self {
            AppError::Auth(AuthError::NotSignedIn | AuthError::SessionInvalid) => {
                Some("Set HR_ACCESS_TOKEN or pass --token with a valid access token".to_string())
            }
            AppError::Config(ConfigError::MissingField { hint, .. }) => Some(hint.clone()),
            AppError::Api(ApiError::Timeout { .. } | ApiError::Transport { .. }) => {
                Some("Check your network connection and the backend URL".to_string())
            }
            AppError::Api(api_error) if api_error.code() == Some("42501") => {
                Some("Ask an administrator to grant the required role".to_string())
            }
            _ => None,
        }
    }
}
