use scriptview_types::ScriptError;
use thiserror::Error;

use super::error_context::{ErrorCode, ErrorContext, ErrorSeverity};

/// View-level errors
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Resource {0} not found")]
    ResourceNotFound(String),
    #[error("Could not load script {script}: {message}")]
    ScriptLoad { script: String, message: String },
    #[error("Script error: {0}")]
    Script(#[from] ScriptError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to render template {url}: {source}")]
    Rendering {
        url: String,
        #[source]
        source: Box<ViewError>,
    },
}

impl ViewError {
    pub fn config(message: impl Into<String>) -> Self {
        ViewError::Configuration(message.into())
    }

    pub(crate) fn rendering(url: &str, source: ViewError) -> Self {
        ViewError::Rendering {
            url: url.to_string(),
            source: Box::new(source),
        }
    }

    /// Innermost error, looking through rendering wrappers.
    pub fn root_cause(&self) -> &ViewError {
        let mut current = self;
        while let ViewError::Rendering { source, .. } = current {
            current = source;
        }
        current
    }

    pub fn is_resource_not_found(&self) -> bool {
        matches!(self.root_cause(), ViewError::ResourceNotFound(_))
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            ViewError::Configuration(_) => ErrorCode::ConfigError,
            ViewError::ResourceNotFound(_) => ErrorCode::ResourceNotFound,
            ViewError::ScriptLoad { .. } => ErrorCode::ScriptLoadError,
            ViewError::Script(ScriptError::FunctionNotFound(_)) => ErrorCode::FunctionNotFound,
            ViewError::Script(_) => ErrorCode::ScriptError,
            ViewError::Io(_) => ErrorCode::IoError,
            ViewError::Rendering { .. } => ErrorCode::RenderError,
        }
    }

    /// Configuration and engine initialisation failures keep a view from
    /// becoming ready; everything else only fails the current request.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ViewError::Configuration(_) | ViewError::ScriptLoad { .. } => ErrorSeverity::Fatal,
            _ => ErrorSeverity::Error,
        }
    }

    pub fn error_context(&self) -> ErrorContext {
        ErrorContext {
            code: self.error_code(),
            severity: self.severity(),
            message: self.to_string(),
            cause: match self {
                ViewError::Rendering { source, .. } => Some(source.root_cause().error_code()),
                _ => None,
            },
        }
    }
}
