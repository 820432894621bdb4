//! Error types for script template views.
//!
//! - [`ViewError`] — Errors raised while configuring or rendering a view.
//! - [`ErrorContext`] — Structured error metadata (code, severity).

pub mod error_context;
pub mod view_error;

pub use error_context::{ErrorCode, ErrorContext, ErrorSeverity};
pub use view_error::ViewError;

/// Convenience alias for view-level results.
pub type ViewResult<T> = Result<T, ViewError>;
