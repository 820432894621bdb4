/// Errors raised by a script engine backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error("Evaluation error: {0}")]
    EvaluationError(String),

    #[error("Function not found: {0}")]
    FunctionNotFound(String),

    #[error("Value is not callable: {0}")]
    NotCallable(String),

    #[error("Conversion error: {0}")]
    ConversionError(String),

    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),
}
