pub mod engine;
pub mod error;

pub use engine::{ScriptEngine, ScriptEngineFactory};
pub use error::ScriptError;
