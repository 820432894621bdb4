pub mod builtins;
pub mod engine;

pub use engine::{JsEngineFactory, JsScriptEngine, JS_ENGINE_NAME};

// Re-export boa_engine for consumers that need direct access
pub use boa_engine;
