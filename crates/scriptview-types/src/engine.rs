use std::sync::Arc;

use serde_json::Value;

use crate::error::ScriptError;

/// Script engine capability interface.
///
/// An engine evaluates source text into its global scope and invokes named
/// callables with positional JSON arguments. Invocation results are returned
/// in their textual form, the way the engine itself would stringify them
/// (`null` and `undefined` included).
///
/// Implementations are shared behind `Arc`, so they must be safe to call
/// from several threads at once.
pub trait ScriptEngine: Send + Sync {
    /// Engine name.
    fn engine_name(&self) -> &str;

    /// Evaluate source text into the engine's global scope.
    ///
    /// `origin` names the source (a script location) for diagnostics.
    fn eval(&self, source: &str, origin: Option<&str>) -> Result<(), ScriptError>;

    /// Invoke a global function.
    fn invoke_function(&self, name: &str, args: &[Value]) -> Result<String, ScriptError>;

    /// Evaluate `receiver` to a value and invoke its method `name`, with the
    /// receiver bound as `this`.
    fn invoke_method(
        &self,
        receiver: &str,
        name: &str,
        args: &[Value],
    ) -> Result<String, ScriptError>;
}

/// Factory registered under a name, producing fresh engine instances.
pub trait ScriptEngineFactory: Send + Sync {
    /// Primary engine name.
    fn engine_name(&self) -> &str;

    /// Additional names this factory answers to.
    fn aliases(&self) -> Vec<&str> {
        Vec::new()
    }

    /// Create a new, empty engine instance.
    fn create_engine(&self) -> Result<Arc<dyn ScriptEngine>, ScriptError>;
}
