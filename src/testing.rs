//! In-process script engine doubles for tests.
//!
//! [`RecordingEngine`] records every evaluated source and invocation and
//! answers calls to the functions and methods it was told about with a
//! deterministic string: `name(<template>, <model json>)`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use scriptview_types::{ScriptEngine, ScriptEngineFactory, ScriptError};

pub const RECORDING_ENGINE_NAME: &str = "recording";

/// One recorded function or method call.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub receiver: Option<String>,
    pub name: String,
    pub args: Vec<Value>,
}

#[derive(Debug, Clone, Default)]
struct Callables {
    functions: HashSet<String>,
    methods: HashMap<String, HashSet<String>>,
    fail_eval: bool,
}

#[derive(Debug, Default)]
pub struct RecordingEngine {
    callables: Callables,
    evaluated: Mutex<Vec<String>>,
    invocations: Mutex<Vec<Invocation>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine whose `eval` always fails.
    pub fn failing_eval() -> Self {
        let mut engine = Self::new();
        engine.callables.fail_eval = true;
        engine
    }

    pub fn with_function(mut self, name: &str) -> Self {
        self.callables.functions.insert(name.to_string());
        self
    }

    pub fn with_method(mut self, receiver: &str, name: &str) -> Self {
        self.callables
            .methods
            .entry(receiver.to_string())
            .or_default()
            .insert(name.to_string());
        self
    }

    pub fn evaluated(&self) -> Vec<String> {
        self.evaluated.lock().clone()
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().clone()
    }

    fn answer(&self, invocation: Invocation) -> String {
        let rendered = format!(
            "{}({})",
            invocation.name,
            invocation
                .args
                .iter()
                .map(|arg| match arg {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.invocations.lock().push(invocation);
        rendered
    }
}

impl ScriptEngine for RecordingEngine {
    fn engine_name(&self) -> &str {
        RECORDING_ENGINE_NAME
    }

    fn eval(&self, source: &str, origin: Option<&str>) -> Result<(), ScriptError> {
        if self.callables.fail_eval {
            return Err(ScriptError::EvaluationError(format!(
                "{}: eval disabled",
                origin.unwrap_or("<eval>")
            )));
        }
        self.evaluated.lock().push(source.to_string());
        Ok(())
    }

    fn invoke_function(&self, name: &str, args: &[Value]) -> Result<String, ScriptError> {
        if !self.callables.functions.contains(name) {
            return Err(ScriptError::FunctionNotFound(name.to_string()));
        }
        Ok(self.answer(Invocation {
            receiver: None,
            name: name.to_string(),
            args: args.to_vec(),
        }))
    }

    fn invoke_method(
        &self,
        receiver: &str,
        name: &str,
        args: &[Value],
    ) -> Result<String, ScriptError> {
        let methods = self
            .callables
            .methods
            .get(receiver)
            .ok_or_else(|| ScriptError::EvaluationError(format!("{} is not defined", receiver)))?;
        if !methods.contains(name) {
            return Err(ScriptError::FunctionNotFound(format!("{}.{}", receiver, name)));
        }
        Ok(self.answer(Invocation {
            receiver: Some(receiver.to_string()),
            name: name.to_string(),
            args: args.to_vec(),
        }))
    }
}

/// Factory producing [`RecordingEngine`]s and keeping hold of each one.
#[derive(Debug, Default)]
pub struct RecordingFactory {
    callables: Callables,
    fail_create: bool,
    engines: Mutex<Vec<Arc<RecordingEngine>>>,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_function(mut self, name: &str) -> Self {
        self.callables.functions.insert(name.to_string());
        self
    }

    pub fn with_method(mut self, receiver: &str, name: &str) -> Self {
        self.callables
            .methods
            .entry(receiver.to_string())
            .or_default()
            .insert(name.to_string());
        self
    }

    /// Factory whose `create_engine` always fails.
    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// Number of engines created so far.
    pub fn created(&self) -> usize {
        self.engines.lock().len()
    }

    pub fn engines(&self) -> Vec<Arc<RecordingEngine>> {
        self.engines.lock().clone()
    }
}

impl ScriptEngineFactory for RecordingFactory {
    fn engine_name(&self) -> &str {
        RECORDING_ENGINE_NAME
    }

    fn create_engine(&self) -> Result<Arc<dyn ScriptEngine>, ScriptError> {
        if self.fail_create {
            return Err(ScriptError::EngineUnavailable("engine creation disabled".to_string()));
        }
        let engine = Arc::new(RecordingEngine {
            callables: self.callables.clone(),
            ..RecordingEngine::default()
        });
        self.engines.lock().push(engine.clone());
        Ok(engine)
    }
}
