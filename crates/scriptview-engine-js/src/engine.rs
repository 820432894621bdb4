//! JavaScript script engine implementation using boa_engine.
//!
//! A boa [`Context`] is neither `Send` nor `Sync`, so each engine owns a
//! dedicated thread that holds its context. Calls are forwarded over a
//! channel and answered one at a time, which makes a single instance safe to
//! share between request threads. The thread exits once the last handle is
//! dropped.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use boa_engine::{Context, JsError, JsString, JsValue, Source};
use serde_json::Value;

use scriptview_types::{ScriptEngine, ScriptEngineFactory, ScriptError};

/// Primary name the JavaScript engine is registered under.
pub const JS_ENGINE_NAME: &str = "javascript";

enum Command {
    Eval {
        source: String,
        origin: Option<String>,
        reply: Sender<Result<(), ScriptError>>,
    },
    InvokeFunction {
        name: String,
        args: Vec<Value>,
        reply: Sender<Result<String, ScriptError>>,
    },
    InvokeMethod {
        receiver: String,
        name: String,
        args: Vec<Value>,
        reply: Sender<Result<String, ScriptError>>,
    },
}

/// JavaScript engine running on its own boa context thread.
pub struct JsScriptEngine {
    commands: Sender<Command>,
}

impl JsScriptEngine {
    pub fn new() -> Result<Self, ScriptError> {
        let (commands, receiver) = mpsc::channel();
        thread::Builder::new()
            .name("scriptview-js".to_string())
            .spawn(move || serve(receiver))
            .map_err(|e| {
                ScriptError::EngineUnavailable(format!("Failed to spawn engine thread: {}", e))
            })?;
        Ok(Self { commands })
    }

    fn request<T>(
        &self,
        command: impl FnOnce(Sender<Result<T, ScriptError>>) -> Command,
    ) -> Result<T, ScriptError> {
        let (reply, response) = mpsc::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| ScriptError::EngineUnavailable("engine thread stopped".to_string()))?;
        response
            .recv()
            .map_err(|_| ScriptError::EngineUnavailable("engine thread stopped".to_string()))?
    }
}

impl ScriptEngine for JsScriptEngine {
    fn engine_name(&self) -> &str {
        JS_ENGINE_NAME
    }

    fn eval(&self, source: &str, origin: Option<&str>) -> Result<(), ScriptError> {
        self.request(|reply| Command::Eval {
            source: source.to_string(),
            origin: origin.map(str::to_string),
            reply,
        })
    }

    fn invoke_function(&self, name: &str, args: &[Value]) -> Result<String, ScriptError> {
        self.request(|reply| Command::InvokeFunction {
            name: name.to_string(),
            args: args.to_vec(),
            reply,
        })
    }

    fn invoke_method(
        &self,
        receiver: &str,
        name: &str,
        args: &[Value],
    ) -> Result<String, ScriptError> {
        self.request(|reply| Command::InvokeMethod {
            receiver: receiver.to_string(),
            name: name.to_string(),
            args: args.to_vec(),
            reply,
        })
    }
}

fn serve(commands: Receiver<Command>) {
    let mut context = Context::default();
    if let Err(e) = crate::builtins::register_all(&mut context) {
        tracing::warn!("Failed to register JavaScript builtins: {}", e);
    }

    while let Ok(command) = commands.recv() {
        // A dropped reply channel only means the caller went away.
        match command {
            Command::Eval {
                source,
                origin,
                reply,
            } => {
                let _ = reply.send(eval(&mut context, &source, origin.as_deref()));
            }
            Command::InvokeFunction { name, args, reply } => {
                let _ = reply.send(invoke_function(&mut context, &name, &args));
            }
            Command::InvokeMethod {
                receiver,
                name,
                args,
                reply,
            } => {
                let _ = reply.send(invoke_method(&mut context, &receiver, &name, &args));
            }
        }
    }
    tracing::trace!("JavaScript engine thread exiting");
}

fn eval(context: &mut Context, source: &str, origin: Option<&str>) -> Result<(), ScriptError> {
    context
        .eval(Source::from_bytes(source))
        .map(|_| ())
        .map_err(|e| match origin {
            Some(origin) => ScriptError::EvaluationError(format!("{}: {}", origin, e)),
            None => evaluation_error(e),
        })
}

fn invoke_function(
    context: &mut Context,
    name: &str,
    args: &[Value],
) -> Result<String, ScriptError> {
    let global = context.global_object();
    let function = global
        .get(JsString::from(name), context)
        .map_err(evaluation_error)?;
    if function.is_undefined() {
        return Err(ScriptError::FunctionNotFound(name.to_string()));
    }
    let callable = function
        .as_callable()
        .ok_or_else(|| ScriptError::NotCallable(name.to_string()))?
        .clone();

    let js_args = to_js_args(args, context)?;
    let result = callable
        .call(&JsValue::undefined(), &js_args, context)
        .map_err(evaluation_error)?;
    stringify(&result, context)
}

fn invoke_method(
    context: &mut Context,
    receiver: &str,
    name: &str,
    args: &[Value],
) -> Result<String, ScriptError> {
    let target = context
        .eval(Source::from_bytes(receiver))
        .map_err(evaluation_error)?;
    let object = target
        .as_object()
        .ok_or_else(|| ScriptError::NotCallable(format!("{} is not an object", receiver)))?
        .clone();

    let method = object
        .get(JsString::from(name), context)
        .map_err(evaluation_error)?;
    if method.is_undefined() {
        return Err(ScriptError::FunctionNotFound(format!("{}.{}", receiver, name)));
    }
    let callable = method
        .as_callable()
        .ok_or_else(|| ScriptError::NotCallable(format!("{}.{}", receiver, name)))?
        .clone();

    let js_args = to_js_args(args, context)?;
    let result = callable
        .call(&target, &js_args, context)
        .map_err(evaluation_error)?;
    stringify(&result, context)
}

fn to_js_args(args: &[Value], context: &mut Context) -> Result<Vec<JsValue>, ScriptError> {
    args.iter()
        .map(|arg| {
            JsValue::from_json(arg, context)
                .map_err(|e| ScriptError::ConversionError(e.to_string()))
        })
        .collect()
}

/// JavaScript `String(value)` semantics.
fn stringify(value: &JsValue, context: &mut Context) -> Result<String, ScriptError> {
    value
        .to_string(context)
        .map(|s| s.to_std_string_escaped())
        .map_err(|e| ScriptError::ConversionError(e.to_string()))
}

fn evaluation_error(e: JsError) -> ScriptError {
    ScriptError::EvaluationError(e.to_string())
}

/// Factory for [`JsScriptEngine`] instances.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsEngineFactory;

impl JsEngineFactory {
    pub fn new() -> Self {
        Self
    }
}

impl ScriptEngineFactory for JsEngineFactory {
    fn engine_name(&self) -> &str {
        JS_ENGINE_NAME
    }

    fn aliases(&self) -> Vec<&str> {
        vec!["js", "JavaScript", "ecmascript", "boa"]
    }

    fn create_engine(&self) -> Result<Arc<dyn ScriptEngine>, ScriptError> {
        Ok(Arc::new(JsScriptEngine::new()?))
    }
}
