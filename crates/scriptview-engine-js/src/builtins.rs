use boa_engine::object::ObjectInitializer;
use boa_engine::property::Attribute;
use boa_engine::{js_string, Context, JsResult, JsValue, NativeFunction};

/// Register all built-in APIs into a boa context.
pub fn register_all(context: &mut Context) -> JsResult<()> {
    register_console(context)?;
    Ok(())
}

/// `console.*` forwards to `tracing` under the `scriptview::js` target.
fn register_console(context: &mut Context) -> JsResult<()> {
    let mut initializer = ObjectInitializer::new(context);
    initializer
        .function(NativeFunction::from_fn_ptr(console_log), js_string!("log"), 0)
        .function(NativeFunction::from_fn_ptr(console_log), js_string!("info"), 0)
        .function(NativeFunction::from_fn_ptr(console_log), js_string!("debug"), 0)
        .function(NativeFunction::from_fn_ptr(console_warn), js_string!("warn"), 0)
        .function(NativeFunction::from_fn_ptr(console_warn), js_string!("error"), 0);
    let console = initializer.build();

    context.register_global_property(js_string!("console"), console, Attribute::all())?;
    Ok(())
}

fn console_log(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let line = join_args(args, context)?;
    tracing::debug!(target: "scriptview::js", "{}", line);
    Ok(JsValue::undefined())
}

fn console_warn(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let line = join_args(args, context)?;
    tracing::warn!(target: "scriptview::js", "{}", line);
    Ok(JsValue::undefined())
}

fn join_args(args: &[JsValue], context: &mut Context) -> JsResult<String> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        parts.push(arg.to_string(context)?.to_std_string_escaped());
    }
    Ok(parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use boa_engine::Source;

    #[test]
    fn test_console_is_registered() {
        let mut context = Context::default();
        register_all(&mut context).unwrap();
        let result = context
            .eval(Source::from_bytes("console.log('a', 1, {}); typeof console.warn"))
            .unwrap();
        assert_eq!(
            result.as_string().unwrap().to_std_string_escaped(),
            "function"
        );
    }
}
