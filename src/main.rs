use std::collections::HashMap;
use std::process::ExitCode;
use std::sync::Arc;

use serde_json::Value;

use scriptview::{
    DefaultResourceLoader, InMemoryResourceLoader, RenderContext, ResourceLoader,
    ScriptTemplateConfig, ScriptTemplateView, ViewEnvironment, ViewResult,
};

const USAGE: &str = "usage: scriptview [<config.(yaml|toml|json)> <template> [<model.json>]]";

const DEMO_SCRIPT: &str = r#"
function render(template, model) {
    return template.replace(/\{\{\s*(\w+)\s*\}\}/g, function(_, key) {
        return model[key] === undefined ? '' : String(model[key]);
    });
}
"#;

const DEMO_TEMPLATE: &str = "<h1>Hello, {{ name }}!</h1>\n<p>Rendered by {{ engine }}.</p>";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let setup = match args.as_slice() {
        [] => demo(),
        [config, template] => from_files(config, template, None),
        [config, template, model] => from_files(config, template, Some(model)),
        _ => {
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    let (view, model) = match setup {
        Ok(setup) => setup,
        Err(e) => {
            eprintln!("[ERROR] {}", e);
            return ExitCode::FAILURE;
        }
    };

    match Arc::new(view).render_async(RenderContext::named("main"), model).await {
        Ok(response) => {
            println!("Content-Type: {}\n", response.content_type);
            println!("{}", response.text());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("[ERROR] {}", e);
            ExitCode::FAILURE
        }
    }
}

fn demo() -> ViewResult<(ScriptTemplateView, HashMap<String, Value>)> {
    let loader = InMemoryResourceLoader::new()
        .with_resource("render.js", DEMO_SCRIPT)
        .with_resource("templates/hello.html", DEMO_TEMPLATE);
    let env = ViewEnvironment::new(Arc::new(loader)).with_template_config(
        ScriptTemplateConfig::new()
            .engine_name("javascript")
            .scripts(["render.js"])
            .render_function("render"),
    );
    let view = ScriptTemplateView::builder("templates/hello.html").build(&env)?;

    let model = HashMap::from([
        ("name".to_string(), Value::from("scriptview")),
        ("engine".to_string(), Value::from("javascript")),
    ]);
    Ok((view, model))
}

fn from_files(
    config: &str,
    template: &str,
    model: Option<&String>,
) -> ViewResult<(ScriptTemplateView, HashMap<String, Value>)> {
    let loader: Arc<dyn ResourceLoader> = Arc::new(DefaultResourceLoader::from_current_dir()?);
    let env = ViewEnvironment::new(loader)
        .with_template_config(ScriptTemplateConfig::from_file(config)?);
    let view = ScriptTemplateView::builder(template).build(&env)?;

    let model = match model {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content).map_err(|e| {
                scriptview::ViewError::config(format!("Invalid model {}: {}", path, e))
            })?
        }
        None => HashMap::new(),
    };
    Ok((view, model))
}
