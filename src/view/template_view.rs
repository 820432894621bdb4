use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::response::{RenderedResponse, ResponseSink};
use crate::config::{EngineSource, ResolvedRenderConfig, ScriptTemplateConfig, ViewEnvironment};
use crate::engine::{EngineProvider, RenderContext, ScriptBootstrap};
use crate::error::{ViewError, ViewResult};
use crate::resource::{ResourceLoader, SearchPathResourceLoader};
use scriptview_types::ScriptEngine;

/// A view rendering one template through a script engine.
///
/// Rendering loads the template text, then calls the configured render
/// function with `(template, model)`, either as a global function or as a
/// method of the configured render object, and writes its result as the
/// response body.
pub struct ScriptTemplateView {
    url: String,
    config: ResolvedRenderConfig,
    resource_loader: Arc<dyn ResourceLoader>,
    engines: EngineProvider,
}

impl ScriptTemplateView {
    pub fn builder(url: impl Into<String>) -> ScriptTemplateViewBuilder {
        ScriptTemplateViewBuilder::new().url(url)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn config(&self) -> &ResolvedRenderConfig {
        &self.config
    }

    pub fn content_type(&self) -> &str {
        &self.config.content_type
    }

    pub fn is_shared_engine(&self) -> bool {
        self.engines.is_shared()
    }

    pub fn resource_loader(&self) -> Arc<dyn ResourceLoader> {
        self.resource_loader.clone()
    }

    /// Engine used for renders in `ctx`.
    pub fn engine(&self, ctx: &RenderContext) -> ViewResult<Arc<dyn ScriptEngine>> {
        self.engines.engine(ctx)
    }

    /// Drop the engine cached for `ctx`, if this view keeps one per context.
    pub fn release_context(&self, ctx: &RenderContext) -> bool {
        self.engines.release(ctx)
    }

    /// Whether the template behind this view exists.
    pub fn check_resource(&self) -> bool {
        self.resource_loader.get_resource(&self.url).exists()
    }

    /// Render into a buffered response.
    pub fn render(
        &self,
        ctx: &RenderContext,
        model: &HashMap<String, Value>,
    ) -> ViewResult<RenderedResponse> {
        let mut response = RenderedResponse::new(self.config.output_charset);
        self.render_to(ctx, model, &mut response)?;
        Ok(response)
    }

    /// Render into `sink`. Nothing is written when rendering fails.
    pub fn render_to(
        &self,
        ctx: &RenderContext,
        model: &HashMap<String, Value>,
        sink: &mut dyn ResponseSink,
    ) -> ViewResult<()> {
        let output = self.render_output(ctx, model)?;
        sink.set_content_type(&self.config.content_type);
        sink.write_body(&output, self.config.output_charset)
            .map_err(|e| ViewError::rendering(&self.url, e.into()))
    }

    /// Render on Tokio's blocking pool.
    pub async fn render_async(
        self: Arc<Self>,
        ctx: RenderContext,
        model: HashMap<String, Value>,
    ) -> ViewResult<RenderedResponse> {
        let url = self.url.clone();
        tokio::task::spawn_blocking(move || self.render(&ctx, &model))
            .await
            .map_err(|e| {
                ViewError::rendering(
                    &url,
                    ViewError::Io(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        format!("Task join error: {}", e),
                    )),
                )
            })?
    }

    /// Render output text without writing it anywhere.
    pub fn render_output(
        &self,
        ctx: &RenderContext,
        model: &HashMap<String, Value>,
    ) -> ViewResult<String> {
        self.invoke_render(ctx, model).map_err(|e| {
            let err = ViewError::rendering(&self.url, e);
            let context = err.error_context();
            tracing::warn!(
                url = %self.url,
                code = ?context.code,
                cause = ?context.cause,
                error = %context.message,
                "Failed to render template"
            );
            err
        })
    }

    fn invoke_render(
        &self,
        ctx: &RenderContext,
        model: &HashMap<String, Value>,
    ) -> ViewResult<String> {
        let template = self.load_template(&self.url)?;
        let engine = self.engines.engine(ctx)?;

        let model = Value::Object(
            model
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        );
        let args = [Value::String(template), model];

        let output = match &self.config.render_object {
            Some(render_object) => {
                engine.invoke_method(render_object, &self.config.render_function, &args)?
            }
            None => engine.invoke_function(&self.config.render_function, &args)?,
        };
        Ok(output)
    }

    fn load_template(&self, path: &str) -> ViewResult<String> {
        let resource = self.resource_loader.get_resource(path);
        if !resource.exists() {
            return Err(ViewError::ResourceNotFound(path.to_string()));
        }
        Ok(resource.read_to_string(self.config.charset)?)
    }
}

impl std::fmt::Debug for ScriptTemplateView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptTemplateView")
            .field("url", &self.url)
            .field("config", &self.config)
            .field("shared_engine", &self.engines.is_shared())
            .finish()
    }
}

/// Builder for [`ScriptTemplateView`].
///
/// Settings left unset fall back to the environment's
/// [`ScriptTemplateConfig`].
#[derive(Clone, Default)]
pub struct ScriptTemplateViewBuilder {
    url: Option<String>,
    settings: ScriptTemplateConfig,
    resource_loader: Option<Arc<dyn ResourceLoader>>,
}

impl ScriptTemplateViewBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn engine(mut self, engine: Arc<dyn ScriptEngine>) -> Self {
        self.settings = self.settings.engine(engine);
        self
    }

    pub fn engine_name(mut self, name: impl Into<String>) -> Self {
        self.settings = self.settings.engine_name(name);
        self
    }

    pub fn scripts<I, S>(mut self, scripts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings = self.settings.scripts(scripts);
        self
    }

    pub fn render_object(mut self, render_object: impl Into<String>) -> Self {
        self.settings = self.settings.render_object(render_object);
        self
    }

    pub fn render_function(mut self, render_function: impl Into<String>) -> Self {
        self.settings = self.settings.render_function(render_function);
        self
    }

    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.settings = self.settings.charset(charset);
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.settings = self.settings.content_type(content_type);
        self
    }

    pub fn resource_loader_path(mut self, path: impl Into<String>) -> Self {
        self.settings = self.settings.resource_loader_path(path);
        self
    }

    pub fn shared_engine(mut self, shared: bool) -> Self {
        self.settings = self.settings.shared_engine(shared);
        self
    }

    /// Use `loader` as is instead of assembling one from the search path.
    pub fn resource_loader(mut self, loader: Arc<dyn ResourceLoader>) -> Self {
        self.resource_loader = Some(loader);
        self
    }

    pub fn build(self, env: &ViewEnvironment) -> ViewResult<ScriptTemplateView> {
        let url = self
            .url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ViewError::config("Property 'url' is required"))?;

        let fallback = env.template_config()?;
        let config = self.settings.merged_with(&fallback).resolve()?;

        let resource_loader = match self.resource_loader {
            Some(loader) => loader,
            None => SearchPathResourceLoader::assemble(
                env.resource_loader(),
                &config.resource_loader_path,
            )?,
        };

        let bootstrap =
            ScriptBootstrap::new(config.scripts.clone(), resource_loader.clone(), config.charset);
        let engines = match &config.engine {
            EngineSource::Instance(engine) => EngineProvider::shared(engine.clone(), bootstrap)?,
            EngineSource::Named(name) if config.is_shared() => {
                let engine = env
                    .engine_manager()
                    .get_engine_by_name(name)
                    .ok_or_else(|| unknown_engine(name))?
                    .map_err(|e| {
                        ViewError::config(format!("Could not create engine \"{}\": {}", name, e))
                    })?;
                EngineProvider::shared(engine, bootstrap)?
            }
            EngineSource::Named(name) => {
                let factory = env
                    .engine_manager()
                    .get_factory(name)
                    .ok_or_else(|| unknown_engine(name))?;
                EngineProvider::per_context(factory, bootstrap)
            }
        };

        tracing::info!(
            url = %url,
            engine = ?config.engine,
            shared_engine = engines.is_shared(),
            scripts = config.scripts.len(),
            "Initialized script template view"
        );

        Ok(ScriptTemplateView {
            url,
            config,
            resource_loader,
            engines,
        })
    }
}

fn unknown_engine(name: &str) -> ViewError {
    ViewError::config(format!("No engine \"{}\" found.", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ScriptEngineManager;
    use crate::resource::InMemoryResourceLoader;
    use crate::testing::{RecordingEngine, RecordingFactory};
    use serde_json::json;

    fn loader() -> Arc<InMemoryResourceLoader> {
        Arc::new(
            InMemoryResourceLoader::new()
                .with_resource("t.tpl", "Hello {{a}}")
                .with_resource("boot.js", "var boot = true;"),
        )
    }

    fn env_with(config: ScriptTemplateConfig) -> ViewEnvironment {
        ViewEnvironment::new(loader()).with_template_config(config)
    }

    fn model() -> HashMap<String, Value> {
        HashMap::from([("a".to_string(), json!(1))])
    }

    #[test]
    fn test_render_invokes_method_on_render_object() {
        let engine = Arc::new(RecordingEngine::new().with_method("thiz", "renderFn"));
        let env = env_with(
            ScriptTemplateConfig::new()
                .engine(engine.clone())
                .render_object("thiz")
                .render_function("renderFn"),
        );
        let view = ScriptTemplateView::builder("t.tpl").build(&env).unwrap();

        let response = view.render(&RenderContext::new(), &model()).unwrap();
        assert_eq!(response.text(), r#"renderFn(Hello {{a}}, {"a":1})"#);
        assert_eq!(response.content_type, "text/html;charset=UTF-8");

        let invocations = engine.invocations();
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].receiver.as_deref(), Some("thiz"));
        assert_eq!(invocations[0].name, "renderFn");
        assert_eq!(invocations[0].args, vec![json!("Hello {{a}}"), json!({"a": 1})]);
    }

    #[test]
    fn test_render_invokes_free_function() {
        let engine = Arc::new(RecordingEngine::new().with_function("renderFn"));
        let env = env_with(ScriptTemplateConfig::new().engine(engine.clone()));
        let view = ScriptTemplateView::builder("t.tpl")
            .render_function("renderFn")
            .build(&env)
            .unwrap();

        let mut body = String::new();
        view.render_to(&RenderContext::new(), &model(), &mut body)
            .unwrap();
        assert_eq!(body, r#"renderFn(Hello {{a}}, {"a":1})"#);
        assert_eq!(engine.invocations()[0].receiver, None);
    }

    #[test]
    fn test_missing_template_fails_before_engine_call() {
        let engine = Arc::new(RecordingEngine::new().with_function("render"));
        let env = env_with(
            ScriptTemplateConfig::new()
                .engine(engine.clone())
                .render_function("render"),
        );
        let view = ScriptTemplateView::builder("missing.tpl").build(&env).unwrap();

        let mut body = String::new();
        let err = view
            .render_to(&RenderContext::new(), &model(), &mut body)
            .unwrap_err();
        assert!(err.is_resource_not_found());
        assert!(matches!(err, ViewError::Rendering { ref url, .. } if url == "missing.tpl"));
        assert!(engine.invocations().is_empty());
        assert!(body.is_empty());
    }

    #[test]
    fn test_missing_function_is_rendering_failure() {
        let engine = Arc::new(RecordingEngine::new().with_method("thiz", "other"));
        let env = env_with(
            ScriptTemplateConfig::new()
                .engine(engine)
                .render_object("thiz")
                .render_function("render"),
        );
        let view = ScriptTemplateView::builder("t.tpl").build(&env).unwrap();
        let err = view.render(&RenderContext::new(), &model()).unwrap_err();
        assert!(matches!(err, ViewError::Rendering { .. }));
        assert!(matches!(
            err.root_cause(),
            ViewError::Script(scriptview_types::ScriptError::FunctionNotFound(_))
        ));
    }

    #[test]
    fn test_bootstrap_scripts_loaded_into_supplied_engine() {
        let engine = Arc::new(RecordingEngine::new().with_function("render"));
        let env = env_with(
            ScriptTemplateConfig::new()
                .engine(engine.clone())
                .scripts(["boot.js"])
                .render_function("render"),
        );
        ScriptTemplateView::builder("t.tpl").build(&env).unwrap();
        assert_eq!(engine.evaluated(), vec!["var boot = true;"]);
    }

    #[test]
    fn test_missing_bootstrap_script_fails_build() {
        let engine = Arc::new(RecordingEngine::new().with_function("render"));
        let env = env_with(
            ScriptTemplateConfig::new()
                .engine(engine)
                .scripts(["boot.js", "absent.js"])
                .render_function("render"),
        );
        let err = ScriptTemplateView::builder("t.tpl").build(&env).unwrap_err();
        assert!(matches!(err, ViewError::ResourceNotFound(ref s) if s == "absent.js"));
    }

    #[test]
    fn test_unknown_engine_name() {
        let env = env_with(ScriptTemplateConfig::new().render_function("render"))
            .with_engine_manager(Arc::new(ScriptEngineManager::new()));
        let err = ScriptTemplateView::builder("t.tpl")
            .engine_name("ruby")
            .build(&env)
            .unwrap_err();
        assert!(matches!(err, ViewError::Configuration(ref m) if m.contains("ruby")));
    }

    #[test]
    fn test_url_required() {
        let env = env_with(ScriptTemplateConfig::new().engine_name("js").render_function("r"));
        let err = ScriptTemplateViewBuilder::new().build(&env).unwrap_err();
        assert!(matches!(err, ViewError::Configuration(_)));
    }

    #[test]
    fn test_named_engine_modes() {
        let factory = Arc::new(RecordingFactory::new().with_function("render"));
        let mut manager = ScriptEngineManager::new();
        manager.register(factory.clone());
        let env = env_with(
            ScriptTemplateConfig::new()
                .engine_name("recording")
                .scripts(["boot.js"])
                .render_function("render"),
        )
        .with_engine_manager(Arc::new(manager));

        let shared = ScriptTemplateView::builder("t.tpl").build(&env).unwrap();
        assert!(shared.is_shared_engine());
        assert_eq!(factory.created(), 1);

        let unshared = ScriptTemplateView::builder("t.tpl")
            .shared_engine(false)
            .build(&env)
            .unwrap();
        assert!(!unshared.is_shared_engine());
        assert_eq!(factory.created(), 1);

        let ctx = RenderContext::new();
        unshared.render(&ctx, &model()).unwrap();
        unshared.render(&ctx, &model()).unwrap();
        assert_eq!(factory.created(), 2);
        assert!(unshared.release_context(&ctx));
        assert!(!shared.release_context(&ctx));
    }

    #[test]
    fn test_template_read_with_configured_charset() {
        let loader = Arc::new(InMemoryResourceLoader::new().with_resource("l.tpl", b"caf\xe9"));
        let engine = Arc::new(RecordingEngine::new().with_function("render"));
        let env = ViewEnvironment::new(loader).with_template_config(
            ScriptTemplateConfig::new()
                .engine(engine.clone())
                .render_function("render")
                .charset("ISO-8859-1"),
        );
        let view = ScriptTemplateView::builder("l.tpl").build(&env).unwrap();
        let response = view.render(&RenderContext::new(), &HashMap::new()).unwrap();
        assert_eq!(engine.invocations()[0].args[0], json!("café"));
        assert_eq!(response.body, b"render(caf\xe9, {})");
    }

    #[test]
    fn test_build_requires_exactly_one_environment_config() {
        let none = ViewEnvironment::new(loader());
        let err = ScriptTemplateView::builder("t.tpl")
            .engine_name("js")
            .render_function("render")
            .build(&none)
            .unwrap_err();
        assert!(matches!(err, ViewError::Configuration(ref m) if m.contains("found none")));

        let two = ViewEnvironment::new(loader())
            .with_template_config(ScriptTemplateConfig::new().engine_name("js"))
            .with_template_config(ScriptTemplateConfig::new().engine_name("js"));
        let err = ScriptTemplateView::builder("t.tpl")
            .render_function("render")
            .build(&two)
            .unwrap_err();
        assert!(matches!(err, ViewError::Configuration(ref m) if m.contains("found 2")));
    }

    #[test]
    fn test_engine_creation_failure_fails_build() {
        let mut manager = ScriptEngineManager::new();
        manager.register(Arc::new(RecordingFactory::new().failing_create()));
        let env = env_with(
            ScriptTemplateConfig::new()
                .engine_name("recording")
                .render_function("render"),
        )
        .with_engine_manager(Arc::new(manager));

        let err = ScriptTemplateView::builder("t.tpl").build(&env).unwrap_err();
        assert!(matches!(err, ViewError::Configuration(ref m) if m.contains("Could not create engine")));

        let unshared = ScriptTemplateView::builder("t.tpl")
            .shared_engine(false)
            .build(&env)
            .unwrap();
        let err = unshared.render(&RenderContext::new(), &model()).unwrap_err();
        assert!(matches!(err.root_cause(), ViewError::Configuration(_)));
    }

    #[test]
    fn test_dropped_contexts_release_their_engines() {
        let factory = Arc::new(RecordingFactory::new().with_function("render"));
        let mut manager = ScriptEngineManager::new();
        manager.register(factory.clone());
        let env = env_with(
            ScriptTemplateConfig::new()
                .engine_name("recording")
                .render_function("render")
                .shared_engine(false),
        )
        .with_engine_manager(Arc::new(manager));
        let view = ScriptTemplateView::builder("t.tpl").build(&env).unwrap();

        for _ in 0..50 {
            view.render(&RenderContext::new(), &model()).unwrap();
        }
        let last = RenderContext::new();
        view.render(&last, &model()).unwrap();
        assert_eq!(factory.created(), 51);

        // Only the live context still holds its engine.
        let engines = factory.engines();
        assert!(engines[..50].iter().all(|engine| Arc::strong_count(engine) == 2));
        assert_eq!(Arc::strong_count(&engines[50]), 3);
    }

    #[test]
    fn test_utf16_charset_writes_declared_encoding() {
        let loader = Arc::new(InMemoryResourceLoader::new().with_resource("w.tpl", b"h\0i\0"));
        let engine = Arc::new(RecordingEngine::new().with_function("render"));
        let env = ViewEnvironment::new(loader).with_template_config(
            ScriptTemplateConfig::new()
                .engine(engine.clone())
                .render_function("render")
                .charset("utf-16"),
        );
        let view = ScriptTemplateView::builder("w.tpl").build(&env).unwrap();
        let response = view.render(&RenderContext::new(), &HashMap::new()).unwrap();

        assert_eq!(engine.invocations()[0].args[0], json!("hi"));
        assert_eq!(response.content_type, "text/html;charset=UTF-8");
        assert_eq!(response.charset(), encoding_rs::UTF_8);
        assert_eq!(response.body, b"render(hi, {})");
    }
}
