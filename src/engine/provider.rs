use std::sync::{Arc, Weak};

use dashmap::DashMap;
use encoding_rs::Encoding;

use super::context::{ContextId, RenderContext};
use crate::error::{ViewError, ViewResult};
use crate::resource::ResourceLoader;
use scriptview_types::{ScriptEngine, ScriptEngineFactory};

/// Bootstrap scripts evaluated into every engine before its first render.
#[derive(Clone)]
pub struct ScriptBootstrap {
    scripts: Vec<String>,
    resource_loader: Arc<dyn ResourceLoader>,
    charset: &'static Encoding,
}

impl ScriptBootstrap {
    pub fn new(
        scripts: Vec<String>,
        resource_loader: Arc<dyn ResourceLoader>,
        charset: &'static Encoding,
    ) -> Self {
        Self {
            scripts,
            resource_loader,
            charset,
        }
    }

    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }

    /// Evaluate each script into `engine`, in declared order.
    pub fn load_into(&self, engine: &dyn ScriptEngine) -> ViewResult<()> {
        for script in &self.scripts {
            let resource = self.resource_loader.get_resource(script);
            if !resource.exists() {
                return Err(ViewError::ResourceNotFound(script.clone()));
            }
            let source = resource
                .read_to_string(self.charset)
                .map_err(|e| ViewError::ScriptLoad {
                    script: script.clone(),
                    message: e.to_string(),
                })?;
            engine
                .eval(&source, Some(script.as_str()))
                .map_err(|e| ViewError::ScriptLoad {
                    script: script.clone(),
                    message: e.to_string(),
                })?;
            tracing::debug!(script = %script, engine = engine.engine_name(), "Loaded script");
        }
        Ok(())
    }
}

struct ContextEngine {
    lease: Weak<()>,
    engine: Arc<dyn ScriptEngine>,
}

impl ContextEngine {
    fn is_live(&self) -> bool {
        self.lease.strong_count() > 0
    }
}

enum EngineMode {
    Shared(Arc<dyn ScriptEngine>),
    PerContext {
        factory: Arc<dyn ScriptEngineFactory>,
        engines: DashMap<ContextId, ContextEngine>,
    },
}

/// Hands out the engine a render call should use.
///
/// In shared mode one engine serves every context. In per-context mode each
/// [`ContextId`] gets its own engine, created and bootstrapped on first use.
/// It is kept until [`EngineProvider::release`] is called for that context
/// or the context is dropped; engines of dropped contexts are reclaimed the
/// next time an engine is created or [`EngineProvider::purge`] runs.
pub struct EngineProvider {
    mode: EngineMode,
    bootstrap: ScriptBootstrap,
}

impl EngineProvider {
    /// Shared mode over an existing engine; bootstrap scripts are loaded now.
    pub fn shared(engine: Arc<dyn ScriptEngine>, bootstrap: ScriptBootstrap) -> ViewResult<Self> {
        bootstrap.load_into(engine.as_ref())?;
        Ok(Self {
            mode: EngineMode::Shared(engine),
            bootstrap,
        })
    }

    /// Per-context mode; engines are created lazily.
    pub fn per_context(factory: Arc<dyn ScriptEngineFactory>, bootstrap: ScriptBootstrap) -> Self {
        Self {
            mode: EngineMode::PerContext {
                factory,
                engines: DashMap::new(),
            },
            bootstrap,
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self.mode, EngineMode::Shared(_))
    }

    pub fn bootstrap(&self) -> &ScriptBootstrap {
        &self.bootstrap
    }

    pub fn engine(&self, ctx: &RenderContext) -> ViewResult<Arc<dyn ScriptEngine>> {
        match &self.mode {
            EngineMode::Shared(engine) => Ok(engine.clone()),
            EngineMode::PerContext { factory, engines } => {
                if let Some(entry) = engines.get(&ctx.id()) {
                    return Ok(entry.engine.clone());
                }
                self.purge();
                // A context renders sequentially, so nobody else creates this entry.
                let engine = create_engine(factory.as_ref())?;
                self.bootstrap.load_into(engine.as_ref())?;
                tracing::debug!(
                    context = %ctx.id(),
                    context_name = ctx.name().unwrap_or(""),
                    "Created per-context engine"
                );
                let entry = engines.entry(ctx.id()).or_insert(ContextEngine {
                    lease: ctx.lease(),
                    engine,
                });
                Ok(entry.engine.clone())
            }
        }
    }

    /// Drop the engine cached for `ctx`. Returns whether one existed.
    pub fn release(&self, ctx: &RenderContext) -> bool {
        match &self.mode {
            EngineMode::Shared(_) => false,
            EngineMode::PerContext { engines, .. } => engines.remove(&ctx.id()).is_some(),
        }
    }

    /// Drop the engines of contexts that no longer exist. Returns how many
    /// were removed.
    pub fn purge(&self) -> usize {
        let EngineMode::PerContext { engines, .. } = &self.mode else {
            return 0;
        };
        let before = engines.len();
        engines.retain(|_, entry| entry.is_live());
        let purged = before.saturating_sub(engines.len());
        if purged > 0 {
            tracing::debug!(purged, "Reclaimed engines of dropped contexts");
        }
        purged
    }

    /// Number of engines currently alive.
    pub fn engine_count(&self) -> usize {
        match &self.mode {
            EngineMode::Shared(_) => 1,
            EngineMode::PerContext { engines, .. } => {
                engines.iter().filter(|entry| entry.is_live()).count()
            }
        }
    }
}

fn create_engine(factory: &dyn ScriptEngineFactory) -> ViewResult<Arc<dyn ScriptEngine>> {
    let engine = factory.create_engine().map_err(|e| {
        ViewError::config(format!(
            "Could not create engine \"{}\": {}",
            factory.engine_name(),
            e
        ))
    })?;
    tracing::debug!(engine = factory.engine_name(), "Created script engine");
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::InMemoryResourceLoader;
    use crate::testing::{RecordingEngine, RecordingFactory};

    fn bootstrap(scripts: &[&str]) -> ScriptBootstrap {
        let loader = InMemoryResourceLoader::new()
            .with_resource("a.js", "var a = 1;")
            .with_resource("b.js", "var b = 2;");
        ScriptBootstrap::new(
            scripts.iter().map(|s| s.to_string()).collect(),
            Arc::new(loader),
            encoding_rs::UTF_8,
        )
    }

    #[test]
    fn test_shared_loads_scripts_in_order() {
        let engine = Arc::new(RecordingEngine::new());
        let provider = EngineProvider::shared(engine.clone(), bootstrap(&["b.js", "a.js"])).unwrap();
        assert!(provider.is_shared());
        assert_eq!(engine.evaluated(), vec!["var b = 2;", "var a = 1;"]);

        let first = provider.engine(&RenderContext::new()).unwrap();
        let second = provider.engine(&RenderContext::new()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(provider.engine_count(), 1);
    }

    #[test]
    fn test_missing_script() {
        let engine = Arc::new(RecordingEngine::new());
        let err = EngineProvider::shared(engine, bootstrap(&["a.js", "c.js"]))
            .err()
            .unwrap();
        assert!(matches!(err, ViewError::ResourceNotFound(ref s) if s == "c.js"));
    }

    #[test]
    fn test_script_eval_failure_is_script_load() {
        let engine = Arc::new(RecordingEngine::failing_eval());
        let err = EngineProvider::shared(engine, bootstrap(&["a.js"]))
            .err()
            .unwrap();
        assert!(matches!(err, ViewError::ScriptLoad { ref script, .. } if script == "a.js"));
    }

    #[test]
    fn test_per_context_engines() {
        let factory = Arc::new(RecordingFactory::new());
        let provider = EngineProvider::per_context(factory.clone(), bootstrap(&["a.js"]));
        assert!(!provider.is_shared());
        assert_eq!(factory.created(), 0);

        let ctx_a = RenderContext::named("a");
        let ctx_b = RenderContext::named("b");
        let a1 = provider.engine(&ctx_a).unwrap();
        let a2 = provider.engine(&ctx_a).unwrap();
        let b = provider.engine(&ctx_b).unwrap();
        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
        assert_eq!(factory.created(), 2);
        assert_eq!(provider.engine_count(), 2);
        for engine in factory.engines() {
            assert_eq!(engine.evaluated(), vec!["var a = 1;"]);
        }

        assert!(provider.release(&ctx_a));
        assert!(!provider.release(&ctx_a));
        assert_eq!(provider.engine_count(), 1);
        provider.engine(&ctx_a).unwrap();
        assert_eq!(factory.created(), 3);
    }

    #[test]
    fn test_dropped_context_engine_is_reclaimed() {
        let factory = Arc::new(RecordingFactory::new());
        let provider = EngineProvider::per_context(factory.clone(), bootstrap(&[]));

        let kept = RenderContext::named("kept");
        provider.engine(&kept).unwrap();
        for _ in 0..50 {
            let ctx = RenderContext::new();
            provider.engine(&ctx).unwrap();
        }
        assert_eq!(factory.created(), 51);
        assert_eq!(provider.engine_count(), 1);
        assert_eq!(provider.purge(), 1);

        // Held by the factory's record and this vector only.
        let engines = factory.engines();
        assert_eq!(Arc::strong_count(&engines[0]), 3);
        assert!(engines[1..].iter().all(|engine| Arc::strong_count(engine) == 2));
        assert!(provider.release(&kept));
    }

    #[test]
    fn test_clone_keeps_context_engine() {
        let factory = Arc::new(RecordingFactory::new());
        let provider = EngineProvider::per_context(factory.clone(), bootstrap(&[]));
        let ctx = RenderContext::new();
        let first = provider.engine(&ctx).unwrap();
        let clone = ctx.clone();
        drop(ctx);
        assert_eq!(provider.purge(), 0);
        assert!(Arc::ptr_eq(&first, &provider.engine(&clone).unwrap()));
        drop(clone);
        assert_eq!(provider.purge(), 1);
        assert_eq!(provider.engine_count(), 0);
    }

    #[test]
    fn test_engine_creation_failure_is_configuration_error() {
        let factory = Arc::new(RecordingFactory::new().failing_create());
        let provider = EngineProvider::per_context(factory, bootstrap(&[]));
        let err = provider.engine(&RenderContext::new()).err().unwrap();
        assert!(matches!(err, ViewError::Configuration(ref m) if m.contains("Could not create engine")));
        assert_eq!(provider.engine_count(), 0);
    }
}
