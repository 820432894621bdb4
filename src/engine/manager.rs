use std::collections::HashMap;
use std::sync::Arc;

use scriptview_types::{ScriptEngine, ScriptEngineFactory, ScriptError};

/// Engine manager - looks up engine factories by name
#[derive(Clone, Default)]
pub struct ScriptEngineManager {
    factories: HashMap<String, Arc<dyn ScriptEngineFactory>>,
}

impl ScriptEngineManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager with the bundled engines registered
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut manager = Self::new();

        #[cfg(feature = "builtin-engine-js")]
        manager.register(Arc::new(scriptview_engine_js::JsEngineFactory::new()));

        manager
    }

    /// Register a factory under its name and aliases
    pub fn register(&mut self, factory: Arc<dyn ScriptEngineFactory>) {
        let mut names = vec![factory.engine_name().to_string()];
        names.extend(factory.aliases().into_iter().map(str::to_string));
        for name in names {
            self.factories.insert(name, factory.clone());
        }
    }

    pub fn get_factory(&self, name: &str) -> Option<Arc<dyn ScriptEngineFactory>> {
        self.factories.get(name).cloned()
    }

    /// Create a new engine, or `None` if no factory is registered under `name`
    pub fn get_engine_by_name(
        &self,
        name: &str,
    ) -> Option<Result<Arc<dyn ScriptEngine>, ScriptError>> {
        self.get_factory(name).map(|factory| factory.create_engine())
    }

    /// Every registered name, sorted
    pub fn engine_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for ScriptEngineManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptEngineManager")
            .field("engines", &self.engine_names())
            .finish()
    }
}
