use std::sync::Arc;

use super::ScriptTemplateConfig;
use crate::engine::ScriptEngineManager;
use crate::error::{ViewError, ViewResult};
use crate::resource::ResourceLoader;

/// Settings shared by every view of an application: the ambient resource
/// loader, the engine manager, and the script template configuration that
/// views fall back on.
#[derive(Clone)]
pub struct ViewEnvironment {
    resource_loader: Arc<dyn ResourceLoader>,
    engine_manager: Arc<ScriptEngineManager>,
    template_configs: Vec<Arc<ScriptTemplateConfig>>,
}

impl ViewEnvironment {
    /// Environment over `resource_loader` with the default engines.
    pub fn new(resource_loader: Arc<dyn ResourceLoader>) -> Self {
        Self {
            resource_loader,
            engine_manager: Arc::new(ScriptEngineManager::with_defaults()),
            template_configs: Vec::new(),
        }
    }

    pub fn with_engine_manager(mut self, engine_manager: Arc<ScriptEngineManager>) -> Self {
        self.engine_manager = engine_manager;
        self
    }

    /// Register a script template configuration. Exactly one must be
    /// registered before views are built.
    pub fn with_template_config(mut self, config: ScriptTemplateConfig) -> Self {
        self.template_configs.push(Arc::new(config));
        self
    }

    pub fn resource_loader(&self) -> Arc<dyn ResourceLoader> {
        self.resource_loader.clone()
    }

    pub fn engine_manager(&self) -> &ScriptEngineManager {
        &self.engine_manager
    }

    /// The single registered configuration.
    pub fn template_config(&self) -> ViewResult<Arc<ScriptTemplateConfig>> {
        match self.template_configs.as_slice() {
            [config] => Ok(config.clone()),
            [] => Err(ViewError::config(
                "Expected a single ScriptTemplateConfig in the view environment, found none",
            )),
            configs => Err(ViewError::config(format!(
                "Expected a single ScriptTemplateConfig in the view environment, found {}",
                configs.len()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::InMemoryResourceLoader;

    fn env() -> ViewEnvironment {
        ViewEnvironment::new(Arc::new(InMemoryResourceLoader::new()))
    }

    #[test]
    fn test_missing_template_config() {
        let err = env().template_config().unwrap_err();
        assert!(err.to_string().contains("found none"));
    }

    #[test]
    fn test_ambiguous_template_config() {
        let env = env()
            .with_template_config(ScriptTemplateConfig::new())
            .with_template_config(ScriptTemplateConfig::new());
        let err = env.template_config().unwrap_err();
        assert!(err.to_string().contains("found 2"));
    }

    #[test]
    fn test_single_template_config() {
        let env = env().with_template_config(ScriptTemplateConfig::new().engine_name("js"));
        let config = env.template_config().unwrap();
        assert_eq!(config.engine_name.as_deref(), Some("js"));
    }
}
