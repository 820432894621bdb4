use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::template_view::{ScriptTemplateView, ScriptTemplateViewBuilder};
use crate::config::ViewEnvironment;
use crate::error::ViewResult;

/// Resolves view names to [`ScriptTemplateView`]s.
///
/// The template URL of a view is `prefix + name + suffix`. Views are built
/// from a shared builder template and cached by name unless caching is
/// disabled.
pub struct ScriptTemplateViewResolver {
    env: Arc<ViewEnvironment>,
    prefix: String,
    suffix: String,
    view_template: ScriptTemplateViewBuilder,
    cache_enabled: bool,
    cache: RwLock<HashMap<String, Arc<ScriptTemplateView>>>,
}

impl ScriptTemplateViewResolver {
    pub fn new(env: Arc<ViewEnvironment>) -> Self {
        Self {
            env,
            prefix: String::new(),
            suffix: String::new(),
            view_template: ScriptTemplateViewBuilder::new(),
            cache_enabled: true,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Settings applied to every view this resolver builds.
    pub fn view_template(mut self, builder: ScriptTemplateViewBuilder) -> Self {
        self.view_template = builder;
        self
    }

    pub fn cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn template_url(&self, view_name: &str) -> String {
        format!("{}{}{}", self.prefix, view_name, self.suffix)
    }

    pub fn resolve_view(&self, view_name: &str) -> ViewResult<Arc<ScriptTemplateView>> {
        if self.cache_enabled {
            if let Some(view) = self.cache.read().get(view_name) {
                return Ok(view.clone());
            }
        }

        let view = Arc::new(
            self.view_template
                .clone()
                .url(self.template_url(view_name))
                .build(&self.env)?,
        );

        if !self.cache_enabled {
            return Ok(view);
        }
        let mut cache = self.cache.write();
        Ok(cache
            .entry(view_name.to_string())
            .or_insert(view)
            .clone())
    }

    /// Forget a cached view.
    pub fn remove_from_cache(&self, view_name: &str) -> bool {
        self.cache.write().remove(view_name).is_some()
    }

    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    pub fn cached_views(&self) -> usize {
        self.cache.read().len()
    }
}
