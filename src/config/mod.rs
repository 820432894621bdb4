//! View configuration.
//!
//! A [`ScriptTemplateConfig`] carries optional render settings. Each view
//! merges its own explicit settings with the single configuration registered
//! in its [`ViewEnvironment`], then resolves the result into a validated
//! [`ResolvedRenderConfig`].

pub mod environment;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use encoding_rs::Encoding;
use serde::Deserialize;

use crate::error::{ViewError, ViewResult};
use scriptview_types::ScriptEngine;

pub use environment::ViewEnvironment;

pub const DEFAULT_CHARSET: &str = "UTF-8";
pub const DEFAULT_RESOURCE_LOADER_PATH: &str = "classpath:";

/// Script template settings; every field is optional until resolution.
#[derive(Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptTemplateConfig {
    /// Pre-built engine; excludes `engine_name`.
    #[serde(skip)]
    pub engine: Option<Arc<dyn ScriptEngine>>,
    pub engine_name: Option<String>,
    /// Bootstrap script locations, evaluated in order.
    pub scripts: Option<Vec<String>>,
    pub render_object: Option<String>,
    pub render_function: Option<String>,
    pub charset: Option<String>,
    pub content_type: Option<String>,
    /// Comma-separated search path for templates.
    pub resource_loader_path: Option<String>,
    pub shared_engine: Option<bool>,
}

impl ScriptTemplateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_str(content: &str) -> ViewResult<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| ViewError::config(format!("YAML parse error: {}", e)))
    }

    pub fn from_toml_str(content: &str) -> ViewResult<Self> {
        toml::from_str(content).map_err(|e| ViewError::config(format!("TOML parse error: {}", e)))
    }

    pub fn from_json_str(content: &str) -> ViewResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| ViewError::config(format!("JSON parse error: {}", e)))
    }

    /// Load from a `.yaml`/`.yml`, `.toml` or `.json` file.
    pub fn from_file(path: impl AsRef<Path>) -> ViewResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ViewError::config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            other => Err(ViewError::config(format!(
                "Unsupported configuration format: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }

    pub fn engine(mut self, engine: Arc<dyn ScriptEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn engine_name(mut self, name: impl Into<String>) -> Self {
        self.engine_name = Some(name.into());
        self
    }

    pub fn scripts<I, S>(mut self, scripts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scripts = Some(scripts.into_iter().map(Into::into).collect());
        self
    }

    pub fn render_object(mut self, render_object: impl Into<String>) -> Self {
        self.render_object = Some(render_object.into());
        self
    }

    pub fn render_function(mut self, render_function: impl Into<String>) -> Self {
        self.render_function = Some(render_function.into());
        self
    }

    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn resource_loader_path(mut self, path: impl Into<String>) -> Self {
        self.resource_loader_path = Some(path.into());
        self
    }

    pub fn shared_engine(mut self, shared: bool) -> Self {
        self.shared_engine = Some(shared);
        self
    }

    /// Fill every unset field from `fallback`.
    pub fn merged_with(&self, fallback: &ScriptTemplateConfig) -> ScriptTemplateConfig {
        ScriptTemplateConfig {
            engine: self.engine.clone().or_else(|| fallback.engine.clone()),
            engine_name: self.engine_name.clone().or_else(|| fallback.engine_name.clone()),
            scripts: self.scripts.clone().or_else(|| fallback.scripts.clone()),
            render_object: self
                .render_object
                .clone()
                .or_else(|| fallback.render_object.clone()),
            render_function: self
                .render_function
                .clone()
                .or_else(|| fallback.render_function.clone()),
            charset: self.charset.clone().or_else(|| fallback.charset.clone()),
            content_type: self.content_type.clone().or_else(|| fallback.content_type.clone()),
            resource_loader_path: self
                .resource_loader_path
                .clone()
                .or_else(|| fallback.resource_loader_path.clone()),
            shared_engine: self.shared_engine.or(fallback.shared_engine),
        }
    }

    /// Validate and apply defaults.
    pub fn resolve(self) -> ViewResult<ResolvedRenderConfig> {
        let engine = match (self.engine, self.engine_name) {
            (Some(_), Some(_)) => {
                return Err(ViewError::config(
                    "You should define engine or engine_name properties, not both.",
                ))
            }
            (None, None) => {
                return Err(ViewError::config(
                    "No script engine found, please specify valid engine or engine_name properties.",
                ))
            }
            (Some(engine), None) => EngineSource::Instance(engine),
            (None, Some(name)) => EngineSource::Named(name),
        };

        if self.shared_engine == Some(false) && !matches!(engine, EngineSource::Named(_)) {
            return Err(ViewError::config(
                "When shared_engine is set to false, the script engine must be specified \
                 with engine_name, not engine.",
            ));
        }

        let render_function = self
            .render_function
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| ViewError::config("render_function property must be defined."))?;

        let label = self.charset.as_deref().unwrap_or(DEFAULT_CHARSET);
        let charset = Encoding::for_label(label.as_bytes())
            .ok_or_else(|| ViewError::config(format!("Unknown charset: {}", label)))?;

        // encoding_rs writes UTF-16 and replacement bodies as UTF-8.
        let output_charset = charset.output_encoding();
        let content_type = self
            .content_type
            .unwrap_or_else(|| format!("text/html;charset={}", output_charset.name()));

        Ok(ResolvedRenderConfig {
            engine,
            scripts: self.scripts.unwrap_or_default(),
            render_object: self.render_object.filter(|expr| !expr.trim().is_empty()),
            render_function,
            charset,
            output_charset,
            content_type,
            resource_loader_path: self
                .resource_loader_path
                .unwrap_or_else(|| DEFAULT_RESOURCE_LOADER_PATH.to_string()),
            shared_engine: self.shared_engine,
        })
    }
}

impl fmt::Debug for ScriptTemplateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptTemplateConfig")
            .field("engine", &self.engine.as_ref().map(|e| e.engine_name().to_string()))
            .field("engine_name", &self.engine_name)
            .field("scripts", &self.scripts)
            .field("render_object", &self.render_object)
            .field("render_function", &self.render_function)
            .field("charset", &self.charset)
            .field("content_type", &self.content_type)
            .field("resource_loader_path", &self.resource_loader_path)
            .field("shared_engine", &self.shared_engine)
            .finish()
    }
}

/// Where a view's engine comes from.
#[derive(Clone)]
pub enum EngineSource {
    Instance(Arc<dyn ScriptEngine>),
    Named(String),
}

impl fmt::Debug for EngineSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineSource::Instance(engine) => {
                f.debug_tuple("Instance").field(&engine.engine_name()).finish()
            }
            EngineSource::Named(name) => f.debug_tuple("Named").field(name).finish(),
        }
    }
}

/// Validated render settings.
#[derive(Debug, Clone)]
pub struct ResolvedRenderConfig {
    pub engine: EngineSource,
    pub scripts: Vec<String>,
    pub render_object: Option<String>,
    pub render_function: String,
    /// Encoding templates and scripts are read with.
    pub charset: &'static Encoding,
    /// Encoding the response body is written with.
    pub output_charset: &'static Encoding,
    pub content_type: String,
    pub resource_loader_path: String,
    pub shared_engine: Option<bool>,
}

impl ResolvedRenderConfig {
    /// Only an explicit `false` disables sharing.
    pub fn is_shared(&self) -> bool {
        self.shared_engine != Some(false)
    }
}
