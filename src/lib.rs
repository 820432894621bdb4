//! # scriptview — Script Template Views
//!
//! `scriptview` renders web views through pluggable script engines. A view
//! loads its template text, hands it together with the model to a render
//! function living inside a script engine, and writes whatever that function
//! returns as the response body.
//!
//! - **Pluggable engines**: engines implement [`ScriptEngine`] and are looked
//!   up by name through a [`ScriptEngineManager`]. A JavaScript engine backed
//!   by Boa ships in the box.
//! - **Bootstrap scripts**: libraries and render functions are loaded into
//!   every engine before its first render.
//! - **Shared or per-context engines**: one engine for the whole process, or
//!   one per [`RenderContext`] for engines that must not be shared.
//! - **Resource loading**: `classpath:` / `file:` locations, search-path
//!   assembly, in-memory resources.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use scriptview::{
//!     DefaultResourceLoader, RenderContext, ScriptTemplateConfig, ScriptTemplateView,
//!     ViewEnvironment,
//! };
//!
//! let loader = DefaultResourceLoader::new(["resources"]);
//! let env = ViewEnvironment::new(Arc::new(loader)).with_template_config(
//!     ScriptTemplateConfig::new()
//!         .engine_name("javascript")
//!         .scripts(["render.js"])
//!         .render_function("render"),
//! );
//! let view = ScriptTemplateView::builder("templates/index.html")
//!     .build(&env)
//!     .unwrap();
//! let response = view.render(&RenderContext::new(), &HashMap::new()).unwrap();
//! println!("{}", response.text());
//! ```
//!
//! # Feature Flags
//!
//! | Flag | Description |
//! |------|-------------|
//! | `builtin-engine-js` | Registers the JavaScript engine (Boa) under `javascript`, `js`, `ecmascript`, `boa` |

pub mod config;
pub mod engine;
pub mod error;
pub mod resource;
pub mod testing;
pub mod view;

pub use crate::config::{
    EngineSource, ResolvedRenderConfig, ScriptTemplateConfig, ViewEnvironment,
};
pub use crate::engine::{
    ContextId, EngineProvider, RenderContext, ScriptBootstrap, ScriptEngine,
    ScriptEngineFactory, ScriptEngineManager, ScriptError,
};
pub use crate::error::{ViewError, ViewResult};
pub use crate::resource::{
    DefaultResourceLoader, InMemoryResourceLoader, Resource, ResourceLoader,
    SearchPathResourceLoader,
};
pub use crate::view::{
    RenderedResponse, ResponseSink, ScriptTemplateView, ScriptTemplateViewBuilder,
    ScriptTemplateViewResolver,
};
