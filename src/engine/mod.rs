//! Script engine lookup and provisioning.
//!
//! - [`ScriptEngineManager`] — name → factory registry.
//! - [`RenderContext`] — explicit execution context keying per-context engines.
//! - [`EngineProvider`] — shared or per-context engine cache with bootstrap
//!   script loading.

pub mod context;
pub mod manager;
pub mod provider;

pub use context::{ContextId, RenderContext};
pub use manager::ScriptEngineManager;
pub use provider::{EngineProvider, ScriptBootstrap};

pub use scriptview_types::{ScriptEngine, ScriptEngineFactory, ScriptError};
