//! Script template views.
//!
//! - [`ScriptTemplateView`] — renders one template URL.
//! - [`ScriptTemplateViewResolver`] — maps view names to cached views.
//! - [`ResponseSink`] — where rendered output goes.

pub mod resolver;
pub mod response;
pub mod template_view;

pub use resolver::ScriptTemplateViewResolver;
pub use response::{RenderedResponse, ResponseSink};
pub use template_view::{ScriptTemplateView, ScriptTemplateViewBuilder};
