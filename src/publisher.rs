//! Publisher Layer
//!
//! Sinks that receive the full metric set after every sampling pass.
//!
//! - [`Publisher`]: Core trait for delivering a metric set
//! - [`TextPublisher`]: A [`Render`]er plus an [`OutputTarget`] (stdout, overwrite, append)
//! - [`NiceTable`], [`Json`], [`TemplateRender`]: text renderers
//! - [`SqlTablePublisher`]: One parameterized insert per publish

mod json;
pub mod sql;
mod table;
mod target;
pub mod template;
mod traits;

pub use json::Json;
pub use sql::SqlTablePublisher;
pub use table::NiceTable;
pub use target::{OutputTarget, TextPublisher};
pub use template::{PublisherDefinition, TemplateRender};
pub use traits::{PublishError, Publisher, Render};
