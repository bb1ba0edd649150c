//! Rendering helpers for templates.

pub mod tags;

pub use tags::{AdminLinks, TemplateContext, TemplateTags};
