//! Template helpers for options, labels and texts.
//!
//! Each tag either returns its value for inline output or, given `as_var`,
//! stores it in the [`TemplateContext`] and returns an empty string. Lookup
//! failures render as empty strings so a missing record never breaks a page.

use std::collections::BTreeMap;
use std::sync::Arc;

use askama::Template;
use tracing::warn;
use uuid::Uuid;

use crate::application::lookup::LookupService;
use crate::domain::entities::TextContent;
use crate::domain::language::Language;
use crate::domain::types::{RecordKind, ValueKind};

const SOURCE: &str = "presentation::tags";
const DEFAULT_TITLE_VAR: &str = "title";
const DEFAULT_TEXT_VAR: &str = "text";

#[derive(Template)]
#[template(
    source = "{{ value|safe }} <a href='{{ href }}' target='_blank'>[Edit]</a>",
    ext = "html"
)]
struct EditLinkTemplate<'a> {
    value: &'a str,
    href: &'a str,
}

#[derive(Template)]
#[template(source = "<a href={{ href }}>Edit</a>", ext = "html")]
struct EditAnchorTemplate<'a> {
    href: &'a str,
}

/// Render state shared by the tags of one template.
#[derive(Debug, Clone)]
pub struct TemplateContext {
    language: Language,
    is_superuser: bool,
    vars: BTreeMap<String, String>,
}

impl TemplateContext {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            is_superuser: false,
            vars: BTreeMap::new(),
        }
    }

    pub fn with_superuser(mut self, is_superuser: bool) -> Self {
        self.is_superuser = is_superuser;
        self
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn is_superuser(&self) -> bool {
        self.is_superuser
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }
}

/// Builds admin change-page URLs.
#[derive(Debug, Clone)]
pub struct AdminLinks {
    prefix: String,
}

impl AdminLinks {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn change_url(&self, kind: RecordKind, id: Uuid) -> String {
        format!("{}/options/{}/{}/change/", self.prefix, kind, id)
    }
}

#[derive(Clone)]
pub struct TemplateTags {
    lookup: Arc<LookupService>,
    links: AdminLinks,
}

impl TemplateTags {
    pub fn new(lookup: Arc<LookupService>, links: AdminLinks) -> Self {
        Self { lookup, links }
    }

    pub async fn get_option(
        &self,
        ctx: &mut TemplateContext,
        key: &str,
        as_var: Option<&str>,
    ) -> String {
        let value = self.value_or_empty(ValueKind::Option, ctx.language(), key).await;
        emit(ctx, as_var, value)
    }

    pub async fn get_label(
        &self,
        ctx: &mut TemplateContext,
        key: &str,
        as_var: Option<&str>,
    ) -> String {
        let value = self.value_or_empty(ValueKind::Label, ctx.language(), key).await;
        emit(ctx, as_var, value)
    }

    /// Stores the title under `title_var` (default `title`); the text goes to
    /// `as_var` or is returned.
    pub async fn get_text(
        &self,
        ctx: &mut TemplateContext,
        key: &str,
        title_var: Option<&str>,
        as_var: Option<&str>,
    ) -> String {
        let content = self.text_or_empty(ctx.language(), key).await;
        ctx.set(title_var.unwrap_or(DEFAULT_TITLE_VAR), content.title);
        emit(ctx, as_var, content.text)
    }

    /// Mirror of [`get_text`](Self::get_text): the text goes to `text_var`
    /// (default `text`), the title is emitted.
    pub async fn get_text_title(
        &self,
        ctx: &mut TemplateContext,
        key: &str,
        text_var: Option<&str>,
        as_var: Option<&str>,
    ) -> String {
        let content = self.text_or_empty(ctx.language(), key).await;
        ctx.set(text_var.unwrap_or(DEFAULT_TEXT_VAR), content.text);
        emit(ctx, as_var, content.title)
    }

    /// Option with an admin link for superusers.
    ///
    /// With `edit_variable`, a bare `Edit` anchor is stored there instead and
    /// the tag returns `""`.
    pub async fn get_editable_option(
        &self,
        ctx: &mut TemplateContext,
        key: &str,
        as_var: Option<&str>,
        edit_variable: Option<&str>,
    ) -> String {
        let value = self.get_option(ctx, key, as_var).await;
        if !ctx.is_superuser() {
            return value;
        }
        let Some(href) = self.value_link(ValueKind::Option, key).await else {
            return value;
        };

        if let Some(edit_variable) = edit_variable {
            if let Some(anchor) = render_or_log(&EditAnchorTemplate { href: &href }) {
                ctx.set(edit_variable, anchor);
            }
            return String::new();
        }
        self.decorate(ctx, as_var, value, &href)
    }

    pub async fn get_editable_label(
        &self,
        ctx: &mut TemplateContext,
        key: &str,
        as_var: Option<&str>,
    ) -> String {
        let value = self.get_label(ctx, key, as_var).await;
        if !ctx.is_superuser() {
            return value;
        }
        match self.value_link(ValueKind::Label, key).await {
            Some(href) => self.decorate(ctx, as_var, value, &href),
            None => value,
        }
    }

    /// With `as_var`, both the title variable and `as_var` get the link.
    pub async fn get_editable_text(
        &self,
        ctx: &mut TemplateContext,
        key: &str,
        title_var: Option<&str>,
        as_var: Option<&str>,
    ) -> String {
        let text = self.get_text(ctx, key, title_var, as_var).await;
        if !ctx.is_superuser() {
            return text;
        }
        let Some(href) = self.text_link(key).await else {
            return text;
        };

        if as_var.is_some() {
            let title_var = title_var.unwrap_or(DEFAULT_TITLE_VAR);
            let title = ctx.get(title_var).unwrap_or_default().to_string();
            if let Some(linked) = edit_link(&title, &href) {
                ctx.set(title_var, linked);
            }
        }
        self.decorate(ctx, as_var, text, &href)
    }

    pub async fn get_editable_text_title(
        &self,
        ctx: &mut TemplateContext,
        key: &str,
        text_var: Option<&str>,
        as_var: Option<&str>,
    ) -> String {
        let title = self.get_text_title(ctx, key, text_var, as_var).await;
        if !ctx.is_superuser() {
            return title;
        }
        match self.text_link(key).await {
            Some(href) => self.decorate(ctx, as_var, title, &href),
            None => title,
        }
    }

    /// Append the edit link to the emitted value, or to `as_var` when set.
    fn decorate(
        &self,
        ctx: &mut TemplateContext,
        as_var: Option<&str>,
        emitted: String,
        href: &str,
    ) -> String {
        match as_var {
            Some(name) => {
                let stored = ctx.get(name).unwrap_or_default().to_string();
                if let Some(linked) = edit_link(&stored, href) {
                    ctx.set(name, linked);
                }
                emitted
            }
            None => edit_link(&emitted, href).unwrap_or(emitted),
        }
    }

    async fn value_or_empty(&self, kind: ValueKind, language: &Language, key: &str) -> String {
        let result = match kind {
            ValueKind::Option => self.lookup.get_option(language, key).await,
            ValueKind::Label => self.lookup.get_label(language, key).await,
        };
        result.unwrap_or_else(|err| {
            warn!(target = SOURCE, kind = kind.as_str(), key, error = %err, "Lookup failed in template");
            String::new()
        })
    }

    async fn text_or_empty(&self, language: &Language, key: &str) -> TextContent {
        self.lookup
            .get_text(language, key)
            .await
            .unwrap_or_else(|err| {
                warn!(target = SOURCE, kind = "text", key, error = %err, "Lookup failed in template");
                TextContent::default()
            })
    }

    async fn value_link(&self, kind: ValueKind, key: &str) -> Option<String> {
        match self.lookup.find_value_record(kind, key).await {
            Ok(Some(record)) => Some(self.links.change_url(kind.into(), record.id)),
            Ok(None) => None,
            Err(err) => {
                warn!(target = SOURCE, key, error = %err, "Edit link lookup failed");
                None
            }
        }
    }

    async fn text_link(&self, key: &str) -> Option<String> {
        match self.lookup.find_text_record(key).await {
            Ok(Some(record)) => Some(self.links.change_url(RecordKind::Text, record.id)),
            Ok(None) => None,
            Err(err) => {
                warn!(target = SOURCE, key, error = %err, "Edit link lookup failed");
                None
            }
        }
    }
}

fn emit(ctx: &mut TemplateContext, as_var: Option<&str>, value: String) -> String {
    match as_var {
        Some(name) => {
            ctx.set(name, value);
            String::new()
        }
        None => value,
    }
}

fn edit_link(value: &str, href: &str) -> Option<String> {
    render_or_log(&EditLinkTemplate { value, href })
}

fn render_or_log<T: Template>(template: &T) -> Option<String> {
    template
        .render()
        .map_err(|err| warn!(target = SOURCE, error = %err, "Edit link render failed"))
        .ok()
}
