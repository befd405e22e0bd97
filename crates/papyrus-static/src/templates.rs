//! Template sources and the bridge used to render pages.
//!
//! A [`TemplateBridge`] is the seam between the site builder and whatever
//! renders its pages. The builder only ever asks for `render(name, context)`;
//! the default [`BuiltinTemplateLoader`] serves that from one shared
//! environment, while plugins may substitute their own bridge.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use minijinja::{Environment, ErrorKind, Value};

/// A navigation item.
#[derive(Debug, Clone, serde::Serialize)]
pub struct NavItem {
    /// Display title
    pub title: String,
    /// URL path
    pub path: String,
    /// Child items
    pub children: Vec<NavItem>,
    /// Whether this is the active page
    pub active: bool,
}

/// A table of contents entry.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TocEntry {
    /// Heading text
    pub title: String,
    /// Anchor ID
    pub id: String,
    /// Heading level (1-6)
    pub level: u8,
}

/// Context for rendering a page template.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Context {
    /// Page name, the source path without extension (`guide/install`)
    pub pagename: String,
    /// Page title
    pub title: String,
    /// Page description
    pub description: Option<String>,
    /// Site title
    pub site_title: String,
    /// Rendered content HTML
    pub content: String,
    /// Navigation items
    pub nav: Vec<NavItem>,
    /// Table of contents
    pub toc: Vec<TocEntry>,
    /// Base URL
    pub base_url: String,
}

/// Errors raised while locating template sources.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Invalid template name: {0}")]
    InvalidName(String),

    #[error("Failed to read template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl From<TemplateError> for minijinja::Error {
    fn from(err: TemplateError) -> Self {
        let kind = match err {
            TemplateError::InvalidName(_) => ErrorKind::TemplateNotFound,
            TemplateError::Read { .. } => ErrorKind::InvalidOperation,
        };
        minijinja::Error::new(kind, "could not load template").with_source(err)
    }
}

/// A template source as returned by [`TemplateSource::load`].
#[derive(Debug, Clone)]
pub struct LoadedTemplate {
    /// Name the template was requested under
    pub name: String,
    /// Resolved file path, `None` for built-in templates
    pub path: Option<PathBuf>,
    /// Template source text
    pub source: String,
}

/// Where templates come from: an ordered list of directories, then the
/// built-in theme.
///
/// Files in the search paths shadow built-ins of the same name, so a site can
/// override `layout.html` while still getting the stock `nav.html`.
#[derive(Debug, Clone)]
pub struct TemplateSource {
    search_paths: Vec<PathBuf>,
    builtins: BTreeMap<String, String>,
}

impl TemplateSource {
    /// Create a source over the given directories plus the default theme.
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        let mut builtins = BTreeMap::new();
        for (name, source) in THEME {
            builtins.insert((*name).to_string(), (*source).to_string());
        }
        Self {
            search_paths,
            builtins,
        }
    }

    /// Register an additional built-in template.
    pub fn with_builtin(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.builtins.insert(name.into(), source.into());
        self
    }

    /// Load a template by name.
    ///
    /// Returns `Ok(None)` when no search path and no built-in provides it.
    pub fn load(&self, name: &str) -> Result<Option<LoadedTemplate>, TemplateError> {
        let relative = validate_name(name)?;

        for dir in &self.search_paths {
            let candidate = dir.join(relative);
            if !candidate.is_file() {
                continue;
            }
            let source = fs::read_to_string(&candidate).map_err(|source| TemplateError::Read {
                path: candidate.clone(),
                source,
            })?;
            let path = candidate.canonicalize().unwrap_or(candidate);
            tracing::trace!("Loaded template {} from {}", name, path.display());
            return Ok(Some(LoadedTemplate {
                name: name.to_string(),
                path: Some(path),
                source,
            }));
        }

        Ok(self.builtins.get(name).map(|source| LoadedTemplate {
            name: name.to_string(),
            path: None,
            source: source.clone(),
        }))
    }
}

/// Reject names that would escape the search paths.
fn validate_name(name: &str) -> Result<&Path, TemplateError> {
    let path = Path::new(name);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if name.is_empty() || escapes {
        return Err(TemplateError::InvalidName(name.to_string()));
    }
    Ok(path)
}

/// Renders named templates on behalf of the site builder.
pub trait TemplateBridge: Send + Sync {
    /// Render `name` against `context`.
    fn render(&self, name: &str, context: Value) -> Result<String, minijinja::Error>;
}

/// The default bridge: one environment shared by every page.
pub struct BuiltinTemplateLoader {
    env: Environment<'static>,
}

impl BuiltinTemplateLoader {
    /// Create a loader serving templates from `source`.
    pub fn new(source: TemplateSource) -> Self {
        let source = Arc::new(source);
        let mut env = Environment::new();
        env.set_loader(move |name| {
            Ok(source.load(name)?.map(|loaded| loaded.source))
        });
        Self { env }
    }
}

impl TemplateBridge for BuiltinTemplateLoader {
    fn render(&self, name: &str, context: Value) -> Result<String, minijinja::Error> {
        self.env.get_template(name)?.render(context)
    }
}

const LAYOUT_TEMPLATE: &str = r##"{% import "macros.html" as macros %}<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{{ title }} - {{ site_title }}</title>
  {% if description %}<meta name="description" content="{{ description }}">
  {% endif %}<link rel="stylesheet" href="{{ base_url }}assets/main.css">
</head>
<body>
  <div class="layout">
    <nav class="sidebar">
      {% include "nav.html" %}
    </nav>
    <main class="main">
      {% block content %}{% endblock %}
    </main>
    {{ macros.toc(toc) }}
  </div>
</body>
</html>
"##;

const PAGE_TEMPLATE: &str = r##"{% extends "layout.html" %}

{% block content %}
<article class="doc">
  {{ content | safe }}
</article>
{% endblock %}
"##;

const NAV_TEMPLATE: &str = r##"<div class="nav-header">
  <a href="{{ base_url }}" class="nav-logo">{{ site_title }}</a>
</div>
<ul class="nav-list">
{% for item in nav %}
  <li class="nav-item{% if item.active %} active{% endif %}">
    <a href="{{ item.path }}">{{ item.title }}</a>
    {% if item.children %}
    <ul class="nav-children">
      {% for child in item.children %}
      <li class="nav-item{% if child.active %} active{% endif %}">
        <a href="{{ child.path }}">{{ child.title }}</a>
      </li>
      {% endfor %}
    </ul>
    {% endif %}
  </li>
{% endfor %}
</ul>
"##;

const MACROS_TEMPLATE: &str = r##"{% macro toc(entries) %}
{% if entries %}
<aside class="toc">
  <h2>On this page</h2>
  <ul>
  {% for entry in entries %}
    <li class="toc-level-{{ entry.level }}"><a href="#{{ entry.id }}">{{ entry.title }}</a></li>
  {% endfor %}
  </ul>
</aside>
{% endif %}
{% endmacro %}
"##;

/// The default theme, served when no search path overrides a name.
const THEME: &[(&str, &str)] = &[
    ("layout.html", LAYOUT_TEMPLATE),
    ("page.html", PAGE_TEMPLATE),
    ("nav.html", NAV_TEMPLATE),
    ("macros.html", MACROS_TEMPLATE),
];
