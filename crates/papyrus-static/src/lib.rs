//! Static site generator for papyrus documentation.
//!
//! Renders a directory of markdown pages through a Jinja theme. Pages are
//! rendered through a [`TemplateBridge`], which lets plugins observe or
//! replace template rendering without the builder knowing about them.

pub mod assets;
pub mod builder;
pub mod page;
pub mod templates;

pub use builder::{BuildConfig, BuildError, BuildResult, StaticBuilder};
pub use page::{parse_page, Frontmatter, PageError, ParsedPage};
pub use templates::{
    BuiltinTemplateLoader, Context, LoadedTemplate, TemplateBridge, TemplateError, TemplateSource,
};
