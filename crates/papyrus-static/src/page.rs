//! Markdown pages with YAML frontmatter.

use pulldown_cmark::{html, Event, Options, Parser, Tag, TagEnd};
use serde::Deserialize;

use crate::templates::TocEntry;

/// Template used when a page does not name one.
pub const DEFAULT_TEMPLATE: &str = "page.html";

/// Parsed frontmatter from a page.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Frontmatter {
    /// Page title (required)
    pub title: String,

    /// Page description for SEO
    #[serde(default)]
    pub description: Option<String>,

    /// Template to render the page with
    #[serde(default)]
    pub template: Option<String>,

    /// Order in navigation (lower = first)
    #[serde(default)]
    pub order: Option<i32>,

    /// Whether to show in navigation
    #[serde(default = "default_true")]
    pub nav: bool,

    /// Custom slug override
    #[serde(default)]
    pub slug: Option<String>,
}

fn default_true() -> bool {
    true
}

/// A parsed page.
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// Parsed frontmatter (if present)
    pub frontmatter: Option<Frontmatter>,

    /// Markdown content (without frontmatter)
    pub content: String,

    /// Table of contents entries
    pub toc: Vec<TocEntry>,
}

impl ParsedPage {
    /// Template this page should be rendered with.
    pub fn template(&self) -> &str {
        self.frontmatter
            .as_ref()
            .and_then(|f| f.template.as_deref())
            .unwrap_or(DEFAULT_TEMPLATE)
    }
}

/// Errors that can occur when parsing a page.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("Unclosed frontmatter block - missing closing ---")]
    Unclosed,

    #[error("Invalid YAML in frontmatter: {0}")]
    InvalidYaml(String),
}

/// Extract frontmatter from page source.
///
/// Returns the parsed frontmatter and the remaining content after the frontmatter block.
pub fn extract_frontmatter(source: &str) -> Result<(Option<Frontmatter>, &str), PageError> {
    let trimmed = source.trim_start();

    if !trimmed.starts_with("---") {
        return Ok((None, source));
    }

    let after_open = &trimmed[3..];
    let Some(close_pos) = after_open.find("\n---") else {
        return Err(PageError::Unclosed);
    };

    let yaml_content = after_open[..close_pos].trim();
    let remaining = &after_open[close_pos + 4..];

    let frontmatter: Frontmatter =
        serde_yaml::from_str(yaml_content).map_err(|e| PageError::InvalidYaml(e.to_string()))?;

    Ok((Some(frontmatter), remaining.trim_start()))
}

/// Parse a page: frontmatter plus a table of contents built from its headings.
pub fn parse_page(source: &str) -> Result<ParsedPage, PageError> {
    let (frontmatter, content) = extract_frontmatter(source)?;

    let mut toc = Vec::new();
    let mut current_heading: Option<(u8, String)> = None;

    for event in Parser::new_ext(content, markdown_options()) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                current_heading = Some((level as u8, String::new()));
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, heading_text)) = current_heading.as_mut() {
                    heading_text.push_str(&text);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, title)) = current_heading.take() {
                    let id = slugify(&title);
                    toc.push(TocEntry { title, id, level });
                }
            }
            _ => {}
        }
    }

    Ok(ParsedPage {
        frontmatter,
        content: content.to_string(),
        toc,
    })
}

/// Render markdown to HTML. Headings get the same ids as the table of contents.
pub fn render_markdown(content: &str) -> String {
    let mut heading: Option<String> = None;
    let mut events = Vec::new();

    for event in Parser::new_ext(content, markdown_options()) {
        match event {
            Event::Start(Tag::Heading { .. }) => {
                heading = Some(String::new());
                events.push(event);
            }
            Event::Text(ref text) | Event::Code(ref text) if heading.is_some() => {
                if let Some(h) = heading.as_mut() {
                    h.push_str(text);
                }
                events.push(event);
            }
            Event::End(TagEnd::Heading(_)) => {
                let title = heading.take().unwrap_or_default();
                patch_heading_id(&mut events, slugify(&title));
                events.push(event);
            }
            _ => events.push(event),
        }
    }

    let mut html_output = String::new();
    html::push_html(&mut html_output, events.into_iter());
    html_output
}

/// Give the most recent heading start an id, unless the author set one.
fn patch_heading_id(events: &mut [Event<'_>], id: String) {
    let start = events
        .iter_mut()
        .rev()
        .find(|e| matches!(e, Event::Start(Tag::Heading { .. })));
    if let Some(Event::Start(Tag::Heading { id: slot, .. })) = start {
        if slot.is_none() {
            *slot = Some(id.into());
        }
    }
}

fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
}

/// Convert a heading to a URL-safe slug.
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else if c.is_whitespace() || c == '-' || c == '_' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|c| *c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_valid_frontmatter() {
        let source = r#"---
title: Install
description: Getting papyrus onto your machine
template: guide.html
order: 1
---

# Install
"#;

        let (fm, content) = extract_frontmatter(source).unwrap();
        let fm = fm.unwrap();

        assert_eq!(fm.title, "Install");
        assert_eq!(fm.template.as_deref(), Some("guide.html"));
        assert_eq!(fm.order, Some(1));
        assert!(fm.nav);
        assert!(content.starts_with("# Install"));
    }

    #[test]
    fn handles_no_frontmatter() {
        let source = "# Just Markdown\n\nNo frontmatter here.";

        let page = parse_page(source).unwrap();

        assert!(page.frontmatter.is_none());
        assert_eq!(page.template(), DEFAULT_TEMPLATE);
        assert_eq!(page.toc.len(), 1);
        assert_eq!(page.toc[0].title, "Just Markdown");
    }

    #[test]
    fn errors_on_unclosed_frontmatter() {
        let result = extract_frontmatter("---\ntitle: Test\n# No closing");
        assert!(matches!(result, Err(PageError::Unclosed)));
    }

    #[test]
    fn errors_on_invalid_yaml() {
        let result = extract_frontmatter("---\ntitle: [invalid yaml\n---\n");
        assert!(matches!(result, Err(PageError::InvalidYaml(_))));
    }

    #[test]
    fn builds_toc_from_headings() {
        let page = parse_page("# Config\n\ntext\n\n## The `insert_before` key\n").unwrap();

        assert_eq!(page.toc.len(), 2);
        assert_eq!(page.toc[1].title, "The insert_before key");
        assert_eq!(page.toc[1].id, "the-insert-before-key");
        assert_eq!(page.toc[1].level, 2);
    }

    #[test]
    fn rendered_headings_carry_toc_ids() {
        let html = render_markdown("# Hello World\n\nBody text.");
        assert!(html.contains(r#"<h1 id="hello-world">Hello World</h1>"#));
        assert!(html.contains("<p>Body text.</p>"));
    }

    #[test]
    fn slugify_works() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Button (Primary)"), "button-primary");
        assert_eq!(slugify("  Multiple   Spaces  "), "multiple-spaces");
    }
}
