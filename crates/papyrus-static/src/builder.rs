//! Static site builder.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use minijinja::Value;
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::assets::AssetPipeline;
use crate::page::{parse_page, render_markdown, Frontmatter, ParsedPage};
use crate::templates::{Context, NavItem, TemplateBridge};

/// Configuration for building a static site.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Source pages directory
    pub source_dir: PathBuf,

    /// Output directory
    pub output_dir: PathBuf,

    /// Minify CSS output
    pub minify: bool,

    /// Base URL for the site
    pub base_url: String,

    /// Site title
    pub title: String,

    /// Keep rendering remaining pages after one fails
    pub keep_going: bool,

    /// Number of render workers (defaults to rayon's choice)
    pub jobs: Option<usize>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("source"),
            output_dir: PathBuf::from("build"),
            minify: true,
            base_url: "/".to_string(),
            title: "Documentation".to_string(),
            keep_going: true,
            jobs: None,
        }
    }
}

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildResult {
    /// Number of pages generated
    pub pages: usize,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Errors that can occur during build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Failed to read source directory: {0}")]
    ReadError(String),

    #[error("Failed to parse page: {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Failed to render {page}: {message}")]
    TemplateError { page: String, message: String },

    #[error("Failed to write output: {0}")]
    WriteError(String),

    #[error("Failed to start render workers: {0}")]
    WorkerError(String),

    #[error("{0} page(s) failed to build")]
    PagesFailed(usize),
}

/// A page to be built.
#[derive(Debug)]
struct PageInfo {
    /// Source file path
    source_path: PathBuf,

    /// Relative path from the source dir
    relative_path: PathBuf,

    /// Output path
    output_path: PathBuf,

    /// Parsed page
    page: ParsedPage,
}

impl PageInfo {
    fn title(&self) -> String {
        self.page
            .frontmatter
            .as_ref()
            .map(|f| f.title.clone())
            .unwrap_or_else(|| {
                self.relative_path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("Untitled")
                    .to_string()
            })
    }

    /// Source path without extension, `/`-separated.
    fn pagename(&self) -> String {
        self.relative_path
            .with_extension("")
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Static site builder.
pub struct StaticBuilder {
    config: BuildConfig,
    bridge: Arc<dyn TemplateBridge>,
}

impl StaticBuilder {
    /// Create a new static builder rendering through `bridge`.
    pub fn new(config: BuildConfig, bridge: Arc<dyn TemplateBridge>) -> Self {
        Self { config, bridge }
    }

    /// Build the static site.
    pub async fn build(&self) -> Result<BuildResult, BuildError> {
        let start = Instant::now();

        fs::create_dir_all(&self.config.output_dir)
            .map_err(|e| BuildError::WriteError(e.to_string()))?;

        let pages = self.discover_pages()?;
        let nav = self.build_navigation(&pages);

        let results: Vec<Result<(), BuildError>> = match self.config.jobs {
            Some(jobs) => rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build()
                .map_err(|e| BuildError::WorkerError(e.to_string()))?
                .install(|| self.render_all(&pages, &nav)),
            None => self.render_all(&pages, &nav),
        };

        let mut built = 0;
        let mut failed = 0;
        for result in results {
            match result {
                Ok(()) => built += 1,
                Err(e) if self.config.keep_going => {
                    tracing::error!("{}", e);
                    failed += 1;
                }
                Err(e) => return Err(e),
            }
        }
        if failed > 0 {
            return Err(BuildError::PagesFailed(failed));
        }

        self.generate_assets()?;

        Ok(BuildResult {
            pages: built,
            duration_ms: start.elapsed().as_millis() as u64,
            output_dir: self.config.output_dir.clone(),
        })
    }

    fn render_all(&self, pages: &[PageInfo], nav: &[NavItem]) -> Vec<Result<(), BuildError>> {
        pages
            .par_iter()
            .map(|page| self.build_page(page, nav))
            .collect()
    }

    /// Discover all markdown pages in the source directory.
    fn discover_pages(&self) -> Result<Vec<PageInfo>, BuildError> {
        let mut pages = Vec::new();

        if !self.config.source_dir.exists() {
            return Err(BuildError::ReadError(format!(
                "Source directory not found: {}",
                self.config.source_dir.display()
            )));
        }

        for entry in WalkDir::new(&self.config.source_dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| {
                entry
                    .map_err(|e| tracing::warn!("Skipping unreadable path: {}", e))
                    .ok()
            })
        {
            let path = entry.path();

            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }

            let content = fs::read_to_string(path)
                .map_err(|e| BuildError::ReadError(format!("{}: {}", path.display(), e)))?;

            let page = parse_page(&content).map_err(|e| BuildError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

            let relative_path = path
                .strip_prefix(&self.config.source_dir)
                .unwrap_or(path)
                .to_path_buf();

            let output_path = self.calculate_output_path(&relative_path, &page.frontmatter);

            pages.push(PageInfo {
                source_path: path.to_path_buf(),
                relative_path,
                output_path,
                page,
            });
        }

        // Stable, so equal orders keep file name order
        pages.sort_by_key(|p| {
            p.page
                .frontmatter
                .as_ref()
                .and_then(|f| f.order)
                .unwrap_or(999)
        });

        tracing::debug!("Discovered {} pages", pages.len());
        Ok(pages)
    }

    /// Calculate output path for a page.
    fn calculate_output_path(&self, relative: &Path, frontmatter: &Option<Frontmatter>) -> PathBuf {
        if let Some(slug) = frontmatter.as_ref().and_then(|f| f.slug.as_ref()) {
            return self.config.output_dir.join(slug).join("index.html");
        }

        let stem = relative
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("index");
        let parent = relative.parent().unwrap_or(Path::new(""));

        if stem == "index" {
            // source/index.md -> build/index.html
            self.config.output_dir.join(parent).join("index.html")
        } else {
            // source/install.md -> build/install/index.html
            self.config
                .output_dir
                .join(parent)
                .join(stem)
                .join("index.html")
        }
    }

    /// Build navigation structure from pages.
    fn build_navigation(&self, pages: &[PageInfo]) -> Vec<NavItem> {
        let mut nav = Vec::new();
        let mut dirs: BTreeMap<PathBuf, Vec<NavItem>> = BTreeMap::new();

        for page in pages {
            if page.page.frontmatter.as_ref().is_some_and(|f| !f.nav) {
                continue;
            }

            let item = NavItem {
                title: page.title(),
                path: self.path_to_url(&page.output_path),
                children: Vec::new(),
                active: false,
            };

            let parent = page.relative_path.parent().unwrap_or(Path::new(""));
            dirs.entry(parent.to_path_buf()).or_default().push(item);
        }

        if let Some(root_items) = dirs.remove(&PathBuf::new()) {
            nav.extend(root_items);
        }

        for (dir, items) in dirs {
            let dir_name = dir
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("Section");

            nav.push(NavItem {
                title: capitalize(dir_name),
                path: format!("{}{}/", self.config.base_url, dir.display()),
                children: items,
                active: false,
            });
        }

        nav
    }

    /// Convert output path to URL.
    fn path_to_url(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.config.output_dir).unwrap_or(path);

        let url = relative
            .parent()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default();

        if url.is_empty() {
            self.config.base_url.clone()
        } else {
            format!("{}{}/", self.config.base_url, url)
        }
    }

    /// Build a single page.
    fn build_page(&self, page: &PageInfo, nav: &[NavItem]) -> Result<(), BuildError> {
        let url = self.path_to_url(&page.output_path);

        let context = Context {
            pagename: page.pagename(),
            title: page.title(),
            description: page
                .page
                .frontmatter
                .as_ref()
                .and_then(|f| f.description.clone()),
            site_title: self.config.title.clone(),
            content: render_markdown(&page.page.content),
            nav: mark_active(nav, &url),
            toc: page.page.toc.clone(),
            base_url: self.config.base_url.clone(),
        };

        let template = page.page.template();
        tracing::debug!(
            "Rendering {} with {}",
            page.source_path.display(),
            template
        );

        let html = self
            .bridge
            .render(template, Value::from_serialize(&context))
            .map_err(|e| BuildError::TemplateError {
                page: page.source_path.display().to_string(),
                message: format!("{:#}", e),
            })?;

        if let Some(parent) = page.output_path.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::WriteError(e.to_string()))?;
        }
        fs::write(&page.output_path, html).map_err(|e| BuildError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Generate static assets.
    fn generate_assets(&self) -> Result<(), BuildError> {
        let assets_dir = self.config.output_dir.join("assets");
        fs::create_dir_all(&assets_dir).map_err(|e| BuildError::WriteError(e.to_string()))?;

        let css = AssetPipeline::generate_css();
        let css = if self.config.minify {
            AssetPipeline::minify_css(&css).unwrap_or_else(|e| {
                tracing::warn!("Skipping CSS minification: {}", e);
                css
            })
        } else {
            css
        };
        fs::write(assets_dir.join("main.css"), css)
            .map_err(|e| BuildError::WriteError(e.to_string()))?;

        Ok(())
    }
}

/// Copy of `nav` with the item at `url` marked active.
fn mark_active(nav: &[NavItem], url: &str) -> Vec<NavItem> {
    nav.iter()
        .map(|item| NavItem {
            title: item.title.clone(),
            path: item.path.clone(),
            children: mark_active(&item.children, url),
            active: item.path == url,
        })
        .collect()
}

/// Capitalize first letter of a string.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::{BuiltinTemplateLoader, TemplateSource};
    use tempfile::tempdir;
    use tracing_test::traced_test;

    fn builder(source: PathBuf, output: PathBuf, templates: Vec<PathBuf>) -> StaticBuilder {
        let config = BuildConfig {
            source_dir: source,
            output_dir: output,
            ..Default::default()
        };
        let bridge = BuiltinTemplateLoader::new(TemplateSource::new(templates));
        StaticBuilder::new(config, Arc::new(bridge))
    }

    #[tokio::test]
    async fn builds_simple_site() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("source");
        let out = temp.path().join("build");

        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("index.md"), "---\ntitle: Home\n---\n# Welcome\n").unwrap();

        let result = builder(source, out.clone(), vec![]).build().await.unwrap();

        assert_eq!(result.pages, 1);
        assert!(out.join("index.html").exists());
        assert!(out.join("assets/main.css").exists());

        let html = fs::read_to_string(out.join("index.html")).unwrap();
        assert!(html.contains("<title>Home - Documentation</title>"));
        assert!(html.contains(r#"<h1 id="welcome">Welcome</h1>"#));
    }

    #[tokio::test]
    async fn nested_pages_get_directories() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("source");
        let out = temp.path().join("build");

        fs::create_dir_all(source.join("guide")).unwrap();
        fs::write(source.join("index.md"), "# Home").unwrap();
        fs::write(
            source.join("guide/install.md"),
            "---\ntitle: Install\n---\n# Install",
        )
        .unwrap();

        let result = builder(source, out.clone(), vec![]).build().await.unwrap();

        assert_eq!(result.pages, 2);
        assert!(out.join("guide/install/index.html").exists());

        let home = fs::read_to_string(out.join("index.html")).unwrap();
        assert!(home.contains("Guide"));
        assert!(home.contains(">Install</a>"));
    }

    #[tokio::test]
    async fn honours_template_frontmatter() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("source");
        let templates = temp.path().join("templates");
        let out = temp.path().join("build");

        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&templates).unwrap();
        fs::write(
            templates.join("bare.html"),
            "<main data-page=\"{{ pagename }}\">{{ content | safe }}</main>",
        )
        .unwrap();
        fs::write(
            source.join("about.md"),
            "---\ntitle: About\ntemplate: bare.html\n---\nHello",
        )
        .unwrap();

        builder(source, out.clone(), vec![templates])
            .build()
            .await
            .unwrap();

        let html = fs::read_to_string(out.join("about/index.html")).unwrap();
        assert_eq!(html, "<main data-page=\"about\"><p>Hello</p>\n</main>");
    }

    #[tokio::test]
    async fn keep_going_reports_failed_pages() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("source");
        let out = temp.path().join("build");

        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("good.md"), "# Good").unwrap();
        fs::write(
            source.join("bad.md"),
            "---\ntitle: Bad\ntemplate: missing.html\n---\n# Bad",
        )
        .unwrap();

        let err = builder(source, out.clone(), vec![]).build().await.unwrap_err();

        assert!(matches!(err, BuildError::PagesFailed(1)));
        assert!(out.join("good/index.html").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    #[traced_test]
    async fn unreadable_entries_are_logged_and_skipped() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("source");
        let out = temp.path().join("build");

        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("index.md"), "# Home").unwrap();
        std::os::unix::fs::symlink(source.join("gone.md"), source.join("dangling.md")).unwrap();

        let result = builder(source, out, vec![]).build().await.unwrap();

        assert_eq!(result.pages, 1);
        assert!(logs_contain("Skipping unreadable path"));
        assert!(logs_contain("dangling.md"));
    }

    #[tokio::test]
    async fn missing_source_dir_is_an_error() {
        let temp = tempdir().unwrap();
        let err = builder(temp.path().join("nope"), temp.path().join("out"), vec![])
            .build()
            .await
            .unwrap_err();

        assert!(matches!(err, BuildError::ReadError(_)));
    }

    #[test]
    fn marks_active_nav_items() {
        let nav = vec![NavItem {
            title: "Guide".to_string(),
            path: "/guide/".to_string(),
            children: vec![NavItem {
                title: "Install".to_string(),
                path: "/guide/install/".to_string(),
                children: vec![],
                active: false,
            }],
            active: false,
        }];

        let marked = mark_active(&nav, "/guide/install/");

        assert!(!marked[0].active);
        assert!(marked[0].children[0].active);
    }
}
