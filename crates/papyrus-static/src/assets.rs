//! Stylesheet generation for the default theme.

/// Asset pipeline utilities.
pub struct AssetPipeline;

impl AssetPipeline {
    /// Generate the main CSS file.
    pub fn generate_css() -> String {
        DEFAULT_CSS.to_string()
    }

    /// Minify CSS using lightningcss.
    pub fn minify_css(css: &str) -> Result<String, String> {
        use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

        let stylesheet = StyleSheet::parse(css, ParserOptions::default())
            .map_err(|e| format!("CSS parse error: {}", e))?;

        let minified = stylesheet
            .to_css(PrinterOptions {
                minify: true,
                ..Default::default()
            })
            .map_err(|e| format!("CSS minify error: {}", e))?;

        Ok(minified.code)
    }
}

const DEFAULT_CSS: &str = r#"/* papyrus default theme */

:root {
  --sidebar-width: 260px;
  --toc-width: 200px;
  --content-max-width: 780px;
  --background: #ffffff;
  --foreground: #1f2328;
  --muted: #f6f8fa;
  --muted-foreground: #59636e;
  --border: #d1d9e0;
  --primary: #0969da;
  --primary-foreground: #ffffff;
}

* {
  box-sizing: border-box;
}

body {
  margin: 0;
  font-family: system-ui, -apple-system, sans-serif;
  background: var(--background);
  color: var(--foreground);
  line-height: 1.6;
}

.layout {
  display: grid;
  grid-template-columns: var(--sidebar-width) 1fr var(--toc-width);
  min-height: 100vh;
}

.sidebar {
  background: var(--muted);
  border-right: 1px solid var(--border);
  padding: 1.5rem;
  position: sticky;
  top: 0;
  height: 100vh;
  overflow-y: auto;
}

.nav-logo {
  font-weight: 700;
  font-size: 1.2rem;
  color: var(--foreground);
  text-decoration: none;
}

.nav-list,
.nav-children {
  list-style: none;
  padding-left: 0;
}

.nav-children {
  margin-left: 1rem;
}

.nav-item a {
  display: block;
  padding: 0.35rem 0.6rem;
  color: var(--muted-foreground);
  text-decoration: none;
  border-radius: 0.375rem;
}

.nav-item.active > a {
  background: var(--primary);
  color: var(--primary-foreground);
}

.main {
  padding: 2rem 3rem;
  max-width: var(--content-max-width);
}

.doc pre {
  background: var(--muted);
  border: 1px solid var(--border);
  border-radius: 0.375rem;
  padding: 1rem;
  overflow-x: auto;
}

.toc {
  padding: 2rem 1rem;
  font-size: 0.875rem;
}

.toc ul {
  list-style: none;
  padding-left: 0;
}

.toc-level-3 {
  padding-left: 1rem;
}
"#;
