//! Static site build command.

use std::path::PathBuf;

use anyhow::Result;
use papyrus_detective::config::ENABLED_ENV;
use papyrus_static::{BuildConfig, StaticBuilder, TemplateSource};

use crate::config::Project;

/// Command-line overrides for a build.
#[derive(Debug, Default)]
pub struct BuildOptions {
    pub output: Option<PathBuf>,
    pub minify: Option<bool>,
    pub debug_toolbar: bool,
    pub jobs: Option<usize>,
}

/// Run the build command.
pub async fn run(project: &Project, options: BuildOptions) -> Result<()> {
    tracing::info!("Building site...");

    let site = &project.config.site;
    let build = &project.config.build;

    let mut detective = project
        .config
        .detective
        .clone()
        .with_env_override(std::env::var(ENABLED_ENV).ok().as_deref());
    detective.enabled |= options.debug_toolbar;

    let config = BuildConfig {
        source_dir: project.resolve(&site.source),
        output_dir: options
            .output
            .unwrap_or_else(|| project.resolve(&site.output)),
        minify: options.minify.unwrap_or(build.minify),
        base_url: site.base_url.clone(),
        title: site.title.clone(),
        keep_going: build.keep_going,
        jobs: options.jobs.or(build.jobs),
    };

    let templates = TemplateSource::new(
        site.templates_path
            .iter()
            .map(|p| project.resolve(p))
            .collect(),
    );
    let bridge = papyrus_detective::template_bridge(&detective, templates);

    let result = StaticBuilder::new(config, bridge).build().await?;

    tracing::info!("Built {} pages in {}ms", result.pages, result.duration_ms);
    tracing::info!("Output: {}", result.output_dir.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn builds_with_debug_toolbar() {
        let temp = tempdir().unwrap();
        write(
            &temp.path().join("papyrus.toml"),
            "[site]\ntitle = \"Papyrus\"\ntemplates_path = [\"_templates\"]\n",
        );
        write(&temp.path().join("source/index.md"), "---\ntitle: Home\n---\n# Home\n");
        write(
            &temp.path().join("_templates/nav.html"),
            "<p class=\"custom-nav\">{{ site_title }}</p>",
        );

        let project = Project::load(&temp.path().join("papyrus.toml")).unwrap();
        run(
            &project,
            BuildOptions {
                debug_toolbar: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let html = fs::read_to_string(temp.path().join("build/index.html")).unwrap();
        assert!(html.contains("custom-nav"));
        assert!(html.contains(r#"<div id="papyrus-detective">"#));
        assert!(html.contains("<code>nav.html</code>"));
    }

    #[tokio::test]
    async fn output_override() {
        let temp = tempdir().unwrap();
        write(&temp.path().join("source/index.md"), "# Home\n");
        let out = temp.path().join("public");

        let project = Project::load(&temp.path().join("papyrus.toml")).unwrap();
        run(
            &project,
            BuildOptions {
                output: Some(out.clone()),
                minify: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(out.join("index.html").exists());
        let css = fs::read_to_string(out.join("assets/main.css")).unwrap();
        assert!(css.starts_with("/* papyrus default theme */"));
    }
}
