//! Template debug toolbar for papyrus sites.
//!
//! When enabled, every rendered page gets a panel listing:
//!
//! - every template the page pulled in through `include`, `extends`,
//!   `import` or `from`, recursively, in load order;
//! - for each of them, the template and line that referenced it;
//! - the full path of each template file;
//! - the context each template was rendered with.
//!
//! The panel is inserted before the configured marker, `</body>` by default.

pub mod config;
mod instrument;
pub mod loader;
pub mod origin;
pub mod toolbar;

use std::sync::Arc;

use papyrus_static::{BuiltinTemplateLoader, TemplateBridge, TemplateSource};

pub use config::DetectiveConfig;
pub use loader::{DebugTemplateLoader, LoadHistoryEntry, RenderSession};
pub use origin::{find_parent_template, TemplateOrigin};
pub use toolbar::TOOLBAR_TEMPLATE_NAME;

/// Pick the template bridge for a build.
///
/// Returns the debugging bridge when the toolbar is enabled and the stock
/// loader otherwise.
pub fn template_bridge(config: &DetectiveConfig, source: TemplateSource) -> Arc<dyn TemplateBridge> {
    if config.enabled {
        tracing::info!(
            "Debug toolbar enabled, inserting before '{}'",
            config.insert_before
        );
        Arc::new(DebugTemplateLoader::new(source, config))
    } else {
        Arc::new(BuiltinTemplateLoader::new(source))
    }
}
