//! The debugging template bridge.
//!
//! [`DebugTemplateLoader`] stands in for the builder's stock bridge. Each
//! page render runs in its own [`RenderSession`], whose environment loader
//! records every template it hands out and splices the session hooks into its
//! source. The hooks keep the stack of executing templates current and
//! capture the context each template runs with. Once the page is rendered the
//! recorded history is rendered through the toolbar template and spliced into
//! the page.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use minijinja::{Environment, State, Value};
use papyrus_static::{LoadedTemplate, TemplateBridge, TemplateSource};

use crate::config::DetectiveConfig;
use crate::instrument::{instrument, ENTER_HOOK, FRAME_HOOK};
use crate::origin::{find_parent_template, Frame, TemplateOrigin};
use crate::toolbar::{
    insert_before, resolve_path, toolbar_context, TOOLBAR_TEMPLATE, TOOLBAR_TEMPLATE_NAME,
};

/// Config key named in the missing-marker warning.
const INSERT_BEFORE_KEY: &str = "detective.insert_before";

/// A template loaded during a render, and what loaded it.
#[derive(Debug, Clone)]
pub struct LoadHistoryEntry {
    /// Name the template was requested under
    pub name: String,
    /// Resolved path, `None` for built-in templates
    pub path: Option<PathBuf>,
    /// Where the template was referenced from, `None` for the root template
    /// or when attribution failed
    pub origin: Option<TemplateOrigin>,
    /// Variables visible when the template first started executing
    pub context: Option<Value>,
}

#[derive(Debug, Default)]
struct SessionState {
    /// Frames of every template loaded so far, by name
    loaded: HashMap<String, Frame>,
    /// Templates executing right now, outermost first
    stack: Vec<Frame>,
    history: Vec<LoadHistoryEntry>,
}

impl SessionState {
    /// Record a load and return the source to compile.
    fn record(&mut self, template: LoadedTemplate) -> String {
        // The toolbar never lists itself.
        if template.name == TOOLBAR_TEMPLATE_NAME {
            return template.source;
        }

        let origin = if self.history.is_empty() {
            None
        } else {
            find_parent_template(&self.stack, &template.name)
        };

        match &origin {
            Some(o) => tracing::debug!(
                "Loaded {} ({} at {}:{})",
                template.name,
                o.kind,
                o.name,
                o.lineno
            ),
            None => tracing::debug!("Loaded {}", template.name),
        }

        let frame = Frame::new(&template);
        let source = instrument(&template.source, frame.references());
        self.loaded.insert(template.name.clone(), frame);
        self.history.push(LoadHistoryEntry {
            name: template.name,
            path: template.path,
            origin,
            context: None,
        });
        source
    }

    /// `name` is executing: drop the frames of templates that finished since
    /// it last ran, or push its frame if it just started.
    fn sync(&mut self, name: &str) {
        if let Some(pos) = self.stack.iter().rposition(|f| f.name() == name) {
            self.stack.truncate(pos + 1);
        } else if let Some(frame) = self.loaded.get(name) {
            self.stack.push(frame.clone());
        }
    }

    /// `name` started executing; keep the first context it ran with.
    fn enter(&mut self, name: &str, context: impl FnOnce() -> Value) {
        self.sync(name);
        let entry = self
            .history
            .iter_mut()
            .find(|e| e.name == name && e.context.is_none());
        if let Some(entry) = entry {
            entry.context = Some(context());
        }
    }
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Template bridge that annotates every page with a debug toolbar.
pub struct DebugTemplateLoader {
    source: Arc<TemplateSource>,
    insert_before: String,
}

impl DebugTemplateLoader {
    /// Wrap `source`, adding the toolbar template to it.
    pub fn new(source: TemplateSource, config: &DetectiveConfig) -> Self {
        Self {
            source: Arc::new(source.with_builtin(TOOLBAR_TEMPLATE_NAME, TOOLBAR_TEMPLATE)),
            insert_before: config.insert_before.clone(),
        }
    }

    /// Start a render session with empty history.
    pub fn session(&self) -> RenderSession {
        RenderSession::new(Arc::clone(&self.source), self.insert_before.clone())
    }
}

impl TemplateBridge for DebugTemplateLoader {
    fn render(&self, name: &str, context: Value) -> Result<String, minijinja::Error> {
        self.session().render(name, context)
    }
}

/// Load history and environment for one top-level render at a time.
pub struct RenderSession {
    source: Arc<TemplateSource>,
    insert_before: String,
    state: Arc<Mutex<SessionState>>,
    env: Environment<'static>,
}

impl RenderSession {
    fn new(source: Arc<TemplateSource>, insert_before: String) -> Self {
        let state = Arc::new(Mutex::new(SessionState::default()));
        let env = environment(Arc::clone(&source), Arc::clone(&state));
        Self {
            source,
            insert_before,
            state,
            env,
        }
    }

    /// Render `name`, then splice the toolbar in before the marker.
    ///
    /// Rendering anything but the toolbar template starts a fresh history.
    /// Rendering the toolbar template itself keeps the history and returns
    /// the bare fragment.
    pub fn render(&mut self, name: &str, context: Value) -> Result<String, minijinja::Error> {
        let is_toolbar = name == TOOLBAR_TEMPLATE_NAME;
        if !is_toolbar {
            self.reset();
        }
        let output = self.env.get_template(name)?.render(&context)?;
        if is_toolbar {
            return Ok(output);
        }

        if !output.contains(&self.insert_before) {
            tracing::warn!(
                "{} ('{}') not found in template '{}'.",
                INSERT_BEFORE_KEY,
                self.insert_before,
                name
            );
            return Ok(output);
        }

        let toolbar = self.render(TOOLBAR_TEMPLATE_NAME, toolbar_context(&self.history()))?;
        Ok(insert_before(&output, &self.insert_before, &toolbar).unwrap_or(output))
    }

    /// Templates loaded by the last top-level render, in load order.
    pub fn history(&self) -> Vec<LoadHistoryEntry> {
        lock(&self.state).history.clone()
    }

    /// Forget the previous render, including templates the environment cached.
    fn reset(&mut self) {
        *lock(&self.state) = SessionState::default();
        self.env = environment(Arc::clone(&self.source), Arc::clone(&self.state));
    }
}

fn environment(
    source: Arc<TemplateSource>,
    state: Arc<Mutex<SessionState>>,
) -> Environment<'static> {
    let mut env = Environment::new();
    env.add_filter("resolvepath", resolve_path);

    let hooks = Arc::clone(&state);
    env.add_function(ENTER_HOOK, move |current: &State| {
        lock(&hooks).enter(current.name(), || variables(current));
        String::new()
    });
    let hooks = Arc::clone(&state);
    env.add_function(FRAME_HOOK, move |current: &State| {
        lock(&hooks).sync(current.name());
        String::new()
    });

    env.set_loader(move |name| {
        let Some(template) = source.load(name)? else {
            return Ok(None);
        };
        Ok(Some(lock(&state).record(template)))
    });
    env
}

/// Every variable visible to `current`, except the environment's globals.
fn variables(current: &State) -> Value {
    let globals: HashSet<&str> = current.env().globals().map(|(name, _)| name).collect();
    let mut visible = BTreeMap::new();
    for name in current.known_variables() {
        if globals.contains(name.as_ref()) {
            continue;
        }
        if let Some(value) = current.lookup(&name) {
            visible.insert(name.into_owned(), value);
        }
    }
    Value::from(visible)
}
