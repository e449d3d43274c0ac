//! Persona Resolver — layered persona composition over an explicit registry.
//!
//! Resolution starts from [`Persona::default`] and applies up to four
//! override layers in order:
//!
//! | Layer | Selected by | Applied as |
//! |-------|-------------|------------|
//! | profile | account identity | merged over top-level fields |
//! | context | `persona.context` | `context_details` |
//! | personality | first word of `persona.personality` | `personality_details` |
//! | style | `persona.style` | `style_details` |
//!
//! Each layer reads the persona as already updated by the previous one, so
//! a profile that changes `context` changes which context template applies.
//! A missing or failing source skips its layer; resolution never fails.

mod builtin;

use responder_core::error::PersonaError;
use responder_core::persona::Persona;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A data constructor for one override: called at lookup time.
pub type OverrideSource =
    Arc<dyn Fn() -> Result<Map<String, Value>, PersonaError> + Send + Sync>;

/// The four override layers, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverrideLayer {
    Profile,
    Context,
    Personality,
    Style,
}

impl OverrideLayer {
    pub const ALL: [OverrideLayer; 4] = [
        OverrideLayer::Profile,
        OverrideLayer::Context,
        OverrideLayer::Personality,
        OverrideLayer::Style,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OverrideLayer::Profile => "profile",
            OverrideLayer::Context => "context",
            OverrideLayer::Personality => "personality",
            OverrideLayer::Style => "style",
        }
    }

    /// Sub-directory of the templates directory holding this layer's files.
    fn template_subdir(&self) -> Option<&'static str> {
        match self {
            OverrideLayer::Profile => None,
            OverrideLayer::Context => Some("contexts"),
            OverrideLayer::Personality => Some("personalities"),
            OverrideLayer::Style => Some("styles"),
        }
    }
}

impl std::fmt::Display for OverrideLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier → data constructor, one table per layer.
///
/// Built once at startup and shared by reference; lookups never touch the
/// filesystem except through a file-backed source's constructor.
#[derive(Default, Clone)]
pub struct PersonaRegistry {
    sources: HashMap<OverrideLayer, HashMap<String, OverrideSource>>,
}

impl PersonaRegistry {
    /// An empty registry: every layer misses.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry with the shipped context, personality and style templates.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (name, data) in builtin::contexts() {
            registry.register_value(OverrideLayer::Context, name, data);
        }
        for (name, data) in builtin::personalities() {
            registry.register_value(OverrideLayer::Personality, name, data);
        }
        for (name, data) in builtin::styles() {
            registry.register_value(OverrideLayer::Style, name, data);
        }
        registry
    }

    /// Built-ins plus every JSON file under the configured directories.
    /// Files registered here shadow built-ins of the same name.
    pub fn from_config(config: &responder_config::PersonaConfig) -> Self {
        let mut registry = Self::builtin();
        registry.register_dir(OverrideLayer::Profile, &config.profiles_dir);
        if let Some(templates) = &config.templates_dir {
            registry.register_templates(templates);
        }
        registry
    }

    /// Register a constructor. Identifiers are case-insensitive.
    pub fn register(&mut self, layer: OverrideLayer, id: impl AsRef<str>, source: OverrideSource) {
        self.sources
            .entry(layer)
            .or_default()
            .insert(id.as_ref().to_lowercase(), source);
    }

    /// Register a fixed partial record. Non-object values register a source
    /// that always fails.
    pub fn register_value(&mut self, layer: OverrideLayer, id: impl AsRef<str>, data: Value) {
        let id = id.as_ref().to_string();
        let name = format!("{layer}/{id}");
        let source: OverrideSource = Arc::new(move || match &data {
            Value::Object(map) => Ok(map.clone()),
            _ => Err(PersonaError::Load {
                name: name.clone(),
                reason: "not a JSON object".into(),
            }),
        });
        self.register(layer, id, source);
    }

    /// Register `<dir>/contexts`, `<dir>/personalities` and `<dir>/styles`.
    pub fn register_templates(&mut self, dir: &Path) {
        for layer in OverrideLayer::ALL {
            if let Some(sub) = layer.template_subdir() {
                self.register_dir(layer, &dir.join(sub));
            }
        }
    }

    /// Register one lazy file source per `*.json` file in `dir`, keyed by
    /// file stem. A missing directory registers nothing.
    pub fn register_dir(&mut self, layer: OverrideLayer, dir: &Path) -> usize {
        let entries = match std::fs::read_dir(dir) {
            Ok(e) => e,
            Err(_) => {
                debug!(layer = %layer, dir = %dir.display(), "No override directory");
                return 0;
            }
        };

        let mut count = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let id = stem.to_string();
            self.register(layer, &id, file_source(path));
            count += 1;
        }

        info!(layer = %layer, dir = %dir.display(), count, "Registered persona overrides");
        count
    }

    pub fn lookup(&self, layer: OverrideLayer, id: &str) -> Option<&OverrideSource> {
        self.sources.get(&layer)?.get(&id.to_lowercase())
    }

    /// Sorted identifiers registered for `layer`.
    pub fn ids(&self, layer: OverrideLayer) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .sources
            .get(&layer)
            .map(|m| m.keys().map(String::as_str).collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }
}

impl std::fmt::Debug for PersonaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("PersonaRegistry");
        for layer in OverrideLayer::ALL {
            s.field(layer.as_str(), &self.ids(layer));
        }
        s.finish()
    }
}

/// A source that reads and parses `path` on every call.
fn file_source(path: PathBuf) -> OverrideSource {
    Arc::new(move || {
        let name = path.display().to_string();
        let content = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PersonaError::SourceMissing(name.clone()),
            _ => PersonaError::Load {
                name: name.clone(),
                reason: e.to_string(),
            },
        })?;
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(PersonaError::Load {
                name,
                reason: "not a JSON object".into(),
            }),
            Err(e) => Err(PersonaError::Load {
                name,
                reason: e.to_string(),
            }),
        }
    })
}

/// Resolves an account identity to its full persona.
#[derive(Debug, Clone)]
pub struct PersonaResolver {
    registry: Arc<PersonaRegistry>,
    base: Persona,
}

impl PersonaResolver {
    pub fn new(registry: Arc<PersonaRegistry>) -> Self {
        Self {
            registry,
            base: Persona::default(),
        }
    }

    /// Start resolution from `base` instead of the stock persona.
    pub fn with_base(mut self, base: Persona) -> Self {
        self.base = base;
        self
    }

    pub fn registry(&self) -> &PersonaRegistry {
        &self.registry
    }

    pub fn resolve(&self, identity: &str) -> Persona {
        let mut persona = self.base.clone();

        if let Some(profile) = self.load(OverrideLayer::Profile, identity) {
            persona.merge(&profile);
        }

        if let Some(details) = self.load(OverrideLayer::Context, &persona.context) {
            persona.context_details = Some(Value::Object(details));
        }

        if let Some(details) = self.load(OverrideLayer::Personality, &persona.personality_key()) {
            persona.personality_details = Some(Value::Object(details));
        }

        if let Some(details) = self.load(OverrideLayer::Style, &persona.style_key()) {
            persona.style_details = Some(Value::Object(details));
        }

        debug!(
            identity,
            name = %persona.name,
            context = %persona.context,
            style = %persona.style,
            "Persona resolved"
        );
        persona
    }

    fn load(&self, layer: OverrideLayer, id: &str) -> Option<Map<String, Value>> {
        let source = self.registry.lookup(layer, id)?;
        match source() {
            Ok(map) => Some(map),
            Err(e) => {
                warn!(layer = %layer, id, error = %e, "Skipping persona override");
                None
            }
        }
    }
}
