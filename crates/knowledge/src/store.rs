//! Knowledge Store — named JSON documents and their flattened view.
//!
//! Every `*.json` file in the knowledge directory is one base, named after
//! the file stem. Each base is flattened into a `dotted.path -> text` map whose
//! keys are prefixed with the base name, e.g. `general.faq[0].answer`.

use responder_core::error::KnowledgeError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// The base prompt facts (products, FAQ) are read from when present.
pub const PRIMARY_BASE: &str = "general";

/// A single loaded knowledge document.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    name: String,
    document: Value,
    entries: BTreeMap<String, String>,
}

impl KnowledgeBase {
    /// Wrap a parsed document. The top level must be a JSON object.
    pub fn new(name: impl Into<String>, document: Value) -> Result<Self, KnowledgeError> {
        let name = name.into();
        if !document.is_object() {
            return Err(KnowledgeError::NotADocument(name));
        }
        let mut entries = BTreeMap::new();
        flatten_into(&document, &name, &mut entries);
        Ok(Self {
            name,
            document,
            entries,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Top-level category, e.g. `products` or `faq`.
    pub fn category(&self, category: &str) -> Option<&Value> {
        self.document.get(category)
    }

    /// Flattened entries, keyed `<base>.<path>`.
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    /// Resolve a path relative to this base (without the base-name prefix).
    pub fn resolve(&self, path: &str) -> Option<String> {
        resolve(&self.document, path)
    }
}

/// All knowledge bases loaded from one directory.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeStore {
    bases: BTreeMap<String, KnowledgeBase>,
}

impl KnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.json` document in `dir`.
    ///
    /// Unreadable or malformed files are logged and skipped individually. A
    /// missing directory yields an empty store.
    pub fn load(dir: &Path) -> Self {
        let mut store = Self::new();

        let read_dir = match std::fs::read_dir(dir) {
            Ok(rd) => rd,
            Err(e) => {
                info!(dir = %dir.display(), error = %e, "Knowledge directory not readable, starting empty");
                return store;
            }
        };

        let mut paths: Vec<_> = read_dir
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        for path in paths {
            match load_document(&path) {
                Ok(base) => {
                    debug!(kb = %base.name(), entries = base.entries().len(), "Loaded knowledge base");
                    store.insert(base);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping knowledge document"),
            }
        }

        info!(dir = %dir.display(), bases = store.len(), "Knowledge store loaded");
        store
    }

    /// Add or replace a base.
    pub fn insert(&mut self, base: KnowledgeBase) {
        self.bases.insert(base.name.clone(), base);
    }

    pub fn get(&self, name: &str) -> Option<&KnowledgeBase> {
        self.bases.get(name)
    }

    pub fn bases(&self) -> impl Iterator<Item = &KnowledgeBase> {
        self.bases.values()
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// Total flattened entries across all bases.
    pub fn entry_count(&self) -> usize {
        self.bases.values().map(|b| b.entries.len()).sum()
    }

    /// Look up a category, preferring the `general` base and otherwise the
    /// first base (by name) that has it.
    pub fn category(&self, category: &str) -> Option<&Value> {
        self.bases
            .get(PRIMARY_BASE)
            .and_then(|b| b.category(category))
            .or_else(|| self.bases.values().find_map(|b| b.category(category)))
    }

    /// Recover the text for a flattened key such as `general.faq[0].answer`.
    pub fn resolve(&self, key: &str) -> Option<String> {
        // Base names come from file stems and may themselves contain dots.
        self.bases
            .values()
            .filter_map(|base| {
                key.strip_prefix(base.name.as_str())
                    .and_then(|rest| rest.strip_prefix('.'))
                    .map(|rest| (base, rest))
            })
            .max_by_key(|(base, _)| base.name.len())
            .and_then(|(base, rest)| base.resolve(rest))
    }
}

fn load_document(path: &Path) -> Result<KnowledgeBase, KnowledgeError> {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let content = std::fs::read_to_string(path).map_err(|e| KnowledgeError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let document: Value = serde_json::from_str(&content).map_err(|e| KnowledgeError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    KnowledgeBase::new(name, document)
}

/// Flatten a document into `dotted.path -> text`.
///
/// Objects recurse with `parent.key`; a list of strings joins with spaces; a
/// list holding any object indexes every element as `parent.key[i]`; every
/// other value is stringified. Keys containing `.`, `[` or `]` are skipped
/// so every path stays unique and resolvable.
pub fn flatten(document: &Value) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    flatten_into(document, "", &mut out);
    out
}

fn flatten_into(value: &Value, prefix: &str, out: &mut BTreeMap<String, String>) {
    let Value::Object(map) = value else {
        if !prefix.is_empty() {
            insert_leaf(out, prefix.to_string(), leaf_text(value));
        }
        return;
    };

    for (k, v) in map {
        if k.contains(['.', '[', ']']) {
            warn!(key = %k, parent = %prefix, "Skipping key that cannot be addressed by a dotted path");
            continue;
        }
        let key = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{prefix}.{k}")
        };

        match v {
            Value::Object(_) => flatten_into(v, &key, out),
            Value::Array(items) if items.iter().any(Value::is_object) => {
                for (i, item) in items.iter().enumerate() {
                    let indexed = format!("{key}[{i}]");
                    if item.is_object() {
                        flatten_into(item, &indexed, out);
                    } else {
                        insert_leaf(out, indexed, leaf_text(item));
                    }
                }
            }
            _ => insert_leaf(out, key, leaf_text(v)),
        }
    }
}

/// Paths are unique; a repeat keeps the first entry.
fn insert_leaf(out: &mut BTreeMap<String, String>, path: String, text: String) {
    if out.contains_key(&path) {
        warn!(path = %path, "Skipping duplicate flattened path");
        return;
    }
    out.insert(path, text);
}

/// Text form of a non-object value.
fn leaf_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) if items.iter().all(Value::is_string) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    }
}

/// Navigate `document` along a flattened path and return the leaf text.
///
/// Honors the `name[i]` list-index convention. Paths that end on an object
/// (not a flattened leaf) or leave the document are not found.
pub fn resolve(document: &Value, path: &str) -> Option<String> {
    let mut current = document;

    for segment in path.split('.') {
        current = match parse_indexed(segment) {
            Some((name, idx)) => current.get(name)?.as_array()?.get(idx)?,
            None => current.get(segment)?,
        };
    }

    if current.is_object() {
        return None;
    }
    Some(leaf_text(current))
}

/// Split `faq[2]` into `("faq", 2)`.
fn parse_indexed(segment: &str) -> Option<(&str, usize)> {
    let inner = segment.strip_suffix(']')?;
    let (name, idx) = inner.rsplit_once('[')?;
    Some((name, idx.parse().ok()?))
}
