//! Knowledge base factory — assemble documents from named sources.
//!
//! A factory collects sources (`products`, `faq`, ...) and writes them as one
//! knowledge document with a `metadata` block:
//!
//! ```json
//! { "metadata": { "created_at": "...", "sources": ["products"], "version": "1.0" },
//!   "products": { ... } }
//! ```

use chrono::Utc;
use responder_core::error::KnowledgeError;
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Written into every generated document's metadata block.
pub const KB_FORMAT_VERSION: &str = "1.0";

/// Collects named sources and builds knowledge documents from them.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBaseFactory {
    /// Registration order is kept; it becomes `metadata.sources`.
    sources: Vec<(String, Value)>,
}

impl KnowledgeBaseFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a source.
    pub fn register_source(&mut self, name: impl Into<String>, data: Value) {
        let name = name.into();
        match self.sources.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = data,
            None => self.sources.push((name, data)),
        }
    }

    /// Builder-style [`register_source`](Self::register_source).
    pub fn with_source(mut self, name: impl Into<String>, data: Value) -> Self {
        self.register_source(name, data);
        self
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Merge several factories; later factories win on name clashes.
    pub fn combine(factories: impl IntoIterator<Item = KnowledgeBaseFactory>) -> Self {
        let mut combined = Self::new();
        for factory in factories {
            for (name, data) in factory.sources {
                combined.register_source(name, data);
            }
        }
        combined
    }

    /// Register every `*.json` file in `dir` as a source named after its stem.
    /// Unreadable files are logged and skipped.
    pub fn from_dir(dir: &Path) -> Result<Self, KnowledgeError> {
        let read_dir = std::fs::read_dir(dir).map_err(|e| KnowledgeError::Io {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut paths: Vec<PathBuf> = read_dir
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut factory = Self::new();
        for path in paths {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let parsed = std::fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|c| serde_json::from_str::<Value>(&c).map_err(|e| e.to_string()));
            match parsed {
                Ok(data) => factory.register_source(stem, data),
                Err(reason) => warn!(path = %path.display(), %reason, "Skipping knowledge source"),
            }
        }
        Ok(factory)
    }

    /// The document `build_kb` would write. `sources = None` takes every
    /// registered source; unknown names are listed in metadata but add no
    /// category.
    pub fn document(&self, sources: Option<&[&str]>) -> Value {
        let selected: Vec<String> = match sources {
            Some(names) => names.iter().map(|s| s.to_string()).collect(),
            None => self.sources.iter().map(|(n, _)| n.clone()).collect(),
        };

        let mut doc = Map::new();
        doc.insert(
            "metadata".into(),
            json!({
                "created_at": Utc::now().to_rfc3339(),
                "sources": selected,
                "version": KB_FORMAT_VERSION,
            }),
        );
        for name in &selected {
            if let Some((_, data)) = self.sources.iter().find(|(n, _)| n == name) {
                doc.insert(name.clone(), data.clone());
            }
        }
        Value::Object(doc)
    }

    /// Write `<dir>/<kb_name>.json` and return its path.
    pub fn build_kb(
        &self,
        dir: &Path,
        kb_name: &str,
        sources: Option<&[&str]>,
    ) -> Result<PathBuf, KnowledgeError> {
        let path = dir.join(format!("{kb_name}.json"));
        let persist_err = |reason: String| KnowledgeError::Persist {
            path: path.clone(),
            reason,
        };

        std::fs::create_dir_all(dir).map_err(|e| persist_err(e.to_string()))?;
        let content = serde_json::to_string_pretty(&self.document(sources))
            .map_err(|e| persist_err(e.to_string()))?;
        std::fs::write(&path, content).map_err(|e| persist_err(e.to_string()))?;

        info!(kb = %kb_name, path = %path.display(), "Knowledge base written");
        Ok(path)
    }
}

/// The stock JTRADE knowledge: products, FAQ and company information.
pub fn default_factory() -> KnowledgeBaseFactory {
    KnowledgeBaseFactory::new()
        .with_source("products", default_products())
        .with_source("faq", default_faq())
        .with_source("company_info", default_company_info())
}

/// Write the stock knowledge base as `<dir>/general.json`.
pub fn create_default_kb(dir: &Path) -> Result<PathBuf, KnowledgeError> {
    default_factory().build_kb(dir, crate::store::PRIMARY_BASE, None)
}

fn default_products() -> Value {
    json!({
        "stock_trading": {
            "description": "Perdagangan saham dengan komisi terendah di pasar",
            "features": ["Real-time quotes", "Advanced charting", "Research reports"],
            "minimum_deposit": "Rp 1.000.000",
            "fees": "0.1% per transaksi, minimum Rp 10.000"
        },
        "mutual_funds": {
            "description": "Investasi reksa dana tanpa biaya pembelian",
            "features": ["Seleksi reksa dana terbaik", "Analisis kinerja mendalam"],
            "minimum_investment": "Rp 500.000",
            "fees": "0% biaya pembelian, 0.5-2% biaya pengelolaan tahunan"
        },
        "bonds": {
            "description": "Investasi obligasi pemerintah dan korporasi",
            "features": ["Yield kompetitif", "Analisis credit rating"],
            "minimum_investment": "Rp 1.000.000",
            "fees": "0.1% biaya transaksi"
        }
    })
}

fn default_faq() -> Value {
    json!([
        {
            "question": "Berapa minimum deposit di JTRADE?",
            "answer": "Minimum deposit di JTRADE adalah Rp 1.000.000 untuk membuka akun reguler."
        },
        {
            "question": "Bagaimana cara membuka akun di JTRADE?",
            "answer": "Membuka akun di JTRADE sangat mudah. Anda cukup mengunduh aplikasi kami, melengkapi formulir pendaftaran online, dan mengunggah dokumen identitas."
        },
        {
            "question": "Apa saja biaya transaksi di JTRADE?",
            "answer": "JTRADE menawarkan biaya transaksi terendah di industri, mulai dari 0.1% untuk transaksi saham dan gratis untuk pembelian reksa dana."
        },
        {
            "question": "Apakah JTRADE menyediakan analisis pasar?",
            "answer": "Ya, JTRADE menyediakan analisis pasar komprehensif, termasuk laporan riset, grafik teknikal, dan rekomendasi saham."
        }
    ])
}

fn default_company_info() -> Value {
    json!({
        "name": "JTRADE",
        "description": "Platform investasi modern yang fokus pada pengalaman investor",
        "founded": "2020",
        "headquarters": "Jakarta, Indonesia",
        "unique_selling_points": [
            "Biaya transaksi terendah di industri",
            "Eksekusi order tercepat",
            "Analisis pasar real-time",
            "Layanan personal oleh financial advisor berpengalaman"
        ],
        "contact": {
            "email": "info@jtrade.id",
            "phone": "+6221123456",
            "address": "Jl. Sudirman No. 123, Jakarta Pusat"
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::KnowledgeStore;

    #[test]
    fn document_carries_metadata_and_sources() {
        let factory = KnowledgeBaseFactory::new()
            .with_source("faq", json!([{"question": "q", "answer": "a"}]))
            .with_source("products", json!({}));
        let doc = factory.document(None);
        assert_eq!(doc["metadata"]["version"], "1.0");
        assert_eq!(doc["metadata"]["sources"], json!(["faq", "products"]));
        assert!(doc["metadata"]["created_at"].is_string());
        assert_eq!(doc["faq"][0]["answer"], "a");
    }

    #[test]
    fn document_with_selected_sources() {
        let doc = default_factory().document(Some(&["faq"]));
        assert!(doc.get("faq").is_some());
        assert!(doc.get("products").is_none());
    }

    #[test]
    fn combine_later_factory_wins() {
        let a = KnowledgeBaseFactory::new().with_source("faq", json!(["lama"]));
        let b = KnowledgeBaseFactory::new()
            .with_source("faq", json!(["baru"]))
            .with_source("products", json!({}));
        let combined = KnowledgeBaseFactory::combine([a, b]);
        assert_eq!(combined.source_names(), vec!["faq", "products"]);
        assert_eq!(combined.document(None)["faq"], json!(["baru"]));
    }

    #[test]
    fn default_kb_is_loadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_default_kb(dir.path()).unwrap();
        assert!(path.ends_with("general.json"));

        let store = KnowledgeStore::load(dir.path());
        assert_eq!(
            store.resolve("general.faq[0].answer").as_deref(),
            Some("Minimum deposit di JTRADE adalah Rp 1.000.000 untuk membuka akun reguler.")
        );
        assert!(store.category("products").unwrap().get("bonds").is_some());
    }

    #[test]
    fn from_dir_uses_file_stems_and_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("promo.json"), r#"{"ramadan": "Diskon biaya 50%"}"#).unwrap();
        std::fs::write(dir.path().join("broken.json"), "{").unwrap();

        let factory = KnowledgeBaseFactory::from_dir(dir.path()).unwrap();
        assert_eq!(factory.source_names(), vec!["promo"]);
    }

    #[test]
    fn from_missing_dir_is_an_error() {
        assert!(KnowledgeBaseFactory::from_dir(Path::new("/nonexistent/kb-src")).is_err());
    }
}
