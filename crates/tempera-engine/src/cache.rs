//! Process-wide template cache.
//!
//! Keyed by absolute path. Each entry is an async [`OnceCell`], so
//! concurrent first loads of the same path coalesce into a single file
//! read; a failed read leaves the cell empty and the next load retries.

use std::sync::{Arc, OnceLock};

use camino::{Utf8Path, Utf8PathBuf};
use rustc_hash::FxHashMap;
use tokio::sync::{Mutex, OnceCell};

use crate::error::EngineError;
use crate::template::Template;

pub(crate) struct TemplateCache {
    entries: Mutex<FxHashMap<Utf8PathBuf, Arc<OnceCell<Arc<Template>>>>>,
}

/// The process-wide cache instance.
pub(crate) fn global() -> &'static TemplateCache {
    static CACHE: OnceLock<TemplateCache> = OnceLock::new();
    CACHE.get_or_init(TemplateCache::new)
}

impl TemplateCache {
    fn new() -> Self {
        Self {
            entries: Mutex::new(FxHashMap::default()),
        }
    }

    /// Returns the cached template for `path`, reading the file on first
    /// load only. `path` must be absolute.
    pub(crate) async fn load(&self, path: &Utf8Path) -> Result<Arc<Template>, EngineError> {
        let cell = {
            let mut entries = self.entries.lock().await;
            Arc::clone(entries.entry(path.to_owned()).or_default())
        };
        cell.get_or_try_init(|| async {
            let source = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| EngineError::io(path, e))?;
            Ok(Arc::new(Template::with_origin(source, path.to_owned())))
        })
        .await
        .cloned()
    }
}
