//! Testing utilities
//!
//! [MemoryLoader] serves `#parse`/`#include` resources from memory. With
//! [MemoryLoader::suspending] every lookup yields to the async runtime before answering,
//! which exercises suspension of the evaluator at whatever depth the directive sits.
//!
//! [render_str] renders with default options and panics on error, for short tests.

use crate::vtl::config::RenderOptions;
use crate::vtl::engine::render;
use crate::vtl::runtime::{Context, LoaderError, ResourceLoader};
use indexmap::IndexMap;
use std::cell::Cell;
use std::time::SystemTime;

/// In-memory [ResourceLoader].
#[derive(Debug, Default)]
pub struct MemoryLoader {
    resources: IndexMap<String, (String, SystemTime)>,
    suspend: bool,
    requests: Cell<usize>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// A loader whose lookups suspend once before completing.
    pub fn suspending() -> Self {
        MemoryLoader {
            suspend: true,
            ..Self::default()
        }
    }

    pub fn with(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(name, source);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.resources
            .insert(name.into(), (source.into(), SystemTime::now()));
    }

    /// How many times [ResourceLoader::resolve] has been called.
    pub fn requests(&self) -> usize {
        self.requests.get()
    }
}

impl ResourceLoader for MemoryLoader {
    async fn resolve(&self, name: &str) -> Result<String, LoaderError> {
        self.requests.set(self.requests.get() + 1);
        if self.suspend {
            tokio::task::yield_now().await;
        }
        self.resources
            .get(name)
            .map(|(source, _)| source.clone())
            .ok_or_else(|| LoaderError::NotFound(name.to_string()))
    }

    fn exists(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    fn last_modified(&self, name: &str) -> Option<SystemTime> {
        self.resources.get(name).map(|(_, modified)| *modified)
    }
}

/// Render `source` against `context` with default options.
///
/// # Panics
///
/// When the template fails to compile or render.
pub fn render_str(source: &str, context: &Context) -> String {
    match render(source, context, &RenderOptions::default()) {
        Ok(output) => output,
        Err(error) => panic!("rendering {:?} failed: {}", source, error),
    }
}
