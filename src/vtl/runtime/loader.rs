//! Resource loader collaborator
//!
//! `#parse` and `#include` fetch other templates by name through a [ResourceLoader]. The
//! engine never touches storage itself; embedders plug in whatever backs their templates.
//! Loading is async so a loader may do I/O, and the evaluator awaits it at any nesting
//! depth. Synchronous loaders return ready futures.

use std::future::Future;
use std::time::SystemTime;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoaderError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("failed to load resource {name}: {reason}")]
    Failed { name: String, reason: String },
}

pub trait ResourceLoader {
    /// Fetch the source text of `name`.
    fn resolve(&self, name: &str) -> impl Future<Output = Result<String, LoaderError>>;

    fn exists(&self, name: &str) -> bool;

    fn last_modified(&self, name: &str) -> Option<SystemTime>;
}

/// Loader for renders without resources: every lookup fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLoader;

impl ResourceLoader for NoLoader {
    async fn resolve(&self, name: &str) -> Result<String, LoaderError> {
        Err(LoaderError::NotFound(name.to_string()))
    }

    fn exists(&self, _name: &str) -> bool {
        false
    }

    fn last_modified(&self, _name: &str) -> Option<SystemTime> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_loader_rejects_everything() {
        let loader = NoLoader;
        assert_eq!(
            loader.resolve("header.vtl").await,
            Err(LoaderError::NotFound("header.vtl".to_string()))
        );
        assert!(!loader.exists("header.vtl"));
        assert!(loader.last_modified("header.vtl").is_none());
    }

    #[test]
    fn test_error_messages() {
        let error = LoaderError::Failed {
            name: "a".to_string(),
            reason: "denied".to_string(),
        };
        assert_eq!(error.to_string(), "failed to load resource a: denied");
    }
}
