//! Header injector backed by a refreshing credential cache.

use std::sync::Arc;

use async_trait::async_trait;
use outcall_common::auth::{CacheSettings, CredentialCache, CredentialSource};

use super::HeaderInjector;

/// Injects the credential held by a [`CredentialCache`].
///
/// Cloning shares the underlying cache.
#[derive(Debug, Clone)]
pub struct ExpirableHeaderInjector {
    cache: CredentialCache,
}

impl ExpirableHeaderInjector {
    #[must_use]
    pub const fn new(cache: CredentialCache) -> Self {
        Self { cache }
    }

    /// Build the cache with default collaborators and wrap it.
    pub fn from_source(
        header_name: impl Into<String>,
        source: Arc<dyn CredentialSource>,
        settings: CacheSettings,
    ) -> Self {
        Self::new(CredentialCache::new(header_name, source, settings))
    }

    #[must_use]
    pub const fn cache(&self) -> &CredentialCache {
        &self.cache
    }
}

#[async_trait]
impl HeaderInjector for ExpirableHeaderInjector {
    fn header_name(&self) -> &str {
        self.cache.header_name()
    }

    async fn header_value(&self) -> String {
        self.cache.header_value().await
    }
}
