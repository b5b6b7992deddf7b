//! Pipeline wiring for yt-harvest.
//!
//! Owns the record store connection and the video source, and hands out the
//! collector and enricher built on top of them.

use crate::collector::Collector;
use crate::config::Settings;
use crate::enricher::{Enricher, RetryPolicy};
use crate::error::{HarvestError, Result};
use crate::source::{VideoSource, YtDlpSource};
use crate::store::Store;
use std::sync::Arc;
use tracing::info;

/// The collection and enrichment pipeline.
pub struct Pipeline {
    settings: Settings,
    store: Arc<Store>,
    collector: Collector,
    enricher: Enricher,
}

impl Pipeline {
    /// Open the configured database and use yt-dlp as the source.
    pub fn new(settings: Settings) -> Result<Self> {
        let store = Arc::new(Store::open(&settings.database_path())?);
        let source: Arc<dyn VideoSource> = Arc::new(YtDlpSource::new(&settings.extractor));

        info!(
            "Pipeline ready (database: {:?}, extractor: {})",
            settings.database_path(),
            settings.extractor.binary
        );

        Ok(Self::with_components(settings, store, source))
    }

    /// Create a pipeline with custom components.
    pub fn with_components(
        settings: Settings,
        store: Arc<Store>,
        source: Arc<dyn VideoSource>,
    ) -> Self {
        let collector = Collector::new(store.clone(), source.clone());
        let enricher = Enricher::new(
            store.clone(),
            source,
            RetryPolicy::from(&settings.extractor),
        );

        Self {
            settings,
            store,
            collector,
            enricher,
        }
    }

    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    pub fn enricher(&self) -> &Enricher {
        &self.enricher
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Close the database connection.
    ///
    /// Fails if the store is still shared elsewhere.
    pub fn close(self) -> Result<()> {
        let Self {
            store,
            collector,
            enricher,
            ..
        } = self;
        drop(collector);
        drop(enricher);

        Arc::try_unwrap(store)
            .map_err(|_| HarvestError::Store("Record store is still in use".to_string()))?
            .close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    #[test]
    fn test_close_releases_store() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let pipeline =
            Pipeline::with_components(Settings::default(), store, Arc::new(MemorySource::new()));
        pipeline.close().unwrap();
    }

    #[test]
    fn test_close_fails_while_shared() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let pipeline = Pipeline::with_components(
            Settings::default(),
            store.clone(),
            Arc::new(MemorySource::new()),
        );
        let err = pipeline.close().unwrap_err();
        assert_eq!(err.kind(), "store");
        drop(store);
    }

    #[test]
    fn test_new_opens_configured_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.database.path = dir.path().join("videos.db").to_string_lossy().to_string();

        let pipeline = Pipeline::new(settings).unwrap();
        assert!(dir.path().join("videos.db").exists());
        pipeline.close().unwrap();
    }
}
