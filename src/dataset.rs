//! Process-wide dataset handle.
//!
//! [`DatasetService`] owns the configuration and the load state machine;
//! callers get immutable [`LoadedData`] snapshots via [`Arc`], so a reload
//! swaps the dataset out from under new callers without invalidating queries
//! already running against the previous snapshot. A failed load is recorded
//! and retried on the next access rather than latched permanently.

use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::{DataError, DataResult};
use crate::ingestion::{IngestionObserver, IngestionPipeline, LoadReport};
use crate::query::{QueryCache, QueryEngine};
use crate::table::Table;

/// One loaded dataset: the unified table, the report of the load that
/// produced it, and the result cache scoped to this snapshot.
#[derive(Debug)]
pub struct LoadedData {
    pub table: Table,
    pub report: LoadReport,
    cache: QueryCache,
}

impl LoadedData {
    pub fn new(table: Table, report: LoadReport) -> Self {
        Self {
            table,
            report,
            cache: QueryCache::new(),
        }
    }

    /// Query engine over this snapshot.
    pub fn engine(&self) -> QueryEngine<'_> {
        QueryEngine::new(&self.table, &self.cache)
    }
}

enum State {
    Uninitialized,
    Ready(Arc<LoadedData>),
    Failed(String),
}

/// Coarse service state for health reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ServiceStatus {
    NotLoaded,
    Ready { rows: usize },
    Failed { message: String },
}

/// Lazily-loading owner of the dataset.
pub struct DatasetService {
    config: EngineConfig,
    observer: Option<Arc<dyn IngestionObserver>>,
    state: RwLock<State>,
}

impl DatasetService {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            observer: None,
            state: RwLock::new(State::Uninitialized),
        }
    }

    /// Attach an observer forwarded to every pipeline run.
    pub fn with_observer(mut self, observer: Arc<dyn IngestionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn run_pipeline(&self) -> DataResult<Arc<LoadedData>> {
        let mut pipeline = IngestionPipeline::new(self.config.clone());
        if let Some(observer) = &self.observer {
            pipeline = pipeline.with_observer(Arc::clone(observer));
        }
        let (table, report) = pipeline.load_all()?;
        Ok(Arc::new(LoadedData::new(table, report)))
    }

    /// Current snapshot, loading on first use. A previously failed load is
    /// retried here.
    pub fn ensure_ready(&self) -> DataResult<Arc<LoadedData>> {
        {
            let state = self.state.read().expect("dataset state lock poisoned");
            if let State::Ready(data) = &*state {
                return Ok(Arc::clone(data));
            }
        }
        let mut state = self.state.write().expect("dataset state lock poisoned");
        // Another thread may have loaded while we waited for the write lock.
        if let State::Ready(data) = &*state {
            return Ok(Arc::clone(data));
        }
        match self.run_pipeline() {
            Ok(data) => {
                *state = State::Ready(Arc::clone(&data));
                Ok(data)
            }
            Err(err) => {
                *state = State::Failed(err.to_string());
                Err(err)
            }
        }
    }

    /// Load (or reload) unconditionally, replacing any current snapshot.
    pub fn load(&self) -> DataResult<Arc<LoadedData>> {
        let result = self.run_pipeline();
        let mut state = self.state.write().expect("dataset state lock poisoned");
        match result {
            Ok(data) => {
                *state = State::Ready(Arc::clone(&data));
                Ok(data)
            }
            Err(err) => {
                *state = State::Failed(err.to_string());
                Err(err)
            }
        }
    }

    /// Current snapshot without triggering a load.
    pub fn snapshot(&self) -> DataResult<Arc<LoadedData>> {
        let state = self.state.read().expect("dataset state lock poisoned");
        match &*state {
            State::Ready(data) => Ok(Arc::clone(data)),
            State::Uninitialized => Err(DataError::DataUnavailable {
                reason: "dataset not loaded yet".to_string(),
            }),
            State::Failed(message) => Err(DataError::DataUnavailable {
                reason: message.clone(),
            }),
        }
    }

    pub fn status(&self) -> ServiceStatus {
        let state = self.state.read().expect("dataset state lock poisoned");
        match &*state {
            State::Uninitialized => ServiceStatus::NotLoaded,
            State::Ready(data) => ServiceStatus::Ready {
                rows: data.table.row_count(),
            },
            State::Failed(message) => ServiceStatus::Failed {
                message: message.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_before_load_is_unavailable() {
        let dir = std::env::temp_dir().join("sinesp-dataset-nonexistent-state-test");
        let service = DatasetService::new(
            EngineConfig::default()
                .with_data_dir(&dir)
                .with_cache_enabled(false),
        );
        assert_eq!(service.status(), ServiceStatus::NotLoaded);
        let err = service.snapshot().unwrap_err();
        assert!(err.is_unavailable());
    }
}
