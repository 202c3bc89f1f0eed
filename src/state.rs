use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;

use crate::assessment::engine::AssessmentEngine;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    store: Arc<Store>,
    engine: Arc<AssessmentEngine>,
    shutdown_tx: broadcast::Sender<()>,
    started_at: Instant,
}

impl AppState {
    pub fn new(
        store: Arc<Store>,
        engine: Arc<AssessmentEngine>,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        Self {
            store,
            engine,
            shutdown_tx,
            started_at: Instant::now(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn engine(&self) -> &AssessmentEngine {
        &self.engine
    }

    pub fn shutdown_rx(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
