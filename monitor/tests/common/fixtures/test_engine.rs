//! Fully wired engine over a test database

use std::sync::Arc;

use monitor::probes::CheckExecutor;
use monitor::Engine;

use super::events::EventRecorder;
use super::test_data::engine_config;
use super::test_database::TestDatabase;

pub struct TestEngine {
    pub db: TestDatabase,
    pub engine: Engine,
    pub events: EventRecorder,
}

impl TestEngine {
    pub async fn new(executor: Arc<dyn CheckExecutor>) -> Self {
        Self::with_config(executor, engine_config()).await
    }

    pub async fn with_config(
        executor: Arc<dyn CheckExecutor>,
        config: monitor::config::EngineConfig,
    ) -> Self {
        let db = TestDatabase::new()
            .await
            .expect("Failed to create test database");
        Self::wire(db, executor, config)
    }

    /// Same wiring over a file-backed pool, so checks really run concurrently
    pub async fn on_disk(executor: Arc<dyn CheckExecutor>) -> Self {
        let db = TestDatabase::on_disk()
            .await
            .expect("Failed to create file test database");
        Self::wire(db, executor, engine_config())
    }

    fn wire(
        db: TestDatabase,
        executor: Arc<dyn CheckExecutor>,
        config: monitor::config::EngineConfig,
    ) -> Self {
        let engine = Engine::new(db.database(), executor, &config);
        let events = EventRecorder::attach(&engine.events);
        Self { db, engine, events }
    }
}
