// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded worker pool in front of a blocking engine
//!
//! [`WorkerPool`] turns any [`GeometryEngine`] into an [`AsyncEngine`]. Every
//! request becomes one job on a fixed-size rayon pool and is answered through a
//! oneshot channel, so the viewer core only ever sees a future per call. Load
//! progress is forwarded over an unbounded channel that closes when the job
//! finishes.

use futures::channel::{mpsc, oneshot};
use futures::future::{BoxFuture, FutureExt};
use ifc_lite_model::{
    Appearance, AsyncEngine, EngineError, EntityId, GeometryEngine, LoadProgress, LoadTask,
    ModelId, ModelSource, PropertyRecord, PropertySet, Result, SubsetGeometry, SubsetRequest,
};
use std::sync::Arc;

pub struct WorkerPool<E> {
    engine: Arc<E>,
    pool: rayon::ThreadPool,
}

impl<E: GeometryEngine + 'static> WorkerPool<E> {
    /// Wrap `engine` with a pool of `threads` workers
    pub fn new(engine: E, threads: usize) -> Result<Self> {
        Self::from_arc(Arc::new(engine), threads)
    }

    /// Same as [`WorkerPool::new`] for an engine shared with the caller
    pub fn from_arc(engine: Arc<E>, threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("ifc-engine-{}", i))
            .panic_handler(|_| log::error!("[Pool] Engine job panicked"))
            .build()
            .map_err(|e| EngineError::initialization(format!("worker pool: {}", e)))?;
        log::debug!("[Pool] Started {} engine workers", pool.current_num_threads());
        Ok(Self { engine, pool })
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn worker_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Post `job` to a worker and resolve its answer as a future
    fn submit<T, F>(&self, job: F) -> BoxFuture<'static, Result<T>>
    where
        T: Send + 'static,
        F: FnOnce(&E) -> Result<T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let engine = Arc::clone(&self.engine);
        self.pool.spawn(move || {
            // Receiver may be gone if the caller dropped the future
            let _ = tx.send(job(&engine));
        });
        async move { rx.await.unwrap_or(Err(EngineError::WorkerUnavailable)) }.boxed()
    }
}

impl<E: GeometryEngine + 'static> AsyncEngine for WorkerPool<E> {
    fn initialize(&self, worker_script: String, wasm_asset: String) -> BoxFuture<'static, Result<()>> {
        self.submit(move |engine| engine.initialize(&worker_script, &wasm_asset))
    }

    fn load_geometry(&self, source: ModelSource) -> LoadTask {
        let (progress_tx, progress_rx) = mpsc::unbounded::<LoadProgress>();
        let result = self.submit(move |engine| {
            let mut report = |progress: LoadProgress| {
                let _ = progress_tx.unbounded_send(progress);
            };
            engine.load_geometry(&source, &mut report)
        });
        LoadTask {
            progress: progress_rx,
            result,
        }
    }

    fn item_properties(
        &self,
        model_id: ModelId,
        id: EntityId,
    ) -> BoxFuture<'static, Result<PropertyRecord>> {
        self.submit(move |engine| engine.item_properties(model_id, id))
    }

    fn property_sets(
        &self,
        model_id: ModelId,
        id: EntityId,
        include_quantities: bool,
    ) -> BoxFuture<'static, Result<Vec<PropertySet>>> {
        self.submit(move |engine| engine.property_sets(model_id, id, include_quantities))
    }

    fn create_isolated_subset(
        &self,
        request: SubsetRequest,
    ) -> BoxFuture<'static, Result<SubsetGeometry>> {
        self.submit(move |engine| engine.create_isolated_subset(&request))
    }

    fn remove_subset(
        &self,
        model_id: ModelId,
        appearance: Appearance,
    ) -> BoxFuture<'static, Result<()>> {
        self.submit(move |engine| engine.remove_subset(model_id, &appearance))
    }

    fn close_model(&self, model_id: ModelId) -> BoxFuture<'static, Result<()>> {
        self.submit(move |engine| engine.close_model(model_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use ifc_lite_model::{ElementFixture, MemoryEngine, ModelFixture, ProgressCallback, SceneGraph};

    /// Engine whose item lookups panic inside the worker
    struct PanickingEngine;

    impl GeometryEngine for PanickingEngine {
        fn initialize(&self, _: &str, _: &str) -> Result<()> {
            Ok(())
        }
        fn load_geometry(&self, _: &ModelSource, _: ProgressCallback<'_>) -> Result<SceneGraph> {
            Err(EngineError::load("unsupported"))
        }
        fn item_properties(&self, _: ModelId, _: EntityId) -> Result<PropertyRecord> {
            panic!("decoder crashed")
        }
        fn property_sets(&self, _: ModelId, _: EntityId, _: bool) -> Result<Vec<PropertySet>> {
            Ok(Vec::new())
        }
        fn create_isolated_subset(&self, _: &SubsetRequest) -> Result<SubsetGeometry> {
            Ok(SubsetGeometry::default())
        }
        fn remove_subset(&self, _: ModelId, _: &Appearance) -> Result<()> {
            Ok(())
        }
        fn close_model(&self, _: ModelId) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_load_streams_progress_then_result() {
        let engine = MemoryEngine::new();
        engine.register(
            "one.json",
            ModelFixture::new().with_element(
                ElementFixture::new(1, "IFCWALL").with_box([0.0; 3], [1.0, 1.0, 1.0]),
            ),
        );
        let pool = WorkerPool::new(engine, 2).unwrap();
        pool.initialize("w.js".into(), "a.wasm".into()).await.unwrap();

        let mut task = pool.load_geometry(ModelSource::path("one.json"));
        let mut events = 0;
        while task.progress.next().await.is_some() {
            events += 1;
        }
        let graph = task.result.await.unwrap();
        assert!(events > 0);
        assert_eq!(graph.primitives().count(), 1);
        assert_eq!(pool.engine().open_model_count(), 1);
    }

    #[tokio::test]
    async fn test_engine_errors_pass_through() {
        let pool = WorkerPool::new(MemoryEngine::new(), 1).unwrap();
        let task = pool.load_geometry(ModelSource::path("missing.json"));
        assert!(matches!(task.result.await, Err(EngineError::NotInitialized)));
    }

    #[tokio::test]
    async fn test_panicked_job_is_worker_unavailable() {
        let pool = WorkerPool::new(PanickingEngine, 1).unwrap();
        let result = pool.item_properties(ModelId(0), EntityId(1)).await;
        assert!(matches!(result, Err(EngineError::WorkerUnavailable)));

        // The pool keeps serving after a panic
        assert!(pool.close_model(ModelId(0)).await.is_ok());
    }

    #[test]
    fn test_worker_count_is_at_least_one() {
        let pool = WorkerPool::new(MemoryEngine::new(), 0).unwrap();
        assert_eq!(pool.worker_count(), 1);
    }
}
