use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::{
    config::PipelineConfig,
    effects::EffectRegistry,
    error::{ExportError, Result},
    export::job::{ExportJob, ExportSnapshot, ExportStatus},
    pipeline::{EffectInstance, EffectStates, Pipeline},
    video::io::{MediaBackend, VideoReader, VideoWriter},
};

/// Error category stored when the worker panics
pub const PANIC_CATEGORY: &str = "Panic";

/// What to export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    #[serde(default)]
    pub chain: Vec<EffectInstance>,
    #[serde(default)]
    pub project_seed: u64,
}

enum RenderOutcome {
    Complete,
    Cancelled,
}

/// Runs at most one export at a time on a background thread
pub struct ExportManager {
    backend: Arc<dyn MediaBackend>,
    registry: Arc<EffectRegistry>,
    pipeline_config: PipelineConfig,
    job: Mutex<Option<Arc<ExportJob>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ExportManager {
    pub fn new(backend: Arc<dyn MediaBackend>, registry: Arc<EffectRegistry>) -> Self {
        Self {
            backend,
            registry,
            pipeline_config: PipelineConfig::default(),
            job: Mutex::new(None),
            worker: Mutex::new(None),
        }
    }

    pub fn with_pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.pipeline_config = config;
        self
    }

    /// Start exporting in the background and return the job for polling.
    ///
    /// Fails with [`ExportError::Conflict`] while another export is running, and with a
    /// pipeline error if the chain is too deep or names an unknown effect.
    pub fn start(&self, request: ExportRequest) -> Result<Arc<ExportJob>> {
        let mut current = lock(&self.job);
        if current.as_ref().map(|job| job.status()) == Some(ExportStatus::Running) {
            return Err(ExportError::Conflict.into());
        }

        Pipeline::with_config(&self.registry, &self.pipeline_config).validate_chain(&request.chain)?;

        // The previous worker has published a terminal status; reap its thread
        self.join_worker();

        let job = Arc::new(ExportJob::new(request.output_path.clone()));
        job.mark_running();

        let worker_job = Arc::clone(&job);
        let backend = Arc::clone(&self.backend);
        let registry = Arc::clone(&self.registry);
        let pipeline_config = self.pipeline_config.clone();

        info!(
            "Starting export of {} to {} ({} effects)",
            request.input_path.display(),
            request.output_path.display(),
            request.chain.len()
        );

        let handle = thread::Builder::new()
            .name("glitchframe-export".to_string())
            .spawn(move || {
                let pipeline = Pipeline::with_config(&registry, &pipeline_config);
                run_worker(&worker_job, backend.as_ref(), &pipeline, &request);
            })?;

        *current = Some(Arc::clone(&job));
        *lock(&self.worker) = Some(handle);
        Ok(job)
    }

    /// Snapshot of the current (or last) job; IDLE with zero progress if none was started
    pub fn get_status(&self) -> ExportSnapshot {
        match lock(&self.job).as_ref() {
            Some(job) => job.snapshot(),
            None => ExportSnapshot::idle(),
        }
    }

    /// Request cancellation of the running job. Returns `true` if one was running.
    pub fn cancel(&self) -> bool {
        match lock(&self.job).as_ref() {
            Some(job) => job.cancel(),
            None => false,
        }
    }

    pub fn current_job(&self) -> Option<Arc<ExportJob>> {
        lock(&self.job).clone()
    }

    /// Block until the current worker thread has exited
    pub fn join(&self) {
        self.join_worker();
    }

    fn join_worker(&self) {
        let handle = lock(&self.worker).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("Export worker thread terminated abnormally");
            }
        }
    }
}

impl Drop for ExportManager {
    fn drop(&mut self) {
        if let Some(job) = lock(&self.job).as_ref() {
            job.cancel();
        }
        self.join_worker();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Worker body: render, always close writer then reader, then publish the final status
fn run_worker(job: &ExportJob, backend: &dyn MediaBackend, pipeline: &Pipeline<'_>, request: &ExportRequest) {
    let mut reader: Option<Box<dyn VideoReader>> = None;
    let mut writer: Option<Box<dyn VideoWriter>> = None;

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        render(job, backend, pipeline, request, &mut reader, &mut writer)
    }));

    let writer_error = writer.take().and_then(|mut w| close_logged("video writer", move || w.close()));
    if let Some(mut r) = reader.take() {
        close_logged("video reader", move || r.close());
    }

    let (status, error) = match outcome {
        Ok(Ok(RenderOutcome::Complete)) => match writer_error {
            None => (ExportStatus::Complete, None),
            Some(category) => (ExportStatus::Error, Some(category.to_string())),
        },
        Ok(Ok(RenderOutcome::Cancelled)) => (ExportStatus::Cancelled, None),
        Ok(Err(e)) => {
            error!("Export failed: {}", e);
            (ExportStatus::Error, Some(e.category().to_string()))
        }
        Err(_) => {
            error!("Export worker panicked");
            (ExportStatus::Error, Some(PANIC_CATEGORY.to_string()))
        }
    };

    job.finish(status, error);
    let snapshot = job.snapshot();
    info!(
        "Export {} after {}/{} frames",
        snapshot.status, snapshot.current_frame, snapshot.total_frames
    );
}

fn render(
    job: &ExportJob,
    backend: &dyn MediaBackend,
    pipeline: &Pipeline<'_>,
    request: &ExportRequest,
    reader_slot: &mut Option<Box<dyn VideoReader>>,
    writer_slot: &mut Option<Box<dyn VideoWriter>>,
) -> Result<RenderOutcome> {
    let reader = reader_slot.insert(backend.open_reader(&request.input_path)?);
    let total = reader.frame_count();
    let resolution = reader.resolution();
    job.set_total_frames(total);

    let writer = writer_slot.insert(backend.open_writer(&request.output_path, resolution, reader.fps())?);

    let token = job.cancellation_token();
    let mut states = EffectStates::new();

    for index in 0..total {
        if token.is_cancelled() {
            info!("Export cancelled at frame {}/{}", index, total);
            return Ok(RenderOutcome::Cancelled);
        }

        let frame = reader.decode_frame(index)?;
        let (output, next_states) = pipeline.apply_chain(
            &frame,
            &request.chain,
            request.project_seed,
            index,
            resolution,
            &states,
        )?;
        states = next_states;

        writer.write_frame(&output)?;
        job.set_current_frame(index + 1);
        debug!(frame = index, total, "frame exported");
    }

    Ok(RenderOutcome::Complete)
}

/// Run a close step, logging instead of propagating. Returns the failure category.
fn close_logged<F: FnOnce() -> Result<()>>(what: &str, close: F) -> Option<&'static str> {
    match panic::catch_unwind(AssertUnwindSafe(close)) {
        Ok(Ok(())) => None,
        Ok(Err(e)) => {
            warn!("Failed to close {}: {}", what, e);
            Some(e.category())
        }
        Err(_) => {
            warn!("Closing {} panicked", what);
            Some(PANIC_CATEGORY)
        }
    }
}
