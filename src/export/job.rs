use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Lifecycle of an export job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStatus {
    Idle,
    Running,
    Complete,
    Cancelled,
    Error,
}

impl ExportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportStatus::Idle => "idle",
            ExportStatus::Running => "running",
            ExportStatus::Complete => "complete",
            ExportStatus::Cancelled => "cancelled",
            ExportStatus::Error => "error",
        }
    }

    /// Complete, cancelled and error are final
    pub fn is_terminal(self) -> bool {
        matches!(self, ExportStatus::Complete | ExportStatus::Cancelled | ExportStatus::Error)
    }
}

impl std::fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cooperative cancellation flag shared between the job and its worker
///
/// The export loop checks it once per frame boundary; nothing inside a frame is
/// interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct JobState {
    status: ExportStatus,
    current_frame: u64,
    total_frames: u64,
    error: Option<String>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

/// One background export
///
/// All mutable fields sit behind a single mutex; the worker only holds it for field
/// assignment, so pollers never wait on frame processing.
#[derive(Debug)]
pub struct ExportJob {
    output_path: PathBuf,
    state: Mutex<JobState>,
    cancel: CancellationToken,
}

impl ExportJob {
    pub(crate) fn new(output_path: PathBuf) -> Self {
        Self {
            output_path,
            state: Mutex::new(JobState {
                status: ExportStatus::Idle,
                current_frame: 0,
                total_frames: 0,
                error: None,
                started_at: None,
                finished_at: None,
            }),
            cancel: CancellationToken::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn status(&self) -> ExportStatus {
        self.lock().status
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request cancellation. Returns `true` if the job was running.
    pub fn cancel(&self) -> bool {
        let state = self.lock();
        if state.status == ExportStatus::Running {
            self.cancel.cancel();
            true
        } else {
            false
        }
    }

    /// Consistent view of the job, taken under its lock
    pub fn snapshot(&self) -> ExportSnapshot {
        let state = self.lock();
        let progress = if state.total_frames == 0 {
            0.0
        } else {
            state.current_frame as f64 / state.total_frames as f64
        };

        ExportSnapshot {
            status: state.status,
            progress: (progress * 10_000.0).round() / 10_000.0,
            current_frame: state.current_frame,
            total_frames: state.total_frames,
            output_path: Some(self.output_path.display().to_string()),
            error: state.error.clone(),
            started_at: state.started_at,
            finished_at: state.finished_at,
        }
    }

    pub(crate) fn mark_running(&self) {
        let mut state = self.lock();
        state.status = ExportStatus::Running;
        state.started_at = Some(Utc::now());
    }

    pub(crate) fn set_total_frames(&self, total: u64) {
        self.lock().total_frames = total;
    }

    pub(crate) fn set_current_frame(&self, current: u64) {
        let mut state = self.lock();
        state.current_frame = state.current_frame.max(current);
    }

    /// Move to a terminal status. `error` must already be sanitized.
    pub(crate) fn finish(&self, status: ExportStatus, error: Option<String>) {
        let mut state = self.lock();
        state.status = status;
        state.error = error;
        state.finished_at = Some(Utc::now());
    }
}

/// Serializable export status, as reported to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSnapshot {
    pub status: ExportStatus,
    /// `current_frame / total_frames`, rounded to four places
    pub progress: f64,
    pub current_frame: u64,
    pub total_frames: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl ExportSnapshot {
    /// Status reported when no export has been started
    pub fn idle() -> Self {
        Self {
            status: ExportStatus::Idle,
            progress: 0.0,
            current_frame: 0,
            total_frames: 0,
            output_path: None,
            error: None,
            started_at: None,
            finished_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_only_affects_running_job() {
        let job = ExportJob::new(PathBuf::from("out.mp4"));
        assert!(!job.cancel());
        assert!(!job.cancellation_token().is_cancelled());

        job.mark_running();
        assert!(job.cancel());
        assert!(job.cancellation_token().is_cancelled());
    }

    #[test]
    fn test_progress_is_rounded_and_monotonic() {
        let job = ExportJob::new(PathBuf::from("out.mp4"));
        job.mark_running();
        job.set_total_frames(3);
        job.set_current_frame(2);
        job.set_current_frame(1);

        let snapshot = job.snapshot();
        assert_eq!(snapshot.current_frame, 2);
        assert_eq!(snapshot.progress, 0.6667);
        assert!(snapshot.started_at.is_some());
        assert!(snapshot.finished_at.is_none());
    }

    #[test]
    fn test_finish_records_error() {
        let job = ExportJob::new(PathBuf::from("out.mp4"));
        job.mark_running();
        job.finish(ExportStatus::Error, Some("VideoError".to_string()));

        let snapshot = job.snapshot();
        assert_eq!(snapshot.status, ExportStatus::Error);
        assert!(snapshot.status.is_terminal());
        assert_eq!(snapshot.error.as_deref(), Some("VideoError"));
        assert!(snapshot.finished_at.is_some());
    }

    #[test]
    fn test_snapshot_serializes_lowercase_status() {
        let json = serde_json::to_value(ExportSnapshot::idle()).unwrap();
        assert_eq!(json["status"], "idle");
        assert_eq!(json["progress"], 0.0);
        assert!(json.get("output_path").is_none());
    }
}
