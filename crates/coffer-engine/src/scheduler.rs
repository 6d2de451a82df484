//! Recurring backup schedule with prompt, idempotent stop.

use std::sync::Arc;
use std::time::Duration;

use coffer_core::BackupConfig;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::pipeline::BackupPipeline;

/// Bounded wait for the background task to observe cancellation
const STOP_GRACE: Duration = Duration::from_secs(2);

/// Drives recurring backup runs on a fixed interval.
///
/// At most one background execution exists at a time. `start` on a running
/// schedule performs a full `stop` first, so restart is never an error and
/// never leaves two schedules running.
pub struct Scheduler {
    pipeline: Arc<BackupPipeline>,
    active: Option<ActiveSchedule>,
}

struct ActiveSchedule {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Scheduler {
    pub fn new(pipeline: Arc<BackupPipeline>) -> Self {
        Self {
            pipeline,
            active: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Begin recurring runs against a configuration snapshot.
    ///
    /// The first cycle starts immediately; later cycles follow the
    /// configured interval. Starting while already running restarts the
    /// schedule with the new snapshot.
    pub async fn start(&mut self, config: BackupConfig) {
        self.stop().await;

        let interval = config.effective_interval();
        let cancel = CancellationToken::new();
        let pipeline = Arc::clone(&self.pipeline);
        let token = cancel.clone();
        let handle = tokio::spawn(run_loop(pipeline, config, interval, token));

        info!("Schedule started, one run every {}s", interval.as_secs());
        self.active = Some(ActiveSchedule { cancel, handle });
    }

    /// Stop the schedule. Idempotent; a no-op when idle.
    ///
    /// Waits briefly for the background task to observe cancellation. A run
    /// already in flight is never aborted: if it outlasts the grace period
    /// the task is detached and exits on its own once the run completes,
    /// without starting another cycle.
    pub async fn stop(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        active.cancel.cancel();

        let mut handle = active.handle;
        match tokio::time::timeout(STOP_GRACE, &mut handle).await {
            Ok(Ok(())) => debug!("Schedule task exited"),
            Ok(Err(e)) => warn!("Schedule task failed during shutdown: {}", e),
            Err(_) => warn!(
                "Schedule task still draining a run after {}s, detaching",
                STOP_GRACE.as_secs()
            ),
        }

        info!("Schedule stopped");
    }
}

/// The background execution: run once, then wait out the interval or exit
/// on cancellation. A failed cycle is reported and swallowed so the
/// schedule survives it.
async fn run_loop(
    pipeline: Arc<BackupPipeline>,
    config: BackupConfig,
    interval: Duration,
    cancel: CancellationToken,
) {
    info!(
        "Recurring backups of {} every {}s",
        config.source_path,
        interval.as_secs()
    );

    loop {
        if let Err(e) = pipeline.run_once(&config).await {
            warn!("Scheduled backup failed: {}", e);
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Schedule cancelled");
                return;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditLog;
    use coffer_remote::{NoOpUploader, NullNotifier};
    use std::fs;
    use tempfile::TempDir;

    fn test_pipeline(dir: &TempDir) -> (Arc<BackupPipeline>, AuditLog) {
        let log_path = dir.path().join("backup_log.csv");
        let pipeline = BackupPipeline::new(
            AuditLog::new(log_path.clone()),
            Arc::new(NoOpUploader),
            Arc::new(NullNotifier),
        );
        (Arc::new(pipeline), AuditLog::new(log_path))
    }

    fn test_config(dir: &TempDir, source_name: &str) -> BackupConfig {
        let source = dir.path().join(source_name);
        fs::write(&source, b"payload").unwrap();
        BackupConfig {
            source_path: source.to_str().unwrap().into(),
            local_dest: dir.path().join("backups").to_str().unwrap().into(),
            interval_minutes: 1,
            ..BackupConfig::default()
        }
    }

    /// Poll until the audit log holds at least `want` parseable rows.
    /// Reads can race an in-flight append, so parse failures count as zero.
    async fn wait_for_rows(log: &AuditLog, want: usize) {
        for _ in 0..200 {
            if log.read_all().map(|r| r.len()).unwrap_or(0) >= want {
                return;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("audit log never reached {} rows", want);
    }

    #[tokio::test]
    async fn test_start_runs_immediately_then_stop() {
        let dir = TempDir::new().unwrap();
        let (pipeline, log) = test_pipeline(&dir);
        let config = test_config(&dir, "notes.txt");

        let mut scheduler = Scheduler::new(pipeline);
        assert!(!scheduler.is_running());

        scheduler.start(config).await;
        assert!(scheduler.is_running());

        wait_for_rows(&log, 1).await;

        let began = std::time::Instant::now();
        scheduler.stop().await;
        assert!(began.elapsed() < STOP_GRACE + Duration::from_secs(1));
        assert!(!scheduler.is_running());

        // 60s interval: no second cycle can have started
        assert_eq!(log.read_all().unwrap().len(), 1);
        assert!(log.read_all().unwrap()[0].is_ok());
    }

    #[tokio::test]
    async fn test_restart_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let (pipeline, log) = test_pipeline(&dir);
        let config = test_config(&dir, "notes.txt");

        let mut scheduler = Scheduler::new(pipeline);
        scheduler.start(config.clone()).await;
        wait_for_rows(&log, 1).await;

        // Restart replaces the running schedule and fires a fresh first cycle
        scheduler.start(config).await;
        wait_for_rows(&log, 2).await;
        assert!(scheduler.is_running());

        scheduler.stop().await;
        scheduler.stop().await; // second stop is a no-op
        assert!(!scheduler.is_running());

        assert_eq!(log.read_all().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_noop() {
        let dir = TempDir::new().unwrap();
        let (pipeline, _log) = test_pipeline(&dir);

        let mut scheduler = Scheduler::new(pipeline);
        scheduler.stop().await;
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn test_loop_survives_failed_cycles() {
        let dir = TempDir::new().unwrap();
        let (pipeline, log) = test_pipeline(&dir);

        let config = BackupConfig {
            source_path: dir.path().join("missing.txt").to_str().unwrap().into(),
            local_dest: dir.path().join("backups").to_str().unwrap().into(),
            ..BackupConfig::default()
        };

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(
            Arc::clone(&pipeline),
            config,
            Duration::from_millis(20),
            cancel.clone(),
        ));

        wait_for_rows(&log, 3).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop exits promptly after cancellation")
            .unwrap();

        let rows = log.read_all().unwrap();
        assert!(rows.len() >= 3);
        assert!(rows.iter().all(|r| !r.is_ok()));
    }
}
