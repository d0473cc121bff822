//! Periodic pass scheduling

use super::reconciler::{PassReport, Reconciler};
use crate::config::MonitorConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio::time::{sleep, Duration};

/// Scheduler state
pub struct Scheduler {
    config: MonitorConfig,
    reconciler: Arc<Reconciler>,
    last_report: Arc<RwLock<Option<PassReport>>>,
    running: AtomicBool,
    stop_tx: watch::Sender<bool>,
}

impl Scheduler {
    /// Create a new scheduler
    pub fn new(config: MonitorConfig, reconciler: Arc<Reconciler>) -> Arc<Self> {
        let (stop_tx, _) = watch::channel(false);
        Arc::new(Self {
            config,
            reconciler,
            last_report: Arc::new(RwLock::new(None)),
            running: AtomicBool::new(false),
            stop_tx,
        })
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    /// Time between passes
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.config.check_interval_secs.max(1))
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Report of the most recent finished pass
    pub async fn last_report(&self) -> Option<PassReport> {
        self.last_report.read().await.clone()
    }

    /// Run a single pass now and keep its report
    pub async fn run_once(&self) -> PassReport {
        let report = self.reconciler.run_pass().await;
        *self.last_report.write().await = Some(report.clone());
        report
    }

    /// Run passes until [`Scheduler::stop`] is called.
    ///
    /// The first pass starts immediately and each later one waits a full
    /// interval after the previous pass finished. A pass in flight always
    /// completes before the loop exits.
    pub async fn start(self: Arc<Self>) {
        let mut stop_rx = self.stop_tx.subscribe();
        if *stop_rx.borrow() {
            return;
        }

        self.running.store(true, Ordering::SeqCst);
        tracing::info!(
            interval_secs = self.check_interval().as_secs(),
            "Scheduler started"
        );

        loop {
            self.run_once().await;

            if *stop_rx.borrow() {
                break;
            }

            tokio::select! {
                _ = sleep(self.check_interval()) => {}
                _ = stop_rx.changed() => break,
            }
        }

        self.running.store(false, Ordering::SeqCst);
        tracing::info!("Scheduler stopped");
    }

    /// Stop the scheduler
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }
}
