//! Worker process supervisor
//!
//! Launches one worker process per enabled site, at most
//! `max-concurrent-sites` at a time, with a short stagger between launches.
//! Workers share nothing in memory; a crashed worker only loses its own
//! session's results.

use crate::config::SupervisorConfig;
use crate::{Result, ShelfError};
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// How a worker process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerExit {
    pub success: bool,
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
}

/// Starts the worker for one site and waits for it to exit
pub trait WorkerLauncher: Send + Sync + 'static {
    fn launch(&self, site: &str) -> impl Future<Output = Result<WorkerExit>> + Send;
}

/// Re-invokes a binary as `<program> CONFIG --site NAME`
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
    config_path: PathBuf,
    extra_args: Vec<String>,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>, config_path: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            config_path: config_path.into(),
            extra_args: Vec::new(),
        }
    }

    /// Launcher for the running executable
    pub fn current_exe(config_path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::new(std::env::current_exe()?, config_path))
    }

    /// Arguments appended to every worker command line
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }
}

impl WorkerLauncher for ProcessLauncher {
    async fn launch(&self, site: &str) -> Result<WorkerExit> {
        let status = tokio::process::Command::new(&self.program)
            .arg(&self.config_path)
            .arg("--site")
            .arg(site)
            .args(&self.extra_args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await?;

        Ok(WorkerExit {
            success: status.success(),
            code: status.code(),
        })
    }
}

/// Final state of one site worker
#[derive(Debug, Clone)]
pub struct WorkerStatus {
    pub site: String,
    pub exit: Option<WorkerExit>,
    /// Launch failure, when the process never ran
    pub error: Option<String>,
    pub duration: Duration,
}

impl WorkerStatus {
    pub fn succeeded(&self) -> bool {
        self.exit.is_some_and(|e| e.success)
    }
}

/// Exit statuses of a supervised run, sorted by site
#[derive(Debug, Clone, Default)]
pub struct SupervisorReport {
    pub statuses: Vec<WorkerStatus>,
}

impl SupervisorReport {
    pub fn succeeded(&self) -> usize {
        self.statuses.iter().filter(|s| s.succeeded()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &WorkerStatus> {
        self.statuses.iter().filter(|s| !s.succeeded())
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed().next().is_none()
    }
}

/// Bounded launcher of site workers
pub struct Supervisor<L> {
    launcher: Arc<L>,
    max_concurrent: usize,
    launch_stagger: Duration,
}

impl<L: WorkerLauncher> Supervisor<L> {
    pub fn new(launcher: L, config: &SupervisorConfig) -> Self {
        Self {
            launcher: Arc::new(launcher),
            max_concurrent: config.max_concurrent_sites.max(1),
            launch_stagger: Duration::from_millis(config.launch_stagger),
        }
    }

    /// Runs a worker for every site and waits for all of them
    pub async fn run(&self, sites: Vec<String>) -> SupervisorReport {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut workers = JoinSet::new();

        tracing::info!(
            sites = sites.len(),
            max_concurrent = self.max_concurrent,
            "Starting site workers"
        );

        for (i, site) in sites.into_iter().enumerate() {
            if i > 0 && !self.launch_stagger.is_zero() {
                tokio::time::sleep(self.launch_stagger).await;
            }

            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let launcher = Arc::clone(&self.launcher);

            workers.spawn(async move {
                let _permit = permit;
                let started = Instant::now();
                tracing::info!(site = %site, "Worker started");

                let (exit, error) = match launcher.launch(&site).await {
                    Ok(exit) => (Some(exit), None),
                    Err(e) => (None, Some(e.to_string())),
                };

                WorkerStatus {
                    site,
                    exit,
                    error,
                    duration: started.elapsed(),
                }
            });
        }

        let mut statuses = Vec::new();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(status) => {
                    log_status(&status);
                    statuses.push(status);
                }
                Err(e) => tracing::error!(error = %e, "Worker task panicked"),
            }
        }

        statuses.sort_by(|a, b| a.site.cmp(&b.site));
        let report = SupervisorReport { statuses };
        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.statuses.len() - report.succeeded(),
            "All site workers finished"
        );
        report
    }
}

fn log_status(status: &WorkerStatus) {
    if status.succeeded() {
        tracing::info!(
            site = %status.site,
            duration_secs = status.duration.as_secs(),
            "Worker finished"
        );
        return;
    }

    let message = match (&status.exit, &status.error) {
        (_, Some(error)) => error.clone(),
        (Some(WorkerExit { code: Some(code), .. }), None) => format!("exited with code {}", code),
        _ => "terminated by signal".to_string(),
    };
    let err = ShelfError::Worker {
        site: status.site.clone(),
        message,
    };
    tracing::error!(error = %err, "Worker failed");
}
