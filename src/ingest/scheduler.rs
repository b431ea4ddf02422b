//! Named periodic jobs driving the ingestion pipeline.
//!
//! Each job runs in its own task loop on a fixed wall-clock interval from
//! configuration. Jobs are independent of each other; one job's runs are
//! serial, so a sweep never overlaps the next run for the same ecosystem.
//! No failure here ever takes the process down.

use crate::config::Config;
use crate::ingest::Collector;
use crate::sources::Ecosystem;
use core::time::Duration;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const LOG_TARGET: &str = " scheduler";

#[derive(Debug, Clone, Copy)]
pub enum JobKind {
    Collect(Ecosystem),
    RefreshRepositories,
}

/// One named, independently-triggered periodic job.
#[derive(Debug, Clone, Copy)]
pub struct JobSpec {
    pub name: &'static str,
    pub kind: JobKind,
    pub interval: Duration,
}

/// The fixed job table, with trigger intervals from configuration.
#[must_use]
pub fn jobs(config: &Config) -> Vec<JobSpec> {
    let collect_interval = Duration::from_secs(config.collect_interval_hours * 60 * 60);
    let refresh_interval = Duration::from_secs(config.refresh_interval_hours * 60 * 60);

    vec![
        JobSpec {
            name: "collect-python",
            kind: JobKind::Collect(Ecosystem::Python),
            interval: collect_interval,
        },
        JobSpec {
            name: "collect-javascript",
            kind: JobKind::Collect(Ecosystem::JavaScript),
            interval: collect_interval,
        },
        JobSpec {
            name: "collect-dotnet",
            kind: JobKind::Collect(Ecosystem::DotNet),
            interval: collect_interval,
        },
        JobSpec {
            name: "collect-java",
            kind: JobKind::Collect(Ecosystem::Java),
            interval: collect_interval,
        },
        JobSpec {
            name: "refresh-github",
            kind: JobKind::RefreshRepositories,
            interval: refresh_interval,
        },
    ]
}

/// Spawn every job onto the runtime. The returned handles live as long as
/// the process; jobs have no cancellation mechanism.
pub fn spawn(collector: &Arc<Collector>, config: &Config) -> Vec<JoinHandle<()>> {
    jobs(config)
        .into_iter()
        .map(|job| {
            let collector = Arc::clone(collector);
            tokio::spawn(run_job(collector, job))
        })
        .collect()
}

#[expect(clippy::infinite_loop, reason = "periodic jobs run for the life of the process")]
async fn run_job(collector: Arc<Collector>, job: JobSpec) {
    let mut interval = tokio::time::interval(job.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // The first tick fires immediately; consume it so every job waits one
    // full interval before its first run. Seed data covers the gap, and the
    // collect/refresh-repos subcommands exist for immediate manual runs.
    let _ = interval.tick().await;

    log::info!(target: LOG_TARGET, "Job '{}' scheduled every {:.0} hours", job.name, job.interval.as_secs_f64() / 3600.0);

    loop {
        let _ = interval.tick().await;

        log::info!(target: LOG_TARGET, "Job '{}' starting", job.name);
        let started = Instant::now();

        let outcome = match job.kind {
            JobKind::Collect(ecosystem) => collector.collect(ecosystem).await,
            JobKind::RefreshRepositories => collector.refresh_repositories().await,
        };

        match outcome {
            Ok(()) => {
                log::info!(target: LOG_TARGET, "Job '{}' finished in {:.1}s", job.name, started.elapsed().as_secs_f64());
            }
            Err(e) => {
                log::error!(target: LOG_TARGET, "Job '{}' failed after {:.1}s: {e:#}", job.name, started.elapsed().as_secs_f64());
            }
        }
    }
}
