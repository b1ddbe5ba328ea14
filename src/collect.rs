use std::io::Read;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::error::CollectError;
use crate::extract::parse_dump;
use crate::pool::{ShutdownConfig, TaskHandle, WorkerPool};
use crate::report;
use crate::stats::DumpStats;

/// Runs one full collection over the given decompressed dump streams and
/// returns the rendered report.
///
/// Blocks until every parse task has reached a terminal state; if any failed,
/// the error of the first-submitted failing task is returned. The worker pool
/// is shut down on every exit path, and a pool that cannot be terminated is
/// itself a fatal error.
pub fn collect<R>(sources: Vec<R>, threads: usize) -> Result<String, CollectError>
where
    R: Read + Send + 'static,
{
    collect_with(sources, threads, ShutdownConfig::default())
}

/// Same as [`collect`] but with explicit shutdown escalation windows.
pub fn collect_with<R>(
    sources: Vec<R>,
    threads: usize,
    shutdown: ShutdownConfig,
) -> Result<String, CollectError>
where
    R: Read + Send + 'static,
{
    let pool = WorkerPool::new(threads, shutdown)?;
    let stats = Arc::new(DumpStats::new());

    let outcome = run(&pool, sources, &stats);
    let shutdown_outcome = pool.shutdown();

    // A parse or formatting failure is the more informative one to surface;
    // a shutdown timeout alone still fails the run.
    let report = outcome?;
    shutdown_outcome?;
    Ok(report)
}

fn run<R>(
    pool: &WorkerPool,
    sources: Vec<R>,
    stats: &Arc<DumpStats>,
) -> Result<String, CollectError>
where
    R: Read + Send + 'static,
{
    info!(
        "dispatching {} parse task(s) across {} worker(s)",
        sources.len(),
        pool.worker_count()
    );

    let parse_handles: Vec<_> = sources
        .into_iter()
        .map(|source| {
            let stats = Arc::clone(stats);
            let cancel = pool.cancel_token();
            pool.submit(move || parse_dump(source, &stats, &cancel))
        })
        .collect();

    // Join in submission order: the earliest-submitted failure wins even if a
    // later task failed first in wall-clock time. Siblings keep running; they
    // are only cancelled by the shutdown sequence.
    let mut first_failure = None;
    for (index, handle) in parse_handles.into_iter().enumerate() {
        if let Err(err) = handle.join() {
            warn!("parse task #{index} failed: {err}");
            first_failure.get_or_insert(err);
        }
    }
    if let Some(err) = first_failure {
        return Err(err);
    }

    // All parse tasks are done, the tables are write-frozen from here on.
    debug!("parse phase complete, submitting formatting tasks");
    let titles = format_task(pool, stats, |s| report::top_words(&s.title_words));
    let bodies = format_task(pool, stats, |s| report::top_words(&s.body_words));
    let years = format_task(pool, stats, |s| report::dense_range(&s.years));
    let sizes = format_task(pool, stats, |s| report::dense_range(&s.size_buckets));

    let titles = titles.join()?;
    let bodies = bodies.join()?;
    let years = years.join()?;
    let sizes = sizes.join()?;

    Ok(report::assemble(&titles, &bodies, &sizes, &years))
}

fn format_task<F>(pool: &WorkerPool, stats: &Arc<DumpStats>, format: F) -> TaskHandle<String>
where
    F: FnOnce(&DumpStats) -> String + Send + 'static,
{
    let stats = Arc::clone(stats);
    pool.submit(move || Ok(format(&stats)))
}
