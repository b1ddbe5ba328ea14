use std::time::Duration;

use thiserror::Error;

/// Failure modes of a single collection run.
///
/// Field-level gaps (an unparsable timestamp or `bytes` attribute) are *not*
/// represented here: the affected page is dropped from the statistics and
/// parsing continues.
#[derive(Debug, Error)]
pub enum CollectError {
    /// The dump XML itself is malformed; fails the owning parse task.
    #[error("malformed dump XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The cooperative cancellation flag was observed mid-parse.
    #[error("parse task cancelled")]
    Cancelled,

    /// The worker pool did not terminate within the graceful plus forced
    /// shutdown windows.
    #[error("worker pool failed to shut down within {0:?}")]
    ShutdownTimeout(Duration),

    /// A worker dropped the result channel without delivering a result.
    #[error("worker exited before delivering a task result")]
    WorkerLost,

    /// Requested pool size outside the supported range.
    #[error("thread count {0} outside supported range 1..=32")]
    InvalidThreadCount(usize),
}
