// ABOUTME: ProgressSink - caller-supplied receiver of coarse workflow progress.
// ABOUTME: Includes a no-op sink and an adapter for plain closures.

use async_trait::async_trait;

/// Receives overall workflow progress (0-100) at phase boundaries.
///
/// Called from the task coordinating the workflow, so at most one call is
/// in flight at a time.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn on_progress(&self, percent: u8, message: &str);
}

/// Discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

#[async_trait]
impl ProgressSink for NoopProgress {
    async fn on_progress(&self, _percent: u8, _message: &str) {}
}

/// Adapts a synchronous closure into a [`ProgressSink`].
pub struct FnProgress<F>(F);

/// Wrap a closure as a progress sink.
pub fn progress_fn<F>(f: F) -> FnProgress<F>
where
    F: Fn(u8, &str) + Send + Sync,
{
    FnProgress(f)
}

#[async_trait]
impl<F> ProgressSink for FnProgress<F>
where
    F: Fn(u8, &str) + Send + Sync,
{
    async fn on_progress(&self, percent: u8, message: &str) {
        (self.0)(percent, message);
    }
}
