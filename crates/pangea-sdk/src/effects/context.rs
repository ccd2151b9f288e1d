use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Cancellation carrier passed to every network operation.
///
/// Clones share the same token: cancelling one cancels all. A deadline, when
/// set, behaves like a cancel that fires on its own.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token:    CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// Never cancelled unless [`Context::cancel`] is called.
    pub fn background() -> Self { Self::default() }

    /// Cancelled once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token:    CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Cancelled together with `token`.
    pub fn with_token(token: CancellationToken) -> Self { Self { token, deadline: None } }

    /// A context that also expires after `timeout`, keeping this one's token.
    #[must_use]
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        Self {
            token:    self.token.child_token(),
            deadline: Some(self.deadline.map_or(deadline, |d| d.min(deadline))),
        }
    }

    pub fn cancel(&self) { self.token.cancel() }

    pub fn token(&self) -> &CancellationToken { &self.token }

    pub fn deadline(&self) -> Option<Instant> { self.deadline }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// `Err(Cancelled)` if the context is already done.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() { Err(Error::Cancelled) } else { Ok(()) }
    }

    /// Resolves once the token is cancelled or the deadline passes.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// Drive `fut` to completion unless the context finishes first.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output> {
        self.check()?;
        tokio::select! {
            biased;
            _ = self.done() => Err(Error::Cancelled),
            out = fut => Ok(out),
        }
    }

    /// Sleep for `duration`, or fail with `Cancelled` if the context ends first.
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        self.run(tokio::time::sleep(duration)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_background_runs_to_completion() {
        let ctx = Context::background();
        assert_eq!(ctx.run(async { 7 }).await.unwrap(), 7);
        ctx.sleep(Duration::from_secs(60)).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_sleep() {
        let ctx = Context::background();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let err = ctx.sleep(Duration::from_secs(3600)).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(ctx.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline() {
        let ctx = Context::with_timeout(Duration::from_secs(5));
        ctx.sleep(Duration::from_secs(2)).await.unwrap();

        let err = ctx.sleep(Duration::from_secs(10)).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(ctx.check().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_child_inherits_cancel() {
        let parent = Context::background();
        let child = parent.child_with_timeout(Duration::from_secs(60));
        parent.cancel();
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn test_external_token() {
        let token = CancellationToken::new();
        let ctx = Context::with_token(token.clone());
        token.cancel();
        assert!(matches!(ctx.run(async {}).await, Err(Error::Cancelled)));
    }
}
