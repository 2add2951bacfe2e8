// sftpdrop Operation Context
//
// Cancellation token + optional deadline handed to every Client call.
// run() races a collaborator future against the context; when the context
// finishes first the future is dropped and the caller gets the reason.
//
//   Context::background()              never finishes on its own
//   Context::with_timeout(30s)         DeadlineExceeded after 30s
//   ctx.cancel() / token.cancel()      Cancelled
//   ctx.child_with_timeout(5s)         cancelled with its parent, own deadline

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a Context finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Done {
    Cancelled,
    DeadlineExceeded,
}

#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self { token: CancellationToken::new(), deadline: Some(deadline) }
    }

    /// Context driven by an externally owned token (e.g. a ^C handler)
    pub fn with_cancel(token: CancellationToken) -> Self {
        Self { token, deadline: None }
    }

    /// Child context: cancelled together with `self`, deadline is the
    /// earlier of the parent's and `now + timeout`.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let own = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(parent) if parent < own => parent,
            _ => own,
        };
        Self { token: self.token.child_token(), deadline: Some(deadline) }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Non-blocking check, cancellation wins over an expired deadline.
    pub fn is_done(&self) -> Option<Done> {
        if self.token.is_cancelled() {
            Some(Done::Cancelled)
        } else if self.deadline.is_some_and(|d| d <= Instant::now()) {
            Some(Done::DeadlineExceeded)
        } else {
            None
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> Done {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.token.cancelled()            => Done::Cancelled,
                _ = tokio::time::sleep_until(deadline) => Done::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                Done::Cancelled
            }
        }
    }

    /// Drives `fut` until it completes or the context finishes.
    ///
    /// An already finished context returns immediately without polling `fut`.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, Done>
    where
        F: Future,
    {
        if let Some(done) = self.is_done() {
            return Err(done);
        }
        tokio::select! {
            biased;
            done = self.done() => Err(done),
            out  = fut         => Ok(out),
        }
    }
}
