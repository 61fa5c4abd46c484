//! Run-scoped cooperative cancellation
//!
//! A run shares one [`CancelToken`] (observed at every suspension point) and one
//! [`CancelTrigger`] (held separately, so a handler can abort the rest of the
//! run and not just itself). Both halves ride on a `tokio::sync::watch`
//! channel carrying a single "stop" flag.

use futures::future::select_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

/// Returned when a wait was cut short by the run's cancellation signal
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Create a fresh cancellation scope
pub fn scope() -> (CancelTrigger, CancelToken) {
    let (sender, receiver) = watch::channel(false);
    (
        CancelTrigger { sender: Arc::new(sender) },
        CancelToken { receivers: vec![receiver] },
    )
}

/// Sleep for `duration` unless the token fires first
pub async fn sleep(duration: Duration, token: &CancelToken) -> Result<(), Cancelled> {
    token.run_until_cancelled(tokio::time::sleep(duration)).await
}

/// Fires the cancellation signal for every token in its scope
#[derive(Debug, Clone)]
pub struct CancelTrigger {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelTrigger {
    /// Request cancellation. Calling this more than once has no further effect.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Whether this trigger has fired
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
}

/// Observer side of a cancellation scope
#[derive(Debug, Clone)]
pub struct CancelToken {
    // Own flag first, then the flags of every enclosing scope
    receivers: Vec<watch::Receiver<bool>>,
}

impl CancelToken {
    /// A token whose trigger is already gone, so it can never fire
    pub fn never() -> Self {
        let (_trigger, token) = scope();
        token
    }

    pub fn is_cancelled(&self) -> bool {
        self.receivers.iter().any(|receiver| *receiver.borrow())
    }

    /// Resolves once this scope or any enclosing scope is cancelled
    pub async fn cancelled(&self) {
        let waits = self
            .receivers
            .iter()
            .cloned()
            .map(|receiver| Box::pin(wait_for_flag(receiver)));
        select_all(waits).await;
    }

    /// Drive `future` to completion unless cancellation arrives first
    pub async fn run_until_cancelled<F: Future>(&self, future: F) -> Result<F::Output, Cancelled> {
        if self.is_cancelled() {
            return Err(Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(Cancelled),
            output = future => Ok(output),
        }
    }

    /// Create a nested scope: its token fires when either this token or the
    /// returned trigger fires. Cancelling the child never reaches the parent.
    pub fn child_scope(&self) -> (CancelTrigger, CancelToken) {
        let (trigger, mut token) = scope();
        token.receivers.extend(self.receivers.iter().cloned());
        (trigger, token)
    }
}

async fn wait_for_flag(mut receiver: watch::Receiver<bool>) {
    loop {
        if *receiver.borrow_and_update() {
            return;
        }
        if receiver.changed().await.is_err() {
            // Trigger dropped without firing
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[test]
    fn test_trigger_is_observed_by_every_clone() {
        let (trigger, token) = scope();
        let other = token.clone();
        assert!(!token.is_cancelled());

        trigger.cancel();
        trigger.cancel();

        assert!(token.is_cancelled());
        assert!(other.is_cancelled());
        assert!(trigger.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_is_cut_short() {
        let (trigger, token) = scope();
        let start = Instant::now();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            trigger.cancel();
        });

        let result = sleep(Duration::from_millis(500), &token).await;
        assert_eq!(result, Err(Cancelled));
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_completes_when_not_cancelled() {
        let (_trigger, token) = scope();
        let start = Instant::now();

        sleep(Duration::from_millis(100), &token).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_already_cancelled_token_skips_future() {
        let (trigger, token) = scope();
        trigger.cancel();

        let mut polled = false;
        let result = token
            .run_until_cancelled(async {
                polled = true;
            })
            .await;

        assert_eq!(result, Err(Cancelled));
        assert!(!polled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_trigger_never_cancels() {
        let token = CancelToken::never();
        assert!(!token.is_cancelled());

        let outcome = tokio::time::timeout(Duration::from_secs(5), token.cancelled()).await;
        assert!(outcome.is_err(), "a dropped trigger must not count as cancellation");
    }

    #[test]
    fn test_child_scope_follows_parent_only_downwards() {
        let (parent_trigger, parent) = scope();
        let (child_trigger, child) = parent.child_scope();

        child_trigger.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());

        let (_second_trigger, second_child) = parent.child_scope();
        parent_trigger.cancel();
        assert!(second_child.is_cancelled());
    }

    #[tokio::test]
    async fn test_child_wakes_on_parent_cancel() {
        let (parent_trigger, parent) = scope();
        let (_child_trigger, child) = parent.child_scope();

        let waiter = tokio::spawn(async move { child.cancelled().await });
        parent_trigger.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("child token should wake")
            .unwrap();
    }
}
