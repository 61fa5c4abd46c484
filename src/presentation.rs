//! Presentation surface affinity
//!
//! Modal dialogs block the calling thread and must run on whichever thread owns
//! the operator surface. [`PresentationThread`] owns that thread and lets async
//! handlers marshal blocking work onto it, awaiting the reply with cancellation.

use crate::cancel::CancelToken;
use crate::error::{HandlerError, Result, SeqError};
use std::panic::{self, AssertUnwindSafe};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Handle to the thread that owns the presentation surface
pub struct PresentationThread {
    name: String,
    jobs: mpsc::UnboundedSender<Job>,
}

impl PresentationThread {
    /// Start the surface thread. It runs until every handle is dropped.
    pub fn spawn(name: &str) -> Result<Self> {
        let (jobs, mut queue) = mpsc::unbounded_channel::<Job>();
        let thread_name = name.to_string();

        std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                while let Some(job) = queue.blocking_recv() {
                    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                        error!("Presentation job panicked on {}", thread_name);
                    }
                }
                debug!("Presentation thread {} stopped", thread_name);
            })
            .map_err(|e| SeqError::Presentation(format!("Failed to start {}: {}", name, e)))?;

        Ok(Self {
            name: name.to_string(),
            jobs,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run `job` on the surface thread and wait for its result.
    ///
    /// Cancellation stops the wait, not the job: a dialog already on screen
    /// stays there until the operator dismisses it.
    pub async fn invoke<F, R>(&self, job: F, token: &CancelToken) -> std::result::Result<R, HandlerError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply, response) = oneshot::channel();

        self.jobs
            .send(Box::new(move || {
                let _ = reply.send(job());
            }))
            .map_err(|_| HandlerError::Presentation(format!("{} has stopped", self.name)))?;

        match token.run_until_cancelled(response).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(HandlerError::Presentation(format!(
                "{} dropped the request",
                self.name
            ))),
            Err(_) => Err(HandlerError::Cancelled),
        }
    }
}
