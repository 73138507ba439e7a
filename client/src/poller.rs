use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::debug;

use crate::error::PlatformError;
use crate::report::Spinner;

/// How a bounded wait ended when no probe failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Done,
    /// Deadline passed first. A soft failure, not an error.
    TimedOut,
}

/// Spinner texts for one kind of wait.
#[derive(Debug, Clone, Copy)]
pub struct WaitMessages {
    pub waiting: &'static str,
    pub done: &'static str,
    pub failed: &'static str,
    pub timed_out: &'static str,
}

/// Aborts the probe loop when dropped, so a lost race never leaves it
/// running in the background.
struct ProbeTask(JoinHandle<Result<(), PlatformError>>);

impl Drop for ProbeTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Calls `probe` right away and then every `interval` until it returns
/// `Ok(true)` or an error, racing the whole loop against `timeout`.
///
/// The loop runs in its own task, so a probe stuck on a slow request does not
/// delay the timeout. Whichever finishes first decides the result; the probe
/// task is aborted on the way out.
pub async fn wait_until<F, Fut>(
    mut probe: F,
    interval: Duration,
    timeout: Duration,
    messages: &WaitMessages,
) -> Result<WaitOutcome, PlatformError>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<bool, PlatformError>> + Send + 'static,
{
    let spinner = Spinner::start(messages.waiting);

    let mut task = ProbeTask(tokio::spawn(async move {
        loop {
            if probe().await? {
                return Ok(());
            }
            sleep(interval).await;
        }
    }));

    tokio::select! {
        joined = &mut task.0 => match joined {
            Ok(Ok(())) => {
                spinner.succeed(messages.done);
                Ok(WaitOutcome::Done)
            }
            Ok(Err(e)) => {
                spinner.fail(messages.failed);
                Err(e)
            }
            Err(e) => {
                spinner.fail(messages.failed);
                Err(PlatformError::Probe(e))
            }
        },
        _ = sleep(timeout) => {
            debug!("wait timed out after {:?}", timeout);
            spinner.fail(messages.timed_out);
            Ok(WaitOutcome::TimedOut)
        }
    }
}
