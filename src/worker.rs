//! Run a blocking job on a dedicated thread with an upper bound on how long
//! the caller waits for it.

use crate::{Error, Result};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Run `job` on a named worker thread and wait at most `timeout` for it.
///
/// On expiry the caller gets `Error::Timeout` and the worker is left to
/// finish on its own; whatever it owns is released when it returns.
pub fn run_with_deadline<T, F>(name: &str, timeout: Duration, job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            // Receiver is gone once the deadline has passed
            let _ = tx.send(job());
        })
        .map_err(|e| Error::Other(format!("Failed to spawn {} worker: {}", name, e)))?;

    match rx.recv_timeout(timeout) {
        Ok(res) => res,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(Error::Timeout(timeout.as_millis() as u64)),
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(Error::Other(format!("{} worker exited without a result", name)))
        }
    }
}
