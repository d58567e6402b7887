//! Worker thread shared by all built-in stages.
//!
//! Each stage gets a dedicated thread running a poll loop: check the
//! shutdown channel, run one tick, sleep briefly when the tick had
//! nothing to do. Stages never share threads; a stage blocked in its own
//! tick can only ever stall itself.

use std::thread;
use std::time::Duration;

/// Sleep between idle ticks.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_micros(500);

#[derive(Debug)]
pub(crate) struct StageWorker {
    id: String,
    shutdown_tx: crossbeam_channel::Sender<()>,
    thread: Option<thread::JoinHandle<()>>,
}

impl StageWorker {
    /// Spawn the loop. `tick` returns `true` when it had no work, which
    /// makes the loop sleep before polling again.
    pub fn spawn<F>(id: &str, mut tick: F) -> std::io::Result<Self>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let thread_id = id.to_string();
        let thread = thread::Builder::new()
            .name(thread_id.clone())
            .spawn(move || {
                tracing::debug!("[{}] worker started", thread_id);
                loop {
                    if shutdown_rx.try_recv().is_ok() {
                        break;
                    }
                    if tick() {
                        thread::sleep(POLL_INTERVAL);
                    }
                }
                tracing::debug!("[{}] worker stopped", thread_id);
            })?;

        Ok(Self {
            id: id.to_string(),
            shutdown_tx,
            thread: Some(thread),
        })
    }

    /// Signal the loop and block until the thread has quiesced.
    pub fn stop(mut self) {
        let _ = self.shutdown_tx.try_send(());
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                tracing::error!("[{}] worker thread panicked", self.id);
            }
        }
    }
}
