use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use sheetnest::io::ext_repr::ExtInstance;
use sheetnest::io::import::Importer;

use crate::config::NestConfig;
use crate::observer::{NestEvent, NestObserver};
use crate::orchestrator::{NestOutcome, NestReport, Nester};

/// Progress updates beyond this many unread ones are dropped
const PROGRESS_CAPACITY: usize = 16;

/// Everything a worker needs to run a nesting
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NestRequest {
    pub instance: ExtInstance,
    #[serde(default)]
    pub config: NestConfig,
}

/// Terminal result of a worker
#[derive(Clone, Debug)]
pub enum NestResult {
    Finished(NestReport),
    Interrupted { report: NestReport, remaining: usize },
    /// The instance or the configuration is invalid
    Rejected(String),
    /// The engine panicked
    Failed(String),
}

/// Runs a nesting on a dedicated thread.
/// Progress (0 to 100, non-decreasing) is reported on a bounded channel which never blocks the engine,
/// exactly one [`NestResult`] is delivered at the end.
pub struct NestWorker {
    cancel: Arc<AtomicBool>,
    progress: Receiver<u8>,
    result: Receiver<NestResult>,
    handle: JoinHandle<()>,
}

impl NestWorker {
    pub fn spawn(request: NestRequest) -> Result<Self> {
        let (progress_tx, progress_rx) = sync_channel(PROGRESS_CAPACITY);
        let (result_tx, result_rx) = sync_channel(1);
        let cancel = Arc::new(AtomicBool::new(false));

        let thread_cancel = cancel.clone();
        let handle = thread::Builder::new()
            .name("nest-worker".into())
            .spawn(move || {
                let result = match catch_unwind(AssertUnwindSafe(|| {
                    execute(request, &progress_tx, &thread_cancel)
                })) {
                    Ok(result) => result,
                    Err(payload) => {
                        let msg = panic_message(payload);
                        error!("[WORKER] engine panicked: {msg}");
                        NestResult::Failed(msg)
                    }
                };
                if result_tx.send(result).is_err() {
                    warn!("[WORKER] result dropped, nobody is waiting for it");
                }
            })
            .context("could not spawn the nest worker thread")?;

        Ok(NestWorker {
            cancel,
            progress: progress_rx,
            result: result_rx,
            handle,
        })
    }

    /// Requests the engine to stop at the next unit or generation
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Progress updates. The channel disconnects when the worker is done.
    pub fn progress(&self) -> &Receiver<u8> {
        &self.progress
    }

    /// Blocks until the worker delivers its result
    pub fn wait(self) -> NestResult {
        let result = self.result.recv().unwrap_or_else(|_| {
            NestResult::Failed("the worker terminated without a result".to_string())
        });
        if self.handle.join().is_err() {
            warn!("[WORKER] worker thread did not terminate cleanly");
        }
        result
    }
}

fn execute(request: NestRequest, progress: &SyncSender<u8>, cancel: &AtomicBool) -> NestResult {
    let NestRequest { instance, config } = request;
    let nester = Importer
        .import_instance(&instance)
        .and_then(|instance| Nester::new(instance, config));
    let mut nester = match nester {
        Ok(nester) => nester,
        Err(e) => {
            warn!("[WORKER] request rejected: {e:#}");
            return NestResult::Rejected(format!("{e:#}"));
        }
    };

    let mut forwarder = ProgressForwarder {
        sender: progress,
        last: None,
    };
    match nester.run(&mut forwarder, cancel) {
        Ok(NestOutcome::Finished(report)) => {
            info!("[WORKER] finished");
            NestResult::Finished(report)
        }
        Ok(NestOutcome::Interrupted { report, remaining }) => {
            info!("[WORKER] interrupted, {remaining} instances remaining");
            NestResult::Interrupted { report, remaining }
        }
        Err(e) => NestResult::Failed(format!("{e:#}")),
    }
}

/// Forwards progress events to the channel, dropping them when it is full
struct ProgressForwarder<'a> {
    sender: &'a SyncSender<u8>,
    last: Option<u8>,
}

impl NestObserver for ProgressForwarder<'_> {
    fn notify(&mut self, event: NestEvent) {
        if let NestEvent::Progress(pct) = event {
            if self.last.is_none_or(|last| pct > last) && self.sender.try_send(pct).is_ok() {
                self.last = Some(pct);
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(msg) => *msg,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(msg) => msg.to_string(),
            Err(_) => "unknown panic".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_messages_are_recovered() {
        let payload = catch_unwind(|| panic!("boom {}", 1)).unwrap_err();
        assert_eq!(panic_message(payload), "boom 1");
        let payload = catch_unwind(|| std::panic::panic_any(42)).unwrap_err();
        assert_eq!(panic_message(payload), "unknown panic");
    }

    #[test]
    fn progress_forwarder_never_decreases_nor_blocks() {
        let (tx, rx) = sync_channel(2);
        let mut forwarder = ProgressForwarder {
            sender: &tx,
            last: None,
        };
        for pct in [10, 5, 10, 20, 30, 40] {
            forwarder.notify(NestEvent::Progress(pct));
        }
        drop(forwarder);
        drop(tx);
        //the channel filled up after two updates, the rest was dropped
        assert_eq!(rx.iter().collect::<Vec<_>>(), vec![10, 20]);
    }
}
