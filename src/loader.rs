use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

use indextree::NodeId;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, warn};

use crate::entry::SharedEntry;
use crate::preview::{read_preview, Preview, PreviewKind};

/// Identifies which request a result answers. The generation changes every
/// time the root is replaced, so ids from an old arena never match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub generation: u64,
    pub node: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Children,
    Preview,
}

#[derive(Debug)]
pub enum LoadResult {
    Children {
        ticket: Ticket,
        entries: Vec<SharedEntry>,
    },
    Preview {
        ticket: Ticket,
        preview: Preview,
    },
    /// The job panicked before producing a result.
    Failed {
        ticket: Ticket,
        job: JobKind,
        reason: String,
    },
}

impl LoadResult {
    pub fn ticket(&self) -> Ticket {
        match self {
            LoadResult::Children { ticket, .. }
            | LoadResult::Preview { ticket, .. }
            | LoadResult::Failed { ticket, .. } => *ticket,
        }
    }
}

/// Worker pool for directory listings and preview reads. Results come back
/// through a channel the owner drains on its own thread.
pub struct Loader {
    pool: Option<ThreadPool>,
    tx: Sender<LoadResult>,
    rx: Receiver<LoadResult>,
}

impl Loader {
    pub fn new(threads: usize) -> Self {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("filenav-io-{i}"))
            .build();
        let pool = match pool {
            Ok(pool) => Some(pool),
            Err(err) => {
                warn!(error = %err, "worker pool unavailable, using global rayon pool");
                None
            }
        };

        let (tx, rx) = mpsc::channel();
        Self { pool, tx, rx }
    }

    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match &self.pool {
            Some(pool) => pool.spawn(job),
            None => rayon::spawn(job),
        }
    }

    pub fn request_children(&self, ticket: Ticket, entry: SharedEntry) {
        let tx = self.tx.clone();
        debug!(entry = entry.label(), "scheduling listing");
        self.spawn(move || {
            let result = catch_unwind(AssertUnwindSafe(|| entry.list_children()));
            let message = match result {
                Ok(entries) => LoadResult::Children { ticket, entries },
                Err(panic) => LoadResult::Failed {
                    ticket,
                    job: JobKind::Children,
                    reason: panic_reason(panic),
                },
            };
            // Receiver gone means the owner shut down; nothing to report to.
            let _ = tx.send(message);
        });
    }

    pub fn request_preview(
        &self,
        ticket: Ticket,
        entry: SharedEntry,
        kind: PreviewKind,
        max_bytes: usize,
    ) {
        let tx = self.tx.clone();
        self.spawn(move || {
            let result = catch_unwind(AssertUnwindSafe(|| {
                read_preview(entry.as_ref(), kind, max_bytes)
            }));
            let message = match result {
                Ok(preview) => LoadResult::Preview { ticket, preview },
                Err(panic) => LoadResult::Failed {
                    ticket,
                    job: JobKind::Preview,
                    reason: panic_reason(panic),
                },
            };
            let _ = tx.send(message);
        });
    }

    /// Everything that has arrived so far, without blocking.
    pub fn drain(&self) -> Vec<LoadResult> {
        let mut results = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(result) => results.push(result),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        results
    }

    /// Block until one result arrives or `timeout` elapses.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<LoadResult> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

fn panic_reason(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
