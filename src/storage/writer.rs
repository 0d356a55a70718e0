//! Fire-and-forget result writer. `submit` only enqueues; a dedicated thread
//! drains the queue into the store and the uplink, logging failures.

use super::{SecureStore, StoredResult};
use crate::uplink::UplinkClient;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub struct ResultWriter {
    tx: Option<mpsc::UnboundedSender<StoredResult>>,
    handle: Option<JoinHandle<()>>,
}

impl ResultWriter {
    pub fn spawn(store: Option<Arc<SecureStore>>, uplink: Option<UplinkClient>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<StoredResult>();
        let handle = std::thread::Builder::new()
            .name("result-writer".into())
            .spawn(move || {
                while let Some(result) = rx.blocking_recv() {
                    let id = result.assessment.id.clone();
                    if let Some(store) = &store {
                        match store.insert_result(&result) {
                            Ok(()) => debug!(result_id = %id, "result stored"),
                            Err(e) => warn!(result_id = %id, error = %e, "result store failed"),
                        }
                    }
                    if let Some(uplink) = &uplink {
                        if let Err(e) = uplink.report(&result) {
                            warn!(result_id = %id, error = %e, "uplink report failed");
                        }
                    }
                }
            });
        let handle = match handle {
            Ok(h) => Some(h),
            Err(e) => {
                warn!(error = %e, "result writer thread not started; results will not be persisted");
                None
            }
        };
        Self {
            tx: Some(tx),
            handle,
        }
    }

    /// Queue a result. Never blocks and never fails the caller.
    pub fn submit(&self, result: StoredResult) {
        if self.handle.is_none() {
            return;
        }
        if let Some(tx) = &self.tx {
            if tx.send(result).is_err() {
                warn!("result writer stopped; result dropped");
            }
        }
    }

    /// Close the queue and wait for pending writes.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        self.tx.take();
        if let Some(h) = self.handle.take() {
            if h.join().is_err() {
                warn!("result writer panicked");
            }
        }
    }
}

impl Drop for ResultWriter {
    fn drop(&mut self) {
        self.close();
    }
}
