//! Background snapshot writer.
//!
//! States are queued in the order operations complete and written by one
//! worker task, so a write never lands after a later state's write. When the
//! worker falls behind, queued states collapse to the newest one.

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::document::DocumentState;
use crate::snapshot::SnapshotManager;

enum Request {
    Save(DocumentState),
    Flush(oneshot::Sender<()>),
}

pub struct Autosave {
    name: String,
    sender: mpsc::UnboundedSender<Request>,
    worker: JoinHandle<usize>,
}

impl Autosave {
    /// Start the worker. Must be called inside a tokio runtime.
    pub fn spawn(manager: SnapshotManager, name: impl Into<String>) -> Self {
        let name = name.into();
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run(manager, name.clone(), receiver));
        log::info!("Autosave enabled as '{}'", name);
        Self {
            name,
            sender,
            worker,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn enqueue(&self, state: DocumentState) {
        if self.sender.send(Request::Save(state)).is_err() {
            log::warn!("Autosave worker stopped, dropping state");
        }
    }

    /// Wait until everything queued so far is on disk.
    pub async fn flush(&self) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.sender
            .send(Request::Flush(ack))
            .map_err(|_| anyhow::anyhow!("Autosave worker stopped"))?;
        done.await.context("Autosave worker stopped before flushing")?;
        Ok(())
    }

    /// Drain the queue and stop the worker, returning how many writes it made.
    pub async fn shutdown(self) -> Result<usize> {
        drop(self.sender);
        let writes = self.worker.await.context("Autosave worker panicked")?;
        log::debug!("Autosave '{}' stopped after {} writes", self.name, writes);
        Ok(writes)
    }
}

async fn run(
    manager: SnapshotManager,
    name: String,
    mut receiver: mpsc::UnboundedReceiver<Request>,
) -> usize {
    let mut writes = 0;

    while let Some(first) = receiver.recv().await {
        let mut latest = None;
        let mut acks = Vec::new();

        let mut next = Some(first);
        while let Some(request) = next {
            match request {
                Request::Save(state) => latest = Some(state),
                Request::Flush(ack) => acks.push(ack),
            }
            next = receiver.try_recv().ok();
        }

        if let Some(state) = latest {
            match manager.save(&name, &state).await {
                Ok(_) => writes += 1,
                Err(e) => log::error!("Autosave of '{}' failed: {:#}", name, e),
            }
        }
        for ack in acks {
            let _ = ack.send(());
        }
    }

    writes
}
