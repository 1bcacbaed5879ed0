use std::{sync::Arc, time::Duration};

use log::error;
use tokio::{sync::Mutex, task::JoinHandle, time};

use crate::{error::ProjectError, state::StateHandle, storage::ProjectGateway};

struct PendingSave {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Slot {
    pending: Option<PendingSave>,
    generation: u64,
}

/// Coalesces bursts of edits into one write after a quiet period. At most one
/// save is pending; scheduling again pushes it back. The write always takes
/// the project as it is when the timer fires, so only the latest edit lands.
#[derive(Clone)]
pub struct SaveDebouncer {
    gateway: Arc<dyn ProjectGateway>,
    state: StateHandle,
    delay: Duration,
    slot: Arc<Mutex<Slot>>,
}

impl SaveDebouncer {
    pub fn new(gateway: Arc<dyn ProjectGateway>, state: StateHandle, delay: Duration) -> Self {
        Self {
            gateway,
            state,
            delay,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    pub async fn schedule(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(previous) = slot.pending.take() {
            previous.handle.abort();
        }
        slot.generation = slot.generation.wrapping_add(1);
        let generation = slot.generation;

        let debouncer = self.clone();
        let handle = tokio::spawn(async move {
            time::sleep(debouncer.delay).await;
            // Claiming the slot first means a later `schedule` cannot abort a
            // write that is already under way.
            let claimed = {
                let mut slot = debouncer.slot.lock().await;
                match slot.pending.as_ref() {
                    Some(pending) if pending.generation == generation => slot.pending.take(),
                    _ => None,
                }
            };
            if claimed.is_some() {
                let _ = debouncer.write().await;
            }
        });

        slot.pending = Some(PendingSave { generation, handle });
    }

    pub async fn has_pending(&self) -> bool {
        self.slot.lock().await.pending.is_some()
    }

    /// Writes now instead of waiting out the delay. No-op when nothing is pending.
    pub async fn flush(&self) -> Result<(), ProjectError> {
        let pending = self.slot.lock().await.pending.take();
        match pending {
            Some(pending) => {
                pending.handle.abort();
                self.write().await
            }
            None => Ok(()),
        }
    }

    /// Drops the pending save without writing.
    pub async fn cancel(&self) {
        if let Some(pending) = self.slot.lock().await.pending.take() {
            pending.handle.abort();
        }
    }

    async fn write(&self) -> Result<(), ProjectError> {
        let project = self.state.snapshot().await.project;
        let result = self.gateway.save(&project).await;
        if let Err(err) = &result {
            error!("{err}");
            self.state.push_notice(err.notice()).await;
        }
        result
    }
}
