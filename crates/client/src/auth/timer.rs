//! Single-slot one-shot timer used for proactive token refresh.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Holds at most one armed timer task.
///
/// Arming cancels the previous task first. A fired task calls
/// [`RefreshTimer::release`] with its generation before doing any work, which
/// detaches it from the slot so a re-arm from inside the task cannot abort it.
#[derive(Debug, Default)]
pub(crate) struct RefreshTimer {
    slot: Mutex<Slot>,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    armed: Option<Armed>,
}

#[derive(Debug)]
struct Armed {
    generation: u64,
    deadline: Instant,
    handle: JoinHandle<()>,
}

impl RefreshTimer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Cancel any armed task, then spawn `fire(generation)` to run after `delay`.
    pub(crate) fn arm<F, Fut>(&self, delay: Duration, fire: F)
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.lock();
        if let Some(previous) = slot.armed.take() {
            previous.handle.abort();
        }

        slot.generation += 1;
        let generation = slot.generation;
        let deadline = Instant::now() + delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            fire(generation).await;
        });

        slot.armed = Some(Armed {
            generation,
            deadline,
            handle,
        });
    }

    /// Abort the armed task, if any.
    pub(crate) fn cancel(&self) {
        if let Some(armed) = self.lock().armed.take() {
            armed.handle.abort();
        }
    }

    /// Detach the task of `generation` from the slot without aborting it.
    ///
    /// Returns `false` if that task has since been replaced or cancelled.
    pub(crate) fn release(&self, generation: u64) -> bool {
        let mut slot = self.lock();
        match &slot.armed {
            Some(armed) if armed.generation == generation => {
                slot.armed = None;
                true
            }
            _ => false,
        }
    }

    /// When the armed task fires, if one is armed.
    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.lock().armed.as_ref().map(|armed| armed.deadline)
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
