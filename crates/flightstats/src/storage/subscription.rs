//! Continuously-updating view of all flight records.

use std::sync::{Arc, Weak};

use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tracing::{debug, warn};

use crate::error::Result;
use crate::record::FlightRecord;

use super::{FlightStore, Inner, TableChange};

/// A live subscription to the full record list, newest first.
///
/// The first [`next`](Self::next) yields the current snapshot. Each later call
/// waits for a committed insert or delete and yields a fresh snapshot. All
/// changes pending at wake-up, including any the subscriber lagged past,
/// produce a single snapshot. Dropping the subscription, or calling
/// [`unsubscribe`](Self::unsubscribe), frees its slot.
///
/// The subscription does not keep the store alive.
#[derive(Debug)]
pub struct RecordsSubscription {
    store: Weak<Inner>,
    changes: broadcast::Receiver<TableChange>,
    primed: bool,
}

impl RecordsSubscription {
    pub(super) fn new(store: &FlightStore) -> Self {
        Self {
            store: Arc::downgrade(&store.inner),
            changes: store.inner.changes.subscribe(),
            primed: false,
        }
    }

    /// Wait for the next snapshot.
    ///
    /// Returns `None` once every [`FlightStore`] handle has been dropped. A
    /// failed re-query is returned as `Some(Err(_))`; the subscription stays
    /// usable.
    pub async fn next(&mut self) -> Option<Result<Vec<FlightRecord>>> {
        if self.primed {
            match self.changes.recv().await {
                Ok(change) => debug!("Records subscription woke on {:?}", change),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        "Records subscription lagged, {} change notifications collapsed",
                        skipped
                    );
                }
                Err(RecvError::Closed) => return None,
            }
            self.drain_pending();
        }
        self.primed = true;

        let store = FlightStore {
            inner: self.store.upgrade()?,
        };
        Some(store.all_records().await)
    }

    /// Discard notifications already queued; the next snapshot covers them.
    fn drain_pending(&mut self) {
        loop {
            match self.changes.try_recv() {
                Ok(_) | Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }

    /// Detach from the store. No further snapshots are produced.
    pub fn unsubscribe(self) {
        debug!("Records subscription detached");
    }
}
