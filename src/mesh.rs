//! In-process transport backing: every rank is a task in one process and
//! messages move through shared mailboxes. This is the transport the test
//! suite drives the collective engines with, and it doubles as a
//! single-host runtime for co-located workers.

use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tracing::trace;

use crate::error::{CohortError, Result};
use crate::p2p::{PointToPoint, WireTag};
use crate::types::{CollAttr, Rank};

struct Envelope {
    src: Rank,
    tag: WireTag,
    payload: Vec<u8>,
}

/// One rank's inbound queue. Messages are matched by `(src, tag)` in
/// arrival order; non-matching messages stay queued.
struct Mailbox {
    queue: Mutex<Vec<Envelope>>,
    arrived: Notify,
}

struct MeshState {
    mailboxes: Vec<Mailbox>,
}

/// A rank endpoint on an in-process mesh.
///
/// All endpoints created by one [`LocalMesh::bootstrap`] call share the
/// mailboxes, so a payload sent from any endpoint is visible to the
/// destination's `recv` as soon as it is pushed.
pub struct LocalMesh {
    state: Arc<MeshState>,
    rank: Rank,
}

impl LocalMesh {
    /// Create `world_size` connected endpoints, one per rank.
    pub fn bootstrap(world_size: u32) -> Vec<LocalMesh> {
        let state = Arc::new(MeshState {
            mailboxes: (0..world_size)
                .map(|_| Mailbox {
                    queue: Mutex::new(Vec::new()),
                    arrived: Notify::new(),
                })
                .collect(),
        });
        (0..world_size)
            .map(|rank| LocalMesh {
                state: Arc::clone(&state),
                rank,
            })
            .collect()
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn world_size(&self) -> u32 {
        self.state.mailboxes.len() as u32
    }

    fn mailbox(&self, rank: Rank) -> Result<&Mailbox> {
        self.state
            .mailboxes
            .get(rank as usize)
            .ok_or(CohortError::InvalidRank {
                rank,
                world_size: self.world_size(),
            })
    }
}

impl PointToPoint for LocalMesh {
    async fn send(&self, dest: Rank, tag: WireTag, payload: &[u8], _attr: CollAttr) -> Result<()> {
        let mbox = self.mailbox(dest)?;
        trace!(src = self.rank, dest, tag, len = payload.len(), "mesh send");
        {
            let mut queue = mbox
                .queue
                .lock()
                .map_err(|_| CohortError::LockPoisoned("mailbox"))?;
            queue.push(Envelope {
                src: self.rank,
                tag,
                payload: payload.to_vec(),
            });
        }
        mbox.arrived.notify_waiters();
        Ok(())
    }

    async fn recv(&self, src: Rank, tag: WireTag) -> Result<Vec<u8>> {
        self.mailbox(src)?;
        let mbox = self.mailbox(self.rank)?;
        loop {
            // Register for wakeups before inspecting the queue, so a send
            // that lands between the check and the await is not lost.
            let notified = mbox.arrived.notified();
            let mut notified = std::pin::pin!(notified);
            notified.as_mut().enable();

            {
                let mut queue = mbox
                    .queue
                    .lock()
                    .map_err(|_| CohortError::LockPoisoned("mailbox"))?;
                if let Some(pos) = queue.iter().position(|e| e.src == src && e.tag == tag) {
                    let envelope = queue.remove(pos);
                    trace!(
                        src,
                        dst = self.rank,
                        tag,
                        len = envelope.payload.len(),
                        "mesh recv"
                    );
                    return Ok(envelope.payload);
                }
            }

            notified.await;
        }
    }
}
