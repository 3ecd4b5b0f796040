//! The point-to-point interface the collective engines consume, plus
//! request handles for nonblocking operations.
//!
//! The real network transport lives outside this crate; anything that can
//! deliver tagged byte payloads between ranks can back the algorithms.
//! [`crate::mesh::LocalMesh`] provides an in-process implementation for
//! tests and single-host runs.

use std::future::Future;

use futures::future::try_join_all;
use tokio::task::JoinHandle;

use crate::error::{CohortError, Result};
use crate::types::{CollAttr, Rank};

/// Wire-level tag: a communicator context id combined with the
/// collective-scoped [`crate::types::Tag`].
pub type WireTag = u64;

/// Blocking point-to-point primitives.
///
/// `send` completes when the payload is accepted by the transport; `recv`
/// completes when a message matching `(src, tag)` has arrived. Matching
/// must be FIFO per `(src, tag)` pair and independent across tags, so
/// out-of-order arrivals for unrelated collectives never block each other.
///
/// Neither call carries a timeout: a blocking exchange blocks until its
/// peer reaches the matching call, and a hang indicates a
/// scheduling-divergence bug, not a recoverable condition.
pub trait PointToPoint: Send + Sync + 'static {
    fn send(
        &self,
        dest: Rank,
        tag: WireTag,
        payload: &[u8],
        attr: CollAttr,
    ) -> impl Future<Output = Result<()>> + Send;

    fn recv(&self, src: Rank, tag: WireTag) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Handle to an outstanding nonblocking send or receive.
///
/// A request is *pending* until [`Request::wait`] consumes it; completing
/// releases the payload the operation referenced. Dropping a pending
/// request detaches the operation.
#[derive(Debug)]
pub struct Request {
    handle: JoinHandle<Result<Vec<u8>>>,
}

impl Request {
    pub(crate) fn from_handle(handle: JoinHandle<Result<Vec<u8>>>) -> Self {
        Self { handle }
    }

    /// Block until the operation completes. Receives yield the payload;
    /// sends yield an empty buffer.
    pub async fn wait(self) -> Result<Vec<u8>> {
        self.handle
            .await
            .map_err(|e| CohortError::transport_with_source("nonblocking operation aborted", e))?
    }
}

/// Wait for every request, surfacing the first error.
pub async fn wait_all(requests: impl IntoIterator<Item = Request>) -> Result<Vec<Vec<u8>>> {
    try_join_all(requests.into_iter().map(Request::wait)).await
}

/// Largest dissemination radix served by the inline request slots.
pub(crate) const MAX_RADIX: usize = 8;

const INLINE_SLOTS: usize = 2 * (MAX_RADIX - 1);

/// Small-size-optimized array of request slots.
///
/// Capacity is chosen by radix at call time: below the inline threshold
/// the slots live on the stack, above it they are heap-allocated and
/// released when the set drops. Slots are indexed so callers can
/// double-buffer requests across phases.
pub(crate) enum RequestSet {
    Inline([Option<Request>; INLINE_SLOTS]),
    Heap(Vec<Option<Request>>),
}

impl RequestSet {
    pub(crate) fn with_capacity(n: usize) -> Self {
        if n <= INLINE_SLOTS {
            RequestSet::Inline(std::array::from_fn(|_| None))
        } else {
            RequestSet::Heap((0..n).map(|_| None).collect())
        }
    }

    fn slot(&mut self, index: usize) -> &mut Option<Request> {
        match self {
            RequestSet::Inline(slots) => &mut slots[index],
            RequestSet::Heap(slots) => &mut slots[index],
        }
    }

    /// Park a request in an empty slot. Reusing a slot whose request has
    /// not been waited on is a schedule bug.
    pub(crate) fn put(&mut self, index: usize, request: Request) {
        let slot = self.slot(index);
        debug_assert!(slot.is_none(), "request slot {index} reused before completion");
        *slot = Some(request);
    }

    /// Wait on the requests in `[start, start + len)`, surfacing the
    /// first error. Empty slots are skipped; waited slots become free.
    pub(crate) async fn wait_range(&mut self, start: usize, len: usize) -> Result<()> {
        for i in start..start + len {
            if let Some(request) = self.slot(i).take() {
                request.wait().await?;
            }
        }
        Ok(())
    }
}
