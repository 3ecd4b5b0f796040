//! Shared plumbing for the collective engines: index arithmetic, scratch
//! allocation, and point-to-point wrappers that label failures with the
//! operation and rank they occurred at.

use crate::comm::Communicator;
use crate::error::{CohortError, Result};
use crate::p2p::PointToPoint;
use crate::types::{CollAttr, Rank, Tag};

/// Smallest `p` with `2^p >= n`; 0 for `n <= 1`.
pub(crate) fn ceil_log2(n: u32) -> u32 {
    if n <= 1 {
        0
    } else {
        32 - (n - 1).leading_zeros()
    }
}

/// Reverse the low `bits` bits of `index`.
pub(crate) fn bit_reverse(index: u32, bits: u32) -> u32 {
    if bits == 0 {
        index
    } else {
        index.reverse_bits() >> (32 - bits)
    }
}

/// Allocate a zeroed scratch buffer, surfacing allocation failure as an
/// error instead of aborting. Scratch is allocated before any messages go
/// out, so a failed allocation never leaves peers waiting.
pub(crate) fn alloc_scratch(nbytes: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(nbytes)
        .map_err(|_| CohortError::AllocationFailed { bytes: nbytes })?;
    buf.resize(nbytes, 0);
    Ok(buf)
}

fn fail(operation: &'static str, rank: Rank, err: CohortError) -> CohortError {
    match err {
        e @ CohortError::CollectiveFailed { .. } => e,
        e => CohortError::CollectiveFailed {
            operation,
            rank,
            reason: e.to_string(),
        },
    }
}

pub(crate) async fn coll_send<T: PointToPoint>(
    comm: &Communicator<T>,
    operation: &'static str,
    dest: Rank,
    tag: Tag,
    payload: &[u8],
    attr: CollAttr,
) -> Result<()> {
    comm.send(dest, tag, payload, attr)
        .await
        .map_err(|e| fail(operation, comm.rank(), e))
}

pub(crate) async fn coll_recv<T: PointToPoint>(
    comm: &Communicator<T>,
    operation: &'static str,
    src: Rank,
    tag: Tag,
) -> Result<Vec<u8>> {
    comm.recv(src, tag)
        .await
        .map_err(|e| fail(operation, comm.rank(), e))
}

/// Receive a payload that must be exactly `expected` bytes.
pub(crate) async fn coll_recv_exact<T: PointToPoint>(
    comm: &Communicator<T>,
    operation: &'static str,
    src: Rank,
    tag: Tag,
    expected: usize,
) -> Result<Vec<u8>> {
    let payload = coll_recv(comm, operation, src, tag).await?;
    if payload.len() != expected {
        return Err(CohortError::CollectiveFailed {
            operation,
            rank: comm.rank(),
            reason: format!(
                "peer {src} sent {} bytes, expected {expected}",
                payload.len()
            ),
        });
    }
    Ok(payload)
}

/// Atomic combined send + receive; the reply must be exactly `expected`
/// bytes. `dest` and `src` may name different ranks (dissemination) or
/// the same peer (butterfly, pairwise exchange).
pub(crate) async fn coll_send_recv<T: PointToPoint>(
    comm: &Communicator<T>,
    operation: &'static str,
    dest: Rank,
    payload: &[u8],
    src: Rank,
    tag: Tag,
    expected: usize,
    attr: CollAttr,
) -> Result<Vec<u8>> {
    let received = comm
        .send_recv(dest, payload, src, tag, attr)
        .await
        .map_err(|e| fail(operation, comm.rank(), e))?;
    if received.len() != expected {
        return Err(CohortError::CollectiveFailed {
            operation,
            rank: comm.rank(),
            reason: format!(
                "peer {src} sent {} bytes, expected {expected}",
                received.len()
            ),
        });
    }
    Ok(received)
}
