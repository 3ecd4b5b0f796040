//! In-place pairwise all-to-all with per-peer counts, displacements, and
//! layouts.
//!
//! Every rank walks the identical `(i, j >= i)` schedule and exchanges
//! one block at a time with an atomic send-receive, so memory use stays
//! at one peer block and all ranks agree on the pairing order; a
//! divergent schedule would deadlock the synchronous exchanges.

use crate::comm::Communicator;
use crate::error::{CohortError, Result};
use crate::p2p::PointToPoint;
use crate::types::{CollAttr, Layout, Rank, Tag};

use super::helpers::coll_send_recv;

/// Exchange block `j` of `buf` with every rank `j`, in place.
///
/// `counts[j]`, `displs[j]`, and `layouts[j]` describe the block this
/// rank holds for peer `j`: `counts[j]` packed elements of `layouts[j]`
/// starting `displs[j]` bytes into `buf`. On return each block holds what
/// the peer previously held for this rank. All three slices must have one
/// entry per rank.
pub async fn pairwise_alltoallw<T: PointToPoint>(
    comm: &Communicator<T>,
    buf: &mut [u8],
    counts: &[usize],
    displs: &[usize],
    layouts: &[Layout],
    tag: Tag,
    attr: CollAttr,
) -> Result<()> {
    let size = comm.size() as usize;
    let rank = comm.rank();
    for len in [counts.len(), displs.len(), layouts.len()] {
        if len != size {
            return Err(CohortError::ScheduleMismatch {
                operation: "alltoallw",
                expected: size,
                actual: len,
            });
        }
    }

    for i in 0..size {
        // start at i to avoid re-exchanging a completed pair
        for j in i..size {
            if rank == i as Rank {
                // covers the i == j self-exchange
                exchange_block(comm, buf, counts, displs, layouts, j as Rank, tag, attr).await?;
            } else if rank == j as Rank {
                exchange_block(comm, buf, counts, displs, layouts, i as Rank, tag, attr).await?;
            }
        }
    }
    Ok(())
}

/// Send the block held for `peer` and replace it with the peer's reply.
async fn exchange_block<T: PointToPoint>(
    comm: &Communicator<T>,
    buf: &mut [u8],
    counts: &[usize],
    displs: &[usize],
    layouts: &[Layout],
    peer: Rank,
    tag: Tag,
    attr: CollAttr,
) -> Result<()> {
    let idx = peer as usize;
    let nbytes = layouts[idx].packed_len(counts[idx]);
    let start = displs[idx];
    if start + nbytes > buf.len() {
        return Err(CohortError::BufferSizeMismatch {
            expected: start + nbytes,
            actual: buf.len(),
        });
    }

    let outgoing = buf[start..start + nbytes].to_vec();
    let received =
        coll_send_recv(comm, "alltoallw", peer, &outgoing, peer, tag, nbytes, attr).await?;
    buf[start..start + nbytes].copy_from_slice(&received);
    Ok(())
}
