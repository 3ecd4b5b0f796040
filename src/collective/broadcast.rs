//! Binomial-tree broadcast and the scatter half of the long-message
//! broadcast.

use crate::comm::Communicator;
use crate::error::{CohortError, Result};
use crate::p2p::PointToPoint;
use crate::types::{CollAttr, Rank, Tag};

use super::helpers::{coll_recv, coll_recv_exact, coll_send};

/// Binomial-tree broadcast of `buf` from `root` to every rank.
///
/// Participation halves each round on a bit of the root-relative rank:
/// a rank first ascends the mask bits to receive from its parent, then
/// descends, forwarding to each child whose relative rank is within range.
pub async fn binomial_broadcast<T: PointToPoint>(
    comm: &Communicator<T>,
    buf: &mut [u8],
    root: Rank,
    tag: Tag,
    attr: CollAttr,
) -> Result<()> {
    let size = comm.size();
    let rank = comm.rank();
    if root >= size {
        return Err(CohortError::InvalidRank {
            rank: root,
            world_size: size,
        });
    }
    if size <= 1 {
        return Ok(());
    }

    let relative = (rank + size - root) % size;

    let mut mask: u32 = 1;
    while mask < size {
        if relative & mask != 0 {
            let src = (rank + size - mask) % size;
            let payload = coll_recv_exact(comm, "broadcast", src, tag, buf.len()).await?;
            buf.copy_from_slice(&payload);
            break;
        }
        mask <<= 1;
    }

    mask >>= 1;
    while mask > 0 {
        if relative + mask < size {
            let dst = (rank + mask) % size;
            coll_send(comm, "broadcast", dst, tag, buf, attr).await?;
        }
        mask >>= 1;
    }
    Ok(())
}

/// Scatter a root-owned contiguous buffer across the ranks as the first
/// half of a long-message broadcast; an external allgather completes it.
///
/// Every rank passes a full-size `buf`; on return, the slice belonging to
/// this rank is resident at the byte offset it occupies in the root's
/// buffer, namely `rel * ceil(nbytes / P)` for root-relative rank `rel`.
/// Returns the retained byte count, which is short for the last ranks and
/// zero for trailing ranks when `nbytes` does not divide evenly; that is
/// load balancing, not an error.
pub async fn scatter_for_broadcast<T: PointToPoint>(
    comm: &Communicator<T>,
    buf: &mut [u8],
    root: Rank,
    tag: Tag,
    attr: CollAttr,
) -> Result<usize> {
    let size = comm.size();
    let rank = comm.rank();
    if root >= size {
        return Err(CohortError::InvalidRank {
            rank: root,
            world_size: size,
        });
    }
    if size <= 1 {
        return Ok(buf.len());
    }

    let nbytes = buf.len() as i64;
    let size64 = size as i64;
    let scatter_size = (nbytes + size64 - 1) / size64;
    let relative = ((rank + size - root) % size) as i64;
    let mut curr_size: i64 = if rank == root { nbytes } else { 0 };

    let mut mask: i64 = 1;
    while mask < size64 {
        if relative & mask != 0 {
            let src = ((rank as i64 - mask).rem_euclid(size64)) as Rank;
            let recv_size = nbytes - relative * scatter_size;
            if recv_size <= 0 {
                // this rank's nominal slice starts past the end of the
                // buffer; it participates with no data
                curr_size = 0;
            } else {
                let payload = coll_recv(comm, "scatter", src, tag).await?;
                if payload.len() as i64 > recv_size {
                    return Err(CohortError::CollectiveFailed {
                        operation: "scatter",
                        rank,
                        reason: format!(
                            "peer {src} sent {} bytes, at most {recv_size} fit",
                            payload.len()
                        ),
                    });
                }
                let offset = (relative * scatter_size) as usize;
                buf[offset..offset + payload.len()].copy_from_slice(&payload);
                curr_size = payload.len() as i64;
            }
            break;
        }
        mask <<= 1;
    }

    mask >>= 1;
    while mask > 0 {
        if relative + mask < size64 {
            // forward everything strictly past mask slices from our offset
            let send_size = curr_size - scatter_size * mask;
            if send_size > 0 {
                let dst = ((rank as i64 + mask) % size64) as Rank;
                let offset = ((relative + mask) * scatter_size) as usize;
                coll_send(
                    comm,
                    "scatter",
                    dst,
                    tag,
                    &buf[offset..offset + send_size as usize],
                    attr,
                )
                .await?;
                curr_size -= send_size;
            }
        }
        mask >>= 1;
    }

    Ok(curr_size as usize)
}
