//! Binomial-tree reduction to a single root.
//!
//! The result is deterministic for any operator: receives are
//! source-selected, so each parent combines its children in a fixed
//! order regardless of arrival timing. Non-commutative operators get a
//! strict ascending-rank combine order by reducing toward a logical root
//! of 0 and forwarding the result to the designated root afterwards.

use crate::comm::Communicator;
use crate::error::{CohortError, Result};
use crate::p2p::PointToPoint;
use crate::reduce::ReduceOperator;
use crate::types::{CollAttr, Rank, Tag};

use super::helpers::{alloc_scratch, coll_recv_exact, coll_send};

/// Reduce every rank's contribution into `recvbuf` at `root`.
///
/// `sendbuf` is this rank's input of `count` packed elements; passing
/// `None` at the root treats the root's `recvbuf` as its contribution
/// (in-place). Non-root ranks must supply an input, and their `recvbuf`
/// contents are unspecified on return.
pub async fn binomial_reduce<T: PointToPoint, O: ReduceOperator + ?Sized>(
    comm: &Communicator<T>,
    sendbuf: Option<&[u8]>,
    recvbuf: &mut [u8],
    count: usize,
    op: &O,
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

    let nbytes = recvbuf.len();
    if let Some(s) = sendbuf {
        if s.len() != nbytes {
            return Err(CohortError::BufferSizeMismatch {
                expected: nbytes,
                actual: s.len(),
            });
        }
    }
    if size == 1 {
        if let Some(s) = sendbuf {
            recvbuf.copy_from_slice(s);
        }
        return Ok(());
    }

    let commutative = op.is_commutative();
    let lroot = if commutative { root } else { 0 };
    let relrank = (rank + size - lroot) % size;

    // Non-root ranks accumulate into a private buffer; their recvbuf is
    // not theirs to scribble on until the final result lands at root.
    let mut private = if rank != root {
        alloc_scratch(nbytes)?
    } else {
        Vec::new()
    };

    {
        let acc: &mut [u8] = if rank == root { recvbuf } else { &mut private };
        match sendbuf {
            Some(s) => acc.copy_from_slice(s),
            None if rank == root => {} // in place, recvbuf already holds it
            None => {
                return Err(CohortError::CollectiveFailed {
                    operation: "reduce",
                    rank,
                    reason: "non-root rank requires an input buffer".into(),
                });
            }
        }
        tree_reduce_stage(comm, acc, count, op, lroot, relrank, tag, attr).await?;
    }

    forward_stage(comm, &private, recvbuf, commutative, root, tag, attr).await
}

/// One binomial tree pass toward the logical root.
///
/// At each mask bit of the relative rank: clear means receive from the
/// subtree at `relrank | mask` and combine; set means send the
/// accumulated value to `relrank & !mask` and stop participating.
async fn tree_reduce_stage<T: PointToPoint, O: ReduceOperator + ?Sized>(
    comm: &Communicator<T>,
    acc: &mut [u8],
    count: usize,
    op: &O,
    lroot: Rank,
    relrank: u32,
    tag: Tag,
    attr: CollAttr,
) -> Result<()> {
    let size = comm.size();
    let commutative = op.is_commutative();

    let mut mask: u32 = 1;
    while mask < size {
        if relrank & mask == 0 {
            let source = relrank | mask;
            if source < size {
                let source = (source + lroot) % size;
                let mut incoming =
                    coll_recv_exact(comm, "reduce", source, tag, acc.len()).await?;
                if commutative {
                    op.reduce_local(&incoming, acc, count)?;
                } else {
                    // the sender sits above us in rank order, so the
                    // received value must be the right-hand argument
                    op.reduce_local(acc, &mut incoming, count)?;
                    acc.copy_from_slice(&incoming);
                }
            }
        } else {
            let parent = ((relrank & !mask) + lroot) % size;
            coll_send(comm, "reduce", parent, tag, acc, attr).await?;
            break;
        }
        mask <<= 1;
    }
    Ok(())
}

/// Ship the finished value from rank 0 to the designated root when the
/// tree had to run with logical root 0 (non-commutative operator).
async fn forward_stage<T: PointToPoint>(
    comm: &Communicator<T>,
    private: &[u8],
    recvbuf: &mut [u8],
    commutative: bool,
    root: Rank,
    tag: Tag,
    attr: CollAttr,
) -> Result<()> {
    if commutative || root == 0 {
        return Ok(());
    }
    let rank = comm.rank();
    if rank == 0 {
        coll_send(comm, "reduce", root, tag, private, attr).await?;
    } else if rank == root {
        let payload = coll_recv_exact(comm, "reduce", 0, tag, recvbuf.len()).await?;
        recvbuf.copy_from_slice(&payload);
    }
    Ok(())
}
