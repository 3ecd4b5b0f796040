//! Inclusive prefix scan: flat recursive doubling, plus the two-level
//! hierarchical composition that keeps most traffic inside local groups.

use crate::comm::Communicator;
use crate::error::{CohortError, Result};
use crate::p2p::PointToPoint;
use crate::reduce::ReduceOperator;
use crate::types::{CollAttr, Tag};

use super::broadcast::binomial_broadcast;
use super::helpers::{alloc_scratch, coll_recv_exact, coll_send, coll_send_recv};

/// Inclusive prefix scan over the communicator's rank order: rank `r`
/// ends with the fold of ranks `0..=r` in ascending order.
///
/// Dispatches to [`hierarchical_scan`] when the communicator carries a
/// hierarchy and [`flat_scan`] otherwise.
pub async fn scan<T: PointToPoint, O: ReduceOperator + ?Sized>(
    comm: &Communicator<T>,
    sendbuf: Option<&[u8]>,
    recvbuf: &mut [u8],
    count: usize,
    op: &O,
    tag: Tag,
    attr: CollAttr,
) -> Result<()> {
    if comm.local().is_some() || comm.leaders().is_some() {
        hierarchical_scan(comm, sendbuf, recvbuf, count, op, tag, attr).await
    } else {
        flat_scan(comm, sendbuf, recvbuf, count, op, tag, attr).await
    }
}

/// Recursive-doubling scan.
///
/// Each round exchanges the running partial with `rank XOR mask`. Data
/// from lower ranks updates both the partial and the result; data from
/// higher ranks only extends the partial that later rounds pass on, so
/// non-commutative operators still see a strict ascending order.
pub async fn flat_scan<T: PointToPoint, O: ReduceOperator + ?Sized>(
    comm: &Communicator<T>,
    sendbuf: Option<&[u8]>,
    recvbuf: &mut [u8],
    count: usize,
    op: &O,
    tag: Tag,
    attr: CollAttr,
) -> Result<()> {
    let size = comm.size();
    let rank = comm.rank();
    let nbytes = recvbuf.len();

    if let Some(s) = sendbuf {
        if s.len() != nbytes {
            return Err(CohortError::BufferSizeMismatch {
                expected: nbytes,
                actual: s.len(),
            });
        }
        recvbuf.copy_from_slice(s);
    }
    if size <= 1 {
        return Ok(());
    }

    let mut partial = alloc_scratch(nbytes)?;
    partial.copy_from_slice(recvbuf);

    let mut mask: u32 = 1;
    while mask < size {
        let peer = rank ^ mask;
        if peer < size {
            let mut incoming =
                coll_send_recv(comm, "scan", peer, &partial, peer, tag, nbytes, attr).await?;
            if rank > peer {
                op.reduce_local(&incoming, &mut partial, count)?;
                op.reduce_local(&incoming, recvbuf, count)?;
            } else if op.is_commutative() {
                op.reduce_local(&incoming, &mut partial, count)?;
            } else {
                // higher-ranked data goes on the right of the partial
                op.reduce_local(&partial, &mut incoming, count)?;
                partial.copy_from_slice(&incoming);
            }
        }
        mask <<= 1;
    }
    Ok(())
}

/// Two-level scan over a hierarchical communicator.
///
/// Phase 1 scans each local group. Phase 2 moves each group's full local
/// reduction (the last member's scan result) to its representative.
/// Phase 3 scans those totals across the representatives and hands each
/// representative the fold of everything strictly before its group.
/// Phase 4 broadcasts that correction within each group and folds it into
/// every member's result; the globally first group skips the correction.
pub async fn hierarchical_scan<T: PointToPoint, O: ReduceOperator + ?Sized>(
    comm: &Communicator<T>,
    sendbuf: Option<&[u8]>,
    recvbuf: &mut [u8],
    count: usize,
    op: &O,
    tag: Tag,
    attr: CollAttr,
) -> Result<()> {
    if comm.local().is_none() && comm.leaders().is_none() {
        // no hierarchy attached
        return flat_scan(comm, sendbuf, recvbuf, count, op, tag, attr).await;
    }
    let nbytes = recvbuf.len();

    // phase 1: scan within the local group; a singleton group's scan is
    // its own input
    match comm.local() {
        Some(local) => flat_scan(local, sendbuf, recvbuf, count, op, tag, attr).await?,
        None => {
            if let Some(s) = sendbuf {
                if s.len() != nbytes {
                    return Err(CohortError::BufferSizeMismatch {
                        expected: nbytes,
                        actual: s.len(),
                    });
                }
                recvbuf.copy_from_slice(s);
            }
        }
    }

    // one group spanning the whole communicator degenerates to the flat
    // scan above
    let multi = comm
        .local()
        .map_or(comm.leaders().is_some(), |l| l.size() < comm.size());
    if !multi {
        return Ok(());
    }

    // phases 2 + 3
    let mut correction: Option<Vec<u8>> = None;
    if let Some(leaders) = comm.leaders() {
        let localfull = match comm.local() {
            // the last local member holds the group's full reduction
            Some(local) => {
                coll_recv_exact(local, "scan", local.size() - 1, tag, nbytes).await?
            }
            None => recvbuf.to_vec(),
        };

        let mut prefull = alloc_scratch(nbytes)?;
        flat_scan(leaders, Some(&localfull), &mut prefull, count, op, tag, attr).await?;

        // prefull at representative g covers groups 0..=g; ship it to the
        // next representative, whose members need everything before them
        if leaders.rank() != leaders.size() - 1 {
            coll_send(leaders, "scan", leaders.rank() + 1, tag, &prefull, attr).await?;
        }
        if leaders.rank() != 0 {
            correction =
                Some(coll_recv_exact(leaders, "scan", leaders.rank() - 1, tag, nbytes).await?);
        }
    } else if let Some(local) = comm.local() {
        if local.rank() == local.size() - 1 {
            coll_send(local, "scan", 0, tag, recvbuf, attr).await?;
        }
    }

    // phase 4: the representative tells its group whether a correction is
    // coming, then broadcasts and folds it in
    let mut flag = [u8::from(correction.is_none())];
    if let Some(local) = comm.local() {
        binomial_broadcast(local, &mut flag, 0, tag, attr).await?;
    }
    if flag[0] == 0 {
        let mut scratch = match correction {
            Some(c) => c,
            None => alloc_scratch(nbytes)?,
        };
        if let Some(local) = comm.local() {
            binomial_broadcast(local, &mut scratch, 0, tag, attr).await?;
        }
        // everything before this group goes on the left
        op.reduce_local(&scratch, recvbuf, count)?;
    }
    Ok(())
}
