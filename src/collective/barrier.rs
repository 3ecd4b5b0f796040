//! Dissemination barriers.
//!
//! In round `k` of the binary algorithm, rank `r` exchanges a zero-length
//! message with `(r + 2^k) mod P` and `(r - 2^k) mod P`; after
//! `ceil(log2(P))` rounds every rank has transitively heard from every
//! other. The k-ary variant widens each round to `k - 1` partners and
//! finishes in `ceil(log_k(P))` phases.

use crate::comm::Communicator;
use crate::config::CohortConfig;
use crate::error::Result;
use crate::p2p::{PointToPoint, RequestSet};
use crate::types::{CollAttr, Rank, Tag};

use super::helpers::coll_send_recv;

/// Block until every rank has entered the call. The radix comes from the
/// config; 2 selects the binary algorithm.
pub async fn barrier<T: PointToPoint>(
    comm: &Communicator<T>,
    config: &CohortConfig,
    tag: Tag,
    attr: CollAttr,
) -> Result<()> {
    radix_barrier(comm, config.barrier_radix, tag, attr).await
}

/// Binary dissemination barrier: `ceil(log2(P))` rounds of one atomic
/// zero-payload exchange each.
pub async fn dissemination_barrier<T: PointToPoint>(
    comm: &Communicator<T>,
    tag: Tag,
    attr: CollAttr,
) -> Result<()> {
    let size = comm.size();
    let rank = comm.rank();

    let mut mask: u32 = 1;
    while mask < size {
        let dst = (rank + mask) % size;
        let src = (rank + size - mask) % size;
        // combined call: the send and receive legs progress concurrently,
        // so mutual exchanges cannot deadlock
        coll_send_recv(comm, "barrier", dst, &[], src, tag, 0, attr).await?;
        mask <<= 1;
    }
    Ok(())
}

/// Number of k-ary dissemination phases for a group of `size` ranks.
fn nphases_for(size: u32, k: u32) -> u32 {
    let mut nphases = 0;
    let mut p_of_k: u64 = 1;
    while p_of_k < size as u64 {
        p_of_k *= k as u64;
        nphases += 1;
    }
    nphases
}

/// k-ary dissemination barrier.
///
/// Phase `i` posts `k - 1` nonblocking receives and sends at stride
/// `k^i`. Receive requests are double-buffered across phases: phase `i`
/// waits phase `i - 1`'s receives before its first send, and the final
/// phase's receives are drained before return. Send requests are waited
/// within their phase, before the stride advances.
pub async fn radix_barrier<T: PointToPoint>(
    comm: &Communicator<T>,
    radix: u32,
    tag: Tag,
    attr: CollAttr,
) -> Result<()> {
    let size = comm.size();
    let rank = comm.rank();
    if size <= 1 {
        return Ok(());
    }

    let k = radix.min(size).max(2);
    if k == 2 {
        return dissemination_barrier(comm, tag, attr).await;
    }
    let nphases = nphases_for(size, k) as usize;
    let k = k as usize;

    let mut recvs = RequestSet::with_capacity(2 * (k - 1));
    let mut sends = RequestSet::with_capacity(k - 1);
    let size64 = size as i64;

    let mut shift: i64 = 1;
    for phase in 0..nphases {
        for j in 1..k as i64 {
            let to = ((rank as i64 + j * shift).rem_euclid(size64)) as Rank;
            let from = ((rank as i64 - j * shift).rem_euclid(size64)) as Rank;

            recvs.put(
                (j as usize - 1) + (k - 1) * (phase & 1),
                comm.irecv(from, tag)?,
            );
            // a phase's signals are only meaningful once the previous
            // phase's have all arrived
            if phase > 0 && j == 1 {
                recvs.wait_range((k - 1) * ((phase - 1) & 1), k - 1).await?;
            }

            sends.put(j as usize - 1, comm.isend(to, tag, Vec::new(), attr)?);
        }
        sends.wait_range(0, k - 1).await?;
        shift *= k as i64;
    }

    recvs
        .wait_range((k - 1) * ((nphases - 1) & 1), k - 1)
        .await?;
    Ok(())
}
