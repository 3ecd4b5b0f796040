//! Butterfly reduce-scatter for power-of-two groups.
//!
//! Implements the reduce-scatter butterfly of Traff, "An Improved
//! Algorithm for (Non-commutative) Reduce-Scatter with an Application"
//! (EuroPVM/MPI 2005): the input blocks are staged under a bit-reversal
//! permutation, then `log2(P)` recursive-halving exchanges leave each
//! rank holding exactly the reduction of its own block, in strict rank
//! order even for non-commutative operators.

use crate::comm::Communicator;
use crate::error::{CohortError, Result};
use crate::p2p::PointToPoint;
use crate::reduce::ReduceOperator;
use crate::types::{CollAttr, Layout, Tag};

use super::helpers::{alloc_scratch, bit_reverse, ceil_log2, coll_send_recv};

/// Reduce all ranks' inputs and scatter the result one block per rank.
///
/// `sendbuf` holds `P` contiguous blocks of `recvcount` elements; passing
/// `None` reads the input from `recvbuf` instead (in-place), which must
/// then be `P` blocks long. On return the first block of `recvbuf` holds
/// the reduction of every rank's block at this rank's index.
///
/// The communicator size must be a power of two; that is a programming
/// contract, checked in debug builds only.
pub async fn butterfly_reduce_scatter<T: PointToPoint, O: ReduceOperator + ?Sized>(
    comm: &Communicator<T>,
    sendbuf: Option<&[u8]>,
    recvbuf: &mut [u8],
    recvcount: usize,
    layout: &Layout,
    op: &O,
    tag: Tag,
    attr: CollAttr,
) -> Result<()> {
    let size = comm.size();
    let rank = comm.rank();
    debug_assert!(
        size.is_power_of_two(),
        "butterfly reduce-scatter requires a power-of-two group, got {size}"
    );

    let elem_bytes = layout.size;
    let block_bytes = layout.packed_len(recvcount);
    let total_bytes = block_bytes * size as usize;
    let log2_size = ceil_log2(size);

    if recvbuf.len() < block_bytes {
        return Err(CohortError::BufferSizeMismatch {
            expected: block_bytes,
            actual: recvbuf.len(),
        });
    }

    let mut buf0 = alloc_scratch(total_bytes)?;
    let mut buf1 = alloc_scratch(total_bytes)?;

    {
        let input: &[u8] = match sendbuf {
            Some(s) => s,
            None => recvbuf,
        };
        if input.len() != total_bytes {
            return Err(CohortError::BufferSizeMismatch {
                expected: total_bytes,
                actual: input.len(),
            });
        }
        // stage the blocks under the mirror permutation, so the block a
        // rank ends up holding matches its own index without bookkeeping
        for i in 0..size as usize {
            let dst = bit_reverse(i as u32, log2_size) as usize;
            buf0[dst * block_bytes..(dst + 1) * block_bytes]
                .copy_from_slice(&input[i * block_bytes..(i + 1) * block_bytes]);
        }
    }
    let mut buf0_was_inout = true;

    // offsets and sizes below are in elements
    let mut send_offset = 0usize;
    let mut recv_offset = 0usize;
    let mut active = recvcount * size as usize;
    for k in 0..log2_size {
        let peer = rank ^ (1 << k);
        active /= 2;

        if rank > peer {
            // higher rank: send bottom half, receive and keep the top
            recv_offset += active;
        } else {
            send_offset += active;
        }

        // double-buffering avoids a local copy per round
        let (outgoing, incoming) = if buf0_was_inout {
            (&mut buf0, &mut buf1)
        } else {
            (&mut buf1, &mut buf0)
        };

        let out_range = send_offset * elem_bytes..(send_offset + active) * elem_bytes;
        let in_range = recv_offset * elem_bytes..(recv_offset + active) * elem_bytes;
        let received = coll_send_recv(
            comm,
            "reduce_scatter",
            peer,
            &outgoing[out_range],
            peer,
            tag,
            active * elem_bytes,
            attr,
        )
        .await?;
        incoming[in_range.clone()].copy_from_slice(&received);

        // reduce at recv_offset; the data at send_offset is now the
        // peer's responsibility
        if rank > peer {
            // peer holds lower-ranked data, so it is the left argument
            op.reduce_local(&incoming[in_range.clone()], &mut outgoing[in_range], active)?;
        } else {
            op.reduce_local(&outgoing[in_range.clone()], &mut incoming[in_range], active)?;
            // the reduced value landed in the incoming buffer, which
            // becomes authoritative for the next round
            buf0_was_inout = !buf0_was_inout;
        }

        // the next round stays within the block just received and reduced
        send_offset = recv_offset;
    }

    debug_assert_eq!(active, recvcount);

    let result = if buf0_was_inout { &buf0 } else { &buf1 };
    let start = recv_offset * elem_bytes;
    recvbuf[..block_bytes].copy_from_slice(&result[start..start + block_bytes]);
    Ok(())
}
