use cohort::collective::BROADCAST_TAG;
use cohort::{binomial_broadcast, scatter_for_broadcast, CollAttr, Rank};

use super::helpers::run_collective;

fn root_payload(nbytes: usize) -> Vec<u8> {
    (0..nbytes).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn test_binomial_broadcast_from_middle_root() {
    let world = 6;
    let root: Rank = 2;
    let payload = root_payload(33);
    let expected = payload.clone();

    let results = run_collective(world, move |comm| {
        let payload = payload.clone();
        async move {
            let mut buf = if comm.rank() == root {
                payload
            } else {
                vec![0u8; 33]
            };
            binomial_broadcast(&comm, &mut buf, root, BROADCAST_TAG, CollAttr::NONE).await?;
            Ok(buf)
        }
    })
    .await;

    for buf in results {
        assert_eq!(buf, expected);
    }
}

/// nbytes = 97 over 16 ranks: ceil(97/16) = 7 bytes per nominal slice, so
/// ranks 14 and 15 sit past the end and must retain zero bytes while the
/// distributed total still sums to 97.
#[tokio::test]
async fn test_scatter_uneven_tail() {
    let world: u32 = 16;
    let nbytes = 97usize;
    let scatter_size = 7usize;
    let original = root_payload(nbytes);
    let expected = original.clone();

    let results = run_collective(world, move |comm| {
        let original = original.clone();
        async move {
            let mut buf = if comm.rank() == 0 {
                original
            } else {
                vec![0u8; nbytes]
            };
            let retained =
                scatter_for_broadcast(&comm, &mut buf, 0, BROADCAST_TAG, CollAttr::NONE).await?;
            Ok((comm.rank(), retained, buf))
        }
    })
    .await;

    let total: usize = results.iter().map(|(_, retained, _)| retained).sum();
    assert_eq!(total, nbytes);
    assert!(results.iter().any(|(_, retained, _)| *retained == 0));

    for (rank, retained, buf) in results {
        let offset = rank as usize * scatter_size;
        if offset < nbytes {
            assert_eq!(
                &buf[offset..offset + retained],
                &expected[offset..offset + retained],
                "rank {rank} slice mismatch"
            );
        } else {
            // trailing ranks past the buffer end hold nothing
            assert_eq!(retained, 0);
        }
    }
}

#[tokio::test]
async fn test_scatter_even_split() {
    let world: u32 = 4;
    let nbytes = 64usize;
    let original = root_payload(nbytes);
    let expected = original.clone();

    let results = run_collective(world, move |comm| {
        let original = original.clone();
        async move {
            let mut buf = if comm.rank() == 0 {
                original
            } else {
                vec![0u8; nbytes]
            };
            let retained =
                scatter_for_broadcast(&comm, &mut buf, 0, BROADCAST_TAG, CollAttr::NONE).await?;
            Ok((comm.rank(), retained, buf))
        }
    })
    .await;

    for (rank, retained, buf) in results {
        assert_eq!(retained, 16);
        let offset = rank as usize * 16;
        assert_eq!(&buf[offset..offset + 16], &expected[offset..offset + 16]);
    }
}

#[tokio::test]
async fn test_scatter_nonzero_root() {
    let world: u32 = 8;
    let root: Rank = 5;
    let nbytes = 40usize;
    let original = root_payload(nbytes);
    let expected = original.clone();

    let results = run_collective(world, move |comm| {
        let original = original.clone();
        async move {
            let mut buf = if comm.rank() == root {
                original
            } else {
                vec![0u8; nbytes]
            };
            let retained =
                scatter_for_broadcast(&comm, &mut buf, root, BROADCAST_TAG, CollAttr::NONE).await?;
            Ok((comm.rank(), retained, buf))
        }
    })
    .await;

    let total: usize = results.iter().map(|(_, retained, _)| retained).sum();
    assert_eq!(total, nbytes);

    // slices are placed by root-relative rank order
    for (rank, retained, buf) in results {
        let rel = ((rank + world - root) % world) as usize;
        let offset = rel * 5;
        assert_eq!(&buf[offset..offset + retained], &expected[offset..offset + retained]);
    }
}

#[tokio::test]
async fn test_scatter_single_rank_keeps_everything() {
    let results = run_collective(1, |comm| async move {
        let mut buf = root_payload(10);
        let retained =
            scatter_for_broadcast(&comm, &mut buf, 0, BROADCAST_TAG, CollAttr::NONE).await?;
        Ok(retained)
    })
    .await;
    assert_eq!(results, vec![10]);
}
