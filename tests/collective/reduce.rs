use cohort::collective::REDUCE_TAG;
use cohort::{binomial_reduce, CollAttr, DataType, ElementwiseOp, Rank, ReduceOp};

use super::helpers::{
    affine_input, decode_affine, encode_affine, fold_affine, i32_bytes, i32_from, run_collective,
    AffineOp,
};

/// Binomial reduce of sendbuf[r] = r with sum at root 3 over 8 ranks
/// yields 0+1+..+7 = 28 at the root.
#[tokio::test]
async fn test_sum_at_root_three() {
    let op = ElementwiseOp::new(DataType::I32, ReduceOp::Sum);
    let results = run_collective(8, move |comm| async move {
        let sendbuf = i32_bytes(&[comm.rank() as i32]);
        let mut recvbuf = vec![0u8; 4];
        binomial_reduce(
            &comm,
            Some(&sendbuf),
            &mut recvbuf,
            1,
            &op,
            3,
            REDUCE_TAG,
            CollAttr::NONE,
        )
        .await?;
        Ok((comm.rank(), i32_from(&recvbuf)[0]))
    })
    .await;

    for (rank, value) in results {
        if rank == 3 {
            assert_eq!(value, 28);
        }
    }
}

#[tokio::test]
async fn test_commutative_result_independent_of_root() {
    let op = ElementwiseOp::new(DataType::I32, ReduceOp::Max);
    for root in 0..5u32 {
        let results = run_collective(5, move |comm| async move {
            let sendbuf = i32_bytes(&[(comm.rank() as i32) * 7 - 3]);
            let mut recvbuf = vec![0u8; 4];
            binomial_reduce(
                &comm,
                Some(&sendbuf),
                &mut recvbuf,
                1,
                &op,
                root,
                REDUCE_TAG,
                CollAttr::NONE,
            )
            .await?;
            Ok((comm.rank(), i32_from(&recvbuf)[0]))
        })
        .await;

        for (rank, value) in results {
            if rank == root {
                assert_eq!(value, 4 * 7 - 3, "root {root}");
            }
        }
    }
}

#[tokio::test]
async fn test_multi_element_sum() {
    let op = ElementwiseOp::new(DataType::I32, ReduceOp::Sum);
    let world = 6u32;
    let results = run_collective(world, move |comm| async move {
        let r = comm.rank() as i32;
        let sendbuf = i32_bytes(&[r, 2 * r, -r]);
        let mut recvbuf = vec![0u8; 12];
        binomial_reduce(
            &comm,
            Some(&sendbuf),
            &mut recvbuf,
            3,
            &op,
            0,
            REDUCE_TAG,
            CollAttr::NONE,
        )
        .await?;
        Ok((comm.rank(), i32_from(&recvbuf)))
    })
    .await;

    let total: i32 = (0..world as i32).sum();
    for (rank, values) in results {
        if rank == 0 {
            assert_eq!(values, vec![total, 2 * total, -total]);
        }
    }
}

/// Non-commutative operator at root 0: tree order alone must produce the
/// strict ascending-rank fold.
#[tokio::test]
async fn test_noncommutative_ascending_order_root_zero() {
    noncommutative_reduce_case(6, 0).await;
}

/// Non-commutative operator at a nonzero root exercises the logical-root
/// shift and the final forward from rank 0.
#[tokio::test]
async fn test_noncommutative_forwards_to_designated_root() {
    noncommutative_reduce_case(8, 5).await;
    noncommutative_reduce_case(7, 6).await;
}

async fn noncommutative_reduce_case(world: u32, root: Rank) {
    let results = run_collective(world, move |comm| async move {
        let sendbuf = encode_affine(affine_input(comm.rank()));
        let mut recvbuf = vec![0u8; 16];
        binomial_reduce(
            &comm,
            Some(&sendbuf),
            &mut recvbuf,
            1,
            &AffineOp,
            root,
            REDUCE_TAG,
            CollAttr::NONE,
        )
        .await?;
        Ok((comm.rank(), decode_affine(&recvbuf)))
    })
    .await;

    let expected = fold_affine((0..world).map(affine_input));
    for (rank, value) in results {
        if rank == root {
            assert_eq!(value, expected, "world {world} root {root}");
        }
    }
}

/// In-place at the root: the root's recvbuf doubles as its contribution.
#[tokio::test]
async fn test_in_place_at_root() {
    let op = ElementwiseOp::new(DataType::I32, ReduceOp::Sum);
    let root: Rank = 2;
    let results = run_collective(4, move |comm| async move {
        let mut recvbuf = i32_bytes(&[comm.rank() as i32 + 1]);
        let sendbuf = (comm.rank() != root).then(|| recvbuf.clone());
        binomial_reduce(
            &comm,
            sendbuf.as_deref(),
            &mut recvbuf,
            1,
            &op,
            root,
            REDUCE_TAG,
            CollAttr::NONE,
        )
        .await?;
        Ok((comm.rank(), i32_from(&recvbuf)[0]))
    })
    .await;

    for (rank, value) in results {
        if rank == root {
            assert_eq!(value, 1 + 2 + 3 + 4);
        }
    }
}

#[tokio::test]
async fn test_single_rank_copies_input() {
    let op = ElementwiseOp::new(DataType::I32, ReduceOp::Sum);
    let results = run_collective(1, move |comm| async move {
        let sendbuf = i32_bytes(&[41]);
        let mut recvbuf = vec![0u8; 4];
        binomial_reduce(
            &comm,
            Some(&sendbuf),
            &mut recvbuf,
            1,
            &op,
            0,
            REDUCE_TAG,
            CollAttr::NONE,
        )
        .await?;
        Ok(i32_from(&recvbuf)[0])
    })
    .await;
    assert_eq!(results, vec![41]);
}
